use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    error::{Error, Result},
    source::{Child, Source},
    types::EntryKind,
};

/// Pins the child list of every directory for the duration of a build.
///
/// Each directory is listed once, sorted by name bytes and cached, so the
/// size computation, the header encoding and the emission of a directory
/// all see the same children in the same order.
pub struct Snapshot<S: Source> {
    source:           S,
    skip_unsupported: bool,
    listings:         HashMap<PathBuf, Rc<[Child]>>,
    skipped:          Vec<PathBuf>,
}
impl<S: Source> Snapshot<S> {
    pub fn new(source: S, skip_unsupported: bool) -> Self {
        Snapshot {
            source,
            skip_unsupported,
            listings: HashMap::new(),
            skipped: Vec::new(),
        }
    }

    pub fn source(&self) -> &S { &self.source }

    pub fn kind(&self, path: &Path) -> Result<EntryKind> { self.source.kind(path) }

    /// Children of `path`, listed on first use.
    ///
    /// Entries that are neither files nor directories fail the listing with
    /// [`Error::Unsupported`], or are dropped and recorded in
    /// [`skipped`](Self::skipped) when skipping is enabled.
    pub fn children(&mut self, path: &Path) -> Result<Rc<[Child]>> {
        if let Some(children) = self.listings.get(path) {
            return Ok(children.clone());
        }
        let mut listed = self.source.list_children(path)?;
        listed.sort_by(|a, b| a.name.cmp(&b.name));

        let mut children = Vec::with_capacity(listed.len());
        for child in listed {
            if child.kind == EntryKind::Other {
                if !self.skip_unsupported {
                    return Err(Error::Unsupported { path: child.path });
                }
                self.skipped.push(child.path);
                continue;
            }
            children.push(child);
        }

        let children: Rc<[Child]> = children.into();
        self.listings.insert(path.to_owned(), children.clone());
        Ok(children)
    }

    /// Entries dropped from listings so far.
    pub fn skipped(&self) -> &[PathBuf] { &self.skipped }
}
