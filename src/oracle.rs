use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    error::{Error, Result},
    snapshot::Snapshot,
    source::{Child, Source},
    types::{EntryKind, HEADER_SIZE},
};

/// Computes the serialized size of files and directory subtrees.
///
/// Sizes are cached per path for the lifetime of the oracle. A file's size
/// is its byte length; a directory's is the header plus the sizes of all its
/// children, recursively. Nesting depth is counted from the path being
/// queried and bounded by `max_depth`.
pub struct SizeOracle<S: Source> {
    snapshot:  Snapshot<S>,
    max_depth: usize,
    sizes:     HashMap<PathBuf, Measured>,
}

/// A cached size, with the deepest directory nesting below the path.
/// `height` is `None` for files, which are never too deep themselves.
#[derive(Clone, Copy)]
struct Measured {
    size:   u64,
    height: Option<usize>,
}

impl<S: Source> SizeOracle<S> {
    pub fn new(snapshot: Snapshot<S>, max_depth: usize) -> Self {
        SizeOracle {
            snapshot,
            max_depth,
            sizes: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> &Snapshot<S> { &self.snapshot }

    pub fn children(&mut self, path: &Path) -> Result<Rc<[Child]>> { self.snapshot.children(path) }

    /// Serialized size of `path`.
    pub fn size_of(&mut self, path: &Path) -> Result<u64> {
        if let Some(measured) = self.cached_at(path, 0) {
            return Ok(measured.size);
        }
        let kind = self.snapshot.kind(path)?;
        self.size_at(path, kind, 0).map(|measured| measured.size)
    }

    /// Serialized size of a child whose kind is already known from a listing.
    pub fn size_of_child(&mut self, child: &Child) -> Result<u64> {
        self.size_at(&child.path, child.kind, 0)
            .map(|measured| measured.size)
    }

    #[cfg(test)]
    fn cached(&self, path: &Path) -> Option<u64> { self.sizes.get(path).map(|measured| measured.size) }

    /// Cached size of `path` when its subtree fits below `depth`.
    /// A subtree that was measured closer to the root may be too deep here;
    /// it is then measured again so the error names the offending directory.
    fn cached_at(&self, path: &Path, depth: usize) -> Option<Measured> {
        self.sizes
            .get(path)
            .copied()
            .filter(|measured| measured.height.map_or(true, |height| depth + height <= self.max_depth))
    }

    fn size_at(&mut self, path: &Path, kind: EntryKind, depth: usize) -> Result<Measured> {
        if let Some(measured) = self.cached_at(path, depth) {
            return Ok(measured);
        }
        let measured = match kind {
            EntryKind::File => Measured {
                size:   self.snapshot.source().byte_size(path)?,
                height: None,
            },
            EntryKind::Directory => {
                if depth > self.max_depth {
                    return Err(Error::DepthExceeded {
                        path:      path.to_owned(),
                        max_depth: self.max_depth,
                    });
                }
                let children = self.snapshot.children(path)?;
                let mut size = HEADER_SIZE as u64;
                let mut height = 0;
                for child in children.iter() {
                    let child = self.size_at(&child.path, child.kind, depth + 1)?;
                    size += child.size;
                    if let Some(below) = child.height {
                        height = height.max(below + 1);
                    }
                }
                Measured {
                    size,
                    height: Some(height),
                }
            }
            EntryKind::Other => {
                return Err(Error::Unsupported {
                    path: path.to_owned(),
                })
            }
        };
        self.sizes.insert(path.to_owned(), measured);
        Ok(measured)
    }
}
