use std::{
    ffi::OsString,
    fs::{metadata, symlink_metadata, File, FileType},
    io::{self, Read},
    path::{Path, PathBuf},
};

use jwalk::{Parallelism, WalkDir};

use crate::{
    error::{Error, Result},
    types::EntryKind,
};

/// A child of a directory as seen by one listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Child {
    pub name: OsString,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Filesystem access needed to build an image.
///
/// `list_children` may return children in any order; callers go through a
/// [`Snapshot`](crate::snapshot::Snapshot) which sorts and pins the listing
/// for the rest of the build.
pub trait Source {
    type Reader: Read;

    fn kind(&self, path: &Path) -> Result<EntryKind>;
    fn list_children(&self, path: &Path) -> Result<Vec<Child>>;
    fn byte_size(&self, path: &Path) -> Result<u64>;
    fn open(&self, path: &Path) -> Result<Self::Reader>;
}

/// The host filesystem. Symlinks are not followed and report
/// [`EntryKind::Other`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HostSource;

impl Source for HostSource {
    type Reader = File;

    fn kind(&self, path: &Path) -> Result<EntryKind> {
        let meta = symlink_metadata(path).map_err(|e| Error::read(path, e))?;
        Ok(kind_of(meta.file_type()))
    }

    fn list_children(&self, path: &Path) -> Result<Vec<Child>> {
        WalkDir::new(path)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1)
            .max_depth(1)
            .parallelism(Parallelism::Serial)
            .into_iter()
            .map(|entry| {
                let entry = entry.map_err(|e| walk_error(path, e))?;
                Ok(Child {
                    name: entry.file_name().to_owned(),
                    path: entry.path(),
                    kind: kind_of(entry.file_type()),
                })
            })
            .collect()
    }

    fn byte_size(&self, path: &Path) -> Result<u64> {
        metadata(path)
            .map(|meta| meta.len())
            .map_err(|e| Error::read(path, e))
    }

    fn open(&self, path: &Path) -> Result<File> { File::open(path).map_err(|e| Error::read(path, e)) }
}

fn kind_of(file_type: FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

fn walk_error(path: &Path, error: jwalk::Error) -> Error {
    let path = error.path().unwrap_or(path).to_owned();
    match error.io_error() {
        Some(source) => Error::read(&path, io::Error::new(source.kind(), source.to_string())),
        None => Error::Io {
            path,
            source: io::Error::other(error.to_string()),
        },
    }
}
