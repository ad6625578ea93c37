use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::types::{DIR_ENTRIES, NAME_SIZE};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an image build.
///
/// Every variant is fatal: a build either produces a complete image or
/// leaves nothing at the output path.
#[derive(Debug, Error)]
pub enum Error {
    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },
    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },
    #[error("couldn't read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("name is {len} bytes, longer than {max}: {}", path.display(), max = NAME_SIZE)]
    NameTooLong { path: PathBuf, len: usize },
    #[error("directory has {count} entries, more than {max}: {}", path.display(), max = DIR_ENTRIES)]
    TooManyEntries { path: PathBuf, count: usize },
    #[error("size {size} doesn't fit in a 32-bit length: {}", path.display())]
    TooLarge { path: PathBuf, size: u64 },
    #[error("directory is nested deeper than {max_depth} levels: {}", path.display())]
    DepthExceeded { path: PathBuf, max_depth: usize },
    #[error("not a regular file or directory: {}", path.display())]
    Unsupported { path: PathBuf },
    #[error("file changed size during the build, expected {expected} bytes, read {actual}: {}", path.display())]
    SizeMismatch {
        path:     PathBuf,
        expected: u64,
        actual:   u64,
    },
    #[error("couldn't write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}
impl Error {
    /// Classify a filesystem read failure on `path`.
    pub fn read(path: &Path, source: io::Error) -> Self {
        let path = path.to_owned();
        match source.kind() {
            ErrorKind::NotFound => Error::PathNotFound { path },
            ErrorKind::PermissionDenied => Error::PermissionDenied { path },
            _ => Error::Io { path, source },
        }
    }

    pub fn write(path: &Path, source: io::Error) -> Self {
        Error::Write {
            path: path.to_owned(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Error::PathNotFound { path }
            | Error::PermissionDenied { path }
            | Error::Io { path, .. }
            | Error::NameTooLong { path, .. }
            | Error::TooManyEntries { path, .. }
            | Error::TooLarge { path, .. }
            | Error::DepthExceeded { path, .. }
            | Error::Unsupported { path }
            | Error::SizeMismatch { path, .. }
            | Error::Write { path, .. } => path,
        }
    }
}
