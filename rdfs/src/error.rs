use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while navigating an image.
///
/// Offsets are absolute positions in the image buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("region at offset {offset} needs {length} bytes, only {available} available")]
    Truncated {
        offset:    usize,
        length:    usize,
        available: usize,
    },
    #[error("entry at offset {offset} has invalid flag {flag}")]
    InvalidFlag { offset: usize, flag: u8 },
    #[error("directory at offset {offset} holds {expected} bytes of children, entries cover {actual}")]
    Inconsistent {
        offset:   usize,
        expected: usize,
        actual:   usize,
    },
    #[error("no such file or directory: {path}")]
    NotFound { path: String },
    #[error("not a directory: {path}")]
    NotADirectory { path: String },
}
