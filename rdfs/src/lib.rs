//! Reader for ramdisk images produced by `mkrd`.
//!
//! An image is a serialized root directory. A directory is a fixed
//! [`DirectoryHeader`] of [`DIR_ENTRIES`] records followed by the serialized
//! bytes of each child in header order; a file is its raw contents. A child's
//! region starts after the header plus the lengths of all preceding entries.

mod error;
mod image;
pub mod types;

pub use error::{Error, Result};
pub use image::{Directory, Entries, File, Image, Node, Walk};
pub use types::{DirectoryEntry, DirectoryHeader, DIR_ENTRIES, ENTRY_SIZE, HEADER_SIZE, NAME_SIZE};
