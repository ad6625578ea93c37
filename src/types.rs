use std::path::Path;

pub use rdfs::types::*;
use zerocopy::byteorder::little_endian::U32;

use crate::error::{Error, Result};

/// Kind of a node in the source tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, sockets, devices and anything else the image can't hold.
    Other,
}
impl EntryKind {
    pub fn flag(self) -> u8 {
        match self {
            EntryKind::Directory => FLAG_DIRECTORY,
            _ => FLAG_FILE,
        }
    }
}

/// Build one header record. `path` names the child in errors.
pub fn encode_entry(path: &Path, name: &[u8], length: u64, kind: EntryKind) -> Result<DirectoryEntry> {
    if name.len() > NAME_SIZE {
        return Err(Error::NameTooLong {
            path: path.to_owned(),
            len:  name.len(),
        });
    }
    let length = u32::try_from(length).map_err(|_| Error::TooLarge {
        path: path.to_owned(),
        size: length,
    })?;
    let mut entry = DirectoryEntry::new_zeroed();
    entry.name[0..name.len()].copy_from_slice(name);
    entry.length = U32::new(length);
    entry.flag = kind.flag();
    Ok(entry)
}
