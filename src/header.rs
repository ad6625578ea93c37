use std::path::Path;

use crate::{
    error::{Error, Result},
    oracle::SizeOracle,
    source::Source,
    types::*,
};

/// Encode the header of directory `path`.
///
/// One record per child in snapshot order, lengths taken from the oracle,
/// remaining slots zero filled. Fails with [`Error::TooManyEntries`] when the
/// directory has more than [`DIR_ENTRIES`] children and with
/// [`Error::NameTooLong`] when a name exceeds [`NAME_SIZE`] bytes.
pub fn encode_header<S: Source>(oracle: &mut SizeOracle<S>, path: &Path) -> Result<DirectoryHeader> {
    let children = oracle.children(path)?;
    if children.len() > DIR_ENTRIES {
        return Err(Error::TooManyEntries {
            path:  path.to_owned(),
            count: children.len(),
        });
    }
    let mut header = DirectoryHeader::new_zeroed();
    for (slot, child) in header.entries.iter_mut().zip(children.iter()) {
        let length = oracle.size_of_child(child)?;
        *slot = encode_entry(&child.path, child.name.as_encoded_bytes(), length, child.kind)?;
    }
    Ok(header)
}
