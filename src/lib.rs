//! Builds flat read-only ramdisk images from directory trees.
//!
//! An image is a serialized root directory. A directory serializes to a
//! fixed header of [`DIR_ENTRIES`] records of [`ENTRY_SIZE`] bytes (name,
//! little endian length, directory flag) followed by the serialization of
//! each child in header order. A file serializes to its raw contents. The
//! format carries no other metadata; [`rdfs`] reads it back.

pub mod error;
pub mod header;
pub mod oracle;
pub mod serialize;
pub mod snapshot;
pub mod source;
pub mod types;
mod write;

pub use error::{Error, Result};
pub use header::encode_header;
pub use oracle::SizeOracle;
pub use serialize::Serializer;
pub use snapshot::Snapshot;
pub use source::{Child, HostSource, Source};
pub use types::{EntryKind, DIR_ENTRIES, ENTRY_SIZE, HEADER_SIZE, NAME_SIZE};
pub use write::{write_image, Summary};

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings for one image build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Deepest directory nesting accepted below the root.
    pub max_depth:        usize,
    /// Leave out symlinks and special files instead of failing.
    pub skip_unsupported: bool,
}
impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            max_depth:        DEFAULT_MAX_DEPTH,
            skip_unsupported: false,
        }
    }
}
