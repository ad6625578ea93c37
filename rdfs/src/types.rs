use std::mem::size_of;

pub use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};
use zerocopy::byteorder::little_endian::U32;

pub const NAME_SIZE: usize = 128;
pub const DIR_ENTRIES: usize = 16;
pub const ENTRY_SIZE: usize = size_of::<DirectoryEntry>();
pub const HEADER_SIZE: usize = size_of::<DirectoryHeader>();

pub const FLAG_FILE: u8 = 0;
pub const FLAG_DIRECTORY: u8 = 1;

const _: () = assert!(ENTRY_SIZE == 133);
const _: () = assert!(HEADER_SIZE == 2128);

/// One child record of a directory header.
///
/// `length` is the serialized size of the child: the file contents for a
/// file, the header plus all descendants for a directory.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug)]
pub struct DirectoryEntry {
    pub name:   [u8; NAME_SIZE],
    pub length: U32,
    pub flag:   u8,
}
impl DirectoryEntry {
    /// Name bytes up to the first zero byte.
    pub fn name(&self) -> &[u8] {
        &self.name[0..(self
            .name
            .iter()
            .position(|&c| c == b'\0')
            .unwrap_or(self.name.len()))]
    }

    pub fn length(&self) -> u32 { self.length.get() }

    /// A slot with an empty name ends the entry list.
    pub fn is_empty(&self) -> bool { self.name[0] == b'\0' }

    pub fn is_dir(&self) -> bool { self.flag == FLAG_DIRECTORY }
}

/// Fixed capacity table at the start of every serialized directory.
/// Unused slots are zero filled.
#[repr(C)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug)]
pub struct DirectoryHeader {
    pub entries: [DirectoryEntry; DIR_ENTRIES],
}
impl DirectoryHeader {
    /// Entries before the first empty slot.
    pub fn used(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().take_while(|entry| !entry.is_empty())
    }
}
