use std::ops::Range;

use crate::error::{Hd6Error, Result};
use crate::raw::RawFileEntry;

/// Low two bits of a stored offset are not part of the position.
pub const STORED_OFFSET_MASK: u32 = 0xFF_FFFC;
const U24_MAX: u32 = 0xFF_FFFF;

/// Granularity of entry sizes in the DAT file.
pub const SIZE_ALIGNMENT: u64 = 16;
/// Granularity of entry offsets in the DAT file, as written by the game tools.
pub const OFFSET_ALIGNMENT: u64 = 2048;

#[inline]
pub fn decode_offset(stored: u32) -> u64 {
    ((stored & STORED_OFFSET_MASK) as u64) << 9
}

#[inline]
pub fn decode_size(stored: u32) -> u64 {
    (stored as u64) << 4
}

/// Re-encode an absolute offset. The low bits are not re-masked, so an offset that
/// is not 2048-aligned survives as a stored value whose decoded form differs.
#[inline]
pub fn encode_offset(offset: i64) -> u32 {
    ((offset >> 9) & U24_MAX as i64) as u32
}

pub fn encode_size(size: u64) -> Result<u32> {
    let stored = size >> 4;
    if stored > U24_MAX as u64 {
        return Err(Hd6Error::SizeOverflow { field: "size", value: size });
    }
    Ok(stored as u32)
}

/// One 8-byte record of the file entry table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileEntry {
    pub(crate) unk: [u8; 2],
    pub(crate) stored_offset: u32,
    pub(crate) stored_size: u32,
}

impl FileEntry {
    pub fn new(stored_offset: u32, stored_size: u32) -> Self {
        Self {
            unk: [0; 2],
            stored_offset: stored_offset & U24_MAX,
            stored_size: stored_size & U24_MAX,
        }
    }

    #[inline]
    pub fn stored_offset(&self) -> u32 {
        self.stored_offset
    }

    #[inline]
    pub fn stored_size(&self) -> u32 {
        self.stored_size
    }

    /// Absolute byte offset in the DAT file.
    #[inline]
    pub fn offset(&self) -> u64 {
        decode_offset(self.stored_offset)
    }

    /// Byte size in the DAT file.
    #[inline]
    pub fn size(&self) -> u64 {
        decode_size(self.stored_size)
    }

    /// Stored offset scaled without masking the low bits. Differs from
    /// [`FileEntry::offset`] only for offsets written without 2048 alignment.
    #[inline]
    pub fn unmasked_offset(&self) -> u64 {
        (self.stored_offset as u64) << 9
    }

    pub fn range(&self) -> Range<u64> {
        self.offset()..self.offset() + self.size()
    }

    /// Byte range of this entry, checked against a DAT file of `file_size` bytes.
    pub fn checked_range(&self, file_size: u64) -> Result<Range<usize>> {
        let range = self.range();
        if range.end > file_size {
            return Err(Hd6Error::InvalidEntryRange {
                offset: self.offset(),
                size: self.size(),
                file_size,
            });
        }
        Ok(range.start as usize..range.end as usize)
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.stored_offset = encode_offset(offset);
        self
    }

    pub fn with_size(mut self, size: u64) -> Result<Self> {
        self.stored_size = encode_size(size)?;
        Ok(self)
    }
}

fn u24_from_le(bytes: [u8; 3]) -> u32 {
    bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16
}

fn u24_to_le(value: u32) -> [u8; 3] {
    let b = value.to_le_bytes();
    [b[0], b[1], b[2]]
}

impl From<RawFileEntry> for FileEntry {
    fn from(value: RawFileEntry) -> Self {
        Self {
            unk: value.unk,
            stored_offset: u24_from_le(value.offset),
            stored_size: u24_from_le(value.size),
        }
    }
}

impl From<FileEntry> for RawFileEntry {
    fn from(value: FileEntry) -> Self {
        Self {
            unk: value.unk,
            offset: u24_to_le(value.stored_offset),
            size: u24_to_le(value.stored_size),
        }
    }
}
