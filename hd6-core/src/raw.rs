//! Byte-exact layouts of the HD6 header and file entry records.

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{Hd6Error, Result};

#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawHeader {
    pub magic: [u8; 3],
    pub version: [u8; 5],
    pub name_chunk_size: U32,
    pub unk0: [u8; 8],
    pub filename_table_ptr: U32,
    pub filename_table_size: U32,
    pub unk1: [u8; 8],
    pub raw_file_count: U32,
    pub file_entries_ptr: U32,
    pub unk2: [u8; 8],
}

static_assertions::assert_eq_size!(RawHeader, [u8; 52]);

impl RawHeader {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match Self::read_from_prefix(bytes) {
            Ok((header, _)) => Ok(header),
            Err(_) => Err(Hd6Error::Truncated {
                region: "header",
                needed: Self::SIZE,
                available: bytes.len(),
            }),
        }
    }

    pub fn into_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        buf.copy_from_slice(self.as_bytes());
        buf
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct RawFileEntry {
    pub unk: [u8; 2],
    pub offset: [u8; 3],
    pub size: [u8; 3],
}

static_assertions::assert_eq_size!(RawFileEntry, [u8; 8]);

impl RawFileEntry {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match Self::read_from_prefix(bytes) {
            Ok((entry, _)) => Ok(entry),
            Err(_) => Err(Hd6Error::Truncated {
                region: "file entry",
                needed: Self::SIZE,
                available: bytes.len(),
            }),
        }
    }

    pub fn into_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0; Self::SIZE];
        buf.copy_from_slice(self.as_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_header() {
        let mut bytes = [0u8; RawHeader::SIZE];
        bytes[..3].copy_from_slice(b"HD6");
        bytes[8..12].copy_from_slice(&0x30u32.to_le_bytes());
        bytes[20..24].copy_from_slice(&0x40u32.to_le_bytes());
        bytes[24..28].copy_from_slice(&0x10u32.to_le_bytes());
        bytes[36..40].copy_from_slice(&4u32.to_le_bytes());
        bytes[40..44].copy_from_slice(&0x50u32.to_le_bytes());

        let header = RawHeader::from_bytes(&bytes).unwrap();
        assert_eq!(&header.magic, b"HD6");
        assert_eq!(header.name_chunk_size.get(), 0x30);
        assert_eq!(header.filename_table_ptr.get(), 0x40);
        assert_eq!(header.filename_table_size.get(), 0x10);
        assert_eq!(header.raw_file_count.get(), 4);
        assert_eq!(header.file_entries_ptr.get(), 0x50);

        assert_eq!(header.into_bytes(), bytes);
    }

    #[test]
    fn test_truncated_header() {
        let err = RawHeader::from_bytes(b"HD6\0").unwrap_err();
        assert!(matches!(
            err,
            Hd6Error::Truncated {
                needed: 52,
                available: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_read_entry() {
        let bytes = [0xAA, 0xBB, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let entry = RawFileEntry::from_bytes(&bytes).unwrap();
        assert_eq!(entry.unk, [0xAA, 0xBB]);
        assert_eq!(entry.offset, [0x01, 0x02, 0x03]);
        assert_eq!(entry.size, [0x04, 0x05, 0x06]);
        assert_eq!(entry.into_bytes(), bytes);
    }
}
