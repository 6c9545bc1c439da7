use crate::raw::RawHeader;

pub const HD6_MAGIC: [u8; 3] = *b"HD6";

#[derive(Clone, Default)]
pub struct Hd6Header {
    magic: [u8; 3],
    version: [u8; 5],
    name_chunk_size: u32,
    filename_table_ptr: u32,
    filename_table_size: u32,
    raw_file_count: u32,
    file_entries_ptr: u32,
}

impl Hd6Header {
    #[inline]
    pub fn magic(&self) -> [u8; 3] {
        self.magic
    }

    #[inline]
    pub fn version(&self) -> [u8; 5] {
        self.version
    }

    #[inline]
    pub fn name_chunk_size(&self) -> u32 {
        self.name_chunk_size
    }

    /// Absolute offset of the filename code table in the HD6 file.
    #[inline]
    pub fn filename_table_ptr(&self) -> u32 {
        self.filename_table_ptr
    }

    #[inline]
    pub fn filename_table_size(&self) -> u32 {
        self.filename_table_size
    }

    /// Count as stored, including the sentinel slot.
    #[inline]
    pub fn raw_file_count(&self) -> u32 {
        self.raw_file_count
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        (self.raw_file_count - 1) as usize
    }

    /// Absolute offset of the file entry table in the HD6 file.
    #[inline]
    pub fn file_entries_ptr(&self) -> u32 {
        self.file_entries_ptr
    }
}

impl TryFrom<RawHeader> for Hd6Header {
    type Error = crate::error::Hd6Error;

    fn try_from(this: RawHeader) -> Result<Self, Self::Error> {
        if this.magic != HD6_MAGIC {
            return Err(Self::Error::InvalidMagic {
                expected: HD6_MAGIC,
                found: this.magic,
            });
        }
        let raw_file_count = this.raw_file_count.get();
        if raw_file_count == 0 {
            return Err(Self::Error::InvalidFileCount(raw_file_count));
        }

        Ok(Hd6Header {
            magic: this.magic,
            version: this.version,
            name_chunk_size: this.name_chunk_size.get(),
            filename_table_ptr: this.filename_table_ptr.get(),
            filename_table_size: this.filename_table_size.get(),
            raw_file_count,
            file_entries_ptr: this.file_entries_ptr.get(),
        })
    }
}

impl std::fmt::Debug for Hd6Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hd6Header")
            .field("magic", &String::from_utf8_lossy(&self.magic))
            .field("version", &format!("{:02x?}", self.version))
            .field("name_chunk_size", &self.name_chunk_size)
            .field("filename_table_ptr", &format!("{:#x}", self.filename_table_ptr))
            .field("filename_table_size", &self.filename_table_size)
            .field("raw_file_count", &self.raw_file_count)
            .field("file_entries_ptr", &format!("{:#x}", self.file_entries_ptr))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use zerocopy::FromZeros;

    use super::*;
    use crate::error::Hd6Error;

    fn raw_header(magic: &[u8; 3], raw_file_count: u32) -> RawHeader {
        let mut raw = RawHeader::new_zeroed();
        raw.magic = *magic;
        raw.raw_file_count.set(raw_file_count);
        raw
    }

    #[test]
    fn test_sentinel_slot() {
        let header = Hd6Header::try_from(raw_header(b"HD6", 4)).unwrap();
        assert_eq!(header.raw_file_count(), 4);
        assert_eq!(header.file_count(), 3);
    }

    #[test]
    fn test_bad_magic() {
        let err = Hd6Header::try_from(raw_header(b"HD5", 4)).unwrap_err();
        assert!(matches!(
            err,
            Hd6Error::InvalidMagic {
                expected: [b'H', b'D', b'6'],
                found: [b'H', b'D', b'5']
            }
        ));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_zero_count() {
        let err = Hd6Header::try_from(raw_header(b"HD6", 0)).unwrap_err();
        assert!(matches!(err, Hd6Error::InvalidFileCount(0)));
    }
}
