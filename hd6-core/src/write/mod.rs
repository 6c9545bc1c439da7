//! Assemble an HD6 index and its DAT file from scratch.

use std::collections::HashMap;

use zerocopy::byteorder::little_endian::U32;

use crate::cursor::TextEncoding;
use crate::error::{Hd6Error, Result};
use crate::hd6::{FileEntry, HD6_MAGIC, OFFSET_ALIGNMENT, SIZE_ALIGNMENT, encode_offset, encode_size};
use crate::name::{STORED_SEPARATOR, encode_code};
use crate::raw::{RawFileEntry, RawHeader};

const STORED_OFFSET_LIMIT: u64 = 0xFF_FFFF << 9;

pub struct Hd6Writer {
    fragments: Vec<String>,
    fragment_lookup: HashMap<String, usize>,
    files: Vec<(Vec<usize>, FileEntry)>,
    dat: Vec<u8>,
    region_alignment: usize,
}

impl Default for Hd6Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Hd6Writer {
    pub fn new() -> Self {
        Self {
            fragments: Vec::new(),
            fragment_lookup: HashMap::new(),
            files: Vec::new(),
            dat: Vec::new(),
            region_alignment: 1,
        }
    }

    /// Pad the filename table and entry table to start on multiples of `alignment`.
    pub fn region_alignment(mut self, alignment: usize) -> Self {
        self.region_alignment = alignment.max(1);
        self
    }

    /// Add a dictionary fragment, reusing an identical one if present.
    pub fn add_fragment(&mut self, text: &str) -> usize {
        if let Some(&index) = self.fragment_lookup.get(text) {
            return index;
        }
        let index = self.fragments.len();
        self.fragments.push(text.to_string());
        self.fragment_lookup.insert(text.to_string(), index);
        index
    }

    /// Split a stored name into path components and separators.
    pub fn add_name(&mut self, name: &str) -> Vec<usize> {
        let mut codes = Vec::new();
        for (i, part) in name.split(STORED_SEPARATOR).enumerate() {
            if i > 0 {
                codes.push(self.add_fragment(&STORED_SEPARATOR.to_string()));
            }
            if !part.is_empty() {
                codes.push(self.add_fragment(part));
            }
        }
        codes
    }

    /// Add an entry with a caller-provided record; no data is written.
    pub fn add_entry(&mut self, fragments: &[usize], entry: FileEntry) -> usize {
        self.files.push((fragments.to_vec(), entry));
        self.files.len() - 1
    }

    /// Append `data` to the DAT file at the next aligned offset and index it under `name`.
    pub fn add_file(&mut self, name: &str, data: &[u8]) -> Result<usize> {
        let offset = align_up(self.dat.len(), OFFSET_ALIGNMENT as usize);
        if offset as u64 > STORED_OFFSET_LIMIT {
            return Err(Hd6Error::SizeOverflow {
                field: "offset",
                value: offset as u64,
            });
        }
        let padded_size = align_up(data.len(), SIZE_ALIGNMENT as usize);
        let entry = FileEntry::new(encode_offset(offset as i64), encode_size(padded_size as u64)?);

        self.dat.resize(offset, 0);
        self.dat.extend_from_slice(data);
        self.dat.resize(offset + padded_size, 0);

        let codes = self.add_name(name);
        Ok(self.add_entry(&codes, entry))
    }

    /// Returns the HD6 bytes and the DAT bytes.
    pub fn finish(self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut name_chunk = Vec::new();
        for fragment in &self.fragments {
            name_chunk.extend(TextEncoding::ShiftJis.encode(fragment));
            name_chunk.push(0);
        }

        let mut filename_table = Vec::new();
        for (fragments, _) in &self.files {
            for &index in fragments {
                filename_table.extend(encode_code(index)?);
            }
            filename_table.push(0);
        }

        let mut hd6 = vec![0; RawHeader::SIZE];
        hd6.extend_from_slice(&name_chunk);

        hd6.resize(align_up(hd6.len(), self.region_alignment), 0);
        let filename_table_ptr = hd6.len();
        hd6.extend_from_slice(&filename_table);

        hd6.resize(align_up(hd6.len(), self.region_alignment), 0);
        let file_entries_ptr = hd6.len();
        for (_, entry) in &self.files {
            hd6.extend_from_slice(&RawFileEntry::from(*entry).into_bytes());
        }
        // sentinel slot
        hd6.extend_from_slice(&[0; RawFileEntry::SIZE]);

        let header = RawHeader {
            magic: HD6_MAGIC,
            version: [0; 5],
            name_chunk_size: u32_field("name chunk size", name_chunk.len())?,
            unk0: [0; 8],
            filename_table_ptr: u32_field("filename table pointer", filename_table_ptr)?,
            filename_table_size: u32_field("filename table size", filename_table.len())?,
            unk1: [0; 8],
            raw_file_count: u32_field("file count", self.files.len() + 1)?,
            file_entries_ptr: u32_field("file entry pointer", file_entries_ptr)?,
            unk2: [0; 8],
        };
        hd6[..RawHeader::SIZE].copy_from_slice(&header.into_bytes());

        Ok((hd6, self.dat))
    }
}

fn u32_field(field: &'static str, value: usize) -> Result<U32> {
    u32::try_from(value).map(U32::new).map_err(|_| Hd6Error::SizeOverflow {
        field,
        value: value as u64,
    })
}

pub(crate) fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::name::NameForm;
    use crate::read::read_index;

    #[test]
    fn test_add_name_reuses_fragments() {
        let mut writer = Hd6Writer::new();
        let a = writer.add_name("data\\map01.mpk");
        let b = writer.add_name("data\\map02.mpk");
        assert_eq!(a, vec![0, 1, 2]);
        assert_eq!(b, vec![0, 1, 3]);
    }

    #[test]
    fn test_add_file_layout() {
        let mut writer = Hd6Writer::new();
        writer.add_file("a.bin", &[1; 10]).unwrap();
        writer.add_file("b.bin", &[2; 2049]).unwrap();
        let (hd6, dat) = writer.finish().unwrap();

        let index = read_index(&hd6).unwrap();
        let listing = index.listing().unwrap();
        assert_eq!(listing[0].offset, 0);
        assert_eq!(listing[0].size, 16);
        assert_eq!(listing[1].offset, 2048);
        assert_eq!(listing[1].size, 2064);
        assert_eq!(dat.len(), 2048 + 2064);
        assert_eq!(&dat[..10], &[1; 10]);
        assert_eq!(&dat[10..16], &[0; 6]);
        assert_eq!(index.decode_names(NameForm::Stored).unwrap(), vec!["a.bin", "b.bin"]);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(10, 16), 16);
        assert_eq!(align_up(2048, 2048), 2048);
        assert_eq!(align_up(2049, 2048), 4096);
    }
}
