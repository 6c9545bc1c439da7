//! Linked-list packages (`.pak`, `.mpk`, ...) found inside the DAT file.
//!
//! Each file is preceded by an 80-byte header:
//! - 64 bytes: null-padded Shift-JIS name
//! - i32: data offset, relative to the header
//! - i32: data size
//! - i32: next header offset, relative to the header
//! - i32: version
//!
//! The list ends at a header with an empty name or a non-positive next offset,
//! or when fewer than 80 bytes are left.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cursor::{ByteCursor, TextEncoding};
use crate::error::{Hd6Error, Result};
use crate::name::relative_host_path;
use crate::write::align_up;

pub const PACKAGE_HEADER_SIZE: usize = 80;
const PACKAGE_NAME_SIZE: usize = 64;
const PACKAGE_DATA_ALIGNMENT: usize = 16;

pub const KNOWN_EXTENSIONS: &[(&str, &str)] = &[
    ("pak", "general package"),
    ("mpk", "map package"),
    ("pcp", "map piece package"),
    ("ipk", "information data package"),
    ("nav", "navigation data package"),
    ("sky", "sky data package"),
    ("snd", "sound data package"),
    ("pac", "sound package container"),
    ("chr", "character package"),
];

/// Whether `path` has one of the package extensions.
pub fn is_known_extension(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| KNOWN_EXTENSIONS.iter().any(|(known, _)| known.eq_ignore_ascii_case(ext)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEntry {
    pub name: String,
    pub header_offset: usize,
    pub data_offset: usize,
    pub size: usize,
    pub version: i32,
}

#[derive(Debug, Clone)]
pub struct Package {
    data: Vec<u8>,
    entries: Vec<PackageEntry>,
}

impl Package {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !is_known_extension(path) {
            warn!(path = %path.display(), "unknown package extension");
        }
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut cursor = ByteCursor::new(&data[..]);
        let mut entries = Vec::new();

        while cursor.remaining() >= PACKAGE_HEADER_SIZE {
            let header_offset = cursor.position();
            let name = cursor.read_fixed_str(PACKAGE_NAME_SIZE, TextEncoding::ShiftJis)?;
            let relative_offset = cursor.read_i32()?;
            let size = cursor.read_i32()?;
            let next_header = cursor.read_i32()?;
            let version = cursor.read_i32()?;

            if name.is_empty() || next_header <= 0 {
                break;
            }

            let data_offset = header_offset as i64 + relative_offset as i64;
            if relative_offset < 0 || size < 0 || data_offset + size as i64 > data.len() as i64 {
                return Err(Hd6Error::InvalidPackageEntry {
                    name,
                    header_offset,
                    offset: data_offset,
                    size: size as i64,
                });
            }

            debug!(name = %name, header_offset, data_offset, size, version, "package entry");
            entries.push(PackageEntry {
                name,
                header_offset,
                data_offset: data_offset as usize,
                size: size as usize,
                version,
            });
            cursor.set_position(header_offset + next_header as usize);
        }

        Ok(Self { data, entries })
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn entry_data(&self, index: usize) -> Result<&[u8]> {
        let entry = self
            .entries
            .get(index)
            .ok_or(Hd6Error::EntryIndexOutOfBounds(index))?;
        Ok(&self.data[entry.data_offset..entry.data_offset + entry.size])
    }

    /// Write every entry below `output_dir`. Returns the number of files written.
    pub fn extract_all(&self, output_dir: impl AsRef<Path>) -> Result<usize> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;

        for (index, entry) in self.entries.iter().enumerate() {
            let out_path = output_dir.join(relative_host_path(&entry.name));
            if let Some(parent) = out_path.parent()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = File::create(&out_path)?;
            file.write_all(self.entry_data(index)?)?;
            debug!(path = %out_path.display(), size = entry.size, "written");
        }
        info!(files = self.entries.len(), path = %output_dir.display(), "package extracted");

        Ok(self.entries.len())
    }
}

/// Builds a package with each file's data directly after its header.
#[derive(Debug, Default)]
pub struct PackageWriter {
    files: Vec<(String, Vec<u8>, i32)>,
}

impl PackageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: &str, data: &[u8], version: i32) -> Result<()> {
        let encoded = TextEncoding::ShiftJis.encode(name);
        // one byte is kept for the terminator
        if encoded.is_empty() || encoded.len() >= PACKAGE_NAME_SIZE {
            return Err(Hd6Error::NameTooLong {
                name: name.to_string(),
                max: PACKAGE_NAME_SIZE - 1,
            });
        }
        self.files.push((name.to_string(), data.to_vec(), version));
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let mut cursor = ByteCursor::new(Vec::new());
        for (name, data, version) in &self.files {
            let padded = align_up(data.len(), PACKAGE_DATA_ALIGNMENT);
            let next_header = i32_field(PACKAGE_HEADER_SIZE + padded)?;

            cursor.write_fixed_str(name, PACKAGE_NAME_SIZE, TextEncoding::ShiftJis)?;
            cursor.write_i32(PACKAGE_HEADER_SIZE as i32)?;
            cursor.write_i32(i32_field(data.len())?)?;
            cursor.write_i32(next_header)?;
            cursor.write_i32(*version)?;
            cursor.write_bytes(data)?;
            cursor.write_bytes(&vec![0; padded - data.len()])?;
        }
        // terminating header with an empty name
        cursor.write_bytes(&[0; PACKAGE_HEADER_SIZE])?;

        Ok(cursor.into_inner())
    }
}

fn i32_field(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Hd6Error::InvalidPackageEntry {
        name: String::new(),
        header_offset: 0,
        offset: 0,
        size: value as i64,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> Vec<u8> {
        let mut writer = PackageWriter::new();
        writer.add_file("map01.dat", b"hello", 1).unwrap();
        writer.add_file("マップ.bin", &[9; 20], 2).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_read_written_package() {
        let data = sample();
        assert_eq!(data.len(), 80 + 16 + 80 + 32 + 80);

        let package = Package::from_bytes(data).unwrap();
        let entries = package.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "map01.dat");
        assert_eq!(entries[0].data_offset, 80);
        assert_eq!(entries[0].size, 5);
        assert_eq!(entries[0].version, 1);
        assert_eq!(entries[1].name, "マップ.bin");
        assert_eq!(entries[1].header_offset, 96);
        assert_eq!(entries[1].data_offset, 176);
        assert_eq!(package.entry_data(0).unwrap(), b"hello");
        assert_eq!(package.entry_data(1).unwrap(), &[9; 20]);
        assert!(matches!(package.entry_data(2), Err(Hd6Error::EntryIndexOutOfBounds(2))));
    }

    #[test]
    fn test_stops_without_terminator() {
        // drop the terminating header: fewer than 80 bytes remain after the last entry
        let mut data = sample();
        data.truncate(data.len() - 80);
        let package = Package::from_bytes(data).unwrap();
        assert_eq!(package.entries().len(), 2);

        assert!(Package::from_bytes(vec![0; 79]).unwrap().entries().is_empty());
    }

    #[test]
    fn test_stops_on_non_positive_next() {
        let mut data = sample();
        // next header field of the second entry
        data[96 + 72..96 + 76].copy_from_slice(&0i32.to_le_bytes());
        let package = Package::from_bytes(data).unwrap();
        assert_eq!(package.entries().len(), 1);
    }

    #[test]
    fn test_data_out_of_range() {
        let mut data = sample();
        data[68..72].copy_from_slice(&10_000i32.to_le_bytes());
        let err = Package::from_bytes(data).unwrap_err();
        assert!(matches!(
            err,
            Hd6Error::InvalidPackageEntry {
                header_offset: 0,
                offset: 80,
                size: 10_000,
                ..
            }
        ));
    }

    #[test]
    fn test_name_too_long() {
        let mut writer = PackageWriter::new();
        let err = writer.add_file(&"a".repeat(64), b"", 0).unwrap_err();
        assert!(matches!(err, Hd6Error::NameTooLong { max: 63, .. }));
        assert!(writer.add_file(&"a".repeat(63), b"", 0).is_ok());
    }

    #[test]
    fn test_known_extension() {
        assert!(is_known_extension("field/m01.mpk"));
        assert!(is_known_extension("SOUND.SND"));
        assert!(!is_known_extension("readme.txt"));
        assert!(!is_known_extension("pak"));
    }

    #[test]
    fn test_extract_all() {
        let dir = tempfile::tempdir().unwrap();
        let package = Package::from_bytes(sample()).unwrap();
        let written = package.extract_all(dir.path().join("out")).unwrap();
        assert_eq!(written, 2);
        assert_eq!(std::fs::read(dir.path().join("out").join("map01.dat")).unwrap(), b"hello");
        assert_eq!(std::fs::read(dir.path().join("out").join("マップ.bin")).unwrap(), vec![9; 20]);
    }
}
