mod entry;
mod header;

use serde::Serialize;

use crate::error::{Hd6Error, Result};
use crate::name::{NameForm, NameTable};

pub use entry::*;
pub use header::*;

/// Parsed HD6 index: header, name dictionary, filename codes and entries.
#[derive(Debug, Clone)]
pub struct Hd6Index {
    header: Hd6Header,
    name_table: NameTable,
    filename_table: Vec<u8>,
    entries: Vec<FileEntry>,
}

/// One row of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub index: usize,
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

impl Hd6Index {
    pub fn new(header: Hd6Header, name_table: NameTable, filename_table: Vec<u8>, entries: Vec<FileEntry>) -> Self {
        Self {
            header,
            name_table,
            filename_table,
            entries,
        }
    }

    pub fn header(&self) -> &Hd6Header {
        &self.header
    }

    pub fn name_table(&self) -> &NameTable {
        &self.name_table
    }

    pub fn filename_table(&self) -> &[u8] {
        &self.filename_table
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, index: usize) -> Result<&FileEntry> {
        self.entries.get(index).ok_or(Hd6Error::EntryIndexOutOfBounds(index))
    }

    /// Decode one name per entry, in entry order.
    pub fn decode_names(&self, form: NameForm) -> Result<Vec<String>> {
        self.name_table
            .decode_all(&self.filename_table, self.entries.len(), form)
    }

    /// Index of the first entry whose stored name equals `name`.
    pub fn find(&self, name: &str) -> Result<usize> {
        self.decode_names(NameForm::Stored)?
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Hd6Error::FileNotFound(name.to_string()))
    }

    /// Stored names with their absolute offsets and sizes.
    pub fn listing(&self) -> Result<Vec<ListEntry>> {
        let names = self.decode_names(NameForm::Stored)?;
        Ok(names
            .into_iter()
            .zip(&self.entries)
            .enumerate()
            .map(|(index, (name, entry))| ListEntry {
                index,
                name,
                offset: entry.offset(),
                size: entry.size(),
            })
            .collect())
    }

    /// Fail with the first entry that does not fit in a DAT file of `file_size` bytes.
    pub fn check_ranges(&self, file_size: u64) -> Result<()> {
        for entry in &self.entries {
            entry.checked_range(file_size)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::read::read_index;
    use crate::write::Hd6Writer;

    fn index_with_duplicates() -> Hd6Index {
        let mut writer = Hd6Writer::new();
        writer.add_file("a\\x.bin", &[1; 16]).unwrap();
        writer.add_file("b.bin", &[2; 16]).unwrap();
        // a second entry with the same name
        writer.add_file("a\\x.bin", &[3; 16]).unwrap();
        let (hd6, _) = writer.finish().unwrap();
        read_index(&hd6).unwrap()
    }

    #[test]
    fn test_find_first_match() {
        let index = index_with_duplicates();
        assert_eq!(index.find("a\\x.bin").unwrap(), 0);
        assert_eq!(index.find("b.bin").unwrap(), 1);
        // lookups use stored separators only
        assert!(matches!(index.find("a/x.bin"), Err(Hd6Error::FileNotFound(_))));
    }

    #[test]
    fn test_listing() {
        let index = index_with_duplicates();
        let listing = index.listing().unwrap();
        assert_eq!(
            listing[1],
            ListEntry {
                index: 1,
                name: "b.bin".to_string(),
                offset: 2048,
                size: 16,
            }
        );
        assert_eq!(listing.len(), index.file_count());
    }

    #[test]
    fn test_check_ranges() {
        let index = index_with_duplicates();
        index.check_ranges(4096 + 16).unwrap();
        assert!(matches!(
            index.check_ranges(4096),
            Err(Hd6Error::InvalidEntryRange { offset: 4096, .. })
        ));
        assert!(matches!(index.entry(3), Err(Hd6Error::EntryIndexOutOfBounds(3))));
    }
}
