use std::path::Path;

use tracing::debug;

use crate::cursor::ByteCursor;
use crate::error::{Hd6Error, Result};
use crate::hd6::{FileEntry, Hd6Header, Hd6Index};
use crate::name::NameTable;
use crate::raw::{RawFileEntry, RawHeader};

pub fn read_index_file(path: impl AsRef<Path>) -> Result<Hd6Index> {
    let data = std::fs::read(path.as_ref())?;
    read_index(&data)
}

pub fn read_index(data: &[u8]) -> Result<Hd6Index> {
    // read header
    let raw_header = RawHeader::from_bytes(data)?;
    let header = Hd6Header::try_from(raw_header)?;
    debug!(?header, "read HD6 header");

    let mut cursor = ByteCursor::new(data);
    cursor.set_position(RawHeader::SIZE);

    // name chunk directly follows the header
    let name_chunk = read_region(&mut cursor, header.name_chunk_size() as usize, "name chunk")?;

    seek_forward(&mut cursor, header.filename_table_ptr() as usize);
    let filename_table = read_region(&mut cursor, header.filename_table_size() as usize, "filename table")?;

    seek_forward(&mut cursor, header.file_entries_ptr() as usize);
    let entry_table = read_region(
        &mut cursor,
        header.file_count().saturating_mul(RawFileEntry::SIZE),
        "file entry table",
    )?;
    let entries = entry_table
        .chunks_exact(RawFileEntry::SIZE)
        .map(|chunk| RawFileEntry::from_bytes(chunk).map(FileEntry::from))
        .collect::<Result<Vec<_>>>()?;

    let name_table = NameTable::new(name_chunk);
    debug!(
        fragments = name_table.fragment_count(),
        filename_table = filename_table.len(),
        entries = entries.len(),
        "read HD6 regions"
    );

    Ok(Hd6Index::new(header, name_table, filename_table, entries))
}

/// Regions may be separated by padding; pointers behind the cursor are ignored.
fn seek_forward<B>(cursor: &mut ByteCursor<B>, target: usize)
where
    B: AsRef<[u8]>,
{
    let position = cursor.position();
    if target > position {
        cursor.skip(target - position);
    }
}

fn read_region<B>(cursor: &mut ByteCursor<B>, size: usize, region: &'static str) -> Result<Vec<u8>>
where
    B: AsRef<[u8]>,
{
    if size > cursor.remaining() {
        return Err(Hd6Error::Truncated {
            region,
            needed: size,
            available: cursor.remaining(),
        });
    }
    Ok(cursor.read_bytes(size)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hd6::FileEntry;
    use crate::name::NameForm;
    use crate::write::Hd6Writer;

    fn sample_index(region_alignment: usize) -> Vec<u8> {
        let mut writer = Hd6Writer::new().region_alignment(region_alignment);
        for name in ["a", "b", "c"] {
            let codes = writer.add_name(name);
            writer.add_entry(&codes, FileEntry::new(0, 1));
        }
        writer.finish().unwrap().0
    }

    #[test]
    fn test_read_index() {
        let data = sample_index(1);
        let index = read_index(&data).unwrap();
        assert_eq!(index.header().raw_file_count(), 4);
        assert_eq!(index.file_count(), 3);
        assert_eq!(index.name_table().fragment_count(), 3);
        assert_eq!(index.decode_names(NameForm::Stored).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_read_with_gaps() {
        let dense = read_index(&sample_index(1)).unwrap();
        let padded_bytes = sample_index(0x100);
        let padded = read_index(&padded_bytes).unwrap();
        assert_eq!(padded.header().filename_table_ptr() % 0x100, 0);
        assert_eq!(padded.header().file_entries_ptr() % 0x100, 0);
        assert_eq!(
            padded.decode_names(NameForm::Stored).unwrap(),
            dense.decode_names(NameForm::Stored).unwrap()
        );
        assert_eq!(padded.entries(), dense.entries());
    }

    #[test]
    fn test_pointer_behind_cursor() {
        let mut data = sample_index(1);
        // point the filename table back at the header; the reader must not seek backward
        let ptr = u32::from_le_bytes(data[20..24].try_into().unwrap());
        data[20..24].copy_from_slice(&0u32.to_le_bytes());
        let index = read_index(&data).unwrap();
        assert_eq!(index.header().filename_table_ptr(), 0);
        assert_eq!(index.decode_names(NameForm::Stored).unwrap(), vec!["a", "b", "c"]);
        assert_eq!(ptr as usize, RawHeader::SIZE + index.name_table().data().len());
    }

    #[test]
    fn test_read_idempotent() {
        let data = sample_index(0x10);
        let first = read_index(&data).unwrap();
        let second = read_index(&data).unwrap();
        assert_eq!(first.listing().unwrap(), second.listing().unwrap());
    }

    #[test]
    fn test_bad_magic() {
        let mut data = sample_index(1);
        data[2] = b'5';
        let err = read_index(&data).unwrap_err();
        assert!(matches!(err, Hd6Error::InvalidMagic { .. }));
    }

    #[test]
    fn test_truncated_entries() {
        let data = sample_index(1);
        let err = read_index(&data[..data.len() - 12]).unwrap_err();
        assert!(matches!(
            err,
            Hd6Error::Truncated {
                region: "file entry table",
                needed: 24,
                ..
            }
        ));
        assert!(err.is_format_error());
    }
}
