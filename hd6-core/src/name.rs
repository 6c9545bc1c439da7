//! Filename reconstruction from the name dictionary.
//!
//! The name chunk is a run of null-terminated fragments. Each file's name is a
//! null-terminated sequence of fragment references in the filename code table:
//! - `0x00..=0x7F`: one byte, the fragment index itself
//! - `b1 & 0x80 != 0`: two bytes, index `(b1 | b2 << 8) - (b2 + 1) * 0x80`
//!
//! Path separators are fragments like any other; the decoder inserts nothing.

use std::io;
use std::path::PathBuf;

use tracing::warn;

use crate::cursor::{ByteCursor, TextEncoding};
use crate::error::{Hd6Error, Result};

pub const STORED_SEPARATOR: char = '\\';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameForm {
    /// Exactly as stored, with `\` separators. Use this to address entries.
    #[default]
    Stored,
    /// Separators replaced with the host path separator.
    Host,
}

#[derive(Debug, Clone, Default)]
pub struct NameTable {
    data: Vec<u8>,
    offsets: Vec<usize>,
}

impl NameTable {
    pub fn new(data: Vec<u8>) -> Self {
        let offsets = fragment_offsets(&data);
        Self { data, offsets }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Start of every fragment; the last value is one past the final terminator.
    pub fn fragment_offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of addressable fragments, i.e. the number of terminators.
    pub fn fragment_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Bytes of fragment `index`, without its terminator.
    pub fn fragment(&self, index: usize) -> Option<&[u8]> {
        let start = *self.offsets.get(index)?;
        let next = *self.offsets.get(index + 1)?;
        self.data.get(start..next - 1)
    }

    /// Decode `count` consecutive code runs from the filename code table.
    pub fn decode_all(&self, code_table: &[u8], count: usize, form: NameForm) -> Result<Vec<String>> {
        let mut cursor = ByteCursor::new(code_table);
        let mut names = Vec::with_capacity(count.min(code_table.len()));
        for entry in 0..count {
            let codes = read_code_run(&mut cursor).map_err(|_| Hd6Error::Truncated {
                region: "filename table",
                needed: cursor.position() + 1,
                available: code_table.len(),
            })?;
            names.push(self.decode_name(entry, &codes, form)?);
        }

        Ok(names)
    }

    fn decode_name(&self, entry: usize, codes: &[usize], form: NameForm) -> Result<String> {
        let mut name_bytes = Vec::new();
        for &index in codes {
            let fragment = self.fragment(index).ok_or(Hd6Error::InvalidNameCode {
                entry,
                fragment: index,
                fragment_count: self.fragment_count(),
            })?;
            name_bytes.extend_from_slice(fragment);
        }

        let (name, had_errors) = TextEncoding::ShiftJis.decode_lossy(&name_bytes);
        if had_errors {
            warn!(entry, name = %name, "filename is not valid Shift-JIS, substituted replacement characters");
        }

        Ok(match form {
            NameForm::Stored => name,
            NameForm::Host => to_host_separators(&name),
        })
    }
}

pub fn to_host_separators(name: &str) -> String {
    name.replace(STORED_SEPARATOR, std::path::MAIN_SEPARATOR_STR)
}

/// Relative path for a stored name. Root, prefix and `..` components are dropped
/// so the result always stays below the directory it is joined to.
pub fn relative_host_path(name: &str) -> PathBuf {
    to_host_separators(name)
        .split(std::path::MAIN_SEPARATOR)
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        // drive prefixes
        .filter(|part| !part.ends_with(':'))
        .collect()
}

fn fragment_offsets(data: &[u8]) -> Vec<usize> {
    let mut offsets = vec![0];
    offsets.extend(
        data.iter()
            .enumerate()
            .filter(|(_, b)| **b == 0)
            .map(|(i, _)| i + 1),
    );
    offsets
}

/// Read one null-terminated run of fragment references.
pub fn read_code_run<B>(cursor: &mut ByteCursor<B>) -> io::Result<Vec<usize>>
where
    B: AsRef<[u8]>,
{
    let mut codes = Vec::new();
    loop {
        let b1 = cursor.read_u8()?;
        if b1 == 0 {
            break;
        }

        let index = if b1 & 0x80 != 0 {
            let b2 = cursor.read_u8()?;
            let value = b1 as usize | (b2 as usize) << 8;
            let factor = b2 as usize + 1;
            value - factor * 0x80
        } else {
            b1 as usize
        };
        codes.push(index);
    }

    Ok(codes)
}

/// Encode a fragment reference. Index 0 and indices above 0x7F take two bytes.
pub fn encode_code(index: usize) -> Result<Vec<u8>> {
    match index {
        1..=0x7F => Ok(vec![index as u8]),
        0..=0x7FFF => Ok(vec![0x80 | (index & 0x7F) as u8, (index >> 7) as u8]),
        _ => Err(Hd6Error::SizeOverflow {
            field: "fragment index",
            value: index as u64,
        }),
    }
}
