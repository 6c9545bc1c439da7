use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Hd6Error>;

#[derive(Debug, thiserror::Error)]
pub enum Hd6Error {
    #[error("Upstream IO Error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Invalid HD6 file magic: expected {expected:X?}, found {found:X?}")]
    InvalidMagic { expected: [u8; 3], found: [u8; 3] },
    #[error("Truncated {region}: need {needed} bytes, {available} available")]
    Truncated {
        region: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("Invalid file count in header: {0}")]
    InvalidFileCount(u32),
    #[error("Invalid name code in entry {entry}: fragment {fragment} of {fragment_count}")]
    InvalidNameCode {
        entry: usize,
        fragment: usize,
        fragment_count: usize,
    },

    #[error("File `{0}` not found in index")]
    FileNotFound(String),
    #[error("Entry index out of bounds: {0}")]
    EntryIndexOutOfBounds(usize),

    #[error("Invalid entry range: offset={offset}, size={size}, file_size={file_size}")]
    InvalidEntryRange { offset: u64, size: u64, file_size: u64 },
    #[error("Value {value:#X} does not fit a 24-bit {field} field")]
    SizeOverflow { field: &'static str, value: u64 },

    #[error("Invalid package entry `{name}` at {header_offset}: data offset={offset}, size={size}")]
    InvalidPackageEntry {
        name: String,
        header_offset: usize,
        offset: i64,
        size: i64,
    },
    #[error("Package entry name `{name}` is longer than {max} bytes")]
    NameTooLong { name: String, max: usize },

    #[error(
        "Archive left inconsistent: `{}` was written but `{}` was not: {source}",
        committed.display(),
        pending.display()
    )]
    PartialCommit {
        committed: PathBuf,
        pending: PathBuf,
        source: std::io::Error,
    },
}

impl Hd6Error {
    /// Whether this error means the index itself could not be understood.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Hd6Error::InvalidMagic { .. }
                | Hd6Error::Truncated { .. }
                | Hd6Error::InvalidFileCount(_)
                | Hd6Error::InvalidNameCode { .. }
        )
    }
}
