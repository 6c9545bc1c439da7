use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::error::{Hd6Error, Result};
use crate::hd6::{FileEntry, Hd6Index, ListEntry};
use crate::name::NameForm;
use crate::read;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatBackend {
    /// Use `memmap2` memory mapping.
    #[default]
    Mmap,
    /// Use regular file IO.
    File,
}

#[derive(Debug, Default)]
pub struct Hd6ArchiveBuilder {
    backend: DatBackend,
}

impl Hd6ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: DatBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn mmap(mut self, enabled: bool) -> Self {
        self.backend = if enabled { DatBackend::Mmap } else { DatBackend::File };
        self
    }

    pub fn open(self, dat_path: impl AsRef<Path>, hd6_path: impl AsRef<Path>) -> Result<Hd6Archive> {
        Hd6Archive::open_with_backend(dat_path, hd6_path, self.backend)
    }
}

/// A DAT file together with the HD6 index describing it. Read-only.
pub struct Hd6Archive {
    dat_path: PathBuf,
    hd6_path: PathBuf,
    index: Hd6Index,
    backend: DatBackend,
    dat_len: u64,
    inner: DatInner,
}

enum DatInner {
    Mmap { mmap: Mmap },
    File { file: File },
}

impl Hd6Archive {
    pub fn builder() -> Hd6ArchiveBuilder {
        Hd6ArchiveBuilder::new()
    }

    pub fn open(dat_path: impl AsRef<Path>, hd6_path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_backend(dat_path, hd6_path, DatBackend::default())
    }

    pub fn open_with_backend(
        dat_path: impl AsRef<Path>,
        hd6_path: impl AsRef<Path>,
        backend: DatBackend,
    ) -> Result<Self> {
        let dat_path = canonicalize(dat_path.as_ref())?;
        let hd6_path = canonicalize(hd6_path.as_ref())?;

        let index = read::read_index_file(&hd6_path)?;

        let file = File::open(&dat_path)?;
        let dat_len = file.metadata()?.len();
        let inner = match backend {
            // mapping an empty file fails on some platforms
            DatBackend::Mmap if dat_len > 0 => {
                // SAFETY: read-only mapping; the file is held for the lifetime of the mmap.
                let mmap = unsafe { MmapOptions::new().map(&file)? };
                DatInner::Mmap { mmap }
            }
            _ => DatInner::File { file },
        };
        debug!(dat = %dat_path.display(), dat_len, files = index.file_count(), ?backend, "opened archive");

        Ok(Self {
            dat_path,
            hd6_path,
            index,
            backend,
            dat_len,
            inner,
        })
    }

    pub fn dat_path(&self) -> &Path {
        &self.dat_path
    }

    pub fn hd6_path(&self) -> &Path {
        &self.hd6_path
    }

    pub fn index(&self) -> &Hd6Index {
        &self.index
    }

    pub fn backend(&self) -> DatBackend {
        self.backend
    }

    pub fn dat_len(&self) -> u64 {
        self.dat_len
    }

    pub fn names(&self, form: NameForm) -> Result<Vec<String>> {
        self.index.decode_names(form)
    }

    pub fn listing(&self) -> Result<Vec<ListEntry>> {
        self.index.listing()
    }

    /// Contents of the entry at `index`.
    pub fn entry_data(&self, index: usize) -> Result<Vec<u8>> {
        let entry = self.index.entry(index)?;
        self.read_entry(entry)
    }

    pub fn read_entry(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        let range = entry.checked_range(self.dat_len)?;
        match &self.inner {
            DatInner::Mmap { mmap } => Ok(mmap[range].to_vec()),
            DatInner::File { file } => {
                let mut f = file.try_clone()?;
                f.seek(SeekFrom::Start(range.start as u64))?;
                let mut data = vec![0; range.len()];
                f.read_exact(&mut data)?;
                Ok(data)
            }
        }
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .map_err(|e| Hd6Error::IO(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::write::Hd6Writer;

    fn write_archive(dir: &Path) -> (PathBuf, PathBuf) {
        let mut writer = Hd6Writer::new();
        writer.add_file("data\\one.bin", b"first file").unwrap();
        writer.add_file("data\\two.bin", &[7; 40]).unwrap();
        let (hd6, dat) = writer.finish().unwrap();

        let dat_path = dir.join("data.dat");
        let hd6_path = dir.join("data.hd6");
        std::fs::write(&dat_path, dat).unwrap();
        std::fs::write(&hd6_path, hd6).unwrap();
        (dat_path, hd6_path)
    }

    #[test]
    fn test_entry_data_backends() {
        let dir = tempfile::tempdir().unwrap();
        let (dat_path, hd6_path) = write_archive(dir.path());

        for backend in [DatBackend::Mmap, DatBackend::File] {
            let archive = Hd6Archive::builder().backend(backend).open(&dat_path, &hd6_path).unwrap();
            assert_eq!(archive.backend(), backend);
            let first = archive.entry_data(0).unwrap();
            assert_eq!(first.len(), 16);
            assert_eq!(&first[..10], b"first file");
            let mut second = vec![7u8; 40];
            second.resize(48, 0);
            assert_eq!(archive.entry_data(1).unwrap(), second);
            assert!(matches!(archive.entry_data(2), Err(Hd6Error::EntryIndexOutOfBounds(2))));
        }
    }

    #[test]
    fn test_entry_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let (dat_path, hd6_path) = write_archive(dir.path());
        // cut the DAT short so the second entry overruns it
        let dat = std::fs::read(&dat_path).unwrap();
        std::fs::write(&dat_path, &dat[..2048 + 16]).unwrap();

        let archive = Hd6Archive::open(&dat_path, &hd6_path).unwrap();
        assert!(archive.entry_data(0).is_ok());
        assert!(matches!(
            archive.entry_data(1),
            Err(Hd6Error::InvalidEntryRange {
                offset: 2048,
                size: 48,
                file_size: 2064
            })
        ));
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let (dat_path, _) = write_archive(dir.path());
        let err = Hd6Archive::open(&dat_path, dir.path().join("missing.hd6")).err().unwrap();
        assert!(matches!(err, Hd6Error::IO(_)));
    }

    #[test]
    fn test_names() {
        let dir = tempfile::tempdir().unwrap();
        let (dat_path, hd6_path) = write_archive(dir.path());
        let archive = Hd6Archive::open(&dat_path, &hd6_path).unwrap();
        assert_eq!(archive.names(NameForm::Stored).unwrap(), vec!["data\\one.bin", "data\\two.bin"]);
        assert_eq!(archive.names(NameForm::Stored).unwrap(), archive.names(NameForm::Stored).unwrap());
    }
}
