use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::datfile::{DatBackend, Hd6Archive};
use crate::error::Result;
use crate::hd6::{FileEntry, ListEntry};
use crate::name::relative_host_path;

type EntryFilter = dyn Fn(&ListEntry) -> bool + Send + Sync;

#[derive(Debug, Clone)]
pub enum ExtractEvent {
    Start {
        total: usize,
    },
    FileDone {
        index: usize,
        path: PathBuf,
        error: Option<String>,
    },
    /// The output file already existed and overwriting is disabled.
    Skipped {
        index: usize,
        path: PathBuf,
    },
    Finish {
        extracted: usize,
        skipped: usize,
        failed: usize,
    },
}

#[derive(Debug, Default)]
pub struct ExtractReport {
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<(usize, PathBuf, String)>,
}

pub struct ExtractBuilder<'a> {
    archive: &'a Hd6Archive,
    output_dir: PathBuf,
    overwrite: bool,
    continue_on_error: bool,
    filter: Option<Arc<EntryFilter>>,
    on_event: Option<Arc<dyn Fn(ExtractEvent) + Send + Sync>>,
}

impl<'a> ExtractBuilder<'a> {
    pub fn new(archive: &'a Hd6Archive, output_dir: impl AsRef<Path>) -> Self {
        Self {
            archive,
            output_dir: output_dir.as_ref().to_path_buf(),
            overwrite: true,
            continue_on_error: false,
            filter: None,
            on_event: None,
        }
    }

    /// Replace files that already exist in the output directory. Enabled by default;
    /// when disabled, existing files are left alone and counted as skipped.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Keep going after a file fails to write. Disabled by default: the first
    /// failure aborts the whole extraction.
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ListEntry) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn on_event<F>(mut self, on_event: F) -> Self
    where
        F: Fn(ExtractEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    pub fn run(self) -> Result<ExtractReport> {
        let index = self.archive.index();
        let listing = index.listing()?;

        let mut tasks: Vec<(usize, FileEntry, PathBuf)> = Vec::new();
        let mut skipped = 0usize;
        for (item, entry) in listing.iter().zip(index.entries()) {
            if let Some(filter) = &self.filter
                && !filter(item)
            {
                skipped += 1;
                continue;
            }
            tasks.push((item.index, *entry, relative_host_path(&item.name)));
        }

        // an index that disagrees with the DAT file aborts before anything is written
        for (_, entry, _) in &tasks {
            entry.checked_range(self.archive.dat_len())?;
        }

        if !self.output_dir.exists() {
            info!(path = %self.output_dir.display(), "creating output directory");
            std::fs::create_dir_all(&self.output_dir)?;
        }

        self.emit(ExtractEvent::Start { total: tasks.len() });

        let mut report = ExtractReport {
            skipped,
            ..Default::default()
        };
        for (entry_index, entry, rel_path) in &tasks {
            let out_path = self.output_dir.join(rel_path);
            if !self.overwrite && out_path.exists() {
                debug!(index = entry_index, path = %out_path.display(), "exists, skipped");
                report.skipped += 1;
                self.emit(ExtractEvent::Skipped {
                    index: *entry_index,
                    path: rel_path.clone(),
                });
                continue;
            }
            match self.extract_one(entry, &out_path) {
                Ok(()) => {
                    debug!(index = entry_index, path = %out_path.display(), size = entry.size(), "written");
                    report.extracted += 1;
                    self.emit(ExtractEvent::FileDone {
                        index: *entry_index,
                        path: rel_path.clone(),
                        error: None,
                    });
                }
                Err(e) => {
                    let msg = e.to_string();
                    report.failed += 1;
                    report.errors.push((*entry_index, rel_path.clone(), msg.clone()));
                    self.emit(ExtractEvent::FileDone {
                        index: *entry_index,
                        path: rel_path.clone(),
                        error: Some(msg),
                    });
                    if !self.continue_on_error {
                        return Err(e);
                    }
                }
            }
        }

        info!(
            extracted = report.extracted,
            skipped = report.skipped,
            failed = report.failed,
            "extraction finished"
        );
        self.emit(ExtractEvent::Finish {
            extracted: report.extracted,
            skipped: report.skipped,
            failed: report.failed,
        });

        Ok(report)
    }

    fn emit(&self, event: ExtractEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }

    fn extract_one(&self, entry: &FileEntry, out_path: &Path) -> Result<()> {
        if let Some(parent) = out_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let data = self.archive.read_entry(entry)?;

        let mut open_options = OpenOptions::new();
        if self.overwrite {
            open_options.create(true).write(true).truncate(true);
        } else {
            open_options.create_new(true).write(true);
        }
        let mut file = open_options.open(out_path)?;
        file.write_all(&data)?;
        file.flush()?;

        Ok(())
    }
}

impl Hd6Archive {
    pub fn extractor(&self, output_dir: impl AsRef<Path>) -> ExtractBuilder<'_> {
        ExtractBuilder::new(self, output_dir)
    }
}

/// Open `dat_path`/`hd6_path` and write every entry below `output_dir`.
pub fn extract_archive(
    dat_path: impl AsRef<Path>,
    hd6_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<ExtractReport> {
    let archive = Hd6Archive::builder()
        .backend(DatBackend::default())
        .open(dat_path, hd6_path)?;
    archive.extractor(output_dir).run()
}
