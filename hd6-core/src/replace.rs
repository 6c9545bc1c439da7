//! Same-slot content replacement.
//!
//! The new content is padded to 16 bytes and spliced over the target's byte range
//! in the DAT file. The target keeps its offset and gets a new size; every entry
//! after it in table order has its offset shifted by the size difference.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::cursor::ByteCursor;
use crate::error::{Hd6Error, Result};
use crate::hd6::{Hd6Index, SIZE_ALIGNMENT, decode_offset};
use crate::raw::RawFileEntry;
use crate::read;
use crate::write::align_up;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub target_index: usize,
    pub old_offset: u64,
    pub old_size: u64,
    pub padded_size: u64,
    pub delta: i64,
    /// Shifted entries whose new offset is not 2048-aligned.
    pub misaligned: usize,
}

#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    pub dat: Vec<u8>,
    pub hd6: Vec<u8>,
    pub summary: ReplaceSummary,
}

/// Zero-pad `data` to the next multiple of 16 bytes.
pub fn pad_to_16(mut data: Vec<u8>) -> Vec<u8> {
    let len = align_up(data.len(), SIZE_ALIGNMENT as usize);
    data.resize(len, 0);
    data
}

/// Produce new DAT and HD6 buffers with `target` holding `new_content`.
///
/// `index` must have been read from `hd6`.
pub fn replace_in_buffers(
    index: &Hd6Index,
    dat: &[u8],
    hd6: &[u8],
    target: &str,
    new_content: Vec<u8>,
) -> Result<ReplaceOutcome> {
    let target_index = index.find(target)?;
    let target_entry = *index.entry(target_index)?;
    let old_offset = target_entry.offset();
    let old_size = target_entry.size();
    info!(target, old_offset, old_size, "replacing file");

    let content = pad_to_16(new_content);
    let padded_size = content.len() as u64;
    let delta = padded_size as i64 - old_size as i64;
    let resized_target = target_entry.with_size(padded_size)?;
    info!(padded_size, delta, "new file size (aligned)");

    let range = target_entry.checked_range(dat.len() as u64)?;

    let mut new_dat = Vec::with_capacity((dat.len() as i64 + delta).max(0) as usize);
    new_dat.extend_from_slice(&dat[..range.start]);
    new_dat.extend_from_slice(&content);
    new_dat.extend_from_slice(&dat[range.end..]);

    let table_start = index.header().file_entries_ptr() as usize;
    let table_end = table_start + index.file_count() * RawFileEntry::SIZE;
    if table_end > hd6.len() {
        return Err(Hd6Error::Truncated {
            region: "file entry table",
            needed: table_end,
            available: hd6.len(),
        });
    }

    let mut new_hd6 = hd6.to_vec();
    let mut cursor = ByteCursor::new(&mut new_hd6[..]);
    let mut misaligned = 0usize;
    for (i, entry) in index.entries().iter().enumerate() {
        let updated = if i == target_index {
            resized_target
        } else if i > target_index {
            let new_offset = entry.offset() as i64 + delta;
            let shifted = entry.with_offset(new_offset);
            if decode_offset(shifted.stored_offset()) as i64 != new_offset {
                misaligned += 1;
                debug!(entry = i, new_offset, "shifted offset is not 2048-aligned");
            }
            shifted
        } else {
            continue;
        };

        // skip the two leading bytes of the record
        cursor.set_position(table_start + i * RawFileEntry::SIZE + 2);
        cursor.write_u24(updated.stored_offset())?;
        cursor.write_u24(updated.stored_size())?;
    }

    if misaligned > 0 {
        warn!(
            misaligned,
            delta, "shifted offsets are not 2048-aligned and will read back rounded down"
        );
    }

    Ok(ReplaceOutcome {
        dat: new_dat,
        hd6: new_hd6,
        summary: ReplaceSummary {
            target_index,
            old_offset,
            old_size,
            padded_size,
            delta,
            misaligned,
        },
    })
}

/// Replace `target` with the contents of `new_file` and rewrite both archive files.
///
/// Both files are written to temporaries first and then renamed, DAT before HD6.
/// If the DAT rename succeeds and the HD6 rename fails, [`Hd6Error::PartialCommit`]
/// is returned and the pair on disk is inconsistent.
pub fn replace_file(
    dat_path: impl AsRef<Path>,
    hd6_path: impl AsRef<Path>,
    target: &str,
    new_file: impl AsRef<Path>,
) -> Result<ReplaceSummary> {
    let dat_path = dat_path.as_ref();
    let hd6_path = hd6_path.as_ref();

    let hd6 = read_source(hd6_path)?;
    let index = read::read_index(&hd6)?;
    let new_content = read_source(new_file.as_ref())?;
    let dat = read_source(dat_path)?;

    let outcome = replace_in_buffers(&index, &dat, &hd6, target, new_content)?;
    commit_pair(dat_path, &outcome.dat, hd6_path, &outcome.hd6, |from, to| {
        std::fs::rename(from, to)
    })?;
    info!(dat = %dat_path.display(), hd6 = %hd6_path.display(), "archive updated");

    Ok(outcome.summary)
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Hd6Error::IO(io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_temp(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file: File = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    file.write_all(data)?;
    file.flush()?;
    file.sync_all()
}

fn commit_pair<F>(dat_path: &Path, dat: &[u8], hd6_path: &Path, hd6: &[u8], mut rename: F) -> Result<()>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    let dat_temp = temp_path(dat_path);
    let hd6_temp = temp_path(hd6_path);
    let cleanup = || {
        let _ = std::fs::remove_file(&dat_temp);
        let _ = std::fs::remove_file(&hd6_temp);
    };

    if let Err(e) = write_temp(&dat_temp, dat).and_then(|_| write_temp(&hd6_temp, hd6)) {
        cleanup();
        return Err(e.into());
    }

    if let Err(e) = rename(&dat_temp, dat_path) {
        cleanup();
        return Err(e.into());
    }
    debug!(path = %dat_path.display(), "DAT file committed");

    if let Err(e) = rename(&hd6_temp, hd6_path) {
        error!(
            dat = %dat_path.display(),
            hd6 = %hd6_path.display(),
            pending = %hd6_temp.display(),
            "DAT file was replaced but HD6 file was not, archive is inconsistent"
        );
        return Err(Hd6Error::PartialCommit {
            committed: dat_path.to_path_buf(),
            pending: hd6_path.to_path_buf(),
            source: e,
        });
    }
    debug!(path = %hd6_path.display(), "HD6 file committed");

    Ok(())
}
