use anyhow::Context;
use hd6_core::error::Hd6Error;
use hd6_core::replace::replace_file;

use crate::ReplaceCommand;

pub fn replace(cmd: &ReplaceCommand) -> anyhow::Result<()> {
    let summary = match replace_file(&cmd.dat, &cmd.hd6, &cmd.target, &cmd.new_file) {
        Ok(summary) => summary,
        Err(e @ Hd6Error::PartialCommit { .. }) => {
            return Err(e).context("Restore both files from a backup before using this archive again");
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to replace `{}`", cmd.target)),
    };

    println!(
        "Replaced `{}` (entry {}): {} -> {} bytes, later entries shifted by {}",
        cmd.target, summary.target_index, summary.old_size, summary.padded_size, summary.delta
    );
    if summary.misaligned > 0 {
        println!(
            "Warning: {} shifted entries are not 2048-aligned and may not load correctly",
            summary.misaligned
        );
    }

    Ok(())
}
