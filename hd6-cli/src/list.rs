use anyhow::Context;
use hd6_core::read::read_index_file;
use regex::Regex;

use crate::ListCommand;

pub fn list(cmd: &ListCommand) -> anyhow::Result<()> {
    let filter = cmd
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid filter pattern")?;

    let index = read_index_file(&cmd.hd6).with_context(|| format!("Failed to read index `{}`", cmd.hd6.display()))?;
    let mut listing = index.listing().context("Failed to decode file names")?;
    if let Some(filter) = &filter {
        listing.retain(|item| filter.is_match(&item.name));
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for item in &listing {
        println!("{:>6} {:#010X} {:>10} {}", item.index, item.offset, item.size, item.name);
    }
    println!("{} of {} files", listing.len(), index.file_count());

    Ok(())
}
