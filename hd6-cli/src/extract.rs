use std::time::Duration;

use anyhow::Context;
use hd6_core::datfile::Hd6Archive;
use hd6_core::extract::ExtractEvent;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;

use crate::ExtractCommand;

pub fn extract(cmd: &ExtractCommand) -> anyhow::Result<()> {
    let filter = cmd
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("Invalid filter pattern")?;

    let archive = Hd6Archive::builder()
        .mmap(!cmd.no_mmap)
        .open(&cmd.dat, &cmd.hd6)
        .with_context(|| format!("Failed to open archive `{}`", cmd.hd6.display()))?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar().template("{pos}/{len} files written {wide_bar} elapsed: {elapsed} eta: {eta}")?,
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.println(format!("Output directory: `{}`", cmd.output.display()));

    let bar1 = bar.clone();
    let mut extractor = archive
        .extractor(&cmd.output)
        .overwrite(!cmd.skip_existing)
        .continue_on_error(cmd.continue_on_error)
        .on_event(move |event| match event {
            ExtractEvent::Start { total } => bar1.set_length(total as u64),
            ExtractEvent::FileDone { path, error, .. } => {
                if let Some(error) = error {
                    bar1.println(format!("Error writing `{}`: {}", path.display(), error));
                }
                bar1.inc(1);
            }
            ExtractEvent::Skipped { .. } => bar1.inc(1),
            ExtractEvent::Finish { .. } => {}
        });
    if let Some(filter) = filter {
        extractor = extractor.filter(move |item| filter.is_match(&item.name));
    }

    let result = extractor.run();
    bar.finish();
    let report = result.context("Extraction failed")?;

    if report.failed > 0 {
        println!(
            "Done with {} errors ({} written, {} skipped)",
            report.failed, report.extracted, report.skipped
        );
    } else {
        println!("Done. {} written, {} skipped", report.extracted, report.skipped);
    }

    Ok(())
}
