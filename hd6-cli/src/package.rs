use anyhow::Context;
use hd6_core::package::Package;

use crate::PackageCommand;

pub fn package(cmd: &PackageCommand) -> anyhow::Result<()> {
    match cmd {
        PackageCommand::List { input } => {
            let package = Package::open(input).with_context(|| format!("Failed to read package `{}`", input.display()))?;
            for entry in package.entries() {
                println!("{} {} bytes", entry.name, entry.size);
            }
        }
        PackageCommand::Extract { input, output } => {
            let package = Package::open(input).with_context(|| format!("Failed to read package `{}`", input.display()))?;
            let written = package
                .extract_all(output)
                .with_context(|| format!("Failed to extract package into `{}`", output.display()))?;
            println!("Done. {} files written to `{}`", written, output.display());
        }
    }

    Ok(())
}
