mod extract;
mod list;
mod package;
mod replace;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Show debug logs (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract every file of a DAT/HD6 pair
    Extract(ExtractCommand),
    /// Replace one file of a DAT/HD6 pair in place
    Replace(ReplaceCommand),
    /// List the files indexed by an HD6 file
    List(ListCommand),
    /// Inspect linked-list packages (.pak, .mpk, ...)
    #[command(subcommand)]
    Package(PackageCommand),
}

#[derive(Debug, Args)]
struct ExtractCommand {
    /// Input DAT file path
    dat: PathBuf,
    /// Input HD6 file path
    hd6: PathBuf,
    /// Output directory path
    output: PathBuf,
    /// Read the DAT file with regular IO instead of memory mapping
    #[arg(long)]
    no_mmap: bool,
    /// Keep files that already exist in the output directory
    #[arg(long)]
    skip_existing: bool,
    /// Only extract files whose stored name matches this regex
    #[arg(short, long)]
    filter: Option<String>,
    /// Keep extracting after a file fails to write
    #[arg(long)]
    continue_on_error: bool,
}

#[derive(Debug, Args)]
struct ReplaceCommand {
    /// DAT file path, rewritten in place
    dat: PathBuf,
    /// HD6 file path, rewritten in place
    hd6: PathBuf,
    /// Stored name of the file to replace, e.g. `field\m01.mpk`
    target: String,
    /// File holding the new content
    new_file: PathBuf,
}

#[derive(Debug, Args)]
struct ListCommand {
    /// Input HD6 file path
    hd6: PathBuf,
    /// Print the listing as JSON
    #[arg(long)]
    json: bool,
    /// Only list files whose stored name matches this regex
    #[arg(short, long)]
    filter: Option<String>,
}

#[derive(Debug, Subcommand)]
enum PackageCommand {
    /// List the files of a package
    List {
        /// Input package path
        input: PathBuf,
    },
    /// Extract the files of a package
    Extract {
        /// Input package path
        input: PathBuf,
        /// Output directory path
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Extract(cmd) => extract::extract(cmd),
        Command::Replace(cmd) => replace::replace(cmd),
        Command::List(cmd) => list::list(cmd),
        Command::Package(cmd) => package::package(cmd),
    }
}
