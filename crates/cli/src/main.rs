mod cmd;
mod logging;

use clap::Parser;
use std::path::PathBuf;

use crate::logging::Verbosity;

#[derive(Debug, Parser)]
#[command(
    name = "vaultpack",
    version,
    about = "Pack a markdown vault into a flat, link-consistent zip archive"
)]
struct Cli {
    /// Vault directory to export
    #[arg(default_value = "./vault")]
    vault: PathBuf,

    /// Archive file to write
    #[arg(default_value = "./anytype_export.zip")]
    output: PathBuf,

    /// Config file (defaults to ~/.config/vaultpack/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show per-entry debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let verbosity = match (cli.verbose, cli.quiet) {
        (true, _) => Verbosity::Verbose,
        (_, true) => Verbosity::Quiet,
        _ => Verbosity::Normal,
    };

    cmd::export::run(&cmd::export::ExportArgs {
        vault: cli.vault,
        output: cli.output,
        config: cli.config,
        verbosity,
        json: cli.json,
    });
}
