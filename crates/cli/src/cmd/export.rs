//! The export command.

use std::fs;
use std::path::PathBuf;

use vaultpack_core::archive::ZipSink;
use vaultpack_core::config::ConfigLoader;
use vaultpack_core::convert::Converter;

use super::summary;
use crate::logging::{self, Verbosity};

#[derive(Debug)]
pub struct ExportArgs {
    pub vault: PathBuf,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub verbosity: Verbosity,
    pub json: bool,
}

/// Run one export. Exits with status 1 on a bad vault path, a config error
/// or an archive failure.
pub fn run(args: &ExportArgs) {
    let cfg = match ConfigLoader::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    logging::init(&cfg, args.verbosity);
    if let Some(source) = &cfg.source {
        tracing::debug!("using config {}", source.display());
    }

    // Checked before the archive file exists so a bad path leaves nothing behind.
    let converter = match Converter::new(&args.vault, cfg.export.clone()) {
        Ok(converter) => converter,
        Err(e) => {
            eprintln!("Invalid vault path: {e}");
            fail();
        }
    };

    let mut sink = match ZipSink::create(&args.output) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Failed to create archive: {e}");
            fail();
        }
    };

    // The archive may live inside the vault; never pack it into itself.
    let mut converter = converter.skip_output(sink.path());

    match converter.run(&mut sink) {
        Ok(report) => {
            summary::print(&report, &args.output, args.json);
            logging::shutdown();
        }
        Err(e) => {
            eprintln!("Export failed: {e}");
            drop(sink);
            if let Err(rm) = fs::remove_file(&args.output) {
                tracing::debug!("could not remove partial archive: {}", rm);
            }
            fail();
        }
    }
}

fn fail() -> ! {
    logging::shutdown();
    std::process::exit(1);
}
