//! acvloose - loose-load Armored Core V / Verdict Day installs
//!
//! Usage:
//!   acvloose <path>...    - Each path is a game executable (EBOOT.BIN,
//!                           default.xex) or a folder that contains one.
//!
//! There are no flags; behavior is controlled by `acvloose.cfg` next to
//! the executable. A `res/` folder next to the executable holds the
//! per-game filename dictionaries and optional decrypted script copies.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use acvloose::{detect, LoaderConfig, Pipeline, Reporter, StageResult};

const CONFIG_FILE: &str = "acvloose.cfg";
const LOG_FILE: &str = "acvloose.log";
const RES_DIR: &str = "res";

#[derive(Parser)]
#[command(name = "acvloose")]
#[command(version)]
#[command(about = "Unpack Armored Core V / Verdict Day installs into a loose file layout", long_about = None)]
struct Cli {
    /// Game executables or folders containing them
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let program_dir = program_dir();
    let config = LoaderConfig::load(&program_dir.join(CONFIG_FILE))
        .with_context(|| format!("Failed to read {CONFIG_FILE}"))?;

    let mut reporter = if config.log_to_file {
        Reporter::with_log_file(&program_dir.join(LOG_FILE))
            .with_context(|| format!("Failed to open {LOG_FILE}"))?
    } else {
        Reporter::new()
    };

    if cli.paths.is_empty() {
        reporter.info(
            "This program has no GUI.\n\
             Drag and drop EBOOT.BIN or default.xex from your game files onto it, or pass\n\
             one or more paths as arguments. This is used to find your game files.",
        );
        pause(&config);
        return Ok(());
    }

    let mut pipeline = Pipeline::new(&config, program_dir.join(RES_DIR));

    let total = cli.paths.len();
    let mut succeeded = 0;
    for path in &cli.paths {
        match process_argument(&mut pipeline, &config, path, &mut reporter) {
            Ok(()) => succeeded += 1,
            // User mistakes end this argument only; anything else is a
            // real fault and takes the run down with full detail
            Err(e) if e.is_user() => reporter.error(&format!("Error: {e}")),
            Err(e) => {
                reporter.error(&format!("Unexpected error while processing {}", path.display()));
                return Err(e.into());
            }
        }
    }

    reporter.info(&format!("Finished: {succeeded} of {total} paths processed successfully."));
    pause(&config);
    Ok(())
}

fn process_argument(
    pipeline: &mut Pipeline,
    config: &LoaderConfig,
    path: &Path,
    reporter: &mut Reporter,
) -> acvloose::Result<()> {
    reporter.info(&format!("Processing {}...", path.display()));

    let (root, platform) = detect::resolve_root(path, config)?;
    let game = detect::identify_game(platform, &root, config, reporter)?;
    reporter.info(&format!(
        "Detected {game} for {platform} at: {}",
        root.display()
    ));

    let report = pipeline.run(&root, platform, game, reporter)?;

    reporter.info("Stage summary:");
    for (stage, result) in &report {
        let line = match result {
            StageResult::Completed => format!("  {stage}: done"),
            StageResult::Skipped(reason) => format!("  {stage}: skipped ({reason})"),
            StageResult::Warned(reason) => format!("  {stage}: done with warnings ({reason})"),
        };
        reporter.info(&line);
    }

    Ok(())
}

/// Directory the executable runs from; config and resources live here
fn program_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn pause(config: &LoaderConfig) {
    if !config.pause_on_finish {
        return;
    }

    println!("Press Enter to exit...");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}
