use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use fast5extract::{
    DefaultSource, Error, Extractor, Mode, ModeOptions, QualityGate, DEFAULT_EXTENSION,
    DEFAULT_MEDIAN_WINDOW, DEFAULT_PASS, MODES,
};

/// Extracts events, sequences, telemetry or raw signal from nanopore fast5 files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, after_help = modes_help())]
struct Cli {
    /// Output mode (one of the modes listed below)
    mode: String,

    /// A fast5 file, or a directory searched recursively for fast5 files
    path: PathBuf,

    /// Analysis pass id (the suffix of `EventDetection_000`, `Basecall_1D_000`, ...)
    #[arg(long, default_value = DEFAULT_PASS)]
    call_id: String,

    /// Running median window for `rawsmooth` (odd)
    #[arg(long, default_value_t = DEFAULT_MEDIAN_WINDOW)]
    window: usize,

    /// Emit every single-strand fastq block, whatever its samples per base
    #[arg(long, default_value_t = false)]
    no_gate: bool,

    /// Extension of the files processed in directory mode
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Log level
    #[arg(long, default_value = "warn", value_parser = LOG_LEVELS)]
    log_level: String,
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn modes_help() -> String {
    let mut help = String::from("Modes:\n");
    for (name, about) in MODES {
        help.push_str(&format!("  {name:<10} {about}\n"));
    }
    help
}

fn run(cli: &Cli) -> Result<()> {
    let options = ModeOptions {
        window: cli.window,
        gate: if cli.no_gate {
            QualityGate::Disabled
        } else {
            QualityGate::Enabled
        },
    };
    let mode = Mode::parse(&cli.mode, &options)?;
    log::debug!("Extracting {mode} (pass {}) from {}", cli.call_id, cli.path.display());

    let mut extractor = Extractor::new(DefaultSource, mode)
        .with_pass(cli.call_id.as_str())
        .with_extension(cli.extension.as_str());
    let mut writer = BufWriter::new(io::stdout().lock());
    extractor.run(&cli.path, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.downcast_ref::<Error>().is_some_and(Error::is_usage) {
                eprintln!("\n{}", Cli::command().render_help());
            }
            ExitCode::FAILURE
        }
    }
}
