//! Command-line front end for the sequence-encoder fixture corpus.
//!
//! ```text
//! seq-corpus generate [-o DIR] [--only NAME]...
//! seq-corpus verify   [-o DIR]
//! seq-corpus list
//! ```
//!
//! Logging goes through `tracing`; set `RUST_LOG=debug` for per-scenario
//! detail.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use seq_corpus::{Corpus, OutputDir, Report};
use seq_events::TICKS_PER_BEAT;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seq-corpus")]
#[command(about = "Generate MIDI fixtures that probe a sequence encoder's opcode boundaries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write every fixture (or the named ones) into the output directory
    Generate {
        /// Output directory for the .mid files
        #[arg(short, long, default_value = "midi_test_files")]
        output: PathBuf,
        /// Only generate these scenarios (repeatable)
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,
    },
    /// Re-read the fixtures and check they match the table exactly
    Verify {
        /// Directory holding the .mid files
        #[arg(short, long, default_value = "midi_test_files")]
        output: PathBuf,
    },
    /// Print each scenario with its timing profile
    List,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let cli = Cli::parse();
    let corpus = Corpus::build();

    match cli.command {
        Commands::Generate { output, only } => {
            let dir = OutputDir::prepare(&output)?;
            info!(dir = %dir.path().display(), ticks_per_beat = TICKS_PER_BEAT, "generating corpus");
            let report = corpus
                .generate(&dir, &only)
                .context("selecting scenarios")?;
            Ok(finish("generated", &report))
        }
        Commands::Verify { output } => {
            info!(dir = %output.display(), "verifying corpus");
            let report = corpus.verify(&output);
            Ok(finish("verified", &report))
        }
        Commands::List => {
            list(&corpus);
            Ok(if corpus.rejected().is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn finish(verb: &str, report: &Report) -> ExitCode {
    for (name, e) in &report.failures {
        error!(scenario = *name, "{e}");
    }
    if report.is_success() {
        info!("{} {} fixtures", verb, report.done.len());
        ExitCode::SUCCESS
    } else {
        error!("{} {} fixtures, {} failed", verb, report.done.len(), report.failures.len());
        ExitCode::FAILURE
    }
}

fn list(corpus: &Corpus) {
    for s in corpus.scenarios() {
        let p = s.profile();
        println!("{:<16} {}", s.name(), s.file_name());
        println!("  {}", s.intent());
        println!(
            "  tempo {} BPM ({} µs/beat), length {} ticks, channels {:?}",
            s.tempo().bpm(),
            s.tempo().micros_per_beat(),
            p.length,
            p.channels,
        );
        for g in &p.gates {
            println!(
                "  gate ch{} key {:<3} @{:<5} {:>5} ticks  {}{}",
                g.channel,
                g.key,
                g.start,
                g.ticks,
                seq_events::TimingClass::of(g.ticks),
                if g.retriggered { " (retriggered)" } else { "" },
            );
        }
        let targets: Vec<String> = s.targets().iter().map(ToString::to_string).collect();
        println!("  targets: {}", targets.join(", "));
        for ev in s.events() {
            println!("    {ev}");
        }
        println!();
    }
    for (name, e) in corpus.rejected() {
        println!("{name:<16} REJECTED: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn defaults_to_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn rust_log_can_raise_the_level() {
        assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            log_filter(Some("seq_corpus=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn rust_log_can_lower_the_level() {
        assert_eq!(log_filter(Some("warn")).max_level_hint(), Some(LevelFilter::WARN));
    }
}
