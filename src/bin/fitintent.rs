//! fitintent CLI
//!
//! Commands:
//! - process: run raw events through the intent pipeline (batch/replay mode)
//! - state: inspect one session in a store snapshot
//! - config: print the active pipeline configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fitintent::{IntentConfig, IntentEngine, IntentError, IntentStore, MemoryStore, RawEvent};
use fitintent::ENGINE_VERSION;

/// fitintent - session purchase-intent scoring engine
#[derive(Parser)]
#[command(name = "fitintent")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score behavioral events into session intent confidence", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run raw events through the intent pipeline (batch/replay mode).
    ///
    /// Event timestamps anchor the scoring windows, so replaying a capture
    /// is deterministic.
    Process {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Pipeline configuration JSON (defaults to production policy)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Load a store snapshot before processing
        #[arg(long)]
        state_in: Option<PathBuf>,

        /// Save the store snapshot after processing
        #[arg(long)]
        state_out: Option<PathBuf>,
    },

    /// Inspect one session in a store snapshot
    State {
        /// Store snapshot path
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Session to inspect
        session_id: String,

        /// How many recent signals to include
        #[arg(long, default_value = "20")]
        recent: usize,
    },

    /// Print the active pipeline configuration
    Config {
        /// Configuration JSON to load (defaults to production policy)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Pipeline(#[from] IntentError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Process {
            input,
            output,
            input_format,
            config,
            state_in,
            state_out,
        } => process(input, output, input_format, config, state_in, state_out),
        Commands::State {
            snapshot,
            session_id,
            recent,
        } => inspect_state(&snapshot, &session_id, recent),
        Commands::Config { file } => print_config(file.as_deref()),
    }
}

fn process(
    input: PathBuf,
    output: PathBuf,
    input_format: InputFormat,
    config: Option<PathBuf>,
    state_in: Option<PathBuf>,
    state_out: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let store = match &state_in {
        Some(path) => MemoryStore::from_json(&fs::read_to_string(path)?)?,
        None => MemoryStore::new(),
    };
    let engine = IntentEngine::new(config, store);

    let events = read_events(&input, &input_format)?;
    let mut out = open_output(&output)?;

    for event in &events {
        let outcome = engine.process_event_at(event, event.timestamp)?;
        serde_json::to_writer(&mut out, &outcome)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    if let Some(path) = state_out {
        fs::write(path, engine.store().to_json()?)?;
    }
    Ok(())
}

fn inspect_state(snapshot: &Path, session_id: &str, recent: usize) -> Result<(), CliError> {
    let store = MemoryStore::from_json(&fs::read_to_string(snapshot)?)?;

    let report = serde_json::json!({
        "session_id": session_id,
        "state": store.intent_state(session_id)?,
        "breakdown": store.signal_breakdown(session_id)?,
        "transitions": store.transitions(session_id)?,
        "recent_signals": store.recent_signals(session_id, recent)?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_config(file: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(file)?;
    println!("{}", config.to_json()?);
    Ok(())
}

fn load_config(file: Option<&Path>) -> Result<IntentConfig, CliError> {
    match file {
        Some(path) => Ok(IntentConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(IntentConfig::default()),
    }
}

fn read_events(input: &Path, format: &InputFormat) -> Result<Vec<RawEvent>, CliError> {
    let mut events = Vec::new();
    match format {
        InputFormat::Ndjson => {
            for line in open_input(input)?.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                events.push(serde_json::from_str(&line)?);
            }
        }
        InputFormat::Json => {
            let mut content = String::new();
            open_input(input)?.read_to_string(&mut content)?;
            events = serde_json::from_str(&content)?;
        }
    }
    Ok(events)
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>, CliError> {
    if path.as_os_str() == "-" {
        Ok(Box::new(io::BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(io::BufReader::new(fs::File::open(path)?)))
    }
}

fn open_output(path: &Path) -> Result<Box<dyn Write>, CliError> {
    if path.as_os_str() == "-" {
        Ok(Box::new(io::BufWriter::new(io::stdout())))
    } else {
        Ok(Box::new(io::BufWriter::new(fs::File::create(path)?)))
    }
}
