use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relict_core::{Clock, EngineConfig, ManualClock, SystemClock};
use relict_memory::SimulationEngine;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch driver for the Relict affect engine", long_about = None)]
struct Cli {
    /// Tunables file (TOML, or JSON by extension)
    #[arg(short, long, env = "RELICT_CONFIG", default_value = "relict.toml", global = true)]
    config: PathBuf,

    /// Persisted state file. Loaded on start, written on save.
    #[arg(short, long, env = "RELICT_STATE", global = true)]
    state: Option<PathBuf>,

    /// RNG seed; overrides the config file
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Feed utterances through the engine and print one decision per line (JSON)
    Replay {
        /// Input script, one utterance per line, optional context after a tab.
        /// Reads stdin when omitted.
        input: Option<PathBuf>,

        /// Use a simulated clock advancing this many seconds per line
        #[arg(long)]
        step: Option<f64>,

        /// Start time of the simulated clock (seconds since epoch)
        #[arg(long, requires = "step")]
        start: Option<f64>,
    },

    /// Print the inspector view of the saved state (JSON)
    Inspect,

    /// Restore defaults, clear memory and overwrite the state file
    Reset,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = EngineConfig::load_or_default(&cli.config);
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    match &cli.command {
        Commands::Replay { input, step, start } => {
            cmd_replay(&cli, config, input.as_deref(), *step, *start)
        }
        Commands::Inspect => cmd_inspect(&cli, config),
        Commands::Reset => cmd_reset(&cli, config),
    }
}

fn build_engine(cli: &Cli, config: EngineConfig, clock: Arc<dyn Clock>) -> SimulationEngine {
    let engine = SimulationEngine::with_clock(config, clock);
    match &cli.state {
        Some(path) => engine.with_persistence(path),
        None => engine,
    }
}

/// Split a script line into `(text, context)` at the first tab.
fn parse_line(line: &str) -> (&str, &str) {
    match line.split_once('\t') {
        Some((text, context)) => (text, context),
        None => (line, ""),
    }
}

fn cmd_replay(
    cli: &Cli,
    config: EngineConfig,
    input: Option<&Path>,
    step: Option<f64>,
    start: Option<f64>,
) -> Result<()> {
    let manual = step.map(|_| ManualClock::new(start.unwrap_or_else(|| SystemClock.now())));
    let clock: Arc<dyn Clock> = match &manual {
        Some(m) => Arc::new(m.clone()),
        None => Arc::new(SystemClock),
    };
    let mut engine = build_engine(cli, config, clock);
    info!("Replaying with seed {}", engine.seed());

    let reader: Box<dyn BufRead> = match input {
        Some(path) => Box::new(io::BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open input script: {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut lines = 0usize;
    for line in reader.lines() {
        let line = line.context("Failed to read input line")?;
        if let (Some(m), Some(step)) = (&manual, step) {
            if lines > 0 {
                m.advance(step);
            }
        }
        let (text, context) = parse_line(&line);
        let record = engine.perceive(text, context);
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
        lines += 1;
    }
    out.flush()?;
    info!("Replayed {} line(s)", lines);

    if engine.state_path().is_some() {
        engine.save().context("Failed to save state")?;
    }
    Ok(())
}

fn cmd_inspect(cli: &Cli, config: EngineConfig) -> Result<()> {
    let engine = build_engine(cli, config, Arc::new(SystemClock));
    let view = engine.inspect();
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn cmd_reset(cli: &Cli, config: EngineConfig) -> Result<()> {
    if cli.state.is_none() {
        anyhow::bail!("reset needs a state file (--state or RELICT_STATE)");
    }
    let mut engine = build_engine(cli, config, Arc::new(SystemClock));
    engine.emergency_reset().context("Failed to write reset state")?;
    info!("State reset");
    Ok(())
}
