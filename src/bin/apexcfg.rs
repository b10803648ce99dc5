// apexcfg
// Inspect, validate and transform Ape-X agent documents

use anyhow::{bail, Context, Result};
use apex_config::config::AgentConfig;
use apex_config::json::{equivalent, parse_override};
use apex_config::validation::Severity;
use apex_config::worker::derive_worker_config;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apexcfg")]
#[command(about = "Ape-X agent configuration tool", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a document and list every issue
    Validate {
        /// Path to the agent document
        config: PathBuf,

        /// Exit with an error on warnings too
        #[arg(long)]
        strict: bool,
    },

    /// Print a document
    Show {
        config: PathBuf,

        /// Fill every absent field with its default
        #[arg(long)]
        resolved: bool,

        /// Override a field, e.g. --set update_spec.batch_size=32
        #[arg(long = "set", value_name = "PATH=VALUE")]
        overrides: Vec<String>,
    },

    /// Print the epsilon schedule
    Epsilon {
        config: PathBuf,

        /// Number of evenly spaced points over the decay window
        #[arg(short = 'n', long, default_value = "11")]
        points: usize,

        /// Print only the value at this time step
        #[arg(short, long)]
        timestep: Option<u64>,
    },

    /// Print the document a sample worker would run
    Worker {
        config: PathBuf,

        /// Seed for exploration sampling
        #[arg(short, long, default_value = "0")]
        seed: u64,
    },

    /// Load, re-emit and compare a document
    Roundtrip {
        config: PathBuf,

        /// Write the re-emitted document here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { config, strict } => validate(&config, strict),
        Commands::Show {
            config,
            resolved,
            overrides,
        } => show(&config, resolved, &overrides),
        Commands::Epsilon {
            config,
            points,
            timestep,
        } => epsilon(&config, points, timestep),
        Commands::Worker { config, seed } => worker(&config, seed),
        Commands::Roundtrip { config, output } => roundtrip(&config, output.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<AgentConfig> {
    AgentConfig::from_path(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn validate(path: &Path, strict: bool) -> Result<()> {
    let config = load(path)?;
    let report = config.validation_report();

    if report.is_empty() {
        println!("{}: ok", path.display());
        return Ok(());
    }

    for issue in report.issues() {
        println!("{}", issue);
    }

    let errors = report.errors().count();
    let warnings = report.warnings().count();
    println!("{} error(s), {} warning(s)", errors, warnings);

    if errors > 0 || (strict && report.issues().iter().any(|i| i.severity == Severity::Warning)) {
        bail!("{} failed validation", path.display());
    }
    Ok(())
}

fn show(path: &Path, resolved: bool, overrides: &[String]) -> Result<()> {
    let mut config = load(path)?;

    if !overrides.is_empty() {
        let parsed = overrides
            .iter()
            .map(|raw| parse_override(raw))
            .collect::<apex_config::Result<Vec<(String, Value)>>>()
            .context("Invalid override")?;
        config = config.with_overrides(&parsed).context("Failed to apply overrides")?;
    }

    if resolved {
        config.apply_defaults();
    }

    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn epsilon(path: &Path, points: usize, timestep: Option<u64>) -> Result<()> {
    let config = load(path)?;
    let Some(decay) = config.epsilon_decay() else {
        bail!("{} has no exploration_spec.epsilon_spec.decay_spec", path.display());
    };

    let report = config.validation_report();
    let schedule_errors: Vec<_> = report
        .errors()
        .filter(|issue| issue.path.starts_with("exploration_spec"))
        .collect();
    if !schedule_errors.is_empty() {
        for issue in &schedule_errors {
            println!("{}", issue);
        }
        bail!("{} has an invalid epsilon schedule", path.display());
    }

    match timestep {
        Some(t) => println!("{}", decay.value(t)),
        None => {
            println!("# {} from {} to {}", decay.kind(), decay.start_value(), decay.end_value());
            for (t, value) in decay.points(points) {
                println!("{:>10}  {:.6}", t, value);
            }
        }
    }
    Ok(())
}

fn worker(path: &Path, seed: u64) -> Result<()> {
    let config = load(path)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let worker = derive_worker_config(&config, &mut rng).context("Failed to derive worker config")?;

    if let Some(from) = worker.epsilon_decay().and_then(|decay| decay.from) {
        info!(seed, from, "worker exploration start");
    }
    println!("{}", worker.to_json_pretty()?);
    Ok(())
}

fn roundtrip(path: &Path, output: Option<&Path>) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let original: Value = serde_json::from_str(&raw).context("Invalid JSON")?;
    let config = AgentConfig::from_value(original.clone()).context("Invalid agent document")?;
    let emitted = config.to_value()?;

    if let Some(output) = output {
        config
            .save(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    if !equivalent(&original, &emitted) {
        bail!("{} does not survive a round trip", path.display());
    }
    println!("{}: round trip ok", path.display());
    Ok(())
}
