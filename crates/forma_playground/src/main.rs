//! Forma Playground
//!
//! Replays scripted interactions against Forma input components and prints
//! the callbacks they trigger and the consolidated properties after every
//! step.

use anyhow::Result;
use clap::{Parser, Subcommand};
use forma_inputs::checkbox::CheckboxKind;
use forma_inputs::file_input::FileKind;
use forma_inputs::text_input::TextKind;
use forma_inputs::{InputContext, InputKind, Inputs, InputsProps, Interval, IntervalProps};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod harness;
mod run;
mod scenario;

use scenario::{ComponentKind, Scenario};

#[derive(Parser)]
#[command(name = "forma-playground")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay scripted interactions against Forma inputs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Configuration file, defaults to forma.toml when present
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default model of a component
    Defaults {
        #[arg(value_enum)]
        kind: ComponentKind,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            config,
            json,
        } => cmd_run(&scenario, config.as_deref(), json),
        Commands::Defaults { kind } => cmd_defaults(kind),
    }
}

fn cmd_run(path: &std::path::Path, config: Option<&std::path::Path>, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let config = config::load_config(config, path)?;

    info!(kind = ?scenario.kind, steps = scenario.steps.len(), "running scenario");
    if let Some(description) = &scenario.description {
        info!("{}", description);
    }

    let reports = run::run_scenario(&scenario, config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print!("{}", run::format_reports(&reports));
    }
    Ok(())
}

fn cmd_defaults(kind: ComponentKind) -> Result<()> {
    let mut ctx = InputContext::new();
    let defaults = match kind {
        ComponentKind::Text => serde_json::to_value(TextKind::<String>::default_model(ctx.config()))?,
        ComponentKind::Number => serde_json::to_value(TextKind::<f64>::default_model(ctx.config()))?,
        ComponentKind::Checkbox => serde_json::to_value(CheckboxKind::default_model(ctx.config()))?,
        ComponentKind::File => serde_json::to_value(FileKind::default_model(ctx.config()))?,
        ComponentKind::Interval => {
            let interval = Interval::new(&mut ctx, &IntervalProps::new());
            serde_json::to_value(interval.properties())?
        }
        ComponentKind::Inputs => {
            let inputs = Inputs::<String>::new(&mut ctx, &InputsProps::new());
            serde_json::to_value(inputs.properties())?
        }
    };
    println!("{}", serde_json::to_string_pretty(&defaults)?);
    Ok(())
}
