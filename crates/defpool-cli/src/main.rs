//! # defpool-cli
//!
//! Command-line inspection of schema unit descriptors.
//!
//! Reads descriptor documents, registers them into a fresh definition pool
//! and loads or queries units the way generated accessors would.

mod document;
mod render;

use anyhow::Context;
use clap::{Parser, Subcommand};
use defpool::{DefPool, PoolConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "defpool")]
#[command(about = "Inspect schema unit descriptors and their definition pool")]
#[command(version)]
struct Cli {
    /// Path to a pool configuration file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (overridden by RUST_LOG)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every unit and report which ones fail
    Check {
        /// Unit documents
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Load a unit and print one definition
    Lookup {
        /// Unit that defines the name
        #[arg(short, long)]
        unit: String,

        /// Fully-qualified definition name
        name: String,

        /// Unit documents
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Load a unit and print every name it defines
    List {
        /// Unit to list
        unit: String,

        /// Unit documents
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => PoolConfig::from_file(path)
            .with_context(|| format!("cannot load configuration {}", path.display()))?,
        None => PoolConfig::default(),
    };
    let pool = DefPool::with_config(config);

    match cli.command {
        Commands::Check { files } => check(&pool, &files),
        Commands::Lookup { unit, name, files } => {
            document::register_documents(&pool, &files)?;
            pool.ensure_loaded(&unit)?;
            let def = pool.find_by_name(&name)?;
            print!("{}", render::describe(&def));
            Ok(())
        }
        Commands::List { unit, files } => {
            document::register_documents(&pool, &files)?;
            pool.ensure_loaded(&unit)?;
            for name in pool.find_unit(&unit)?.symbols() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn check(pool: &DefPool, files: &[PathBuf]) -> anyhow::Result<()> {
    let ids = document::register_documents(pool, files)?;

    let mut failures = 0;
    for id in &ids {
        match pool.ensure_loaded(id) {
            Ok(()) => {
                let file = pool.find_unit(id)?;
                println!("ok    {} ({} definitions)", id, file.symbols().len());
            }
            Err(err) => {
                failures += 1;
                println!("error {}: {}", id, err);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} units failed to load", failures, ids.len());
    }
    tracing::info!("All {} units loaded", ids.len());
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
