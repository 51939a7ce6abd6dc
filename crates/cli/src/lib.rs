mod asset;
mod list;
mod resolve;
mod watch;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use strata_core::config::EngineConfig;

#[derive(Parser)]
#[command(
    name = "strata",
    version,
    about = "Resolve layered resources the way the engine serves them",
    long_about = "Strata resolves stylesheets, scripts, images, templates, translations and \
                  generated assets across the builtin, custom and app layers, picking the \
                  best language variant for locale-keyed resources."
)]
pub struct Cli {
    /// Engine configuration file (JSON). Defaults apply when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve one resource path and print the result
    Resolve {
        /// Logical resource path, e.g. templates/en/translation.json
        #[arg(value_name = "PATH")]
        path: String,
        /// Preferred language, most preferred first. Repeatable.
        #[arg(long = "lang", value_name = "TAG")]
        langs: Vec<String>,
        /// Show the app layer's own file instead of the effective one
        #[arg(long, conflicts_with = "langs")]
        app: bool,
    },
    /// List every resource path present in any layer
    List,
    /// Print the physical name and content of a generated asset
    Asset {
        /// Logical asset key from the manifest, e.g. index.js
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Follow the live manifest and log every reload until Ctrl+C
    Watch,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Watch => "watch",
        _ => "cli",
    };
    let _guard = strata_runtime::init_logging(component, matches!(cli.command, Commands::Watch));

    let config = load_config(cli.config.as_deref())?;
    let rt = tokio::runtime::Runtime::new()?;
    // A live manifest spawns its watcher on the ambient runtime.
    let _enter = rt.enter();

    match cli.command {
        Commands::Resolve { path, langs, app } => resolve::run(&config, &path, &langs, app),
        Commands::List => list::run(&config),
        Commands::Asset { key } => asset::run(&config, &key),
        Commands::Watch => rt.block_on(watch::run(config)),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}
