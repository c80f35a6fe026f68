//! `cliff-ctl`: host and inspect cliff plugin trees.
//!
//! Runs a plugin tree through the cliff core, generates the manifest caches
//! the core reads, and lists or validates plugins and their commands.

mod commands;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cliff-ctl", version, about = "Host and inspect cliff plugin trees", long_about = None)]
#[command(styles = output::clap_styles())]
pub(crate) struct Cli {
    /// Log resolution and dispatch decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Run argv through the plugin tree rooted at --root
    Run {
        /// Root plugin directory
        #[arg(short, long, env = "CLIFF_ROOT", default_value = ".")]
        root: PathBuf,

        /// Load dev plugins
        #[arg(long)]
        dev: bool,

        /// Ignore manifest caches and discover commands live
        #[arg(long)]
        no_manifest: bool,

        /// Arguments passed to the hosted CLI
        #[arg(last = true)]
        argv: Vec<String>,
    },

    /// Discover a plugin's commands and write its manifest cache
    Manifest {
        /// Plugin directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Print the manifest instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// List loaded plugins in load order
    Plugins {
        #[arg(short, long, env = "CLIFF_ROOT", default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        dev: bool,
    },

    /// List resolved commands with their owning plugin
    Commands {
        #[arg(short, long, env = "CLIFF_ROOT", default_value = ".")]
        root: PathBuf,

        /// Include hidden commands
        #[arg(long)]
        hidden: bool,

        /// Print registry entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a plugin descriptor and its targets
    Validate {
        /// Plugin directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "cliff=debug" } else { "cliff=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            root,
            dev,
            no_manifest,
            argv,
        } => commands::handle_run_command(&root, dev, no_manifest, &argv).await,
        Commands::Manifest { dir, dry_run } => commands::handle_manifest_command(&dir, dry_run),
        Commands::Plugins { root, dev } => commands::handle_plugins_command(&root, dev),
        Commands::Commands { root, hidden, json } => {
            commands::handle_commands_command(&root, hidden, json)
        }
        Commands::Validate { dir } => commands::handle_validate_command(&dir),
    }
}
