//! Command implementations for the CBC lake boundary CLI.
//!
//! Provides subcommands to refresh the CDEC caches, estimate lakebed
//! conductance and build the boundary condition tables.

use clap::Subcommand;

pub mod build;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod output;

#[derive(Subcommand)]
pub enum Command {
    /// Download CDEC series for the selected stations and refresh the caches
    Fetch {
        /// Path to the pipeline YAML config
        #[arg(short = 'c', long)]
        config: String,
    },

    /// Build the boundary condition specification and time-series tables
    Build {
        /// Path to the pipeline YAML config
        #[arg(short = 'c', long)]
        config: String,

        /// Read the monthly caches instead of downloading (overrides download_new)
        #[arg(long)]
        offline: bool,

        /// Replace output files that already exist
        #[arg(long)]
        overwrite: bool,
    },

    /// Estimate lakebed conductance from the aquifer files and write it for review
    Conductance {
        /// Path to the pipeline YAML config
        #[arg(short = 'c', long)]
        config: String,

        /// Replace an existing conductance file
        #[arg(long)]
        overwrite: bool,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Fetch { config } => fetch::run_fetch(&config).await,
        Command::Build {
            config,
            offline,
            overwrite,
        } => build::run_build(&config, offline, overwrite).await,
        Command::Conductance { config, overwrite } => build::run_conductance(&config, overwrite),
    }
}
