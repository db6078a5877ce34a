//! CLI argument definitions for the cinescore binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use cinescore_core::error::Result;
use cinescore_core::types::RunDate;

/// Movie rating pipeline and its serving surfaces.
#[derive(Parser, Debug)]
#[command(name = "cinescore", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the catalog snapshot into movies_{date}.csv.
    Collect(DateArg),
    /// Clean the raw snapshot and derive the encoded features.
    Preprocess(DateArg),
    /// Train a model and apply the promotion rule.
    Train(DateArg),
    /// Upload the best model and both encoders to the artifact store.
    Deploy(DateArg),
    /// Run collect, preprocess, train and deploy for one date.
    Pipeline(DateArg),
    /// Download the latest artifact set into the artifact directory.
    Pull,
    /// Run the prediction API.
    Serve(PortArg),
    /// Run the interactive form.
    Form(PortArg),
}

#[derive(Args, Debug)]
pub struct DateArg {
    /// Run date (YYYY-MM-DD). Defaults to today (UTC).
    #[arg(short = 'd', long = "date")]
    pub date: Option<String>,
}

impl DateArg {
    pub fn resolve(&self) -> Result<RunDate> {
        match &self.date {
            Some(date) => date.parse(),
            None => Ok(RunDate::today()),
        }
    }
}

#[derive(Args, Debug)]
pub struct PortArg {
    /// Listen port, overriding the configured one.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

impl PortArg {
    pub fn resolve(&self, config_port: u16) -> u16 {
        self.port.unwrap_or(config_port)
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CINESCORE_CONFIG env var > ./cinescore.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CINESCORE_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("cinescore.toml")
    }
}
