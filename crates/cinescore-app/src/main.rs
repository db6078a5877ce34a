//! Cinescore application binary - composition root.
//!
//! Ties the crates together into a single executable:
//! 1. Parse the command line and load configuration from TOML + env
//! 2. Run one batch stage (collect, preprocess, train, deploy) or all of them
//! 3. Or pull the latest artifact set and run one of the serving surfaces
//!
//! Stage failures propagate out of `main`, giving a non-zero exit the
//! scheduler retries on.

mod cli;

use clap::Parser;

use cinescore_api::{create_form_router, create_prediction_router, serve, FormState, PredictionState};
use cinescore_collect::{collect, CatalogClient};
use cinescore_core::config::CinescoreConfig;
use cinescore_core::error::Result;
use cinescore_core::layout::DataLayout;
use cinescore_core::types::RunDate;
use cinescore_distribute::{Distributor, LocalArtifacts};
use cinescore_features::{FeatureBuilder, VaderSentiment};
use cinescore_train::{tracker, Trainer};

use cli::{CliArgs, Command};

async fn run_collect(config: &CinescoreConfig, layout: &DataLayout, date: RunDate) -> Result<()> {
    let client = CatalogClient::new(&config.catalog)?;
    let report = collect(&client, layout, date, config.catalog.pages).await?;
    tracing::info!(path = %report.path.display(), records = report.records, "Collect finished");
    Ok(())
}

fn run_preprocess(config: &CinescoreConfig, layout: &DataLayout, date: RunDate) -> Result<()> {
    let analyzer = VaderSentiment::new();
    let report = FeatureBuilder::new(layout, &config.features, &analyzer).build(date)?;
    tracing::info!(
        path = %report.path.display(),
        input_rows = report.input_rows,
        output_rows = report.output_rows,
        "Preprocess finished"
    );
    Ok(())
}

async fn run_train(config: &CinescoreConfig, layout: &DataLayout, date: RunDate) -> Result<()> {
    let tracker = tracker::from_config(&config.training.tracker, &config.data_dir())?;
    let report = Trainer::new(layout, &config.training, tracker.as_ref())
        .run(date)
        .await?;
    tracing::info!(
        run_name = %report.run_name,
        train_rmse = report.train_rmse,
        test_rmse = report.test_rmse,
        rmse_gap = report.rmse_gap,
        promoted = report.decision.promotes(),
        "Train finished"
    );
    if let Some(reason) = report.tracking.reason() {
        tracing::warn!(reason, "Run was not recorded by the experiment tracker");
    }
    Ok(())
}

async fn run_deploy(config: &CinescoreConfig, layout: &DataLayout, date: RunDate) -> Result<()> {
    let distributor = Distributor::from_config(&config.store)?;
    let pushed = distributor.push(layout, date).await?;
    match pushed.reason() {
        Some(reason) => tracing::warn!(reason, "Deploy skipped"),
        None => tracing::info!(
            generation = ?pushed.value().generation,
            artifacts = pushed.value().artifacts,
            "Deploy finished"
        ),
    }
    Ok(())
}

async fn run_pull(config: &CinescoreConfig) -> Result<()> {
    let distributor = Distributor::from_config(&config.store)?;
    let layout = DataLayout::new(config.artifact_dir());
    let pulled = distributor.pull(&layout).await?;
    match pulled.reason() {
        Some(reason) => tracing::warn!(reason, "Pull incomplete"),
        None => tracing::info!(generation = ?pulled.value().generation, "Pull finished"),
    }
    Ok(())
}

/// Pull before a surface starts. A failed pull leaves whatever is already
/// in the artifact directory in place.
async fn pull_before_boot(config: &CinescoreConfig) {
    if let Err(e) = run_pull(config).await {
        tracing::warn!(error = %e, "Startup pull failed; using local artifacts");
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = CinescoreConfig::load_or_default(&config_file)?;
    config.apply_env_overrides();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting cinescore v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let layout = DataLayout::new(config.data_dir());

    match args.command {
        Command::Collect(date) => run_collect(&config, &layout, date.resolve()?).await?,
        Command::Preprocess(date) => run_preprocess(&config, &layout, date.resolve()?)?,
        Command::Train(date) => run_train(&config, &layout, date.resolve()?).await?,
        Command::Deploy(date) => run_deploy(&config, &layout, date.resolve()?).await?,
        Command::Pipeline(date) => {
            let date = date.resolve()?;
            tracing::info!(run_date = %date, "Running full pipeline");
            run_collect(&config, &layout, date).await?;
            run_preprocess(&config, &layout, date)?;
            run_train(&config, &layout, date).await?;
            run_deploy(&config, &layout, date).await?;
        }
        Command::Pull => run_pull(&config).await?,
        Command::Serve(port) => {
            pull_before_boot(&config).await;
            let state = PredictionState::new(
                LocalArtifacts::new(config.artifact_dir()),
                Distributor::from_config(&config.store)?,
            );
            let addr = format!("{}:{}", config.server.host, port.resolve(config.server.api_port));
            serve(create_prediction_router(state), &addr).await?;
        }
        Command::Form(port) => {
            pull_before_boot(&config).await;
            let state = match FormState::load(
                LocalArtifacts::new(config.artifact_dir()),
                Distributor::from_config(&config.store)?,
                config.translation.clone(),
            ) {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!(error = %e, "Interactive form cannot start without model and encoders");
                    return Err(e.into());
                }
            };
            let addr = format!("{}:{}", config.server.host, port.resolve(config.server.form_port));
            tracing::info!("Form at http://{}/", addr);
            serve(create_form_router(state), &addr).await?;
        }
    }

    Ok(())
}
