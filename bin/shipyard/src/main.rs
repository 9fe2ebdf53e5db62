//! shipyard deploys a list of compiled contracts and verifies their source.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use shipyard_deploy::{
    ArtifactStore, Config, Orchestrator,
    services::{EtherscanConfig, EtherscanVerifier, NodeBroadcaster},
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = Config::load(&cli.config, &cli.overrides())?;
    config.validate()?;

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
    }

    let artifacts = ArtifactStore::load(&config.artifacts_dir).with_context(|| {
        format!(
            "Failed to load artifacts from {}",
            config.artifacts_dir.display()
        )
    })?;

    let broadcaster =
        NodeBroadcaster::connect(config.node_config()?, config.signing_key()?, artifacts.clone())
            .await?;

    let verifier = EtherscanVerifier::new(
        EtherscanConfig::new(
            config.explorer_api_url()?,
            config.explorer_api_key()?,
            broadcaster.chain_id(),
        ),
        artifacts,
    )?;

    tracing::info!(
        network_url = %config.network_url()?,
        chain_id = broadcaster.chain_id(),
        contracts = config.contracts.len(),
        "Starting deployment run..."
    );

    let settings = config.verification_settings();
    let report = Orchestrator::new(broadcaster, verifier)
        .settling_delay(settings.settling_delay)
        .verification_timeout(settings.timeout)
        .verification_concurrency(settings.concurrency)
        .run(&config.contracts)
        .await?;

    println!("{report}");

    if let Some(path) = &config.report_path {
        report.save_to_file(path)?;
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
