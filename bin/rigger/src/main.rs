//! rigger is a CLI tool to deploy a set of interdependent smart contracts and wire them together.

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, ReportFormat};
use rigger_deploy::Deployer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut config = config::load_config(&cli.config)?;

    if let Some(outdata) = cli.outdata {
        config.outdata = outdata;
    }
    if let Some(timeout) = cli.confirmation_timeout {
        config.execution.confirmation_timeout_secs = timeout;
    }

    let mut deployer = Deployer::from_config(config, &cli.network)?;
    if let Some(rpc_url) = cli.rpc_url {
        deployer.network.rpc_url = rpc_url;
    }

    tracing::info!(
        config_path = %cli.config.display(),
        network = %deployer.network_name,
        rpc_url = %deployer.network.rpc_url,
        outdata_path = %deployer.outdata.display(),
        "Loading deployment from config file..."
    );

    if cli.dry_run {
        let (_, plan) = deployer.plan()?;
        println!("{plan}");
        return Ok(());
    }

    // Save the resolved configuration next to the deployment record before deploying
    deployer.save_config()?;

    let outcome = deployer.deploy(cli.redeploy).await?;

    match cli.report_format {
        ReportFormat::Table => println!("{}", outcome.report),
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(outcome.report.entries())
                .context("Failed to serialize report")?
        ),
    }

    if let Some(error) = outcome.error {
        anyhow::bail!("Deployment run failed in state {}: {}", outcome.state, error);
    }

    tracing::info!(
        contracts = outcome.addresses.len(),
        "✓ Deployment complete!"
    );
    for contract in &outcome.addresses {
        tracing::info!("{:<20} {}", contract.name, contract.address);
    }

    Ok(())
}
