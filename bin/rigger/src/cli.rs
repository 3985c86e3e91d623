use std::path::PathBuf;

use clap::Parser;
use rigger_deploy::{DEFAULT_NETWORK, RIGGER_CONFIG_FILENAME};
use tracing::level_filters::LevelFilter;

/// How the final report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ReportFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "rigger")]
#[command(
    author,
    version,
    about = "Deploy and wire interdependent smart contracts, in dependency order"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "RIGGER_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the Rigger.toml file describing the contracts, wiring and networks.
    #[arg(long, alias = "conf", env = "RIGGER_CONFIG", default_value = RIGGER_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Name of the network profile to deploy to.
    #[arg(short, long, env = "RIGGER_NETWORK", default_value = DEFAULT_NETWORK)]
    pub network: String,

    /// Override the JSON-RPC endpoint of the selected network.
    #[arg(long, alias = "rpc", env = "RIGGER_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Redeploy all contracts.
    /// If not provided and a deployment record matches the contracts, they are reused and only the
    /// wiring runs again.
    #[arg(long, env = "RIGGER_REDEPLOY", default_value_t = false)]
    pub redeploy: bool,

    /// Print the deployment order and the wiring steps, then exit without sending anything.
    #[arg(long, env = "RIGGER_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    /// Maximum time to wait for a single transaction to confirm, in seconds.
    #[arg(long, alias = "timeout", env = "RIGGER_CONFIRMATION_TIMEOUT")]
    pub confirmation_timeout: Option<u64>,

    /// The path to the output data directory.
    ///
    /// If not provided, the `outdata` value of the configuration file is used.
    #[arg(long, env = "RIGGER_OUTDATA")]
    pub outdata: Option<PathBuf>,

    /// Format of the report printed at the end of the run.
    #[arg(long, env = "RIGGER_REPORT_FORMAT", default_value_t = ReportFormat::Table)]
    pub report_format: ReportFormat,
}
