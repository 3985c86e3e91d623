use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{
    AddressTable, ContractRegistry, ContractSpec, DeploymentPlan, DeploymentRecord, DeploymentRun,
    ExecutionConfig, JsonRpcNetwork, NetworkConfig, RiggerConfig, RunOutcome, WiringStep,
    record::manifest_hash, run,
};

/// The default name for the rigger configuration file.
pub const RIGGER_CONFIG_FILENAME: &str = "Rigger.toml";
/// Name of the deployment record written in the network output directory.
pub const RECORD_FILENAME: &str = "deployment.json";
/// Name of the run report written in the network output directory.
pub const REPORT_FILENAME: &str = "report.json";

/// Deployer for one plan on one network.
///
/// This is a `Rigger.toml` resolved against a single network profile. It can be
/// serialized to/from TOML format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployer {
    /// Name of the selected network profile.
    pub network_name: String,
    /// Path to the compiled artifacts directory.
    pub artifacts: PathBuf,
    /// Path to the output data directory.
    pub outdata: PathBuf,

    /// Connection settings of the selected network.
    pub network: NetworkConfig,
    /// Timeouts and retry policy.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Contracts to deploy.
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
    /// Calls to run once every contract is deployed.
    #[serde(default)]
    pub wiring: Vec<WiringStep>,
}

impl Deployer {
    /// Select the network profile `network_name` from `config`.
    pub fn from_config(config: RiggerConfig, network_name: &str) -> Result<Self> {
        let RiggerConfig {
            artifacts,
            outdata,
            execution,
            mut networks,
            contracts,
            wiring,
        } = config;

        let Some(network) = networks.remove(network_name) else {
            anyhow::bail!(
                "Unknown network '{}', configured networks: [{}]",
                network_name,
                networks.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        };

        Ok(Self {
            network_name: network_name.to_string(),
            artifacts,
            outdata,
            network,
            execution,
            contracts,
            wiring,
        })
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deployer config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Save the resolved configuration next to the deployment record.
    pub fn save_config(&self) -> Result<PathBuf> {
        let dir = self.network_outdata();
        std::fs::create_dir_all(&dir)
            .context(format!("Failed to create directory {}", dir.display()))?;

        let config_path = dir.join(RIGGER_CONFIG_FILENAME);
        self.save_to_file(&config_path)?;
        Ok(config_path)
    }

    /// Output directory of the selected network.
    pub fn network_outdata(&self) -> PathBuf {
        self.outdata.join(&self.network_name)
    }

    pub fn record_path(&self) -> PathBuf {
        self.network_outdata().join(RECORD_FILENAME)
    }

    pub fn report_path(&self) -> PathBuf {
        self.network_outdata().join(REPORT_FILENAME)
    }

    /// Load the artifacts and validate the plan against them, without touching the network.
    pub fn plan(&self) -> Result<(ContractRegistry, DeploymentPlan)> {
        let registry = ContractRegistry::load_artifacts(&self.artifacts)
            .context(format!("Failed to load artifacts from {}", self.artifacts.display()))?;

        let plan = run::prepare(&registry, &self.contracts, &self.wiring)
            .context("Deployment plan rejected")?;

        Ok((registry, plan))
    }

    /// Addresses of a previous run that can be reused, if any.
    ///
    /// Fails when a record exists but was produced by different contract
    /// declarations or on another chain: the caller must opt into `redeploy`.
    fn prior_addresses(&self, manifest_hash: &str, chain_id: u64) -> Result<Option<AddressTable>> {
        let path = self.record_path();
        if !path.exists() {
            return Ok(None);
        }

        let record = DeploymentRecord::load_from_file(&path)?;
        if record.chain_id != chain_id {
            anyhow::bail!(
                "The deployment recorded in {} is on chain {}, but network '{}' is chain {}. \
                 Run again with --redeploy to deploy a fresh set of contracts.",
                path.display(),
                record.chain_id,
                self.network_name,
                chain_id
            );
        }
        if !record.matches(manifest_hash, chain_id) {
            anyhow::bail!(
                "Contract declarations changed since the deployment recorded in {}. \
                 Run again with --redeploy to deploy a fresh set of contracts.",
                path.display()
            );
        }

        tracing::info!(
            path = %path.display(),
            contracts = record.contracts.len(),
            deployed_at = record.deployed_at,
            "Reusing previous deployment"
        );

        Ok(Some(record.contracts))
    }

    pub async fn deploy(&self, redeploy: bool) -> Result<RunOutcome> {
        tracing::info!(network = %self.network_name, "Starting deployment process...");

        let (registry, plan) = self.plan()?;
        tracing::info!(
            artifacts = registry.len(),
            contracts = plan.contracts().len(),
            wiring_steps = plan.wiring().len(),
            "Plan validated"
        );

        let hash = manifest_hash(&self.contracts)?;

        let network = JsonRpcNetwork::connect(&self.network, &self.execution)
            .await
            .context(format!("Failed to connect to network '{}'", self.network_name))?;

        let prior = if redeploy {
            tracing::info!("Redeploy requested, ignoring any previous deployment");
            None
        } else {
            self.prior_addresses(&hash, network.chain_id())?
        };

        let mut run = DeploymentRun::new(&network, &registry, self.execution.confirmation_timeout());
        if let Some(prior) = prior {
            run = run.with_prior(prior);
        }

        let outcome = run.execute(&self.contracts, &self.wiring).await;

        // A partial table is kept too: the next run adopts it and resumes where this one stopped.
        if !outcome.addresses.is_empty() {
            let record = DeploymentRecord::new(
                hash,
                &self.network_name,
                network.chain_id(),
                outcome.addresses.clone(),
            );
            record.save_to_file(&self.record_path())?;
            tracing::info!(
                path = %self.record_path().display(),
                contracts = outcome.addresses.len(),
                planned = plan.contracts().len(),
                "Deployment record saved"
            );
        }

        self.save_report(&outcome)?;

        Ok(outcome)
    }

    fn save_report(&self, outcome: &RunOutcome) -> Result<()> {
        let path = self.report_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&serde_json::json!({
            "network": self.network_name,
            "state": outcome.state,
            "error": outcome.error.as_ref().map(ToString::to_string),
            "entries": outcome.report.entries(),
        }))
        .context("Failed to serialize deployment report")?;

        std::fs::write(&path, json)
            .context(format!("Failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report saved");
        Ok(())
    }
}
