use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::{address_table::AddressTable, manifest::ContractSpec};

/// Compute a SHA-256 hash of the contract declarations.
///
/// Only the contract specs take part: changing a wiring step does not make the
/// deployed contracts stale, changing a constructor argument or a dependency does.
pub fn manifest_hash(contracts: &[ContractSpec]) -> Result<String> {
    let json = serde_json::to_string(contracts).context("Failed to serialize contract specs")?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());

    Ok(hex::encode(hasher.finalize()))
}

/// Addresses confirmed by a run, stored next to the run report.
///
/// Saved to `{outdata}/{network}/deployment.json` after every run that
/// confirmed at least one contract, including runs that failed midway. The next
/// run adopts these contracts instead of deploying them again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Hash of the contract declarations that produced these addresses
    pub manifest_hash: String,
    /// Name of the network profile
    pub network: String,
    pub chain_id: u64,
    /// Unix timestamp of the deployment
    pub deployed_at: i64,
    /// Rigger version that created this record
    pub rigger_version: String,
    pub contracts: AddressTable,
}

impl DeploymentRecord {
    pub fn new(
        manifest_hash: String,
        network: impl Into<String>,
        chain_id: u64,
        contracts: AddressTable,
    ) -> Self {
        Self {
            manifest_hash,
            network: network.into(),
            chain_id,
            deployed_at: chrono::Utc::now().timestamp(),
            rigger_version: env!("CARGO_PKG_VERSION").to_string(),
            contracts,
        }
    }

    /// Whether the addresses of this record can be reused for `manifest_hash` on `chain_id`.
    pub fn matches(&self, manifest_hash: &str, chain_id: u64) -> bool {
        self.manifest_hash == manifest_hash && self.chain_id == chain_id
    }

    /// Save this record to a file, as formatted JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment record")?;

        std::fs::write(path, json).context(format!(
            "Failed to write deployment record to {}",
            path.display()
        ))?;

        Ok(())
    }

    /// Load a record from a file.
    ///
    /// Returns an error if the file doesn't exist, is malformed, or cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment record does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path).context(format!(
            "Failed to read deployment record from {}",
            path.display()
        ))?;

        let record: Self =
            serde_json::from_str(&content).context("Failed to parse deployment record JSON")?;

        Ok(record)
    }
}
