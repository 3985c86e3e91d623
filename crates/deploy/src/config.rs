//! Configuration of a deployment: network profiles, timeouts and the plan.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_core::primitives::Address;
use backon::ExponentialBuilder;
use serde::{Deserialize, Serialize};

use crate::manifest::{ContractSpec, WiringStep};

/// Default JSON-RPC endpoint of a local development node.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
/// Chain id of Hardhat / Anvil development nodes.
pub const DEFAULT_DEV_CHAIN_ID: u64 = 31337;
/// Name of the network profile used when none is selected.
pub const DEFAULT_NETWORK: &str = "localhost";

/// How to reach a ledger network and which identity sends transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Expected chain id. Checked once when connecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Sender account. Defaults to the first account managed by the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: Some(DEFAULT_DEV_CHAIN_ID),
            from: None,
        }
    }
}

/// Retry policy for transient transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Exponential backoff matching this policy.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

/// Timing of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Upper bound on the wait for a single transaction to confirm.
    pub confirmation_timeout_secs: u64,
    /// Interval between two receipt polls.
    pub poll_interval_ms: u64,
    pub retry: RetryConfig,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 120,
            poll_interval_ms: 2_000,
            retry: RetryConfig::default(),
        }
    }
}

impl ExecutionConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Content of a `Rigger.toml` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiggerConfig {
    /// Directory holding the compiled contract artifacts.
    pub artifacts: PathBuf,
    /// Directory receiving deployment records and reports.
    pub outdata: PathBuf,
    pub execution: ExecutionConfig,
    /// Named network profiles.
    pub networks: BTreeMap<String, NetworkConfig>,
    pub contracts: Vec<ContractSpec>,
    pub wiring: Vec<WiringStep>,
}

impl Default for RiggerConfig {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from("artifacts"),
            outdata: PathBuf::from("deployments"),
            execution: ExecutionConfig::default(),
            networks: BTreeMap::from([(DEFAULT_NETWORK.to_string(), NetworkConfig::default())]),
            contracts: Vec::new(),
            wiring: Vec::new(),
        }
    }
}

impl RiggerConfig {
    /// Make relative paths relative to `base` (the directory of the config file).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.artifacts.is_relative() {
            self.artifacts = base.join(&self.artifacts);
        }
        if self.outdata.is_relative() {
            self.outdata = base.join(&self.outdata);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: RiggerConfig = toml::from_str(
            r#"
            [execution]
            confirmation_timeout_secs = 30

            [networks.mumbai]
            rpc_url = "https://polygon-mumbai.example/v2/key"
            chain_id = 80001
            "#,
        )
        .unwrap();

        assert_eq!(config.execution.confirmation_timeout(), Duration::from_secs(30));
        assert_eq!(config.execution.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.execution.retry, RetryConfig::default());
        assert_eq!(config.networks["mumbai"].chain_id, Some(80001));
        assert_eq!(config.networks["mumbai"].from, None);
        assert_eq!(config.artifacts, PathBuf::from("artifacts"));
    }

    #[test]
    fn test_resolve_paths() {
        let config = RiggerConfig {
            outdata: PathBuf::from("/var/rigger"),
            ..Default::default()
        }
        .resolve_paths(Path::new("/project"));

        assert_eq!(config.artifacts, PathBuf::from("/project/artifacts"));
        assert_eq!(config.outdata, PathBuf::from("/var/rigger"));
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = RiggerConfig::default();
        config.networks.get_mut(DEFAULT_NETWORK).unwrap().from = Some(Address::with_last_byte(7));

        let content = toml::to_string_pretty(&config).unwrap();
        let parsed: RiggerConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, config);
    }
}
