use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use rigger_deploy::RiggerConfig;

/// Environment variables that belong to the command line, not to the configuration file.
const CLI_ONLY_KEYS: &[&str] = &[
    "verbosity",
    "config",
    "network",
    "rpc_url",
    "redeploy",
    "dry_run",
    "confirmation_timeout",
    "report_format",
];

/// Load a `Rigger.toml`, layered as: defaults, then the file, then `RIGGER_*` variables.
///
/// Nested keys use a double underscore, e.g. `RIGGER_EXECUTION__CONFIRMATION_TIMEOUT_SECS=30`.
/// Relative paths in the file are resolved against its directory.
pub fn load_config(path: &Path) -> Result<RiggerConfig> {
    if !path.is_file() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    let config: RiggerConfig = Figment::from(Serialized::defaults(RiggerConfig::default()))
        .merge(Toml::file_exact(path))
        .merge(Env::prefixed("RIGGER_").split("__").ignore(CLI_ONLY_KEYS))
        .extract()
        .context(format!("Failed to load configuration from {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    tracing::info!(path = %path.display(), contracts = config.contracts.len(), "Configuration loaded");

    Ok(config.resolve_paths(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new("rigger-test").expect("Failed to create temp dir");
        assert!(load_config(&temp_dir.path().join("Rigger.toml")).is_err());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let temp_dir = TempDir::new("rigger-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join("Rigger.toml");
        std::fs::write(
            &path,
            r#"
            artifacts = "build/artifacts"

            [execution]
            poll_interval_ms = 250

            [[contracts]]
            name = "Avatars"
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.artifacts, temp_dir.path().join("build/artifacts"));
        assert_eq!(config.outdata, temp_dir.path().join("deployments"));
        assert_eq!(config.execution.poll_interval_ms, 250);
        assert_eq!(config.execution.confirmation_timeout_secs, 120);
        assert!(config.networks.contains_key("localhost"));
        assert_eq!(config.contracts.len(), 1);
    }
}
