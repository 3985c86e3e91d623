//! Registry of deployable contract artifacts.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_core::{json_abi::JsonAbi, json_abi::Param, primitives::Bytes};
use serde::Deserialize;

use crate::{
    error::RegistryError,
    manifest::{ConstructorArg, ContractSpec},
};

/// A compiled contract: its ABI and creation bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    #[serde(default)]
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    pub fn new(contract_name: impl Into<String>, abi: JsonAbi, bytecode: Bytes) -> Self {
        Self {
            contract_name: contract_name.into(),
            abi,
            bytecode,
        }
    }

    /// Parse a Hardhat artifact (`artifacts/contracts/<File>.sol/<Name>.json`).
    pub fn from_hardhat_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// The constructor parameters. Empty when the ABI declares no constructor.
    pub fn constructor_inputs(&self) -> &[Param] {
        self.abi
            .constructor
            .as_ref()
            .map(|c| c.inputs.as_slice())
            .unwrap_or_default()
    }
}

/// Maps a logical contract name to its deployable artifact.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    artifacts: BTreeMap<String, ContractArtifact>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, artifact: ContractArtifact) {
        self.artifacts.insert(name.into(), artifact);
    }

    pub fn get(&self, name: &str) -> Result<&ContractArtifact, RegistryError> {
        self.artifacts
            .get(name)
            .ok_or_else(|| RegistryError::UnknownContract(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    /// Check that `spec` names a registered artifact and that its arguments
    /// match the constructor signature.
    pub fn check_spec(&self, spec: &ContractSpec) -> Result<(), RegistryError> {
        let artifact = self.get(spec.artifact_name())?;
        let inputs = artifact.constructor_inputs();

        if inputs.len() != spec.args.len() {
            return Err(RegistryError::ConstructorArity {
                contract: spec.name.clone(),
                expected: inputs.len(),
                found: spec.args.len(),
            });
        }

        for (index, (param, arg)) in inputs.iter().zip(&spec.args).enumerate() {
            let expected = param.selector_type();
            let found = arg.abi_type();
            // `address_of` may feed any address-typed parameter, including `address payable`.
            let matches = match arg {
                ConstructorArg::AddressOf { .. } => expected.starts_with("address"),
                ConstructorArg::Literal { .. } => expected == found,
            };
            if !matches {
                return Err(RegistryError::ConstructorArgType {
                    contract: spec.name.clone(),
                    index,
                    expected: expected.into_owned(),
                    found: found.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Load every deployable artifact below a Hardhat `artifacts/` directory.
    ///
    /// Debug files (`*.dbg.json`), build info and artifacts without creation
    /// bytecode (interfaces, abstract contracts) are skipped.
    pub fn load_artifacts(dir: &Path) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        let mut files = Vec::new();
        collect_json_files(dir, &mut files)?;
        files.sort();

        for path in files {
            let content = std::fs::read_to_string(&path).map_err(|e| RegistryError::Artifact {
                path: path.clone(),
                reason: e.to_string(),
            })?;

            let value: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| RegistryError::Artifact {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

            let deployable = value.get("contractName").is_some()
                && value
                    .get("bytecode")
                    .and_then(|b| b.as_str())
                    .is_some_and(|b| b.len() > 2);
            if !deployable {
                tracing::trace!(path = %path.display(), "Skipping non-deployable artifact");
                continue;
            }

            let artifact: ContractArtifact =
                serde_json::from_value(value).map_err(|e| RegistryError::Artifact {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

            if registry.artifacts.contains_key(&artifact.contract_name) {
                tracing::warn!(
                    contract = %artifact.contract_name,
                    path = %path.display(),
                    "Duplicate contract name in artifacts, keeping the first one"
                );
                continue;
            }

            tracing::debug!(contract = %artifact.contract_name, path = %path.display(), "Registered artifact");
            registry.register(artifact.contract_name.clone(), artifact);
        }

        tracing::info!(count = registry.len(), dir = %dir.display(), "Loaded contract artifacts");
        Ok(registry)
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RegistryError::Artifact {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    for entry in entries {
        let path = entry
            .map_err(|e| RegistryError::Artifact {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?
            .path();

        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == "build-info") {
                continue;
            }
            collect_json_files(&path, out)?;
        } else {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.ends_with(".json") && !name.ends_with(".dbg.json") {
                out.push(path);
            }
        }
    }

    Ok(())
}
