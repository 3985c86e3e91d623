//! Error taxonomy of a deployment run.
//!
//! Planning and registry errors are raised before any transaction is sent and
//! are fixed by editing the plan. Execution errors happen mid-run, possibly
//! after earlier steps already took irreversible effect on-chain.

use std::{path::PathBuf, time::Duration};

use alloy_core::primitives::{Address, TxHash};
use thiserror::Error;

pub use crate::network::NetworkError;

/// The plan itself is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("dependency cycle between contracts: {}", contracts.join(", "))]
    CyclicDependency { contracts: Vec<String> },

    #[error("contract `{contract}` depends on `{dependency}`, which is not part of the plan")]
    UnresolvedDependency { contract: String, dependency: String },

    #[error(
        "contract `{contract}` uses the address of `{reference}` without declaring it in depends_on"
    )]
    UndeclaredReference { contract: String, reference: String },

    #[error("contract `{0}` is declared more than once")]
    DuplicateContract(String),

    #[error("wiring step `{step}` references `{reference}`, which is not part of the plan")]
    UnknownWiringReference { step: String, reference: String },
}

/// An artifact lookup or validation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown contract artifact `{0}`")]
    UnknownContract(String),

    #[error("contract `{contract}` constructor takes {expected} argument(s), {found} given")]
    ConstructorArity {
        contract: String,
        expected: usize,
        found: usize,
    },

    #[error("contract `{contract}` constructor argument {index} is `{expected}`, got `{found}`")]
    ConstructorArgType {
        contract: String,
        index: usize,
        expected: String,
        found: String,
    },

    #[error("invalid artifact {path}: {reason}")]
    Artifact { path: PathBuf, reason: String },
}

/// A step failed while the plan was executing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("deployment of `{contract}` was rejected: {reason}")]
    DeploymentReverted {
        contract: String,
        tx: Option<TxHash>,
        reason: String,
    },

    #[error("deployment of `{contract}` was not confirmed within {timeout:?} (tx {tx})")]
    DeploymentTimeout {
        contract: String,
        tx: TxHash,
        timeout: Duration,
    },

    #[error("wiring step `{step}` was rejected: {reason}")]
    WiringReverted {
        step: String,
        tx: Option<TxHash>,
        reason: String,
    },

    #[error("wiring step `{step}` was not confirmed within {timeout:?} (tx {tx})")]
    WiringTimeout {
        step: String,
        tx: TxHash,
        timeout: Duration,
    },

    #[error(
        "contract `{contract}` was recorded at {address} but {reason}; run again with --redeploy"
    )]
    StaleDeployment {
        contract: String,
        address: Address,
        reason: String,
    },

    #[error("no confirmed address for contract `{0}`")]
    UnresolvedAddress(String),

    #[error("contract `{0}` already has an address in this run")]
    DuplicateAddress(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Any error that ends a run in the FAILED state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl RunError {
    /// Whether the failure happened before any transaction was submitted.
    pub fn is_pre_execution(&self) -> bool {
        matches!(self, Self::Planning(_) | Self::Registry(_))
    }
}
