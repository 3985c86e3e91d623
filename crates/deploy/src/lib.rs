//! rigger-deploy - Deployment library for interdependent smart contracts.
//!
//! This crate deploys a set of contracts whose constructors reference each
//! other, in dependency order, then runs the post-deployment wiring calls that
//! connect them. Every step is confirmed before the next one starts, and each
//! run produces a [`DeploymentReport`].

mod address_table;
pub use address_table::{AddressTable, DeployedContract};

mod config;
pub use config::{
    DEFAULT_DEV_CHAIN_ID, DEFAULT_NETWORK, DEFAULT_RPC_URL, ExecutionConfig, NetworkConfig,
    RetryConfig, RiggerConfig,
};

mod deployer;
pub use deployer::{Deployer, RECORD_FILENAME, REPORT_FILENAME, RIGGER_CONFIG_FILENAME};

mod error;
pub use error::{ExecutionError, NetworkError, PlanningError, RegistryError, RunError};

pub mod evm;
pub use evm::JsonRpcNetwork;

mod executor;
pub use executor::DeploymentExecutor;

mod manifest;
pub use manifest::{ConstructorArg, ContractSpec, ResolvedArg, WiringStep};

mod network;
pub use network::{Confirmation, LedgerNetwork};

mod planner;
pub use planner::{DeploymentPlan, DeploymentPlanner};

mod record;
pub use record::{DeploymentRecord, manifest_hash};

mod registry;
pub use registry::{ContractArtifact, ContractRegistry};

mod report;
pub use report::{DeploymentReport, ReportEntry, StepKind, StepOutcome};

pub mod rpc;

mod run;
pub use run::{DeploymentRun, RunOutcome, prepare};

mod state;
pub use state::{RunState, RunTracker};

mod wiring;
pub use wiring::WiringExecutor;
