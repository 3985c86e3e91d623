//! Deploys the contracts of a plan, one at a time, in plan order.

use std::time::Duration;

use crate::{
    address_table::{AddressTable, DeployedContract},
    error::ExecutionError,
    manifest::ContractSpec,
    network::{ConfirmationFailure, LedgerNetwork, confirm_within},
    planner::DeploymentPlan,
    registry::ContractRegistry,
    report::{DeploymentReport, ReportEntry, StepKind},
    state::{RunState, RunTracker},
};

/// Submits deployment transactions and records confirmed addresses.
///
/// A deployment is submitted exactly once. Nothing here ever re-sends a
/// deployment after a timeout: the transaction may still be mined later, and
/// a second one would leave an orphaned instance on-chain.
pub struct DeploymentExecutor<'a, N> {
    network: &'a N,
    registry: &'a ContractRegistry,
    confirmation_timeout: Duration,
}

impl<'a, N: LedgerNetwork> DeploymentExecutor<'a, N> {
    pub fn new(network: &'a N, registry: &'a ContractRegistry, confirmation_timeout: Duration) -> Self {
        Self {
            network,
            registry,
            confirmation_timeout,
        }
    }

    /// Deploy every contract of `plan` into `addresses`, halting at the first failure.
    ///
    /// Contracts already present in `prior` (a previous run's table) are adopted
    /// as-is instead of being deployed again.
    pub async fn execute(
        &self,
        plan: &DeploymentPlan,
        prior: Option<&AddressTable>,
        addresses: &mut AddressTable,
        report: &mut DeploymentReport,
        tracker: &mut RunTracker,
    ) -> Result<(), ExecutionError> {
        let total = plan.contracts().len();

        for (i, spec) in plan.contracts().iter().enumerate() {
            tracker.enter(RunState::Deploying { step: i + 1, total });

            if let Some(existing) = prior.and_then(|p| p.get(&spec.name)).filter(|c| c.confirmed) {
                if let Err(e) = self.check_deployed(existing).await {
                    report.record(ReportEntry::failed(StepKind::Deploy, &spec.name, &e));
                    return Err(e);
                }
                tracing::info!(
                    contract = %spec.name,
                    address = %existing.address,
                    "Reusing contract from previous deployment"
                );
                addresses.insert(existing.clone())?;
                report.record(ReportEntry::reused(existing));
                continue;
            }

            tracing::info!(contract = %spec.name, step = i + 1, total, "Deploying contract...");

            let deployed = match self.deploy_contract(spec, addresses).await {
                Ok(deployed) => deployed,
                Err(e) => {
                    report.record(ReportEntry::failed(StepKind::Deploy, &spec.name, &e));
                    return Err(e);
                }
            };

            addresses.insert(deployed.clone())?;
            report.record(ReportEntry::deployed(&deployed));
        }

        Ok(())
    }

    /// Check that a contract taken over from a previous run still has code on-chain.
    ///
    /// A development node restarted with the same chain id keeps the record valid
    /// while every address it lists is empty.
    async fn check_deployed(&self, contract: &DeployedContract) -> Result<(), ExecutionError> {
        let stale = |reason: String| ExecutionError::StaleDeployment {
            contract: contract.name.clone(),
            address: contract.address,
            reason,
        };

        match self.network.has_code(contract.address).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(stale("no code is deployed there".to_string())),
            Err(e) => Err(stale(format!("its code could not be checked: {e}"))),
        }
    }

    /// Deploy a single contract whose dependencies are all in `addresses`.
    pub async fn deploy_contract(
        &self,
        spec: &ContractSpec,
        addresses: &AddressTable,
    ) -> Result<DeployedContract, ExecutionError> {
        let artifact = self.registry.get(spec.artifact_name())?;
        let args = addresses.resolve(&spec.args)?;

        let tx = self
            .network
            .submit_deployment(artifact, &args)
            .await
            .map_err(|e| ExecutionError::DeploymentReverted {
                contract: spec.name.clone(),
                tx: None,
                reason: e.to_string(),
            })?;

        tracing::debug!(contract = %spec.name, tx = %tx, "Awaiting deployment confirmation...");

        let confirmation = confirm_within(self.network, tx, self.confirmation_timeout)
            .await
            .map_err(|failure| match failure {
                ConfirmationFailure::TimedOut => ExecutionError::DeploymentTimeout {
                    contract: spec.name.clone(),
                    tx,
                    timeout: self.confirmation_timeout,
                },
                ConfirmationFailure::Failed(reason) => ExecutionError::DeploymentReverted {
                    contract: spec.name.clone(),
                    tx: Some(tx),
                    reason,
                },
            })?;

        let address = confirmation
            .contract_address
            .ok_or_else(|| ExecutionError::DeploymentReverted {
                contract: spec.name.clone(),
                tx: Some(tx),
                reason: "receipt carries no contract address".to_string(),
            })?;

        tracing::info!(contract = %spec.name, address = %address, tx = %tx, "Contract deployed");

        Ok(DeployedContract::confirmed(spec.name.clone(), address, tx))
    }
}
