//! Post-deployment configuration calls.

use std::time::Duration;

use alloy_core::primitives::{Address, TxHash};

use crate::{
    address_table::AddressTable,
    error::ExecutionError,
    manifest::WiringStep,
    network::{ConfirmationFailure, LedgerNetwork, confirm_within},
    report::{DeploymentReport, ReportEntry, StepKind},
    state::{RunState, RunTracker},
};

/// Runs wiring steps against a finalized address table, in declaration order.
///
/// A failed step stops the remaining ones but never touches the deployed
/// contracts: the report keeps every deployment as succeeded.
pub struct WiringExecutor<'a, N> {
    network: &'a N,
    confirmation_timeout: Duration,
}

impl<'a, N: LedgerNetwork> WiringExecutor<'a, N> {
    pub fn new(network: &'a N, confirmation_timeout: Duration) -> Self {
        Self {
            network,
            confirmation_timeout,
        }
    }

    pub async fn execute(
        &self,
        steps: &[WiringStep],
        addresses: &AddressTable,
        report: &mut DeploymentReport,
        tracker: &mut RunTracker,
    ) -> Result<(), ExecutionError> {
        let total = steps.len();

        for (i, step) in steps.iter().enumerate() {
            tracker.enter(RunState::Wiring { step: i + 1, total });
            tracing::info!(step = %step.label(), index = i + 1, total, "Wiring...");

            match self.wire(step, addresses).await {
                Ok((target, tx)) => report.record(ReportEntry::wired(step.label(), target, tx)),
                Err(e) => {
                    report.record(ReportEntry::failed(StepKind::Wire, step.label(), &e));
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Submit one wiring call and wait for it to confirm.
    ///
    /// Returns the target address together with the confirmed transaction.
    pub async fn wire(
        &self,
        step: &WiringStep,
        addresses: &AddressTable,
    ) -> Result<(Address, TxHash), ExecutionError> {
        let args = addresses.resolve(&step.args)?;
        let target = addresses
            .address_of(&step.target)
            .ok_or_else(|| ExecutionError::UnresolvedAddress(step.target.clone()))?;

        let tx = self
            .network
            .submit_call(target, &step.operation, &args)
            .await
            .map_err(|e| ExecutionError::WiringReverted {
                step: step.label(),
                tx: None,
                reason: e.to_string(),
            })?;

        confirm_within(self.network, tx, self.confirmation_timeout)
            .await
            .map_err(|failure| match failure {
                ConfirmationFailure::TimedOut => ExecutionError::WiringTimeout {
                    step: step.label(),
                    tx,
                    timeout: self.confirmation_timeout,
                },
                ConfirmationFailure::Failed(reason) => ExecutionError::WiringReverted {
                    step: step.label(),
                    tx: Some(tx),
                    reason,
                },
            })?;

        tracing::info!(step = %step.label(), to = %target, tx = %tx, "Wiring confirmed");
        Ok((target, tx))
    }
}
