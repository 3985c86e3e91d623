//! One deployment run: plan, deploy, wire.

use std::time::Duration;

use crate::{
    address_table::AddressTable,
    error::RunError,
    executor::DeploymentExecutor,
    manifest::{ContractSpec, WiringStep},
    network::LedgerNetwork,
    planner::{DeploymentPlan, DeploymentPlanner},
    registry::ContractRegistry,
    report::{DeploymentReport, ReportEntry},
    state::{RunState, RunTracker},
    wiring::WiringExecutor,
};

/// Order `specs` and check every contract against its artifact.
///
/// Runs before any network access: a plan rejected here deploys nothing.
pub fn prepare(
    registry: &ContractRegistry,
    specs: &[ContractSpec],
    wiring: &[WiringStep],
) -> Result<DeploymentPlan, RunError> {
    let plan = DeploymentPlanner::plan(specs, wiring)?;
    for spec in plan.contracts() {
        registry.check_spec(spec)?;
    }
    Ok(plan)
}

/// Everything a run produced, successful or not.
#[derive(Debug)]
pub struct RunOutcome {
    /// Final state: `Done` or `Failed`.
    pub state: RunState,
    /// Every state the run went through, in order.
    pub history: Vec<RunState>,
    pub report: DeploymentReport,
    /// Addresses confirmed during the run, including on failure.
    pub addresses: AddressTable,
    pub error: Option<RunError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Done
    }
}

/// A single, strictly sequential deployment run.
///
/// Two runs must never target the same network and sender at the same time;
/// nothing here guards against it.
pub struct DeploymentRun<'a, N> {
    network: &'a N,
    registry: &'a ContractRegistry,
    confirmation_timeout: Duration,
    prior: Option<AddressTable>,
    report: DeploymentReport,
}

impl<'a, N: LedgerNetwork> DeploymentRun<'a, N> {
    pub fn new(network: &'a N, registry: &'a ContractRegistry, confirmation_timeout: Duration) -> Self {
        Self {
            network,
            registry,
            confirmation_timeout,
            prior: None,
            report: DeploymentReport::new(),
        }
    }

    /// Adopt the contracts of a previous run instead of deploying them again.
    pub fn with_prior(mut self, prior: AddressTable) -> Self {
        self.prior = Some(prior);
        self
    }

    /// Stream report entries as they are produced.
    pub fn subscribe(&mut self) -> tokio::sync::mpsc::UnboundedReceiver<ReportEntry> {
        self.report.subscribe()
    }

    pub async fn execute(self, specs: &[ContractSpec], wiring: &[WiringStep]) -> RunOutcome {
        let mut tracker = RunTracker::new();
        let mut addresses = AddressTable::new();
        let mut report = self.report;

        let plan = match prepare(self.registry, specs, wiring) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(error = %e, "Plan rejected, nothing was deployed");
                tracker.enter(RunState::Failed);
                return finish(tracker, report, addresses, Some(e));
            }
        };

        tracing::info!(
            contracts = plan.contracts().len(),
            wiring_steps = plan.wiring().len(),
            "Starting deployment run..."
        );

        let deployer = DeploymentExecutor::new(self.network, self.registry, self.confirmation_timeout);
        if let Err(e) = deployer
            .execute(&plan, self.prior.as_ref(), &mut addresses, &mut report, &mut tracker)
            .await
        {
            tracker.enter(RunState::Failed);
            return finish(tracker, report, addresses, Some(e.into()));
        }

        let wirer = WiringExecutor::new(self.network, self.confirmation_timeout);
        if let Err(e) = wirer
            .execute(plan.wiring(), &addresses, &mut report, &mut tracker)
            .await
        {
            tracker.enter(RunState::Failed);
            return finish(tracker, report, addresses, Some(e.into()));
        }

        tracker.enter(RunState::Done);
        finish(tracker, report, addresses, None)
    }
}

fn finish(
    tracker: RunTracker,
    report: DeploymentReport,
    addresses: AddressTable,
    error: Option<RunError>,
) -> RunOutcome {
    let state = tracker.current();
    match &error {
        None => tracing::info!(state = %state, contracts = addresses.len(), "Deployment run complete"),
        Some(e) => tracing::error!(state = %state, error = %e, "Deployment run failed"),
    }

    RunOutcome {
        state,
        history: tracker.into_history(),
        report,
        addresses,
        error,
    }
}
