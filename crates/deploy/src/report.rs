//! Per-run record of every step's outcome, for operators.

use std::fmt;

use alloy_core::primitives::{Address, TxHash};
use comfy_table::{Table, presets::UTF8_FULL};
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::address_table::DeployedContract;

/// The kind of step a report entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepKind {
    Deploy,
    Wire,
}

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Success {
        /// Address of the deployed contract, or of the wired target.
        address: Address,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tx: Option<TxHash>,
    },
    Failure {
        error: String,
    },
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub kind: StepKind,
    /// Contract name for deployments, `Target.operation` for wiring.
    pub name: String,
    pub outcome: StepOutcome,
    /// The contract was taken over from a previous run instead of being deployed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reused: bool,
}

impl ReportEntry {
    pub fn deployed(contract: &DeployedContract) -> Self {
        Self {
            kind: StepKind::Deploy,
            name: contract.name.clone(),
            outcome: StepOutcome::Success {
                address: contract.address,
                tx: Some(contract.deploy_tx),
            },
            reused: false,
        }
    }

    pub fn reused(contract: &DeployedContract) -> Self {
        Self {
            reused: true,
            ..Self::deployed(contract)
        }
    }

    pub fn wired(name: impl Into<String>, target: Address, tx: TxHash) -> Self {
        Self {
            kind: StepKind::Wire,
            name: name.into(),
            outcome: StepOutcome::Success {
                address: target,
                tx: Some(tx),
            },
            reused: false,
        }
    }

    pub fn failed(kind: StepKind, name: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            kind,
            name: name.into(),
            outcome: StepOutcome::Failure {
                error: error.to_string(),
            },
            reused: false,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StepOutcome::Success { .. })
    }
}

/// Ordered list of step outcomes for one run.
///
/// Read-only from the outside: it dereferences to the entry slice. Entries are
/// pushed to every subscriber as soon as they are recorded.
#[derive(Debug, Default, Deref)]
pub struct DeploymentReport {
    #[deref]
    entries: Vec<ReportEntry>,
    subscribers: Vec<mpsc::UnboundedSender<ReportEntry>>,
}

impl DeploymentReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every entry recorded from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ReportEntry> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn record(&mut self, entry: ReportEntry) {
        match &entry.outcome {
            StepOutcome::Success { address, tx } => tracing::info!(
                kind = %entry.kind,
                name = %entry.name,
                address = %address,
                tx = ?tx,
                reused = entry.reused,
                "Step succeeded"
            ),
            StepOutcome::Failure { error } => tracing::error!(
                kind = %entry.kind,
                name = %entry.name,
                error = %error,
                "Step failed"
            ),
        }

        // Dropped receivers are not an error: the presentation side may stop listening.
        self.subscribers.retain(|s| s.send(entry.clone()).is_ok());
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn successes(&self, kind: StepKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == kind && e.is_success())
            .count()
    }

    pub fn attempted(&self, kind: StepKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    pub fn failure(&self) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| !e.is_success())
    }

    /// Render the report as a table.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_header(vec!["#", "Step", "Name", "Status", "Address / Error", "Tx"]);

        for (i, entry) in self.entries.iter().enumerate() {
            let (status, detail, tx) = match &entry.outcome {
                StepOutcome::Success { address, tx } => (
                    if entry.reused { "reused" } else { "ok" },
                    address.to_string(),
                    tx.map(|t| t.to_string()).unwrap_or_default(),
                ),
                StepOutcome::Failure { error } => ("FAILED", error.clone(), String::new()),
            };
            table.add_row(vec![
                (i + 1).to_string(),
                entry.kind.to_string(),
                entry.name.clone(),
                status.to_string(),
                detail,
                tx,
            ]);
        }

        table
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Deployments: {}/{} succeeded, wiring: {}/{} succeeded",
            self.successes(StepKind::Deploy),
            self.attempted(StepKind::Deploy),
            self.successes(StepKind::Wire),
            self.attempted(StepKind::Wire),
        )?;
        write!(f, "{}", self.to_table())
    }
}
