//! Interface to the ledger network that executes and confirms transactions.

use std::{future::Future, time::Duration};

use alloy_core::primitives::{Address, TxHash};
use thiserror::Error;

use crate::{manifest::ResolvedArg, registry::ContractArtifact};

/// Final status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub success: bool,
    /// Address of the created contract, for deployment transactions.
    pub contract_address: Option<Address>,
    /// Revert reason or node error, for failed transactions.
    pub error: Option<String>,
}

impl Confirmation {
    pub fn success(contract_address: Option<Address>) -> Self {
        Self {
            success: true,
            contract_address,
            error: None,
        }
    }

    pub fn reverted(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            contract_address: None,
            error: Some(reason.into()),
        }
    }
}

/// Errors raised by a [`LedgerNetwork`] implementation.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} failed with RPC error {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("malformed {method} response: {reason}")]
    Malformed { method: String, reason: String },

    #[error("connected to chain {actual}, expected chain {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("cannot encode argument {index} as `{ty}`: {reason}")]
    Encoding {
        index: usize,
        ty: String,
        reason: String,
    },

    #[error("the node exposes no account to send transactions from")]
    NoAccount,

    #[error("invalid RPC URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("transaction {0} was not confirmed in time")]
    Timeout(TxHash),
}

impl NetworkError {
    /// Failures worth retrying on an idempotent request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// The request never reached the node, so resending it cannot duplicate a transaction.
    pub fn is_unsent(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_connect())
    }
}

/// The ledger network collaborator.
///
/// Implementations own transport, signing and fee handling. The orchestrator
/// only submits transactions and waits for their confirmation, one at a time.
pub trait LedgerNetwork: Send + Sync {
    /// Broadcast the creation of `artifact` with constructor `args`.
    fn submit_deployment(
        &self,
        artifact: &ContractArtifact,
        args: &[ResolvedArg],
    ) -> impl Future<Output = Result<TxHash, NetworkError>> + Send;

    /// Broadcast a call to `operation` on the contract at `target`.
    fn submit_call(
        &self,
        target: Address,
        operation: &str,
        args: &[ResolvedArg],
    ) -> impl Future<Output = Result<TxHash, NetworkError>> + Send;

    /// Wait until `tx` is mined, for at most `timeout`.
    fn await_confirmation(
        &self,
        tx: TxHash,
        timeout: Duration,
    ) -> impl Future<Output = Result<Confirmation, NetworkError>> + Send;

    /// Whether a contract is currently deployed at `address`.
    fn has_code(&self, address: Address) -> impl Future<Output = Result<bool, NetworkError>> + Send;
}

/// Why a transaction did not confirm successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConfirmationFailure {
    TimedOut,
    Failed(String),
}

/// Await `tx` under a hard upper bound of `timeout`, whatever the network does.
pub(crate) async fn confirm_within<N: LedgerNetwork>(
    network: &N,
    tx: TxHash,
    timeout: Duration,
) -> Result<Confirmation, ConfirmationFailure> {
    match tokio::time::timeout(timeout, network.await_confirmation(tx, timeout)).await {
        Err(_) | Ok(Err(NetworkError::Timeout(_))) => Err(ConfirmationFailure::TimedOut),
        Ok(Err(e)) => Err(ConfirmationFailure::Failed(e.to_string())),
        Ok(Ok(confirmation)) if !confirmation.success => Err(ConfirmationFailure::Failed(
            confirmation
                .error
                .unwrap_or_else(|| "transaction reverted".to_string()),
        )),
        Ok(Ok(confirmation)) => Ok(confirmation),
    }
}
