//! [`LedgerNetwork`] over an Ethereum JSON-RPC endpoint.
//!
//! Transactions are sent with `eth_sendTransaction` from an account managed by
//! the node (a development node, a Clef instance or a signing proxy), so no key
//! material ever enters this process.

use std::time::Duration;

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, Bytes, TxHash, keccak256},
};
use serde::Deserialize;

use crate::{
    config::{ExecutionConfig, NetworkConfig, RetryConfig},
    manifest::ResolvedArg,
    network::{Confirmation, LedgerNetwork, NetworkError},
    registry::ContractArtifact,
    rpc,
};

/// The subset of a transaction receipt the orchestrator needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    /// `0x1` on success, `0x0` on revert. Absent on pre-Byzantium chains.
    status: Option<String>,
    contract_address: Option<Address>,
}

impl From<TransactionReceipt> for Confirmation {
    fn from(receipt: TransactionReceipt) -> Self {
        match receipt.status.as_deref() {
            Some("0x0") => Confirmation::reverted("transaction reverted on-chain"),
            _ => Confirmation::success(receipt.contract_address),
        }
    }
}

/// A connected JSON-RPC ledger network.
#[derive(Debug, Clone)]
pub struct JsonRpcNetwork {
    client: reqwest::Client,
    url: String,
    from: Address,
    chain_id: u64,
    poll_interval: Duration,
    retry: RetryConfig,
}

impl JsonRpcNetwork {
    /// Connect to the network described by `config`.
    ///
    /// Checks the chain id and resolves the sender account once, at run start.
    pub async fn connect(
        config: &NetworkConfig,
        execution: &ExecutionConfig,
    ) -> Result<Self, NetworkError> {
        url::Url::parse(&config.rpc_url).map_err(|e| NetworkError::InvalidUrl {
            url: config.rpc_url.clone(),
            reason: e.to_string(),
        })?;

        let client = rpc::create_client()?;
        let url = config.rpc_url.clone();
        let retry = execution.retry;

        let chain_id: String =
            rpc::json_rpc_query(&client, &url, "eth_chainId", vec![], &retry).await?;
        let chain_id = rpc::parse_quantity("eth_chainId", &chain_id)?;

        if let Some(expected) = config.chain_id.filter(|&expected| expected != chain_id) {
            return Err(NetworkError::ChainMismatch {
                expected,
                actual: chain_id,
            });
        }

        let from = match config.from {
            Some(from) => from,
            None => {
                let accounts: Vec<Address> =
                    rpc::json_rpc_query(&client, &url, "eth_accounts", vec![], &retry).await?;
                accounts.first().copied().ok_or(NetworkError::NoAccount)?
            }
        };

        tracing::info!(rpc_url = %url, chain_id, from = %from, "Connected to ledger network");

        Ok(Self {
            client,
            url,
            from,
            chain_id,
            poll_interval: execution.poll_interval(),
            retry,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn sender(&self) -> Address {
        self.from
    }

    async fn send_transaction(&self, to: Option<Address>, data: Bytes) -> Result<TxHash, NetworkError> {
        let mut tx = serde_json::json!({
            "from": self.from,
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }

        rpc::json_rpc_submit(&self.client, &self.url, "eth_sendTransaction", vec![tx], &self.retry).await
    }

    async fn receipt(&self, tx: TxHash) -> Result<Option<TransactionReceipt>, NetworkError> {
        rpc::json_rpc_query(
            &self.client,
            &self.url,
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx)],
            &self.retry,
        )
        .await
    }
}

impl LedgerNetwork for JsonRpcNetwork {
    async fn submit_deployment(
        &self,
        artifact: &ContractArtifact,
        args: &[ResolvedArg],
    ) -> Result<TxHash, NetworkError> {
        let data = deployment_data(&artifact.bytecode, args)?;
        let tx = self.send_transaction(None, data).await?;
        tracing::debug!(contract = %artifact.contract_name, tx = %tx, "Deployment transaction sent");
        Ok(tx)
    }

    async fn submit_call(
        &self,
        target: Address,
        operation: &str,
        args: &[ResolvedArg],
    ) -> Result<TxHash, NetworkError> {
        let data = call_data(operation, args)?;
        let tx = self.send_transaction(Some(target), data).await?;
        tracing::debug!(to = %target, operation, tx = %tx, "Call transaction sent");
        Ok(tx)
    }

    async fn await_confirmation(
        &self,
        tx: TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, NetworkError> {
        let receipt = rpc::poll_until("transaction receipt", timeout, self.poll_interval, || {
            self.receipt(tx)
        })
        .await?;

        receipt.map(Confirmation::from).ok_or(NetworkError::Timeout(tx))
    }

    async fn has_code(&self, address: Address) -> Result<bool, NetworkError> {
        let code: Bytes = rpc::json_rpc_query(
            &self.client,
            &self.url,
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
            &self.retry,
        )
        .await?;

        Ok(!code.is_empty())
    }
}

/// ABI-encode `args` as a parameter list.
pub fn encode_args(args: &[ResolvedArg]) -> Result<Vec<u8>, NetworkError> {
    let values = args
        .iter()
        .enumerate()
        .map(|(index, arg)| {
            let encoding = |reason: String| NetworkError::Encoding {
                index,
                ty: arg.ty.clone(),
                reason,
            };
            let ty: DynSolType = arg.ty.parse().map_err(|e| encoding(format!("{e}")))?;
            ty.coerce_str(&arg.value).map_err(|e| encoding(format!("{e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DynSolValue::Tuple(values).abi_encode_params())
}

/// Creation code followed by the encoded constructor arguments.
pub fn deployment_data(bytecode: &Bytes, args: &[ResolvedArg]) -> Result<Bytes, NetworkError> {
    let mut data = bytecode.to_vec();
    data.extend(encode_args(args)?);
    Ok(data.into())
}

/// Calldata for `operation`.
///
/// `operation` is either a bare function name, whose signature is derived from
/// the argument types, or a full signature such as `grantRole(bytes32,address)`.
pub fn call_data(operation: &str, args: &[ResolvedArg]) -> Result<Bytes, NetworkError> {
    let signature = if operation.contains('(') {
        operation.to_string()
    } else {
        let types: Vec<&str> = args.iter().map(|a| a.ty.as_str()).collect();
        format!("{}({})", operation, types.join(","))
    };

    let mut data = keccak256(signature.as_bytes())[..4].to_vec();
    data.extend(encode_args(args)?);
    Ok(data.into())
}
