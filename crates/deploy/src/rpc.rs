//! Shared utilities for talking to Ethereum JSON-RPC endpoints.

use std::time::Duration;

use backon::Retryable;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{config::RetryConfig, network::NetworkError};

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, NetworkError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|source| NetworkError::Transport {
            url: String::new(),
            source,
        })
}

/// Make a JSON-RPC call and deserialize the result.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, NetworkError> {
    let transport = |source| NetworkError::Transport {
        url: url.to_string(),
        source,
    };

    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(transport)?;

    let result: Value = response.json().await.map_err(transport)?;

    if let Some(error) = result.get("error") {
        return Err(NetworkError::Rpc {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result_value = result
        .get("result")
        .cloned()
        .ok_or_else(|| NetworkError::Malformed {
            method: method.to_string(),
            reason: "no result in response".to_string(),
        })?;

    serde_json::from_value(result_value).map_err(|e| NetworkError::Malformed {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// Make a read-only JSON-RPC call, retrying transient transport failures.
pub async fn json_rpc_query<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
    retry: &RetryConfig,
) -> Result<T, NetworkError> {
    (|| json_rpc_call(client, url, method, params.clone()))
        .retry(retry.backoff())
        .when(NetworkError::is_transient)
        .notify(|err, delay| {
            tracing::debug!(error = %err, method, ?delay, "RPC query failed, retrying...");
        })
        .await
}

/// Send a transaction-submitting JSON-RPC call.
///
/// Only retried when the request provably never reached the node, so the same
/// transaction is never broadcast twice.
pub async fn json_rpc_submit<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
    retry: &RetryConfig,
) -> Result<T, NetworkError> {
    (|| json_rpc_call(client, url, method, params.clone()))
        .retry(retry.backoff())
        .when(NetworkError::is_unsent)
        .notify(|err, delay| {
            tracing::warn!(error = %err, method, ?delay, "Node unreachable, resending...");
        })
        .await
}

/// Poll `check_fn` until it yields a value or `timeout` elapses.
///
/// Returns `Ok(None)` on timeout. Transient transport errors count as "not
/// ready yet" and the polling goes on; any other error aborts the wait.
pub async fn poll_until<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<Option<T>, NetworkError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, NetworkError>>,
{
    let start = tokio::time::Instant::now();

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => {
                tracing::trace!(what = %name, "Not ready yet, polling again...");
            }
            Err(e) if e.is_transient() => {
                tracing::trace!(error = %e, what = %name, "Check failed, polling again...");
            }
            Err(e) => return Err(e),
        }

        if start.elapsed() >= timeout {
            tracing::debug!(what = %name, ?timeout, "Gave up waiting");
            return Ok(None);
        }

        tokio::time::sleep(interval).await;
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(method: &str, value: &str) -> Result<u64, NetworkError> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|e| NetworkError::Malformed {
        method: method.to_string(),
        reason: format!("invalid quantity `{value}`: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("eth_chainId", "0x7a69").unwrap(), 31337);
        assert_eq!(parse_quantity("eth_chainId", "0x1").unwrap(), 1);
        assert!(matches!(
            parse_quantity("eth_chainId", "0xzz"),
            Err(NetworkError::Malformed { .. })
        ));
    }

    #[tokio::test]
    async fn test_poll_until_returns_first_value() {
        let calls = AtomicUsize::new(0);
        let result = poll_until("counter", Duration::from_secs(5), Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok((n == 2).then_some(n)) }
        })
        .await
        .unwrap();

        assert_eq!(result, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let result: Option<()> = poll_until(
            "never",
            Duration::from_millis(20),
            Duration::from_millis(5),
            || async { Ok(None) },
        )
        .await
        .unwrap();

        assert_eq!(result, None);
    }

    /// A transport error from a port nothing listens on.
    async fn connection_refused() -> NetworkError {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let source = reqwest::Client::new().post(&url).send().await.unwrap_err();
        NetworkError::Transport { url, source }
    }

    #[tokio::test]
    async fn test_poll_until_survives_transport_errors() {
        let first_error = std::sync::Mutex::new(Some(connection_refused().await));
        let calls = AtomicUsize::new(0);

        let result = poll_until("receipt", Duration::from_secs(30), Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            let error = first_error.lock().unwrap().take();
            async move {
                match error {
                    Some(e) => Err(e),
                    None => Ok(Some(7)),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unsent() {
        let error = connection_refused().await;
        assert!(error.is_transient());
        assert!(error.is_unsent());
    }

    #[tokio::test]
    async fn test_poll_until_propagates_errors() {
        let result: Result<Option<()>, _> = poll_until(
            "failing",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || async { Err(NetworkError::NoAccount) },
        )
        .await;

        assert!(matches!(result, Err(NetworkError::NoAccount)));
    }
}
