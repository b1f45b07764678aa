/// JSON-RPC transport for node endpoints
///
/// Lets the wallet run against a plain Ethereum node (e.g. a dev node with unlocked
/// accounts) instead of an injected browser wallet. Wallet-only methods are mapped onto
/// what a node can answer.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::eip1193::{Eip1193Provider, RequestTransport};
use super::{ProviderError, ProviderResult};
use crate::errors::{WalletError, WalletResult};

/// Wallet provider backed by a node's JSON-RPC endpoint
pub type HttpWalletProvider = Eip1193Provider<HttpTransport>;

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// HTTP client for node RPC communication
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> WalletResult<Self> {
        let client = Client::builder().build().map_err(|e| {
            WalletError::ProviderError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(HttpTransport {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn rpc_call(&self, method: &str, params: Value) -> ProviderResult<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::message(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ProviderError::message(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::message(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(ProviderError::with_code(error.code, error.message));
        }

        Ok(rpc_response.result)
    }

    /// A node cannot change chains, so switching only succeeds when it already serves the target
    async fn check_chain(&self, params: &Value) -> ProviderResult<Value> {
        let wanted = params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::message("Missing chainId parameter"))?;
        let served = self.rpc_call("eth_chainId", Value::Array(vec![])).await?;

        if served.as_str().map(str::to_lowercase) == Some(wanted.to_lowercase()) {
            Ok(Value::Null)
        } else {
            Err(ProviderError::message(format!(
                "Endpoint {} serves chain {} instead of {}",
                self.endpoint, served, wanted
            )))
        }
    }
}

#[async_trait(?Send)]
impl RequestTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> ProviderResult<Value> {
        match method {
            // no prompt on a node; its unlocked accounts are the authorized ones
            "eth_requestAccounts" => self.rpc_call("eth_accounts", params).await,
            "wallet_switchEthereumChain" => self.check_chain(&params).await,
            _ => self.rpc_call(method, params).await,
        }
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl HttpWalletProvider {
    /// Provider for `endpoint`, polling receipts every `poll_interval`
    pub fn connect(endpoint: &str, poll_interval: Duration) -> WalletResult<Self> {
        Ok(Eip1193Provider::new(HttpTransport::new(endpoint)?).with_poll_interval(poll_interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{PendingTransaction, WalletProvider};
    use crate::test_support::serve;
    use crate::units::Address;
    use serde_json::json;

    fn reply(body: Value) -> (u16, String) {
        (200, body.to_string())
    }

    #[tokio::test]
    async fn request_accounts_maps_to_eth_accounts() {
        let (url, server) = serve(vec![reply(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": ["0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"]
        }))])
        .await;

        let provider = HttpWalletProvider::connect(&url, Duration::from_millis(1)).unwrap();
        let accounts = provider.request_accounts().await.unwrap();
        assert_eq!(
            accounts,
            vec![Address::parse("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap()]
        );

        let requests = server.await.unwrap();
        let body = requests[0].json();
        assert_eq!(body["method"], "eth_accounts");
        assert_eq!(body["jsonrpc"], "2.0");
        assert!(requests[0].request_line.starts_with("POST "));
    }

    #[tokio::test]
    async fn rpc_error_keeps_code() {
        let (url, server) = serve(vec![reply(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32601, "message": "method not found" }
        }))])
        .await;

        let transport = HttpTransport::new(url).unwrap();
        let err = transport
            .request("wallet_addEthereumChain", json!([]))
            .await
            .unwrap_err();
        assert_eq!(err.code, Some(-32601));
        assert_eq!(err.message, "method not found");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn http_failure_status_is_error() {
        let (url, server) = serve(vec![(503, "{}".to_string())]).await;

        let transport = HttpTransport::new(url).unwrap();
        let err = transport.request("eth_chainId", json!([])).await.unwrap_err();
        assert!(err.message.contains("503"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn null_receipt_means_pending() {
        let (url, server) = serve(vec![
            reply(json!({ "jsonrpc": "2.0", "id": 1, "result": null })),
            reply(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": { "transactionHash": "0xabc", "blockNumber": "0x2", "status": "0x1" }
            })),
        ])
        .await;

        let provider = HttpWalletProvider::connect(&url, Duration::from_millis(1)).unwrap();
        let receipt = provider
            .wait_for_confirmation(&PendingTransaction {
                tx_hash: "0xabc".into(),
            })
            .await
            .unwrap();
        assert_eq!(receipt.block_number, Some(2));

        let requests = server.await.unwrap();
        assert_ne!(requests[0].json()["id"], requests[1].json()["id"]);
    }

    #[tokio::test]
    async fn switch_succeeds_only_on_served_chain() {
        let (url, server) = serve(vec![
            reply(json!({ "jsonrpc": "2.0", "id": 1, "result": "0xaa36a7" })),
            reply(json!({ "jsonrpc": "2.0", "id": 2, "result": "0x1" })),
        ])
        .await;

        let provider = HttpWalletProvider::connect(&url, Duration::from_millis(1)).unwrap();
        provider.switch_chain(11_155_111).await.unwrap();
        let err = provider.switch_chain(11_155_111).await.unwrap_err();
        assert!(err.message.contains("instead of"));
        assert!(!err.is_unrecognized_chain());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_error() {
        let transport = HttpTransport::new("http://127.0.0.1:1").unwrap();
        let err = transport.request("eth_chainId", json!([])).await.unwrap_err();
        assert!(err.message.contains("HTTP request failed"));
    }
}
