//! EIP-1193 adapter
//!
//! Maps [`WalletProvider`] calls onto the standard `request({ method, params })` surface
//! shared by injected browser wallets and node JSON-RPC endpoints.
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    ChainParams, PendingTransaction, ProviderError, ProviderResult, TransactionReceipt,
    WalletProvider,
};
use crate::units::{Address, Wei};

/// Raw `request` channel to a wallet or node
#[async_trait(?Send)]
pub trait RequestTransport {
    async fn request(&self, method: &str, params: Value) -> ProviderResult<Value>;

    /// Suspend between receipt polls
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

/// [`WalletProvider`] over any EIP-1193 request transport
#[derive(Debug)]
pub struct Eip1193Provider<T> {
    transport: T,
    poll_interval: Duration,
}

impl<T: RequestTransport> Eip1193Provider<T> {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> ProviderResult<R> {
        log::debug!("Provider request {}", method);
        let value = self.transport.request(method, params).await?;
        serde_json::from_value(value).map_err(|e| {
            ProviderError::message(format!("Invalid response to {}: {}", method, e))
        })
    }
}

fn parse_accounts(raw: Vec<String>) -> ProviderResult<Vec<Address>> {
    raw.iter()
        .map(|account| {
            Address::parse(account).map_err(|e| {
                ProviderError::message(format!("Wallet returned bad account {}: {}", account, e))
            })
        })
        .collect()
}

fn parse_u64_quantity(quantity: &str) -> ProviderResult<u64> {
    let parsed = match quantity.strip_prefix("0x") {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => quantity.parse(),
    };
    parsed.map_err(|_| ProviderError::message(format!("Invalid quantity '{}'", quantity)))
}

impl RawReceipt {
    fn into_receipt(self) -> ProviderResult<TransactionReceipt> {
        let status = self.status.as_deref().map(parse_u64_quantity).transpose()?;
        if status == Some(0) {
            return Err(ProviderError::message(format!(
                "Transaction {} reverted",
                self.transaction_hash
            )));
        }
        let block_number = self
            .block_number
            .as_deref()
            .map(parse_u64_quantity)
            .transpose()?;

        Ok(TransactionReceipt {
            tx_hash: self.transaction_hash,
            block_number,
            status,
        })
    }
}

#[async_trait(?Send)]
impl<T: RequestTransport> WalletProvider for Eip1193Provider<T> {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        let raw: Vec<String> = self.call("eth_requestAccounts", json!([])).await?;
        parse_accounts(raw)
    }

    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        let raw: Vec<String> = self.call("eth_accounts", json!([])).await?;
        parse_accounts(raw)
    }

    async fn chain_id(&self) -> ProviderResult<u64> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        parse_u64_quantity(&raw)
    }

    async fn switch_chain(&self, chain_id: u64) -> ProviderResult<()> {
        let _: Value = self
            .call(
                "wallet_switchEthereumChain",
                json!([{ "chainId": format!("0x{:x}", chain_id) }]),
            )
            .await?;
        Ok(())
    }

    async fn add_chain(&self, params: &ChainParams) -> ProviderResult<()> {
        let _: Value = self
            .call("wallet_addEthereumChain", json!([params]))
            .await?;
        Ok(())
    }

    async fn get_balance(&self, address: &Address) -> ProviderResult<Wei> {
        let raw: String = self
            .call("eth_getBalance", json!([address.to_lower_hex(), "latest"]))
            .await?;
        Wei::from_hex_quantity(&raw).map_err(|e| ProviderError::message(e.to_string()))
    }

    async fn send_transaction(
        &self,
        from: &Address,
        to: &Address,
        value: Wei,
    ) -> ProviderResult<PendingTransaction> {
        let tx_hash: String = self
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": from.to_lower_hex(),
                    "to": to.to_lower_hex(),
                    "value": value.to_hex_quantity(),
                }]),
            )
            .await?;
        Ok(PendingTransaction { tx_hash })
    }

    async fn wait_for_confirmation(
        &self,
        pending: &PendingTransaction,
    ) -> ProviderResult<TransactionReceipt> {
        loop {
            let receipt: Option<RawReceipt> = self
                .call("eth_getTransactionReceipt", json!([pending.tx_hash]))
                .await?;
            match receipt {
                Some(raw) => return raw.into_receipt(),
                None => {
                    log::debug!("Transaction {} still pending", pending.tx_hash);
                    self.transport.sleep(self.poll_interval).await;
                }
            }
        }
    }
}
