//! Wallet provider capability
//!
//! Everything the wallet needs from an external wallet (accounts, network, balance,
//! sending) goes through [`WalletProvider`]. Production code talks EIP-1193 through
//! [`Eip1193Provider`] over a [`RequestTransport`]; tests use [`memory::InMemoryProvider`].

pub mod eip1193;
#[cfg(feature = "native")]
pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::{Address, Wei};

pub use eip1193::{Eip1193Provider, RequestTransport};
#[cfg(feature = "native")]
pub use http::{HttpTransport, HttpWalletProvider};

/// Error reported by a wallet provider, with the EIP-1193 code when one was given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    /// The user rejected the request in the wallet
    pub const USER_REJECTED: i64 = 4001;
    /// The wallet does not know the requested chain
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;

    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self::new(Some(code), message)
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(Self::USER_REJECTED)
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == Some(Self::UNRECOGNIZED_CHAIN)
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Native currency description used when registering a chain with the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// `wallet_addEthereumChain` parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    /// Hex chain id, e.g. `0xaa36a7`
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

/// Handle for a submitted transaction that has not been confirmed yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub tx_hash: String,
}

/// Inclusion receipt for a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub status: Option<u64>,
}

/// Capability interface over an external wallet.
///
/// Calls may suspend for as long as the wallet takes (user prompts, network); no timeout
/// is applied here. Implementations are single-threaded, hence `?Send`.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Ask the user for account access (may prompt)
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>>;

    /// Accounts already authorized for this origin, without prompting
    async fn accounts(&self) -> ProviderResult<Vec<Address>>;

    async fn chain_id(&self) -> ProviderResult<u64>;

    async fn switch_chain(&self, chain_id: u64) -> ProviderResult<()>;

    async fn add_chain(&self, params: &ChainParams) -> ProviderResult<()>;

    async fn get_balance(&self, address: &Address) -> ProviderResult<Wei>;

    async fn send_transaction(
        &self,
        from: &Address,
        to: &Address,
        value: Wei,
    ) -> ProviderResult<PendingTransaction>;

    /// Resolve once the transaction is included; a reverted transaction is an error
    async fn wait_for_confirmation(
        &self,
        pending: &PendingTransaction,
    ) -> ProviderResult<TransactionReceipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_codes() {
        let rejected = ProviderError::with_code(ProviderError::USER_REJECTED, "User denied");
        assert!(rejected.is_user_rejection());
        assert!(!rejected.is_unrecognized_chain());
        assert_eq!(rejected.to_string(), "User denied (code 4001)");

        let plain = ProviderError::message("boom");
        assert_eq!(plain.to_string(), "boom");
        assert!(!plain.is_user_rejection());
    }

    #[test]
    fn chain_params_use_wallet_field_names() {
        let params = ChainParams {
            chain_id: "0xaa36a7".into(),
            chain_name: "Sepolia Test Network".into(),
            rpc_urls: vec!["https://rpc.sepolia.org".into()],
            native_currency: NativeCurrency {
                name: "SepoliaETH".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
            block_explorer_urls: vec!["https://sepolia.etherscan.io/".into()],
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["chainId"], "0xaa36a7");
        assert_eq!(json["rpcUrls"][0], "https://rpc.sepolia.org");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
        assert_eq!(json["blockExplorerUrls"][0], "https://sepolia.etherscan.io/");
    }
}
