// lib.rs - Core library structure for the Sepolia wallet

pub mod app;
pub mod app_state;
pub mod config_store;
pub mod errors;
pub mod history;
pub mod provider;
pub mod session;
pub mod transfer;
pub mod units;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export common types
pub use app::{update, Action, Effect, Notice, NoticeLevel, TransferForm, WalletView};
pub use app_state::WalletContext;
pub use config_store::{ConfigStore, NetworkConfig, WalletConfig, SEPOLIA_CHAIN_ID};
pub use errors::{WalletError, WalletResult};
pub use history::{decode_history, load_history, HistoryClient, HistoryEntry, HistorySource, HistoryView};
#[cfg(feature = "native")]
pub use provider::{HttpTransport, HttpWalletProvider};
pub use provider::{
    ChainParams, Eip1193Provider, PendingTransaction, ProviderError, ProviderResult, RequestTransport,
    TransactionReceipt, WalletProvider,
};
pub use session::{SessionEvent, SessionTag, WalletSession};
pub use transfer::{TransferOutcome, TransferRequest, TransferSubmitter, TxReference};
pub use units::{Address, SignedEther, Wei};
pub use validation::{TransferValidator, ValidatedTransfer, ValidationError, ValidationResult};
