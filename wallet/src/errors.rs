use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletError {
    // Provider / session errors
    NoProviderFound,
    ConnectionRejected(String),
    NetworkSwitchFailed(String),
    ProviderError(String),

    // Validation errors
    InvalidAddress(String),
    InvalidAmount(String),
    NonPositiveAmount,
    InsufficientBalance,

    // Transfer errors
    NoActiveSession,
    SubmissionError(String),
    ConfirmationError(String),

    // History errors
    HistoryFetchError(String),

    // Configuration errors
    ConfigError(String),
}

impl WalletError {
    /// True for the errors produced by transfer validation, which callers display inline
    /// next to the form rather than as a notification.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WalletError::InvalidAddress(_)
                | WalletError::InvalidAmount(_)
                | WalletError::NonPositiveAmount
                | WalletError::InsufficientBalance
        )
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::NoProviderFound => write!(f, "No Ethereum wallet found"),
            WalletError::ConnectionRejected(msg) => write!(f, "Connection rejected: {}", msg),
            WalletError::NetworkSwitchFailed(msg) => write!(f, "Network switch failed: {}", msg),
            WalletError::ProviderError(msg) => write!(f, "Provider error: {}", msg),

            WalletError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            WalletError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            WalletError::NonPositiveAmount => write!(f, "Amount must be greater than 0"),
            WalletError::InsufficientBalance => write!(f, "Insufficient balance"),

            WalletError::NoActiveSession => write!(f, "Please connect your wallet first"),
            WalletError::SubmissionError(msg) => write!(f, "Transaction failed: {}", msg),
            WalletError::ConfirmationError(msg) => {
                write!(f, "Transaction confirmation failed: {}", msg)
            }

            WalletError::HistoryFetchError(msg) => {
                write!(f, "Failed to fetch transactions: {}", msg)
            }

            WalletError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        WalletError::ConfigError(error.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::ConfigError(format!("JSON error: {}", error))
    }
}
