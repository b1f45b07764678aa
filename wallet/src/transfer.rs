//! Transfer submission
//!
//! Validate, send through the session's wallet provider, wait for inclusion and report a
//! typed outcome. One send per call and no retries.
use serde::{Deserialize, Serialize};

use crate::errors::{WalletError, WalletResult};
use crate::provider::PendingTransaction;
use crate::session::WalletSession;
use crate::units::{Address, Wei};
use crate::validation::TransferValidator;

/// A transfer as entered by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: String,
}

impl TransferRequest {
    pub fn new(recipient: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }
}

/// Reference to a confirmed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReference {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub recipient: Address,
    pub value: Wei,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success(TxReference),
    Failure(WalletError),
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success(_))
    }

    pub fn tx_reference(&self) -> Option<&TxReference> {
        match self {
            TransferOutcome::Success(reference) => Some(reference),
            TransferOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&WalletError> {
        match self {
            TransferOutcome::Success(_) => None,
            TransferOutcome::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> WalletResult<TxReference> {
        match self {
            TransferOutcome::Success(reference) => Ok(reference),
            TransferOutcome::Failure(error) => Err(error),
        }
    }
}

impl From<WalletResult<TxReference>> for TransferOutcome {
    fn from(result: WalletResult<TxReference>) -> Self {
        match result {
            Ok(reference) => TransferOutcome::Success(reference),
            Err(error) => TransferOutcome::Failure(error),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferSubmitter {
    validator: TransferValidator,
}

impl TransferSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(&self, request: &TransferRequest, session: &WalletSession) -> TransferOutcome {
        let outcome: TransferOutcome = self.try_submit(request, session).await.into();
        if let TransferOutcome::Failure(error) = &outcome {
            log::warn!("Transfer failed: {}", error);
        }
        outcome
    }

    /// Same as [`submit`](Self::submit) as a `Result`
    pub async fn try_submit(
        &self,
        request: &TransferRequest,
        session: &WalletSession,
    ) -> WalletResult<TxReference> {
        let from = session.address().ok_or(WalletError::NoActiveSession)?;
        let validated = self
            .validator
            .validate_with_balance(request, session.balance())?;
        let provider = session.provider().ok_or(WalletError::NoProviderFound)?;

        log::info!(
            "Sending {} ETH to {}",
            validated.value.format_ether(),
            validated.recipient.truncated()
        );
        let pending: PendingTransaction = provider
            .send_transaction(&from, &validated.recipient, validated.value)
            .await
            .map_err(|e| WalletError::SubmissionError(e.to_string()))?;
        log::info!("Transaction submitted: {}", pending.tx_hash);

        let receipt = provider
            .wait_for_confirmation(&pending)
            .await
            .map_err(|e| WalletError::ConfirmationError(e.to_string()))?;
        log::info!(
            "Transaction {} confirmed in block {:?}",
            receipt.tx_hash,
            receipt.block_number
        );

        Ok(TxReference {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            recipient: validated.recipient,
            value: validated.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::NetworkConfig;
    use crate::provider::memory::{InMemoryProvider, SendBehavior};
    use crate::provider::ProviderError;
    use std::sync::Arc;

    const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn sender() -> Address {
        Address::from_bytes([0x42; 20])
    }

    async fn connected(balance: &str) -> (WalletSession, Arc<InMemoryProvider>) {
        let provider = Arc::new(
            InMemoryProvider::new(NetworkConfig::default().chain_id)
                .with_authorized_account(sender(), Wei::parse_ether(balance).unwrap()),
        );
        let session = WalletSession::with_provider(provider.clone(), NetworkConfig::default());
        session.connect().await.unwrap();
        session.refresh_balance().await.unwrap();
        (session, provider)
    }

    #[tokio::test]
    async fn no_session_makes_no_call() {
        let provider = Arc::new(InMemoryProvider::new(NetworkConfig::default().chain_id));
        let session = WalletSession::with_provider(provider.clone(), NetworkConfig::default());

        let outcome = TransferSubmitter::new()
            .submit(&TransferRequest::new(RECIPIENT, "0.1"), &session)
            .await;
        assert_eq!(outcome, TransferOutcome::Failure(WalletError::NoActiveSession));
        assert_eq!(provider.calls().send_transaction, 0);
    }

    #[tokio::test]
    async fn validation_failure_makes_no_call() {
        let (session, provider) = connected("1.0").await;
        let submitter = TransferSubmitter::new();

        for (request, expected) in [
            (TransferRequest::new("0x123", "0.1"), "address"),
            (TransferRequest::new(RECIPIENT, "0"), "positive"),
            (TransferRequest::new(RECIPIENT, "2"), "balance"),
        ] {
            let outcome = submitter.submit(&request, &session).await;
            let error = outcome.error().unwrap();
            assert!(error.is_validation(), "{expected}: {error:?}");
        }
        assert_eq!(provider.calls().send_transaction, 0);
    }

    #[tokio::test]
    async fn unknown_balance_blocks_send() {
        let provider = Arc::new(
            InMemoryProvider::new(NetworkConfig::default().chain_id)
                .with_authorized_account(sender(), Wei::from_ether(5).unwrap()),
        );
        let session = WalletSession::with_provider(provider.clone(), NetworkConfig::default());
        session.connect().await.unwrap();

        let outcome = TransferSubmitter::new()
            .submit(&TransferRequest::new(RECIPIENT, "0.1"), &session)
            .await;
        assert_eq!(outcome, TransferOutcome::Failure(WalletError::InsufficientBalance));
        assert_eq!(provider.calls().send_transaction, 0);
    }

    #[tokio::test]
    async fn successful_transfer_sends_exactly_once() {
        let (session, provider) = connected("1.0").await;

        let outcome = TransferSubmitter::new()
            .submit(&TransferRequest::new(RECIPIENT, "0.1"), &session)
            .await;
        let reference = outcome.tx_reference().unwrap();
        assert_eq!(reference.recipient.to_checksum(), RECIPIENT);
        assert_eq!(reference.value, Wei::parse_ether("0.1").unwrap());
        assert!(reference.block_number.is_some());

        let calls = provider.calls();
        assert_eq!(calls.send_transaction, 1);
        assert_eq!(calls.wait_for_confirmation, 1);
        assert_eq!(provider.sent()[0].from, sender());
        assert_eq!(provider.sent()[0].tx_hash, reference.tx_hash);
    }

    #[tokio::test]
    async fn rejected_send_is_submission_error() {
        let (session, provider) = connected("1.0").await;
        provider.set_send_behavior(SendBehavior::Reject(ProviderError::with_code(
            ProviderError::USER_REJECTED,
            "User denied transaction signature.",
        )));

        let outcome = TransferSubmitter::new()
            .submit(&TransferRequest::new(RECIPIENT, "0.1"), &session)
            .await;
        assert!(matches!(
            outcome,
            TransferOutcome::Failure(WalletError::SubmissionError(_))
        ));
        assert_eq!(provider.calls().send_transaction, 1);
        assert_eq!(provider.calls().wait_for_confirmation, 0);
    }

    #[tokio::test]
    async fn failed_confirmation_is_confirmation_error() {
        let (session, provider) = connected("1.0").await;
        provider.set_send_behavior(SendBehavior::FailConfirmation(ProviderError::message(
            "Transaction reverted",
        )));

        let result = TransferSubmitter::new()
            .try_submit(&TransferRequest::new(RECIPIENT, "0.1"), &session)
            .await;
        assert!(matches!(result, Err(WalletError::ConfirmationError(_))));
        assert_eq!(provider.calls().send_transaction, 1);
    }
}
