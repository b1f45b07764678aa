use crate::errors::WalletError;
use crate::transfer::TransferRequest;
use crate::units::{Address, SignedEther, Wei};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reasons a proposed transfer is refused before anything is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    InvalidAddress,
    InvalidAmount,
    NonPositiveAmount,
    InsufficientBalance,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::InvalidAddress => write!(f, "Invalid Ethereum address."),
            ValidationError::InvalidAmount => {
                write!(f, "Invalid input. Please check the amount.")
            }
            ValidationError::NonPositiveAmount => write!(f, "Amount must be greater than 0."),
            ValidationError::InsufficientBalance => write!(f, "Insufficient balance."),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for WalletError {
    fn from(error: ValidationError) -> Self {
        match error {
            ValidationError::InvalidAddress => {
                WalletError::InvalidAddress(error.to_string())
            }
            ValidationError::InvalidAmount => WalletError::InvalidAmount(error.to_string()),
            ValidationError::NonPositiveAmount => WalletError::NonPositiveAmount,
            ValidationError::InsufficientBalance => WalletError::InsufficientBalance,
        }
    }
}

/// A transfer that passed every check, with its inputs already parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub recipient: Address,
    pub value: Wei,
}

pub type ValidationResult = Result<ValidatedTransfer, ValidationError>;

/// Pure checks run on a transfer before it reaches the wallet provider.
///
/// Checks run in a fixed order and the first failure wins: recipient format, amount
/// syntax, amount sign, then balance. An unknown balance never passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferValidator;

impl TransferValidator {
    pub fn new() -> Self {
        TransferValidator
    }

    /// Validate against a balance given as an ETH decimal string, as shown to the user
    pub fn validate(
        &self,
        request: &TransferRequest,
        current_balance: Option<&str>,
    ) -> ValidationResult {
        let balance = current_balance.and_then(|raw| Wei::parse_ether(raw).ok());
        self.validate_with_balance(request, balance)
    }

    /// Validate against a balance already expressed in wei
    pub fn validate_with_balance(
        &self,
        request: &TransferRequest,
        current_balance: Option<Wei>,
    ) -> ValidationResult {
        let recipient =
            Address::parse(&request.recipient).map_err(|_| ValidationError::InvalidAddress)?;

        let amount =
            SignedEther::parse(&request.amount).map_err(|_| ValidationError::InvalidAmount)?;

        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount);
        }

        match current_balance {
            Some(balance) if !amount.overflowed && amount.magnitude <= balance => Ok(ValidatedTransfer {
                recipient,
                value: amount.magnitude,
            }),
            _ => Err(ValidationError::InsufficientBalance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn request(recipient: &str, amount: &str) -> TransferRequest {
        TransferRequest::new(recipient, amount)
    }

    #[test]
    fn accepts_valid_transfer() {
        let validated = TransferValidator::new()
            .validate(&request(RECIPIENT, "0.1"), Some("1.0"))
            .unwrap();
        assert_eq!(validated.recipient.to_checksum(), RECIPIENT);
        assert_eq!(validated.value.as_u128(), 100_000_000_000_000_000);
    }

    #[test]
    fn invalid_address_wins_regardless_of_amount_or_balance() {
        let validator = TransferValidator::new();
        for (amount, balance) in [
            ("1.0", Some("2.0")),
            ("abc", None),
            ("-5", Some("0")),
            ("100", Some("1")),
        ] {
            assert_eq!(
                validator.validate(&request("not-an-address", amount), balance),
                Err(ValidationError::InvalidAddress)
            );
        }
    }

    #[test]
    fn malformed_amount_is_invalid() {
        let validator = TransferValidator::new();
        for amount in ["", "abc", "1.2.3", "0.0000000000000000001"] {
            assert_eq!(
                validator.validate(&request(RECIPIENT, amount), Some("10")),
                Err(ValidationError::InvalidAmount),
                "{amount:?}"
            );
        }
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let validator = TransferValidator::new();
        for amount in ["0", "0.0", "-1", "-0.000000000000000001"] {
            assert_eq!(
                validator.validate(&request(RECIPIENT, amount), Some("10")),
                Err(ValidationError::NonPositiveAmount),
                "{amount:?}"
            );
        }
    }

    #[test]
    fn amount_above_balance_rejected() {
        let validator = TransferValidator::new();
        assert_eq!(
            validator.validate(&request(RECIPIENT, "1.000000000000000001"), Some("1")),
            Err(ValidationError::InsufficientBalance)
        );
        assert!(validator
            .validate(&request(RECIPIENT, "1"), Some("1.0"))
            .is_ok());
    }

    #[test]
    fn amounts_beyond_wei_range_reach_sign_and_balance_checks() {
        let validator = TransferValidator::new();
        assert_eq!(
            validator.validate(&request(RECIPIENT, "400000000000000000000"), Some("1.0")),
            Err(ValidationError::InsufficientBalance)
        );
        assert_eq!(
            validator.validate(&request(RECIPIENT, "-400000000000000000000"), Some("1.0")),
            Err(ValidationError::NonPositiveAmount)
        );
        assert_eq!(
            validator.validate_with_balance(
                &request(RECIPIENT, "400000000000000000000"),
                Some(Wei::new(u128::MAX))
            ),
            Err(ValidationError::InsufficientBalance)
        );
    }

    #[test]
    fn unknown_balance_blocks_submission() {
        let validator = TransferValidator::new();
        assert_eq!(
            validator.validate(&request(RECIPIENT, "0.1"), None),
            Err(ValidationError::InsufficientBalance)
        );
        assert_eq!(
            validator.validate(&request(RECIPIENT, "0.1"), Some("loading")),
            Err(ValidationError::InsufficientBalance)
        );
    }

    #[test]
    fn validation_is_deterministic() {
        let validator = TransferValidator::new();
        let req = request(RECIPIENT, "0.5");
        let first = validator.validate(&req, Some("0.4"));
        for _ in 0..3 {
            assert_eq!(validator.validate(&req, Some("0.4")), first);
        }
    }

    #[test]
    fn converts_into_wallet_error() {
        assert_eq!(
            WalletError::from(ValidationError::InsufficientBalance),
            WalletError::InsufficientBalance
        );
        assert!(WalletError::from(ValidationError::InvalidAddress).is_validation());
    }
}
