//! Wallet screen state
//!
//! [`update`] is a pure transition function: it takes the current [`WalletView`] and an
//! [`Action`] and returns the next view plus the [`Effect`]s to run. Effects are executed
//! by [`WalletContext`](crate::app_state::WalletContext), which feeds their results back
//! in as actions. Results tagged with an address that is no longer connected are dropped.
use serde::Serialize;

use crate::errors::{WalletError, WalletResult};
use crate::history::HistoryView;
use crate::transfer::{TransferOutcome, TransferRequest};
use crate::units::{Address, Wei};
use crate::validation::{TransferValidator, ValidationError};

/// How long a notice stays on screen
pub const NOTICE_DURATION_MS: u32 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Transient user notification (toast)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    pub duration_ms: u32,
    /// Dropped by the first [`Action::Tick`] at or after this time
    pub expires_at_ms: i64,
}

/// The open transfer dialog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferForm {
    pub recipient: String,
    pub amount: String,
    /// Inline message shown under the inputs
    pub error: Option<String>,
    pub submitting: bool,
}

impl TransferForm {
    pub fn request(&self) -> TransferRequest {
        TransferRequest::new(self.recipient.trim(), self.amount.trim())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletView {
    pub address: Option<Address>,
    pub balance: Option<Wei>,
    pub balance_error: Option<String>,
    pub connecting: bool,
    pub transfer: Option<TransferForm>,
    pub history: HistoryView,
    pub history_loading: bool,
    pub notices: Vec<Notice>,
    next_notice_id: u64,
    clock_ms: i64,
}

impl WalletView {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.transfer.as_ref().is_some_and(|form| form.submitting)
    }

    /// Balance as shown next to the account, e.g. `1.5 ETH`
    pub fn balance_text(&self) -> Option<String> {
        self.balance.map(|balance| balance.to_string())
    }

    /// Equal apart from the clock, which is never rendered
    pub(crate) fn renders_same(&self, other: &WalletView) -> bool {
        let mut this = self.clone();
        this.clock_ms = other.clock_ms;
        this == *other
    }

    fn notify(&mut self, level: NoticeLevel, title: &str, description: impl Into<String>) {
        self.next_notice_id += 1;
        self.notices.push(Notice {
            id: self.next_notice_id,
            level,
            title: title.to_string(),
            description: description.into(),
            duration_ms: NOTICE_DURATION_MS,
            expires_at_ms: self.clock_ms + i64::from(NOTICE_DURATION_MS),
        });
    }

    fn set_account(&mut self, address: Address) {
        if self.address != Some(address) {
            self.balance = None;
            self.balance_error = None;
            self.history = HistoryView::default();
        }
        self.address = Some(address);
        self.history_loading = true;
    }

    fn clear_account(&mut self) {
        self.address = None;
        self.balance = None;
        self.balance_error = None;
        self.transfer = None;
        self.history = HistoryView::default();
        self.history_loading = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The screen was opened
    Started,
    Restored(WalletResult<Option<Address>>),
    ConnectRequested,
    ConnectFinished(WalletResult<Address>),
    DisconnectRequested,
    RefreshRequested,
    BalanceLoaded {
        address: Address,
        result: WalletResult<Wei>,
    },
    HistoryLoaded {
        address: Address,
        history: HistoryView,
    },
    TransferOpened,
    TransferCancelled,
    RecipientChanged(String),
    AmountChanged(String),
    TransferSubmitted,
    TransferFinished {
        /// Account the transfer was sent from
        address: Option<Address>,
        outcome: TransferOutcome,
    },
    NoticeDismissed(u64),
    NoticesCleared,
    /// Wall-clock time in milliseconds; expires old notices
    Tick(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RestoreSession,
    Connect,
    Disconnect,
    FetchBalance(Address),
    FetchHistory(Address),
    SubmitTransfer(TransferRequest),
}

fn refresh(address: Address) -> Vec<Effect> {
    vec![Effect::FetchBalance(address), Effect::FetchHistory(address)]
}

fn inline_message(error: &WalletError) -> Option<String> {
    match error {
        WalletError::InvalidAddress(msg) | WalletError::InvalidAmount(msg) => Some(msg.clone()),
        WalletError::NonPositiveAmount => Some(ValidationError::NonPositiveAmount.to_string()),
        WalletError::InsufficientBalance => Some(ValidationError::InsufficientBalance.to_string()),
        _ => None,
    }
}

pub fn update(mut view: WalletView, action: Action) -> (WalletView, Vec<Effect>) {
    let effects = match action {
        Action::Started => vec![Effect::RestoreSession],

        Action::Restored(Ok(Some(address))) => {
            view.set_account(address);
            refresh(address)
        }
        Action::Restored(Ok(None)) => Vec::new(),
        Action::Restored(Err(_)) => {
            view.notify(
                NoticeLevel::Error,
                "Connection Failed",
                "Failed to connect to Sepolia network. Please try again.",
            );
            Vec::new()
        }

        Action::ConnectRequested => {
            if view.connecting || view.is_connected() {
                Vec::new()
            } else {
                view.connecting = true;
                vec![Effect::Connect]
            }
        }
        Action::ConnectFinished(Ok(address)) => {
            view.connecting = false;
            view.set_account(address);
            view.notify(
                NoticeLevel::Success,
                "Wallet Connected",
                "Your MetaMask wallet has been connected successfully!",
            );
            refresh(address)
        }
        Action::ConnectFinished(Err(error)) => {
            view.connecting = false;
            let description = match error {
                WalletError::NoProviderFound => {
                    "No Ethereum wallet found. Please install MetaMask.".to_string()
                }
                _ => "Failed to connect to MetaMask. Please try again.".to_string(),
            };
            view.notify(NoticeLevel::Error, "Connection Failed", description);
            Vec::new()
        }

        Action::DisconnectRequested => {
            if view.is_connected() {
                view.clear_account();
                view.notify(
                    NoticeLevel::Info,
                    "Wallet Disconnected",
                    "Your wallet has been disconnected.",
                );
                vec![Effect::Disconnect]
            } else {
                Vec::new()
            }
        }

        Action::RefreshRequested => match view.address {
            Some(address) => {
                view.history_loading = true;
                refresh(address)
            }
            None => Vec::new(),
        },

        Action::BalanceLoaded { address, result } => {
            if view.address == Some(address) {
                match result {
                    Ok(balance) => {
                        view.balance = Some(balance);
                        view.balance_error = None;
                    }
                    Err(error) => view.balance_error = Some(error.to_string()),
                }
            }
            Vec::new()
        }

        Action::HistoryLoaded { address, history } => {
            if view.address == Some(address) {
                view.history = history;
                view.history_loading = false;
            }
            Vec::new()
        }

        Action::TransferOpened => {
            if view.is_connected() && view.transfer.is_none() {
                view.transfer = Some(TransferForm::default());
            }
            Vec::new()
        }
        Action::TransferCancelled => {
            if !view.is_submitting() {
                view.transfer = None;
            }
            Vec::new()
        }
        Action::RecipientChanged(recipient) => {
            if let Some(form) = view.transfer.as_mut().filter(|form| !form.submitting) {
                form.recipient = recipient;
            }
            Vec::new()
        }
        Action::AmountChanged(amount) => {
            if let Some(form) = view.transfer.as_mut().filter(|form| !form.submitting) {
                form.amount = amount;
            }
            Vec::new()
        }

        Action::TransferSubmitted => {
            let balance = view.balance;
            match view.transfer.as_mut() {
                Some(form) if !form.submitting => {
                    let request = form.request();
                    match TransferValidator::new().validate_with_balance(&request, balance) {
                        Ok(_) => {
                            form.error = None;
                            form.submitting = true;
                            vec![Effect::SubmitTransfer(request)]
                        }
                        Err(reason) => {
                            form.error = Some(reason.to_string());
                            Vec::new()
                        }
                    }
                }
                _ => Vec::new(),
            }
        }

        Action::TransferFinished { address, outcome } => {
            if address.is_none() || view.address != address {
                log::debug!("Ignoring transfer result for a previous session");
                Vec::new()
            } else {
                match outcome {
                    TransferOutcome::Success(reference) => {
                        log::info!("Transfer {} confirmed", reference.tx_hash);
                        view.transfer = None;
                        view.notify(
                            NoticeLevel::Success,
                            "Transaction Sent",
                            "Your transaction has been sent successfully.",
                        );
                        view.history_loading = true;
                        address.map(refresh).unwrap_or_default()
                    }
                    TransferOutcome::Failure(error) => {
                        let inline = inline_message(&error);
                        if inline.is_none() {
                            view.notify(
                                NoticeLevel::Error,
                                "Transaction Failed",
                                "Failed to send transaction. Please try again.",
                            );
                        }
                        if let Some(form) = view.transfer.as_mut() {
                            form.submitting = false;
                            form.error = Some(inline.unwrap_or_else(|| {
                                "Transaction failed. Please try again.".to_string()
                            }));
                        }
                        Vec::new()
                    }
                }
            }
        }

        Action::NoticeDismissed(id) => {
            view.notices.retain(|notice| notice.id != id);
            Vec::new()
        }
        Action::NoticesCleared => {
            view.notices.clear();
            Vec::new()
        }
        Action::Tick(now_ms) => {
            view.clock_ms = view.clock_ms.max(now_ms);
            let clock = view.clock_ms;
            view.notices.retain(|notice| notice.expires_at_ms > clock);
            Vec::new()
        }
    };

    (view, effects)
}
