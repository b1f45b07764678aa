//! In-memory wallet provider for tests and demos
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use super::{
    ChainParams, PendingTransaction, ProviderError, ProviderResult, TransactionReceipt,
    WalletProvider,
};
use crate::units::{Address, Wei};

/// How the provider answers the next transfers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendBehavior {
    /// Accept, debit the sender and confirm
    Confirm,
    /// Fail at submission
    Reject(ProviderError),
    /// Submit, then fail while waiting for inclusion
    FailConfirmation(ProviderError),
}

/// Number of calls made per provider method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub request_accounts: usize,
    pub accounts: usize,
    pub switch_chain: usize,
    pub add_chain: usize,
    pub get_balance: usize,
    pub send_transaction: usize,
    pub wait_for_confirmation: usize,
}

/// A transfer the provider accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransfer {
    pub tx_hash: String,
    pub from: Address,
    pub to: Address,
    pub value: Wei,
}

#[derive(Debug)]
struct MemoryState {
    accounts: Vec<Address>,
    authorized: bool,
    reject_connection: bool,
    switch_failure: Option<ProviderError>,
    chain_id: u64,
    known_chains: HashSet<u64>,
    balances: HashMap<Address, Wei>,
    send_behavior: SendBehavior,
    sent: Vec<SentTransfer>,
    calls: CallCounts,
    block_number: u64,
}

/// Scriptable [`WalletProvider`] that keeps balances in memory
#[derive(Debug)]
pub struct InMemoryProvider {
    state: Mutex<MemoryState>,
}

impl InMemoryProvider {
    /// Provider currently on `chain_id`, knowing only that chain
    pub fn new(chain_id: u64) -> Self {
        let mut known_chains = HashSet::new();
        known_chains.insert(chain_id);
        Self {
            state: Mutex::new(MemoryState {
                accounts: Vec::new(),
                authorized: false,
                reject_connection: false,
                switch_failure: None,
                chain_id,
                known_chains,
                balances: HashMap::new(),
                send_behavior: SendBehavior::Confirm,
                sent: Vec::new(),
                calls: CallCounts::default(),
                block_number: 1,
            }),
        }
    }

    /// Add an account with a starting balance; access still has to be requested
    pub fn with_account(self, address: Address, balance: Wei) -> Self {
        {
            let mut state = self.state.lock();
            state.accounts.push(address);
            state.balances.insert(address, balance);
        }
        self
    }

    /// Add an account the user has already authorized
    pub fn with_authorized_account(self, address: Address, balance: Wei) -> Self {
        let provider = self.with_account(address, balance);
        provider.state.lock().authorized = true;
        provider
    }

    pub fn with_known_chain(self, chain_id: u64) -> Self {
        self.state.lock().known_chains.insert(chain_id);
        self
    }

    /// Every access request is declined by the user
    pub fn reject_connection(self) -> Self {
        self.state.lock().reject_connection = true;
        self
    }

    /// Every network switch fails with `error`
    pub fn fail_network_switch(self, error: ProviderError) -> Self {
        self.state.lock().switch_failure = Some(error);
        self
    }

    pub fn set_send_behavior(&self, behavior: SendBehavior) {
        self.state.lock().send_behavior = behavior;
    }

    pub fn set_balance(&self, address: Address, balance: Wei) {
        self.state.lock().balances.insert(address, balance);
    }

    pub fn balance_of(&self, address: &Address) -> Wei {
        self.state
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or(Wei::ZERO)
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    pub fn sent(&self) -> Vec<SentTransfer> {
        self.state.lock().sent.clone()
    }

    pub fn current_chain(&self) -> u64 {
        self.state.lock().chain_id
    }
}

#[async_trait(?Send)]
impl WalletProvider for InMemoryProvider {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        let mut state = self.state.lock();
        state.calls.request_accounts += 1;
        if state.reject_connection {
            return Err(ProviderError::with_code(
                ProviderError::USER_REJECTED,
                "User rejected the request.",
            ));
        }
        state.authorized = true;
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        let mut state = self.state.lock();
        state.calls.accounts += 1;
        if state.authorized {
            Ok(state.accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn chain_id(&self) -> ProviderResult<u64> {
        Ok(self.state.lock().chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> ProviderResult<()> {
        let mut state = self.state.lock();
        state.calls.switch_chain += 1;
        if let Some(error) = &state.switch_failure {
            return Err(error.clone());
        }
        if !state.known_chains.contains(&chain_id) {
            return Err(ProviderError::with_code(
                ProviderError::UNRECOGNIZED_CHAIN,
                format!("Unrecognized chain ID \"0x{:x}\"", chain_id),
            ));
        }
        state.chain_id = chain_id;
        Ok(())
    }

    async fn add_chain(&self, params: &ChainParams) -> ProviderResult<()> {
        let mut state = self.state.lock();
        state.calls.add_chain += 1;
        let chain_id = params
            .chain_id
            .strip_prefix("0x")
            .and_then(|digits| u64::from_str_radix(digits, 16).ok())
            .ok_or_else(|| ProviderError::message(format!("Bad chainId {}", params.chain_id)))?;
        state.known_chains.insert(chain_id);
        state.chain_id = chain_id;
        Ok(())
    }

    async fn get_balance(&self, address: &Address) -> ProviderResult<Wei> {
        let mut state = self.state.lock();
        state.calls.get_balance += 1;
        Ok(state.balances.get(address).copied().unwrap_or(Wei::ZERO))
    }

    async fn send_transaction(
        &self,
        from: &Address,
        to: &Address,
        value: Wei,
    ) -> ProviderResult<PendingTransaction> {
        let mut state = self.state.lock();
        state.calls.send_transaction += 1;
        if let SendBehavior::Reject(error) = &state.send_behavior {
            return Err(error.clone());
        }

        let available = state.balances.get(from).copied().unwrap_or(Wei::ZERO);
        let remaining = available
            .checked_sub(value)
            .ok_or_else(|| ProviderError::message("insufficient funds for transfer"))?;
        let credited = state
            .balances
            .get(to)
            .copied()
            .unwrap_or(Wei::ZERO)
            .checked_add(value)
            .ok_or_else(|| ProviderError::message("balance overflow"))?;
        state.balances.insert(*from, remaining);
        state.balances.insert(*to, credited);

        let tx_hash = format!("0x{:064x}", state.sent.len() + 1);
        state.sent.push(SentTransfer {
            tx_hash: tx_hash.clone(),
            from: *from,
            to: *to,
            value,
        });
        Ok(PendingTransaction { tx_hash })
    }

    async fn wait_for_confirmation(
        &self,
        pending: &PendingTransaction,
    ) -> ProviderResult<TransactionReceipt> {
        let mut state = self.state.lock();
        state.calls.wait_for_confirmation += 1;
        if let SendBehavior::FailConfirmation(error) = &state.send_behavior {
            return Err(error.clone());
        }
        state.block_number += 1;
        Ok(TransactionReceipt {
            tx_hash: pending.tx_hash.clone(),
            block_number: Some(state.block_number),
            status: Some(1),
        })
    }
}
