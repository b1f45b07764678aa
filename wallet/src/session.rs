use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::config_store::NetworkConfig;
use crate::errors::{WalletError, WalletResult};
use crate::provider::WalletProvider;
use crate::units::{Address, Wei};

/// Change notifications emitted by [`WalletSession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected(Address),
    Disconnected,
    BalanceUpdated { address: Address, balance: Wei },
}

/// Identifies the session a fetch was issued for.
///
/// The epoch moves on every connect and disconnect, so a result tagged before either
/// no longer matches and is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTag {
    pub address: Address,
    pub epoch: u64,
}

type Listener = Arc<dyn Fn(&SessionEvent)>;

#[derive(Debug, Default)]
struct SessionState {
    address: Option<Address>,
    balance: Option<Wei>,
    epoch: u64,
}

/// Connection to the user's external wallet.
///
/// Holds the connected address and its balance snapshot in memory only. Cloning shares
/// the same state.
#[derive(Clone)]
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    network: NetworkConfig,
    state: Arc<RwLock<SessionState>>,
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("has_provider", &self.provider.is_some())
            .field("chain_id", &self.network.chain_id)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl WalletSession {
    /// Session with no wallet provider available
    pub fn new(network: NetworkConfig) -> Self {
        Self::build(None, network)
    }

    pub fn with_provider(provider: Arc<dyn WalletProvider>, network: NetworkConfig) -> Self {
        Self::build(Some(provider), network)
    }

    fn build(provider: Option<Arc<dyn WalletProvider>>, network: NetworkConfig) -> Self {
        Self {
            provider,
            network,
            state: Arc::new(RwLock::new(SessionState::default())),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.provider.clone()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn address(&self) -> Option<Address> {
        self.state.read().address
    }

    pub fn is_connected(&self) -> bool {
        self.address().is_some()
    }

    /// Last balance fetched for the connected address
    pub fn balance(&self) -> Option<Wei> {
        self.state.read().balance
    }

    /// Register a listener for session changes
    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Ask the wallet for account access, move it onto the target network and record
    /// the first account.
    pub async fn connect(&self) -> WalletResult<Address> {
        let provider = self.provider.as_ref().ok_or(WalletError::NoProviderFound)?;

        let accounts = provider.request_accounts().await.map_err(|e| {
            log::warn!("Account request failed: {}", e);
            WalletError::ConnectionRejected(e.to_string())
        })?;
        let address = accounts.first().copied().ok_or_else(|| {
            WalletError::ConnectionRejected("Wallet returned no accounts".to_string())
        })?;

        self.ensure_network(provider.as_ref()).await?;
        self.record(address);
        log::info!("Wallet connected: {}", address.truncated());
        Ok(address)
    }

    /// Silently pick up an account the user authorized earlier.
    ///
    /// Returns `None` when there is no provider or no authorized account; the network is
    /// only checked once an account is found.
    pub async fn restore_if_connected(&self) -> WalletResult<Option<Address>> {
        let Some(provider) = self.provider.as_ref() else {
            return Ok(None);
        };

        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                log::warn!("Could not check existing wallet connection: {}", e);
                return Ok(None);
            }
        };
        let Some(address) = accounts.first().copied() else {
            return Ok(None);
        };

        self.ensure_network(provider.as_ref()).await?;
        self.record(address);
        log::info!("Restored wallet connection: {}", address.truncated());
        Ok(Some(address))
    }

    /// Forget the connected account. The wallet itself is not contacted.
    pub fn disconnect(&self) {
        {
            let mut state = self.state.write();
            state.address = None;
            state.balance = None;
            state.epoch += 1;
        }
        log::info!("Wallet disconnected");
        self.emit(&SessionEvent::Disconnected);
    }

    pub async fn get_balance(&self, address: &Address) -> WalletResult<Wei> {
        let provider = self.provider.as_ref().ok_or(WalletError::NoProviderFound)?;
        provider
            .get_balance(address)
            .await
            .map_err(|e| WalletError::ProviderError(e.to_string()))
    }

    pub fn current_tag(&self) -> Option<SessionTag> {
        let state = self.state.read();
        state.address.map(|address| SessionTag {
            address,
            epoch: state.epoch,
        })
    }

    pub fn is_current(&self, tag: &SessionTag) -> bool {
        self.current_tag().as_ref() == Some(tag)
    }

    /// Store a balance fetched for `tag`; returns false and drops it if the session moved on
    pub fn apply_balance(&self, tag: &SessionTag, balance: Wei) -> bool {
        {
            let mut state = self.state.write();
            if state.address != Some(tag.address) || state.epoch != tag.epoch {
                log::debug!("Discarding stale balance for {}", tag.address.truncated());
                return false;
            }
            state.balance = Some(balance);
        }
        self.emit(&SessionEvent::BalanceUpdated {
            address: tag.address,
            balance,
        });
        true
    }

    /// Fetch and store the connected account's balance.
    ///
    /// `Ok(None)` means the session changed while the fetch was in flight.
    pub async fn refresh_balance(&self) -> WalletResult<Option<Wei>> {
        let tag = self.current_tag().ok_or(WalletError::NoActiveSession)?;
        let balance = self.get_balance(&tag.address).await?;
        Ok(self.apply_balance(&tag, balance).then_some(balance))
    }

    async fn ensure_network(&self, provider: &dyn WalletProvider) -> WalletResult<()> {
        let target = self.network.chain_id;
        match provider.chain_id().await {
            Ok(current) if current == target => return Ok(()),
            Ok(current) => log::info!("Switching wallet from chain {} to {}", current, target),
            Err(e) => log::debug!("Could not read current chain: {}", e),
        }

        match provider.switch_chain(target).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                log::info!("Wallet does not know chain {}, registering it", target);
                provider
                    .add_chain(&self.network.chain_params())
                    .await
                    .map_err(|e| WalletError::NetworkSwitchFailed(e.to_string()))
            }
            Err(e) => Err(WalletError::NetworkSwitchFailed(e.to_string())),
        }
    }

    fn record(&self, address: Address) {
        {
            let mut state = self.state.write();
            if state.address != Some(address) {
                state.balance = None;
            }
            state.address = Some(address);
            state.epoch += 1;
        }
        self.emit(&SessionEvent::Connected(address));
    }

    fn emit(&self, event: &SessionEvent) {
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in listeners {
            listener(event);
        }
    }
}
