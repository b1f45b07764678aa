use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::app::{update, Action, Effect, WalletView};
use crate::config_store::WalletConfig;
use crate::errors::WalletResult;
use crate::history::{load_history, HistoryClient, HistorySource};
use crate::provider::WalletProvider;
use crate::session::WalletSession;
use crate::transfer::TransferSubmitter;

type ViewListener = Arc<dyn Fn(&WalletView)>;

/// Runs the wallet screen: applies actions to the view and executes the resulting effects
/// against the session, the submitter and the history source.
///
/// Cloning shares the same view and session.
#[derive(Clone)]
pub struct WalletContext {
    config: WalletConfig,
    session: WalletSession,
    submitter: TransferSubmitter,
    history: Arc<dyn HistorySource>,
    view: Arc<RwLock<WalletView>>,
    listeners: Arc<RwLock<Vec<ViewListener>>>,
}

impl fmt::Debug for WalletContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletContext")
            .field("environment", &self.config.environment)
            .field("session", &self.session)
            .field("view", &*self.view.read())
            .finish()
    }
}

impl WalletContext {
    pub fn new(config: WalletConfig, session: WalletSession, history: Arc<dyn HistorySource>) -> Self {
        Self {
            config,
            session,
            submitter: TransferSubmitter::new(),
            history,
            view: Arc::new(RwLock::new(WalletView::default())),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Build the context from configuration, using the HTTP history API
    pub fn initialize(
        config: WalletConfig,
        provider: Option<Arc<dyn WalletProvider>>,
    ) -> WalletResult<Self> {
        config.validate()?;
        let session = match provider {
            Some(provider) => WalletSession::with_provider(provider, config.network.clone()),
            None => {
                log::warn!("No wallet provider available");
                WalletSession::new(config.network.clone())
            }
        };
        let history = Arc::new(HistoryClient::new(config.history_api_url.clone())?);
        log::info!(
            "Wallet context initialized for {} (chain {})",
            config.environment,
            config.network.chain_id
        );
        Ok(Self::new(config, session, history))
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn view(&self) -> WalletView {
        self.view.read().clone()
    }

    /// Called with the new view after every action that changes it
    pub fn on_change(&self, listener: impl Fn(&WalletView) + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Apply `action` and run effects until none are left.
    ///
    /// Every dispatch first advances the view clock, so expired notices drop out.
    pub async fn dispatch(&self, action: Action) {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut queue = VecDeque::from([Action::Tick(now_ms), action]);
        while let Some(action) = queue.pop_front() {
            let effects = self.apply(action);
            for effect in effects {
                if let Some(follow_up) = self.perform(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    fn apply(&self, action: Action) -> Vec<Effect> {
        log::debug!("Applying {:?}", action);
        let (snapshot, effects) = {
            let mut view = self.view.write();
            let previous = view.clone();
            let (next, effects) = update(std::mem::take(&mut *view), action);
            *view = next;
            let changed = !view.renders_same(&previous);
            (changed.then(|| view.clone()), effects)
        };
        let Some(snapshot) = snapshot else {
            return effects;
        };

        let listeners: Vec<ViewListener> = self.listeners.read().clone();
        for listener in listeners {
            listener(&snapshot);
        }
        effects
    }

    /// Execute one effect, returning the action that reports its result
    pub async fn perform(&self, effect: Effect) -> Option<Action> {
        match effect {
            Effect::RestoreSession => {
                Some(Action::Restored(self.session.restore_if_connected().await))
            }
            Effect::Connect => Some(Action::ConnectFinished(self.session.connect().await)),
            Effect::Disconnect => {
                self.session.disconnect();
                None
            }
            Effect::FetchBalance(address) => {
                let tag = self.session.current_tag().filter(|tag| tag.address == address)?;
                let result = self.session.get_balance(&address).await;
                if let Ok(balance) = &result {
                    self.session.apply_balance(&tag, *balance);
                }
                Some(Action::BalanceLoaded { address, result })
            }
            Effect::FetchHistory(address) => {
                let history = load_history(self.history.as_ref(), &address).await;
                Some(Action::HistoryLoaded { address, history })
            }
            Effect::SubmitTransfer(request) => {
                let address = self.session.address();
                let outcome = self.submitter.submit(&request, &self.session).await;
                Some(Action::TransferFinished { address, outcome })
            }
        }
    }
}
