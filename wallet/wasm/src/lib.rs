//! Sepolia Wallet WebAssembly Library
//!
//! Exposes the wallet screen to a web page. The page renders the snapshot passed to the
//! `onChange` callback and forwards user input to the `BrowserWallet` methods; all wallet
//! calls go through the injected `window.ethereum` provider.

use std::sync::Arc;
use std::time::Duration;

use js_sys::{Function, Promise};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use sepolia_wallet_lib::{
    Action, Eip1193Provider, HistoryEntry, Notice, TransferForm, TransferRequest,
    TransferValidator, WalletConfig, WalletContext, WalletProvider, WalletView,
};

mod injected;
pub use injected::InjectedTransport;

fn js_error(message: impl ToString) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn from_js<T: for<'de> Deserialize<'de>>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(js_error)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

/// What the page renders
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsView {
    address: Option<String>,
    short_address: Option<String>,
    balance: Option<String>,
    balance_error: Option<String>,
    connecting: bool,
    transfer: Option<TransferForm>,
    history: Vec<HistoryEntry>,
    history_error: Option<String>,
    history_loading: bool,
    notices: Vec<Notice>,
}

impl From<&WalletView> for JsView {
    fn from(view: &WalletView) -> Self {
        Self {
            address: view.address.map(|a| a.to_checksum()),
            short_address: view.address.map(|a| a.truncated()),
            balance: view.balance.map(|b| b.format_ether()),
            balance_error: view.balance_error.clone(),
            connecting: view.connecting,
            transfer: view.transfer.clone(),
            history: view.history.entries.clone(),
            history_error: view.history.error.as_ref().map(|e| e.to_string()),
            history_loading: view.history_loading,
            notices: view.notices.clone(),
        }
    }
}

/// Wallet screen bound to the page's injected provider
#[wasm_bindgen]
pub struct BrowserWallet {
    ctx: WalletContext,
}

#[wasm_bindgen]
impl BrowserWallet {
    /// `config` may be omitted or hold any subset of the wallet configuration fields
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<BrowserWallet, JsValue> {
        let config: WalletConfig = if config.is_undefined() || config.is_null() {
            WalletConfig::default()
        } else {
            from_js(config)?
        };

        let provider = InjectedTransport::detect().map(|transport| {
            let provider = Eip1193Provider::new(transport)
                .with_poll_interval(Duration::from_millis(config.confirmation_poll_ms));
            Arc::new(provider) as Arc<dyn WalletProvider>
        });
        let ctx = WalletContext::initialize(config, provider).map_err(js_error)?;
        Ok(BrowserWallet { ctx })
    }

    #[wasm_bindgen(js_name = "hasProvider")]
    pub fn has_provider(&self) -> bool {
        self.ctx.session().has_provider()
    }

    /// Call `callback` with a fresh view snapshot after every change
    #[wasm_bindgen(js_name = "onChange")]
    pub fn on_change(&self, callback: Function) {
        self.ctx.on_change(move |view| match to_js(&JsView::from(view)) {
            Ok(snapshot) => {
                if let Err(e) = callback.call1(&JsValue::NULL, &snapshot) {
                    web_sys::console::error_2(&"onChange callback failed".into(), &e);
                }
            }
            Err(e) => web_sys::console::error_1(&e),
        });
    }

    pub fn view(&self) -> Result<JsValue, JsValue> {
        to_js(&JsView::from(&self.ctx.view()))
    }

    /// Pick up a previously authorized account
    pub fn start(&self) -> Promise {
        self.run(Action::Started)
    }

    pub fn connect(&self) -> Promise {
        self.run(Action::ConnectRequested)
    }

    pub fn disconnect(&self) -> Promise {
        self.run(Action::DisconnectRequested)
    }

    pub fn refresh(&self) -> Promise {
        self.run(Action::RefreshRequested)
    }

    #[wasm_bindgen(js_name = "openTransfer")]
    pub fn open_transfer(&self) -> Promise {
        self.run(Action::TransferOpened)
    }

    #[wasm_bindgen(js_name = "cancelTransfer")]
    pub fn cancel_transfer(&self) -> Promise {
        self.run(Action::TransferCancelled)
    }

    #[wasm_bindgen(js_name = "setRecipient")]
    pub fn set_recipient(&self, recipient: String) -> Promise {
        self.run(Action::RecipientChanged(recipient))
    }

    #[wasm_bindgen(js_name = "setAmount")]
    pub fn set_amount(&self, amount: String) -> Promise {
        self.run(Action::AmountChanged(amount))
    }

    /// Resolves once the transfer is confirmed or has failed
    #[wasm_bindgen(js_name = "submitTransfer")]
    pub fn submit_transfer(&self) -> Promise {
        self.run(Action::TransferSubmitted)
    }

    #[wasm_bindgen(js_name = "dismissNotice")]
    pub fn dismiss_notice(&self, id: f64) -> Promise {
        self.run(Action::NoticeDismissed(id as u64))
    }

    #[wasm_bindgen(js_name = "clearNotices")]
    pub fn clear_notices(&self) -> Promise {
        self.run(Action::NoticesCleared)
    }

    /// Drop notices whose display time has passed; call from a page timer
    #[wasm_bindgen(js_name = "expireNotices")]
    pub fn expire_notices(&self) -> Promise {
        self.run(Action::Tick(js_sys::Date::now() as i64))
    }

    fn run(&self, action: Action) -> Promise {
        let ctx = self.ctx.clone();
        future_to_promise(async move {
            ctx.dispatch(action).await;
            to_js(&JsView::from(&ctx.view()))
        })
    }
}

/// Check a transfer without sending it; returns the message to show, or `undefined`
#[wasm_bindgen(js_name = "validateTransfer")]
pub fn validate_transfer(recipient: &str, amount: &str, balance: Option<String>) -> Option<String> {
    TransferValidator::new()
        .validate(&TransferRequest::new(recipient, amount), balance.as_deref())
        .err()
        .map(|reason| reason.to_string())
}

// Module initialization
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"Sepolia Wallet WASM module loaded".into());
}
