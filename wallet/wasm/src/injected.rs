//! `window.ethereum` transport
use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use serde::Serialize;
use std::time::Duration;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use sepolia_wallet_lib::{ProviderError, ProviderResult, RequestTransport};

/// EIP-1193 provider injected into the page by a browser wallet extension
pub struct InjectedTransport {
    ethereum: JsValue,
    request: Function,
}

impl InjectedTransport {
    /// Find the injected provider, if the page has one
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(&window, &"ethereum".into()).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        let request = Reflect::get(&ethereum, &"request".into())
            .ok()?
            .dyn_into::<Function>()
            .ok()?;
        Some(Self { ethereum, request })
    }
}

fn provider_error(error: JsValue) -> ProviderError {
    let code = Reflect::get(&error, &"code".into())
        .ok()
        .and_then(|code| code.as_f64())
        .map(|code| code as i64);
    let message = Reflect::get(&error, &"message".into())
        .ok()
        .and_then(|message| message.as_string())
        .or_else(|| error.as_string())
        .unwrap_or_else(|| "Wallet request failed".to_string());
    ProviderError::new(code, message)
}

#[async_trait(?Send)]
impl RequestTransport for InjectedTransport {
    async fn request(&self, method: &str, params: serde_json::Value) -> ProviderResult<serde_json::Value> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let params = params
            .serialize(&serializer)
            .map_err(|e| ProviderError::message(e.to_string()))?;

        let args = Object::new();
        Reflect::set(&args, &"method".into(), &method.into()).map_err(provider_error)?;
        Reflect::set(&args, &"params".into(), &params).map_err(provider_error)?;

        let pending = self
            .request
            .call1(&self.ethereum, &args)
            .map_err(provider_error)?
            .dyn_into::<Promise>()
            .map_err(|_| ProviderError::message("Wallet request did not return a promise"))?;
        let result = JsFuture::from(pending).await.map_err(provider_error)?;

        serde_wasm_bindgen::from_value(result).map_err(|e| ProviderError::message(e.to_string()))
    }

    async fn sleep(&self, duration: Duration) {
        let millis = duration.as_millis().min(i32::MAX as u128) as i32;
        let timer = Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window().and_then(|window| {
                window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
                    .ok()
            });
            if scheduled.is_none() {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let _ = JsFuture::from(timer).await;
    }
}
