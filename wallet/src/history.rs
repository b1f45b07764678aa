//! Transaction history from the indexing API
//!
//! `GET {base}/transactions?address=<address>` answers either a bare array of entries or a
//! `{ "success": bool, "data": [...], "error": "..." }` envelope. Failures never reach the
//! caller as faults: [`load_history`] degrades to an empty list plus the error.
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{WalletError, WalletResult};
use crate::units::Address;

/// One transfer as reported by the history API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, alias = "hash")]
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    /// ETH decimal string
    #[serde(deserialize_with = "string_or_number")]
    pub amount: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// `YYYY-MM-DD HH:MM:SS UTC`, or the raw timestamp when it is out of range
    pub fn display_time(&self) -> String {
        match self.time() {
            Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => self.timestamp.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected amount string, got {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryPayload {
    Bare(Vec<HistoryEntry>),
    Envelope {
        #[serde(default = "default_success")]
        success: bool,
        #[serde(default)]
        data: Option<Vec<HistoryEntry>>,
        #[serde(default)]
        error: Option<String>,
    },
}

fn default_success() -> bool {
    true
}

/// Decode a history response body
pub fn decode_history(body: &str) -> WalletResult<Vec<HistoryEntry>> {
    let payload: HistoryPayload = serde_json::from_str(body)
        .map_err(|e| WalletError::HistoryFetchError(format!("Malformed response: {}", e)))?;

    match payload {
        HistoryPayload::Bare(entries) => Ok(entries),
        // A reported error fails the request even when `success` is absent.
        HistoryPayload::Envelope {
            success: true,
            data,
            error: None,
        } => Ok(data.unwrap_or_default()),
        HistoryPayload::Envelope { error, .. } => Err(WalletError::HistoryFetchError(
            error.unwrap_or_else(|| "Request was not successful".to_string()),
        )),
    }
}

/// Where transaction history comes from
#[async_trait(?Send)]
pub trait HistorySource {
    async fn fetch(&self, address: &Address) -> WalletResult<Vec<HistoryEntry>>;
}

/// HTTP client for the history API
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: Client,
    base_url: String,
}

impl HistoryClient {
    pub fn new(base_url: impl Into<String>) -> WalletResult<Self> {
        let client = Client::builder().build().map_err(|e| {
            WalletError::HistoryFetchError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait(?Send)]
impl HistorySource for HistoryClient {
    async fn fetch(&self, address: &Address) -> WalletResult<Vec<HistoryEntry>> {
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("address", address.to_checksum())])
            .send()
            .await
            .map_err(|e| WalletError::HistoryFetchError(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(WalletError::HistoryFetchError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WalletError::HistoryFetchError(format!("Failed to read body: {}", e)))?;
        decode_history(&body)
    }
}

/// History as shown to the user: whatever loaded, plus the error if loading failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryView {
    pub entries: Vec<HistoryEntry>,
    pub error: Option<WalletError>,
}

impl HistoryView {
    pub fn from_result(result: WalletResult<Vec<HistoryEntry>>) -> Self {
        match result {
            Ok(entries) => Self {
                entries,
                error: None,
            },
            Err(error) => Self {
                entries: Vec::new(),
                error: Some(error),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub async fn load_history(source: &dyn HistorySource, address: &Address) -> HistoryView {
    let result = source.fetch(address).await;
    if let Err(e) = &result {
        log::warn!("Failed to fetch transactions for {}: {}", address.truncated(), e);
    }
    HistoryView::from_result(result)
}
