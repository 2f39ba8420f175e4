//! Typed client for the bot backend's three read-only JSON endpoints, plus
//! the payload models. The backend is tolerant of partial data, so every
//! optional field decodes with a default instead of failing the whole body.

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One OHLC bar. `time` is epoch-milliseconds as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// low <= open,close <= high, all values finite.
    pub fn is_well_formed(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataResponse {
    pub symbol: String,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub data: Vec<Candle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Trade {
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "de_epoch_ms")]
    pub time: Option<i64>,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub status: String,
}

impl Trade {
    pub fn is_buy(&self) -> bool {
        self.side.to_ascii_lowercase().starts_with('b')
    }
}

/// Orchestrator cycle summary carried alongside trades in the history payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CycleRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub cycles: Vec<CycleRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalanceSheet {
    #[serde(default)]
    pub total: HashMap<String, f64>,
    #[serde(default)]
    pub free: HashMap<String, f64>,
}

/// `/api/status` body. The backend sends `{}` when it cannot answer, so both
/// fields are independently optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub balance: Option<BalanceSheet>,
}

impl StatusSnapshot {
    pub fn usdt_total(&self) -> Option<f64> {
        self.balance.as_ref().and_then(|b| b.total.get("USDT").copied())
    }

    pub fn usdt_free(&self) -> Option<f64> {
        self.balance.as_ref().and_then(|b| b.free.get("USDT").copied())
    }
}

/// Trade timestamps arrive as epoch-milliseconds, as an ISO-8601 string, or
/// as null depending on the backend's persistence path. Normalize all three
/// to epoch-milliseconds; an unparseable string becomes None.
fn de_epoch_ms<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(de)? {
        None => None,
        Some(Raw::Millis(ms)) => Some(ms),
        Some(Raw::Float(ms)) => Some(ms as i64),
        Some(Raw::Text(s)) => parse_time_text(&s),
    })
}

fn parse_time_text(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    // Naive `isoformat()` output carries no offset; read it as local time.
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base, path);
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn fetch_history(&self) -> Result<HistoryResponse, ApiError> {
        self.get_json("/api/history").await
    }

    pub async fn fetch_market_data(&self) -> Result<MarketDataResponse, ApiError> {
        self.get_json("/api/market_data").await
    }

    pub async fn fetch_status(&self) -> Result<StatusSnapshot, ApiError> {
        self.get_json("/api/status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_time_decodes_from_millis() {
        let t: Trade =
            serde_json::from_str(r#"{"symbol":"BTC/USDT","time":1700000000000,"side":"buy"}"#)
                .unwrap();
        assert_eq!(t.time, Some(1_700_000_000_000));
        assert!(t.is_buy());
    }

    #[test]
    fn trade_time_decodes_from_rfc3339() {
        let t: Trade =
            serde_json::from_str(r#"{"time":"2023-11-14T22:13:20+00:00","side":"sell"}"#).unwrap();
        assert_eq!(t.time, Some(1_700_000_000_000));
        assert!(!t.is_buy());
    }

    #[test]
    fn trade_time_null_and_garbage_become_none() {
        let t: Trade = serde_json::from_str(r#"{"time":null,"side":"buy"}"#).unwrap();
        assert_eq!(t.time, None);

        let t: Trade = serde_json::from_str(r#"{"time":"not a date","side":"buy"}"#).unwrap();
        assert_eq!(t.time, None);
    }

    #[test]
    fn history_tolerates_missing_keys() {
        let h: HistoryResponse = serde_json::from_str("{}").unwrap();
        assert!(h.trades.is_empty());
        assert!(h.cycles.is_empty());
    }

    #[test]
    fn status_decodes_empty_object() {
        let s: StatusSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(s.status, None);
        assert_eq!(s.usdt_total(), None);
        assert_eq!(s.usdt_free(), None);
    }

    #[test]
    fn status_surfaces_usdt_only() {
        let s: StatusSnapshot = serde_json::from_str(
            r#"{"status":"Idle","balance":{"total":{"USDT":1234.5,"BTC":0.2},"free":{"USDT":1000.0}}}"#,
        )
        .unwrap();
        assert_eq!(s.status.as_deref(), Some("Idle"));
        assert_eq!(s.usdt_total(), Some(1234.5));
        assert_eq!(s.usdt_free(), Some(1000.0));
        // other assets stay in the decoded value
        assert_eq!(s.balance.unwrap().total.get("BTC"), Some(&0.2));
    }

    #[test]
    fn market_data_defaults_empty_data() {
        let md: MarketDataResponse = serde_json::from_str(r#"{"symbol":"BTC/USDT"}"#).unwrap();
        assert_eq!(md.symbol, "BTC/USDT");
        assert!(md.data.is_empty());
        assert_eq!(md.timeframe, None);
    }

    #[test]
    fn candle_well_formedness() {
        let ok = Candle { time: 0, open: 10.0, high: 12.0, low: 9.0, close: 11.0 };
        assert!(ok.is_well_formed());

        let inverted = Candle { time: 0, open: 10.0, high: 9.0, low: 12.0, close: 11.0 };
        assert!(!inverted.is_well_formed());

        let nan = Candle { time: 0, open: f64::NAN, high: 12.0, low: 9.0, close: 11.0 };
        assert!(!nan.is_well_formed());
    }
}
