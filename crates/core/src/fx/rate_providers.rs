//! Reference-rate providers.
//!
//! [`HttpRateProvider`] talks to an open.er-api.com compatible endpoint:
//! `GET {base}/latest/{CUR}` answers with every rate quoted against `CUR`,
//! so the HNL entry is the number of lempiras per one unit of `CUR`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::fx_errors::FxError;
use super::fx_model::ReferenceRate;
use super::fx_traits::RateProvider;
use crate::constants::PEG_CURRENCY;

const HTTP_PROVIDER_ID: &str = "OPEN_ER_API";
const STATIC_PROVIDER_ID: &str = "STATIC";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    time_last_update_unix: Option<i64>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

pub struct HttpRateProvider {
    client: Client,
    base_url: String,
}

impl HttpRateProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn provider_error(message: impl Into<String>) -> FxError {
        FxError::Provider {
            provider: HTTP_PROVIDER_ID.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn id(&self) -> &'static str {
        HTTP_PROVIDER_ID
    }

    async fn latest_rate(&self, currency: &str) -> Result<ReferenceRate, FxError> {
        let url = format!("{}/latest/{}", self.base_url, currency);
        log::debug!("Fetching reference rate from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::provider_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::provider_error(format!(
                "upstream answered {}",
                response.status()
            )));
        }

        let body: LatestRatesResponse = response
            .json()
            .await
            .map_err(|e| Self::provider_error(e.to_string()))?;

        if body.result != "success" {
            let error_type = body.error_type.unwrap_or_else(|| body.result.clone());
            if error_type == "unsupported-code" {
                return Err(FxError::InvalidCurrency(currency.to_string()));
            }
            return Err(Self::provider_error(error_type));
        }

        let rate = body
            .rates
            .get(PEG_CURRENCY)
            .copied()
            .ok_or_else(|| FxError::RateNotFound(format!("{}/{}", currency, PEG_CURRENCY)))?;
        if rate <= 0.0 || !rate.is_finite() {
            return Err(FxError::InvalidRate(format!(
                "{}/{} = {}",
                currency, PEG_CURRENCY, rate
            )));
        }
        let rate = Decimal::try_from(rate)
            .map_err(|_| FxError::InvalidRate("failed to convert rate to decimal".to_string()))?;

        let as_of = body
            .time_last_update_unix
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);

        Ok(ReferenceRate {
            currency: currency.to_string(),
            rate,
            source: HTTP_PROVIDER_ID.to_string(),
            as_of,
        })
    }
}

/// Fixed rates for tests and offline runs.
#[derive(Default)]
pub struct StaticRateProvider {
    rates: RwLock<HashMap<String, Decimal>>,
    failing: AtomicBool,
}

impl StaticRateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(self, currency: &str, rate: Decimal) -> Self {
        self.set_rate(currency, rate);
        self
    }

    pub fn set_rate(&self, currency: &str, rate: Decimal) {
        self.rates
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(currency.to_ascii_uppercase(), rate);
    }

    /// Simulates an upstream outage.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Parses `USD=24.61,EUR=26.9` style lists.
    pub fn parse(list: &str) -> Result<Self, FxError> {
        let provider = Self::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (currency, rate) = entry
                .split_once('=')
                .ok_or_else(|| FxError::InvalidRate(entry.to_string()))?;
            let currency = super::normalize_currency_code(currency)?;
            let rate: Decimal = rate
                .trim()
                .parse()
                .map_err(|_| FxError::InvalidRate(entry.to_string()))?;
            if rate <= Decimal::ZERO {
                return Err(FxError::InvalidRate(entry.to_string()));
            }
            provider.set_rate(&currency, rate);
        }
        Ok(provider)
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    fn id(&self) -> &'static str {
        STATIC_PROVIDER_ID
    }

    async fn latest_rate(&self, currency: &str) -> Result<ReferenceRate, FxError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FxError::Provider {
                provider: STATIC_PROVIDER_ID.to_string(),
                message: "provider offline".to_string(),
            });
        }
        let rate = self
            .rates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(currency)
            .copied()
            .ok_or_else(|| FxError::RateNotFound(format!("{}/{}", currency, PEG_CURRENCY)))?;
        Ok(ReferenceRate {
            currency: currency.to_string(),
            rate,
            source: STATIC_PROVIDER_ID.to_string(),
            as_of: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_static_rates() {
        let provider = StaticRateProvider::parse("usd=24.61, EUR=26.9").unwrap();
        let rates = provider.rates.read().unwrap();
        assert_eq!(rates.get("USD"), Some(&dec!(24.61)));
        assert_eq!(rates.get("EUR"), Some(&dec!(26.9)));
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        assert!(StaticRateProvider::parse("USD").is_err());
        assert!(StaticRateProvider::parse("USD=abc").is_err());
        assert!(StaticRateProvider::parse("USD=-1").is_err());
    }

    #[tokio::test]
    async fn test_static_provider_failing() {
        let provider = StaticRateProvider::new().with_rate("USD", dec!(24.5));
        assert_eq!(provider.latest_rate("USD").await.unwrap().rate, dec!(24.5));

        provider.set_failing(true);
        assert!(matches!(
            provider.latest_rate("USD").await,
            Err(FxError::Provider { .. })
        ));
    }

    #[test]
    fn test_response_shape() {
        let body: LatestRatesResponse = serde_json::from_str(
            r#"{"result":"success","base_code":"USD","time_last_update_unix":1700000000,
                "rates":{"USD":1,"HNL":24.72}}"#,
        )
        .unwrap();
        assert_eq!(body.rates.get("HNL"), Some(&24.72));

        let error: LatestRatesResponse =
            serde_json::from_str(r#"{"result":"error","error-type":"unsupported-code"}"#).unwrap();
        assert_eq!(error.error_type.as_deref(), Some("unsupported-code"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = HttpRateProvider::new("https://open.er-api.com/v6/");
        assert_eq!(provider.base_url, "https://open.er-api.com/v6");
    }
}
