use async_trait::async_trait;
use rust_decimal::Decimal;

use super::fx_errors::FxError;
use super::fx_model::{ExchangeRateQuote, ReferenceRate};
use crate::errors::Result;

/// Upstream source of reference rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// HNL per one unit of `currency`. `currency` is already normalized.
    async fn latest_rate(&self, currency: &str) -> std::result::Result<ReferenceRate, FxError>;
}

/// Trait defining the contract for exchange-rate lookups.
#[async_trait]
pub trait ExchangeRateServiceTrait: Send + Sync {
    async fn get_quote(&self, currency: &str) -> Result<ExchangeRateQuote>;

    fn spread(&self) -> Decimal;

    fn cached_quotes(&self) -> Result<Vec<ExchangeRateQuote>>;
}
