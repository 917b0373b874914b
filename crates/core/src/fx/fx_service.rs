use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use super::currency::normalize_currency_code;
use super::fx_errors::FxError;
use super::fx_model::ExchangeRateQuote;
use super::fx_traits::{ExchangeRateServiceTrait, RateProvider};
use crate::constants::PEG_CURRENCY;
use crate::errors::Result;
use crate::notifications::{Notification, NotificationCenter, NotificationTopic};

const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Quotes platform rates for HNLD against other currencies.
///
/// Upstream rates are cached per currency. When the provider fails, the last
/// cached quote is served marked `stale` and a warning is published; with no
/// cached quote the provider error is returned.
pub struct ExchangeRateService {
    provider: Arc<dyn RateProvider>,
    spread: Decimal,
    ttl: chrono::Duration,
    cache: RwLock<HashMap<String, ExchangeRateQuote>>,
    notifications: NotificationCenter,
}

impl ExchangeRateService {
    pub fn new(provider: Arc<dyn RateProvider>, spread: Decimal) -> Result<Self> {
        if spread < Decimal::ZERO || spread >= Decimal::ONE {
            return Err(FxError::InvalidRate(format!(
                "platform spread must be in [0, 1), got {}",
                spread
            ))
            .into());
        }
        Ok(Self {
            provider,
            spread,
            ttl: to_chrono(DEFAULT_TTL),
            cache: RwLock::new(HashMap::new()),
            notifications: NotificationCenter::global().clone(),
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = to_chrono(ttl);
        self
    }

    /// Sets the center that receives stale-rate warnings.
    pub fn with_notifications(mut self, notifications: NotificationCenter) -> Self {
        self.notifications = notifications;
        self
    }

    fn fresh_cached(&self, currency: &str) -> Result<Option<ExchangeRateQuote>> {
        let cache = self
            .cache
            .read()
            .map_err(|e| FxError::CacheError(e.to_string()))?;
        let now = Utc::now();
        Ok(cache
            .get(currency)
            .filter(|quote| now - quote.fetched_at < self.ttl)
            .cloned())
    }

    fn any_cached(&self, currency: &str) -> Result<Option<ExchangeRateQuote>> {
        let cache = self
            .cache
            .read()
            .map_err(|e| FxError::CacheError(e.to_string()))?;
        Ok(cache.get(currency).cloned())
    }

    fn store(&self, quote: &ExchangeRateQuote) -> Result<()> {
        self.cache
            .write()
            .map_err(|e| FxError::CacheError(e.to_string()))?
            .insert(quote.currency.clone(), quote.clone());
        Ok(())
    }

    fn serve_stale(&self, currency: &str, err: FxError) -> Result<ExchangeRateQuote> {
        match self.any_cached(currency)? {
            Some(cached) => {
                log::warn!(
                    "Rate provider {} failed for {} ({}), serving quote from {}",
                    self.provider.id(),
                    currency,
                    err,
                    cached.fetched_at
                );
                self.notifications.publish(
                    Notification::warning(
                        "Exchange rate delayed",
                        format!("Showing the last known {} rate.", currency),
                    )
                    .with_topic(NotificationTopic::ExchangeRateStale {
                        currency: currency.to_string(),
                    }),
                );
                Ok(cached.into_stale())
            }
            None => {
                log::error!(
                    "Rate provider {} failed for {} with nothing cached: {}",
                    self.provider.id(),
                    currency,
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365))
}

#[async_trait]
impl ExchangeRateServiceTrait for ExchangeRateService {
    async fn get_quote(&self, currency: &str) -> Result<ExchangeRateQuote> {
        let currency = normalize_currency_code(currency)?;
        if currency == PEG_CURRENCY {
            return Ok(ExchangeRateQuote::pegged());
        }
        if let Some(quote) = self.fresh_cached(&currency)? {
            return Ok(quote);
        }

        match self.provider.latest_rate(&currency).await {
            Ok(reference) if reference.rate > Decimal::ZERO => {
                let quote = match ExchangeRateQuote::from_reference(&reference, self.spread) {
                    Ok(quote) => quote,
                    Err(err) => return self.serve_stale(&currency, err),
                };
                self.store(&quote)?;
                log::debug!(
                    "Quoted {}: reference {} platform {}",
                    currency,
                    quote.reference_rate,
                    quote.platform_rate
                );
                Ok(quote)
            }
            Ok(reference) => self.serve_stale(
                &currency,
                FxError::InvalidRate(format!("{} = {}", currency, reference.rate)),
            ),
            Err(FxError::InvalidCurrency(code)) => Err(FxError::InvalidCurrency(code).into()),
            Err(err) => self.serve_stale(&currency, err),
        }
    }

    fn spread(&self) -> Decimal {
        self.spread
    }

    fn cached_quotes(&self) -> Result<Vec<ExchangeRateQuote>> {
        let cache = self
            .cache
            .read()
            .map_err(|e| FxError::CacheError(e.to_string()))?;
        let mut quotes: Vec<ExchangeRateQuote> = cache.values().cloned().collect();
        quotes.sort_by(|a, b| a.currency.cmp(&b.currency));
        Ok(quotes)
    }
}
