use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::FxError;
use crate::constants::{HNLD_DECIMAL_PRECISION, PEG_CURRENCY, RATE_DECIMAL_PRECISION};

/// HNL per one unit of `currency`, as reported upstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRate {
    pub currency: String,
    pub rate: Decimal,
    pub source: String,
    pub as_of: DateTime<Utc>,
}

/// Rate shown to users: the reference rate with the platform spread applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateQuote {
    pub currency: String,
    pub base_currency: String,
    pub reference_rate: Decimal,
    pub platform_rate: Decimal,
    pub spread: Decimal,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

impl ExchangeRateQuote {
    pub const PEG_SOURCE: &'static str = "PEG";

    /// `platform = reference * (1 + spread)`, rounded to 4 places.
    ///
    /// Rates too large for the platform rate to be represented are rejected.
    pub fn from_reference(reference: &ReferenceRate, spread: Decimal) -> Result<Self, FxError> {
        let platform_rate = (Decimal::ONE + spread)
            .checked_mul(reference.rate)
            .ok_or_else(|| {
                FxError::InvalidRate(format!(
                    "{} = {} overflows with spread {}",
                    reference.currency, reference.rate, spread
                ))
            })?
            .round_dp(RATE_DECIMAL_PRECISION);
        Ok(Self {
            currency: reference.currency.clone(),
            base_currency: PEG_CURRENCY.to_string(),
            reference_rate: reference.rate.round_dp(RATE_DECIMAL_PRECISION),
            platform_rate,
            spread,
            source: reference.source.clone(),
            fetched_at: Utc::now(),
            stale: false,
        })
    }

    /// HNLD is pegged 1:1 to HNL; no spread applies.
    pub fn pegged() -> Self {
        Self {
            currency: PEG_CURRENCY.to_string(),
            base_currency: PEG_CURRENCY.to_string(),
            reference_rate: Decimal::ONE,
            platform_rate: Decimal::ONE,
            spread: Decimal::ZERO,
            source: Self::PEG_SOURCE.to_string(),
            fetched_at: Utc::now(),
            stale: false,
        }
    }

    pub fn into_stale(mut self) -> Self {
        self.stale = true;
        self
    }

    /// HNL a user pays or receives for `amount` of the quoted currency.
    /// `None` when the product does not fit a `Decimal`.
    pub fn to_hnl(&self, amount: Decimal) -> Option<Decimal> {
        amount
            .checked_mul(self.platform_rate)
            .map(|hnl| hnl.round_dp(HNLD_DECIMAL_PRECISION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reference(rate: Decimal) -> ReferenceRate {
        ReferenceRate {
            currency: "USD".to_string(),
            rate,
            source: "TEST".to_string(),
            as_of: Utc::now(),
        }
    }

    #[test]
    fn test_platform_rate_applies_spread() {
        let quote = ExchangeRateQuote::from_reference(&reference(dec!(24.6)), dec!(0.015)).unwrap();
        assert_eq!(quote.platform_rate, dec!(24.969));
        assert_eq!(quote.base_currency, "HNL");
        assert!(!quote.stale);
    }

    #[test]
    fn test_platform_rate_rounds_to_four_places() {
        let quote = ExchangeRateQuote::from_reference(&reference(dec!(26.123456)), dec!(0.01)).unwrap();
        assert_eq!(quote.platform_rate, dec!(26.3847));
        assert_eq!(quote.reference_rate, dec!(26.1235));
    }

    #[test]
    fn test_oversized_rate_is_rejected() {
        let huge = Decimal::MAX * dec!(0.6);
        let err = ExchangeRateQuote::from_reference(&reference(huge), dec!(0.9)).unwrap_err();
        assert!(matches!(err, FxError::InvalidRate(_)));

        let quote = ExchangeRateQuote::from_reference(&reference(dec!(24.6)), dec!(0.015)).unwrap();
        assert_eq!(quote.to_hnl(Decimal::MAX), None);
    }

    #[test]
    fn test_pegged_quote_is_one() {
        let quote = ExchangeRateQuote::pegged();
        assert_eq!(quote.platform_rate, Decimal::ONE);
        assert_eq!(quote.spread, Decimal::ZERO);
        assert_eq!(quote.to_hnl(dec!(150)), Some(dec!(150)));
        assert_eq!(quote.to_hnl(Decimal::MAX), Some(Decimal::MAX));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ExchangeRateQuote::pegged()).unwrap();
        assert_eq!(json["baseCurrency"], "HNL");
        assert!(json.get("platformRate").is_some());
        assert_eq!(json["stale"], false);
    }
}
