//! FX module - reference rates, platform rates and the providers behind them.

pub mod currency;
mod fx_errors;
mod fx_model;
mod fx_service;
mod fx_traits;
mod rate_providers;

pub use currency::normalize_currency_code;
pub use fx_errors::FxError;
pub use fx_model::{ExchangeRateQuote, ReferenceRate};
pub use fx_service::ExchangeRateService;
pub use fx_traits::{ExchangeRateServiceTrait, RateProvider};
pub use rate_providers::{HttpRateProvider, StaticRateProvider};
