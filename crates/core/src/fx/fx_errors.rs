use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FxError {
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Exchange rate not found: {0}")]
    RateNotFound(String),

    #[error("Rate provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),

    #[error("Rate cache error: {0}")]
    CacheError(String),
}
