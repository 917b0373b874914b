use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;
use rust_decimal::Decimal;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub rates_url: String,
    /// `USD=24.6,EUR=26.9`; when set, upstream is never called.
    pub static_rates: Option<String>,
    pub platform_spread: Decimal,
    pub rate_cache_ttl: Duration,
    pub event_bus_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30_000),
            rates_url: "https://open.er-api.com/v6".to_string(),
            static_rates: None,
            platform_spread: Decimal::new(15, 3),
            rate_cache_ttl: Duration::from_secs(300),
            event_bus_capacity: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cors_allow = match lookup("HNLD_CORS_ALLOW_ORIGINS") {
            Some(origins) => origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.cors_allow,
        };
        let timeout_ms: u64 = parse_or(&lookup, "HNLD_REQUEST_TIMEOUT_MS", 30_000)?;
        let ttl_secs: u64 = parse_or(&lookup, "HNLD_RATE_CACHE_TTL_SECS", 300)?;

        Ok(Self {
            listen_addr: parse_or(&lookup, "HNLD_LISTEN_ADDR", defaults.listen_addr)?,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            rates_url: lookup("HNLD_RATES_URL").unwrap_or(defaults.rates_url),
            static_rates: lookup("HNLD_STATIC_RATES").filter(|s| !s.trim().is_empty()),
            platform_spread: parse_or(&lookup, "HNLD_PLATFORM_SPREAD", defaults.platform_spread)?,
            rate_cache_ttl: Duration::from_secs(ttl_secs),
            event_bus_capacity: parse_or(
                &lookup,
                "HNLD_EVENT_BUS_CAPACITY",
                defaults.event_bus_capacity,
            )?,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.cors_allow, vec!["*"]);
        assert_eq!(config.platform_spread, Decimal::new(15, 3));
        assert_eq!(config.rate_cache_ttl, Duration::from_secs(300));
        assert!(config.static_rates.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("HNLD_LISTEN_ADDR", "127.0.0.1:9000"),
            ("HNLD_CORS_ALLOW_ORIGINS", "https://a.example, https://b.example"),
            ("HNLD_PLATFORM_SPREAD", "0.02"),
            ("HNLD_STATIC_RATES", "USD=24.6"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.cors_allow.len(), 2);
        assert_eq!(config.platform_spread, Decimal::new(2, 2));
        assert_eq!(config.static_rates.as_deref(), Some("USD=24.6"));
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[("HNLD_LISTEN_ADDR", "nowhere")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("HNLD_PLATFORM_SPREAD", "lots")])).is_err());
    }
}
