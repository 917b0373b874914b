use std::sync::Arc;

use crate::{config::Config, events::EventBus};
use anyhow::Context;
use hnld_core::fx::{
    ExchangeRateService, ExchangeRateServiceTrait, HttpRateProvider, RateProvider,
    StaticRateProvider,
};
use hnld_core::notifications::{ListenerGuard, NotificationCenter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub fx_service: Arc<dyn ExchangeRateServiceTrait>,
    pub notifications: NotificationCenter,
    pub event_bus: EventBus,
    _notification_bridge: ListenerGuard,
}

pub fn init_tracing() {
    let log_format = std::env::var("HNLD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let provider: Arc<dyn RateProvider> = match &config.static_rates {
        Some(rates) => {
            tracing::info!("Using static exchange rates");
            Arc::new(StaticRateProvider::parse(rates).context("Invalid HNLD_STATIC_RATES")?)
        }
        None => {
            tracing::info!("Using exchange rates from {}", config.rates_url);
            Arc::new(HttpRateProvider::new(config.rates_url.clone()))
        }
    };
    build_state_with(config, provider, NotificationCenter::global().clone())
}

/// Wires the state around an explicit provider and notification center.
pub fn build_state_with(
    config: &Config,
    provider: Arc<dyn RateProvider>,
    notifications: NotificationCenter,
) -> anyhow::Result<Arc<AppState>> {
    let fx_service = ExchangeRateService::new(provider, config.platform_spread)
        .context("Invalid HNLD_PLATFORM_SPREAD")?
        .with_ttl(config.rate_cache_ttl)
        .with_notifications(notifications.clone());

    let event_bus = EventBus::new(config.event_bus_capacity);
    let notification_bridge = event_bus.bridge(&notifications);

    Ok(Arc::new(AppState {
        fx_service: Arc::new(fx_service),
        notifications,
        event_bus,
        _notification_bridge: notification_bridge,
    }))
}
