use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use hnld_core::fx::ExchangeRateQuote;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ExchangeRateQuery {
    pub currency: Option<String>,
}

/// Reference and platform rate for one currency against HNL.
async fn get_exchange_rate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExchangeRateQuery>,
) -> ApiResult<Json<ExchangeRateQuote>> {
    let currency = query
        .currency
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'currency' is required".into()))?;
    let quote = state.fx_service.get_quote(&currency).await?;
    Ok(Json(quote))
}

async fn list_cached_rates(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ExchangeRateQuote>>> {
    Ok(Json(state.fx_service.cached_quotes()?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exchange-rate", get(get_exchange_rate))
        .route("/exchange-rate/cached", get(list_cached_rates))
}
