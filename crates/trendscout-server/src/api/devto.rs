use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use trendscout_sources::{DevtoClient, DevtoQuery, DEFAULT_DEVTO_LIMIT};

use super::{map_source_error, ApiError, ApiQuery, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub struct DevtoParams {
    pub keyword: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/v1/content/devto
///
/// Keyword search takes priority over tag browse; with neither, returns the
/// latest-articles listing.
pub async fn fetch_devto(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<DevtoParams>,
) -> Result<impl IntoResponse, ApiError> {
    let config = &state.config;
    let client = DevtoClient::new(
        &config.devto_base_url,
        config.request_timeout_secs,
        &config.user_agent,
        config.reply_expansion_threshold,
    )
    .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let query = DevtoQuery {
        keyword: params.keyword,
        tag: params.tag,
        limit: params.limit.unwrap_or(DEFAULT_DEVTO_LIMIT),
    };

    let items = client
        .fetch(&query)
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    tracing::info!(source = "devto", count = items.len(), "aggregation complete");

    Ok(Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(req_id.0),
    }))
}
