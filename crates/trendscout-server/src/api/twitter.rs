use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use trendscout_sources::{TwitterClient, TwitterQuery, DEFAULT_TWITTER_LIMIT};

use super::{map_source_error, ApiError, ApiQuery, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitterParams {
    pub query: Option<String>,
    /// `Latest` (default) or `Top`.
    pub query_type: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/v1/content/twitter?query=&queryType=&limit=
pub async fn fetch_twitter(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<TwitterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(query) = params.query.filter(|q| !q.trim().is_empty()) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "query parameter `query` is required",
        ));
    };

    let config = &state.config;
    let Some(api_key) = config.twitter_api_key.as_deref() else {
        return Err(ApiError::new(
            req_id.0,
            "config_error",
            "TWITTER_API_KEY is not configured",
        ));
    };

    let client = TwitterClient::new(
        &config.twitter_base_url,
        api_key,
        config.request_timeout_secs,
        &config.user_agent,
        config.reply_expansion_threshold,
    )
    .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let query = TwitterQuery {
        query,
        query_type: params.query_type,
        limit: params.limit.unwrap_or(DEFAULT_TWITTER_LIMIT),
    };

    let items = client
        .fetch(&query)
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    tracing::info!(
        source = "twitter",
        count = items.len(),
        "aggregation complete"
    );

    Ok(Json(ApiResponse {
        data: items,
        meta: ResponseMeta::new(req_id.0),
    }))
}
