use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use trendscout_sources::{RedditClient, RedditCredentials, DEFAULT_REDDIT_LIMIT};

use super::{map_source_error, ApiError, ApiQuery, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub struct RedditParams {
    pub keyword: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/v1/content/reddit
pub async fn fetch_reddit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<RedditParams>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(keyword) = params.keyword.filter(|k| !k.trim().is_empty()) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "query parameter `keyword` is required",
        ));
    };

    let config = &state.config;
    let credentials = reddit_credentials(config).map_err(|missing| {
        ApiError::new(
            req_id.0.clone(),
            "config_error",
            format!("Reddit credentials incomplete; set {}", missing.join(", ")),
        )
    })?;

    let client = RedditClient::connect(
        &credentials,
        &config.reddit_auth_base_url,
        &config.reddit_api_base_url,
        config.request_timeout_secs,
    )
    .await
    .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let mentions = client
        .search(&keyword, params.limit.unwrap_or(DEFAULT_REDDIT_LIMIT))
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    tracing::info!(
        source = "reddit",
        count = mentions.len(),
        "aggregation complete"
    );

    Ok(Json(ApiResponse {
        data: mentions,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Collects the four-part credential set, or the env var names still missing.
fn reddit_credentials(
    config: &trendscout_core::AppConfig,
) -> Result<RedditCredentials, Vec<&'static str>> {
    let mut missing = Vec::new();
    if config.reddit_client_id.is_none() {
        missing.push("REDDIT_CLIENT_ID");
    }
    if config.reddit_client_secret.is_none() {
        missing.push("REDDIT_CLIENT_SECRET");
    }
    if config.reddit_app_name.is_none() {
        missing.push("REDDIT_APP_NAME");
    }
    if config.reddit_username.is_none() {
        missing.push("REDDIT_USERNAME");
    }
    if !missing.is_empty() {
        return Err(missing);
    }

    Ok(RedditCredentials {
        client_id: config.reddit_client_id.clone().unwrap_or_default(),
        client_secret: config.reddit_client_secret.clone().unwrap_or_default(),
        app_name: config.reddit_app_name.clone().unwrap_or_default(),
        username: config.reddit_username.clone().unwrap_or_default(),
    })
}
