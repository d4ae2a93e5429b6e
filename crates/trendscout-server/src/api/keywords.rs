use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use trendscout_sources::{rank_keywords, KeywordInput, KeywordVolumeClient};

use super::{map_source_error, ApiError, ApiJson, ApiQuery, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

const DEFAULT_COUNTRY: &str = "us";

#[derive(Debug, Deserialize)]
pub struct VolumeParams {
    pub search_question: Option<String>,
    pub search_country: Option<String>,
}

/// GET /api/v1/keywords/volume
pub async fn fetch_volume_get(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiQuery(params): ApiQuery<VolumeParams>,
) -> Result<impl IntoResponse, ApiError> {
    fetch_volume(state, req_id, params).await
}

/// POST /api/v1/keywords/volume with a JSON body carrying the same fields.
pub async fn fetch_volume_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let params = VolumeParams {
        search_question: body
            .get("search_question")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        search_country: body
            .get("search_country")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
    };
    fetch_volume(state, req_id, params).await
}

async fn fetch_volume(
    state: AppState,
    req_id: RequestId,
    params: VolumeParams,
) -> Result<impl IntoResponse, ApiError> {
    let Some(search_question) = params.search_question.filter(|q| !q.trim().is_empty()) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "`search_question` is required",
        ));
    };
    let search_country = params
        .search_country
        .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

    let config = &state.config;
    let Some(api_key) = config.keyword_api_key.as_deref() else {
        return Err(ApiError::new(
            req_id.0,
            "config_error",
            "KEYWORD_API_KEY is not configured",
        ));
    };

    let client = KeywordVolumeClient::new(
        &config.keyword_base_url,
        api_key,
        config.request_timeout_secs,
        &config.user_agent,
    )
    .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    let report = client
        .search_volume(&search_question, &search_country)
        .await
        .map_err(|e| map_source_error(req_id.0.clone(), &e))?;

    tracing::info!(
        search_question = %report.search_question,
        total_keywords = report.total_keywords,
        "volume lookup complete"
    );

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/keywords/rank
///
/// Pure re-ranking of caller-supplied rows; performs no outbound calls.
pub async fn rank(
    Extension(req_id): Extension<RequestId>,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(rows) = body.get("keywords").and_then(Value::as_array) else {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "`keywords` must be an array of { keyword, volume, cpc } objects",
        ));
    };

    let inputs: Vec<KeywordInput> = rows
        .iter()
        .map(|row| serde_json::from_value(row.clone()))
        .collect::<Result<_, _>>()
        .map_err(|e| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("invalid keyword row: {e}"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: rank_keywords(inputs),
        meta: ResponseMeta::new(req_id.0),
    }))
}
