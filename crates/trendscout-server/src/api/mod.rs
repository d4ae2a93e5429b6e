mod devto;
mod keywords;
mod reddit;
mod twitter;

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Query},
    http::{header, request::Parts, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use trendscout_core::AppConfig;
use trendscout_sources::SourceError;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimiter, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

/// `Query` wrapper whose rejection is rendered through the error envelope
/// instead of axum's plain-text default, so malformed parameters still get
/// a JSON body with `error.code` and `meta`.
pub(super) struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                request_id,
                "validation_error",
                rejection.body_text(),
            )),
        }
    }
}

/// `Json` wrapper matching [`ApiQuery`]: body rejections keep the envelope.
pub(super) struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(
        req: axum::extract::Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(
                request_id,
                "validation_error",
                rejection.body_text(),
            )),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Map a source-layer error to the API envelope.
///
/// Input and configuration problems never reach here (handlers reject them
/// before building a client), so everything below maps to 5xx.
pub(super) fn map_source_error(request_id: String, error: &SourceError) -> ApiError {
    tracing::error!(error = %error, "source call failed");
    match error {
        SourceError::MissingCredentials(_) | SourceError::InvalidBaseUrl { .. } => {
            ApiError::new(request_id, "config_error", error.to_string())
        }
        SourceError::InvalidCredentials { .. } => ApiError::new(
            request_id,
            "config_error",
            format!("{error}; an administrator must update the stored credentials"),
        ),
        SourceError::TokenExchange { .. } => {
            ApiError::new(request_id, "internal_error", error.to_string())
        }
        SourceError::Http(_) | SourceError::Upstream { .. } | SourceError::Deserialize { .. } => {
            ApiError::new(request_id, "upstream_error", error.to_string())
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limiter: RateLimiter) -> Router<AppState> {
    Router::new()
        .route("/api/v1/content/devto", get(devto::fetch_devto))
        .route("/api/v1/content/twitter", get(twitter::fetch_twitter))
        .route("/api/v1/content/reddit", get(reddit::fetch_reddit))
        .route(
            "/api/v1/keywords/volume",
            get(keywords::fetch_volume_get).post(keywords::fetch_volume_post),
        )
        .route("/api/v1/keywords/rank", post(keywords::rank))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limiter,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limiter: RateLimiter) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limiter))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(Extension(req_id): Extension<RequestId>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            data: HealthData { status: "ok" },
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

pub fn default_rate_limiter() -> RateLimiter {
    RateLimiter::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use wiremock::matchers::method as http_method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> AppConfig {
        test_config_with_bases("http://127.0.0.1:1", "http://127.0.0.1:1", "http://127.0.0.1:1")
    }

    fn test_config_with_bases(devto: &str, twitter: &str, keyword: &str) -> AppConfig {
        AppConfig {
            env: trendscout_core::Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "info".to_string(),
            api_keys: Vec::new(),
            request_timeout_secs: 5,
            user_agent: "trendscout-test".to_string(),
            reply_expansion_threshold: 1,
            devto_base_url: devto.to_string(),
            twitter_base_url: twitter.to_string(),
            twitter_api_key: Some("tw-key".to_string()),
            reddit_auth_base_url: "http://127.0.0.1:1".to_string(),
            reddit_api_base_url: "http://127.0.0.1:1".to_string(),
            reddit_client_id: None,
            reddit_client_secret: None,
            reddit_app_name: None,
            reddit_username: None,
            keyword_base_url: keyword.to_string(),
            keyword_api_key: Some("kw-key".to_string()),
        }
    }

    fn test_app(config: AppConfig) -> Router {
        let auth = AuthState::from_config(&config).expect("auth");
        build_app(
            AppState {
                config: Arc::new(config),
            },
            auth,
            default_rate_limiter(),
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json parse")
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = test_app(test_config())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "ok");
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_upstream_maps_to_bad_gateway() {
        let response = ApiError::new("req-1", "upstream_error", "boom").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn api_error_config_maps_to_internal() {
        let response = ApiError::new("req-1", "config_error", "missing key").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn twitter_requires_query_param() {
        let response = test_app(test_config())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/twitter")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn twitter_without_api_key_is_config_error() {
        let mut config = test_config();
        config.twitter_api_key = None;
        let response = test_app(config)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/twitter?query=rust")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "config_error");
    }

    #[tokio::test]
    async fn twitter_query_type_parameter_reaches_the_upstream() {
        let upstream = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(wiremock::matchers::path("/twitter/tweet/advanced_search"))
            .and(wiremock::matchers::query_param("query", "rust"))
            .and(wiremock::matchers::query_param("queryType", "Top"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tweets": [{
                    "id": "1",
                    "text": "rust release",
                    "createdAt": "Mon Mar 03 12:00:00 +0000 2025",
                    "replyCount": 0,
                    "likeCount": 4,
                    "author": { "userName": "grace" }
                }],
                "hasNextPage": false
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        let config =
            test_config_with_bases("http://127.0.0.1:1", &upstream.uri(), "http://127.0.0.1:1");
        let response = test_app(config)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/twitter?query=rust&queryType=Top")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"][0]["id"], "1");
    }

    #[tokio::test]
    async fn malformed_limit_is_rejected_with_json_envelope() {
        let response = test_app(test_config())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/devto?limit=abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
        assert!(
            json["error"]["message"].as_str().is_some_and(|m| !m.is_empty()),
            "rejection must carry a message: {json}"
        );
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn non_json_rank_body_is_rejected_with_json_envelope() {
        let response = test_app(test_config())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/keywords/rank")
                    .header("content-type", "application/json")
                    .body(Body::from("definitely not json"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn missing_bearer_token_is_rejected_with_envelope() {
        let mut config = test_config();
        config.api_keys = vec!["scout-key".to_string()];

        let response = test_app(config.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/twitter?query=rust")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
        assert!(json["meta"]["request_id"].is_string());

        // The same key passes auth and reaches the handler.
        let response = test_app(config)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/keywords/rank")
                    .header("authorization", "Bearer scout-key")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{ "keywords": [] }"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reddit_requires_keyword_param() {
        let response = test_app(test_config())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/reddit")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reddit_with_partial_credentials_is_config_error() {
        let mut config = test_config();
        config.reddit_client_id = Some("id".to_string());
        // secret, app name, and username missing
        let response = test_app(config)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/reddit?keyword=rust")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "config_error");
        let message = json["error"]["message"].as_str().expect("message");
        assert!(
            message.contains("REDDIT_CLIENT_SECRET"),
            "missing vars should be listed: {message}"
        );
    }

    #[tokio::test]
    async fn volume_without_search_question_rejects_before_any_network_call() {
        let provider = MockServer::start().await;
        Mock::given(http_method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&provider)
            .await;

        let config = test_config_with_bases("http://127.0.0.1:1", "http://127.0.0.1:1", &provider.uri());
        let response = test_app(config)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/keywords/volume")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{ "search_country": "us" }"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            provider.received_requests().await.expect("requests").is_empty(),
            "no outbound call may happen before validation"
        );
    }

    #[tokio::test]
    async fn volume_without_api_key_rejects_before_any_network_call() {
        let provider = MockServer::start().await;
        let mut config =
            test_config_with_bases("http://127.0.0.1:1", "http://127.0.0.1:1", &provider.uri());
        config.keyword_api_key = None;

        let response = test_app(config)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/keywords/volume?search_question=hemp")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "config_error");
        assert!(
            provider.received_requests().await.expect("requests").is_empty(),
            "no outbound call may happen without a configured key"
        );
    }

    #[tokio::test]
    async fn rank_endpoint_sorts_and_needs_no_io() {
        let body = r#"{
            "keywords": [
                { "keyword": "a", "volume": 100, "cpc": 2 },
                { "keyword": "b", "volume": 50, "cpc": 0 },
                { "keyword": "c", "volume": 200, "cpc": 4 }
            ]
        }"#;
        let response = test_app(test_config())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/keywords/rank")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 3);
        // "a" and "c" tie at rank 50 and must both precede "b" at rank 0.
        assert_eq!(data[2]["keyword"], "b");
        assert!((data[0]["rank"].as_f64().expect("rank") - 50.0).abs() < f64::EPSILON);
        assert!((data[2]["rank"].as_f64().expect("rank") - 0.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn rank_rejects_missing_keywords_field() {
        let response = test_app(test_config())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/keywords/rank")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{ "items": [] }"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rank_rejects_non_array_keywords_field() {
        let response = test_app(test_config())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/keywords/rank")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{ "keywords": "not-a-list" }"#))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn devto_aggregates_against_mock_upstream() {
        let upstream = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(wiremock::matchers::path("/api/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 1,
                    "url": "https://dev.to/ada/one",
                    "published_at": "2025-03-01T09:00:00Z",
                    "body_html": "<p>one</p>",
                    "comments_count": 0,
                    "positive_reactions_count": 2,
                    "tag_list": ["rust"],
                    "user": { "username": "ada" }
                }
            ])))
            .mount(&upstream)
            .await;

        let config =
            test_config_with_bases(&upstream.uri(), "http://127.0.0.1:1", "http://127.0.0.1:1");
        let response = test_app(config)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/devto?tag=rust&limit=5")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["author"], "ada");
        assert_eq!(data[0]["engagement"]["likeCount"], 2);
        assert_eq!(data[0]["comments"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn devto_upstream_failure_maps_to_bad_gateway() {
        let upstream = MockServer::start().await;
        Mock::given(http_method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("listing exploded"))
            .mount(&upstream)
            .await;

        let config =
            test_config_with_bases(&upstream.uri(), "http://127.0.0.1:1", "http://127.0.0.1:1");
        let response = test_app(config)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/content/devto")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "upstream_error");
        let message = json["error"]["message"].as_str().expect("message");
        assert!(
            message.contains("listing exploded"),
            "upstream body should be carried through: {message}"
        );
    }
}
