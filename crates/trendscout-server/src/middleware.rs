use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use trendscout_core::{AppConfig, ConfigError, Environment};
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-key auth settings, sourced from [`AppConfig::api_keys`].
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Build auth settings from the loaded configuration.
    ///
    /// Development and test environments may run without keys (auth stays
    /// disabled for local iteration); production requires at least one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] in production when no key is
    /// configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let keys: HashSet<String> = config.api_keys.iter().cloned().collect();

        if keys.is_empty() {
            if config.env == Environment::Production {
                return Err(ConfigError::MissingEnvVar(
                    "TRENDSCOUT_API_KEYS".to_string(),
                ));
            }
            tracing::warn!(env = %config.env, "no API keys configured; bearer auth disabled");
            return Ok(Self {
                api_keys: Arc::new(HashSet::new()),
                enabled: false,
            });
        }

        Ok(Self {
            api_keys: Arc::new(keys),
            enabled: true,
        })
    }

    fn allows(&self, token: &str) -> bool {
        self.api_keys.contains(token)
    }
}

struct CallerWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request limiter keyed per caller.
///
/// Each bearer token gets its own window (unauthenticated callers share
/// one), so a single integration hammering the aggregation endpoints cannot
/// starve the others. The per-caller cap also bounds the upstream fan-out
/// one caller can trigger, since every content request costs this service
/// between one and `limit + 1` third-party calls.
#[derive(Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, CallerWindow>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record one request for `caller`; false when its window is exhausted.
    async fn try_acquire(&self, caller: &str) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let entry = windows.entry(caller.to_owned()).or_insert(CallerWindow {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Attach a request ID to the request extensions and the response headers.
///
/// An inbound `x-request-id` header is honored; otherwise a fresh `UUIDv4`
/// is generated. Handlers read it via `Extension<RequestId>` so every
/// response envelope echoes the same ID.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Reject requests without a configured bearer token when auth is enabled.
///
/// Rejections use the standard error envelope, request ID included.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let authorized = bearer_token(&req).is_some_and(|token| auth.allows(token));
    if authorized {
        next.run(req).await
    } else {
        ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid bearer token",
        )
        .into_response()
    }
}

/// Enforce the per-caller request window.
pub async fn enforce_rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let caller = bearer_token(&req).unwrap_or("anonymous").to_owned();
    if limiter.try_acquire(&caller).await {
        next.run(req).await
    } else {
        ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response()
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn config(env: Environment, api_keys: Vec<String>) -> AppConfig {
        AppConfig {
            env,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "info".to_string(),
            api_keys,
            request_timeout_secs: 5,
            user_agent: "trendscout-test".to_string(),
            reply_expansion_threshold: 1,
            devto_base_url: "http://127.0.0.1:1".to_string(),
            twitter_base_url: "http://127.0.0.1:1".to_string(),
            twitter_api_key: None,
            reddit_auth_base_url: "http://127.0.0.1:1".to_string(),
            reddit_api_base_url: "http://127.0.0.1:1".to_string(),
            reddit_client_id: None,
            reddit_client_secret: None,
            reddit_app_name: None,
            reddit_username: None,
            keyword_base_url: "http://127.0.0.1:1".to_string(),
            keyword_api_key: None,
        }
    }

    #[test]
    fn production_without_keys_is_a_config_error() {
        let result = AuthState::from_config(&config(Environment::Production, Vec::new()));
        match result {
            Err(ConfigError::MissingEnvVar(var)) => assert_eq!(var, "TRENDSCOUT_API_KEYS"),
            Err(other) => panic!("expected MissingEnvVar, got: {other:?}"),
            Ok(_) => panic!("expected MissingEnvVar, got auth state"),
        }
    }

    #[test]
    fn development_without_keys_disables_auth() {
        let auth = AuthState::from_config(&config(Environment::Development, Vec::new()))
            .expect("development tolerates missing keys");
        assert!(!auth.enabled);
    }

    #[test]
    fn configured_keys_enable_auth() {
        let auth = AuthState::from_config(&config(
            Environment::Production,
            vec!["scout-key".to_string()],
        ))
        .expect("auth state");
        assert!(auth.enabled);
        assert!(auth.allows("scout-key"));
        assert!(!auth.allows("other-key"));
    }

    #[tokio::test]
    async fn limiter_windows_are_per_caller() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.try_acquire("caller-a").await);
        assert!(!limiter.try_acquire("caller-a").await, "window exhausted");
        assert!(
            limiter.try_acquire("caller-b").await,
            "a second caller gets its own window"
        );
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blank_tokens() {
        let with_header = |value: &str| {
            axum::http::Request::builder()
                .header(AUTHORIZATION, value)
                .body(Body::empty())
                .expect("request")
        };
        assert_eq!(
            bearer_token(&with_header("Bearer scout-key")),
            Some("scout-key")
        );
        assert_eq!(bearer_token(&with_header("Basic abc123")), None);
        assert_eq!(bearer_token(&with_header("Bearer   ")), None);
    }
}
