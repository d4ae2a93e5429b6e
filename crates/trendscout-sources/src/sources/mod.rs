//! Source clients, one per external platform.
//!
//! Each client owns its HTTP plumbing and raw response shapes; only canonical
//! types leave this module.

mod devto;
mod keywords;
mod reddit;
mod twitter;

pub use devto::{DevtoClient, DevtoQuery, DEFAULT_DEVTO_LIMIT};
pub use keywords::KeywordVolumeClient;
pub use reddit::{RedditClient, RedditCredentials, DEFAULT_REDDIT_LIMIT};
pub use twitter::{TwitterClient, TwitterQuery, DEFAULT_TWITTER_LIMIT};

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::SourceError;

pub(crate) fn build_http_client(
    timeout_secs: u64,
    user_agent: &str,
) -> Result<Client, SourceError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()?)
}

/// Normalise a base URL so it ends with exactly one slash; `Url::join` then
/// appends below the root path instead of replacing the last segment.
pub(crate) fn parse_base_url(raw: &str, provider: &'static str) -> Result<Url, SourceError> {
    let normalised = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
        provider,
        detail: format!("'{raw}': {e}"),
    })
}

pub(crate) fn join_url(
    base: &Url,
    path: &str,
    provider: &'static str,
) -> Result<Url, SourceError> {
    base.join(path).map_err(|e| SourceError::InvalidBaseUrl {
        provider,
        detail: format!("'{base}' + '{path}': {e}"),
    })
}

/// Assert a 2xx status and parse the body as JSON, preserving the raw body
/// text in the error when the upstream answered non-success.
pub(crate) async fn read_json(
    provider: &'static str,
    url: &Url,
    response: Response,
) -> Result<serde_json::Value, SourceError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(SourceError::Upstream {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
        context: url.to_string(),
        source: e,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(
    context: &str,
    value: serde_json::Value,
) -> Result<T, SourceError> {
    serde_json::from_value(value).map_err(|e| SourceError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_base_url_strips_trailing_slashes() {
        let url = parse_base_url("https://dev.to//", "devto").expect("parse");
        assert_eq!(url.as_str(), "https://dev.to/");
    }

    #[test]
    fn parse_base_url_rejects_garbage() {
        let result = parse_base_url("not a url", "devto");
        assert!(matches!(
            result,
            Err(SourceError::InvalidBaseUrl { provider: "devto", .. })
        ));
    }

    #[test]
    fn join_url_appends_below_root() {
        let base = parse_base_url("https://dev.to", "devto").expect("parse");
        let url = join_url(&base, "api/articles", "devto").expect("join");
        assert_eq!(url.as_str(), "https://dev.to/api/articles");
    }
}
