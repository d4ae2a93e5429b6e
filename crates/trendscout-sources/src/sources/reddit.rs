//! Reddit source (client-credentials OAuth + keyword search).
//!
//! Returns the slim [`RedditMention`] shape: no nested comments, no tags.

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{build_http_client, decode, join_url, parse_base_url, read_json};
use crate::error::SourceError;
use crate::normalize::body_text;
use crate::types::RedditMention;

const PROVIDER: &str = "reddit";

/// Default result limit for mention searches.
pub const DEFAULT_REDDIT_LIMIT: usize = 25;

/// The four-part credential set Reddit's API requires. The app name and
/// username form the User-Agent Reddit expects from registered scripts.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub app_name: String,
    pub username: String,
}

/// Reddit OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Reddit search listing wrapper.
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RawPost,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    title: Option<String>,
    selftext: Option<String>,
    selftext_html: Option<String>,
    permalink: Option<String>,
    num_comments: Option<i64>,
    ups: Option<i64>,
    score: Option<i64>,
}

/// Reddit API client holding a valid access token.
///
/// No token cache: each [`RedditClient::connect`] re-exchanges credentials.
pub struct RedditClient {
    client: Client,
    token: String,
    api_base: Url,
}

impl RedditClient {
    /// Exchange client credentials for a bearer token and return a ready client.
    ///
    /// # Errors
    ///
    /// - [`SourceError::InvalidCredentials`] when the token endpoint rejects
    ///   the credential pair (401/403 or an `invalid_client` body).
    /// - [`SourceError::TokenExchange`] for any other exchange failure.
    pub async fn connect(
        credentials: &RedditCredentials,
        auth_base_url: &str,
        api_base_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, SourceError> {
        let user_agent = format!(
            "{}/0.1 (by /u/{})",
            credentials.app_name, credentials.username
        );
        let client = build_http_client(timeout_secs, &user_agent)?;
        let auth_base = parse_base_url(auth_base_url, PROVIDER)?;
        let api_base = parse_base_url(api_base_url, PROVIDER)?;
        let token = Self::fetch_token(&client, &auth_base, credentials).await?;

        Ok(Self {
            client,
            token,
            api_base,
        })
    }

    async fn fetch_token(
        client: &Client,
        auth_base: &Url,
        credentials: &RedditCredentials,
    ) -> Result<String, SourceError> {
        let url = join_url(auth_base, "api/v1/access_token", PROVIDER)?;
        let response = client
            .post(url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || body.contains("invalid_client")
        {
            return Err(SourceError::InvalidCredentials {
                provider: PROVIDER,
                detail: format!(
                    "token endpoint answered {status}; rotate REDDIT_CLIENT_ID/REDDIT_CLIENT_SECRET"
                ),
            });
        }
        if !status.is_success() {
            return Err(SourceError::TokenExchange {
                provider: PROVIDER,
                detail: format!("token exchange failed with status {status}: {body}"),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: "reddit access_token".to_string(),
                source: e,
            })?;

        parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SourceError::TokenExchange {
                provider: PROVIDER,
                detail: "token response carried no access_token".to_string(),
            })
    }

    /// Search Reddit for keyword mentions and map them to the slim shape.
    ///
    /// Output order matches the listing order.
    ///
    /// # Errors
    ///
    /// Returns an error when the search request fails or the response does
    /// not match the listing shape.
    pub async fn search(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<RedditMention>, SourceError> {
        let mut url = join_url(&self.api_base, "search", PROVIDER)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", keyword);
            pairs.append_pair("limit", &limit.to_string());
            pairs.append_pair("sort", "relevance");
        }

        let response = self
            .client
            .get(url.clone())
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;
        let body = read_json(PROVIDER, &url, response).await?;
        let listing: Listing = decode("reddit search", body)?;

        tracing::debug!(
            source = PROVIDER,
            count = listing.data.children.len(),
            "fetched mentions"
        );

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| normalize_post(child.data))
            .collect())
    }
}

fn normalize_post(post: RawPost) -> RedditMention {
    RedditMention {
        body: body_text(
            post.selftext_html,
            post.selftext.filter(|s| !s.is_empty()).or(post.title),
        ),
        url: post
            .permalink
            .map(|p| format!("https://www.reddit.com{p}"))
            .unwrap_or_default(),
        comment_count: post.num_comments.unwrap_or(0),
        like_count: post.ups.or(post.score).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_post() -> RawPost {
        RawPost {
            title: None,
            selftext: None,
            selftext_html: None,
            permalink: None,
            num_comments: None,
            ups: None,
            score: None,
        }
    }

    #[test]
    fn missing_fields_normalize_to_defaults() {
        let mention = normalize_post(bare_post());
        assert_eq!(mention.body, "");
        assert_eq!(mention.url, "");
        assert_eq!(mention.comment_count, 0);
        assert_eq!(mention.like_count, 0);
    }

    #[test]
    fn body_prefers_html_then_text_then_title() {
        let mut post = bare_post();
        post.title = Some("title only".to_string());
        assert_eq!(normalize_post(post).body, "title only");

        let mut post = bare_post();
        post.title = Some("title".to_string());
        post.selftext = Some("plain".to_string());
        post.selftext_html = Some("<p>rich</p>".to_string());
        assert_eq!(normalize_post(post).body, "<p>rich</p>");
    }

    #[test]
    fn permalink_expands_to_full_url() {
        let mut post = bare_post();
        post.permalink = Some("/r/rust/comments/abc/hello/".to_string());
        assert_eq!(
            normalize_post(post).url,
            "https://www.reddit.com/r/rust/comments/abc/hello/"
        );
    }

    #[test]
    fn like_count_falls_back_from_ups_to_score() {
        let mut post = bare_post();
        post.score = Some(5);
        assert_eq!(normalize_post(post).like_count, 5);

        let mut post = bare_post();
        post.ups = Some(9);
        post.score = Some(5);
        assert_eq!(normalize_post(post).like_count, 9);
    }
}
