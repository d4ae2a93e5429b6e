//! Twitter/X source via a hosted search API (advanced search + reply expansion).
//!
//! Every tweet carries a `lang` tag, so reply expansion keeps only entries
//! tagged `en`; untagged entries are treated as excluded.

use reqwest::{Client, Url};
use serde::Deserialize;

use super::{build_http_client, decode, join_url, parse_base_url, read_json};
use crate::error::SourceError;
use crate::normalize::{author_or_unknown, build_forest};
use crate::types::{CanonicalContentItem, CommentNode, CommentRecord, Engagement};

const PROVIDER: &str = "twitter";
const DEFAULT_QUERY_TYPE: &str = "Latest";

/// Default item limit when the caller does not specify one.
pub const DEFAULT_TWITTER_LIMIT: usize = 500;

/// Query for the Twitter fetcher. `query` may contain advanced-search
/// operators; they are passed through verbatim.
#[derive(Debug, Clone)]
pub struct TwitterQuery {
    pub query: String,
    /// `"Latest"` (default) or `"Top"`.
    pub query_type: Option<String>,
    pub limit: usize,
}

impl TwitterQuery {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_type: None,
            limit: DEFAULT_TWITTER_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TweetsPage {
    #[serde(default)]
    tweets: Vec<RawTweet>,
    #[serde(default)]
    has_next_page: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTweet {
    id: Option<String>,
    url: Option<String>,
    text: Option<String>,
    created_at: Option<String>,
    lang: Option<String>,
    retweet_count: Option<i64>,
    reply_count: Option<i64>,
    like_count: Option<i64>,
    in_reply_to_id: Option<String>,
    author: Option<RawTweetAuthor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTweetAuthor {
    user_name: Option<String>,
}

impl RawTweet {
    fn into_record(self) -> Option<CommentRecord> {
        let id = self.id.filter(|s| !s.is_empty())?;
        Some(CommentRecord {
            id,
            parent_id: self.in_reply_to_id.filter(|s| !s.is_empty()),
            body: self.text.unwrap_or_default(),
            author: author_or_unknown(self.author.and_then(|a| a.user_name)),
            created_at: self.created_at.unwrap_or_default(),
            like_count: self.like_count.unwrap_or(0),
        })
    }
}

/// Client for the hosted Twitter search API. Authenticates with a static
/// API key sent on every request.
pub struct TwitterClient {
    client: Client,
    base_url: Url,
    api_key: String,
    reply_threshold: i64,
}

impl TwitterClient {
    /// Create a client. `base_url` is overridable to point at a mock server.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::InvalidBaseUrl`] for an unparseable base URL.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        reply_threshold: i64,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_http_client(timeout_secs, user_agent)?,
            base_url: parse_base_url(base_url, PROVIDER)?,
            api_key: api_key.to_owned(),
            reply_threshold,
        })
    }

    /// Fetch, conditionally expand, and normalize tweets for a query.
    ///
    /// Output order matches the upstream search order. Per-item reply
    /// expansion failures are logged and leave that tweet's `comments`
    /// empty; they never fail the batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the primary search call fails.
    pub async fn fetch(
        &self,
        query: &TwitterQuery,
    ) -> Result<Vec<CanonicalContentItem>, SourceError> {
        let tweets = self.search(query).await?;

        tracing::debug!(source = PROVIDER, count = tweets.len(), "fetched tweets");

        let forests = futures::future::join_all(tweets.iter().map(|t| self.expand(t))).await;

        Ok(tweets
            .into_iter()
            .zip(forests)
            .map(|(tweet, comments)| normalize_tweet(tweet, comments))
            .collect())
    }

    async fn search(&self, query: &TwitterQuery) -> Result<Vec<RawTweet>, SourceError> {
        let query_type = query.query_type.as_deref().unwrap_or(DEFAULT_QUERY_TYPE);
        let mut collected: Vec<RawTweet> = Vec::new();
        let mut cursor: Option<String> = None;

        // The API pages roughly 20 tweets per call; follow cursors until the
        // requested limit is reached or the upstream runs out. Fewer results
        // than requested is not an error; the caller infers it from the length.
        // A page that contributes no tweets ends the loop even when the
        // upstream still advertises a next page, so the request stays bounded.
        loop {
            let mut url = join_url(&self.base_url, "twitter/tweet/advanced_search", PROVIDER)?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("query", &query.query);
                pairs.append_pair("queryType", query_type);
                if let Some(c) = &cursor {
                    pairs.append_pair("cursor", c);
                }
            }

            let response = self
                .client
                .get(url.clone())
                .header("X-API-Key", &self.api_key)
                .send()
                .await?;
            let body = read_json(PROVIDER, &url, response).await?;
            let page: TweetsPage = decode("twitter advanced_search", body)?;

            let fetched = page.tweets.len();
            collected.extend(page.tweets);
            if fetched == 0 || collected.len() >= query.limit || !page.has_next_page {
                break;
            }
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }

        collected.truncate(query.limit);
        Ok(collected)
    }

    /// One extra call per qualifying tweet. Only tweets reporting more
    /// replies than the configured threshold are expanded.
    async fn expand(&self, tweet: &RawTweet) -> Vec<CommentNode> {
        if tweet.reply_count.unwrap_or(0) <= self.reply_threshold {
            return Vec::new();
        }
        let Some(id) = tweet.id.as_deref() else {
            return Vec::new();
        };
        match self.fetch_replies(id).await {
            Ok(records) => build_forest(records),
            Err(e) => {
                tracing::warn!(
                    source = PROVIDER,
                    tweet_id = id,
                    error = %e,
                    "reply expansion failed; item continues without comments"
                );
                Vec::new()
            }
        }
    }

    async fn fetch_replies(&self, tweet_id: &str) -> Result<Vec<CommentRecord>, SourceError> {
        let mut url = join_url(&self.base_url, "twitter/tweet/replies", PROVIDER)?;
        url.query_pairs_mut().append_pair("tweetId", tweet_id);

        let response = self
            .client
            .get(url.clone())
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;
        let body = read_json(PROVIDER, &url, response).await?;
        let page: TweetsPage = decode("twitter replies", body)?;

        Ok(page
            .tweets
            .into_iter()
            .filter(|t| t.lang.as_deref() == Some("en"))
            .filter_map(RawTweet::into_record)
            .collect())
    }
}

fn normalize_tweet(tweet: RawTweet, comments: Vec<CommentNode>) -> CanonicalContentItem {
    let id = tweet.id.unwrap_or_default();
    let author = author_or_unknown(tweet.author.and_then(|a| a.user_name));
    let url = tweet
        .url
        .filter(|u| !u.is_empty())
        .or_else(|| {
            if id.is_empty() || author == "Unknown" {
                None
            } else {
                Some(format!("https://x.com/{author}/status/{id}"))
            }
        })
        .unwrap_or_default();

    CanonicalContentItem {
        id,
        url,
        author,
        published_at: tweet.created_at.unwrap_or_default(),
        text: tweet.text.unwrap_or_default(),
        engagement: Engagement {
            like_count: tweet.like_count.unwrap_or(0),
            reply_count: tweet.reply_count.unwrap_or(0),
            share_count: Some(tweet.retweet_count.unwrap_or(0)),
        },
        tags: Vec::new(),
        comments,
    }
}
