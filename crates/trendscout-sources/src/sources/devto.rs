//! Dev.to content source: keyword search, tag browse, and comment expansion.
//!
//! Search mode hits `search/feed_content`, whose payload nests results under a
//! top-level `result` collection; listing mode hits `api/articles`, which
//! returns a bare array. That difference stays inside this adapter.
//!
//! Dev.to does not tag content with a language, so expansion applies no
//! language filter: every comment record passes through.

use reqwest::{Client, Url};
use serde::Deserialize;

use super::{build_http_client, decode, join_url, parse_base_url, read_json};
use crate::error::SourceError;
use crate::normalize::{author_or_unknown, body_text, build_forest};
use crate::types::{CanonicalContentItem, CommentNode, CommentRecord, Engagement};

const PROVIDER: &str = "devto";

/// Default item limit when the caller does not specify one.
pub const DEFAULT_DEVTO_LIMIT: usize = 10;

/// Query for the Dev.to fetcher.
///
/// Keyword search takes priority over tag browse when both are present.
#[derive(Debug, Clone)]
pub struct DevtoQuery {
    pub keyword: Option<String>,
    pub tag: Option<String>,
    pub limit: usize,
}

impl Default for DevtoQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            tag: None,
            limit: DEFAULT_DEVTO_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    result: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    id: Option<i64>,
    url: Option<String>,
    path: Option<String>,
    published_at: Option<String>,
    published_timestamp: Option<String>,
    body_html: Option<String>,
    body_markdown: Option<String>,
    positive_reactions_count: Option<i64>,
    public_reactions_count: Option<i64>,
    comments_count: Option<i64>,
    tag_list: Option<TagList>,
    user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    username: Option<String>,
    name: Option<String>,
}

/// `tag_list` arrives as an array on some endpoints and a comma-joined string
/// on others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagList {
    Many(Vec<String>),
    Joined(String),
}

impl TagList {
    fn into_vec(self) -> Vec<String> {
        match self {
            TagList::Many(tags) => tags,
            TagList::Joined(joined) => joined
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id_code: Option<String>,
    parent_id: Option<String>,
    body_html: Option<String>,
    body_markdown: Option<String>,
    created_at: Option<String>,
    positive_reactions_count: Option<i64>,
    public_reactions_count: Option<i64>,
    user: Option<RawUser>,
}

impl RawComment {
    fn into_record(self) -> Option<CommentRecord> {
        let id = self.id_code.filter(|s| !s.is_empty())?;
        Some(CommentRecord {
            id,
            parent_id: self.parent_id.filter(|s| !s.is_empty()),
            body: body_text(self.body_html, self.body_markdown),
            author: author_or_unknown(self.user.and_then(|u| u.username.or(u.name))),
            created_at: self.created_at.unwrap_or_default(),
            like_count: self
                .positive_reactions_count
                .or(self.public_reactions_count)
                .unwrap_or(0),
        })
    }
}

/// Dev.to API client.
pub struct DevtoClient {
    client: Client,
    base_url: Url,
    reply_threshold: i64,
}

impl DevtoClient {
    /// Create a client. `base_url` is overridable to point at a mock server.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built, or
    /// [`SourceError::InvalidBaseUrl`] for an unparseable base URL.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        reply_threshold: i64,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_http_client(timeout_secs, user_agent)?,
            base_url: parse_base_url(base_url, PROVIDER)?,
            reply_threshold,
        })
    }

    /// Fetch, conditionally expand, and normalize articles for a query.
    ///
    /// Output order matches the upstream listing order. Expansion failures
    /// for individual articles are logged and leave that article's
    /// `comments` empty; they never fail the batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the primary search/listing call fails.
    pub async fn fetch(
        &self,
        query: &DevtoQuery,
    ) -> Result<Vec<CanonicalContentItem>, SourceError> {
        let articles = if let Some(keyword) = query.keyword.as_deref() {
            self.search(keyword, query.limit).await?
        } else {
            self.listing(query.tag.as_deref(), query.limit).await?
        };

        tracing::debug!(source = PROVIDER, count = articles.len(), "fetched articles");

        // Expansion calls are independent per item; join_all preserves input
        // order, so normalization below keeps the listing order.
        let forests =
            futures::future::join_all(articles.iter().map(|a| self.expand(a))).await;

        Ok(articles
            .into_iter()
            .zip(forests)
            .map(|(article, comments)| self.normalize_article(article, comments))
            .collect())
    }

    async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<RawArticle>, SourceError> {
        let mut url = join_url(&self.base_url, "search/feed_content", PROVIDER)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("search_fields", keyword);
            pairs.append_pair("per_page", &limit.to_string());
        }
        let response = self.client.get(url.clone()).send().await?;
        let body = read_json(PROVIDER, &url, response).await?;
        let envelope: SearchEnvelope = decode("devto search/feed_content", body)?;
        Ok(envelope.result)
    }

    async fn listing(
        &self,
        tag: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RawArticle>, SourceError> {
        let mut url = join_url(&self.base_url, "api/articles", PROVIDER)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("per_page", &limit.to_string());
            if let Some(tag) = tag {
                pairs.append_pair("tag", tag);
            }
        }
        let response = self.client.get(url.clone()).send().await?;
        let body = read_json(PROVIDER, &url, response).await?;
        decode("devto api/articles", body)
    }

    /// One extra call per qualifying article. Only articles reporting more
    /// replies than the configured threshold are expanded.
    async fn expand(&self, article: &RawArticle) -> Vec<CommentNode> {
        if article.comments_count.unwrap_or(0) <= self.reply_threshold {
            return Vec::new();
        }
        let Some(id) = article.id else {
            return Vec::new();
        };
        match self.fetch_comments(id).await {
            Ok(records) => build_forest(records),
            Err(e) => {
                tracing::warn!(
                    source = PROVIDER,
                    article_id = id,
                    error = %e,
                    "comment expansion failed; item continues without comments"
                );
                Vec::new()
            }
        }
    }

    async fn fetch_comments(&self, article_id: i64) -> Result<Vec<CommentRecord>, SourceError> {
        let mut url = join_url(&self.base_url, "api/comments", PROVIDER)?;
        url.query_pairs_mut()
            .append_pair("a_id", &article_id.to_string());
        let response = self.client.get(url.clone()).send().await?;
        let body = read_json(PROVIDER, &url, response).await?;
        let raw: Vec<RawComment> = decode("devto api/comments", body)?;
        Ok(raw.into_iter().filter_map(RawComment::into_record).collect())
    }

    fn normalize_article(
        &self,
        article: RawArticle,
        comments: Vec<CommentNode>,
    ) -> CanonicalContentItem {
        let link = article
            .url
            .filter(|u| !u.is_empty())
            .or_else(|| {
                article.path.and_then(|p| {
                    self.base_url
                        .join(p.trim_start_matches('/'))
                        .ok()
                        .map(|u| u.to_string())
                })
            })
            .unwrap_or_default();

        CanonicalContentItem {
            id: article.id.map(|i| i.to_string()).unwrap_or_default(),
            url: link,
            author: author_or_unknown(article.user.and_then(|u| u.username.or(u.name))),
            published_at: article
                .published_at
                .or(article.published_timestamp)
                .unwrap_or_default(),
            text: body_text(article.body_html, article.body_markdown),
            engagement: Engagement {
                like_count: article
                    .positive_reactions_count
                    .or(article.public_reactions_count)
                    .unwrap_or(0),
                reply_count: article.comments_count.unwrap_or(0),
                share_count: None,
            },
            tags: article.tag_list.map(TagList::into_vec).unwrap_or_default(),
            comments,
        }
    }
}
