//! Canonical output shapes shared by all source adapters.

use serde::{Deserialize, Serialize};

/// Engagement counters for a canonical item. Counts absent upstream are 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub like_count: i64,
    pub reply_count: i64,
    /// Only populated by sources with a share/repost concept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_count: Option<i64>,
}

/// The normalized, source-agnostic content record produced by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalContentItem {
    /// Source-native identifier, opaque.
    pub id: String,
    /// Canonical link to the original content.
    pub url: String,
    /// Display handle; `"Unknown"` when absent upstream.
    pub author: String,
    /// Source timestamp, passed through unmodified.
    pub published_at: String,
    /// Primary body. Rich (HTML/markdown) preferred, else plain, else empty.
    pub text: String,
    pub engagement: Engagement,
    pub tags: Vec<String>,
    /// Populated only when the expansion policy triggers; empty otherwise.
    pub comments: Vec<CommentNode>,
}

/// A node in a parent/child comment forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: String,
    pub body: String,
    pub author: String,
    pub created_at: String,
    pub like_count: i64,
    /// Recursively nested replies; empty at leaves.
    pub children: Vec<CommentNode>,
}

/// A flat, source-agnostic comment record as fed to the forest builder.
///
/// Adapters produce these from raw comment/reply payloads; the forest builder
/// links them into [`CommentNode`] trees via `parent_id` back-references.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub body: String,
    pub author: String,
    pub created_at: String,
    pub like_count: i64,
}

/// Slim mention shape returned for the Reddit source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedditMention {
    pub body: String,
    pub url: String,
    pub comment_count: i64,
    pub like_count: i64,
}

/// One row of keyword-research data from the volume provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordStat {
    pub keyword: String,
    pub volume: i64,
    pub cpc: f64,
    pub competition_value: Option<String>,
    pub search_intent: Option<String>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_monthly_searches: Option<serde_json::Value>,
}

/// Keyword-volume lookup result, keywords sorted descending by volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeReport {
    pub total_keywords: usize,
    pub search_question: String,
    pub search_country: String,
    pub keywords: Vec<KeywordStat>,
}
