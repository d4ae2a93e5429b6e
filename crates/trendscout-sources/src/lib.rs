//! Multi-source content aggregation core for trendscout.
//!
//! Fetches content for a query from third-party platforms (Dev.to, Twitter/X
//! via a hosted search API, Reddit, a keyword-research provider), conditionally
//! expands comment threads, and normalizes everything into one canonical record
//! shape. Source-specific field names never escape the per-source adapters.
//!
//! Nothing here persists data; each call is a stateless
//! `fetch → (maybe) expand → normalize` pipeline.

pub mod error;
pub mod normalize;
pub mod rank;
pub mod types;

mod sources;

pub use error::SourceError;
pub use normalize::build_forest;
pub use rank::{rank_keywords, KeywordInput, RankedKeyword};
pub use sources::{
    DevtoClient, DevtoQuery, KeywordVolumeClient, RedditClient, RedditCredentials, TwitterClient,
    TwitterQuery, DEFAULT_DEVTO_LIMIT, DEFAULT_REDDIT_LIMIT, DEFAULT_TWITTER_LIMIT,
};
pub use types::{
    CanonicalContentItem, CommentNode, CommentRecord, Engagement, KeywordStat, RedditMention,
    VolumeReport,
};
