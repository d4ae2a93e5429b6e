//! Pure cost-efficiency ranking for keyword lists. No I/O.

use serde::{Deserialize, Serialize};

/// Input tuple for [`rank_keywords`].
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordInput {
    pub keyword: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub cpc: f64,
}

/// A keyword annotated with its volume-per-cost rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedKeyword {
    pub keyword: String,
    pub volume: f64,
    pub cpc: f64,
    pub rank: f64,
}

/// Annotate keywords with `rank = volume / cpc` and sort descending by rank.
///
/// Zero-cost keywords get rank 0 (never a division by zero) and therefore
/// sort to the bottom. The sort is stable, so ties keep input order.
#[must_use]
pub fn rank_keywords(keywords: Vec<KeywordInput>) -> Vec<RankedKeyword> {
    let mut ranked: Vec<RankedKeyword> = keywords
        .into_iter()
        .map(|k| {
            let rank = if k.cpc == 0.0 { 0.0 } else { k.volume / k.cpc };
            RankedKeyword {
                keyword: k.keyword,
                volume: k.volume,
                cpc: k.cpc,
                rank,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.rank.total_cmp(&a.rank));
    ranked
}
