//! Keyword-research provider client (search volume / CPC per keyword).

use reqwest::{Client, Url};
use serde::Deserialize;

use super::{build_http_client, decode, join_url, parse_base_url, read_json};
use crate::error::SourceError;
use crate::types::{KeywordStat, VolumeReport};

const PROVIDER: &str = "keyword-volume";
const SOURCE_LABEL: &str = "seo-keyword-research";

/// The provider has shipped both a bare array and a `keywords`-wrapped object
/// for the same endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VolumePayload {
    Wrapped { keywords: Vec<RawKeywordRow> },
    Flat(Vec<RawKeywordRow>),
}

#[derive(Debug, Deserialize)]
struct RawKeywordRow {
    #[serde(alias = "text")]
    keyword: Option<String>,
    #[serde(alias = "vol")]
    volume: Option<i64>,
    cpc: Option<f64>,
    #[serde(alias = "competition")]
    competition_value: Option<String>,
    #[serde(alias = "intent")]
    search_intent: Option<String>,
    avg_monthly_searches: Option<serde_json::Value>,
}

/// Client for the keyword-volume provider. Authenticates with a static API
/// key header.
pub struct KeywordVolumeClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl KeywordVolumeClient {
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
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_http_client(timeout_secs, user_agent)?,
            base_url: parse_base_url(base_url, PROVIDER)?,
            api_key: api_key.to_owned(),
        })
    }

    /// Look up keyword stats for a question/country pair.
    ///
    /// Rows without a keyword string are dropped; the remainder is sorted
    /// descending by volume.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider call fails or the payload matches
    /// neither known response shape.
    pub async fn search_volume(
        &self,
        search_question: &str,
        search_country: &str,
    ) -> Result<VolumeReport, SourceError> {
        let mut url = join_url(&self.base_url, "keynew/", PROVIDER)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("keyword", search_question);
            pairs.append_pair("country", search_country);
        }

        let response = self
            .client
            .get(url.clone())
            .header("x-rapidapi-key", &self.api_key)
            .send()
            .await?;
        let body = read_json(PROVIDER, &url, response).await?;
        let payload: VolumePayload = decode("keyword volume", body)?;

        let rows = match payload {
            VolumePayload::Wrapped { keywords } => keywords,
            VolumePayload::Flat(rows) => rows,
        };

        let mut keywords: Vec<KeywordStat> = rows
            .into_iter()
            .filter_map(|row| {
                let keyword = row.keyword.filter(|k| !k.is_empty())?;
                Some(KeywordStat {
                    keyword,
                    volume: row.volume.unwrap_or(0),
                    cpc: row.cpc.unwrap_or(0.0),
                    competition_value: row.competition_value,
                    search_intent: row.search_intent,
                    source: SOURCE_LABEL.to_string(),
                    avg_monthly_searches: row.avg_monthly_searches,
                })
            })
            .collect();
        keywords.sort_by(|a, b| b.volume.cmp(&a.volume));

        tracing::debug!(
            source = PROVIDER,
            count = keywords.len(),
            "fetched keyword stats"
        );

        Ok(VolumeReport {
            total_keywords: keywords.len(),
            search_question: search_question.to_string(),
            search_country: search_country.to_string(),
            keywords,
        })
    }
}
