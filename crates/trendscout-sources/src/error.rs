use thiserror::Error;

/// Errors surfaced by source clients.
///
/// Per-item comment-expansion failures are not represented here: they are
/// logged and swallowed at the item level, never escalated to the request.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL for a source does not parse.
    #[error("invalid base URL for {provider}: {detail}")]
    InvalidBaseUrl { provider: &'static str, detail: String },

    /// A required credential is not configured. Detected before any network I/O.
    #[error("missing credentials for {0}")]
    MissingCredentials(&'static str),

    /// The token endpoint rejected the configured client credentials.
    /// An administrator needs to rotate or fix them.
    #[error("invalid or expired credentials for {provider}: {detail}")]
    InvalidCredentials { provider: &'static str, detail: String },

    /// Token acquisition failed for a reason other than bad credentials.
    #[error("token acquisition failed for {provider}: {detail}")]
    TokenExchange { provider: &'static str, detail: String },

    /// The third party answered with a non-success status. The body is
    /// preserved for diagnosis.
    #[error("{provider} request failed with status {status}: {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
