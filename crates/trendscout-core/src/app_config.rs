use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Accepted bearer tokens for inbound requests. Empty means auth is
    /// disabled outside production.
    pub api_keys: Vec<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Comment expansion triggers only when an item reports more replies than this.
    pub reply_expansion_threshold: i64,
    pub devto_base_url: String,
    pub twitter_base_url: String,
    pub twitter_api_key: Option<String>,
    pub reddit_auth_base_url: String,
    pub reddit_api_base_url: String,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_app_name: Option<String>,
    pub reddit_username: Option<String>,
    pub keyword_base_url: String,
    pub keyword_api_key: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field(
                "reply_expansion_threshold",
                &self.reply_expansion_threshold,
            )
            .field("devto_base_url", &self.devto_base_url)
            .field("twitter_base_url", &self.twitter_base_url)
            .field(
                "twitter_api_key",
                &self.twitter_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("reddit_auth_base_url", &self.reddit_auth_base_url)
            .field("reddit_api_base_url", &self.reddit_api_base_url)
            .field(
                "reddit_client_id",
                &self.reddit_client_id.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "reddit_client_secret",
                &self.reddit_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("reddit_app_name", &self.reddit_app_name)
            .field("reddit_username", &self.reddit_username)
            .field("keyword_base_url", &self.keyword_base_url)
            .field(
                "keyword_api_key",
                &self.keyword_api_key.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}
