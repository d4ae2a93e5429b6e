use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if any env var holds an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if any env var holds an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
///
/// Per-source credentials are optional here: each aggregation endpoint checks for
/// the credentials it needs and fails before any network call when they are absent.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("TRENDSCOUT_ENV", "development"));

    let bind_addr = parse_addr("TRENDSCOUT_BIND_ADDR", "0.0.0.0:4000")?;
    let log_level = or_default("TRENDSCOUT_LOG_LEVEL", "info");
    let api_keys: Vec<String> = or_default("TRENDSCOUT_API_KEYS", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    let request_timeout_secs = parse_u64("TRENDSCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "TRENDSCOUT_USER_AGENT",
        "trendscout/0.1 (content-aggregation)",
    );
    let reply_expansion_threshold = parse_i64("TRENDSCOUT_REPLY_EXPANSION_THRESHOLD", "1")?;

    let devto_base_url = or_default("TRENDSCOUT_DEVTO_BASE_URL", "https://dev.to");
    let twitter_base_url = or_default("TRENDSCOUT_TWITTER_BASE_URL", "https://api.twitterapi.io");
    let twitter_api_key = lookup("TWITTER_API_KEY").ok();
    let reddit_auth_base_url =
        or_default("TRENDSCOUT_REDDIT_AUTH_BASE_URL", "https://www.reddit.com");
    let reddit_api_base_url =
        or_default("TRENDSCOUT_REDDIT_API_BASE_URL", "https://oauth.reddit.com");
    let reddit_client_id = lookup("REDDIT_CLIENT_ID").ok();
    let reddit_client_secret = lookup("REDDIT_CLIENT_SECRET").ok();
    let reddit_app_name = lookup("REDDIT_APP_NAME").ok();
    let reddit_username = lookup("REDDIT_USERNAME").ok();
    let keyword_base_url = or_default(
        "TRENDSCOUT_KEYWORD_BASE_URL",
        "https://seo-keyword-research.p.rapidapi.com",
    );
    let keyword_api_key = lookup("KEYWORD_API_KEY").ok();

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        api_keys,
        request_timeout_secs,
        user_agent,
        reply_expansion_threshold,
        devto_base_url,
        twitter_base_url,
        twitter_api_key,
        reddit_auth_base_url,
        reddit_api_base_url,
        reddit_client_id,
        reddit_client_secret,
        reddit_app_name,
        reddit_username,
        keyword_base_url,
        keyword_api_key,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn parse_environment_production() {
        assert_eq!(parse_environment("production"), Environment::Production);
    }

    #[test]
    fn parse_environment_unknown_defaults_to_development() {
        assert_eq!(parse_environment("unknown"), Environment::Development);
    }

    #[test]
    fn build_app_config_succeeds_with_empty_env() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should suffice");
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:4000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.reply_expansion_threshold, 1);
        assert_eq!(cfg.devto_base_url, "https://dev.to");
        assert!(cfg.api_keys.is_empty());
        assert!(cfg.twitter_api_key.is_none());
        assert!(cfg.reddit_client_id.is_none());
        assert!(cfg.keyword_api_key.is_none());
    }

    #[test]
    fn build_app_config_fails_with_invalid_bind_addr() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("TRENDSCOUT_BIND_ADDR", "not-a-socket-addr");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TRENDSCOUT_BIND_ADDR"),
            "expected InvalidEnvVar(TRENDSCOUT_BIND_ADDR), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_fails_with_invalid_timeout() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("TRENDSCOUT_REQUEST_TIMEOUT_SECS", "soon");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TRENDSCOUT_REQUEST_TIMEOUT_SECS"),
            "expected InvalidEnvVar(TRENDSCOUT_REQUEST_TIMEOUT_SECS), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_reads_credentials_when_present() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("TWITTER_API_KEY", "tw-key");
        map.insert("REDDIT_CLIENT_ID", "rid");
        map.insert("REDDIT_CLIENT_SECRET", "rsecret");
        map.insert("REDDIT_APP_NAME", "trendscout");
        map.insert("REDDIT_USERNAME", "scout_admin");
        map.insert("KEYWORD_API_KEY", "kw-key");
        let cfg = build_app_config(lookup_from_map(&map)).expect("config");
        assert_eq!(cfg.twitter_api_key.as_deref(), Some("tw-key"));
        assert_eq!(cfg.reddit_app_name.as_deref(), Some("trendscout"));
        assert_eq!(cfg.keyword_api_key.as_deref(), Some("kw-key"));
    }

    #[test]
    fn build_app_config_reply_threshold_override() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("TRENDSCOUT_REPLY_EXPANSION_THRESHOLD", "5");
        let cfg = build_app_config(lookup_from_map(&map)).expect("config");
        assert_eq!(cfg.reply_expansion_threshold, 5);
    }

    #[test]
    fn api_keys_split_on_commas_and_drop_blanks() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("TRENDSCOUT_API_KEYS", "alpha, beta,,  ,gamma");
        let cfg = build_app_config(lookup_from_map(&map)).expect("config");
        assert_eq!(cfg.api_keys, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("REDDIT_CLIENT_SECRET", "super-secret");
        map.insert("TRENDSCOUT_API_KEYS", "bearer-key-1");
        let cfg = build_app_config(lookup_from_map(&map)).expect("config");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"), "secret leaked: {rendered}");
        assert!(!rendered.contains("bearer-key-1"), "api key leaked: {rendered}");
        assert!(rendered.contains("[redacted]"));
    }
}
