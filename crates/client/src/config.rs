use std::path::PathBuf;
use std::time::Duration;

/// REST base URL used when `DUOTRACK_API_URL` is unset or blank.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Fixed per-request timeout. Timeouts are reported like any other failure.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Period of the silent dashboard refresh.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL without a trailing slash.
    pub api_url: String,
    /// Socket endpoint, e.g. `ws://localhost:8000/ws`.
    pub ws_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// Where the bearer token is persisted. `None` keeps it in memory only.
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: derive_ws_url(DEFAULT_API_URL),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            token_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                         | Default                   |
    /// |---------------------------------|---------------------------|
    /// | `DUOTRACK_API_URL`              | `http://localhost:8000`   |
    /// | `DUOTRACK_WS_URL`               | derived from the API URL  |
    /// | `DUOTRACK_REQUEST_TIMEOUT_SECS` | `10`                      |
    /// | `DUOTRACK_POLL_INTERVAL_SECS`   | `5`                       |
    /// | `DUOTRACK_TOKEN_PATH`           | unset (memory only)       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = non_blank("DUOTRACK_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let ws_url = non_blank("DUOTRACK_WS_URL").unwrap_or_else(|| derive_ws_url(&api_url));

        let request_timeout_secs = parse_secs(
            "DUOTRACK_REQUEST_TIMEOUT_SECS",
            non_blank("DUOTRACK_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let poll_interval_secs = parse_secs(
            "DUOTRACK_POLL_INTERVAL_SECS",
            non_blank("DUOTRACK_POLL_INTERVAL_SECS"),
            DEFAULT_POLL_INTERVAL_SECS,
        )?;

        let token_path = non_blank("DUOTRACK_TOKEN_PATH").map(PathBuf::from);

        Ok(Self {
            api_url,
            ws_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            poll_interval: Duration::from_secs(poll_interval_secs),
            token_path,
        })
    }
}

fn parse_secs(var: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::InvalidNumber { var, value: raw }),
        },
    }
}

/// Socket endpoint for a REST base URL: `http` becomes `ws`, `https`
/// becomes `wss`, and `/ws` is appended.
pub fn derive_ws_url(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let swapped = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{swapped}/ws")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert!(config.token_path.is_none());
    }

    #[test]
    fn blank_api_url_uses_default() {
        let config = ClientConfig::from_lookup(lookup(&[("DUOTRACK_API_URL", "   ")])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn https_api_url_derives_wss() {
        let config =
            ClientConfig::from_lookup(lookup(&[("DUOTRACK_API_URL", "https://duo.example.com/")]))
                .unwrap();
        assert_eq!(config.api_url, "https://duo.example.com");
        assert_eq!(config.ws_url, "wss://duo.example.com/ws");
    }

    #[test]
    fn explicit_ws_url_wins() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("DUOTRACK_API_URL", "http://a:1"),
            ("DUOTRACK_WS_URL", "ws://b:2/socket"),
        ]))
        .unwrap();
        assert_eq!(config.ws_url, "ws://b:2/socket");
    }

    #[test]
    fn malformed_timeout_is_an_error() {
        let err = ClientConfig::from_lookup(lookup(&[("DUOTRACK_REQUEST_TIMEOUT_SECS", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("DUOTRACK_REQUEST_TIMEOUT_SECS"));

        assert!(
            ClientConfig::from_lookup(lookup(&[("DUOTRACK_POLL_INTERVAL_SECS", "0")])).is_err()
        );
    }

    #[test]
    fn token_path_is_read() {
        let config =
            ClientConfig::from_lookup(lookup(&[("DUOTRACK_TOKEN_PATH", "/tmp/duo.token")])).unwrap();
        assert_eq!(config.token_path, Some(PathBuf::from("/tmp/duo.token")));
    }
}
