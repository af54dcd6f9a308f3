pub use vidgen_core::config::ConfigError;
use vidgen_core::config::{parse_var, split_list};

/// Webhook gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Base URL of the API gateway, without a trailing slash.
    pub api_base_url: String,
    /// Timeout for each upstream call in seconds (default: `30`).
    pub upstream_timeout_secs: u64,
    /// Fixed estimate returned from `/webhook/generate` (default: `900`).
    pub estimated_secs: u64,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
}

impl WebhookConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `WEBHOOK_HOST`            | `0.0.0.0`                |
    /// | `WEBHOOK_PORT`            | `8080`                   |
    /// | `API_BASE_URL`            | `http://localhost:10000` |
    /// | `UPSTREAM_TIMEOUT_SECS`   | `30`                     |
    /// | `WEBHOOK_ESTIMATED_SECS`  | `900`                    |
    /// | `CORS_ORIGINS`            | `*`                      |
    /// | `REQUEST_TIMEOUT_SECS`    | `60`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("WEBHOOK_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_var(&lookup, "WEBHOOK_PORT", 8080u16)?;

        let raw_base = lookup("API_BASE_URL").unwrap_or_else(|| "http://localhost:10000".into());
        let api_base_url = raw_base.trim().trim_end_matches('/').to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError {
                var: "API_BASE_URL",
                value: raw_base,
                reason: "must be an http:// or https:// URL".into(),
            });
        }

        let upstream_timeout_secs = parse_var(&lookup, "UPSTREAM_TIMEOUT_SECS", 30u64)?;
        let estimated_secs = parse_var(&lookup, "WEBHOOK_ESTIMATED_SECS", 900u64)?;
        let cors_origins = split_list(&lookup("CORS_ORIGINS").unwrap_or_else(|| "*".into()));
        let request_timeout_secs = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 60u64)?;

        Ok(Self {
            host,
            port,
            api_base_url,
            upstream_timeout_secs,
            estimated_secs,
            cors_origins,
            request_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WebhookConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WebhookConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_base_url, "http://localhost:10000");
        assert_eq!(config.estimated_secs, 900);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = load(&[("API_BASE_URL", "https://video.example.com/")]).unwrap();
        assert_eq!(config.api_base_url, "https://video.example.com");
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        assert_matches!(
            load(&[("API_BASE_URL", "video.example.com")]),
            Err(ConfigError { var: "API_BASE_URL", .. })
        );
        assert_matches!(
            load(&[("WEBHOOK_PORT", "-1")]),
            Err(ConfigError { var: "WEBHOOK_PORT", .. })
        );
    }
}
