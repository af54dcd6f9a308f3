use std::path::PathBuf;

pub use vidgen_core::config::ConfigError;
use vidgen_core::config::{parse_var, require_positive, split_list};
use vidgen_core::estimation::DEFAULT_SECONDS_PER_STEP;
use vidgen_worker::dispatcher::DEFAULT_WORKERS;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `10000`).
    pub port: u16,
    /// Allowed CORS origins from the comma-separated `CORS_ORIGINS`.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Number of background workers (default: `2`).
    pub max_workers: usize,
    /// Simultaneous engine invocations (default: same as `max_workers`).
    pub engine_concurrency: usize,
    /// Directory holding finished videos (default: `./results`).
    pub save_path: PathBuf,
    /// Model weights directory (default: `./ckpts`).
    pub model_base: PathBuf,
    /// Program run once per job.
    pub engine_command: String,
    /// Whitespace-separated arguments passed to `engine_command`.
    pub engine_args: Vec<String>,
    /// Per-step factor of the static job estimate (default: `20`).
    pub seconds_per_step: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `10000`                 |
    /// | `CORS_ORIGINS`         | `*`                     |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `MAX_WORKERS`          | `2`                     |
    /// | `ENGINE_CONCURRENCY`   | value of `MAX_WORKERS`  |
    /// | `SAVE_PATH`            | `./results`             |
    /// | `MODEL_BASE`           | `./ckpts`               |
    /// | `ENGINE_COMMAND`       | `vidgen-render`         |
    /// | `ENGINE_ARGS`          | (empty)                 |
    /// | `SECONDS_PER_STEP`     | `20`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_var(&lookup, "PORT", 10000u16)?;

        let cors_origins = split_list(&lookup("CORS_ORIGINS").unwrap_or_else(|| "*".into()));

        let request_timeout_secs = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;

        let max_workers = require_positive(
            "MAX_WORKERS",
            parse_var(&lookup, "MAX_WORKERS", DEFAULT_WORKERS)?,
        )?;
        let engine_concurrency = require_positive(
            "ENGINE_CONCURRENCY",
            parse_var(&lookup, "ENGINE_CONCURRENCY", max_workers)?,
        )?;

        let save_path = lookup("SAVE_PATH").unwrap_or_else(|| "./results".into());
        let model_base = lookup("MODEL_BASE").unwrap_or_else(|| "./ckpts".into());
        let engine_command = lookup("ENGINE_COMMAND").unwrap_or_else(|| "vidgen-render".into());
        let engine_args = lookup("ENGINE_ARGS")
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let seconds_per_step = parse_var(&lookup, "SECONDS_PER_STEP", DEFAULT_SECONDS_PER_STEP)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_workers,
            engine_concurrency,
            save_path: save_path.into(),
            model_base: model_base.into(),
            engine_command,
            engine_args,
            seconds_per_step,
        })
    }

    /// Scratch directory for engine output that is not yet stored.
    pub fn work_dir(&self) -> PathBuf {
        self.save_path.join(".partial")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 10000);
        assert_eq!(config.cors_origins, vec!["*"]);
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.engine_concurrency, 2);
        assert_eq!(config.save_path, PathBuf::from("./results"));
        assert_eq!(config.seconds_per_step, 20);
        assert!(config.engine_args.is_empty());
    }

    #[test]
    fn engine_concurrency_follows_worker_count() {
        let config = load(&[("MAX_WORKERS", "4")]).unwrap();
        assert_eq!(config.engine_concurrency, 4);

        let config = load(&[("MAX_WORKERS", "4"), ("ENGINE_CONCURRENCY", "1")]).unwrap();
        assert_eq!(config.engine_concurrency, 1);
    }

    #[test]
    fn lists_are_split() {
        let config = load(&[
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("ENGINE_ARGS", "render.py  --cpu"),
        ])
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.engine_args, vec!["render.py", "--cpu"]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_matches!(load(&[("PORT", "eighty")]), Err(ConfigError { var: "PORT", .. }));
        assert_matches!(
            load(&[("MAX_WORKERS", "0")]),
            Err(ConfigError { var: "MAX_WORKERS", .. })
        );
        assert_matches!(
            load(&[("SECONDS_PER_STEP", "-1")]),
            Err(ConfigError { var: "SECONDS_PER_STEP", .. })
        );
    }
}
