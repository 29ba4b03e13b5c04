//! Configuration module

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use plexflo_core::constants::{
    get_threshold, get_window_len, parse_env, DEFAULT_CHUNK_SIZE, DEFAULT_HOST,
    DEFAULT_MAX_LINE_LEN, DEFAULT_PORT,
};
use plexflo_core::{Backfill, ClassifierConfig, Error, Result};

use crate::collector::{CollectorConfig, ErrorPolicy, Framing};
use crate::server::{DrainPolicy, DEFAULT_DRAIN_TIMEOUT_SECS};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen host
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Per-connection read settings
    pub collector: CollectorConfig,

    /// What happens to in-flight handlers on shutdown
    pub drain: DrainPolicy,

    /// Directory ingestion records are written to
    pub output_dir: PathBuf,

    /// ONNX model; ingestion-only when unset
    pub model_path: Option<PathBuf>,

    /// Expected SHA-256 of the model file
    pub model_sha256: Option<String>,

    /// Window, threshold and back-fill settings
    pub classifier: ClassifierConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            collector: CollectorConfig::default(),
            drain: DrainPolicy::Abandon,
            output_dir: PathBuf::from("."),
            model_path: None,
            model_sha256: None,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to defaults; set but invalid values are a
    /// configuration error.
    pub fn from_env() -> Result<Self> {
        let drain = match parse_env::<DrainPolicy>("PLEXFLO_DRAIN")? {
            Some(DrainPolicy::Join { .. }) => DrainPolicy::Join {
                timeout: Duration::from_secs(
                    parse_env("PLEXFLO_DRAIN_TIMEOUT_SECS")?.unwrap_or(DEFAULT_DRAIN_TIMEOUT_SECS),
                ),
            },
            Some(DrainPolicy::Abandon) | None => DrainPolicy::Abandon,
        };

        let chunk_size: usize = parse_env("PLEXFLO_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(Error::Configuration("PLEXFLO_CHUNK_SIZE must be positive".to_string()));
        }

        let max_line_len: usize =
            parse_env("PLEXFLO_MAX_LINE_LEN")?.unwrap_or(DEFAULT_MAX_LINE_LEN);
        if max_line_len == 0 {
            return Err(Error::Configuration("PLEXFLO_MAX_LINE_LEN must be positive".to_string()));
        }

        let read_timeout = match parse_env::<u64>("PLEXFLO_READ_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(Error::Configuration(
                    "PLEXFLO_READ_TIMEOUT_SECS must be positive; leave it unset to wait forever"
                        .to_string(),
                ))
            }
            secs => secs.map(Duration::from_secs),
        };

        Ok(Self {
            host: var("PLEXFLO_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),

            port: parse_env("PLEXFLO_PORT")?.unwrap_or(DEFAULT_PORT),

            collector: CollectorConfig {
                chunk_size,
                framing: parse_env::<Framing>("PLEXFLO_FRAMING")?.unwrap_or_default(),
                max_line_len,
                error_policy: parse_env::<ErrorPolicy>("PLEXFLO_ERROR_POLICY")?.unwrap_or_default(),
                read_timeout,
            },

            drain,

            output_dir: var("PLEXFLO_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),

            model_path: var("PLEXFLO_MODEL_PATH").map(PathBuf::from),

            model_sha256: var("PLEXFLO_MODEL_SHA256"),

            classifier: ClassifierConfig {
                window_len: get_window_len()?,
                threshold: get_threshold()?,
                backfill: parse_env::<Backfill>("PLEXFLO_BACKFILL")?.unwrap_or_default(),
            },
        })
    }

    /// `host:port` as given; name resolution happens at bind time
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Non-empty environment variable
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listen_addr() {
        assert_eq!(Config::default().listen_addr(), "127.0.0.1:5999");
    }

    // One test owns the PLEXFLO_* variables so parallel tests never race on them.
    #[test]
    fn test_from_env_validation() {
        let vars = [
            "PLEXFLO_THRESHOLD",
            "PLEXFLO_READ_TIMEOUT_SECS",
            "PLEXFLO_DRAIN",
            "PLEXFLO_WINDOW_LEN",
        ];
        for name in vars {
            std::env::remove_var(name);
        }

        for bad in ["-5", "0", "NaN", "inf"] {
            std::env::set_var("PLEXFLO_THRESHOLD", bad);
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "threshold {}", bad);
        }
        std::env::set_var("PLEXFLO_THRESHOLD", "0.25");
        assert_eq!(Config::from_env().unwrap().classifier.threshold.threshold, 0.25);
        std::env::remove_var("PLEXFLO_THRESHOLD");

        std::env::set_var("PLEXFLO_READ_TIMEOUT_SECS", "0");
        assert!(matches!(Config::from_env(), Err(Error::Configuration(_))));
        std::env::set_var("PLEXFLO_READ_TIMEOUT_SECS", "30");
        assert_eq!(
            Config::from_env().unwrap().collector.read_timeout,
            Some(Duration::from_secs(30))
        );
        std::env::remove_var("PLEXFLO_READ_TIMEOUT_SECS");

        std::env::set_var("PLEXFLO_WINDOW_LEN", "abc");
        assert!(matches!(Config::from_env(), Err(Error::Configuration(_))));
        std::env::remove_var("PLEXFLO_WINDOW_LEN");

        std::env::set_var("PLEXFLO_DRAIN", "JOIN");
        assert_eq!(
            Config::from_env().unwrap().drain,
            DrainPolicy::Join {
                timeout: Duration::from_secs(DEFAULT_DRAIN_TIMEOUT_SECS)
            }
        );
        std::env::set_var("PLEXFLO_DRAIN", "later");
        assert!(matches!(Config::from_env(), Err(Error::Configuration(_))));
        std::env::remove_var("PLEXFLO_DRAIN");
    }

    #[test]
    fn test_defaults_preserve_observed_behavior() {
        let config = Config::default();
        assert_eq!(config.collector.framing, Framing::Chunk);
        assert_eq!(config.collector.error_policy, ErrorPolicy::Discard);
        assert_eq!(config.collector.chunk_size, 1024);
        assert!(config.collector.read_timeout.is_none());
        assert_eq!(config.drain, DrainPolicy::Abandon);
        assert_eq!(config.classifier.backfill, Backfill::Inclusive);
    }
}
