//! Central Configuration Constants
//!
//! Single source of truth for pipeline defaults.
//! Servers and CLIs read overrides from the environment and fall back here.

use std::str::FromStr;

use crate::error::{Error, Result};
use crate::logic::model::ThresholdConfig;

/// Default listen host for the ingestion server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port for the ingestion server
pub const DEFAULT_PORT: u16 = 5999;

/// Maximum bytes requested per socket read
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Readings per classification window (15 minutes at 1 Hz)
pub const DEFAULT_WINDOW_LEN: usize = 900;

/// Decision threshold for the 15 minute model
pub const DEFAULT_THRESHOLD: f32 = 0.10;

/// Longest newline-delimited reading accepted from a client
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// Assumed sampling period of a reading, used to name outputs by duration
pub const SAMPLE_PERIOD_SECS: usize = 1;

/// Column holding raw readings in ingestion records
pub const VALUES_COLUMN: &str = "values";

/// Column appended by the classifier
pub const LABEL_COLUMN: &str = "EV";

/// Required numeric column for classification input files
pub const GRID_COLUMN: &str = "grid";

/// Required numeric column for streamed replay files
pub const KW_COLUMN: &str = "kW";

/// Timestamp layout used in ingestion record names (day-month-year_hour-minute-second)
pub const SESSION_TIME_FORMAT: &str = "%d-%m-%Y_%H-%M-%S";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Parse a non-blank environment variable. Unset or blank gives `None`;
/// a value that does not parse is a configuration error.
pub fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Configuration(format!("{}={:?} is invalid: {}", name, raw, e))),
        _ => Ok(None),
    }
}

/// Get window length from environment or use default
pub fn get_window_len() -> Result<usize> {
    let window_len = parse_env("PLEXFLO_WINDOW_LEN")?.unwrap_or(DEFAULT_WINDOW_LEN);
    if window_len == 0 {
        return Err(Error::Configuration("PLEXFLO_WINDOW_LEN must be positive".to_string()));
    }
    Ok(window_len)
}

/// Get decision threshold from environment or use default
pub fn get_threshold() -> Result<ThresholdConfig> {
    match parse_env::<f32>("PLEXFLO_THRESHOLD")? {
        Some(threshold) => ThresholdConfig::try_new(threshold),
        None => Ok(ThresholdConfig::default()),
    }
}

/// Default classified-file name derived from the window duration
pub fn default_predictions_name(window_len: usize) -> String {
    let minutes = window_len * SAMPLE_PERIOD_SECS / 60;
    format!("predictions_{}_min.csv", minutes)
}
