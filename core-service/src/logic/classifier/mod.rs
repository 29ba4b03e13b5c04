//! Sequence Classifier - windowed EV charging detection
//!
//! Splits an ordered series into non-overlapping windows of `window_len`
//! readings aligned at index 0, scores each window, thresholds the score and
//! back-fills the label onto the readings the window covers. The remainder
//! shorter than one window is never scored.

#[cfg(test)]
mod tests;

use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_WINDOW_LEN;
use crate::error::{Error, Result};
use crate::logic::model::{Label, ThresholdConfig, WindowScorer};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Which readings receive a window's label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backfill {
    /// `[k - W, k]`: also writes the first reading of the next window, which
    /// that window then overwrites. Matches the historical datasets.
    #[default]
    Inclusive,
    /// `[k - W, k)`: exactly the window's own readings
    Exclusive,
}

impl FromStr for Backfill {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inclusive" => Ok(Backfill::Inclusive),
            "exclusive" => Ok(Backfill::Exclusive),
            other => Err(Error::Configuration(format!("Unknown backfill policy: {}", other))),
        }
    }
}

/// Classifier Configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Readings per window
    pub window_len: usize,

    /// Score decision
    pub threshold: ThresholdConfig,

    /// Label back-fill range
    pub backfill: Backfill,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            threshold: ThresholdConfig::default(),
            backfill: Backfill::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn with_window_len(window_len: usize) -> Self {
        Self {
            window_len,
            ..Default::default()
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Score and label of one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    /// First reading of the window
    pub start: usize,
    /// One past the last reading of the window
    pub end: usize,
    pub score: f32,
    pub label: Label,
}

/// Per-reading labels plus per-window scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// One entry per input reading; `None` for readings no window labeled
    pub labels: Vec<Option<Label>>,
    pub windows: Vec<WindowResult>,
}

impl Classification {
    pub fn labeled_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }

    pub fn charging_windows(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| w.label == Label::Charging)
            .count()
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Window boundaries `[k - W, k)` for `k = W, 2W, ...` while `k <= n`
pub fn window_ranges(n: usize, window_len: usize) -> impl Iterator<Item = Range<usize>> {
    let count = if window_len == 0 { 0 } else { n / window_len };
    (1..=count).map(move |i| (i - 1) * window_len..i * window_len)
}

/// Classify an ordered series.
///
/// Fails with a validation error, before any scoring, when the series is
/// shorter than one window, and with a configuration error when the
/// threshold is not a finite positive number. A scoring failure aborts the whole call.
pub fn classify(
    series: &[f32],
    scorer: &dyn WindowScorer,
    config: &ClassifierConfig,
) -> Result<Classification> {
    let window_len = config.window_len;

    if window_len == 0 {
        return Err(Error::Configuration("Window length must be positive".to_string()));
    }
    config.threshold.validate()?;
    if scorer.window_len() != window_len {
        return Err(Error::Configuration(format!(
            "Scorer {} expects windows of {}, classifier configured for {}",
            scorer.name(),
            scorer.window_len(),
            window_len
        )));
    }
    if series.is_empty() {
        return Err(Error::Validation("Series is empty".to_string()));
    }
    if series.len() < window_len {
        return Err(Error::Validation(format!(
            "Series too short for classification: {} readings, window is {}",
            series.len(),
            window_len
        )));
    }

    let n = series.len();
    let mut labels: Vec<Option<Label>> = vec![None; n];
    let mut windows = Vec::with_capacity(n / window_len);

    for range in window_ranges(n, window_len) {
        let score = scorer.score(&series[range.clone()])?;
        let label = config.threshold.decide(score);

        let fill_end = match config.backfill {
            Backfill::Inclusive => (range.end + 1).min(n),
            Backfill::Exclusive => range.end,
        };
        labels[range.start..fill_end].fill(Some(label));

        log::debug!(
            "Window [{}, {}) scored {:.4} -> {}",
            range.start,
            range.end,
            score,
            label
        );

        windows.push(WindowResult {
            start: range.start,
            end: range.end,
            score,
            label,
        });
    }

    Ok(Classification { labels, windows })
}
