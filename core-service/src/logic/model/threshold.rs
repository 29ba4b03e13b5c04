//! Decision Threshold
//!
//! Turns a continuous window score into a binary charging label.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_THRESHOLD;
use crate::error::{Error, Result};

/// Binary EV charging flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Idle = 0,
    Charging = 1,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Threshold Configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Scores strictly above this are labeled charging
    pub threshold: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Build a validated threshold
    pub fn try_new(threshold: f32) -> Result<Self> {
        let config = Self::new(threshold);
        config.validate()?;
        Ok(config)
    }

    /// The threshold must be finite and positive
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(Error::Configuration(format!(
                "Threshold must be a finite positive number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Strict comparison: a score equal to the threshold is idle
    pub fn decide(&self, score: f32) -> Label {
        if score > self.threshold {
            Label::Charging
        } else {
            Label::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_config() {
        let config = ThresholdConfig::default();
        assert_eq!(config.threshold, 0.10);
    }

    #[test]
    fn test_decision_is_strict() {
        let config = ThresholdConfig::default();
        assert_eq!(config.decide(0.05), Label::Idle);
        assert_eq!(config.decide(0.10), Label::Idle);
        assert_eq!(config.decide(0.1001), Label::Charging);
        assert_eq!(config.decide(0.9), Label::Charging);
    }

    #[test]
    fn test_threshold_must_be_finite_and_positive() {
        assert!(ThresholdConfig::try_new(0.10).is_ok());
        for bad in [f32::NAN, f32::INFINITY, -5.0, 0.0] {
            assert!(matches!(
                ThresholdConfig::try_new(bad),
                Err(Error::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::Idle.to_string(), "0");
        assert_eq!(Label::Charging.to_string(), "1");
    }
}
