//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a valid
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Number of consecutive dates the multi-day search examines before giving up.
pub const SEARCH_HORIZON_DAYS: usize = 7;

/// Booking cadence used when a service has no interval of its own.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;

/// Bounds applied when validating a weekly schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleLimits {
    /// Shortest accepted working window.
    pub min_window_minutes: u32,
    /// Longest accepted working window (23 hours).
    pub max_window_minutes: u32,
    /// Maximum number of windows on one day.
    pub max_windows_per_day: usize,
}

impl Default for ScheduleLimits {
    fn default() -> Self {
        Self {
            min_window_minutes: 10,
            max_window_minutes: 1380,
            max_windows_per_day: 3,
        }
    }
}

impl ScheduleLimits {
    pub fn accepts_duration(&self, minutes: u32) -> bool {
        (self.min_window_minutes..=self.max_window_minutes).contains(&minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_interval_minutes: u32,
    pub limits: ScheduleLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            limits: ScheduleLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON document.
    ///
    /// # Errors
    /// Returns `EngineError::MalformedInput` if the document does not parse or
    /// the default interval is zero.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::MalformedInput(format!("config: {e}")))?;
        if config.default_interval_minutes == 0 {
            return Err(EngineError::MalformedInput(
                "config: default_interval_minutes must be positive".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.limits.max_windows_per_day, 3);
    }

    #[test]
    fn partial_limits_keep_other_defaults() {
        let config = EngineConfig::from_json(r#"{"limits":{"max_window_minutes":600}}"#).unwrap();
        assert_eq!(config.limits.max_window_minutes, 600);
        assert_eq!(config.limits.min_window_minutes, 10);
        assert_eq!(config.default_interval_minutes, 15);
    }

    #[test]
    fn zero_interval_rejected() {
        let err = EngineConfig::from_json(r#"{"default_interval_minutes":0}"#).unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput(_)));
    }
}
