//! Belief propagation configuration.
//!
//! A configuration is set once before a query starts and is read-only while
//! it runs; every query owns its own copy.

use serde::{Deserialize, Serialize};

use crate::error::{LbpError, Result};

/// Order in which iterated message values are refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateSchedule {
    /// Every message of a sweep is computed from the previous sweep's values.
    #[default]
    Synchronous,
    /// Messages are updated in place, later messages of a sweep seeing the
    /// values computed earlier in the same sweep. Meant for models without
    /// loops, where cycles are only an artifact of individual-based recursion.
    AsynchronousCycleDetecting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbpConfig {
    pub update_schedule: UpdateSchedule,
    /// Upper bound on the number of sweeps over iterated messages.
    pub max_iterations: usize,
    /// Skip computing the incoming message of a random variable whose value
    /// is already forced by the summand.
    pub use_singleton_relevant_range_heuristic: bool,
    /// Stop multiplying factor messages once the messages so far force the
    /// value of the random variable. Never changes a normalized belief.
    pub use_forced_message_shortcut: bool,
    /// Decimal places iterated message values are rounded to between sweeps.
    /// `None` keeps exact values, whose size can grow with every sweep.
    pub message_value_precision: Option<u32>,
}

impl Default for LbpConfig {
    fn default() -> Self {
        Self {
            update_schedule: UpdateSchedule::Synchronous,
            max_iterations: 10,
            use_singleton_relevant_range_heuristic: true,
            use_forced_message_shortcut: true,
            message_value_precision: Some(12),
        }
    }
}

impl LbpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_update_schedule(mut self, schedule: UpdateSchedule) -> Self {
        self.update_schedule = schedule;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_singleton_relevant_range_heuristic(mut self, enabled: bool) -> Self {
        self.use_singleton_relevant_range_heuristic = enabled;
        self
    }

    pub fn with_forced_message_shortcut(mut self, enabled: bool) -> Self {
        self.use_forced_message_shortcut = enabled;
        self
    }

    pub fn with_message_value_precision(mut self, places: Option<u32>) -> Self {
        self.message_value_precision = places;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(LbpError::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration; missing fields take their
    /// default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LbpConfig = serde_json::from_str(json)
            .map_err(|e| LbpError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LbpError::InvalidConfiguration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LbpConfig::default();
        assert_eq!(config.update_schedule, UpdateSchedule::Synchronous);
        assert_eq!(config.max_iterations, 10);
        assert!(config.use_singleton_relevant_range_heuristic);
        assert!(config.use_forced_message_shortcut);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            LbpConfig::from_json_str(r#"{ "update_schedule": "AsynchronousCycleDetecting" }"#)
                .unwrap();
        assert_eq!(
            config.update_schedule,
            UpdateSchedule::AsynchronousCycleDetecting
        );
        assert_eq!(config.max_iterations, 10);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = LbpConfig::new()
            .with_max_iterations(3)
            .with_singleton_relevant_range_heuristic(false)
            .with_forced_message_shortcut(false)
            .with_message_value_precision(None);
        let json = config.to_json_string().unwrap();
        assert_eq!(LbpConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = LbpConfig::from_json_str(r#"{ "max_iterations": 0 }"#).unwrap_err();
        assert!(matches!(err, LbpError::InvalidConfiguration(_)));
        assert!(LbpConfig::from_json_str("{ not json").is_err());
    }
}
