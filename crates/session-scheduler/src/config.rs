//! Tunable engine policy.
//!
//! The expansion ceiling and the rollover probe are engine policy rather than
//! part of any request, so they live here and can be loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{Result, ScheduleError};

/// Default ceiling on occurrences generated from one template.
pub const DEFAULT_MAX_OCCURRENCES: u32 = 500;

/// Default ROLLOVER probe step, in local calendar days.
pub const DEFAULT_ROLLOVER_STEP_DAYS: u32 = 1;

/// Default number of ROLLOVER probes (one per day of a week).
pub const DEFAULT_ROLLOVER_ATTEMPTS: u32 = 7;

/// Engine configuration.
///
/// Missing fields take their defaults, so `{}` is a valid config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Hard cap on occurrences per template, applied even when the rule has
    /// its own bound.
    pub max_occurrences: u32,
    /// How far each ROLLOVER probe moves a conflicting occurrence.
    pub rollover_step_days: u32,
    /// How many probes ROLLOVER makes before giving up. Zero makes ROLLOVER
    /// behave like SKIP.
    pub rollover_attempts: u32,
    /// What to do with local times that fall into a DST gap.
    pub dst_policy: DstPolicy,
    /// Treat instances accepted for earlier templates of the same request as
    /// commitments of later templates. Off: templates only see the conflict
    /// check.
    pub hold_earlier_templates: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            rollover_step_days: DEFAULT_ROLLOVER_STEP_DAYS,
            rollover_attempts: DEFAULT_ROLLOVER_ATTEMPTS,
            dst_policy: DstPolicy::default(),
            hold_earlier_templates: false,
        }
    }
}

impl SchedulerConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SchedulerConfig = serde_json::from_str(json)
            .map_err(|e| ScheduleError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_occurrences == 0 {
            return Err(ScheduleError::InvalidConfig(
                "maxOccurrences must be at least 1".to_string(),
            ));
        }
        if self.rollover_step_days == 0 {
            return Err(ScheduleError::InvalidConfig(
                "rolloverStepDays must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SchedulerConfig::from_json("{}").unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.max_occurrences, 500);
        assert_eq!(config.rollover_attempts, 7);
        assert!(!config.hold_earlier_templates);
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config =
            SchedulerConfig::from_json(r#"{"rolloverAttempts": 3, "dstPolicy": "skip"}"#).unwrap();
        assert_eq!(config.rollover_attempts, 3);
        assert_eq!(config.dst_policy, DstPolicy::Skip);
        assert_eq!(config.rollover_step_days, DEFAULT_ROLLOVER_STEP_DAYS);
    }

    #[test]
    fn holding_earlier_templates_is_opt_in() {
        let config = SchedulerConfig::from_json(r#"{"holdEarlierTemplates": true}"#).unwrap();
        assert!(config.hold_earlier_templates);
    }

    #[test]
    fn zero_ceiling_is_rejected() {
        let err = SchedulerConfig::from_json(r#"{"maxOccurrences": 0}"#).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidConfig(_)));
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(SchedulerConfig::from_json(r#"{"rolloverStepDays": 0}"#).is_err());
    }
}
