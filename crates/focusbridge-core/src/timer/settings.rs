use serde::{Deserialize, Serialize};

use crate::error::Rejection;

pub const DEFAULT_WORK_SECS: u64 = 25 * 60;
pub const DEFAULT_SHORT_BREAK_SECS: u64 = 5 * 60;

/// Durations and policies for one focus cycle.
///
/// Immutable while a cycle runs; user edits replace the whole value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    /// Work interval length in seconds.
    pub work_duration_secs: u64,
    /// Short break length in seconds.
    pub short_break_duration_secs: u64,
    /// Whether the break countdown starts by itself after a work interval.
    pub auto_start_breaks: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration_secs: DEFAULT_WORK_SECS,
            short_break_duration_secs: DEFAULT_SHORT_BREAK_SECS,
            auto_start_breaks: true,
        }
    }
}

impl TimerSettings {
    pub fn new(work_duration_secs: u64, short_break_duration_secs: u64, auto_start_breaks: bool) -> Self {
        Self {
            work_duration_secs,
            short_break_duration_secs,
            auto_start_breaks,
        }
    }

    /// Both durations must be at least one second.
    pub fn validate(&self) -> Result<(), Rejection> {
        if self.work_duration_secs == 0 {
            return Err(Rejection::InvalidSettings {
                field: "work_duration_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.short_break_duration_secs == 0 {
            return Err(Rejection::InvalidSettings {
                field: "short_break_duration_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Merge `patch` onto these settings and validate the result.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<Self, Rejection> {
        let merged = Self {
            work_duration_secs: patch.work_duration_secs.unwrap_or(self.work_duration_secs),
            short_break_duration_secs: patch
                .short_break_duration_secs
                .unwrap_or(self.short_break_duration_secs),
            auto_start_breaks: patch.auto_start_breaks.unwrap_or(self.auto_start_breaks),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Partial settings update. `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_duration_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_break_duration_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_start_breaks: Option<bool>,
}

impl SettingsPatch {
    pub fn work(mut self, secs: u64) -> Self {
        self.work_duration_secs = Some(secs);
        self
    }

    pub fn short_break(mut self, secs: u64) -> Self {
        self.short_break_duration_secs = Some(secs);
        self
    }

    pub fn auto_start_breaks(mut self, enabled: bool) -> Self {
        self.auto_start_breaks = Some(enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_classic_pomodoro() {
        let settings = TimerSettings::default();
        assert_eq!(settings.work_duration_secs, 1500);
        assert_eq!(settings.short_break_duration_secs, 300);
        assert!(settings.auto_start_breaks);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let settings = TimerSettings::new(10, 5, true);
        let merged = settings
            .merged(&SettingsPatch::default().short_break(7))
            .unwrap();
        assert_eq!(merged, TimerSettings::new(10, 7, true));
    }

    #[test]
    fn zero_durations_are_rejected() {
        let settings = TimerSettings::default();
        assert!(matches!(
            settings.merged(&SettingsPatch::default().work(0)),
            Err(Rejection::InvalidSettings { .. })
        ));
        assert!(TimerSettings::new(1, 0, false).validate().is_err());
    }
}
