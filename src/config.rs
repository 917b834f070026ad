//! Engine configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tunables for a rotation run.
///
/// Deserializes with defaults for any missing field, so a consumer can
/// store only the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Fixed epoch for the elapsed-qualifying-day seed fallback.
    pub epoch: NaiveDate,
    /// Skip scans visit at most `skip_scan_factor × roster length` slots.
    pub skip_scan_factor: usize,
    /// Qualifying normal days passed over after a missing period ends
    /// before a returning person may be reinserted.
    pub reinsertion_grace_days: usize,
    /// Whether swap partners may be taken from the following month.
    pub cross_month_swaps: bool,
    /// Keep already-committed finals inside the run range as anchors.
    pub preserve_existing: bool,
}

impl RotationConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the seed fallback epoch.
    pub fn with_epoch(mut self, epoch: NaiveDate) -> Self {
        self.epoch = epoch;
        self
    }

    /// Sets the skip scan bound (multiples of the roster length, min 1).
    pub fn with_skip_scan_factor(mut self, factor: usize) -> Self {
        self.skip_scan_factor = factor.max(1);
        self
    }

    /// Sets the reinsertion grace period in qualifying normal days.
    pub fn with_reinsertion_grace_days(mut self, days: usize) -> Self {
        self.reinsertion_grace_days = days;
        self
    }

    /// Enables or disables cross-month swap partners.
    pub fn with_cross_month_swaps(mut self, enabled: bool) -> Self {
        self.cross_month_swaps = enabled;
        self
    }

    /// Enables or disables preservation of committed finals.
    pub fn with_preserve_existing(mut self, enabled: bool) -> Self {
        self.preserve_existing = enabled;
        self
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            epoch: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            skip_scan_factor: 2,
            reinsertion_grace_days: 3,
            cross_month_swaps: true,
            preserve_existing: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = RotationConfig::default();
        assert_eq!(c.epoch, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(c.skip_scan_factor, 2);
        assert_eq!(c.reinsertion_grace_days, 3);
        assert!(c.cross_month_swaps);
        assert!(!c.preserve_existing);
    }

    #[test]
    fn test_builder() {
        let c = RotationConfig::new()
            .with_skip_scan_factor(0)
            .with_reinsertion_grace_days(5)
            .with_cross_month_swaps(false)
            .with_preserve_existing(true);
        assert_eq!(c.skip_scan_factor, 1);
        assert_eq!(c.reinsertion_grace_days, 5);
        assert!(!c.cross_month_swaps);
        assert!(c.preserve_existing);
    }

    #[test]
    fn test_partial_deserialize() {
        let c: RotationConfig =
            serde_json::from_str(r#"{ "reinsertion_grace_days": 4 }"#).unwrap();
        assert_eq!(c.reinsertion_grace_days, 4);
        assert_eq!(c.skip_scan_factor, 2);
    }
}
