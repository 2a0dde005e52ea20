use serde::{Deserialize, Serialize};

/// The three decision tiers a confidence score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    /// Below the low cutpoint: no actionable signal.
    None,
}

/// Configurable cutpoints separating the three confidence tiers.
///
/// Invariant: `high > medium > low > 0.0` and all three `<= 1.0`. Construct
/// via [`ConfidenceThresholds::new`], which enforces the invariant, rather
/// than building the struct literal directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.9,
            medium: 0.5,
            low: 0.3,
        }
    }
}

impl ConfidenceThresholds {
    pub fn new(high: f64, medium: f64, low: f64) -> Result<Self, crate::Error> {
        let thresholds = Self { high, medium, low };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(self.high) || !in_range(self.medium) || !in_range(self.low) {
            return Err(crate::Error::InvalidConfidenceThresholds {
                reason: "thresholds must lie in [0.0, 1.0]".into(),
            });
        }
        if !(self.high > self.medium && self.medium > self.low && self.low > 0.0) {
            return Err(crate::Error::InvalidConfidenceThresholds {
                reason: "thresholds must satisfy high > medium > low > 0.0".into(),
            });
        }
        Ok(())
    }

    pub fn tier(&self, confidence: f64) -> ConfidenceTier {
        if confidence >= self.high {
            ConfidenceTier::High
        } else if confidence >= self.medium {
            ConfidenceTier::Medium
        } else if confidence >= self.low {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_are_valid() {
        ConfidenceThresholds::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_order_thresholds() {
        assert!(ConfidenceThresholds::new(0.5, 0.9, 0.3).is_err());
    }

    #[test]
    fn rejects_zero_low() {
        assert!(ConfidenceThresholds::new(0.9, 0.5, 0.0).is_err());
    }

    #[test]
    fn tiers_boundaries_are_inclusive_at_cutpoint() {
        let t = ConfidenceThresholds::default();
        assert_eq!(t.tier(0.9), ConfidenceTier::High);
        assert_eq!(t.tier(0.5), ConfidenceTier::Medium);
        assert_eq!(t.tier(0.3), ConfidenceTier::Low);
        assert_eq!(t.tier(0.1), ConfidenceTier::None);
    }
}
