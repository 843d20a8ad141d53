//! Good / needs-improvement / poor classification of metric values

use serde::{Deserialize, Serialize};

use crate::error::PerfPanelError;

/// Rating of a single metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs-improvement",
            Rating::Poor => "poor",
        }
    }
}

/// Upper bounds for "good" and "needs improvement"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub good: f64,
    pub poor: f64,
}

impl Threshold {
    pub const fn new(good: f64, poor: f64) -> Self {
        Self { good, poor }
    }

    pub fn rate(&self, value: f64) -> Rating {
        if value <= self.good {
            Rating::Good
        } else if value <= self.poor {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }

    fn validate(&self, metric: &str) -> Result<(), PerfPanelError> {
        let usable = self.good.is_finite() && self.poor.is_finite() && self.good >= 0.0;
        if !usable || self.good > self.poor {
            return Err(PerfPanelError::Config(format!(
                "{} thresholds must satisfy 0 <= good <= poor, got good={} poor={}",
                metric, self.good, self.poor
            )));
        }
        Ok(())
    }
}

/// Per-metric thresholds (defaults follow the published Web Vitals boundaries)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingThresholds {
    #[serde(default = "default_fcp")]
    pub fcp: Threshold,
    #[serde(default = "default_lcp")]
    pub lcp: Threshold,
    #[serde(default = "default_cls")]
    pub cls: Threshold,
    #[serde(default = "default_tbt")]
    pub tbt: Threshold,
}

fn default_fcp() -> Threshold {
    Threshold::new(1800.0, 3000.0)
}

fn default_lcp() -> Threshold {
    Threshold::new(2500.0, 4000.0)
}

fn default_cls() -> Threshold {
    Threshold::new(0.1, 0.25)
}

fn default_tbt() -> Threshold {
    Threshold::new(200.0, 600.0)
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            fcp: default_fcp(),
            lcp: default_lcp(),
            cls: default_cls(),
            tbt: default_tbt(),
        }
    }
}

impl RatingThresholds {
    pub fn validate(&self) -> Result<(), PerfPanelError> {
        self.fcp.validate("fcp")?;
        self.lcp.validate("lcp")?;
        self.cls.validate("cls")?;
        self.tbt.validate("tbt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_boundaries_are_inclusive() {
        let threshold = Threshold::new(2500.0, 4000.0);
        assert_eq!(threshold.rate(0.0), Rating::Good);
        assert_eq!(threshold.rate(2500.0), Rating::Good);
        assert_eq!(threshold.rate(2500.1), Rating::NeedsImprovement);
        assert_eq!(threshold.rate(4000.0), Rating::NeedsImprovement);
        assert_eq!(threshold.rate(4000.1), Rating::Poor);
    }

    #[test]
    fn test_default_cls_thresholds() {
        let thresholds = RatingThresholds::default();
        assert_eq!(thresholds.cls.rate(0.05), Rating::Good);
        assert_eq!(thresholds.cls.rate(0.2), Rating::NeedsImprovement);
        assert_eq!(thresholds.cls.rate(0.3), Rating::Poor);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let thresholds = RatingThresholds {
            tbt: Threshold::new(600.0, 200.0),
            ..RatingThresholds::default()
        };
        assert!(thresholds.validate().is_err());
        assert!(RatingThresholds::default().validate().is_ok());
    }

    #[test]
    fn test_rating_strings() {
        assert_eq!(Rating::Good.as_str(), "good");
        assert_eq!(Rating::NeedsImprovement.as_str(), "needs-improvement");
        assert_eq!(
            serde_json::to_string(&Rating::NeedsImprovement).unwrap(),
            r#""needs-improvement""#
        );
    }
}
