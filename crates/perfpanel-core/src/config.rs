//! Widget configuration
//!
//! Configuration can be written as TOML or passed from JavaScript as a plain
//! object. Every field has a default, so an empty document is valid.
//!
//! ```toml
//! title = "Page performance"
//! blocking_threshold_ms = 50.0
//! include_buffered = true
//! lcp_policy = "stop_on_interaction"
//! scan_on_every_update = false
//!
//! [thresholds.lcp]
//! good = 2500.0
//! poor = 4000.0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PerfPanelError;
use crate::rating::RatingThresholds;

/// Long tasks shorter than this never block input
pub const DEFAULT_BLOCKING_THRESHOLD_MS: f64 = 50.0;

/// When the largest-contentful-paint candidate stops updating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LcpPolicy {
    /// First click, key press or scroll (or the page being hidden) finalizes LCP
    #[default]
    StopOnInteraction,
    /// Only the page being hidden finalizes LCP
    StopOnHidden,
    /// LCP keeps updating until teardown
    Never,
}

impl LcpPolicy {
    pub fn stops_on_interaction(&self) -> bool {
        matches!(self, LcpPolicy::StopOnInteraction)
    }

    pub fn stops_on_hidden(&self) -> bool {
        matches!(self, LcpPolicy::StopOnInteraction | LcpPolicy::StopOnHidden)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Heading shown on the panel
    #[serde(default = "default_title")]
    pub title: String,
    /// Portion of each long task above this counts toward TBT (default: 50)
    #[serde(default = "default_blocking_threshold_ms")]
    pub blocking_threshold_ms: f64,
    /// Ask the platform to replay entries recorded before subscription
    #[serde(default = "default_include_buffered")]
    pub include_buffered: bool,
    #[serde(default)]
    pub lcp_policy: LcpPolicy,
    /// Rescan resources on every update instead of only on request
    #[serde(default)]
    pub scan_on_every_update: bool,
    #[serde(default)]
    pub thresholds: RatingThresholds,
}

fn default_title() -> String {
    "Performance".to_string()
}

fn default_blocking_threshold_ms() -> f64 {
    DEFAULT_BLOCKING_THRESHOLD_MS
}

fn default_include_buffered() -> bool {
    true
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            blocking_threshold_ms: default_blocking_threshold_ms(),
            include_buffered: default_include_buffered(),
            lcp_policy: LcpPolicy::default(),
            scan_on_every_update: false,
            thresholds: RatingThresholds::default(),
        }
    }
}

impl PanelConfig {
    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns [`PerfPanelError::Config`] if the TOML is malformed or a value
    /// fails validation
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, PerfPanelError> {
        let config: PanelConfig =
            toml::from_str(s).map_err(|e| PerfPanelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from JSON
    pub fn from_json(s: &str) -> Result<Self, PerfPanelError> {
        let config: PanelConfig =
            serde_json::from_str(s).map_err(|e| PerfPanelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every numeric setting is usable
    pub fn validate(&self) -> Result<(), PerfPanelError> {
        if !self.blocking_threshold_ms.is_finite() || self.blocking_threshold_ms < 0.0 {
            return Err(PerfPanelError::Config(format!(
                "blocking_threshold_ms must be a non-negative number, got {}",
                self.blocking_threshold_ms
            )));
        }
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PanelConfig::from_str("").unwrap();
        assert_eq!(config, PanelConfig::default());
        assert_eq!(config.blocking_threshold_ms, 50.0);
        assert!(config.include_buffered);
        assert_eq!(config.lcp_policy, LcpPolicy::StopOnInteraction);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            title = "Perf"
            blocking_threshold_ms = 30.0
            include_buffered = false
            lcp_policy = "stop_on_hidden"
            scan_on_every_update = true

            [thresholds.cls]
            good = 0.05
            poor = 0.2
        "#;
        let config = PanelConfig::from_str(toml).unwrap();
        assert_eq!(config.title, "Perf");
        assert_eq!(config.blocking_threshold_ms, 30.0);
        assert!(!config.include_buffered);
        assert_eq!(config.lcp_policy, LcpPolicy::StopOnHidden);
        assert!(config.scan_on_every_update);
        assert_eq!(config.thresholds.cls.good, 0.05);
        // Unspecified thresholds keep their defaults
        assert_eq!(config.thresholds.lcp.good, 2500.0);
    }

    #[test]
    fn test_parse_json_config() {
        let config = PanelConfig::from_json(r#"{"lcp_policy":"never"}"#).unwrap();
        assert_eq!(config.lcp_policy, LcpPolicy::Never);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let err = PanelConfig::from_str("blocking_threshold_ms = -5.0").unwrap_err();
        assert!(matches!(err, PerfPanelError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = PanelConfig::from_str("title = ").unwrap_err();
        assert!(matches!(err, PerfPanelError::Config(_)));
    }

    #[test]
    fn test_policy_flags() {
        assert!(LcpPolicy::StopOnInteraction.stops_on_interaction());
        assert!(LcpPolicy::StopOnInteraction.stops_on_hidden());
        assert!(!LcpPolicy::StopOnHidden.stops_on_interaction());
        assert!(LcpPolicy::StopOnHidden.stops_on_hidden());
        assert!(!LcpPolicy::Never.stops_on_interaction());
        assert!(!LcpPolicy::Never.stops_on_hidden());
    }
}
