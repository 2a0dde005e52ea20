//! Configuration surface for the bandaid validation pipeline.
//!
//! ```rust
//! use bandaid_config::PipelineConfig;
//!
//! let cfg = PipelineConfig::default();
//! assert!(cfg.validate().is_ok());
//! assert!(cfg.is_kind_enabled(bandaid_core::ThreatKind::Pii, cfg.checks.ner));
//! ```

mod error;

pub use error::ConfigError;

use bandaid_core::{ConfidenceThresholds, ThreatKind};
use serde::{Deserialize, Serialize};

/// Inference device target, mirroring the original `Literal["cpu", "cuda",
/// "mps", "auto"]` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelDevice {
    Cpu,
    Cuda,
    Mps,
    Auto,
}

impl Default for ModelDevice {
    fn default() -> Self {
        ModelDevice::Cpu
    }
}

/// Per-layer enable/disable toggles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    pub ner: bool,
    pub guard: bool,
    pub regex: bool,
    pub seed_phrase: bool,
    pub embeddings: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            ner: true,
            guard: true,
            regex: true,
            seed_phrase: true,
            embeddings: true,
        }
    }
}

/// Policy Classifier deadline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub timeout_seconds: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { timeout_seconds: 2.0 }
    }
}

/// Redaction behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub placeholder: String,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            placeholder: "[REDACTED]".to_string(),
        }
    }
}

/// Root configuration object for the pipeline core.
///
/// `proxy_port` and `dashboard_port` are validated here (duplicate-port
/// rejection) even though this crate never binds them — binding is the HTTP
/// proxy surface's job, an out-of-scope collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub proxy_port: u16,
    pub dashboard_port: u16,
    pub log_retention_days: u32,
    pub model_device: ModelDevice,
    pub confidence: ConfidenceThresholds,
    pub checks: ChecksConfig,
    pub guard: GuardConfig,
    pub redaction: RedactionConfig,
    pub disabled_checks: Vec<ThreatKind>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            proxy_port: 8000,
            dashboard_port: 8001,
            log_retention_days: 90,
            model_device: ModelDevice::default(),
            confidence: ConfidenceThresholds::default(),
            checks: ChecksConfig::default(),
            guard: GuardConfig::default(),
            redaction: RedactionConfig::default(),
            disabled_checks: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a TOML file layered with `BANDAID_`-prefixed
    /// environment overrides (e.g. `BANDAID_LOG_RETENTION_DAYS=30`),
    /// validating the result before returning it. A missing file falls back
    /// to defaults plus any environment overrides.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("BANDAID").separator("__"));

        let raw = builder.build()?;
        let cfg: PipelineConfig = raw.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proxy_port == self.dashboard_port {
            return Err(ConfigError::Invalid(
                "proxy_port and dashboard_port must be different".into(),
            ));
        }
        if !(1..=365).contains(&self.log_retention_days) {
            return Err(ConfigError::Invalid(
                "log_retention_days must be between 1 and 365".into(),
            ));
        }
        if self.guard.timeout_seconds <= 0.0 {
            return Err(ConfigError::Invalid(
                "guard.timeout_seconds must be positive".into(),
            ));
        }
        self.confidence.validate()?;
        Ok(())
    }

    /// Composes a layer's enabled flag with the `disabled_checks` list by
    /// intersection: a kind is active iff its
    /// layer is enabled and the kind itself is not explicitly disabled.
    pub fn is_kind_enabled(&self, kind: ThreatKind, layer_enabled: bool) -> bool {
        layer_enabled && !self.disabled_checks.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_matching_ports() {
        let mut cfg = PipelineConfig::default();
        cfg.dashboard_port = cfg.proxy_port;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_retention() {
        let mut cfg = PipelineConfig::default();
        cfg.log_retention_days = 0;
        assert!(cfg.validate().is_err());
        cfg.log_retention_days = 400;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn disabled_checks_intersect_with_layer_toggle() {
        let mut cfg = PipelineConfig::default();
        cfg.disabled_checks.push(ThreatKind::Pii);
        assert!(!cfg.is_kind_enabled(ThreatKind::Pii, true));
        assert!(!cfg.is_kind_enabled(ThreatKind::Pii, false));
        assert!(cfg.is_kind_enabled(ThreatKind::ApiKeyLeak, true));
        assert!(!cfg.is_kind_enabled(ThreatKind::ApiKeyLeak, false));
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let cfg = PipelineConfig::load("/nonexistent/bandaid.toml").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn load_reads_toml_file_and_applies_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bandaid.toml");
        std::fs::write(
            &path,
            r#"
            log_retention_days = 30
            model_device = "cuda"

            [checks]
            guard = false
            "#,
        )
        .unwrap();

        let cfg = PipelineConfig::load(&path).unwrap();
        assert_eq!(cfg.log_retention_days, 30);
        assert_eq!(cfg.model_device, ModelDevice::Cuda);
        assert!(!cfg.checks.guard);
        // Fields absent from the file keep their defaults.
        assert!(cfg.checks.regex);
    }

    #[test]
    fn load_rejects_invalid_thresholds_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bandaid.toml");
        std::fs::write(
            &path,
            r#"
            [confidence]
            high = 0.5
            medium = 0.9
            low = 0.3
            "#,
        )
        .unwrap();

        assert!(PipelineConfig::load(&path).is_err());
    }
}
