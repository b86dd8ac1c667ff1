//! Router configuration, loadable from TOML.
//!
//! The thresholds were tuned against multilingual-e5-small. Switching the
//! embedding model means re-tuning both of them.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ConfigError;

pub const DEFAULT_MIN_SCORE: f32 = 0.85;
pub const DEFAULT_MIN_GAP: f32 = 0.015;

/// Tunables for the semantic layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouterConfig {
    /// Minimum cosine similarity the top intent must reach.
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Minimum margin of the top intent over the runner-up.
    #[serde(default = "default_min_gap")]
    pub min_gap: f32,
    /// Directory holding `model.onnx` and `tokenizer.json`.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
    /// Prefix prepended to user queries before encoding.
    #[serde(default = "default_query_prefix")]
    pub query_prefix: String,
    /// Prefix prepended to catalog examples before encoding.
    #[serde(default = "default_passage_prefix")]
    pub passage_prefix: String,
}

fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}

fn default_min_gap() -> f32 {
    DEFAULT_MIN_GAP
}

fn default_query_prefix() -> String {
    "query: ".into()
}

fn default_passage_prefix() -> String {
    "passage: ".into()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            min_gap: DEFAULT_MIN_GAP,
            model_dir: None,
            query_prefix: default_query_prefix(),
            passage_prefix: default_passage_prefix(),
        }
    }
}

impl RouterConfig {
    /// Load and validate config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::info!(
            path = %path.display(),
            min_score = config.min_score,
            min_gap = config.min_gap,
            "router config loaded"
        );
        Ok(config)
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds that could never (or would always) pass the gate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_score.is_finite() || !(-1.0..=1.0).contains(&self.min_score) {
            return Err(ConfigError::Invalid(format!(
                "min_score must be within [-1, 1], got {}",
                self.min_score
            )));
        }
        if !self.min_gap.is_finite() || self.min_gap < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_gap must be a non-negative number, got {}",
                self.min_gap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = RouterConfig::from_toml("").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.min_score, 0.85);
        assert_eq!(config.min_gap, 0.015);
        assert_eq!(config.query_prefix, "query: ");
        assert_eq!(config.passage_prefix, "passage: ");
        assert!(config.model_dir.is_none());
    }

    #[test]
    fn full_toml() {
        let toml = r#"
min_score = 0.8
min_gap = 0.03
model_dir = "models/multilingual-e5-small"
query_prefix = "search_query: "
passage_prefix = "search_document: "
"#;
        let config = RouterConfig::from_toml(toml).unwrap();
        assert!((config.min_score - 0.8).abs() < 1e-6);
        assert!((config.min_gap - 0.03).abs() < 1e-6);
        assert_eq!(
            config.model_dir.as_deref(),
            Some(Path::new("models/multilingual-e5-small"))
        );
        assert_eq!(config.query_prefix, "search_query: ");
    }

    #[test]
    fn out_of_range_score_rejected() {
        let err = RouterConfig::from_toml("min_score = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
    }

    #[test]
    fn negative_gap_rejected() {
        let err = RouterConfig::from_toml("min_gap = -0.1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let err = RouterConfig::from_toml(r#"min_score = "high""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = RouterConfig::from_file(Path::new("/nonexistent/parlance.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "got {err:?}");
    }
}
