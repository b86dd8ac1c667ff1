use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("intent already registered: {0}")]
    DuplicateIntent(String),

    #[error("intent {0} has no example phrases")]
    NoExamples(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
