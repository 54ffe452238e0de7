// ABOUTME: Application-wide error types for skylift.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("preset '{name}' not found in {dir}")]
    PresetNotFound { name: String, dir: PathBuf },

    #[error("invalid preset: {0}")]
    InvalidPreset(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("environment variable {key} was not resolved (value={value}); did you forget to export it?")]
    UnresolvedEnvVar { key: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
