//! Error types for the generation engine and catalog loading.

use thiserror::Error;

use crate::domain::Skill;

/// Fatal generation errors. Skipped steps and constraint fallbacks are not
/// errors; they are reported as `GenerationWarning`s.
#[derive(Debug, Error)]
pub enum QGenError {
  #[error("No context supports any of the target skills: {skills:?}")]
  NoCompatibleContext { skills: Vec<Skill> },

  #[error("Categorical variable '{variable}' declares no options")]
  MissingOptions { variable: String },

  #[error("Invalid variable '{variable}': {reason}")]
  InvalidVariable { variable: String, reason: String },

  #[error("Invalid request: {0}")]
  InvalidRequest(String),
}

/// Catalog loading errors. The loader logs these and falls back to the built-in catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
  #[error("Failed to read catalog file {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse catalog TOML: {0}")]
  Parse(#[from] toml::de::Error),
}
