use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
    #[error("Invalid frontmatter in {path}: {message}")]
    FrontmatterError { path: PathBuf, message: String },
    #[error("Invalid applyTo pattern '{pattern}': {message}")]
    PatternError { pattern: String, message: String },
    #[error("Duplicate artifact id '{id}' ({first} and {second})")]
    DuplicateArtifact {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),
}

impl ResolverError {
    pub fn frontmatter(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FrontmatterError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PatternError {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}
