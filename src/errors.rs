// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepgateError {
    /// A registration or start call arrived after the runner was started.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A plan file or command-line value failed validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Units whose required providers depend on each other in a loop.
    #[error("Cycle detected in dependencies: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DepgateError>;
