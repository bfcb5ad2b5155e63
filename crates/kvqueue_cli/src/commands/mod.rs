//! CLI command implementations.

pub mod flush_demo;
pub mod run;

use kvqueue_core::AsyncError;
use kvqueue_store::StoreError;
use std::str::FromStr;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Unknown `--format` value.
    #[error("unknown output format '{0}' (expected text or json)")]
    UnknownFormat(String),

    /// A workload parameter was out of range.
    #[error("invalid workload: {0}")]
    InvalidWorkload(String),

    /// The pool rejected an operation.
    #[error(transparent)]
    Async(#[from] AsyncError),

    /// The engine rejected a setup call.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Report serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CommandError::UnknownFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!(matches!(
            "yaml".parse::<OutputFormat>(),
            Err(CommandError::UnknownFormat(_))
        ));
    }
}
