//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Replay input file not found
    #[error("Replay input not found: {path}")]
    InputNotFound { path: String },

    /// A replay line that is not a frame record
    #[error("Invalid frame record at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    /// Pipeline setup or shutdown failure
    #[error("Pipeline execution failed: {message}")]
    PipelineExecution { message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn input_not_found(path: &Path) -> Self {
        Self::InputNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn invalid_record(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            line,
            message: message.into(),
        }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}
