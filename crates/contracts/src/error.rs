//! Layered error definitions
//!
//! Categorized by source: config / option / metadata

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Option Errors =====
    /// Control channel query failed
    #[error("option '{option_id}' query failed: {message}")]
    OptionQuery { option_id: String, message: String },

    /// Value cannot be used as depth units
    #[error("invalid depth units: {value}")]
    InvalidDepthUnits { value: f32 },

    // ===== Metadata Errors =====
    /// Metadata field present but not decodable
    #[error("metadata decode error: {message}")]
    MetadataDecode { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create option query error
    pub fn option_query(option_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OptionQuery {
            option_id: option_id.into(),
            message: message.into(),
        }
    }

    /// Create metadata decode error
    pub fn metadata_decode(message: impl Into<String>) -> Self {
        Self::MetadataDecode {
            message: message.into(),
        }
    }
}
