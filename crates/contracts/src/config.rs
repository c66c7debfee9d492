//! AnnotatorConfig - Config Loader output
//!
//! Depth units resolution settings, pipeline queueing and observability.

use serde::{Deserialize, Serialize};

use crate::{DepthUnits, MetadataPath, OptionId};

/// Full annotation stage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Depth units fallback chain
    #[serde(default)]
    pub depth_units: DepthUnitsConfig,

    /// Per-stream worker queues
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging and metrics export
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

/// Where depth units come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthUnitsConfig {
    /// Value used when neither metadata nor the device option yields one
    #[serde(default = "default_depth_units")]
    pub default: f32,

    /// Device option consulted when metadata is missing
    #[serde(default)]
    pub option_id: OptionId,

    /// Nested metadata field carrying the per-frame value
    #[serde(default)]
    pub metadata_path: MetadataPath,
}

fn default_depth_units() -> f32 {
    DepthUnits::DEFAULT.get()
}

impl Default for DepthUnitsConfig {
    fn default() -> Self {
        Self {
            default: default_depth_units(),
            option_id: OptionId::depth_units(),
            metadata_path: MetadataPath::depth_units(),
        }
    }
}

impl DepthUnitsConfig {
    /// Configured default as a validated value.
    ///
    /// Falls back to `DepthUnits::DEFAULT` if the configured number is unusable.
    pub fn default_units(&self) -> DepthUnits {
        DepthUnits::new(self.default).unwrap_or(DepthUnits::DEFAULT)
    }
}

/// Worker queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bounded queue capacity per stream
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// What to drop when a stream queue is full
    #[serde(default)]
    pub drop_policy: DropPolicy,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            drop_policy: DropPolicy::default(),
        }
    }
}

/// Drop policy when a queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Drop the queued frame that has waited longest
    DropOldest,
    /// Drop the incoming frame
    #[default]
    DropNewest,
}

/// Logging and metrics export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    #[serde(default)]
    pub log_format: LogFormat,

    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus listener port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            metrics_port: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON structured logs
    Json,
    /// Human-readable
    #[default]
    Pretty,
    /// Single line per event
    Compact,
}
