//! Where a frame's depth units came from

use std::fmt;

/// Link of the fallback chain that produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthUnitsSource {
    /// Per-frame metadata document
    Metadata,
    /// Cached value of an auto-updated option
    LastKnown,
    /// Synchronous option query
    Query,
    /// Configured default
    Default,
}

impl DepthUnitsSource {
    /// Every source, in fallback order
    pub const ALL: [Self; 4] = [Self::Metadata, Self::LastKnown, Self::Query, Self::Default];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::LastKnown => "last_known",
            Self::Query => "query",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for DepthUnitsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
