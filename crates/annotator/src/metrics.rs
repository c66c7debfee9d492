//! Annotation counters
//!
//! Relaxed atomics, shared between all annotators of a pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::source::DepthUnitsSource;

/// Annotation metrics
#[derive(Debug, Default)]
pub struct AnnotationMetrics {
    /// Frames that left the annotation stage
    pub frames_annotated: AtomicU64,

    /// Values taken from frame metadata
    pub from_metadata: AtomicU64,

    /// Values taken from an option's last known value
    pub from_last_known: AtomicU64,

    /// Values obtained with a synchronous query
    pub from_query: AtomicU64,

    /// Values that fell back to the default
    pub from_default: AtomicU64,

    /// Metadata fields present but not decodable
    pub metadata_decode_failures: AtomicU64,

    /// Metadata values decoded but not finite and positive
    pub metadata_rejected: AtomicU64,

    /// Frames accepted into a stream queue
    pub frames_submitted: AtomicU64,

    /// Frames discarded by a full stream queue, either rejected or evicted.
    ///
    /// Once the queues are drained, `frames_annotated + frames_dropped` equals submit attempts.
    pub frames_dropped: AtomicU64,
}

impl AnnotationMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one annotated frame and the source of its value
    pub fn record_annotated(&self, source: DepthUnitsSource) {
        self.frames_annotated.fetch_add(1, Ordering::Relaxed);
        let counter = match source {
            DepthUnitsSource::Metadata => &self.from_metadata,
            DepthUnitsSource::LastKnown => &self.from_last_known,
            DepthUnitsSource::Query => &self.from_query,
            DepthUnitsSource::Default => &self.from_default,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.metadata_decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.metadata_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.frames_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_annotated: self.frames_annotated.load(Ordering::Relaxed),
            from_metadata: self.from_metadata.load(Ordering::Relaxed),
            from_last_known: self.from_last_known.load(Ordering::Relaxed),
            from_query: self.from_query.load(Ordering::Relaxed),
            from_default: self.from_default.load(Ordering::Relaxed),
            metadata_decode_failures: self.metadata_decode_failures.load(Ordering::Relaxed),
            metadata_rejected: self.metadata_rejected.load(Ordering::Relaxed),
            frames_submitted: self.frames_submitted.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_annotated: u64,
    pub from_metadata: u64,
    pub from_last_known: u64,
    pub from_query: u64,
    pub from_default: u64,
    pub metadata_decode_failures: u64,
    pub metadata_rejected: u64,
    pub frames_submitted: u64,
    pub frames_dropped: u64,
}

impl MetricsSnapshot {
    /// Count for a single source
    pub fn count_for(&self, source: DepthUnitsSource) -> u64 {
        match source {
            DepthUnitsSource::Metadata => self.from_metadata,
            DepthUnitsSource::LastKnown => self.from_last_known,
            DepthUnitsSource::Query => self.from_query,
            DepthUnitsSource::Default => self.from_default,
        }
    }
}
