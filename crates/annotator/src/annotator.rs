//! Frame annotator
//!
//! Writes depth units into each frame, then hands the frame to the downstream
//! metadata step. The value is always set before the downstream step runs.

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use contracts::{AnnotatorConfig, DepthFrame, DepthUnits, FrameMetadataStep, MetadataDocument, OptionSource};
use observability::StreamMetrics;
use tracing::{debug, trace};

use crate::extractor::{FieldError, MetadataFieldExtractor};
use crate::metrics::AnnotationMetrics;
use crate::resolver::DepthUnitsResolver;
use crate::source::DepthUnitsSource;

/// Per-frame depth units annotation.
///
/// Total: every frame leaves with valid depth units, whatever its metadata looks like
/// and whether or not the device option is reachable.
pub struct FrameAnnotator {
    resolver: Arc<DepthUnitsResolver>,
    extractor: MetadataFieldExtractor,
    base: Arc<dyn FrameMetadataStep>,
    metrics: Arc<AnnotationMetrics>,
    // Registered on the first frame, once a recorder may be installed
    stream_metrics: OnceLock<StreamMetrics>,
}

impl FrameAnnotator {
    /// Create an annotator reading `header.depth-units` from metadata
    pub fn new(resolver: Arc<DepthUnitsResolver>, base: Arc<dyn FrameMetadataStep>) -> Self {
        Self {
            resolver,
            extractor: MetadataFieldExtractor::new(),
            base,
            metrics: Arc::new(AnnotationMetrics::new()),
            stream_metrics: OnceLock::new(),
        }
    }

    /// Build resolver and extractor from configuration
    pub fn from_config(
        options: Arc<dyn OptionSource>,
        config: &AnnotatorConfig,
        base: Arc<dyn FrameMetadataStep>,
    ) -> Self {
        let resolver = DepthUnitsResolver::from_config(options, &config.depth_units);
        Self::new(Arc::new(resolver), base)
            .with_extractor(MetadataFieldExtractor::with_path(config.depth_units.metadata_path.clone()))
    }

    /// Builder: replace the metadata extractor
    pub fn with_extractor(mut self, extractor: MetadataFieldExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Builder: share counters with other annotators
    pub fn with_metrics(mut self, metrics: Arc<AnnotationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<AnnotationMetrics> {
        self.metrics.clone()
    }

    pub fn resolver(&self) -> &Arc<DepthUnitsResolver> {
        &self.resolver
    }

    /// Dispatch on whether a metadata document accompanied the frame
    pub fn annotate(&self, frame: &mut DepthFrame, metadata: Option<MetadataDocument>) {
        match metadata {
            Some(doc) => self.add_frame_metadata(frame, doc),
            None => self.add_no_metadata(frame),
        }
    }

    /// Frame arrived without any metadata document
    pub fn add_no_metadata(&self, frame: &mut DepthFrame) {
        let resolution = self.resolver.resolve_detailed();
        self.set_depth_units(frame, resolution.value, resolution.source);
        self.base.add_no_metadata(frame);
    }

    /// Frame arrived with a metadata document, which is consumed
    pub fn add_frame_metadata(&self, frame: &mut DepthFrame, metadata: MetadataDocument) {
        let (units, source) = match self.units_from_metadata(frame, &metadata) {
            Some(units) => (units, DepthUnitsSource::Metadata),
            None => {
                let resolution = self.resolver.resolve_detailed();
                (resolution.value, resolution.source)
            }
        };
        self.set_depth_units(frame, units, source);
        self.base.add_frame_metadata(frame, metadata);
    }

    /// Metadata value if present, decodable, finite and positive
    fn units_from_metadata(&self, frame: &DepthFrame, metadata: &MetadataDocument) -> Option<DepthUnits> {
        let raw = match self.extractor.lookup(metadata) {
            Ok(raw) => raw,
            Err(FieldError::Absent { .. }) => return None,
            Err(e @ FieldError::Undecodable { .. }) => {
                debug!(
                    stream_id = %frame.stream_id,
                    frame_number = frame.frame_number,
                    error = %e,
                    "depth units metadata undecodable, falling back"
                );
                self.metrics.record_decode_failure();
                self.stream_metrics(&frame.stream_id).record_metadata_decode_failure();
                return None;
            }
        };

        match DepthUnits::new(raw) {
            Ok(units) => Some(units),
            Err(e) => {
                debug!(
                    stream_id = %frame.stream_id,
                    frame_number = frame.frame_number,
                    error = %e,
                    "depth units metadata rejected, falling back"
                );
                self.metrics.record_rejected();
                self.stream_metrics(&frame.stream_id).record_metadata_rejected();
                None
            }
        }
    }

    fn set_depth_units(&self, frame: &mut DepthFrame, units: DepthUnits, source: DepthUnitsSource) {
        frame.additional_data.depth_units = Some(units);
        self.metrics.record_annotated(source);
        self.stream_metrics(&frame.stream_id)
            .record_depth_units(source.as_str(), units.get());
        trace!(
            stream_id = %frame.stream_id,
            frame_number = frame.frame_number,
            depth_units = %units,
            %source,
            "frame annotated"
        );
    }

    /// Metric handles for `stream_id`
    fn stream_metrics(&self, stream_id: &str) -> Cow<'_, StreamMetrics> {
        let cached = self
            .stream_metrics
            .get_or_init(|| register_stream_metrics(stream_id));
        if cached.stream_id() == stream_id {
            Cow::Borrowed(cached)
        } else {
            // Annotator shared by several streams; only the first one is cached
            Cow::Owned(register_stream_metrics(stream_id))
        }
    }
}

fn register_stream_metrics(stream_id: &str) -> StreamMetrics {
    StreamMetrics::new(stream_id, &DepthUnitsSource::ALL.map(DepthUnitsSource::as_str))
}
