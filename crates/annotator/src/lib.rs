//! # Depth Units Annotator
//!
//! Attaches depth units to every depth frame.
//!
//! Fallback chain, first usable value wins:
//! 1. `header.depth-units` in the frame's metadata document
//! 2. Last known value of the `depth-units` device option
//! 3. Synchronous query of that option
//! 4. The configured default (0.001)
//!
//! Annotation never fails; a missing option, an unreachable device or malformed
//! metadata only moves the frame further down the chain.
//!
//! ## Usage Example
//!
//! ```ignore
//! use annotator::{AnnotationPipeline, DepthUnitsResolver, FrameAnnotator};
//!
//! let resolver = Arc::new(DepthUnitsResolver::new(registry));
//! let annotator = FrameAnnotator::new(resolver, downstream);
//!
//! let mut pipeline = AnnotationPipeline::new(PipelineConfig::default());
//! let ingress = pipeline.register_stream("depth", annotator)?;
//! pipeline.start_all();
//!
//! ingress.submit(frame, Some(metadata))?;
//! ```

mod annotator;
mod error;
mod extractor;
mod metrics;
mod pipeline;
mod resolver;
mod source;

// Re-exports
pub use annotator::FrameAnnotator;
pub use error::{AnnotatorError, Result};
pub use extractor::{FieldError, MetadataFieldExtractor};
pub use metrics::{AnnotationMetrics, MetricsSnapshot};
pub use pipeline::{AnnotationPipeline, IncomingFrame, StreamIngress, SubmitOutcome};
pub use resolver::{DepthUnitsResolver, Resolution};
pub use source::DepthUnitsSource;
