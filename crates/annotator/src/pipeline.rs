//! Annotation Pipeline main entry
//!
//! One bounded queue and one worker thread per stream. Streams are independent:
//! frames of one stream are annotated in arrival order, with no ordering across streams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{DepthFrame, DropPolicy, MetadataDocument, PipelineConfig};
use observability::StreamMetrics;
use tracing::{debug, info, instrument, trace, warn};

use crate::annotator::FrameAnnotator;
use crate::error::{AnnotatorError, Result};
use crate::metrics::AnnotationMetrics;

/// Frame as delivered by the transport, before annotation
#[derive(Debug, Clone)]
pub struct IncomingFrame {
    pub frame: DepthFrame,
    pub metadata: Option<MetadataDocument>,
}

/// Result of submitting a frame to a full or non-full queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Frame queued
    Enqueued,
    /// Queue full, the submitted frame was dropped
    DroppedNewest,
    /// Queue full, the oldest queued frame was dropped to make room
    DroppedOldest,
}

/// Producer side of a stream queue
#[derive(Clone)]
pub struct StreamIngress {
    stream_id: String,
    tx: Sender<IncomingFrame>,
    // Used only to evict under DropOldest
    rx: Receiver<IncomingFrame>,
    drop_policy: DropPolicy,
    metrics: Arc<AnnotationMetrics>,
    queue_metrics: Arc<OnceLock<StreamMetrics>>,
}

impl StreamIngress {
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Queue a frame without blocking, applying the drop policy when full.
    ///
    /// Every discarded frame is counted once, whether it was the submitted one or an
    /// evicted one.
    pub fn submit(&self, frame: DepthFrame, metadata: Option<MetadataDocument>) -> Result<SubmitOutcome> {
        let incoming = IncomingFrame { frame, metadata };
        let outcome = match self.tx.try_send(incoming) {
            Ok(()) => SubmitOutcome::Enqueued,
            Err(TrySendError::Closed(_)) => return Err(self.closed()),
            Err(TrySendError::Full(incoming)) => match self.drop_policy {
                DropPolicy::DropNewest => {
                    trace!(stream_id = %self.stream_id, "frame dropped (newest)");
                    self.record_dropped();
                    SubmitOutcome::DroppedNewest
                }
                DropPolicy::DropOldest => {
                    // The worker may have drained the queue in the meantime
                    let evicted = self.rx.try_recv().ok();
                    if let Some(evicted) = &evicted {
                        trace!(
                            stream_id = %self.stream_id,
                            frame_number = evicted.frame.frame_number,
                            "frame dropped (oldest)"
                        );
                        self.record_dropped();
                    }

                    // Another producer may have refilled the slot
                    match self.tx.try_send(incoming) {
                        Ok(()) if evicted.is_some() => SubmitOutcome::DroppedOldest,
                        Ok(()) => SubmitOutcome::Enqueued,
                        Err(TrySendError::Full(_)) => {
                            trace!(stream_id = %self.stream_id, "frame dropped (newest)");
                            self.record_dropped();
                            SubmitOutcome::DroppedNewest
                        }
                        Err(TrySendError::Closed(_)) => return Err(self.closed()),
                    }
                }
            },
        };

        if outcome != SubmitOutcome::DroppedNewest {
            self.metrics.record_submitted();
        }
        self.queue_metrics().record_queue_depth(self.tx.len());
        Ok(outcome)
    }

    /// Queue a frame, waiting for room instead of dropping.
    ///
    /// For offline sources (replay) that must not lose frames.
    pub fn submit_blocking(&self, frame: DepthFrame, metadata: Option<MetadataDocument>) -> Result<()> {
        self.tx
            .send_blocking(IncomingFrame { frame, metadata })
            .map_err(|_| self.closed())?;
        self.metrics.record_submitted();
        Ok(())
    }

    /// Frames currently waiting
    pub fn queue_len(&self) -> usize {
        self.tx.len()
    }

    fn record_dropped(&self) {
        self.metrics.record_dropped();
        self.queue_metrics().record_frame_dropped();
    }

    fn queue_metrics(&self) -> &StreamMetrics {
        self.queue_metrics
            .get_or_init(|| StreamMetrics::new(&self.stream_id, &[]))
    }

    fn closed(&self) -> AnnotatorError {
        AnnotatorError::ChannelClosed {
            stream_id: self.stream_id.clone(),
        }
    }
}

struct StreamWorker {
    annotator: Arc<FrameAnnotator>,
    tx: Sender<IncomingFrame>,
    rx: Receiver<IncomingFrame>,
    handle: Mutex<Option<JoinHandle<()>>>,
    queue_metrics: Arc<OnceLock<StreamMetrics>>,
}

impl StreamWorker {
    fn start(&self, stream_id: &str) {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.is_some() || self.tx.is_closed() {
            return;
        }

        let rx = self.rx.clone();
        let annotator = self.annotator.clone();
        let stream_id = stream_id.to_string();
        let name = format!("annotate-{stream_id}");

        let spawned = thread::Builder::new().name(name).spawn(move || {
            debug!(stream_id = %stream_id, "annotation worker started");
            // Drains whatever is queued once the channel is closed
            while let Ok(IncomingFrame { mut frame, metadata }) = rx.recv_blocking() {
                annotator.annotate(&mut frame, metadata);
            }
            debug!(stream_id = %stream_id, "annotation worker stopped");
        });

        match spawned {
            Ok(join) => *handle = Some(join),
            Err(e) => warn!(error = %e, "failed to spawn annotation worker"),
        }
    }

    fn stop(&self, stream_id: &str) {
        self.tx.close();
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(join) = handle {
            if join.join().is_err() {
                warn!(stream_id = %stream_id, "annotation worker panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

/// Annotation Pipeline
///
/// Owns per-stream queues and workers. Stopping closes every queue and waits for the
/// workers to drain it; a stopped pipeline cannot be restarted.
pub struct AnnotationPipeline {
    streams: HashMap<String, StreamWorker>,
    metrics: Arc<AnnotationMetrics>,
    config: PipelineConfig,
}

impl AnnotationPipeline {
    /// Create an empty pipeline
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            streams: HashMap::new(),
            metrics: Arc::new(AnnotationMetrics::new()),
            config,
        }
    }

    /// Register a stream with its annotator.
    ///
    /// The annotator is rewired to the pipeline's shared counters.
    #[instrument(name = "annotation_register_stream", skip(self, annotator), fields(stream_id = %stream_id))]
    pub fn register_stream(&mut self, stream_id: &str, annotator: FrameAnnotator) -> Result<StreamIngress> {
        if self.streams.contains_key(stream_id) {
            return Err(AnnotatorError::DuplicateStream {
                stream_id: stream_id.to_string(),
            });
        }

        let (tx, rx) = bounded(self.config.channel_capacity.max(1));
        let worker = StreamWorker {
            annotator: Arc::new(annotator.with_metrics(self.metrics.clone())),
            tx,
            rx,
            handle: Mutex::new(None),
            queue_metrics: Arc::new(OnceLock::new()),
        };
        self.streams.insert(stream_id.to_string(), worker);
        debug!(stream_id = %stream_id, "registered stream");

        self.ingress(stream_id)
    }

    /// Producer handle for a registered stream
    pub fn ingress(&self, stream_id: &str) -> Result<StreamIngress> {
        let worker = self
            .streams
            .get(stream_id)
            .ok_or_else(|| AnnotatorError::UnknownStream {
                stream_id: stream_id.to_string(),
            })?;

        Ok(StreamIngress {
            stream_id: stream_id.to_string(),
            tx: worker.tx.clone(),
            rx: worker.rx.clone(),
            drop_policy: self.config.drop_policy,
            metrics: self.metrics.clone(),
            queue_metrics: worker.queue_metrics.clone(),
        })
    }

    /// Start a worker for every registered stream
    #[instrument(name = "annotation_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.streams.len(), "starting annotation workers");
        for (stream_id, worker) in &self.streams {
            worker.start(stream_id);
        }
    }

    /// Close all queues and wait for workers to drain them
    #[instrument(name = "annotation_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.streams.len(), "stopping annotation workers");
        for (stream_id, worker) in &self.streams {
            worker.stop(stream_id);
        }
    }

    /// Shared counters
    pub fn metrics(&self) -> Arc<AnnotationMetrics> {
        self.metrics.clone()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn is_stream_running(&self, stream_id: &str) -> bool {
        self.streams
            .get(stream_id)
            .map(StreamWorker::is_running)
            .unwrap_or(false)
    }
}

impl Drop for AnnotationPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DepthUnitsResolver;
    use contracts::{DepthUnits, FrameMetadataStep};
    use device_options::OptionRegistry;
    use serde_json::json;

    /// Downstream step forwarding annotated frames
    struct Forward(Sender<DepthFrame>);

    impl FrameMetadataStep for Forward {
        fn add_no_metadata(&self, frame: &mut DepthFrame) {
            let _ = self.0.send_blocking(frame.clone());
        }

        fn add_frame_metadata(&self, frame: &mut DepthFrame, _metadata: MetadataDocument) {
            let _ = self.0.send_blocking(frame.clone());
        }
    }

    fn annotator(out: Sender<DepthFrame>) -> FrameAnnotator {
        let resolver = DepthUnitsResolver::new(Arc::new(OptionRegistry::new()));
        FrameAnnotator::new(Arc::new(resolver), Arc::new(Forward(out)))
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = AnnotationPipeline::new(PipelineConfig::default());
        assert_eq!(pipeline.stream_count(), 0);
        assert!(matches!(pipeline.ingress("depth"), Err(AnnotatorError::UnknownStream { .. })));
    }

    #[test]
    fn test_duplicate_stream_rejected() {
        let (out, _rx) = bounded(8);
        let mut pipeline = AnnotationPipeline::new(PipelineConfig::default());
        pipeline.register_stream("depth", annotator(out.clone())).unwrap();
        let err = pipeline.register_stream("depth", annotator(out)).err().unwrap();
        assert!(matches!(err, AnnotatorError::DuplicateStream { .. }));
    }

    #[test]
    fn test_frames_annotated_in_order() {
        let (out, annotated) = bounded(16);
        let mut pipeline = AnnotationPipeline::new(PipelineConfig::default());
        let ingress = pipeline.register_stream("depth", annotator(out)).unwrap();
        pipeline.start_all();

        ingress.submit(DepthFrame::empty("depth", 1), None).unwrap();
        let md = MetadataDocument::new(json!({"header": {"depth-units": 0.0001}}));
        ingress.submit(DepthFrame::empty("depth", 2), Some(md)).unwrap();
        pipeline.stop_all();

        let first = annotated.recv_blocking().unwrap();
        let second = annotated.recv_blocking().unwrap();
        assert_eq!(first.frame_number, 1);
        assert_eq!(first.depth_units(), Some(DepthUnits::DEFAULT));
        assert_eq!(second.frame_number, 2);
        assert_eq!(second.depth_units().unwrap().get(), 0.0001);

        let snapshot = pipeline.metrics().snapshot();
        assert_eq!(snapshot.frames_annotated, 2);
        assert_eq!(snapshot.frames_submitted, 2);
    }

    #[test]
    fn test_drop_newest_when_full() {
        let (out, _annotated) = bounded(16);
        let config = PipelineConfig {
            channel_capacity: 1,
            drop_policy: DropPolicy::DropNewest,
        };
        let mut pipeline = AnnotationPipeline::new(config);
        // Not started: nothing drains the queue
        let ingress = pipeline.register_stream("depth", annotator(out)).unwrap();

        assert_eq!(ingress.submit(DepthFrame::empty("depth", 1), None).unwrap(), SubmitOutcome::Enqueued);
        assert_eq!(
            ingress.submit(DepthFrame::empty("depth", 2), None).unwrap(),
            SubmitOutcome::DroppedNewest
        );
        assert_eq!(pipeline.metrics().snapshot().frames_dropped, 1);
    }

    #[test]
    fn test_drop_oldest_when_full() {
        let (out, annotated) = bounded(16);
        let config = PipelineConfig {
            channel_capacity: 1,
            drop_policy: DropPolicy::DropOldest,
        };
        let mut pipeline = AnnotationPipeline::new(config);
        let ingress = pipeline.register_stream("depth", annotator(out)).unwrap();

        ingress.submit(DepthFrame::empty("depth", 1), None).unwrap();
        assert_eq!(
            ingress.submit(DepthFrame::empty("depth", 2), None).unwrap(),
            SubmitOutcome::DroppedOldest
        );
        assert_eq!(ingress.queue_len(), 1);
        assert_eq!(pipeline.metrics().snapshot().frames_dropped, 1);

        pipeline.start_all();
        pipeline.stop_all();
        assert_eq!(annotated.recv_blocking().unwrap().frame_number, 2);
    }

    /// Two producers race a running worker on a one-slot queue: every frame is either
    /// annotated or counted as dropped, exactly once
    #[test]
    fn test_drop_oldest_accounting_with_two_producers() {
        const PER_PRODUCER: u64 = 2_000;

        let (out, annotated) = async_channel::unbounded();
        let config = PipelineConfig {
            channel_capacity: 1,
            drop_policy: DropPolicy::DropOldest,
        };
        let mut pipeline = AnnotationPipeline::new(config);
        let ingress = pipeline.register_stream("depth", annotator(out)).unwrap();
        pipeline.start_all();

        let producers: Vec<_> = (0..2u64)
            .map(|p| {
                let ingress = ingress.clone();
                thread::spawn(move || {
                    let mut accepted = 0u64;
                    for n in 0..PER_PRODUCER {
                        let frame = DepthFrame::empty("depth", p * PER_PRODUCER + n);
                        if ingress.submit(frame, None).unwrap() != SubmitOutcome::DroppedNewest {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();
        let accepted: u64 = producers.into_iter().map(|h| h.join().unwrap()).sum();
        pipeline.stop_all();

        let snapshot = pipeline.metrics().snapshot();
        assert_eq!(snapshot.frames_submitted, accepted);
        assert_eq!(snapshot.frames_annotated + snapshot.frames_dropped, 2 * PER_PRODUCER);
        assert_eq!(annotated.len() as u64, snapshot.frames_annotated);
    }

    #[test]
    fn test_submit_blocking_waits_for_room() {
        let (out, annotated) = bounded(16);
        let config = PipelineConfig {
            channel_capacity: 1,
            drop_policy: DropPolicy::DropNewest,
        };
        let mut pipeline = AnnotationPipeline::new(config);
        let ingress = pipeline.register_stream("depth", annotator(out)).unwrap();
        pipeline.start_all();

        for n in 0..10 {
            ingress.submit_blocking(DepthFrame::empty("depth", n), None).unwrap();
        }
        pipeline.stop_all();

        let numbers: Vec<u64> = std::iter::from_fn(|| annotated.try_recv().ok())
            .map(|f| f.frame_number)
            .collect();
        assert_eq!(numbers, (0..10).collect::<Vec<_>>());
        assert_eq!(pipeline.metrics().snapshot().frames_dropped, 0);
    }

    #[test]
    fn test_submit_after_stop_fails() {
        let (out, _annotated) = bounded(16);
        let mut pipeline = AnnotationPipeline::new(PipelineConfig::default());
        let ingress = pipeline.register_stream("depth", annotator(out)).unwrap();
        pipeline.start_all();
        pipeline.stop_all();

        assert!(!pipeline.is_stream_running("depth"));
        let err = ingress.submit(DepthFrame::empty("depth", 1), None).unwrap_err();
        assert!(matches!(err, AnnotatorError::ChannelClosed { .. }));
    }
}
