//! `replay` command implementation.
//!
//! Feeds recorded frames through the annotation pipeline against a simulated device,
//! prints every annotated frame, then the per-source summary.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use annotator::{AnnotationPipeline, DepthUnitsSource, FrameAnnotator, MetricsSnapshot, StreamIngress};
use anyhow::{Context, Result};
use async_channel::{bounded, Receiver, Sender};
use contracts::{AnnotatorConfig, DepthFrame, FrameMetadataStep, MetadataDocument, OptionId, OptionSource};
use device_options::{AutoReport, AutoUpdatedOption, MockControlChannel, OptionRegistry, QueryOnlyOption};
use observability::DepthUnitsAggregator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cli::{OptionMode, ReplayArgs};
use crate::error::CliError;

/// One recorded frame
#[derive(Debug, Clone, Deserialize)]
struct FrameRecord {
    stream_id: String,
    frame_number: u64,
    #[serde(default)]
    timestamp: f64,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Annotated frame as printed
#[derive(Debug, Clone, Serialize)]
struct AnnotatedRecord {
    stream_id: String,
    frame_number: u64,
    depth_units: f32,
    metadata_received: bool,
}

/// Downstream step handing annotated frames to the printer task
struct ForwardStep {
    tx: Sender<AnnotatedRecord>,
}

impl ForwardStep {
    fn forward(&self, frame: &DepthFrame) {
        let Some(units) = frame.depth_units() else {
            warn!(stream_id = %frame.stream_id, frame_number = frame.frame_number, "frame left annotation without depth units");
            return;
        };
        let record = AnnotatedRecord {
            stream_id: frame.stream_id.clone(),
            frame_number: frame.frame_number,
            depth_units: units.get(),
            metadata_received: frame.additional_data.metadata_received,
        };
        if self.tx.send_blocking(record).is_err() {
            debug!(stream_id = %frame.stream_id, "output closed, annotated frame discarded");
        }
    }
}

impl FrameMetadataStep for ForwardStep {
    fn add_no_metadata(&self, frame: &mut DepthFrame) {
        self.forward(frame);
    }

    fn add_frame_metadata(&self, frame: &mut DepthFrame, _metadata: MetadataDocument) {
        frame.additional_data.metadata_received = true;
        self.forward(frame);
    }
}

/// Device stand-in exposing the depth units option
struct SimulatedDevice {
    registry: Arc<OptionRegistry>,
    channel: Arc<MockControlChannel>,
    // Held for its Drop
    _report: Option<AutoReport>,
}

impl SimulatedDevice {
    fn new(args: &ReplayArgs, option_id: &OptionId) -> Self {
        let mut channel = MockControlChannel::new();
        if args.query_latency_ms > 0 {
            channel = channel.with_latency(Duration::from_millis(args.query_latency_ms));
        }
        if let Some(value) = args.option_value {
            channel.set_value(option_id.clone(), value);
        }
        let channel = Arc::new(channel);
        let registry = Arc::new(OptionRegistry::new());
        let mut report = None;

        match args.effective_option_mode() {
            OptionMode::Auto => {
                let option = Arc::new(AutoUpdatedOption::new(option_id.clone(), channel.clone()));
                if let Some(value) = args.option_value {
                    option.update_last_known(value);
                }
                if args.report_interval_ms > 0 {
                    report = Some(option.spawn_auto_report(Duration::from_millis(args.report_interval_ms)));
                }
                registry.register(option);
            }
            OptionMode::QueryOnly => {
                registry.register(Arc::new(QueryOnlyOption::new(option_id.clone(), channel.clone())));
            }
            OptionMode::Absent => {}
        }

        debug!(
            option_id = %option_id,
            mode = ?args.effective_option_mode(),
            value = ?args.option_value,
            "simulated device ready"
        );

        Self {
            registry,
            channel,
            _report: report,
        }
    }

    fn options(&self) -> Arc<dyn OptionSource> {
        self.registry.clone()
    }
}

/// Outcome of one replay run
struct ReplayReport {
    submitted: u64,
    interrupted: bool,
    aggregator: DepthUnitsAggregator,
    snapshot: MetricsSnapshot,
    queries: u64,
}

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    if !args.input.exists() {
        return Err(CliError::input_not_found(&args.input).into());
    }
    let records = read_records(&args.input)?;
    info!(input = %args.input.display(), frames = records.len(), "Loaded frame records");

    let metrics_port = args
        .metrics_port
        .or(config.observability.metrics_port)
        .filter(|port| *port != 0);
    if let Some(port) = metrics_port {
        observability::init_metrics_only(port)?;
    }

    let report = replay(&config, args, records).await?;

    info!(
        frames_submitted = report.submitted,
        frames_annotated = report.snapshot.frames_annotated,
        interrupted = report.interrupted,
        "Replay finished"
    );
    print_summary(&report);

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnnotatorConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(AnnotatorConfig::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Parse a JSON-lines recording, skipping blank lines
fn read_records(path: &Path) -> Result<Vec<FrameRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FrameRecord =
            serde_json::from_str(&line).map_err(|e| CliError::invalid_record(index + 1, e.to_string()))?;
        records.push(record);
    }

    Ok(records)
}

async fn replay(config: &AnnotatorConfig, args: &ReplayArgs, records: Vec<FrameRecord>) -> Result<ReplayReport> {
    let device = SimulatedDevice::new(args, &config.depth_units.option_id);

    let (tx, rx) = bounded(config.pipeline.channel_capacity.max(1));
    let mut pipeline = AnnotationPipeline::new(config.pipeline.clone());

    let stream_ids: BTreeSet<&str> = records.iter().map(|r| r.stream_id.as_str()).collect();
    let mut ingresses = HashMap::new();
    for stream_id in stream_ids {
        let step = Arc::new(ForwardStep { tx: tx.clone() });
        let annotator = FrameAnnotator::from_config(device.options(), config, step);
        let ingress = pipeline
            .register_stream(stream_id, annotator)
            .map_err(|e| CliError::pipeline_execution(e.to_string()))?;
        ingresses.insert(stream_id.to_string(), ingress);
    }
    // Only the annotators may keep the output open
    drop(tx);

    pipeline.start_all();
    let metrics = pipeline.metrics();

    let cancelled = Arc::new(AtomicBool::new(false));
    let producer = tokio::task::spawn_blocking({
        let cancelled = cancelled.clone();
        move || feed(pipeline, &ingresses, records, &cancelled)
    });

    let mut aggregator = DepthUnitsAggregator::new();
    let interrupted = {
        let consume = consume(&rx, &mut aggregator, args.json);
        tokio::select! {
            () = consume => false,
            _ = tokio::signal::ctrl_c() => {
                warn!("Received Ctrl+C, stopping replay...");
                true
            }
        }
    };

    if interrupted {
        cancelled.store(true, Ordering::Relaxed);
        // Unblocks workers waiting on a full output
        rx.close();
    }

    let submitted = producer.await.context("Replay producer panicked")??;

    let snapshot = metrics.snapshot();
    for source in DepthUnitsSource::ALL {
        aggregator.add_source_count(source.as_str(), snapshot.count_for(source));
    }

    Ok(ReplayReport {
        submitted,
        interrupted,
        aggregator,
        snapshot,
        queries: device.channel.query_count(),
    })
}

/// Submit every record in order, then stop the pipeline so the output closes
fn feed(
    pipeline: AnnotationPipeline,
    ingresses: &HashMap<String, StreamIngress>,
    records: Vec<FrameRecord>,
    cancelled: &AtomicBool,
) -> Result<u64, CliError> {
    let mut submitted = 0;

    for record in records {
        if cancelled.load(Ordering::Relaxed) {
            debug!(submitted, "replay cancelled");
            break;
        }

        let ingress = ingresses
            .get(&record.stream_id)
            .ok_or_else(|| CliError::pipeline_execution(format!("no ingress for stream {}", record.stream_id)))?;

        let frame = DepthFrame::empty(record.stream_id, record.frame_number).with_timestamp(record.timestamp);
        let metadata = record.metadata.map(MetadataDocument::new);
        ingress
            .submit_blocking(frame, metadata)
            .map_err(|e| CliError::pipeline_execution(e.to_string()))?;
        submitted += 1;
    }

    pipeline.stop_all();
    Ok(submitted)
}

async fn consume(rx: &Receiver<AnnotatedRecord>, aggregator: &mut DepthUnitsAggregator, json: bool) {
    while let Ok(record) = rx.recv().await {
        aggregator.observe(&record.stream_id, record.depth_units);

        if json {
            match serde_json::to_string(&record) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to serialize annotated frame"),
            }
        } else {
            println!(
                "{} #{} depth_units={}{}",
                record.stream_id,
                record.frame_number,
                record.depth_units,
                if record.metadata_received { "" } else { " (no metadata)" }
            );
        }
    }
}

fn print_summary(report: &ReplayReport) {
    let snapshot = &report.snapshot;

    println!();
    print!("{}", report.aggregator.summary());
    println!("Frames submitted: {}", report.submitted);
    println!("Metadata decode failures: {}", snapshot.metadata_decode_failures);
    println!("Metadata values rejected: {}", snapshot.metadata_rejected);
    println!("Option queries: {}", report.queries);
    if report.interrupted {
        println!("⚠ Replay interrupted before the end of input");
    }
}
