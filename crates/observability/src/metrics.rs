//! 深度单位指标模块
//!
//! 基于 `metrics` facade 的每流指标句柄，以及用于回放汇总的内存聚合器。
//! 未安装 recorder 时所有句柄均为空操作。

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};

/// 单个流的指标句柄
///
/// 标签只在构造时分配一次，之后每帧的记录不再分配内存。
/// 句柄从构造时安装的 recorder 取得，因此应在 recorder 安装之后创建。
///
/// # Example
///
/// ```ignore
/// use observability::StreamMetrics;
///
/// let metrics = StreamMetrics::new("depth", &["metadata", "default"]);
/// metrics.record_depth_units("metadata", 0.0001);
/// ```
#[derive(Clone)]
pub struct StreamMetrics {
    stream_id: Arc<str>,
    /// 按来源区分的解析计数
    resolved: Vec<(&'static str, Counter)>,
    current: Gauge,
    decode_failures: Counter,
    rejected: Counter,
    dropped: Counter,
    queue_depth: Gauge,
    queue_depth_hist: Histogram,
}

impl StreamMetrics {
    /// 为 `stream_id` 注册全部指标，`sources` 为预先注册的来源标签
    pub fn new(stream_id: &str, sources: &[&'static str]) -> Self {
        let stream_id: Arc<str> = Arc::from(stream_id);
        let label = stream_id.to_string();

        let resolved = sources
            .iter()
            .map(|&source| {
                let counter = counter!(
                    "depth_units_resolved_total",
                    "stream_id" => label.clone(),
                    "source" => source
                );
                (source, counter)
            })
            .collect();

        Self {
            resolved,
            current: gauge!("depth_units_current", "stream_id" => label.clone()),
            decode_failures: counter!(
                "depth_units_metadata_decode_failures_total",
                "stream_id" => label.clone()
            ),
            rejected: counter!("depth_units_metadata_rejected_total", "stream_id" => label.clone()),
            dropped: counter!("annotation_frames_dropped_total", "stream_id" => label.clone()),
            queue_depth: gauge!("annotation_queue_depth", "stream_id" => label),
            queue_depth_hist: histogram!("annotation_queue_depth_hist"),
            stream_id,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// 记录写入帧的深度单位及其来源
    pub fn record_depth_units(&self, source: &'static str, value: f32) {
        match self.resolved.iter().find(|(label, _)| *label == source) {
            Some((_, counter)) => counter.increment(1),
            // 未预先注册的来源: 退回到逐次注册
            None => counter!(
                "depth_units_resolved_total",
                "stream_id" => self.stream_id.to_string(),
                "source" => source
            )
            .increment(1),
        }
        self.current.set(f64::from(value));
    }

    /// 元数据字段存在但不是数字
    pub fn record_metadata_decode_failure(&self) {
        self.decode_failures.increment(1);
    }

    /// 元数据解码成功但不是有限正数
    pub fn record_metadata_rejected(&self) {
        self.rejected.increment(1);
    }

    /// 队列已满导致丢弃一帧
    pub fn record_frame_dropped(&self) {
        self.dropped.increment(1);
    }

    /// 当前队列深度
    pub fn record_queue_depth(&self, depth: usize) {
        self.queue_depth.set(depth as f64);
        self.queue_depth_hist.record(depth as f64);
    }
}

impl fmt::Debug for StreamMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamMetrics")
            .field("stream_id", &self.stream_id)
            .field("sources", &self.resolved.iter().map(|(s, _)| *s).collect::<Vec<_>>())
            .finish()
    }
}

/// 深度单位聚合器
///
/// 每个流的取值统计，以及由标注计数器汇入的按来源计数。
#[derive(Debug, Clone, Default)]
pub struct DepthUnitsAggregator {
    /// 已观测帧数
    pub total_frames: u64,

    /// 每个来源的帧数
    pub source_counts: BTreeMap<String, u64>,

    /// 每个流的深度单位统计
    pub stream_stats: HashMap<String, RunningStats>,
}

impl DepthUnitsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧标注后的取值
    pub fn observe(&mut self, stream_id: &str, value: f32) {
        self.total_frames += 1;
        self.stream_stats
            .entry(stream_id.to_string())
            .or_default()
            .push(f64::from(value));
    }

    /// 累加来自 `source` 的帧数
    pub fn add_source_count(&mut self, source: &str, count: u64) {
        *self.source_counts.entry(source.to_string()).or_insert(0) += count;
    }

    pub fn summary(&self) -> DepthUnitsSummary {
        let mut streams: Vec<_> = self
            .stream_stats
            .iter()
            .map(|(id, stats)| (id.clone(), StatsSummary::from(stats)))
            .collect();
        streams.sort_by(|a, b| a.0.cmp(&b.0));

        DepthUnitsSummary {
            total_frames: self.total_frames,
            source_counts: self.source_counts.clone(),
            streams,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 深度单位汇总
#[derive(Debug, Clone, Default)]
pub struct DepthUnitsSummary {
    pub total_frames: u64,
    pub source_counts: BTreeMap<String, u64>,
    pub streams: Vec<(String, StatsSummary)>,
}

impl DepthUnitsSummary {
    /// 来自 `source` 的帧占比 (百分比)
    pub fn source_rate(&self, source: &str) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        let count = self.source_counts.get(source).copied().unwrap_or(0);
        count as f64 / self.total_frames as f64 * 100.0
    }
}

impl fmt::Display for DepthUnitsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Depth Units Summary ===")?;
        writeln!(f, "Total frames: {}", self.total_frames)?;
        for (source, count) in &self.source_counts {
            writeln!(f, "  {}: {} ({:.2}%)", source, count, self.source_rate(source))?;
        }
        for (stream, stats) in &self.streams {
            writeln!(f, "Stream {}: {}", stream, stats)?;
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={}, max={}, mean={:.6} (n={})",
                self.min, self.max, self.mean, self.count
            )
        }
    }
}

/// 在线统计 min/max/mean (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            self.mean += (value - self.mean) / self.count as f64;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
