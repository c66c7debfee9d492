//! # Observability
//!
//! 可观测性模块：标注阶段的 Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 每流深度单位指标句柄与内存聚合
//!
//! ## 使用示例
//!
//! ```ignore
//! use contracts::ObservabilitySettings;
//!
//! // 初始化
//! observability::init_with_config(&ObservabilitySettings::default())?;
//!
//! // 每个流创建一次句柄，每帧复用
//! let metrics = observability::StreamMetrics::new("depth", &["metadata", "default"]);
//! metrics.record_depth_units("metadata", 0.0001);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use contracts::{LogFormat, ObservabilitySettings};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    DepthUnitsAggregator, DepthUnitsSummary, RunningStats, StatsSummary, StreamMetrics,
};

/// 初始化 Tracing，配置了端口时同时启动 Prometheus 导出
///
/// `RUST_LOG` 环境变量优先于 `settings.log_level`。
pub fn init_with_config(settings: &ObservabilitySettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    init_tracing(filter, settings.log_format)?;

    if let Some(port) = settings.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?settings.log_format,
        metrics_port = ?settings.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 按给定过滤器与格式安装 tracing subscriber
pub fn init_tracing(filter: EnvFilter, format: LogFormat) -> Result<()> {
    let fmt_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")
}

/// 仅初始化 Prometheus 指标 (tracing 由调用方初始化)
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ObservabilitySettings::default();
        assert_eq!(settings.metrics_port, None);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }
}
