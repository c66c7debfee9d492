//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::AnnotatorConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    depth_units: DepthUnitsInfo,
    pipeline: PipelineInfo,
    observability: ObservabilityInfo,
}

#[derive(Serialize)]
struct DepthUnitsInfo {
    default: f32,
    option_id: String,
    metadata_path: Vec<String>,
    /// Resolution order applied to every frame
    fallback_chain: Vec<String>,
}

#[derive(Serialize)]
struct PipelineInfo {
    channel_capacity: usize,
    drop_policy: String,
}

#[derive(Serialize)]
struct ObservabilityInfo {
    log_format: String,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn fallback_chain(config: &AnnotatorConfig) -> Vec<String> {
    let depth_units = &config.depth_units;
    vec![
        format!("metadata field {}", depth_units.metadata_path),
        format!("option '{}' last known value", depth_units.option_id),
        format!("option '{}' query", depth_units.option_id),
        format!("default {}", depth_units.default_units()),
    ]
}

fn build_config_info(config: &AnnotatorConfig) -> ConfigInfo {
    let depth_units = &config.depth_units;

    ConfigInfo {
        depth_units: DepthUnitsInfo {
            default: depth_units.default,
            option_id: depth_units.option_id.to_string(),
            metadata_path: depth_units.metadata_path.segments().to_vec(),
            fallback_chain: fallback_chain(config),
        },
        pipeline: PipelineInfo {
            channel_capacity: config.pipeline.channel_capacity,
            drop_policy: format!("{:?}", config.pipeline.drop_policy),
        },
        observability: ObservabilityInfo {
            log_format: format!("{:?}", config.observability.log_format),
            log_level: config.observability.log_level.clone(),
            metrics_port: config.observability.metrics_port,
        },
    }
}

fn print_config_info(config: &AnnotatorConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Depth Units Annotation Configuration           ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📏 Depth Units");
    println!("   ├─ Default: {}", config.depth_units.default);
    println!("   ├─ Option: {}", config.depth_units.option_id);
    println!("   ├─ Metadata field: {}", config.depth_units.metadata_path);
    println!("   └─ Fallback chain:");
    let chain = fallback_chain(config);
    for (i, link) in chain.iter().enumerate() {
        let prefix = if i == chain.len() - 1 { "└─" } else { "├─" };
        println!("      {} {}. {}", prefix, i + 1, link);
    }

    println!("\n⚙️  Pipeline");
    println!("   ├─ Channel capacity: {}", config.pipeline.channel_capacity);
    println!("   └─ Drop policy: {:?}", config.pipeline.drop_policy);

    let obs = &config.observability;
    println!("\n📊 Observability");
    println!("   ├─ Log format: {:?}", obs.log_format);
    println!("   ├─ Log level: {}", obs.log_level);
    match obs.metrics_port {
        Some(port) => println!("   └─ Metrics port: {}", port),
        None => println!("   └─ Metrics: disabled"),
    }

    println!();
}
