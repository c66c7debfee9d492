//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AnnotatorConfig, DepthUnits, DropPolicy, MetadataPath, OptionId};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    default_depth_units: f32,
    option_id: String,
    metadata_path: String,
    channel_capacity: usize,
    drop_policy: DropPolicy,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(CliError::config_not_found(&args.config).to_string()),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let depth_units = &config.depth_units;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    default_depth_units: depth_units.default,
                    option_id: depth_units.option_id.to_string(),
                    metadata_path: depth_units.metadata_path.to_string(),
                    channel_capacity: config.pipeline.channel_capacity,
                    drop_policy: config.pipeline.drop_policy,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &AnnotatorConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let depth_units = &config.depth_units;

    if depth_units.default != DepthUnits::DEFAULT.get() {
        warnings.push(format!(
            "depth_units.default is {} - frames without metadata or option will not use 1 mm units",
            depth_units.default
        ));
    }

    if depth_units.option_id != OptionId::depth_units() {
        warnings.push(format!(
            "depth_units.option_id '{}' is not the standard '{}' option",
            depth_units.option_id,
            OptionId::DEPTH_UNITS
        ));
    }

    if depth_units.metadata_path != MetadataPath::depth_units() {
        warnings.push(format!(
            "depth_units.metadata_path '{}' differs from '{}'",
            depth_units.metadata_path,
            MetadataPath::depth_units()
        ));
    }

    if config.pipeline.channel_capacity == 1 {
        warnings.push("pipeline.channel_capacity is 1 - bursts will drop frames".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Default depth units: {}", summary.default_depth_units);
            println!("  Option: {}", summary.option_id);
            println!("  Metadata field: {}", summary.metadata_path);
            println!("  Channel capacity: {}", summary.channel_capacity);
            println!("  Drop policy: {:?}", summary.drop_policy);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn args_for(path: PathBuf) -> ValidateArgs {
        ValidateArgs { config: path, json: false }
    }

    #[test]
    fn test_valid_config_without_warnings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[depth_units]\ndefault = 0.001").unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(result.valid);
        assert!(result.warnings.is_none());
        assert_eq!(result.summary.unwrap().metadata_path, "header.depth-units");
    }

    #[test]
    fn test_non_standard_settings_warn() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[depth_units]\ndefault = 0.0001\nmetadata_path = [\"frame\", \"units\"]\n\n[pipeline]\nchannel_capacity = 1"
        )
        .unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(result.valid);
        assert_eq!(result.warnings.unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_default_reported() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"depth_units": {{"default": -1.0}}}}"#).unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&args_for(PathBuf::from("/nonexistent/config.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
