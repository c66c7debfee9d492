//! 配置校验模块
//!
//! 校验规则：
//! - depth_units.default 为有限值且 > 0
//! - depth_units.option_id 非空
//! - depth_units.metadata_path 非空，且不含空段
//! - pipeline.channel_capacity > 0
//! - observability.log_level 非空

use contracts::{AnnotatorConfig, ContractError, DepthUnits};

/// 校验 AnnotatorConfig
///
/// 返回遇到的第一个错误，全部通过时返回 Ok(())。
pub fn validate(config: &AnnotatorConfig) -> Result<(), ContractError> {
    validate_default(config)?;
    validate_option_id(config)?;
    validate_metadata_path(config)?;
    validate_pipeline(config)?;
    validate_observability(config)?;
    Ok(())
}

fn validate_default(config: &AnnotatorConfig) -> Result<(), ContractError> {
    let value = config.depth_units.default;
    DepthUnits::new(value).map(|_| ()).map_err(|_| {
        ContractError::config_validation(
            "depth_units.default",
            format!("default must be finite and > 0, got {value}"),
        )
    })
}

fn validate_option_id(config: &AnnotatorConfig) -> Result<(), ContractError> {
    if config.depth_units.option_id.as_str().trim().is_empty() {
        return Err(ContractError::config_validation(
            "depth_units.option_id",
            "option_id must not be empty",
        ));
    }
    Ok(())
}

fn validate_metadata_path(config: &AnnotatorConfig) -> Result<(), ContractError> {
    let path = &config.depth_units.metadata_path;
    if path.is_empty() {
        return Err(ContractError::config_validation(
            "depth_units.metadata_path",
            "metadata_path must have at least one segment",
        ));
    }
    if let Some(index) = path.segments().iter().position(|s| s.is_empty()) {
        return Err(ContractError::config_validation(
            format!("depth_units.metadata_path[{index}]"),
            "path segments must not be empty",
        ));
    }
    Ok(())
}

fn validate_pipeline(config: &AnnotatorConfig) -> Result<(), ContractError> {
    if config.pipeline.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "pipeline.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_observability(config: &AnnotatorConfig) -> Result<(), ContractError> {
    if config.observability.log_level.trim().is_empty() {
        return Err(ContractError::config_validation(
            "observability.log_level",
            "log_level must not be empty",
        ));
    }
    Ok(())
}
