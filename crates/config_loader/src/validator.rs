//! 配置校验模块
//!
//! 校验规则：
//! - count_window.size > 0
//! - time_window.window_ms > 0
//! - 通道容量 (若设置) > 0
//! - 回放速度为正的有限值
//! - 回放目录非空
//! - 各通道回放文件名互不相同

use std::collections::HashSet;

use contracts::{AveragingPolicy, ChannelKind, ContractError, PipelineConfig, ReplayConfig};

/// 校验 PipelineConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &PipelineConfig) -> Result<(), ContractError> {
    for (kind, channel) in config.channels.iter() {
        validate_policy(kind, &channel.policy)?;
        validate_capacity(kind, channel.capacity)?;
    }
    if let Some(replay) = &config.replay {
        validate_replay_speed(replay)?;
        validate_replay_files(replay)?;
    }
    Ok(())
}

/// 校验平均窗口
fn validate_policy(kind: ChannelKind, policy: &AveragingPolicy) -> Result<(), ContractError> {
    match *policy {
        AveragingPolicy::CountWindow { size: 0 } => Err(ContractError::config_validation(
            format!("channels.{kind}.policy.size"),
            "count window size must be > 0",
        )),
        AveragingPolicy::TimeWindow { window_ms: 0 } => Err(ContractError::config_validation(
            format!("channels.{kind}.policy.window_ms"),
            "time window must be > 0 ms",
        )),
        _ => Ok(()),
    }
}

/// 校验缓冲区容量
fn validate_capacity(kind: ChannelKind, capacity: Option<usize>) -> Result<(), ContractError> {
    if capacity == Some(0) {
        return Err(ContractError::config_validation(
            format!("channels.{kind}.capacity"),
            "capacity must be > 0 (omit it with null for an unbounded buffer)",
        ));
    }
    Ok(())
}

/// 校验回放速度
fn validate_replay_speed(replay: &ReplayConfig) -> Result<(), ContractError> {
    if !replay.speed.is_finite() || replay.speed <= 0.0 {
        return Err(ContractError::config_validation(
            "replay.speed",
            format!("speed must be a positive finite number, got {}", replay.speed),
        ));
    }
    Ok(())
}

/// 校验回放目录与文件名
fn validate_replay_files(replay: &ReplayConfig) -> Result<(), ContractError> {
    if replay.directory.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "replay.directory",
            "replay directory cannot be empty",
        ));
    }

    let mut seen = HashSet::new();
    for kind in ChannelKind::ALL {
        let name = replay.files.file_name(kind);
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("replay.files.{kind}"),
                "file name cannot be empty",
            ));
        }
        if !seen.insert(name.clone()) {
            return Err(ContractError::config_validation(
                format!("replay.files.{kind}"),
                format!("file '{name}' is already used by another channel"),
            ));
        }
    }
    Ok(())
}
