//! Replay 错误定义

use contracts::{ChannelKind, ContractError};
use fusion_engine::ChannelError;
use thiserror::Error;

/// Replay 错误类型
#[derive(Debug, Error)]
pub enum ReplayError {
    /// 回放速度必须为正有限值
    #[error("invalid replay speed {speed}: must be positive and finite")]
    InvalidSpeed { speed: f64 },

    /// 目标通道已被其他数据源占用
    #[error("replay target {channel} is busy: {source}")]
    TargetBusy {
        channel: ChannelKind,
        #[source]
        source: ChannelError,
    },

    /// 录制文件读写失败
    #[error(transparent)]
    Recording(#[from] ContractError),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
