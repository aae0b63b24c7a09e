//! Ingestion 错误类型

use contracts::ChannelKind;
use fusion_engine::ChannelError;
use replay::ReplayError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 通道已绑定数据源
    #[error("{channel} channel already has a source bound")]
    SourceAlreadyBound {
        /// 通道
        channel: ChannelKind,
    },

    /// 通道未绑定数据源
    #[error("{channel} channel has no source bound")]
    NotBound {
        /// 通道
        channel: ChannelKind,
    },

    /// 通道配置被拒绝
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// 回放启动失败
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
