//! Channel error definitions

use contracts::ChannelKind;
use thiserror::Error;

/// Channel configuration misuse
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// Reconfiguration attempted while a source is feeding the channel
    #[error("cannot set {setting} of {channel} channel while it is actively monitoring")]
    Monitoring {
        channel: ChannelKind,
        setting: &'static str,
    },

    /// A source is already feeding the channel
    #[error("{channel} channel is already monitoring")]
    AlreadyMonitoring { channel: ChannelKind },
}

pub type Result<T> = std::result::Result<T, ChannelError>;
