//! PipelineConfig - Config Loader 输出
//!
//! 描述一次会话的完整配置：单位设置、各通道缓冲策略、回放数据源。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ChannelKind, DistanceUnits, AveragingPolicy};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的会话配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 会话设置
    #[serde(default)]
    pub session: SessionConfig,

    /// 通道配置
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// 回放配置 (可选)
    #[serde(default)]
    pub replay: Option<ReplayConfig>,
}

/// 会话设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 距离单位
    #[serde(default)]
    pub distance_units: DistanceUnits,

    /// 融合事件最小间隔 (毫秒)，0 表示每次更新都发出
    #[serde(default)]
    pub fused_min_interval_ms: u64,
}

/// 四个通道的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub acceleration: ChannelConfig,

    #[serde(default)]
    pub orientation: ChannelConfig,

    #[serde(default)]
    pub location: ChannelConfig,

    #[serde(default = "ChannelConfig::heading")]
    pub heading: ChannelConfig,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            acceleration: ChannelConfig::default(),
            orientation: ChannelConfig::default(),
            location: ChannelConfig::default(),
            heading: ChannelConfig::heading(),
        }
    }
}

impl ChannelsConfig {
    pub fn get(&self, kind: ChannelKind) -> &ChannelConfig {
        match kind {
            ChannelKind::Acceleration => &self.acceleration,
            ChannelKind::Orientation => &self.orientation,
            ChannelKind::Location => &self.location,
            ChannelKind::Heading => &self.heading,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelKind, &ChannelConfig)> {
        ChannelKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// 单个通道配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// 缓冲区容量，None 表示不限 (不淘汰)
    #[serde(default = "default_capacity")]
    pub capacity: Option<usize>,

    /// 平均策略
    #[serde(default)]
    pub policy: AveragingPolicy,

    /// 通知最小间隔 (毫秒)，0 表示每次记录都通知
    #[serde(default = "default_min_notify_interval_ms")]
    pub min_notify_interval_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            policy: AveragingPolicy::default(),
            min_notify_interval_ms: default_min_notify_interval_ms(),
        }
    }
}

impl ChannelConfig {
    /// 航向通道默认不做平均
    pub fn heading() -> Self {
        Self {
            policy: AveragingPolicy::MostRecent,
            ..Self::default()
        }
    }
}

fn default_capacity() -> Option<usize> {
    Some(1000)
}

fn default_min_notify_interval_ms() -> u64 {
    100
}

/// 回放配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// 录制文件所在目录
    pub directory: PathBuf,

    /// 回放速度倍率 (1.0 = 原速)
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// 各通道录制文件名
    #[serde(default)]
    pub files: ReplayFiles,
}

fn default_speed() -> f64 {
    1.0
}

/// 各通道录制文件名 (相对 `directory`)，缺省为 `<通道>.csv`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayFiles {
    #[serde(default)]
    pub acceleration: Option<String>,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub heading: Option<String>,
}

impl ReplayFiles {
    /// 通道对应的文件名
    pub fn file_name(&self, kind: ChannelKind) -> String {
        let explicit = match kind {
            ChannelKind::Acceleration => &self.acceleration,
            ChannelKind::Orientation => &self.orientation,
            ChannelKind::Location => &self.location,
            ChannelKind::Heading => &self.heading,
        };
        explicit
            .clone()
            .unwrap_or_else(|| format!("{}.csv", kind.as_str()))
    }
}

impl ReplayConfig {
    /// 通道对应的完整路径
    pub fn path_for(&self, kind: ChannelKind) -> PathBuf {
        self.directory.join(self.files.file_name(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.channels.acceleration.capacity, Some(1000));
        assert_eq!(cfg.channels.acceleration.min_notify_interval_ms, 100);
        assert_eq!(cfg.channels.orientation.policy, AveragingPolicy::RecencyWeighted);
        assert_eq!(cfg.channels.heading.policy, AveragingPolicy::MostRecent);
        assert_eq!(cfg.session.fused_min_interval_ms, 0);
    }

    #[test]
    fn test_null_capacity_is_unbounded() {
        let cfg: ChannelConfig = serde_json::from_str(r#"{ "capacity": null }"#).unwrap();
        assert_eq!(cfg.capacity, None);
        let cfg: ChannelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.capacity, Some(1000));
    }

    #[test]
    fn test_replay_paths() {
        let replay = ReplayConfig {
            directory: PathBuf::from("/data"),
            speed: 1.0,
            files: ReplayFiles {
                location: Some("gps.json".into()),
                ..Default::default()
            },
        };
        assert_eq!(replay.path_for(ChannelKind::Acceleration), PathBuf::from("/data/acceleration.csv"));
        assert_eq!(replay.path_for(ChannelKind::Location), PathBuf::from("/data/gps.json"));
    }
}
