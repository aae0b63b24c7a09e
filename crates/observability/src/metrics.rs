//! 通道与融合引擎指标收集模块
//!
//! 基于 FusionSnapshot 收集和统计融合引擎的运行指标。

use std::collections::HashMap;

use contracts::{ChannelKind, FusionPhase, FusionSnapshot};
use metrics::{counter, gauge, histogram};

/// 从 FusionSnapshot 记录指标
///
/// 每次融合引擎发出更新时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_fused_update;
///
/// engine.on_fused_update(Arc::new(|snapshot| record_fused_update(snapshot)));
/// ```
pub fn record_fused_update(snapshot: &FusionSnapshot) {
    let phase = phase_label(snapshot.phase);

    // 更新计数器
    counter!("kinefeed_fused_updates_total", "phase" => phase).increment(1);

    // 序号 (用于检测丢失的更新)
    gauge!("kinefeed_fused_last_sequence").set(snapshot.sequence as f64);

    // 水平加速度 (G)
    histogram!("kinefeed_horizontal_accel_g").record(snapshot.state.horizontal_accel);
    gauge!("kinefeed_horizontal_accel_g_current").set(snapshot.state.horizontal_accel);

    // 姿态角 (度)
    gauge!("kinefeed_roll_degrees").set(snapshot.state.roll_degrees());
    gauge!("kinefeed_pitch_degrees").set(snapshot.state.pitch_degrees());
    gauge!("kinefeed_yaw_degrees").set(snapshot.state.yaw_degrees());

    // 速度
    gauge!("kinefeed_speed").set(snapshot.state.speed);
}

/// 记录通道原始读数接收
pub fn record_sample_received(channel: ChannelKind) {
    counter!(
        "kinefeed_samples_received_total",
        "channel" => channel.as_str()
    )
    .increment(1);
}

/// 记录通道节流通知
pub fn record_notification(channel: ChannelKind) {
    counter!(
        "kinefeed_channel_notifications_total",
        "channel" => channel.as_str()
    )
    .increment(1);
}

/// 记录缓冲区深度
pub fn record_buffer_depth(channel: ChannelKind, depth: usize) {
    gauge!(
        "kinefeed_buffer_depth",
        "channel" => channel.as_str()
    )
    .set(depth as f64);
}

/// 记录回放送达的读数
pub fn record_replay_delivered(channel: ChannelKind, delivered: usize) {
    counter!(
        "kinefeed_replay_delivered_total",
        "channel" => channel.as_str()
    )
    .increment(delivered as u64);
}

fn phase_label(phase: FusionPhase) -> &'static str {
    match phase {
        FusionPhase::Idle => "idle",
        FusionPhase::Partial => "partial",
        FusionPhase::Active => "active",
    }
}

/// 融合指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct FusionStatsAggregator {
    /// 总更新数
    pub total_updates: u64,

    /// Partial 阶段发出的更新数
    pub partial_updates: u64,

    /// 水平加速度统计 (G)
    pub horizontal_accel_stats: RunningStats,

    /// 速度统计
    pub speed_stats: RunningStats,

    /// 各通道送达读数
    pub delivered: HashMap<ChannelKind, u64>,
}

impl FusionStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, snapshot: &FusionSnapshot) {
        self.total_updates += 1;
        if snapshot.phase == FusionPhase::Partial {
            self.partial_updates += 1;
        }

        self.horizontal_accel_stats
            .push(snapshot.state.horizontal_accel);
        self.speed_stats.push(snapshot.state.speed);
    }

    /// 记录通道送达数量
    pub fn record_delivered(&mut self, channel: ChannelKind, delivered: usize) {
        *self.delivered.entry(channel).or_insert(0) += delivered as u64;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> FusionSummary {
        FusionSummary {
            total_updates: self.total_updates,
            partial_updates: self.partial_updates,
            horizontal_accel_g: StatsSummary::from(&self.horizontal_accel_stats),
            speed: StatsSummary::from(&self.speed_stats),
            delivered: self.delivered.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct FusionSummary {
    pub total_updates: u64,
    pub partial_updates: u64,
    pub horizontal_accel_g: StatsSummary,
    pub speed: StatsSummary,
    pub delivered: HashMap<ChannelKind, u64>,
}

impl std::fmt::Display for FusionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fusion Summary ===")?;
        writeln!(f, "Fused updates: {}", self.total_updates)?;
        writeln!(f, "Updates before all channels reported: {}", self.partial_updates)?;
        writeln!(f, "Horizontal accel (G): {}", self.horizontal_accel_g)?;
        writeln!(f, "Speed: {}", self.speed)?;

        if !self.delivered.is_empty() {
            writeln!(f, "Delivered readings:")?;
            let mut channels: Vec<_> = self.delivered.iter().collect();
            channels.sort();
            for (channel, count) in channels {
                writeln!(f, "  {}: {}", channel, count)?;
            }
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
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
