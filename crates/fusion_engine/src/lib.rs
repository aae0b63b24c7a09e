//! # Fusion Engine
//!
//! 传感器样本缓冲、平均策略、节流通知与姿态融合。
//!
//! 负责：
//! - 每通道有界、按 tick 排序的样本缓冲 (`SampleBuffer`)
//! - 平均策略求值
//! - 节流变更通知 (`ThrottledChannel`)
//! - 四元数旋转得到地球坐标系加速度 (`FusionEngine`)
//!
//! ## 使用示例
//!
//! ```ignore
//! use std::sync::Arc;
//! use fusion_engine::{FusionEngine, ThrottledChannel};
//!
//! let engine = Arc::new(FusionEngine::new(Arc::new(StaticSettings::default())));
//! let accel = ThrottledChannel::<Vec3>::new(ChannelKind::Acceleration, &config);
//! accel.on_notify(engine.listener());
//!
//! accel.record(Vec3::new(0.0, 0.0, 1.0), tick);
//! ```

mod buffer;
mod channel;
mod engine;
mod error;
mod kinematics;
mod policy;

pub use buffer::SampleBuffer;
pub use channel::{ChannelStats, ThrottledChannel};
pub use engine::{FusionEngine, FusionInput};
pub use error::{ChannelError, Result};
pub use kinematics::{
    absolute_acceleration, accel_from_fixes, euler_angles, haversine_distance,
    horizontal_magnitude, EulerAngles, STANDARD_GRAVITY,
};
pub use policy::evaluate;

// Re-export contracts types
pub use contracts::{AveragingPolicy, FusionPhase, FusionSnapshot, FusionState, Sample, Tick};
