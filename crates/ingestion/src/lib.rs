//! # Ingestion
//!
//! 会话级通道装配。
//!
//! 负责：
//! - 按配置创建四个 `ThrottledChannel` 并接入同一个 `FusionEngine`
//! - 会话 FeedClock (FeedStart 纪元)
//! - 为每个通道绑定实时或回放数据源
//!
//! ## 使用示例
//!
//! ```ignore
//! use ingestion::{FeedSet, SampleSource};
//!
//! let feeds = FeedSet::from_config(&config);
//! feeds.on_fused_update(Arc::new(|snapshot| println!("{:?}", snapshot.state)));
//!
//! let accel = feeds.live::<Vec3>()?;
//! accel.push(Vec3::new(0.0, 0.0, 1.0));
//!
//! feeds.bind::<Quaternion>(SampleSource::Replay(recording.into_session()))?;
//! ```

mod error;
mod feeds;
mod source;

// Re-exports
pub use error::{IngestionError, Result};
pub use feeds::{FeedSet, FeedValue};
pub use source::{BoundSource, LiveHandle, SampleSource};
