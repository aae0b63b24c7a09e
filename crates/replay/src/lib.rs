//! # Replay
//!
//! 录制数据的读写与按原始时间间隔回放。
//!
//! - `Recording`: tick → 值 的有序映射，支持 CSV 与 JSON 两种文本格式
//! - `ReplaySession`: 只读回放游标，单调前进
//! - `ReplayDriver`: 在 tokio 任务中按 (缩放后的) 实际耗时将样本写入 `ThrottledChannel`
//!
//! ## 使用示例
//!
//! ```ignore
//! let recording = Recording::<Vec3>::read("acceleration.csv")?;
//! let driver = ReplayDriver::start(recording.into_session(), channel, 1.0)?;
//! let delivered = driver.finish().await;
//! ```

mod driver;
mod error;
mod recording;
mod session;

pub use driver::ReplayDriver;
pub use error::{ReplayError, Result};
pub use recording::{CsvRecord, RecordFormat, Recording, DATA_SPACER};
pub use session::ReplaySession;
