//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every reading is stamped with a [`Tick`]: a 100 ns offset from the
//!   session-wide FeedStart epoch captured by [`FeedClock`]
//! - Ticks order the sample buffers and drive throttling; wall-clock time is
//!   only consulted by the clock itself and by replay scheduling

mod averaging;
mod channel;
mod config;
mod error;
mod fusion;
mod policy;
mod source;
mod time;
mod values;

pub use averaging::Averageable;
pub use channel::ChannelKind;
pub use config::*;
pub use error::*;
pub use fusion::*;
pub use policy::AveragingPolicy;
pub use source::{FusedUpdateCallback, NotifyCallback, ReadingCallback};
pub use time::*;
pub use values::{Location, Quaternion, Vec3};
