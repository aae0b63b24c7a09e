//! 数据源
//!
//! 每个通道在绑定时选择一种数据源：实时推送或录制回放。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{Averageable, ChannelKind, FeedClock, ReadingCallback, Sample, Tick};
use fusion_engine::ThrottledChannel;
use replay::{ReplayDriver, ReplaySession};
use tracing::{debug, trace};

/// 通道数据源选择
#[derive(Debug)]
pub enum SampleSource<T> {
    /// 由设备适配器通过 [`LiveHandle`] 推送
    Live,
    /// 按录制时间间隔回放
    Replay(ReplaySession<T>),
}

/// 绑定后的数据源
#[derive(Debug)]
pub enum BoundSource<T> {
    Live(LiveHandle<T>),
    Replay(Arc<ReplayDriver>),
}

impl<T> BoundSource<T> {
    pub fn into_live(self) -> Option<LiveHandle<T>> {
        match self {
            BoundSource::Live(handle) => Some(handle),
            BoundSource::Replay(_) => None,
        }
    }

    pub fn into_replay(self) -> Option<Arc<ReplayDriver>> {
        match self {
            BoundSource::Replay(driver) => Some(driver),
            BoundSource::Live(_) => None,
        }
    }
}

/// 实时推送句柄
///
/// 以会话 FeedClock 为读数打时间戳并写入通道。可克隆，所有副本共享监听状态。
pub struct LiveHandle<T> {
    channel: Arc<ThrottledChannel<T>>,
    clock: FeedClock,
    listening: Arc<AtomicBool>,
}

impl<T> Clone for LiveHandle<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            clock: self.clock,
            listening: self.listening.clone(),
        }
    }
}

impl<T> std::fmt::Debug for LiveHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHandle")
            .field("channel", &self.channel.kind())
            .field("listening", &self.is_listening())
            .finish()
    }
}

impl<T: Averageable> LiveHandle<T> {
    pub(crate) fn new(
        channel: Arc<ThrottledChannel<T>>,
        clock: FeedClock,
        listening: Arc<AtomicBool>,
    ) -> Self {
        Self {
            channel,
            clock,
            listening,
        }
    }

    /// 以当前 FeedClock 时间推送读数，返回是否触发了通知
    pub fn push(&self, value: T) -> bool {
        self.push_at(value, self.clock.ticks_since_start())
    }

    /// 以给定 tick 推送读数
    pub fn push_at(&self, value: T, tick: Tick) -> bool {
        if !self.listening.load(Ordering::Relaxed) {
            trace!(channel = %self.channel.kind(), "live source stopped, reading dropped");
            metrics::counter!(
                "kinefeed_live_readings_dropped_total",
                "channel" => self.channel.kind().as_str()
            )
            .increment(1);
            return false;
        }
        self.channel.record(value, tick)
    }

    /// `onReading(value, tick)` 形式的回调
    pub fn callback(&self) -> ReadingCallback<T> {
        let handle = self.clone();
        Arc::new(move |sample: Sample<T>| {
            handle.push_at(sample.value, sample.tick);
        })
    }
}

impl<T> LiveHandle<T> {
    pub fn channel(&self) -> ChannelKind {
        self.channel.kind()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    /// 停止推送并释放通道 (幂等)
    pub fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(channel = %self.channel.kind(), "live source stopped");
            self.channel.end_monitoring();
        }
    }
}
