//! Throttled sensor channel.
//!
//! One buffer and one policy behind a single mutex. `record` appends and,
//! when the notify interval has elapsed on the sample clock, re-evaluates the
//! policy and invokes the registered callbacks after the lock is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;

use contracts::{
    ticks_from_duration, ticks_from_millis, Averageable, AveragingPolicy, ChannelConfig,
    ChannelKind, NotifyCallback, Tick,
};
use tracing::{debug, instrument, trace};

use crate::buffer::SampleBuffer;
use crate::error::{ChannelError, Result};
use crate::policy::evaluate;

/// Default notification interval
pub const DEFAULT_MIN_NOTIFY_INTERVAL: Duration = Duration::from_millis(100);

/// Channel counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    pub kind: ChannelKind,
    /// Readings passed to `record`
    pub received: u64,
    /// Notifications fired
    pub notifications: u64,
    /// Readings currently buffered
    pub buffered: usize,
    pub capacity: Option<usize>,
    /// Readings evicted by capacity
    pub dropped: u64,
    /// Readings that arrived older than the newest buffered one
    pub out_of_order: u64,
    /// Tick of the newest buffered reading
    pub last_tick: Option<Tick>,
}

struct ChannelState<T> {
    buffer: SampleBuffer<T>,
    policy: AveragingPolicy,
    min_notify_interval: Tick,
    last_notify: Option<Tick>,
    /// Last averaged value, `None` until the first notification
    current: Option<T>,
    received: u64,
    notifications: u64,
}

/// Buffer + policy pair with rate-limited change notification.
pub struct ThrottledChannel<T> {
    kind: ChannelKind,
    state: Mutex<ChannelState<T>>,
    callbacks: RwLock<Vec<NotifyCallback<T>>>,
    monitoring: AtomicBool,
}

impl<T> std::fmt::Debug for ThrottledChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledChannel")
            .field("kind", &self.kind)
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}

impl<T: Averageable> ThrottledChannel<T> {
    /// Create a channel from its configuration section
    pub fn new(kind: ChannelKind, config: &ChannelConfig) -> Self {
        Self::with_interval_ticks(
            kind,
            config.capacity,
            config.policy,
            ticks_from_millis(config.min_notify_interval_ms),
        )
    }

    pub fn with_settings(
        kind: ChannelKind,
        capacity: Option<usize>,
        policy: AveragingPolicy,
        min_notify_interval: Duration,
    ) -> Self {
        Self::with_interval_ticks(
            kind,
            capacity,
            policy,
            ticks_from_duration(min_notify_interval),
        )
    }

    fn with_interval_ticks(
        kind: ChannelKind,
        capacity: Option<usize>,
        policy: AveragingPolicy,
        min_notify_interval: Tick,
    ) -> Self {
        Self {
            kind,
            state: Mutex::new(ChannelState {
                buffer: SampleBuffer::new(capacity),
                policy,
                min_notify_interval,
                last_notify: None,
                current: None,
                received: 0,
                notifications: 0,
            }),
            callbacks: RwLock::new(Vec::new()),
            monitoring: AtomicBool::new(false),
        }
    }

    /// Register a change callback. Callbacks fire in registration order.
    pub fn on_notify(&self, callback: NotifyCallback<T>) {
        self.callbacks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(callback);
    }

    /// Buffer a reading and notify if the interval has elapsed.
    ///
    /// `tick` is the reading's own timestamp and is also the clock the
    /// throttle runs on. Returns whether a notification fired.
    #[instrument(
        name = "channel_record",
        level = "trace",
        skip(self, value),
        fields(channel = %self.kind)
    )]
    pub fn record(&self, value: T, tick: Tick) -> bool {
        let (notified, depth) = {
            let mut state = self.lock();
            state.received += 1;
            state.buffer.append(value, tick);

            let due = match state.last_notify {
                None => true,
                Some(last) => {
                    state.min_notify_interval == 0
                        || tick >= last.saturating_add(state.min_notify_interval)
                }
            };

            let notified = if due {
                let averaged = evaluate(&state.policy, &state.buffer, tick);
                state.current = Some(averaged.clone());
                state.last_notify = Some(tick);
                state.notifications += 1;
                Some(averaged)
            } else {
                None
            };
            (notified, state.buffer.len())
        };

        observability::record_sample_received(self.kind);
        observability::record_buffer_depth(self.kind, depth);

        let Some(value) = notified else {
            trace!(tick, "buffered without notification");
            return false;
        };

        observability::record_notification(self.kind);
        let callbacks = self
            .callbacks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for callback in callbacks {
            callback(&value, tick);
        }
        true
    }

    /// Last averaged value, or the newest raw reading if never averaged.
    pub fn current_value(&self) -> T {
        let state = self.lock();
        match &state.current {
            Some(v) => v.clone(),
            None => state
                .buffer
                .latest()
                .map(|(_, v)| v.clone())
                .unwrap_or_else(T::zero),
        }
    }

    /// Newest `n` raw readings with their ticks, oldest first
    pub fn recent(&self, n: usize) -> Vec<(Tick, T)> {
        let state = self.lock();
        let skip = state.buffer.len().saturating_sub(n);
        state
            .buffer
            .iter()
            .skip(skip)
            .map(|(t, v)| (t, v.clone()))
            .collect()
    }

    /// Copy of the buffered readings
    pub fn buffer_snapshot(&self) -> SampleBuffer<T> {
        self.lock().buffer.clone()
    }

    pub fn set_policy(&self, policy: AveragingPolicy) -> Result<()> {
        self.ensure_idle("policy")?;
        self.lock().policy = policy;
        debug!(channel = %self.kind, %policy, "policy changed");
        Ok(())
    }

    /// Change capacity; shrinking evicts the oldest readings under the lock.
    pub fn set_capacity(&self, capacity: Option<usize>) -> Result<()> {
        self.ensure_idle("capacity")?;
        self.lock().buffer.set_capacity(capacity);
        debug!(channel = %self.kind, ?capacity, "capacity changed");
        Ok(())
    }

    pub fn set_min_notify_interval(&self, interval: Duration) -> Result<()> {
        self.ensure_idle("min_notify_interval")?;
        self.lock().min_notify_interval = ticks_from_duration(interval);
        debug!(channel = %self.kind, ?interval, "notify interval changed");
        Ok(())
    }
}

impl<T> ThrottledChannel<T> {
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn policy(&self) -> AveragingPolicy {
        self.lock().policy
    }

    pub fn capacity(&self) -> Option<usize> {
        self.lock().buffer.capacity()
    }

    /// Mark the channel as fed by a running source.
    pub fn begin_monitoring(&self) -> Result<()> {
        if self.monitoring.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::AlreadyMonitoring { channel: self.kind });
        }
        debug!(channel = %self.kind, "monitoring started");
        Ok(())
    }

    /// Idempotent
    pub fn end_monitoring(&self) {
        if self.monitoring.swap(false, Ordering::SeqCst) {
            debug!(channel = %self.kind, "monitoring stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> ChannelStats {
        let state = self.lock();
        ChannelStats {
            kind: self.kind,
            received: state.received,
            notifications: state.notifications,
            buffered: state.buffer.len(),
            capacity: state.buffer.capacity(),
            dropped: state.buffer.dropped_count(),
            out_of_order: state.buffer.out_of_order_count(),
            last_tick: state.buffer.latest().map(|(t, _)| t),
        }
    }

    /// Buffered readings newer than `tick`
    pub fn readings_since(&self, tick: Tick) -> usize {
        self.lock().buffer.count_after(tick)
    }

    fn ensure_idle(&self, setting: &'static str) -> Result<()> {
        if self.is_monitoring() {
            return Err(ChannelError::Monitoring {
                channel: self.kind,
                setting,
            });
        }
        Ok(())
    }

    // Every critical section leaves the state consistent, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, ChannelState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
