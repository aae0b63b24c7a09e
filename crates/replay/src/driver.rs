//! Timed replay into a throttled channel.
//!
//! Each sample is delivered once `elapsed >= tick / speed`, measured from
//! the moment the driver starts. The stop signal is checked before and after
//! every wait, so a stopped driver never delivers another sample.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{duration_from_ticks, Averageable, ChannelKind, Tick};
use fusion_engine::ThrottledChannel;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::error::{ReplayError, Result};
use crate::session::ReplaySession;

/// Handle to one running replay task.
///
/// Dropping the handle stops the replay.
#[derive(Debug)]
pub struct ReplayDriver {
    channel: ChannelKind,
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<usize>>>,
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicUsize>,
}

impl ReplayDriver {
    /// Spawn the delivery loop. Must be called within a tokio runtime.
    ///
    /// The target is marked as monitoring until the replay ends, so its
    /// policy and capacity cannot be changed underneath it.
    pub fn start<T: Averageable>(
        session: ReplaySession<T>,
        target: Arc<ThrottledChannel<T>>,
        speed: f64,
    ) -> Result<Self> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ReplayError::InvalidSpeed { speed });
        }

        let channel = target.kind();
        target
            .begin_monitoring()
            .map_err(|source| ReplayError::TargetBusy { channel, source })?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let running = Arc::new(AtomicBool::new(true));
        let delivered = Arc::new(AtomicUsize::new(0));

        let handle = tokio::spawn(run(
            session,
            target,
            speed,
            stop_rx,
            running.clone(),
            delivered.clone(),
        ));

        Ok(Self {
            channel,
            stop_tx,
            handle: Mutex::new(Some(handle)),
            running,
            delivered,
        })
    }

    /// Request cancellation. Stopping twice is a no-op.
    pub fn stop(&self) {
        if !self.stop_tx.send_replace(true) {
            debug!(channel = %self.channel, "replay stop requested");
        }
    }

    /// Wait for the task to end and return the number of delivered samples.
    pub async fn finish(&self) -> usize {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        match handle {
            Some(handle) => match handle.await {
                Ok(count) => count,
                Err(e) => {
                    warn!(channel = %self.channel, error = %e, "replay task failed");
                    self.delivered()
                }
            },
            None => self.delivered(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Samples delivered so far
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }
}

fn scaled_offset(tick: Tick, speed: f64) -> Duration {
    let offset = duration_from_ticks(tick);
    if speed == 1.0 {
        return offset;
    }
    Duration::try_from_secs_f64(offset.as_secs_f64() / speed).unwrap_or(Duration::MAX)
}

async fn run<T: Averageable>(
    mut session: ReplaySession<T>,
    target: Arc<ThrottledChannel<T>>,
    speed: f64,
    mut stop_rx: watch::Receiver<bool>,
    running: Arc<AtomicBool>,
    delivered: Arc<AtomicUsize>,
) -> usize {
    let channel = target.kind();
    let replay_start = Instant::now();
    let mut count = 0usize;

    info!(%channel, samples = session.len(), speed, "replay started");

    while let Some(tick) = session.peek_tick() {
        if *stop_rx.borrow() {
            debug!(%channel, "replay stopped");
            break;
        }

        let Some(due) = replay_start.checked_add(scaled_offset(tick, speed)) else {
            warn!(%channel, tick, "sample tick out of range, ending replay");
            break;
        };

        if Instant::now() < due {
            let sender_gone = tokio::select! {
                _ = sleep_until(due) => false,
                changed = stop_rx.changed() => changed.is_err(),
            };
            if sender_gone {
                debug!(%channel, "replay handle dropped");
                break;
            }
            // Re-check stop and the deadline
            continue;
        }

        let Some((tick, value)) = session.next() else {
            break;
        };
        target.record(value, tick);
        count += 1;
        delivered.store(count, Ordering::SeqCst);
    }

    target.end_monitoring();
    running.store(false, Ordering::SeqCst);
    observability::record_replay_delivered(channel, count);

    info!(
        %channel,
        delivered = count,
        remaining = session.remaining(),
        "replay finished"
    );
    count
}
