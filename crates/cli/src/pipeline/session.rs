//! Replay session runner - recordings in, fused snapshots out.
//!
//! Every channel with a recording on disk is bound to one `FeedSet` and
//! replayed concurrently. Fused snapshots are handed to a collector task that
//! aggregates them and optionally writes them as JSON lines.

use std::fs::File;
use std::future::Future;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{
    FusionSnapshot, Location, PipelineConfig, Quaternion, ReplayConfig, ReplayFiles, Vec3,
};
use ingestion::{FeedSet, FeedValue, SampleSource};
use observability::FusionStatsAggregator;
use replay::Recording;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::SessionStats;
use crate::cli::ReplayArgs;
use crate::error::CliError;

/// Replay session configuration with CLI overrides applied
#[derive(Debug, Clone)]
pub struct ReplayPlan {
    /// Pipeline configuration; `replay` is always set
    pub config: PipelineConfig,

    /// JSON lines output for fused snapshots (None = disabled)
    pub output: Option<PathBuf>,

    /// Session timeout (None = run until the recordings end)
    pub timeout: Option<Duration>,
}

impl ReplayPlan {
    /// Apply `--dir`, `--speed` and `--units` on top of the loaded configuration
    pub fn from_args(mut config: PipelineConfig, args: &ReplayArgs) -> Result<Self> {
        if let Some(units) = args.units {
            info!(units = ?units, "Overriding distance units from CLI");
            config.session.distance_units = units;
        }

        if let Some(ref dir) = args.dir {
            info!(dir = %dir.display(), "Overriding recording directory from CLI");
            match config.replay.as_mut() {
                Some(replay) => replay.directory = dir.clone(),
                None => {
                    config.replay = Some(ReplayConfig {
                        directory: dir.clone(),
                        speed: 1.0,
                        files: ReplayFiles::default(),
                    })
                }
            }
        }

        let replay = config.replay.as_mut().ok_or(CliError::NoReplayDirectory)?;
        if let Some(speed) = args.speed {
            info!(speed, "Overriding replay speed from CLI");
            replay.speed = speed;
        }
        if !(replay.speed.is_finite() && replay.speed > 0.0) {
            anyhow::bail!("Replay speed must be a positive number, got {}", replay.speed);
        }

        Ok(Self {
            config,
            output: args.output.clone(),
            timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        })
    }

    fn replay(&self) -> Result<&ReplayConfig> {
        Ok(self
            .config
            .replay
            .as_ref()
            .ok_or(CliError::NoReplayDirectory)?)
    }
}

/// Runs one replay session to completion
pub struct ReplaySessionRunner {
    plan: ReplayPlan,
}

impl ReplaySessionRunner {
    pub fn new(plan: ReplayPlan) -> Self {
        Self { plan }
    }

    /// Replay every available recording until they end, the timeout fires or
    /// `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<SessionStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let replay = self.plan.replay()?;

        let writer = match &self.plan.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output {}", path.display()))?;
                info!(path = %path.display(), "Writing fused snapshots as JSON lines");
                Some(BufWriter::new(file))
            }
            None => None,
        };

        let feeds = FeedSet::from_config(&self.plan.config);

        // Fused snapshots flow to the collector until the sender is taken
        let (tx, rx) = mpsc::unbounded_channel::<FusionSnapshot>();
        let sender = Arc::new(Mutex::new(Some(tx)));
        let callback_sender = sender.clone();
        feeds.on_fused_update(Arc::new(move |snapshot: &FusionSnapshot| {
            let guard = callback_sender.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(snapshot.clone());
            }
        }));
        let collector = tokio::spawn(collect(rx, writer));

        let mut bound = 0usize;
        bound += usize::from(bind_recording::<Vec3>(&feeds, replay)?);
        bound += usize::from(bind_recording::<Quaternion>(&feeds, replay)?);
        bound += usize::from(bind_recording::<Location>(&feeds, replay)?);
        bound += usize::from(bind_recording::<f64>(&feeds, replay)?);
        if bound == 0 {
            sender.lock().unwrap_or_else(|e| e.into_inner()).take();
            return Err(CliError::no_recordings(&replay.directory).into());
        }

        info!(channels = bound, speed = replay.speed, "Replay running");

        let timeout = self.plan.timeout;
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        let (delivered, interrupted) = tokio::select! {
            delivered = feeds.wait_replays() => (delivered, false),
            _ = shutdown => {
                warn!("Received shutdown signal, stopping replay...");
                feeds.stop_all();
                (feeds.wait_replays().await, true)
            }
            _ = deadline => {
                warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Replay timed out");
                feeds.stop_all();
                (feeds.wait_replays().await, true)
            }
        };

        info!(readings = ?feeds.engine().display_readings(), "Final display readings");
        let channels = feeds.stats();

        // Close the snapshot stream and let the collector drain
        sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(feeds);

        let (mut fusion, lines_written) = collector
            .await
            .context("Fused snapshot collector panicked")??;
        for (channel, count) in delivered {
            fusion.record_delivered(channel, count);
        }

        let stats = SessionStats {
            fused_updates: fusion.total_updates,
            lines_written,
            duration: start_time.elapsed(),
            interrupted,
            channels,
            fusion,
        };

        info!(
            fused_updates = stats.fused_updates,
            duration_secs = stats.duration.as_secs_f64(),
            interrupted,
            "Replay session complete"
        );

        Ok(stats)
    }
}

/// Load the recording for `T`'s channel and bind it. `false` when no file exists.
fn bind_recording<T: FeedValue>(feeds: &FeedSet, replay: &ReplayConfig) -> Result<bool> {
    let path = replay.path_for(T::KIND);
    if !path.exists() {
        info!(channel = %T::KIND, path = %path.display(), "No recording, channel stays idle");
        return Ok(false);
    }

    let recording = Recording::<T>::read(&path)
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    info!(
        channel = %T::KIND,
        samples = recording.len(),
        span = ?recording.span(),
        "Recording loaded"
    );

    feeds
        .bind(SampleSource::Replay(recording.into_session()))
        .with_context(|| format!("Failed to start {} replay", T::KIND))?;
    Ok(true)
}

async fn collect(
    mut rx: mpsc::UnboundedReceiver<FusionSnapshot>,
    mut writer: Option<BufWriter<File>>,
) -> Result<(FusionStatsAggregator, u64)> {
    let mut fusion = FusionStatsAggregator::new();
    let mut lines = 0u64;

    while let Some(snapshot) = rx.recv().await {
        fusion.update(&snapshot);
        debug!(
            sequence = snapshot.sequence,
            tick = snapshot.tick,
            phase = ?snapshot.phase,
            roll = snapshot.state.roll_degrees(),
            pitch = snapshot.state.pitch_degrees(),
            yaw = snapshot.state.yaw_degrees(),
            horizontal_accel = snapshot.state.horizontal_accel,
            "Fused update"
        );

        if let Some(writer) = writer.as_mut() {
            serde_json::to_writer(&mut *writer, &snapshot)
                .context("Failed to serialize fused snapshot")?;
            writer.write_all(b"\n")?;
            lines += 1;
        }
    }

    if let Some(mut writer) = writer {
        writer.flush().context("Failed to flush output")?;
    }

    Ok((fusion, lines))
}
