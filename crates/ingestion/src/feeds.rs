//! FeedSet: one session's channels wired to one fusion engine.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use contracts::{
    Averageable, ChannelKind, FeedClock, FusedUpdateCallback, Location, PipelineConfig,
    Quaternion, SettingsProvider, StaticSettings, Vec3,
};
use fusion_engine::{ChannelStats, FusionEngine, FusionInput, ThrottledChannel};
use replay::{CsvRecord, ReplayDriver};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::{IngestionError, Result};
use crate::source::{BoundSource, LiveHandle, SampleSource};

/// Value type carried by one of the four channels.
pub trait FeedValue:
    Averageable + Copy + Into<FusionInput> + CsvRecord + Serialize + DeserializeOwned
{
    const KIND: ChannelKind;

    fn channel(feeds: &FeedSet) -> &Arc<ThrottledChannel<Self>>;
}

impl FeedValue for Vec3 {
    const KIND: ChannelKind = ChannelKind::Acceleration;

    fn channel(feeds: &FeedSet) -> &Arc<ThrottledChannel<Self>> {
        &feeds.acceleration
    }
}

impl FeedValue for Quaternion {
    const KIND: ChannelKind = ChannelKind::Orientation;

    fn channel(feeds: &FeedSet) -> &Arc<ThrottledChannel<Self>> {
        &feeds.orientation
    }
}

impl FeedValue for Location {
    const KIND: ChannelKind = ChannelKind::Location;

    fn channel(feeds: &FeedSet) -> &Arc<ThrottledChannel<Self>> {
        &feeds.location
    }
}

impl FeedValue for f64 {
    const KIND: ChannelKind = ChannelKind::Heading;

    fn channel(feeds: &FeedSet) -> &Arc<ThrottledChannel<Self>> {
        &feeds.heading
    }
}

enum Binding {
    Live(Arc<AtomicBool>),
    Replay(Arc<ReplayDriver>),
}

impl Binding {
    fn is_active(&self) -> bool {
        match self {
            Binding::Live(listening) => listening.load(std::sync::atomic::Ordering::SeqCst),
            Binding::Replay(driver) => driver.is_running(),
        }
    }
}

/// The four channels of one session, their sources and the fusion engine.
///
/// Every channel notifies the engine directly; the engine is owned here and
/// shared with nothing else.
pub struct FeedSet {
    clock: FeedClock,
    engine: Arc<FusionEngine>,
    acceleration: Arc<ThrottledChannel<Vec3>>,
    orientation: Arc<ThrottledChannel<Quaternion>>,
    location: Arc<ThrottledChannel<Location>>,
    heading: Arc<ThrottledChannel<f64>>,
    replay_speed: f64,
    bindings: Mutex<HashMap<ChannelKind, Binding>>,
}

impl std::fmt::Debug for FeedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSet")
            .field("engine", &self.engine)
            .field("replay_speed", &self.replay_speed)
            .finish()
    }
}

impl FeedSet {
    /// Build channels and engine from configuration, using fixed settings
    pub fn from_config(config: &PipelineConfig) -> Self {
        let settings = StaticSettings {
            units: config.session.distance_units,
        };
        Self::new(config, Arc::new(settings))
    }

    /// Build channels and engine; FeedStart is captured now.
    pub fn new(config: &PipelineConfig, settings: Arc<dyn SettingsProvider>) -> Self {
        let engine = Arc::new(FusionEngine::with_min_interval(
            settings,
            Duration::from_millis(config.session.fused_min_interval_ms),
        ));

        let channels = &config.channels;
        let feeds = Self {
            clock: FeedClock::start(),
            acceleration: Arc::new(ThrottledChannel::new(
                ChannelKind::Acceleration,
                &channels.acceleration,
            )),
            orientation: Arc::new(ThrottledChannel::new(
                ChannelKind::Orientation,
                &channels.orientation,
            )),
            location: Arc::new(ThrottledChannel::new(ChannelKind::Location, &channels.location)),
            heading: Arc::new(ThrottledChannel::new(ChannelKind::Heading, &channels.heading)),
            replay_speed: config.replay.as_ref().map(|r| r.speed).unwrap_or(1.0),
            engine,
            bindings: Mutex::new(HashMap::new()),
        };

        feeds.acceleration.on_notify(feeds.engine.listener());
        feeds.orientation.on_notify(feeds.engine.listener());
        feeds
            .location
            .on_notify(feeds.engine.location_listener(&feeds.location));
        feeds.heading.on_notify(feeds.engine.listener());

        info!(
            units = ?config.session.distance_units,
            replay_speed = feeds.replay_speed,
            "feed set created"
        );
        feeds
    }

    pub fn clock(&self) -> FeedClock {
        self.clock
    }

    pub fn engine(&self) -> &Arc<FusionEngine> {
        &self.engine
    }

    /// Register a fused-update listener on the engine
    pub fn on_fused_update(&self, callback: FusedUpdateCallback) {
        self.engine.on_fused_update(callback);
    }

    /// Channel carrying values of type `T`
    pub fn channel<T: FeedValue>(&self) -> &Arc<ThrottledChannel<T>> {
        T::channel(self)
    }

    /// Attach a source to the channel for `T`.
    ///
    /// Replays start immediately and must be bound within a tokio runtime.
    #[instrument(name = "feeds_bind", skip(self, source), fields(channel = %T::KIND))]
    pub fn bind<T: FeedValue>(&self, source: SampleSource<T>) -> Result<BoundSource<T>> {
        let mut bindings = self.lock_bindings();
        if bindings.get(&T::KIND).is_some_and(Binding::is_active) {
            return Err(IngestionError::SourceAlreadyBound { channel: T::KIND });
        }

        let channel = self.channel::<T>().clone();
        let bound = match source {
            SampleSource::Live => {
                channel.begin_monitoring()?;
                let listening = Arc::new(AtomicBool::new(true));
                bindings.insert(T::KIND, Binding::Live(listening.clone()));
                BoundSource::Live(LiveHandle::new(channel, self.clock, listening))
            }
            SampleSource::Replay(session) => {
                let driver = Arc::new(ReplayDriver::start(session, channel, self.replay_speed)?);
                bindings.insert(T::KIND, Binding::Replay(driver.clone()));
                BoundSource::Replay(driver)
            }
        };
        debug!(channel = %T::KIND, "source bound");
        Ok(bound)
    }

    /// Bind a live source and return its handle
    pub fn live<T: FeedValue>(&self) -> Result<LiveHandle<T>> {
        match self.bind::<T>(SampleSource::Live)? {
            BoundSource::Live(handle) => Ok(handle),
            BoundSource::Replay(_) => Err(IngestionError::NotBound { channel: T::KIND }),
        }
    }

    /// Stop and detach the source of one channel.
    pub fn unbind(&self, channel: ChannelKind) -> Result<()> {
        let binding = self
            .lock_bindings()
            .remove(&channel)
            .ok_or(IngestionError::NotBound { channel })?;
        self.stop_binding(channel, &binding);
        Ok(())
    }

    /// Stop every source. Idempotent.
    pub fn stop_all(&self) {
        let bindings = self.lock_bindings();
        for (channel, binding) in bindings.iter() {
            self.stop_binding(*channel, binding);
        }
    }

    /// Wait for every bound replay to finish.
    pub async fn wait_replays(&self) -> HashMap<ChannelKind, usize> {
        let drivers: Vec<(ChannelKind, Arc<ReplayDriver>)> = self
            .lock_bindings()
            .iter()
            .filter_map(|(channel, binding)| match binding {
                Binding::Replay(driver) => Some((*channel, driver.clone())),
                Binding::Live(_) => None,
            })
            .collect();

        let mut delivered = HashMap::new();
        for (channel, driver) in drivers {
            delivered.insert(channel, driver.finish().await);
        }
        delivered
    }

    /// Per-channel counters in `ChannelKind::ALL` order
    pub fn stats(&self) -> Vec<ChannelStats> {
        vec![
            self.acceleration.stats(),
            self.orientation.stats(),
            self.location.stats(),
            self.heading.stats(),
        ]
    }

    fn stop_binding(&self, channel: ChannelKind, binding: &Binding) {
        match binding {
            Binding::Live(listening) => {
                if listening.swap(false, std::sync::atomic::Ordering::SeqCst) {
                    self.end_monitoring(channel);
                }
            }
            Binding::Replay(driver) => driver.stop(),
        }
    }

    fn end_monitoring(&self, channel: ChannelKind) {
        match channel {
            ChannelKind::Acceleration => self.acceleration.end_monitoring(),
            ChannelKind::Orientation => self.orientation.end_monitoring(),
            ChannelKind::Location => self.location.end_monitoring(),
            ChannelKind::Heading => self.heading.end_monitoring(),
        }
    }

    fn lock_bindings(&self) -> MutexGuard<'_, HashMap<ChannelKind, Binding>> {
        self.bindings.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for FeedSet {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use approx::assert_abs_diff_eq;
    use contracts::{AveragingPolicy, FusionPhase, FusionSnapshot, TICKS_PER_SECOND};
    use replay::Recording;

    fn every_event_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        for channel in [
            &mut config.channels.acceleration,
            &mut config.channels.orientation,
            &mut config.channels.location,
            &mut config.channels.heading,
        ] {
            channel.min_notify_interval_ms = 0;
        }
        config
    }

    #[test]
    fn test_live_push_reaches_engine() {
        let feeds = FeedSet::from_config(&every_event_config());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        feeds.on_fused_update(Arc::new(move |s: &FusionSnapshot| {
            sink.lock().unwrap().push(s.clone());
        }));

        let orientation = feeds.live::<Quaternion>().unwrap();
        let accel = feeds.live::<Vec3>().unwrap();
        orientation.push_at(Quaternion::IDENTITY, 0);
        accel.push_at(Vec3::new(0.0, 0.0, 1.0), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].phase, FusionPhase::Partial);
        assert_abs_diff_eq!(seen[1].state.absolute_acceleration.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_live_handle_callback_and_clock() {
        let feeds = FeedSet::from_config(&every_event_config());
        let heading = feeds.live::<f64>().unwrap();

        let on_reading = heading.callback();
        on_reading(contracts::Sample::new(42.0, 7));
        assert_eq!(feeds.channel::<f64>().current_value(), 42.0);

        heading.push(43.0);
        let stats = feeds.channel::<f64>().stats();
        assert_eq!(stats.received, 2);
        assert!(stats.last_tick.is_some());
    }

    #[test]
    fn test_binding_rules() {
        let feeds = FeedSet::from_config(&PipelineConfig::default());
        let accel = feeds.live::<Vec3>().unwrap();

        assert!(matches!(
            feeds.live::<Vec3>(),
            Err(IngestionError::SourceAlreadyBound { channel: ChannelKind::Acceleration })
        ));
        assert!(feeds
            .channel::<Vec3>()
            .set_policy(AveragingPolicy::MostRecent)
            .is_err());

        feeds.unbind(ChannelKind::Acceleration).unwrap();
        assert!(!accel.is_listening());
        assert!(!accel.push_at(Vec3::new(1.0, 0.0, 0.0), 0));
        assert!(feeds
            .channel::<Vec3>()
            .set_policy(AveragingPolicy::MostRecent)
            .is_ok());

        assert!(matches!(
            feeds.unbind(ChannelKind::Heading),
            Err(IngestionError::NotBound { .. })
        ));
        assert!(feeds.live::<Vec3>().is_ok());
    }

    #[test]
    fn test_channels_follow_config() {
        let mut config = PipelineConfig::default();
        config.channels.location.capacity = Some(5);
        config.channels.location.policy = AveragingPolicy::last_readings(3);
        let feeds = FeedSet::from_config(&config);

        assert_eq!(feeds.channel::<Location>().capacity(), Some(5));
        assert_eq!(
            feeds.channel::<Location>().policy(),
            AveragingPolicy::CountWindow { size: 3 }
        );
        assert_eq!(feeds.channel::<f64>().policy(), AveragingPolicy::MostRecent);
        assert_eq!(feeds.stats().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_binding() {
        let feeds = FeedSet::from_config(&every_event_config());
        let recording: Recording<f64> = (0..5).map(|i| (i * TICKS_PER_SECOND, i as f64)).collect();

        let driver = feeds
            .bind::<f64>(SampleSource::Replay(recording.into_session()))
            .unwrap()
            .into_replay()
            .unwrap();
        assert!(driver.is_running());

        let delivered = feeds.wait_replays().await;
        assert_eq!(delivered[&ChannelKind::Heading], 5);
        assert_eq!(feeds.engine().snapshot().state.heading, 4.0);

        // A finished replay can be replaced
        let again = BTreeMap::from([(0, 9.0)]);
        assert!(feeds
            .bind::<f64>(SampleSource::Replay(replay::ReplaySession::new(again)))
            .is_ok());
    }
}
