//! Fusion engine implementation.
//!
//! Holds the latest value of each channel and, on every channel
//! notification, recomputes the derived kinematics and emits one snapshot
//! to the registered listeners.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use contracts::{
    ticks_from_duration, ChannelKind, DisplayReadings, FusedUpdateCallback, FusionPhase,
    FusionSnapshot, FusionState, Location, NotifyCallback, Quaternion, SettingsProvider, Tick,
    Vec3,
};
use tracing::{debug, info, instrument, trace};

use crate::channel::ThrottledChannel;
use crate::kinematics::{
    absolute_acceleration, accel_from_fixes, euler_angles, horizontal_magnitude,
};

/// One channel's freshly averaged value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FusionInput {
    Orientation(Quaternion),
    Acceleration(Vec3),
    Location(Location),
    Heading(f64),
}

impl FusionInput {
    pub fn channel(&self) -> ChannelKind {
        match self {
            FusionInput::Orientation(_) => ChannelKind::Orientation,
            FusionInput::Acceleration(_) => ChannelKind::Acceleration,
            FusionInput::Location(_) => ChannelKind::Location,
            FusionInput::Heading(_) => ChannelKind::Heading,
        }
    }
}

impl From<Quaternion> for FusionInput {
    fn from(v: Quaternion) -> Self {
        FusionInput::Orientation(v)
    }
}

impl From<Vec3> for FusionInput {
    fn from(v: Vec3) -> Self {
        FusionInput::Acceleration(v)
    }
}

impl From<Location> for FusionInput {
    fn from(v: Location) -> Self {
        FusionInput::Location(v)
    }
}

impl From<f64> for FusionInput {
    fn from(v: f64) -> Self {
        FusionInput::Heading(v)
    }
}

#[derive(Debug, Default)]
struct EngineState {
    state: FusionState,
    /// Indexed like `ChannelKind::ALL`
    reported: [bool; 4],
    phase: FusionPhase,
    sequence: u64,
    last_tick: Tick,
    last_emit: Option<Tick>,
}

impl EngineState {
    fn apply(&mut self, input: FusionInput) {
        match input {
            FusionInput::Orientation(q) => self.state.orientation = q,
            FusionInput::Acceleration(a) => self.state.acceleration = a,
            FusionInput::Location(l) => self.state.location = l,
            FusionInput::Heading(h) => self.state.heading = h,
        }

        let channel = input.channel();
        if let Some(idx) = ChannelKind::ALL.iter().position(|k| *k == channel) {
            self.reported[idx] = true;
        }

        // Active never reverts since reported flags are never cleared
        let phase = if self.reported.iter().all(|r| *r) {
            FusionPhase::Active
        } else {
            FusionPhase::Partial
        };
        if phase != self.phase {
            info!(from = ?self.phase, to = ?phase, "fusion phase changed");
            self.phase = phase;
        }
    }

    fn snapshot(&self) -> FusionSnapshot {
        FusionSnapshot {
            phase: self.phase,
            sequence: self.sequence,
            tick: self.last_tick,
            state: self.state.clone(),
        }
    }
}

/// Recompute derived fields from the current channel values.
///
/// Degenerate orientation or acceleration leaves roll/pitch/yaw and the
/// earth-frame acceleration unchanged. Speed and angle of travel always follow
/// the location.
fn recompute(state: &mut FusionState) {
    let rotated = if state.orientation.length() != 0.0 && state.acceleration.length() != 0.0 {
        absolute_acceleration(&state.orientation, &state.acceleration)
    } else {
        None
    };

    match rotated {
        Some(absolute) => {
            let angles = euler_angles(&state.orientation);
            state.roll = angles.roll;
            state.pitch = angles.pitch;
            state.yaw = angles.yaw;

            state.absolute_acceleration = absolute;
            state.horizontal_accel = horizontal_magnitude(&absolute);
        }
        None => trace!("orientation or acceleration is zero, derived values kept"),
    }

    state.speed = state.location.speed.unwrap_or(0.0);
    state.angle_of_travel = state.location.course.unwrap_or(f64::NAN);
}

/// Combines orientation, acceleration, location and heading.
///
/// Constructed explicitly per session and shared with the channels through
/// [`FusionEngine::listener`].
pub struct FusionEngine {
    inner: Mutex<EngineState>,
    listeners: RwLock<Vec<FusedUpdateCallback>>,
    settings: Arc<dyn SettingsProvider>,
    /// Minimum spacing of emitted updates in ticks, 0 = every update
    fused_min_interval: Tick,
}

impl std::fmt::Debug for FusionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionEngine")
            .field("phase", &self.phase())
            .field("fused_min_interval", &self.fused_min_interval)
            .finish()
    }
}

impl FusionEngine {
    /// Create an engine that emits on every update
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self::with_min_interval(settings, Duration::ZERO)
    }

    /// Create an engine that emits at most once per `min_interval` of sample time
    pub fn with_min_interval(settings: Arc<dyn SettingsProvider>, min_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(EngineState::default()),
            listeners: RwLock::new(Vec::new()),
            settings,
            fused_min_interval: ticks_from_duration(min_interval),
        }
    }

    /// Register a fused-update listener
    pub fn on_fused_update(&self, callback: FusedUpdateCallback) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(callback);
    }

    /// Channel notification callback feeding this engine.
    pub fn listener<T>(self: &Arc<Self>) -> NotifyCallback<T>
    where
        T: Clone + Into<FusionInput> + 'static,
    {
        let engine = Arc::clone(self);
        Arc::new(move |value: &T, tick: Tick| {
            engine.update(value.clone().into(), tick);
        })
    }

    /// Location notification callback that also reads the channel's newest
    /// raw fixes for the location-derived acceleration.
    pub fn location_listener(
        self: &Arc<Self>,
        channel: &Arc<ThrottledChannel<Location>>,
    ) -> NotifyCallback<Location> {
        let engine = Arc::clone(self);
        // Weak: the channel owns this callback
        let channel: Weak<ThrottledChannel<Location>> = Arc::downgrade(channel);
        Arc::new(move |location: &Location, tick: Tick| {
            let fixes = channel
                .upgrade()
                .map(|channel| channel.recent(3))
                .unwrap_or_default();
            engine.update_location(*location, &fixes, tick);
        })
    }

    /// Apply one channel's averaged value and recompute.
    ///
    /// Returns the emitted snapshot, or `None` when the fused throttle
    /// suppressed emission. State is updated either way.
    pub fn update(&self, input: FusionInput, tick: Tick) -> Option<FusionSnapshot> {
        self.apply_and_emit(input, None, tick)
    }

    /// Apply an averaged location together with the newest raw fixes,
    /// oldest first.
    pub fn update_location(
        &self,
        location: Location,
        fixes: &[(Tick, Location)],
        tick: Tick,
    ) -> Option<FusionSnapshot> {
        self.apply_and_emit(FusionInput::Location(location), Some(accel_from_fixes(fixes)), tick)
    }

    #[instrument(
        name = "fusion_update",
        level = "trace",
        skip(self, input, accel_from_locations),
        fields(channel = %input.channel())
    )]
    fn apply_and_emit(
        &self,
        input: FusionInput,
        accel_from_locations: Option<f64>,
        tick: Tick,
    ) -> Option<FusionSnapshot> {
        let snapshot = {
            let mut inner = self.lock();
            inner.apply(input);
            if let Some(accel) = accel_from_locations {
                inner.state.accel_from_locations = accel;
            }
            recompute(&mut inner.state);
            inner.last_tick = inner.last_tick.max(tick);

            let due = match inner.last_emit {
                None => true,
                Some(last) => {
                    self.fused_min_interval == 0
                        || tick >= last.saturating_add(self.fused_min_interval)
                }
            };
            if !due {
                return None;
            }
            inner.last_emit = Some(tick);
            inner.sequence += 1;
            let mut snapshot = inner.snapshot();
            snapshot.tick = tick;
            snapshot
        };

        self.emit(&snapshot);
        Some(snapshot)
    }

    /// Recompute and emit regardless of the fused throttle.
    pub fn trigger_recalc(&self) -> FusionSnapshot {
        let snapshot = {
            let mut inner = self.lock();
            recompute(&mut inner.state);
            inner.sequence += 1;
            inner.last_emit = Some(inner.last_tick);
            inner.snapshot()
        };
        debug!(sequence = snapshot.sequence, "forced recalculation");

        self.emit(&snapshot);
        snapshot
    }

    /// Recompute derived fields in place without emitting.
    pub fn recompute(&self) -> FusionState {
        let mut inner = self.lock();
        recompute(&mut inner.state);
        inner.state.clone()
    }

    pub fn phase(&self) -> FusionPhase {
        self.lock().phase
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> FusionSnapshot {
        self.lock().snapshot()
    }

    /// Display fields in the units currently configured.
    pub fn display_readings(&self) -> DisplayReadings {
        let units = self.settings.distance_units();
        self.lock().state.display(units)
    }

    pub fn settings(&self) -> &Arc<dyn SettingsProvider> {
        &self.settings
    }

    fn emit(&self, snapshot: &FusionSnapshot) {
        observability::record_fused_update(snapshot);

        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            listener(snapshot);
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use contracts::{
        AveragingPolicy, DistanceUnits, SharedSettings, StaticSettings, TICKS_PER_MILLISECOND,
        TICKS_PER_SECOND,
    };

    use crate::kinematics::{haversine_distance, STANDARD_GRAVITY};

    fn engine() -> FusionEngine {
        FusionEngine::new(Arc::new(StaticSettings::default()))
    }

    #[test]
    fn test_phase_transitions() {
        let engine = engine();
        assert_eq!(engine.phase(), FusionPhase::Idle);

        engine.update(Vec3::new(0.0, 0.0, 1.0).into(), 1);
        assert_eq!(engine.phase(), FusionPhase::Partial);

        engine.update(Quaternion::IDENTITY.into(), 2);
        engine.update(Location::new(1.0, 2.0, 3.0).into(), 3);
        assert_eq!(engine.phase(), FusionPhase::Partial);

        engine.update(FusionInput::Heading(90.0), 4);
        assert_eq!(engine.phase(), FusionPhase::Active);

        engine.update(FusionInput::Heading(91.0), 5);
        assert_eq!(engine.phase(), FusionPhase::Active);
    }

    #[test]
    fn test_flat_device_gravity_on_z() {
        let engine = engine();
        engine.update(Quaternion::IDENTITY.into(), 0);
        let snapshot = engine
            .update(Vec3::new(0.0, 0.0, 1.0).into(), 1)
            .expect("emitted");

        let abs = snapshot.state.absolute_acceleration;
        assert_abs_diff_eq!(abs.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(abs.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(abs.z, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(abs.w, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(snapshot.state.horizontal_accel, 0.0, epsilon = 1e-12);
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.tick, 1);
    }

    #[test]
    fn test_averaged_orientation_keeps_gravity() {
        let engine = Arc::new(engine());
        let orientation = ThrottledChannel::with_settings(
            ChannelKind::Orientation,
            Some(10),
            AveragingPolicy::RecencyWeighted,
            Duration::ZERO,
        );
        orientation.on_notify(engine.listener());

        let half = std::f64::consts::FRAC_PI_4;
        orientation.record(Quaternion::IDENTITY, 0);
        orientation.record(Quaternion::new(0.0, 0.0, half.sin(), half.cos()), 1);
        let averaged = engine.snapshot().state.orientation;
        assert!((averaged.length() - 1.0).abs() > 0.05);

        let state = engine
            .update(Vec3::new(0.0, 0.0, 1.0).into(), 2)
            .expect("emitted")
            .state;
        assert_abs_diff_eq!(state.absolute_acceleration.z, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.horizontal_accel, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_location_listener_uses_raw_fixes() {
        let engine = Arc::new(engine());
        let location = Arc::new(ThrottledChannel::with_settings(
            ChannelKind::Location,
            Some(10),
            AveragingPolicy::RecencyWeighted,
            Duration::ZERO,
        ));
        location.on_notify(engine.location_listener(&location));

        let meters_per_degree = haversine_distance(
            &Location::new(0.0, 0.0, 0.0),
            &Location::new(1.0, 0.0, 0.0),
        );
        let fix = |m: f64| Location::new(m / meters_per_degree, 0.0, 0.0);

        location.record(fix(0.0), 0);
        location.record(fix(10.0), TICKS_PER_SECOND);
        assert_eq!(engine.snapshot().state.accel_from_locations, 0.0);

        // 10 m/s then 20 m/s
        location.record(fix(30.0), 2 * TICKS_PER_SECOND);
        let state = engine.snapshot().state;
        assert_abs_diff_eq!(
            state.accel_from_locations,
            10.0 / STANDARD_GRAVITY,
            epsilon = 1e-6
        );
        // The averaged position lags the newest fix
        assert!(state.location.latitude < fix(30.0).latitude);

        let display = engine.display_readings();
        assert_abs_diff_eq!(
            display.accel_from_locations,
            10.0 / STANDARD_GRAVITY * 21.93759,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_guard_keeps_prior_derived_values() {
        let engine = engine();
        engine.update(Quaternion::IDENTITY.into(), 0);
        engine.update(Vec3::new(0.3, 0.4, 1.0).into(), 1);
        let before = engine.snapshot().state;
        assert_abs_diff_eq!(before.horizontal_accel, 0.5, epsilon = 1e-12);

        // Zero acceleration is degenerate
        let after = engine.update(Vec3::ZERO.into(), 2).expect("emitted").state;
        assert_eq!(after.acceleration, Vec3::ZERO);
        assert_eq!(after.absolute_acceleration, before.absolute_acceleration);
        assert_eq!(after.horizontal_accel, before.horizontal_accel);
        assert_eq!(after.roll, before.roll);
    }

    #[test]
    fn test_missing_orientation_skips_rotation() {
        let engine = engine();
        let snapshot = engine
            .update(Vec3::new(1.0, 0.0, 0.0).into(), 0)
            .expect("emitted");
        assert_eq!(snapshot.phase, FusionPhase::Partial);
        assert_eq!(snapshot.state.absolute_acceleration, Quaternion::ZERO);
        assert_eq!(snapshot.state.horizontal_accel, 0.0);
    }

    #[test]
    fn test_speed_and_angle_of_travel() {
        let engine = engine();
        let s = engine.update(Location::new(47.0, -122.0, 0.0).into(), 0).unwrap();
        assert_eq!(s.state.speed, 0.0);
        assert!(s.state.angle_of_travel.is_nan());

        let fix = Location::new(47.0, -122.0, 0.0).with_motion(12.5, 270.0);
        let s = engine.update(fix.into(), 1).unwrap();
        assert_eq!(s.state.speed, 12.5);
        assert_eq!(s.state.angle_of_travel, 270.0);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let engine = engine();
        let q = Quaternion::new(0.1, 0.2, 0.3, 0.927);
        engine.update(q.into(), 0);
        engine.update(Vec3::new(0.1, -0.2, 0.98).into(), 1);
        engine.update(Location::default().with_motion(3.0, 45.0).into(), 2);

        let first = engine.recompute();
        let second = engine.recompute();
        assert_eq!(first, second);
    }

    #[test]
    fn test_listeners_receive_every_emission() {
        let engine = Arc::new(engine());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        engine.on_fused_update(Arc::new(move |s: &FusionSnapshot| {
            sink.lock().unwrap().push(s.sequence);
        }));

        let accel = engine.listener::<Vec3>();
        let heading = engine.listener::<f64>();
        accel(&Vec3::new(0.0, 0.0, 1.0), 10);
        heading(&12.0, 20);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(engine.snapshot().state.heading, 12.0);
    }

    #[test]
    fn test_fused_throttle_and_trigger_recalc() {
        let engine = FusionEngine::with_min_interval(
            Arc::new(StaticSettings::default()),
            Duration::from_millis(100),
        );
        let ms = TICKS_PER_MILLISECOND;

        assert!(engine.update(FusionInput::Heading(1.0), 0).is_some());
        assert!(engine.update(FusionInput::Heading(2.0), 50 * ms).is_none());
        // State still advanced
        assert_eq!(engine.snapshot().state.heading, 2.0);
        assert!(engine.update(FusionInput::Heading(3.0), 100 * ms).is_some());

        let forced = engine.trigger_recalc();
        assert_eq!(forced.sequence, 3);
        assert_eq!(forced.state.heading, 3.0);
    }

    #[test]
    fn test_display_reads_settings_on_demand() {
        let settings = Arc::new(SharedSettings::new(DistanceUnits::Miles));
        let engine = FusionEngine::new(settings.clone());
        engine.update(Quaternion::IDENTITY.into(), 0);
        engine.update(Vec3::new(0.0, 0.0, 1.0).into(), 1);

        let miles = engine.display_readings();
        assert_abs_diff_eq!(miles.abs_acceleration_z, 21.938, epsilon = 1e-9);
        assert_eq!(miles.speed_label, "mph");

        settings.set_distance_units(DistanceUnits::Kilometers);
        let km = engine.display_readings();
        assert_abs_diff_eq!(km.abs_acceleration_z, 35.305, epsilon = 1e-9);
        assert_eq!(km.accel_label, "kph /sec");
    }
}
