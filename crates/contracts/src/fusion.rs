//! Fused kinematic state and its display projection.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::{Location, Quaternion, Tick, Vec3};

/// Distance unit used by the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnits {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnits {
    /// Converts G to distance-per-hour-per-second.
    pub fn grav_to_distance_per_hour_per_sec(&self) -> f64 {
        match self {
            DistanceUnits::Miles => 21.93759,
            DistanceUnits::Kilometers => 35.305,
        }
    }

    pub fn accel_label(&self) -> &'static str {
        match self {
            DistanceUnits::Miles => "mph /sec",
            DistanceUnits::Kilometers => "kph /sec",
        }
    }

    pub fn speed_label(&self) -> &'static str {
        match self {
            DistanceUnits::Miles => "mph",
            DistanceUnits::Kilometers => "kph",
        }
    }
}

impl std::str::FromStr for DistanceUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "miles" | "mi" | "mph" => Ok(Self::Miles),
            "kilometers" | "km" | "kph" => Ok(Self::Kilometers),
            other => Err(format!("unknown distance units: {other}")),
        }
    }
}

/// External settings read on demand by the fusion engine.
pub trait SettingsProvider: Send + Sync {
    fn distance_units(&self) -> DistanceUnits;
}

/// Settings that never change.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSettings {
    pub units: DistanceUnits,
}

impl SettingsProvider for StaticSettings {
    fn distance_units(&self) -> DistanceUnits {
        self.units
    }
}

/// Settings that can be changed while a session runs.
#[derive(Debug, Default)]
pub struct SharedSettings {
    units: RwLock<DistanceUnits>,
}

impl SharedSettings {
    pub fn new(units: DistanceUnits) -> Self {
        Self {
            units: RwLock::new(units),
        }
    }

    pub fn set_distance_units(&self, units: DistanceUnits) {
        let mut guard = self.units.write().unwrap_or_else(|e| e.into_inner());
        *guard = units;
    }
}

impl SettingsProvider for SharedSettings {
    fn distance_units(&self) -> DistanceUnits {
        *self.units.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fusion engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPhase {
    /// No channel has reported
    #[default]
    Idle,
    /// Some but not all channels have reported
    Partial,
    /// Every channel has reported at least once
    Active,
}

/// Combined state of the four channels plus derived quantities.
///
/// Angles are held in radians; the `*_degrees` accessors convert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionState {
    pub orientation: Quaternion,
    pub acceleration: Vec3,
    pub location: Location,
    pub heading: f64,

    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    /// Earth-frame acceleration, `w` near zero
    pub absolute_acceleration: Quaternion,
    pub horizontal_accel: f64,
    pub speed: f64,
    /// Course over ground in degrees, NaN when the fix carries none
    pub angle_of_travel: f64,
    /// Change in ground speed over the three newest location fixes, in G
    pub accel_from_locations: f64,
}

impl Default for FusionState {
    fn default() -> Self {
        Self {
            orientation: Quaternion::ZERO,
            acceleration: Vec3::ZERO,
            location: Location::default(),
            heading: 0.0,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            absolute_acceleration: Quaternion::ZERO,
            horizontal_accel: 0.0,
            speed: 0.0,
            angle_of_travel: f64::NAN,
            accel_from_locations: 0.0,
        }
    }
}

impl FusionState {
    pub fn roll_degrees(&self) -> f64 {
        self.roll.to_degrees()
    }

    pub fn pitch_degrees(&self) -> f64 {
        self.pitch.to_degrees()
    }

    pub fn yaw_degrees(&self) -> f64 {
        self.yaw.to_degrees()
    }

    /// Project onto display fields for the given units.
    pub fn display(&self, units: DistanceUnits) -> DisplayReadings {
        let factor = units.grav_to_distance_per_hour_per_sec();
        DisplayReadings {
            acceleration_x: round3(self.acceleration.x * factor),
            acceleration_y: round3(self.acceleration.y * factor),
            acceleration_z: round3(self.acceleration.z * factor),
            abs_acceleration_x: round3(self.absolute_acceleration.x * factor),
            abs_acceleration_y: round3(self.absolute_acceleration.y * factor),
            abs_acceleration_z: round3(self.absolute_acceleration.z * factor),
            horizontal_accel: round3(self.horizontal_accel * factor),
            accel_from_locations: round3(self.accel_from_locations * factor),
            orientation_x: round3(self.orientation.x),
            orientation_y: round3(self.orientation.y),
            orientation_z: round3(self.orientation.z),
            orientation_w: round3(self.orientation.w),
            roll: round3(self.roll_degrees()),
            pitch: round3(self.pitch_degrees()),
            yaw: round3(self.yaw_degrees()),
            heading: round3(self.heading),
            speed: self.speed,
            angle_of_travel: self.angle_of_travel,
            accel_brake_limit: factor / 3.0,
            accel_label: units.accel_label(),
            speed_label: units.speed_label(),
        }
    }
}

/// Immutable copy of the state handed to fused-update listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionSnapshot {
    pub phase: FusionPhase,
    /// Emitted-update counter, starting at 1
    pub sequence: u64,
    /// Tick of the channel notification that produced this snapshot
    pub tick: Tick,
    pub state: FusionState,
}

impl FusionSnapshot {
    pub fn display(&self, units: DistanceUnits) -> DisplayReadings {
        self.state.display(units)
    }
}

/// Unit-scaled values for the display layer, rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayReadings {
    pub acceleration_x: f64,
    pub acceleration_y: f64,
    pub acceleration_z: f64,
    pub abs_acceleration_x: f64,
    pub abs_acceleration_y: f64,
    pub abs_acceleration_z: f64,
    pub horizontal_accel: f64,
    pub accel_from_locations: f64,
    pub orientation_x: f64,
    pub orientation_y: f64,
    pub orientation_z: f64,
    pub orientation_w: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub heading: f64,
    pub speed: f64,
    pub angle_of_travel: f64,
    /// Gauge limit for acceleration and braking
    pub accel_brake_limit: f64,
    pub accel_label: &'static str,
    pub speed_label: &'static str,
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
