//! Channel value types
//!
//! Readings as delivered by the device layer. Acceleration is in G,
//! orientation is a scalar-last quaternion relative to east-north-up.

use serde::{Deserialize, Serialize};

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }
}

/// Quaternion with the scalar part last: `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// All components zero. Used as "not yet reported".
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    #[inline]
    pub fn vector(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }
}

/// Geolocation fix
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees
    pub latitude: f64,

    /// Degrees
    pub longitude: f64,

    /// Meters
    #[serde(default)]
    pub altitude: f64,

    /// Degrees from true north, when the fix carries a course
    #[serde(default)]
    pub course: Option<f64>,

    /// Meters per second
    #[serde(default)]
    pub speed: Option<f64>,

    #[serde(default)]
    pub vertical_accuracy: Option<f64>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            ..Default::default()
        }
    }

    pub fn with_motion(mut self, speed: f64, course: f64) -> Self {
        self.speed = Some(speed);
        self.course = Some(course);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        assert_eq!(Vec3::new(3.0, 4.0, 0.0).length(), 5.0);
        assert_eq!(Quaternion::IDENTITY.length(), 1.0);
        assert_eq!(Quaternion::ZERO.length(), 0.0);
    }

    #[test]
    fn test_location_json_defaults() {
        let loc: Location =
            serde_json::from_str(r#"{ "latitude": 47.6, "longitude": -122.3 }"#).unwrap();
        assert_eq!(loc.altitude, 0.0);
        assert!(loc.speed.is_none());
        assert!(loc.course.is_none());
    }
}
