//! Arithmetic capability needed by the averaging policies.
//!
//! Every channel value type supplies a zero, a weighted accumulate and a
//! scale. Combination is component-wise so a weighted mean of quaternions
//! is the per-field mean, not a slerp.

use crate::{Location, Quaternion, Vec3};

/// Values that can be combined into a weighted mean.
pub trait Averageable: Clone + Send + Sync + 'static {
    /// Value reported by an empty buffer.
    fn zero() -> Self;

    /// Returns `self + weight * sample`.
    fn weighted_add(self, sample: &Self, weight: f64) -> Self;

    /// Returns `self * factor`.
    fn scale(self, factor: f64) -> Self;
}

impl Averageable for f64 {
    fn zero() -> Self {
        0.0
    }

    fn weighted_add(self, sample: &Self, weight: f64) -> Self {
        self + weight * sample
    }

    fn scale(self, factor: f64) -> Self {
        self * factor
    }
}

impl Averageable for Vec3 {
    fn zero() -> Self {
        Vec3::ZERO
    }

    fn weighted_add(self, sample: &Self, weight: f64) -> Self {
        Vec3::new(
            self.x + weight * sample.x,
            self.y + weight * sample.y,
            self.z + weight * sample.z,
        )
    }

    fn scale(self, factor: f64) -> Self {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl Averageable for Quaternion {
    fn zero() -> Self {
        Quaternion::ZERO
    }

    fn weighted_add(self, sample: &Self, weight: f64) -> Self {
        Quaternion::new(
            self.x + weight * sample.x,
            self.y + weight * sample.y,
            self.z + weight * sample.z,
            self.w + weight * sample.w,
        )
    }

    fn scale(self, factor: f64) -> Self {
        Quaternion::new(
            self.x * factor,
            self.y * factor,
            self.z * factor,
            self.w * factor,
        )
    }
}

/// Position fields are averaged. Course, speed and accuracy are not
/// positional; they are taken from the last sample added, which is the
/// newest when samples are fed oldest first.
impl Averageable for Location {
    fn zero() -> Self {
        Location::default()
    }

    fn weighted_add(self, sample: &Self, weight: f64) -> Self {
        Location {
            latitude: self.latitude + weight * sample.latitude,
            longitude: self.longitude + weight * sample.longitude,
            altitude: self.altitude + weight * sample.altitude,
            course: sample.course,
            speed: sample.speed,
            vertical_accuracy: sample.vertical_accuracy,
        }
    }

    fn scale(self, factor: f64) -> Self {
        Location {
            latitude: self.latitude * factor,
            longitude: self.longitude * factor,
            altitude: self.altitude * factor,
            ..self
        }
    }
}
