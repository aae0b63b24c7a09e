//! Closed-form orientation math.
//!
//! Quaternions arrive scalar-last `(x, y, z, w)` relative to east-north-up.
//! With `q0 = w, q1 = x, q2 = y, q3 = z`:
//!
//! ```text
//! roll  = atan2(2(q0q1 + q2q3), q0² - q1² - q2² + q3²)
//! pitch = asin(2(q0q2 - q1q3))
//! yaw   = atan2(2(q0q3 + q1q2), q0² + q1² - q2² + q3²)
//! ```
//!
//! Earth-frame acceleration is `q * p * q⁻¹` with `p = (a, 0)`. Averaged
//! orientations are not unit length, so the inverse is not the conjugate.

use contracts::{Location, Quaternion, Tick, Vec3, TICKS_PER_SECOND};
use nalgebra::Vector3;

type NaQuaternion = nalgebra::Quaternion<f64>;

/// Orientation angles in radians
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Roll, pitch and yaw of an orientation quaternion.
pub fn euler_angles(q: &Quaternion) -> EulerAngles {
    let (q0, q1, q2, q3) = (q.w, q.x, q.y, q.z);
    let (q0s, q1s, q2s, q3s) = (q0 * q0, q1 * q1, q2 * q2, q3 * q3);

    // asin is undefined outside [-1, 1]; non-unit input can overshoot
    let sin_pitch = (2.0 * (q0 * q2 - q1 * q3)).clamp(-1.0, 1.0);

    EulerAngles {
        roll: (2.0 * (q0 * q1 + q2 * q3)).atan2(q0s - q1s - q2s + q3s),
        pitch: sin_pitch.asin(),
        yaw: (2.0 * (q0 * q3 + q1 * q2)).atan2(q0s + q1s - q2s + q3s),
    }
}

/// Rotate a device-frame vector into the earth frame.
///
/// `None` when the orientation has no inverse.
pub fn absolute_acceleration(orientation: &Quaternion, acceleration: &Vec3) -> Option<Quaternion> {
    let q = NaQuaternion::new(orientation.w, orientation.x, orientation.y, orientation.z);
    let p = NaQuaternion::from_parts(
        0.0,
        Vector3::new(acceleration.x, acceleration.y, acceleration.z),
    );

    let rotated = q * p * q.try_inverse()?;
    Some(Quaternion::new(rotated.i, rotated.j, rotated.k, rotated.w))
}

/// Length of the x/y (east/north) part.
pub fn horizontal_magnitude(v: &Quaternion) -> f64 {
    (v.x * v.x + v.y * v.y).sqrt()
}

/// m/s² per G
pub const STANDARD_GRAVITY: f64 = 9.80665;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two fixes in meters.
pub fn haversine_distance(from: &Location, to: &Location) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Acceleration in G estimated from the three newest fixes.
///
/// `fixes` is oldest first. The ground speed over the newer pair minus the
/// speed over the older pair, divided by the time between the two segment
/// midpoints. Zero with fewer than three fixes or non-increasing ticks.
pub fn accel_from_fixes(fixes: &[(Tick, Location)]) -> f64 {
    let [(t1, l1), (t2, l2), (t3, l3)] = match fixes {
        [.., a, b, c] => [a, b, c],
        _ => return 0.0,
    };
    if t2 <= t1 || t3 <= t2 {
        return 0.0;
    }

    let older_secs = (t2 - t1) as f64 / TICKS_PER_SECOND as f64;
    let newer_secs = (t3 - t2) as f64 / TICKS_PER_SECOND as f64;
    let older_speed = haversine_distance(l1, l2) / older_secs;
    let newer_speed = haversine_distance(l2, l3) / newer_secs;

    let midpoint_secs = (older_secs + newer_secs) / 2.0;
    (newer_speed - older_speed) / midpoint_secs / STANDARD_GRAVITY
}
