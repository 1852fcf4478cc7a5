//! Mathematical utilities and nalgebra extensions shared by the fusion pipeline

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Gravitational acceleration used to scale the body-frame up vector (m/s²)
pub const STANDARD_GRAVITY: f32 = 9.81;

/// Conversion factor from m/s to km/h
pub const MPS_TO_KMH: f32 = 3.6;

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Normalize the vector, returning zero vector if magnitude is zero
    fn safe_normalize(&self) -> Vector3<f32>;

    /// True when every component is exactly zero
    fn is_exact_zero(&self) -> bool;

    /// True when no component is NaN or infinite
    fn is_finite(&self) -> bool;

    /// Convert degrees to radians
    fn deg_to_rad(&self) -> Vector3<f32>;

    /// Convert radians to degrees
    fn rad_to_deg(&self) -> Vector3<f32>;
}

impl Vector3Ext for Vector3<f32> {
    fn safe_normalize(&self) -> Vector3<f32> {
        let mag = self.norm();
        if mag > 0.0 {
            *self / mag
        } else {
            Vector3::zeros()
        }
    }

    fn is_exact_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|c| c.is_finite())
    }

    fn deg_to_rad(&self) -> Vector3<f32> {
        *self * DEG_TO_RAD
    }

    fn rad_to_deg(&self) -> Vector3<f32> {
        *self * RAD_TO_DEG
    }
}

/// Extension trait for UnitQuaternion operations
pub trait QuaternionExt {
    /// Convert quaternion to Euler angles (roll, pitch, yaw) in degrees
    fn to_euler_degrees(&self) -> Vector3<f32>;

    /// Create quaternion from Euler angles in degrees
    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32>;
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn to_euler_degrees(&self) -> Vector3<f32> {
        euler_degrees(self.as_ref())
    }

    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32> {
        let euler_rad = Vector3::new(roll, pitch, yaw).deg_to_rad();
        UnitQuaternion::from_euler_angles(euler_rad.x, euler_rad.y, euler_rad.z)
    }
}

/// Roll, pitch and yaw in degrees from a (not necessarily unit) quaternion.
///
/// Uses the aerospace ZYX sequence. Pitch is singular near ±90°; the asin
/// argument is clamped so the singularity saturates instead of producing NaN.
pub fn euler_degrees(q: &Quaternion<f32>) -> Vector3<f32> {
    let (qs, qi, qj, qk) = (q.w, q.i, q.j, q.k);

    let roll = (2.0 * (qs * qi + qj * qk)).atan2(1.0 - 2.0 * (qi * qi + qj * qj));
    let pitch = (2.0 * (qs * qj - qk * qi)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (qs * qk + qi * qj)).atan2(1.0 - 2.0 * (qj * qj + qk * qk));

    Vector3::new(roll, pitch, yaw).rad_to_deg()
}

/// Unit up vector (gravity reference direction) expressed in the body frame.
///
/// For the identity quaternion this is exactly `(0, 0, 1)`. A zero
/// quaternion yields the zero vector.
pub fn gravity_from_quaternion(q: &Quaternion<f32>) -> Vector3<f32> {
    let (qs, qi, qj, qk) = (q.w, q.i, q.j, q.k);

    Vector3::new(
        2.0 * (qi * qk - qs * qj),
        2.0 * (qs * qi + qj * qk),
        qs * qs - qi * qi - qj * qj + qk * qk,
    )
    .safe_normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_extensions() {
        let v = Vector3::new(3.0f32, 4.0, 0.0);
        let normalized = v.safe_normalize();
        assert_relative_eq!(normalized.norm(), 1.0, epsilon = 1e-6);

        assert_eq!(Vector3::<f32>::zeros().safe_normalize(), Vector3::zeros());
        assert!(Vector3::<f32>::zeros().is_exact_zero());
        assert!(!Vector3::new(f32::NAN, 0.0, 0.0).is_finite());
    }

    #[test]
    fn test_quaternion_euler_conversion() {
        let euler = Vector3::new(30.0, 45.0, 60.0);
        let quat = UnitQuaternion::from_euler_degrees(euler.x, euler.y, euler.z);
        let recovered = quat.to_euler_degrees();

        assert!((euler - recovered).norm() < 1e-3);
    }

    #[test]
    fn test_euler_matches_nalgebra() {
        let quat = UnitQuaternion::from_euler_angles(-0.4f32, 0.3, 2.1);
        let (roll, pitch, yaw) = quat.euler_angles();
        let ours = euler_degrees(quat.as_ref());

        assert_relative_eq!(ours.x, roll * RAD_TO_DEG, epsilon = 1e-3);
        assert_relative_eq!(ours.y, pitch * RAD_TO_DEG, epsilon = 1e-3);
        assert_relative_eq!(ours.z, yaw * RAD_TO_DEG, epsilon = 1e-3);
    }

    #[test]
    fn test_gravity_identity_is_up() {
        let gravity = gravity_from_quaternion(&Quaternion::identity());
        assert_eq!(gravity, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(gravity * STANDARD_GRAVITY, Vector3::new(0.0, 0.0, 9.81));
    }

    #[test]
    fn test_gravity_matches_rotation() {
        let q = UnitQuaternion::from_euler_degrees(20.0, -35.0, 70.0);
        let expected = q.inverse() * Vector3::z();
        let gravity = gravity_from_quaternion(q.as_ref());

        assert!((gravity - expected).norm() < 1e-5);
    }

    #[test]
    fn test_pitch_saturates_at_gimbal_lock() {
        // Slightly non-unit quaternion pushes the asin argument past 1
        let q = Quaternion::new(0.71, 0.0, 0.71, 0.0);
        let euler = euler_degrees(&q);
        assert!(euler.y.is_finite());
        assert_relative_eq!(euler.y, 90.0, epsilon = 1e-3);
    }
}
