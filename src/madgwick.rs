//! Madgwick gradient-descent attitude filter

use log::{trace, warn};
use nalgebra::{Matrix3x4, Quaternion, UnitQuaternion, Vector3, Vector4};

use crate::math::{Vector3Ext, euler_degrees, gravity_from_quaternion};
use crate::types::MadgwickSettings;

/// Madgwick AHRS filter
///
/// Maintains a unit quaternion estimate of the sensor frame relative to the
/// Earth frame (Z up). Each update integrates the gyroscope rate and nudges
/// the estimate one gradient-descent step towards the attitude implied by the
/// accelerometer (and magnetometer, when present). The step is fixed at
/// `1 / sample_rate`; timestamps are not consulted.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use swing_fusion::Madgwick;
///
/// let mut filter = Madgwick::new();
/// let gyroscope = Vector3::new(0.0, 0.0, 0.1);      // rad/s
/// let accelerometer = Vector3::new(0.0, 0.0, 9.81); // any consistent unit
/// let magnetometer = Vector3::new(20.0, 0.0, -40.0);
///
/// filter.update(gyroscope, accelerometer, magnetometer);
/// let euler = filter.euler_angles(); // degrees
/// ```
#[derive(Debug, Clone)]
pub struct Madgwick {
    settings: MadgwickSettings,
    /// Estimate stored as a raw quaternion, renormalized after every step
    q: Quaternion<f32>,
}

impl Madgwick {
    /// Create a filter with default settings (50 Hz, beta 0.1)
    pub fn new() -> Self {
        Self::with_settings(MadgwickSettings::default())
    }

    /// Create a filter with the given settings
    pub fn with_settings(settings: MadgwickSettings) -> Self {
        let mut filter = Self {
            settings: MadgwickSettings::default(),
            q: Quaternion::identity(),
        };
        filter.set_settings(settings);
        filter
    }

    /// Reset the estimate to identity, keeping settings
    pub fn reset(&mut self) {
        self.q = Quaternion::identity();
    }

    /// Replace the settings. A non-positive or non-finite sample rate is
    /// rejected and the default rate is kept instead.
    pub fn set_settings(&mut self, settings: MadgwickSettings) {
        let mut settings = settings;
        if !(settings.sample_rate.is_finite() && settings.sample_rate > 0.0) {
            warn!(
                "invalid filter sample rate {}, using {} Hz",
                settings.sample_rate,
                MadgwickSettings::default().sample_rate
            );
            settings.sample_rate = MadgwickSettings::default().sample_rate;
        }
        self.settings = settings;
    }

    pub fn settings(&self) -> MadgwickSettings {
        self.settings
    }

    /// Set the gradient-descent gain
    pub fn set_beta(&mut self, beta: f32) {
        self.settings.beta = beta;
    }

    /// 9-axis update
    ///
    /// Gyroscope in rad/s; accelerometer and magnetometer in any consistent
    /// units. A magnetometer of exactly zero selects the 6-axis update. An
    /// accelerometer of exactly zero skips the correction step and integrates
    /// the gyroscope alone.
    pub fn update(
        &mut self,
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
    ) {
        if magnetometer.is_exact_zero() {
            self.update_imu(gyroscope, accelerometer);
            return;
        }
        if accelerometer.is_exact_zero() {
            self.integrate(gyroscope, Vector4::zeros());
            return;
        }

        let a = accelerometer.safe_normalize();
        let m = magnetometer.safe_normalize();

        // Earth field reference: rotate the measurement into the Earth frame
        // and keep only its horizontal magnitude and vertical component
        let h = self.unit() * m;
        let bx = (h.x * h.x + h.y * h.y).sqrt();
        let bz = h.z;

        let (q0, q1, q2, q3) = (self.q.w, self.q.i, self.q.j, self.q.k);

        let f_b = Vector3::new(
            2.0 * bx * (0.5 - q2 * q2 - q3 * q3) + 2.0 * bz * (q1 * q3 - q0 * q2) - m.x,
            2.0 * bx * (q1 * q2 - q0 * q3) + 2.0 * bz * (q0 * q1 + q2 * q3) - m.y,
            2.0 * bx * (q0 * q2 + q1 * q3) + 2.0 * bz * (0.5 - q1 * q1 - q2 * q2) - m.z,
        );
        #[rustfmt::skip]
        let j_b = Matrix3x4::new(
            -2.0 * bz * q2,                   2.0 * bz * q3,                    -4.0 * bx * q2 - 2.0 * bz * q0, -4.0 * bx * q3 + 2.0 * bz * q1,
            -2.0 * bx * q3 + 2.0 * bz * q1,   2.0 * bx * q2 + 2.0 * bz * q0,    2.0 * bx * q1 + 2.0 * bz * q3,  -2.0 * bx * q0 + 2.0 * bz * q2,
            2.0 * bx * q2,                    2.0 * bx * q3 - 4.0 * bz * q1,    2.0 * bx * q0 - 4.0 * bz * q2,  2.0 * bx * q1,
        );

        let gradient = self.gravity_gradient(a) + j_b.transpose() * f_b;
        self.integrate(gyroscope, gradient);
    }

    /// 6-axis update (gyroscope and accelerometer only)
    ///
    /// Heading is unobservable in this mode and drifts with the gyroscope.
    pub fn update_imu(&mut self, gyroscope: Vector3<f32>, accelerometer: Vector3<f32>) {
        let a = accelerometer.safe_normalize();
        let gradient = if a.is_exact_zero() {
            Vector4::zeros()
        } else {
            self.gravity_gradient(a)
        };
        self.integrate(gyroscope, gradient);
    }

    /// Current orientation
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.unit()
    }

    /// Current orientation as `[q0, q1, q2, q3]` (scalar first)
    pub fn components(&self) -> [f32; 4] {
        [self.q.w, self.q.i, self.q.j, self.q.k]
    }

    /// Seed the estimate, e.g. from a previous session
    pub fn set_quaternion(&mut self, quaternion: UnitQuaternion<f32>) {
        self.q = quaternion.into_inner();
    }

    /// Roll, pitch, yaw in degrees
    pub fn euler_angles(&self) -> Vector3<f32> {
        euler_degrees(&self.q)
    }

    /// Unit up vector in the sensor frame
    pub fn gravity(&self) -> Vector3<f32> {
        gravity_from_quaternion(&self.q)
    }

    /// Gradient of the gravity objective `f_g = R^T z - a` for a normalized `a`
    fn gravity_gradient(&self, a: Vector3<f32>) -> Vector4<f32> {
        let (q0, q1, q2, q3) = (self.q.w, self.q.i, self.q.j, self.q.k);

        let f_g = Vector3::new(
            2.0 * (q1 * q3 - q0 * q2) - a.x,
            2.0 * (q0 * q1 + q2 * q3) - a.y,
            2.0 * (0.5 - q1 * q1 - q2 * q2) - a.z,
        );
        #[rustfmt::skip]
        let j_g = Matrix3x4::new(
            -2.0 * q2, 2.0 * q3,  -2.0 * q0, 2.0 * q1,
            2.0 * q1,  2.0 * q0,  2.0 * q3,  2.0 * q2,
            0.0,       -4.0 * q1, -4.0 * q2, 0.0,
        );

        j_g.transpose() * f_g
    }

    /// Blend the gyroscope derivative with the normalized gradient step,
    /// integrate over one sample period and renormalize
    fn integrate(&mut self, gyroscope: Vector3<f32>, gradient: Vector4<f32>) {
        let norm = gradient.norm();
        // An exact fixed point has a zero gradient; normalizing it would give NaN
        let step = if norm > 0.0 { gradient / norm } else { Vector4::zeros() };

        let omega = Quaternion::from_parts(0.0, gyroscope);
        let q_dot = (self.q * omega) * 0.5;
        let correction = Quaternion::new(step[0], step[1], step[2], step[3]) * self.settings.beta;

        let next = self.q + (q_dot - correction) * (1.0 / self.settings.sample_rate);
        let next_norm = next.norm();
        if next_norm > 0.0 && next_norm.is_finite() {
            self.q = next / next_norm;
        } else {
            warn!("attitude update produced a degenerate quaternion, keeping previous estimate");
        }
        trace!(
            "q = [{:.4}, {:.4}, {:.4}, {:.4}]",
            self.q.w, self.q.i, self.q.j, self.q.k
        );
    }

    fn unit(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::new_unchecked(self.q)
    }
}

impl Default for Madgwick {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::QuaternionExt;
    use approx::assert_relative_eq;

    const GRAVITY: Vector3<f32> = Vector3::new(0.0, 0.0, 9.81);
    const NORTH_FIELD: Vector3<f32> = Vector3::new(22.0, 0.0, -40.0);

    fn assert_unit(filter: &Madgwick) {
        let [w, x, y, z] = filter.components();
        let norm = (w * w + x * x + y * y + z * z).sqrt();
        assert!((norm - 1.0).abs() < 1e-3, "norm drifted to {norm}");
    }

    #[test]
    fn test_new_filter() {
        let filter = Madgwick::new();
        assert_eq!(filter.quaternion(), UnitQuaternion::identity());
        assert_eq!(filter.settings(), MadgwickSettings::default());
        assert_eq!(filter.gravity(), Vector3::z());
    }

    #[test]
    fn test_invalid_sample_rate_falls_back() {
        let filter = Madgwick::with_settings(MadgwickSettings {
            sample_rate: 0.0,
            ..Default::default()
        });
        assert_eq!(filter.settings().sample_rate, MadgwickSettings::RATE_50_HZ);
    }

    #[test]
    fn test_static_input_at_identity_is_fixed_point() {
        let mut filter = Madgwick::new();
        for _ in 0..500 {
            filter.update(Vector3::zeros(), GRAVITY, Vector3::new(1.0, 0.0, 0.0));
        }
        let euler = filter.euler_angles();
        assert!(euler.norm() < 0.5, "drifted to {euler:?}");
    }

    #[test]
    fn test_static_input_converges_to_level_north() {
        let mut filter = Madgwick::new();
        filter.set_quaternion(UnitQuaternion::from_euler_degrees(20.0, -15.0, 30.0));

        for _ in 0..3000 {
            filter.update(Vector3::zeros(), GRAVITY, NORTH_FIELD);
            assert_unit(&filter);
        }
        let converged = filter.euler_angles();
        assert!(converged.norm() < 1.0, "did not converge: {converged:?}");

        // Stays put once converged
        for _ in 0..500 {
            filter.update(Vector3::zeros(), GRAVITY, NORTH_FIELD);
            assert!(filter.euler_angles().norm() < 1.0);
        }
    }

    #[test]
    fn test_imu_update_levels_roll_and_pitch() {
        let mut filter = Madgwick::new();
        filter.set_quaternion(UnitQuaternion::from_euler_degrees(25.0, 10.0, 0.0));

        for _ in 0..3000 {
            filter.update_imu(Vector3::zeros(), GRAVITY);
        }
        let euler = filter.euler_angles();
        assert!(euler.x.abs() < 1.0);
        assert!(euler.y.abs() < 1.0);
    }

    #[test]
    fn test_zero_magnetometer_selects_imu_path() {
        let mut nine_axis = Madgwick::new();
        let mut six_axis = Madgwick::new();
        let tilted = UnitQuaternion::from_euler_degrees(10.0, 5.0, 40.0);
        nine_axis.set_quaternion(tilted);
        six_axis.set_quaternion(tilted);

        let gyro = Vector3::new(0.1, -0.2, 0.05);
        nine_axis.update(gyro, GRAVITY, Vector3::zeros());
        six_axis.update_imu(gyro, GRAVITY);

        assert_eq!(nine_axis.components(), six_axis.components());
    }

    #[test]
    fn test_zero_accelerometer_integrates_gyroscope_only() {
        for magnetometer in [Vector3::zeros(), NORTH_FIELD] {
            let mut filter = Madgwick::new();
            // 1 rad/s about Z for one second at 50 Hz
            for _ in 0..50 {
                filter.update(Vector3::new(0.0, 0.0, 1.0), Vector3::zeros(), magnetometer);
            }
            let yaw = filter.euler_angles().z;
            assert_relative_eq!(yaw, 57.2958, epsilon = 0.5);
            assert_unit(&filter);
        }
    }

    #[test]
    fn test_norm_preserved_under_varying_input() {
        let mut filter = Madgwick::with_settings(MadgwickSettings {
            beta: 0.5,
            sample_rate: MadgwickSettings::RATE_200_HZ,
        });

        for i in 0..5000 {
            let t = i as f32 * 0.005;
            let gyro = Vector3::new(3.0 * t.sin(), -2.0 * (1.3 * t).cos(), 4.0 * (0.7 * t).sin());
            let accel = Vector3::new(5.0 * (2.0 * t).sin(), 3.0 * t.cos(), 9.81);
            let mag = Vector3::new(20.0 + t.cos(), 5.0 * t.sin(), -40.0);
            filter.update(gyro, accel, mag);
            assert_unit(&filter);
        }
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut filter = Madgwick::new();
        for _ in 0..10 {
            filter.update(Vector3::new(1.0, 2.0, 3.0), GRAVITY, NORTH_FIELD);
        }
        assert_ne!(filter.quaternion(), UnitQuaternion::identity());

        filter.reset();
        assert_eq!(filter.quaternion(), UnitQuaternion::identity());
    }

    #[test]
    fn test_higher_beta_converges_faster() {
        let start = UnitQuaternion::from_euler_degrees(30.0, 0.0, 0.0);
        let mut slow = Madgwick::new();
        let mut fast = Madgwick::new();
        fast.set_beta(0.5);
        slow.set_quaternion(start);
        fast.set_quaternion(start);

        for _ in 0..50 {
            slow.update_imu(Vector3::zeros(), GRAVITY);
            fast.update_imu(Vector3::zeros(), GRAVITY);
        }
        assert!(fast.euler_angles().x.abs() < slow.euler_angles().x.abs());
    }
}
