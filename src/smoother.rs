//! Moving-average orientation smoothing

use std::collections::VecDeque;

use nalgebra::{Quaternion, Vector3};

use crate::math::{STANDARD_GRAVITY, euler_degrees, gravity_from_quaternion};
use crate::types::StampedQuaternion;

/// Number of quaternions averaged by the orientation smoother
pub const ORIENTATION_WINDOW: usize = 5;

/// Fixed-capacity FIFO of vectors; the oldest entry is evicted on overflow
#[derive(Debug, Clone)]
pub struct CircularBuffer {
    buffer: VecDeque<Vector3<f32>>,
    capacity: usize,
}

impl CircularBuffer {
    /// A zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, vector: Vector3<f32>) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(vector);
    }

    /// Mean of the buffered vectors, zero when empty
    pub fn average(&self) -> Vector3<f32> {
        if self.buffer.is_empty() {
            return Vector3::zeros();
        }
        let sum: Vector3<f32> = self.buffer.iter().sum();
        sum / self.buffer.len() as f32
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Smooths fused orientation quaternions and derives Euler angles and gravity
///
/// Only the vector part `(qi, qj, qk)` is averaged; the scalar part of the
/// newest sample is kept as is. The smoothed quaternion is not renormalized
/// before Euler extraction, matching how the averaged estimate is consumed.
///
/// # Example
/// ```
/// use swing_fusion::{OrientationSmoother, StampedQuaternion};
///
/// let mut smoother = OrientationSmoother::new();
/// smoother.update_orientation(StampedQuaternion::identity(0));
///
/// assert_eq!(smoother.gravity_vector().z, 9.81);
/// ```
#[derive(Debug, Clone)]
pub struct OrientationSmoother {
    buffer: CircularBuffer,
    orientation: Vector3<f32>,
    gravity: Vector3<f32>,
    smoothed: Option<StampedQuaternion>,
}

impl OrientationSmoother {
    pub fn new() -> Self {
        Self::with_window(ORIENTATION_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            buffer: CircularBuffer::new(window),
            orientation: Vector3::zeros(),
            gravity: Vector3::zeros(),
            smoothed: None,
        }
    }

    /// Push a new orientation sample and refresh the cached outputs
    pub fn update_orientation(&mut self, quaternion: StampedQuaternion) -> StampedQuaternion {
        self.buffer.push(quaternion.quaternion.imag());
        let averaged = self.buffer.average();

        let smoothed = StampedQuaternion {
            timestamp: quaternion.timestamp,
            quaternion: Quaternion::from_parts(quaternion.qs(), averaged),
        };

        self.orientation = euler_degrees(&smoothed.quaternion);
        self.gravity = gravity_from_quaternion(&smoothed.quaternion) * STANDARD_GRAVITY;
        self.smoothed = Some(smoothed);
        smoothed
    }

    /// Last Euler estimate (roll, pitch, yaw) in degrees
    pub fn current_orientation(&self) -> Vector3<f32> {
        self.orientation
    }

    /// Last stabilized gravity vector in m/s², zero before the first sample
    pub fn gravity_vector(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Last smoothed quaternion, if any sample has been seen
    pub fn smoothed_quaternion(&self) -> Option<StampedQuaternion> {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.orientation = Vector3::zeros();
        self.gravity = Vector3::zeros();
        self.smoothed = None;
    }
}

impl Default for OrientationSmoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::QuaternionExt;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn stamped(timestamp: u64, q: UnitQuaternion<f32>) -> StampedQuaternion {
        StampedQuaternion {
            timestamp,
            quaternion: q.into_inner(),
        }
    }

    #[test]
    fn test_buffer_evicts_oldest() {
        let mut buffer = CircularBuffer::new(3);
        for i in 1..=4 {
            buffer.push(Vector3::new(i as f32, 0.0, 0.0));
        }
        assert_eq!(buffer.len(), 3);
        // (2 + 3 + 4) / 3
        assert_relative_eq!(buffer.average().x, 3.0);
    }

    #[test]
    fn test_empty_buffer_average_is_zero() {
        let buffer = CircularBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.average(), Vector3::zeros());
    }

    #[test]
    fn test_identical_samples_are_a_fixed_point() {
        let q = UnitQuaternion::from_euler_degrees(10.0, 20.0, 30.0);
        let mut smoother = OrientationSmoother::new();
        let mut last = None;
        for t in 0..ORIENTATION_WINDOW as u64 {
            last = Some(smoother.update_orientation(stamped(t, q)));
        }

        let smoothed = last.unwrap().quaternion;
        assert_relative_eq!(smoothed.imag(), q.imag(), epsilon = 1e-6);
        assert_relative_eq!(smoothed.w, q.w);

        let euler = smoother.current_orientation();
        assert_relative_eq!(euler, Vector3::new(10.0, 20.0, 30.0), epsilon = 1e-3);
    }

    #[test]
    fn test_outlier_shifts_average_by_one_fifth() {
        let base = StampedQuaternion::new(0, 0.1, 0.2, 0.3, 0.927);
        let outlier = StampedQuaternion::new(5, 0.6, -0.3, 0.8, 0.927);

        let mut smoother = OrientationSmoother::new();
        for _ in 0..4 {
            smoother.update_orientation(base);
        }
        let smoothed = smoother.update_orientation(outlier);

        let deviation = outlier.quaternion.imag() - base.quaternion.imag();
        let expected = base.quaternion.imag() + deviation / 5.0;
        assert_relative_eq!(smoothed.quaternion.imag(), expected, epsilon = 1e-6);
        assert_eq!(smoothed.timestamp, 5);
    }

    #[test]
    fn test_scalar_part_is_not_smoothed() {
        let mut smoother = OrientationSmoother::new();
        smoother.update_orientation(StampedQuaternion::new(0, 0.0, 0.0, 0.0, 1.0));
        let smoothed = smoother.update_orientation(StampedQuaternion::new(1, 0.0, 0.0, 0.6, 0.8));

        assert_eq!(smoothed.qs(), 0.8);
        assert_relative_eq!(smoothed.qk(), 0.3);
    }

    #[test]
    fn test_gravity_at_identity() {
        let mut smoother = OrientationSmoother::new();
        assert_eq!(smoother.gravity_vector(), Vector3::zeros());

        smoother.update_orientation(StampedQuaternion::identity(0));
        assert_eq!(smoother.gravity_vector(), Vector3::new(0.0, 0.0, 9.81));
        assert_eq!(smoother.current_orientation(), Vector3::zeros());
    }

    #[test]
    fn test_reset_clears_window() {
        let mut smoother = OrientationSmoother::new();
        smoother.update_orientation(StampedQuaternion::new(0, 0.5, 0.0, 0.0, 0.866));
        smoother.reset();
        assert!(smoother.smoothed_quaternion().is_none());

        let smoothed = smoother.update_orientation(StampedQuaternion::identity(1));
        assert_eq!(smoothed.quaternion, Quaternion::identity());
    }
}
