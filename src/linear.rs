//! Gravity separation and drift-bounded position tracking

use std::collections::VecDeque;

use log::{debug, trace};
use nalgebra::{Vector2, Vector3};

use crate::madgwick::Madgwick;
use crate::math::STANDARD_GRAVITY;
use crate::types::{MadgwickSettings, PipelineSettings, TrackingSettings};

/// Separates linear acceleration from gravity using the attitude filter
///
/// Gyroscope and magnetometer samples are held and each accelerometer sample
/// drives exactly one filter step with the latest held readings. The filter
/// therefore runs at the accelerometer cadence, and its `sample_rate` should
/// be set to that cadence. A held reading that is not refreshed within
/// `hold_limit` steps is dropped, so a sensor dropout stops rotating the
/// estimate instead of replaying the last rate forever.
///
/// Before any gyroscope or magnetometer data arrives the estimate starts from
/// identity, so the first gravity estimate is `(0, 0, 9.81)`. That transient
/// settles as accelerometer corrections accumulate.
#[derive(Debug, Clone)]
pub struct LinearMotionExtractor {
    filter: Madgwick,
    gyroscope: Vector3<f32>,
    magnetometer: Vector3<f32>,
    gravity: Vector3<f32>,
    last_timestamp: Option<u64>,
    hold_limit: u32,
    gyroscope_steps: u32,
    magnetometer_steps: u32,
}

impl LinearMotionExtractor {
    pub fn new(settings: MadgwickSettings) -> Self {
        Self::with_hold_limit(settings, PipelineSettings::DEFAULT_HOLD_LIMIT)
    }

    /// `hold_limit` of 0 keeps held readings until they are replaced
    pub fn with_hold_limit(settings: MadgwickSettings, hold_limit: u32) -> Self {
        Self {
            filter: Madgwick::with_settings(settings),
            gyroscope: Vector3::zeros(),
            magnetometer: Vector3::zeros(),
            gravity: Vector3::new(0.0, 0.0, STANDARD_GRAVITY),
            last_timestamp: None,
            hold_limit,
            gyroscope_steps: 0,
            magnetometer_steps: 0,
        }
    }

    /// Hold the latest angular rate (rad/s) for the next filter steps
    pub fn set_gyroscope(&mut self, gyroscope: Vector3<f32>) {
        self.gyroscope = gyroscope;
        self.gyroscope_steps = 0;
    }

    /// Hold the latest magnetic field for the next filter steps
    pub fn set_magnetometer(&mut self, magnetometer: Vector3<f32>) {
        self.magnetometer = magnetometer;
        self.magnetometer_steps = 0;
    }

    /// Step the filter with `raw_acceleration` (m/s²) and return it minus gravity
    pub fn calculate_linear_acceleration(
        &mut self,
        raw_acceleration: Vector3<f32>,
        timestamp: u64,
    ) -> Vector3<f32> {
        self.filter
            .update(self.gyroscope, raw_acceleration, self.magnetometer);
        self.gravity = self.filter.gravity() * STANDARD_GRAVITY;
        self.last_timestamp = Some(timestamp);
        self.age_held_readings(timestamp);

        let linear = raw_acceleration - self.gravity;
        trace!(
            "linear acceleration at {timestamp}: [{:.2}, {:.2}, {:.2}]",
            linear.x, linear.y, linear.z
        );
        linear
    }

    /// Gravity in the sensor frame (m/s²) from the latest filter step
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    pub fn gyroscope(&self) -> Vector3<f32> {
        self.gyroscope
    }

    pub fn filter(&self) -> &Madgwick {
        &self.filter
    }

    /// Timestamp of the accelerometer sample that last stepped the filter
    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    pub fn reset(&mut self) {
        self.filter.reset();
        self.gyroscope = Vector3::zeros();
        self.magnetometer = Vector3::zeros();
        self.gravity = Vector3::new(0.0, 0.0, STANDARD_GRAVITY);
        self.last_timestamp = None;
        self.gyroscope_steps = 0;
        self.magnetometer_steps = 0;
    }

    fn age_held_readings(&mut self, timestamp: u64) {
        if self.hold_limit == 0 {
            return;
        }

        self.gyroscope_steps = self.gyroscope_steps.saturating_add(1);
        if self.gyroscope_steps >= self.hold_limit && self.gyroscope != Vector3::zeros() {
            debug!("gyroscope reading stale at {timestamp}, dropping it");
            self.gyroscope = Vector3::zeros();
        }

        self.magnetometer_steps = self.magnetometer_steps.saturating_add(1);
        if self.magnetometer_steps >= self.hold_limit && self.magnetometer != Vector3::zeros() {
            debug!("magnetometer reading stale at {timestamp}, falling back to 6-axis updates");
            self.magnetometer = Vector3::zeros();
        }
    }
}

/// Snapshot of the position tracker
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackingState {
    /// XY position in metres
    pub position: Vector2<f32>,
    /// Accumulated XY path length in metres
    pub total_distance: f32,
    /// Most recent positions where linear acceleration exceeded the
    /// highlight threshold, oldest first
    pub highlights: VecDeque<Vector2<f32>>,
    /// Timestamp of the last integrated sample (ns)
    pub last_update: u64,
}

/// Integrates linear acceleration into velocity and position
///
/// Whenever the linear acceleration magnitude drops below the ZUPT threshold
/// the velocity is forced to zero and nothing is integrated, which bounds the
/// drift of double integration. The first sample only primes the clock.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    settings: TrackingSettings,
    velocity: Vector3<f32>,
    position: Vector3<f32>,
    last_timestamp: Option<u64>,
    state: TrackingState,
}

impl PositionTracker {
    pub fn new(settings: TrackingSettings) -> Self {
        Self {
            settings,
            velocity: Vector3::zeros(),
            position: Vector3::zeros(),
            last_timestamp: None,
            state: TrackingState::default(),
        }
    }

    /// Integrate one linear acceleration sample (m/s²) taken at `timestamp` (ns)
    pub fn update(&mut self, linear_acceleration: Vector3<f32>, timestamp: u64) -> &TrackingState {
        let Some(last) = self.last_timestamp else {
            self.last_timestamp = Some(timestamp);
            return &self.state;
        };
        // Out-of-order timestamps are not reordered; they integrate nothing
        let delta_time = timestamp.saturating_sub(last) as f32 / 1e9;
        self.last_timestamp = Some(timestamp);

        let previous = self.position;
        let magnitude = linear_acceleration.norm();

        if magnitude < self.settings.zupt_threshold {
            self.velocity = Vector3::zeros();
        } else {
            self.velocity += linear_acceleration * delta_time;
            self.position += self.velocity * delta_time;
        }

        let dx = self.position.x - previous.x;
        let dy = self.position.y - previous.y;
        self.state.total_distance += (dx * dx + dy * dy).sqrt();

        if let Some(bounds) = self.settings.bounds {
            self.position.x = self.position.x.clamp(0.0, bounds.width);
            self.position.y = self.position.y.clamp(0.0, bounds.depth);
        }

        self.state.position = self.position.xy();
        if magnitude > self.settings.highlight_threshold && self.settings.max_highlights > 0 {
            if self.state.highlights.len() >= self.settings.max_highlights {
                self.state.highlights.pop_front();
            }
            self.state.highlights.push_back(self.state.position);
        }
        self.state.last_update = timestamp;
        &self.state
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn reset(&mut self) {
        self.velocity = Vector3::zeros();
        self.position = Vector3::zeros();
        self.last_timestamp = None;
        self.state = TrackingState::default();
    }
}
