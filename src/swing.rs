//! Threshold-based swing detection with hysteresis

use log::{debug, trace, warn};
use nalgebra::Vector3;

use crate::math::MPS_TO_KMH;
use crate::types::{SwingPhase, SwingSettings, SwingType};

/// Per-update projection of the detector state
///
/// `current_*` fields describe the swing in progress and are zero when idle,
/// including on the update that ends or discards a swing. `last_*` fields
/// describe the most recent valid swing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwingMetrics {
    /// Peak linear acceleration of the swing in progress (m/s²)
    pub current_peak_accel: f32,
    /// Elapsed time of the swing in progress (ms)
    pub current_duration_ms: u64,
    /// Peak linear acceleration of the last valid swing (m/s²)
    pub last_peak_accel: f32,
    /// Duration of the last valid swing (ms)
    pub last_duration_ms: u64,
    /// Valid swings completed this session
    pub total_swings: u32,
    /// True while a swing is in progress
    pub is_active: bool,
    pub phase: SwingPhase,
    /// Classification, present only on the update that completes a swing
    pub swing_type: Option<SwingType>,
    /// Integrated speed (km/h)
    pub current_speed_kmh: f32,
    /// Peak speed of the swing in progress (km/h)
    pub peak_speed_kmh: f32,
    /// Peak speed of the last valid swing (km/h)
    pub last_peak_speed_kmh: f32,
}

/// A completed, valid swing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwingEvent {
    /// Timestamp of the sample that started the swing (ns)
    pub start: u64,
    /// Timestamp of the sample that ended the swing (ns)
    pub end: u64,
    pub duration_ms: u64,
    pub peak_acceleration: f32,
    pub peak_speed_kmh: f32,
    pub swing_type: SwingType,
}

#[derive(Debug, Clone, Default)]
struct SwingState {
    is_swinging: bool,
    swing_start_time: u64,
    last_update_time: Option<u64>,
    velocity: Vector3<f32>,
    current_speed_kmh: f32,
    peak_speed_kmh: f32,
    peak_acceleration: f32,
    total_swings: u32,
    last_filtered_accel: Vector3<f32>,
    orientation_z: f32,
    last_peak_acceleration: f32,
    last_peak_speed_kmh: f32,
    last_duration_ms: u64,
}

/// Swing detector
///
/// A swing starts when the linear acceleration magnitude rises strictly above
/// `start_threshold` and ends when it falls strictly below `end_threshold`.
/// While swinging, a high-pass filtered acceleration is integrated into
/// velocity to estimate speed. Swings shorter than `min_duration_ms` are
/// discarded without being counted.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use swing_fusion::{SwingDetector, SwingPhase};
///
/// let mut detector = SwingDetector::new();
/// let level = Vector3::zeros();
/// let ms = 1_000_000;
///
/// detector.update(Vector3::new(35.0, 0.0, 0.0), level, 0);
/// detector.update(Vector3::new(35.0, 0.0, 0.0), level, 300 * ms);
/// let metrics = detector.update(Vector3::new(2.0, 0.0, 0.0), level, 600 * ms);
///
/// assert_eq!(metrics.phase, SwingPhase::Ended);
/// assert_eq!(metrics.total_swings, 1);
/// ```
#[derive(Debug, Clone)]
pub struct SwingDetector {
    settings: SwingSettings,
    state: SwingState,
    last_swing: Option<SwingEvent>,
}

impl SwingDetector {
    pub fn new() -> Self {
        Self::with_settings(SwingSettings::default())
    }

    pub fn with_settings(settings: SwingSettings) -> Self {
        if settings.end_threshold >= settings.start_threshold {
            warn!(
                "swing end threshold {} is not below start threshold {}, detection has no hysteresis",
                settings.end_threshold, settings.start_threshold
            );
        }
        Self {
            settings,
            state: SwingState::default(),
            last_swing: None,
        }
    }

    pub fn settings(&self) -> SwingSettings {
        self.settings
    }

    /// Process one linear acceleration sample (m/s²) with the current
    /// orientation (Euler degrees) at `timestamp` (ns)
    pub fn update(
        &mut self,
        acceleration: Vector3<f32>,
        orientation: Vector3<f32>,
        timestamp: u64,
    ) -> SwingMetrics {
        let magnitude = acceleration.norm();
        if !magnitude.is_finite() {
            warn!("ignoring non-finite acceleration at {timestamp}");
            return self.metrics(self.idle_or_active_phase(), None);
        }

        let delta_time = self.delta_time(timestamp);
        self.state.last_update_time = Some(timestamp);
        if orientation.z.is_finite() {
            self.state.orientation_z = orientation.z;
        }

        if !self.state.is_swinging {
            if magnitude > self.settings.start_threshold {
                self.start_swing(timestamp);
                self.integrate(acceleration, delta_time);
                self.state.peak_acceleration = magnitude;
                debug!("swing started at {timestamp} with {magnitude:.1} m/s²");
                return self.metrics(SwingPhase::Starting, None);
            }

            if magnitude < self.settings.motionless_threshold {
                self.state.velocity = Vector3::zeros();
                self.state.current_speed_kmh = 0.0;
            }
            return self.metrics(SwingPhase::Idle, None);
        }

        self.integrate(acceleration, delta_time);
        self.state.peak_acceleration = self.state.peak_acceleration.max(magnitude);

        if magnitude >= self.settings.end_threshold {
            return self.metrics(SwingPhase::Swinging, None);
        }

        let duration_ms = self.duration_ms(timestamp);
        if duration_ms < self.settings.min_duration_ms {
            debug!("discarding {duration_ms} ms swing, shorter than minimum");
            self.clear_swing();
            return self.metrics(SwingPhase::Discarded, None);
        }

        let swing_type = self.classify();
        let event = SwingEvent {
            start: self.state.swing_start_time,
            end: timestamp,
            duration_ms,
            peak_acceleration: self.state.peak_acceleration,
            peak_speed_kmh: self.state.peak_speed_kmh,
            swing_type,
        };

        self.state.total_swings += 1;
        self.state.last_peak_acceleration = event.peak_acceleration;
        self.state.last_peak_speed_kmh = event.peak_speed_kmh;
        self.state.last_duration_ms = duration_ms;
        self.state.is_swinging = false;
        self.state.velocity = Vector3::zeros();
        self.state.current_speed_kmh = 0.0;
        self.last_swing = Some(event);

        debug!(
            "swing {} ended: {:?}, {} ms, peak {:.1} m/s², {:.1} km/h",
            self.state.total_swings,
            swing_type,
            duration_ms,
            event.peak_acceleration,
            event.peak_speed_kmh
        );
        self.metrics(SwingPhase::Ended, Some(swing_type))
    }

    /// Snapshot of the current state without processing a sample
    pub fn current_metrics(&self) -> SwingMetrics {
        self.metrics(self.idle_or_active_phase(), None)
    }

    /// Most recent valid swing, if any
    pub fn last_swing(&self) -> Option<SwingEvent> {
        self.last_swing
    }

    pub fn is_swinging(&self) -> bool {
        self.state.is_swinging
    }

    /// Start timestamp of the swing in progress
    pub fn swing_start_time(&self) -> Option<u64> {
        self.state
            .is_swinging
            .then_some(self.state.swing_start_time)
    }

    pub fn total_swings(&self) -> u32 {
        self.state.total_swings
    }

    /// Return to the initial state, clearing session counters
    pub fn reset(&mut self) {
        self.state = SwingState::default();
        self.last_swing = None;
    }

    fn delta_time(&self, timestamp: u64) -> f32 {
        let delta = self
            .state
            .last_update_time
            .map(|last| timestamp.saturating_sub(last) as f32 / 1e9)
            .unwrap_or(0.0);
        // Timestamps closer than 1 ms (or repeated) fall back to the nominal step
        if delta < 0.001 {
            self.settings.nominal_dt
        } else {
            delta
        }
    }

    fn start_swing(&mut self, timestamp: u64) {
        self.state.is_swinging = true;
        self.state.swing_start_time = timestamp;
        self.state.velocity = Vector3::zeros();
        self.state.current_speed_kmh = 0.0;
        self.state.peak_speed_kmh = 0.0;
        self.state.peak_acceleration = 0.0;
    }

    fn clear_swing(&mut self) {
        self.state.is_swinging = false;
        self.state.velocity = Vector3::zeros();
        self.state.current_speed_kmh = 0.0;
        self.state.peak_speed_kmh = 0.0;
        self.state.peak_acceleration = 0.0;
    }

    /// High-pass filter the acceleration and integrate it into velocity
    fn integrate(&mut self, acceleration: Vector3<f32>, delta_time: f32) {
        let alpha = self.settings.high_pass_alpha;
        let filtered = acceleration * (1.0 - alpha) + self.state.last_filtered_accel * alpha;
        self.state.last_filtered_accel = filtered;

        self.state.velocity += filtered * delta_time;
        self.state.current_speed_kmh = self.state.velocity.norm() * MPS_TO_KMH;
        self.state.peak_speed_kmh = self.state.peak_speed_kmh.max(self.state.current_speed_kmh);

        trace!(
            "raw {:.2} m/s², filtered {:.2} m/s², dt {:.4} s, velocity {:.2} m/s",
            acceleration.norm(),
            filtered.norm(),
            delta_time,
            self.state.velocity.norm()
        );
    }

    fn classify(&self) -> SwingType {
        let z = self.state.orientation_z;
        if z > self.settings.angular_threshold {
            SwingType::Forehand
        } else if z < -self.settings.angular_threshold {
            SwingType::Backhand
        } else {
            SwingType::Neutral
        }
    }

    fn duration_ms(&self, timestamp: u64) -> u64 {
        timestamp.saturating_sub(self.state.swing_start_time) / 1_000_000
    }

    fn idle_or_active_phase(&self) -> SwingPhase {
        if self.state.is_swinging {
            SwingPhase::Swinging
        } else {
            SwingPhase::Idle
        }
    }

    fn metrics(&self, phase: SwingPhase, swing_type: Option<SwingType>) -> SwingMetrics {
        let state = &self.state;
        let (current_peak_accel, current_duration_ms) = if state.is_swinging {
            let now = state.last_update_time.unwrap_or(state.swing_start_time);
            (state.peak_acceleration, self.duration_ms(now))
        } else {
            (0.0, 0)
        };

        SwingMetrics {
            current_peak_accel,
            current_duration_ms,
            last_peak_accel: state.last_peak_acceleration,
            last_duration_ms: state.last_duration_ms,
            total_swings: state.total_swings,
            is_active: state.is_swinging,
            phase,
            swing_type,
            current_speed_kmh: state.current_speed_kmh,
            peak_speed_kmh: if state.is_swinging { state.peak_speed_kmh } else { 0.0 },
            last_peak_speed_kmh: state.last_peak_speed_kmh,
        }
    }
}

impl Default for SwingDetector {
    fn default() -> Self {
        Self::new()
    }
}
