//! Session aggregation: one pipeline instance per device session

use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};
use nalgebra::{Quaternion, UnitQuaternion, Vector2, Vector3};

use crate::audio::{AudioImpactAnalyzer, ImpactData};
use crate::environment::{EnvironmentMonitor, EnvironmentalConditions};
use crate::error::{SampleError, SessionError, SessionResult};
use crate::linear::{LinearMotionExtractor, PositionTracker, TrackingState};
use crate::sample::{SensorReading, SensorSample};
use crate::smoother::OrientationSmoother;
use crate::swing::{SwingDetector, SwingEvent, SwingMetrics};
use crate::types::{PipelineSettings, ShotType, StampedQuaternion};

/// Count of audio-confirmed impacts per shot type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShotDistribution {
    pub forehand: u32,
    pub backhand: u32,
    pub serve: u32,
}

impl ShotDistribution {
    pub fn count(&self, shot: ShotType) -> u32 {
        match shot {
            ShotType::Forehand => self.forehand,
            ShotType::Backhand => self.backhand,
            ShotType::Serve => self.serve,
        }
    }

    pub fn record(&mut self, shot: ShotType) {
        match shot {
            ShotType::Forehand => self.forehand += 1,
            ShotType::Backhand => self.backhand += 1,
            ShotType::Serve => self.serve += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.forehand + self.backhand + self.serve
    }
}

/// Immutable per-sample snapshot of the whole session
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionMetrics {
    /// Timestamp of the first sample of the session (ns)
    pub session_start: Option<u64>,
    pub samples_processed: u64,
    /// Last fused quaternion as received, before calibration
    pub raw_quaternion: Option<StampedQuaternion>,
    /// Calibrated and smoothed fused quaternion
    pub smoothed_quaternion: Option<StampedQuaternion>,
    /// m/s²
    pub raw_acceleration: Vector3<f32>,
    /// m/s²
    pub linear_acceleration: Vector3<f32>,
    /// rad/s
    pub angular_velocity: Vector3<f32>,
    /// Roll, pitch, yaw in degrees
    pub orientation: Vector3<f32>,
    /// Gravity in the sensor frame (m/s²)
    pub gravity: Vector3<f32>,
    pub swing: SwingMetrics,
    pub last_swing: Option<SwingEvent>,
    /// Highest peak speed of the valid swings of the session (km/h)
    pub swing_speed_peak: f32,
    /// km/h
    pub current_speed_kmh: f32,
    pub shot_distribution: ShotDistribution,
    /// Impact reported since the previous snapshot, default otherwise
    pub last_impact: ImpactData,
    pub environment: EnvironmentalConditions,
    /// XY position (m)
    pub position: Vector2<f32>,
    /// Accumulated XY distance (m)
    pub total_distance: f32,
}

/// Sensor fusion and motion analysis pipeline for one device session
///
/// Owns every stateful component. Samples are dispatched by kind:
/// - accelerometer: steps the attitude filter, separates gravity, feeds the
///   swing detector and the position tracker
/// - gyroscope, magnetometer: held for the next filter step
/// - fused quaternion: calibrated and smoothed for orientation output
/// - pressure, temperature, humidity: environmental snapshot
///
/// Not synchronized; wrap it in [`SessionController`] to share it between threads.
///
/// # Example
/// ```
/// use swing_fusion::{MotionPipeline, SensorSample};
///
/// let mut pipeline = MotionPipeline::new();
/// pipeline.process(&SensorSample::gyroscope(0, 0.0, 0.0, 0.0)).unwrap();
/// let metrics = pipeline
///     .process(&SensorSample::accelerometer(20_000_000, 0.0, 0.0, 9.81))
///     .unwrap();
///
/// assert_eq!(metrics.samples_processed, 2);
/// assert!(metrics.linear_acceleration.norm() < 0.1);
/// ```
#[derive(Debug, Clone)]
pub struct MotionPipeline {
    settings: PipelineSettings,
    extractor: LinearMotionExtractor,
    smoother: OrientationSmoother,
    detector: SwingDetector,
    tracker: PositionTracker,
    environment: EnvironmentMonitor,
    audio: AudioImpactAnalyzer,

    session_start: Option<u64>,
    samples_processed: u64,
    raw_quaternion: Option<StampedQuaternion>,
    raw_acceleration: Vector3<f32>,
    linear_acceleration: Vector3<f32>,
    swing: SwingMetrics,
    swing_speed_peak: f32,
    current_speed_kmh: f32,
    shot_distribution: ShotDistribution,
    pending_impact: Option<ImpactData>,
}

impl MotionPipeline {
    pub fn new() -> Self {
        Self::with_settings(PipelineSettings::default())
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        Self {
            settings,
            extractor: LinearMotionExtractor::with_hold_limit(settings.madgwick, settings.hold_limit),
            smoother: OrientationSmoother::new(),
            detector: SwingDetector::with_settings(settings.swing),
            tracker: PositionTracker::new(settings.tracking),
            environment: EnvironmentMonitor::new(),
            audio: AudioImpactAnalyzer::new(settings.audio),
            session_start: None,
            samples_processed: 0,
            raw_quaternion: None,
            raw_acceleration: Vector3::zeros(),
            linear_acceleration: Vector3::zeros(),
            swing: SwingMetrics::default(),
            swing_speed_peak: 0.0,
            current_speed_kmh: 0.0,
            shot_distribution: ShotDistribution::default(),
            pending_impact: None,
        }
    }

    pub fn settings(&self) -> PipelineSettings {
        self.settings
    }

    /// Process one sample and return the updated snapshot
    ///
    /// A sample with non-finite values is rejected and leaves the pipeline
    /// untouched, so the caller can skip it and continue with the next one.
    pub fn process(&mut self, sample: &SensorSample) -> Result<SessionMetrics, SampleError> {
        if let Err(err) = sample.validate() {
            warn!("rejecting sample at {}: {err}", sample.timestamp);
            return Err(err);
        }

        let timestamp = sample.timestamp;
        self.session_start.get_or_insert(timestamp);
        self.samples_processed += 1;

        match sample.reading {
            SensorReading::Accelerometer(raw) => self.handle_acceleration(raw, timestamp),
            SensorReading::Gyroscope(rate) => self.extractor.set_gyroscope(rate),
            SensorReading::Magnetometer(field) => self.extractor.set_magnetometer(field),
            SensorReading::Pressure(hpa) => {
                self.environment.update_pressure(hpa);
            }
            SensorReading::Humidity(rh) => {
                self.environment.update_humidity(rh);
            }
            SensorReading::Temperature(celsius) => {
                self.environment.update_temperature(celsius);
            }
            SensorReading::FusedQuaternion(q) => self.handle_fused(q, timestamp),
        }

        let impact = self.pending_impact.take().unwrap_or_default();
        let metrics = self.snapshot(impact);
        // Starting/Ended/Discarded are reported by the sample that caused them only
        self.swing = self.detector.current_metrics();
        Ok(metrics)
    }

    /// Analyze an audio buffer captured at `timestamp` (ns)
    ///
    /// A qualifying impact is counted in the shot distribution and reported
    /// once, in the next snapshot.
    pub fn process_audio(&mut self, samples: &[i16], sample_rate: u32, timestamp: u64) -> Option<ImpactData> {
        let (features, shot_type) = self.audio.classify(samples, sample_rate)?;

        let swing_start = self
            .detector
            .swing_start_time()
            .or_else(|| self.detector.last_swing().map(|swing| swing.start));
        let timing_ms = swing_start
            .map(|start| timestamp.saturating_sub(start) / 1_000_000)
            .unwrap_or(0);

        let impact = ImpactData {
            force: features.amplitude,
            timing_ms,
            shot_type: Some(shot_type),
            racket_speed: self.racket_speed(),
        };
        self.shot_distribution.record(shot_type);
        self.pending_impact = Some(impact);

        debug!(
            "impact {:?}: force {:.2}, {:.0} crossings/s, {} ms after swing start",
            shot_type, features.amplitude, features.zero_crossing_rate, timing_ms
        );
        Some(impact)
    }

    /// Peak speed of the swing in progress, or of the best valid swing so far
    fn racket_speed(&self) -> f32 {
        if self.detector.is_swinging() {
            self.detector.current_metrics().peak_speed_kmh
        } else {
            self.swing_speed_peak
        }
    }

    /// Current snapshot without processing a sample
    pub fn session_metrics(&self) -> SessionMetrics {
        self.snapshot(self.pending_impact.unwrap_or_default())
    }

    /// Start a new logical session: zero every counter and reinitialize all
    /// owned components. Settings and the calibration offset are kept.
    pub fn reset_session(&mut self) {
        *self = Self::with_settings(self.settings);
        debug!("session reset");
    }

    /// Use the latest raw fused quaternion as the reference attitude
    ///
    /// Returns the new offset, or `None` if no usable fused quaternion has
    /// been received yet.
    pub fn calibrate(&mut self) -> Option<UnitQuaternion<f32>> {
        let raw = self.raw_quaternion?.quaternion;
        let offset = UnitQuaternion::try_new(raw, f32::EPSILON)?;
        self.set_calibration_offset(Some(offset));
        Some(offset)
    }

    pub fn set_calibration_offset(&mut self, offset: Option<UnitQuaternion<f32>>) {
        self.settings.calibration_offset = offset;
        self.smoother.reset();
    }

    pub fn calibration_offset(&self) -> Option<UnitQuaternion<f32>> {
        self.settings.calibration_offset
    }

    pub fn shot_distribution(&self) -> ShotDistribution {
        self.shot_distribution
    }

    pub fn last_swing(&self) -> Option<SwingEvent> {
        self.detector.last_swing()
    }

    pub fn tracking(&self) -> &TrackingState {
        self.tracker.state()
    }

    pub fn environment(&self) -> EnvironmentalConditions {
        self.environment.conditions()
    }

    /// Roll, pitch, yaw in degrees: smoothed fused orientation when fused
    /// quaternions are available, otherwise the attitude filter estimate
    pub fn orientation(&self) -> Vector3<f32> {
        if self.smoother.smoothed_quaternion().is_some() {
            self.smoother.current_orientation()
        } else {
            self.extractor.filter().euler_angles()
        }
    }

    /// Gravity in the sensor frame (m/s²), from the same source as `orientation`
    pub fn gravity(&self) -> Vector3<f32> {
        if self.smoother.smoothed_quaternion().is_some() {
            self.smoother.gravity_vector()
        } else {
            self.extractor.gravity()
        }
    }

    fn handle_acceleration(&mut self, raw: Vector3<f32>, timestamp: u64) {
        let linear = self.extractor.calculate_linear_acceleration(raw, timestamp);
        let swing = self.detector.update(linear, self.orientation(), timestamp);
        self.tracker.update(linear, timestamp);

        self.current_speed_kmh = swing.current_speed_kmh;
        // Only completed swings count; a discarded burst never reaches the session peak
        self.swing_speed_peak = self.swing_speed_peak.max(swing.last_peak_speed_kmh);

        self.raw_acceleration = raw;
        self.linear_acceleration = linear;
        self.swing = swing;
    }

    fn handle_fused(&mut self, q: Quaternion<f32>, timestamp: u64) {
        let raw = StampedQuaternion {
            timestamp,
            quaternion: q,
        };
        self.raw_quaternion = Some(raw);

        let calibrated = match self.settings.calibration_offset {
            Some(offset) => offset.inverse().into_inner() * q,
            None => q,
        };
        self.smoother.update_orientation(StampedQuaternion {
            timestamp,
            quaternion: calibrated,
        });
    }

    fn snapshot(&self, last_impact: ImpactData) -> SessionMetrics {
        let tracking = self.tracker.state();
        SessionMetrics {
            session_start: self.session_start,
            samples_processed: self.samples_processed,
            raw_quaternion: self.raw_quaternion,
            smoothed_quaternion: self.smoother.smoothed_quaternion(),
            raw_acceleration: self.raw_acceleration,
            linear_acceleration: self.linear_acceleration,
            angular_velocity: self.extractor.gyroscope(),
            orientation: self.orientation(),
            gravity: self.gravity(),
            swing: self.swing,
            last_swing: self.detector.last_swing(),
            swing_speed_peak: self.swing_speed_peak,
            current_speed_kmh: self.current_speed_kmh,
            shot_distribution: self.shot_distribution,
            last_impact,
            environment: self.environment.conditions(),
            position: tracking.position,
            total_distance: tracking.total_distance,
        }
    }
}

impl Default for MotionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct ControllerState {
    pipeline: MotionPipeline,
    running: bool,
}

/// Serializes all access to one pipeline behind a single lock and gates
/// sample delivery on the session being started
///
/// # Example
/// ```
/// use swing_fusion::{SessionController, SessionError, SensorSample};
///
/// let controller = SessionController::new();
/// let sample = SensorSample::accelerometer(0, 0.0, 0.0, 9.81);
/// assert_eq!(controller.process(&sample), Err(SessionError::NotRunning));
///
/// controller.start().unwrap();
/// assert!(controller.process(&sample).is_ok());
/// controller.stop().unwrap();
/// ```
#[derive(Debug)]
pub struct SessionController {
    inner: Mutex<ControllerState>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::with_settings(PipelineSettings::default())
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        Self {
            inner: Mutex::new(ControllerState {
                pipeline: MotionPipeline::with_settings(settings),
                running: false,
            }),
        }
    }

    /// Reset the pipeline and begin accepting samples
    pub fn start(&self) -> SessionResult<()> {
        let mut state = self.lock()?;
        if state.running {
            return Err(SessionError::AlreadyRunning);
        }
        state.pipeline.reset_session();
        state.running = true;
        info!("session started");
        Ok(())
    }

    /// Stop accepting samples and return the final snapshot
    ///
    /// Samples delivered after this call are rejected with
    /// [`SessionError::NotRunning`]. The pipeline is reset on the next `start`.
    pub fn stop(&self) -> SessionResult<SessionMetrics> {
        let mut state = self.lock()?;
        if !state.running {
            return Err(SessionError::NotRunning);
        }
        state.running = false;
        let metrics = state.pipeline.session_metrics();
        info!(
            "session stopped after {} samples, {} swings",
            metrics.samples_processed, metrics.swing.total_swings
        );
        Ok(metrics)
    }

    pub fn is_running(&self) -> SessionResult<bool> {
        Ok(self.lock()?.running)
    }

    pub fn process(&self, sample: &SensorSample) -> SessionResult<SessionMetrics> {
        let mut state = self.lock()?;
        if !state.running {
            return Err(SessionError::NotRunning);
        }
        Ok(state.pipeline.process(sample)?)
    }

    pub fn process_audio(
        &self,
        samples: &[i16],
        sample_rate: u32,
        timestamp: u64,
    ) -> SessionResult<Option<ImpactData>> {
        let mut state = self.lock()?;
        if !state.running {
            return Err(SessionError::NotRunning);
        }
        Ok(state.pipeline.process_audio(samples, sample_rate, timestamp))
    }

    pub fn session_metrics(&self) -> SessionResult<SessionMetrics> {
        Ok(self.lock()?.pipeline.session_metrics())
    }

    /// Run `f` with exclusive access to the pipeline
    pub fn with_pipeline<R>(&self, f: impl FnOnce(&mut MotionPipeline) -> R) -> SessionResult<R> {
        Ok(f(&mut self.lock()?.pipeline))
    }

    fn lock(&self) -> SessionResult<MutexGuard<'_, ControllerState>> {
        self.inner.lock().map_err(|_| SessionError::Poisoned)
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}
