//! Core types, settings and conventions for the fusion pipeline

use nalgebra::{Quaternion, UnitQuaternion};

/// Madgwick filter settings
///
/// `sample_rate` must match the nominal cadence of filter updates. A
/// mismatch does not error but biases the integration step and therefore
/// the convergence rate.
///
/// # Example
/// ```
/// use swing_fusion::{Madgwick, MadgwickSettings};
///
/// let settings = MadgwickSettings {
///     sample_rate: MadgwickSettings::RATE_100_HZ,
///     ..Default::default()
/// };
/// let filter = Madgwick::with_settings(settings);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MadgwickSettings {
    /// Gradient-descent gain (typically 0.1)
    ///
    /// Higher values trust the accelerometer/magnetometer more and converge
    /// faster, lower values trust the gyroscope more and are smoother.
    pub beta: f32,
    /// Nominal update rate in Hz
    pub sample_rate: f32,
}

impl MadgwickSettings {
    pub const RATE_50_HZ: f32 = 50.0;
    pub const RATE_100_HZ: f32 = 100.0;
    pub const RATE_200_HZ: f32 = 200.0;
}

impl Default for MadgwickSettings {
    fn default() -> Self {
        Self {
            beta: 0.1,
            sample_rate: Self::RATE_50_HZ,
        }
    }
}

/// Swing detector settings
///
/// `end_threshold` must be lower than `start_threshold`; the gap between
/// them is the detection hysteresis.
///
/// # Example
/// ```
/// use swing_fusion::SwingSettings;
///
/// let settings = SwingSettings {
///     start_threshold: 30.0,
///     end_threshold: 20.0,
///     min_duration_ms: 0, // accept swings of any length
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwingSettings {
    /// Linear acceleration magnitude that starts a swing (m/s²)
    pub start_threshold: f32,
    /// Linear acceleration magnitude below which a swing ends (m/s²)
    pub end_threshold: f32,
    /// Minimum duration of a valid swing in milliseconds; shorter swings are discarded
    pub min_duration_ms: u64,
    /// High-pass filter coefficient applied before velocity integration (0.8 to 0.98)
    pub high_pass_alpha: f32,
    /// Below this magnitude an idle detector zeroes its velocity (m/s²)
    pub motionless_threshold: f32,
    /// Yaw angle in degrees separating forehand/backhand from neutral swings
    pub angular_threshold: f32,
    /// Time step in seconds used when no usable timestamp delta exists
    pub nominal_dt: f32,
}

impl Default for SwingSettings {
    fn default() -> Self {
        Self {
            start_threshold: 25.0,
            end_threshold: 5.0,
            min_duration_ms: 500,
            high_pass_alpha: 0.8,
            motionless_threshold: 0.5,
            angular_threshold: 100.0,
            nominal_dt: 0.01,
        }
    }
}

/// Court or field bounds used to clamp the tracked XY position (metres)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldBounds {
    pub width: f32,
    pub depth: f32,
}

/// Position tracker settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackingSettings {
    /// Linear acceleration below which velocity is reset to zero (m/s²)
    pub zupt_threshold: f32,
    /// Linear acceleration above which the current position is highlighted (m/s²)
    pub highlight_threshold: f32,
    /// Optional clamp for the XY position. Z is never clamped.
    pub bounds: Option<FieldBounds>,
    /// Most recent highlight positions kept; 0 disables highlights
    pub max_highlights: usize,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            zupt_threshold: 0.5,
            highlight_threshold: 3.0,
            bounds: Some(FieldBounds {
                width: 10.0,
                depth: 10.0,
            }),
            max_highlights: 256,
        }
    }
}

/// Audio impact analyzer settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioSettings {
    /// Minimum scaled average amplitude for a buffer to count as an impact
    pub amplitude_floor: f32,
    /// Zero-crossing rate (crossings/s) above which an impact is a forehand
    pub forehand_zcr: f32,
    /// Zero-crossing rate (crossings/s) above which an impact is a serve
    pub serve_zcr: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            amplitude_floor: 2.5,
            forehand_zcr: 3500.0,
            serve_zcr: 4500.0,
        }
    }
}

/// Complete pipeline configuration
///
/// # Example
/// ```
/// use swing_fusion::{MotionPipeline, PipelineSettings, SwingSettings};
///
/// let settings = PipelineSettings {
///     swing: SwingSettings { start_threshold: 30.0, ..Default::default() },
///     ..Default::default()
/// };
/// let pipeline = MotionPipeline::with_settings(settings);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineSettings {
    pub madgwick: MadgwickSettings,
    /// Accelerometer steps a held gyroscope or magnetometer reading drives
    /// before it is dropped; 0 holds it until replaced
    pub hold_limit: u32,
    pub swing: SwingSettings,
    pub tracking: TrackingSettings,
    pub audio: AudioSettings,
    /// Reference attitude removed from fused quaternions before smoothing
    pub calibration_offset: Option<UnitQuaternion<f32>>,
}

impl PipelineSettings {
    /// 200 ms at the default 50 Hz accelerometer cadence
    pub const DEFAULT_HOLD_LIMIT: u32 = 10;
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            madgwick: MadgwickSettings::default(),
            hold_limit: Self::DEFAULT_HOLD_LIMIT,
            swing: SwingSettings::default(),
            tracking: TrackingSettings::default(),
            audio: AudioSettings::default(),
            calibration_offset: None,
        }
    }
}

/// Phase reported by the swing detector for a single update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwingPhase {
    /// No swing in progress
    #[default]
    Idle,
    /// This update started a swing
    Starting,
    /// A swing is in progress
    Swinging,
    /// This update completed a valid swing
    Ended,
    /// This update ended a swing shorter than the minimum duration
    Discarded,
}

/// Swing classification from the yaw angle at the end of the swing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwingType {
    Forehand,
    Backhand,
    #[default]
    Neutral,
}

/// Shot type classified from the impact sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShotType {
    Forehand,
    Backhand,
    Serve,
}

impl ShotType {
    pub const ALL: [ShotType; 3] = [ShotType::Forehand, ShotType::Backhand, ShotType::Serve];
}

/// Quaternion tagged with the timestamp of the sample it came from
///
/// The timestamp is carried for traceability only and never enters the math.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StampedQuaternion {
    /// Sample timestamp in nanoseconds
    pub timestamp: u64,
    pub quaternion: Quaternion<f32>,
}

impl StampedQuaternion {
    /// Build from vector part `(qi, qj, qk)` and scalar part `qs`
    pub fn new(timestamp: u64, qi: f32, qj: f32, qk: f32, qs: f32) -> Self {
        Self {
            timestamp,
            quaternion: Quaternion::new(qs, qi, qj, qk),
        }
    }

    pub fn identity(timestamp: u64) -> Self {
        Self {
            timestamp,
            quaternion: Quaternion::identity(),
        }
    }

    pub fn qi(&self) -> f32 {
        self.quaternion.i
    }

    pub fn qj(&self) -> f32 {
        self.quaternion.j
    }

    pub fn qk(&self) -> f32 {
        self.quaternion.k
    }

    pub fn qs(&self) -> f32 {
        self.quaternion.w
    }
}
