//! Swing Fusion - sensor fusion and swing analysis for racket-mounted motion sensors
//!
//! This library turns a stream of timestamped IMU, fused-orientation, barometric
//! and audio samples into a per-session snapshot of orientation, linear
//! acceleration, swing statistics, impacts and environmental conditions.
//!
//! # Features
//!
//! - Madgwick gradient-descent attitude filter (MARG and IMU-only updates)
//! - Moving-average smoothing of fused orientation quaternions
//! - Gravity separation and drift-bounded position tracking
//! - Swing detection with hysteresis, minimum duration and speed estimation
//! - Audio impact classification by amplitude and zero-crossing rate
//! - Barometric altitude and moist-air density
//! - Thread-safe session controller with explicit start and stop
//!
//! # Quick Start
//!
//! ```rust
//! use swing_fusion::{MotionPipeline, SensorSample};
//!
//! let mut pipeline = MotionPipeline::new();
//!
//! // Timestamps are nanoseconds on the source clock
//! pipeline.process(&SensorSample::gyroscope(0, 0.0, 0.0, 0.1)).unwrap();
//! pipeline.process(&SensorSample::magnetometer(0, 0.3, 0.0, -0.4)).unwrap();
//! let metrics = pipeline
//!     .process(&SensorSample::accelerometer(20_000_000, 0.0, 0.0, 9.81))
//!     .unwrap();
//!
//! println!("orientation: {:?}", metrics.orientation);
//! println!("swings: {}", metrics.swing.total_swings);
//! ```

pub mod audio;
pub mod environment;
mod error;
mod linear;
mod madgwick;
mod math;
mod sample;
mod session;
mod smoother;
mod swing;
mod types;

// Re-export all public types and functions
pub use audio::{AudioFeatures, AudioImpactAnalyzer, ImpactData};
pub use environment::{EnvironmentMonitor, EnvironmentalConditions};
pub use error::{SampleError, SessionError, SessionResult};
pub use linear::{LinearMotionExtractor, PositionTracker, TrackingState};
pub use madgwick::Madgwick;
pub use math::{
    DEG_TO_RAD, MPS_TO_KMH, QuaternionExt, RAD_TO_DEG, STANDARD_GRAVITY, Vector3Ext, euler_degrees,
    gravity_from_quaternion,
};
pub use sample::{SensorKind, SensorReading, SensorSample};
pub use session::{MotionPipeline, SessionController, SessionMetrics, ShotDistribution};
pub use smoother::{CircularBuffer, ORIENTATION_WINDOW, OrientationSmoother};
pub use swing::{SwingDetector, SwingEvent, SwingMetrics};
pub use types::*;
