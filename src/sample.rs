//! Timestamped sensor samples consumed by the pipeline

use core::fmt;
use core::str::FromStr;

use nalgebra::{Quaternion, Vector3};

use crate::error::SampleError;

/// Sensor that produced a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
    Pressure,
    Humidity,
    Temperature,
    FusedQuaternion,
}

impl SensorKind {
    pub const ALL: [SensorKind; 7] = [
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::Magnetometer,
        SensorKind::Pressure,
        SensorKind::Humidity,
        SensorKind::Temperature,
        SensorKind::FusedQuaternion,
    ];

    /// Number of values a raw payload of this kind carries
    pub fn arity(self) -> usize {
        match self {
            SensorKind::Accelerometer | SensorKind::Gyroscope | SensorKind::Magnetometer => 3,
            SensorKind::Pressure | SensorKind::Humidity | SensorKind::Temperature => 1,
            SensorKind::FusedQuaternion => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::Pressure => "pressure",
            SensorKind::Humidity => "humidity",
            SensorKind::Temperature => "temperature",
            SensorKind::FusedQuaternion => "fused_quaternion",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorKind {
    type Err = SampleError;

    /// Case-insensitive; `-` and `_` are interchangeable
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| SampleError::UnknownSensor(s.to_string()))
    }
}

/// Sensor payload in pipeline units
///
/// Acceleration in m/s², angular rate in rad/s, magnetic field in any
/// consistent unit, pressure in hPa, temperature in °C, humidity in %RH.
/// Fused quaternions are scalar-first.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SensorReading {
    Accelerometer(Vector3<f32>),
    Gyroscope(Vector3<f32>),
    Magnetometer(Vector3<f32>),
    Pressure(f32),
    Humidity(f32),
    Temperature(f32),
    FusedQuaternion(Quaternion<f32>),
}

impl SensorReading {
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorReading::Accelerometer(_) => SensorKind::Accelerometer,
            SensorReading::Gyroscope(_) => SensorKind::Gyroscope,
            SensorReading::Magnetometer(_) => SensorKind::Magnetometer,
            SensorReading::Pressure(_) => SensorKind::Pressure,
            SensorReading::Humidity(_) => SensorKind::Humidity,
            SensorReading::Temperature(_) => SensorKind::Temperature,
            SensorReading::FusedQuaternion(_) => SensorKind::FusedQuaternion,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            SensorReading::Accelerometer(v)
            | SensorReading::Gyroscope(v)
            | SensorReading::Magnetometer(v) => v.iter().all(|c| c.is_finite()),
            SensorReading::Pressure(x) | SensorReading::Humidity(x) | SensorReading::Temperature(x) => {
                x.is_finite()
            }
            SensorReading::FusedQuaternion(q) => q.coords.iter().all(|c| c.is_finite()),
        }
    }
}

/// One timestamped sample
///
/// Samples of one kind must arrive in non-decreasing timestamp order; the
/// pipeline does not reorder them.
///
/// # Example
/// ```
/// use swing_fusion::{SensorKind, SensorSample};
///
/// let sample = SensorSample::from_raw(SensorKind::Accelerometer, 1_000, &[0.0, 0.0, 9.81]).unwrap();
/// assert_eq!(sample.kind(), SensorKind::Accelerometer);
///
/// assert!(SensorSample::from_raw(SensorKind::Pressure, 1_000, &[1.0, 2.0]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSample {
    /// Nanoseconds on the source clock
    pub timestamp: u64,
    pub reading: SensorReading,
}

impl SensorSample {
    pub fn new(timestamp: u64, reading: SensorReading) -> Self {
        Self { timestamp, reading }
    }

    pub fn accelerometer(timestamp: u64, x: f32, y: f32, z: f32) -> Self {
        Self::new(timestamp, SensorReading::Accelerometer(Vector3::new(x, y, z)))
    }

    pub fn gyroscope(timestamp: u64, x: f32, y: f32, z: f32) -> Self {
        Self::new(timestamp, SensorReading::Gyroscope(Vector3::new(x, y, z)))
    }

    pub fn magnetometer(timestamp: u64, x: f32, y: f32, z: f32) -> Self {
        Self::new(timestamp, SensorReading::Magnetometer(Vector3::new(x, y, z)))
    }

    /// Build from an untyped payload, checking value count and finiteness
    ///
    /// Quaternion payloads are `[qi, qj, qk, qs]`, vector part first.
    pub fn from_raw(kind: SensorKind, timestamp: u64, values: &[f32]) -> Result<Self, SampleError> {
        if values.len() != kind.arity() {
            return Err(SampleError::WrongArity {
                kind,
                expected: kind.arity(),
                got: values.len(),
            });
        }

        let vector = || Vector3::new(values[0], values[1], values[2]);
        let reading = match kind {
            SensorKind::Accelerometer => SensorReading::Accelerometer(vector()),
            SensorKind::Gyroscope => SensorReading::Gyroscope(vector()),
            SensorKind::Magnetometer => SensorReading::Magnetometer(vector()),
            SensorKind::Pressure => SensorReading::Pressure(values[0]),
            SensorKind::Humidity => SensorReading::Humidity(values[0]),
            SensorKind::Temperature => SensorReading::Temperature(values[0]),
            SensorKind::FusedQuaternion => {
                SensorReading::FusedQuaternion(Quaternion::new(values[3], values[0], values[1], values[2]))
            }
        };

        let sample = Self::new(timestamp, reading);
        sample.validate()?;
        Ok(sample)
    }

    /// Build from a sensor name as reported by the transport layer
    pub fn from_named(name: &str, timestamp: u64, values: &[f32]) -> Result<Self, SampleError> {
        Self::from_raw(name.parse()?, timestamp, values)
    }

    pub fn kind(&self) -> SensorKind {
        self.reading.kind()
    }

    /// Reject NaN and infinite payloads
    pub fn validate(&self) -> Result<(), SampleError> {
        if self.reading.is_finite() {
            Ok(())
        } else {
            Err(SampleError::NonFinite { kind: self.kind() })
        }
    }
}
