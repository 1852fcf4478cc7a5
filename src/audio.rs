//! Impact detection from short audio buffers

use crate::types::{AudioSettings, ShotType};

/// Full-scale value used to normalize 16-bit PCM samples
const PCM_FULL_SCALE: f32 = 32768.0;
/// Scale applied to the normalized average amplitude
const AMPLITUDE_SCALE: f32 = 10.0;

/// Amplitude and zero-crossing statistics of one audio buffer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFeatures {
    /// Mean absolute normalized amplitude, scaled by 10
    pub amplitude: f32,
    /// Number of sign changes between consecutive samples
    pub zero_crossings: u32,
    /// Zero crossings per second
    pub zero_crossing_rate: f32,
}

/// Impact corroborated by audio
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImpactData {
    /// Scaled average amplitude of the impact sound
    pub force: f32,
    /// Milliseconds between the start of the current swing and the impact
    pub timing_ms: u64,
    /// `None` when no impact is pending
    pub shot_type: Option<ShotType>,
    /// Peak racket speed of the session at impact time (km/h)
    pub racket_speed: f32,
}

/// Compute amplitude and zero-crossing features of 16-bit PCM samples
///
/// A crossing is counted when two consecutive samples have strictly opposite
/// signs; zeros neither start nor end a crossing. An empty buffer or a zero
/// sample rate yields all-zero features.
pub fn analyze(samples: &[i16], sample_rate: u32) -> AudioFeatures {
    if samples.is_empty() {
        return AudioFeatures::default();
    }

    let mut sum = 0.0f32;
    let mut zero_crossings = 0u32;
    let mut previous = 0.0f32;

    for &sample in samples {
        let s = sample as f32 / PCM_FULL_SCALE;
        sum += s.abs();
        if s * previous < 0.0 {
            zero_crossings += 1;
        }
        previous = s;
    }

    let zero_crossing_rate = if sample_rate > 0 {
        zero_crossings as f32 * sample_rate as f32 / samples.len() as f32
    } else {
        0.0
    };

    AudioFeatures {
        amplitude: sum / samples.len() as f32 * AMPLITUDE_SCALE,
        zero_crossings,
        zero_crossing_rate,
    }
}

/// Classifies impact sounds by zero-crossing rate
///
/// # Example
/// ```
/// use swing_fusion::{AudioImpactAnalyzer, ShotType};
///
/// let analyzer = AudioImpactAnalyzer::default();
/// // 1 kHz of alternating full-scale samples: loud, high zero-crossing rate
/// let buffer: Vec<i16> = (0..1000).map(|i| if i % 2 == 0 { 30000 } else { -30000 }).collect();
///
/// let (features, shot) = analyzer.classify(&buffer, 8000).unwrap();
/// assert!(features.amplitude > 2.5);
/// assert_eq!(shot, ShotType::Serve);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioImpactAnalyzer {
    settings: AudioSettings,
}

impl AudioImpactAnalyzer {
    pub fn new(settings: AudioSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> AudioSettings {
        self.settings
    }

    /// Shot type for a zero-crossing rate; breakpoints are exclusive
    pub fn shot_type(&self, zero_crossing_rate: f32) -> ShotType {
        if zero_crossing_rate > self.settings.serve_zcr {
            ShotType::Serve
        } else if zero_crossing_rate > self.settings.forehand_zcr {
            ShotType::Forehand
        } else {
            ShotType::Backhand
        }
    }

    /// Features and shot type of a buffer loud enough to be an impact
    pub fn classify(&self, samples: &[i16], sample_rate: u32) -> Option<(AudioFeatures, ShotType)> {
        let features = analyze(samples, sample_rate);
        (features.amplitude > self.settings.amplitude_floor)
            .then(|| (features, self.shot_type(features.zero_crossing_rate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Square wave with the given half-period (in samples) and amplitude
    fn square(len: usize, half_period: usize, amplitude: i16) -> Vec<i16> {
        (0..len)
            .map(|i| if (i / half_period) % 2 == 0 { amplitude } else { -amplitude })
            .collect()
    }

    #[test]
    fn test_empty_buffer() {
        assert_eq!(analyze(&[], 44_100), AudioFeatures::default());
    }

    #[test]
    fn test_amplitude_and_crossings() {
        let buffer = square(100, 10, 16384);
        let features = analyze(&buffer, 1000);

        assert_relative_eq!(features.amplitude, 5.0);
        assert_eq!(features.zero_crossings, 9);
        assert_relative_eq!(features.zero_crossing_rate, 90.0);
    }

    #[test]
    fn test_zeros_do_not_cross() {
        let features = analyze(&[100, 0, -100, 0, 100], 5);
        assert_eq!(features.zero_crossings, 0);
    }

    #[test]
    fn test_shot_type_breakpoints() {
        let analyzer = AudioImpactAnalyzer::default();
        assert_eq!(analyzer.shot_type(1000.0), ShotType::Backhand);
        assert_eq!(analyzer.shot_type(3500.0), ShotType::Backhand);
        assert_eq!(analyzer.shot_type(3501.0), ShotType::Forehand);
        assert_eq!(analyzer.shot_type(4500.0), ShotType::Forehand);
        assert_eq!(analyzer.shot_type(4501.0), ShotType::Serve);
    }

    #[test]
    fn test_quiet_buffer_is_not_an_impact() {
        let analyzer = AudioImpactAnalyzer::default();
        // Normalized amplitude 0.2 scales to 2.0, below the 2.5 floor
        let buffer = square(441, 5, 6554);
        assert!(analyzer.classify(&buffer, 44_100).is_none());
    }

    #[test]
    fn test_loud_buffer_classified_by_rate() {
        let analyzer = AudioImpactAnalyzer::default();
        // 44.1 kHz, crossing every 10 samples: about 4410 crossings/s
        let buffer = square(4410, 10, 20000);
        let (features, shot) = analyzer.classify(&buffer, 44_100).unwrap();

        assert!(features.amplitude > 2.5);
        assert_eq!(shot, ShotType::Forehand);
    }
}
