//! Swing session demonstration
//!
//! Drives a synthetic session through the thread-safe controller: a short
//! rest, two forehand-like swings with an impact sound each, and some
//! barometer readings. Prints the per-swing and final session metrics.
//!
//! Run with: `RUST_LOG=debug cargo run --example swing_session`

use std::error::Error;
use std::f32::consts::PI;

use swing_fusion::{SensorReading, SensorSample, SessionController, SwingPhase};

const SAMPLE_PERIOD_NS: u64 = 20_000_000; // 50 Hz
const AUDIO_RATE: u32 = 44_100;

/// Acceleration profile (m/s²) for sample `i`: half-sine bursts of 700 ms
fn burst(i: u64) -> f32 {
    let cycle = i % 100;
    if (20..55).contains(&cycle) {
        45.0 * (PI * (cycle - 20) as f32 / 35.0).sin() + 30.0
    } else {
        0.0
    }
}

/// Impact-like sound: loud square wave with a crossing every 10 samples
fn impact_sound() -> Vec<i16> {
    (0..441)
        .map(|i| if (i / 10) % 2 == 0 { 22000 } else { -22000 })
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let controller = SessionController::new();
    controller.start()?;

    controller.process(&SensorSample::new(0, SensorReading::Temperature(21.0)))?;
    controller.process(&SensorSample::new(0, SensorReading::Humidity(55.0)))?;
    controller.process(&SensorSample::new(0, SensorReading::Pressure(1002.0)))?;

    for i in 0..200u64 {
        let timestamp = i * SAMPLE_PERIOD_NS;
        let swing = burst(i);

        controller.process(&SensorSample::gyroscope(timestamp, 0.0, 0.0, swing / 20.0))?;
        let metrics = controller.process(&SensorSample::accelerometer(timestamp, swing, 0.0, 9.81))?;

        if i % 100 == 40 {
            if let Some(impact) = controller.process_audio(&impact_sound(), AUDIO_RATE, timestamp)? {
                println!(
                    "Impact: {:?}, force {:.2}, {} ms into swing, {:.1} km/h",
                    impact.shot_type, impact.force, impact.timing_ms, impact.racket_speed
                );
            }
        }

        if metrics.swing.phase == SwingPhase::Ended {
            if let Some(event) = metrics.last_swing {
                println!(
                    "Swing {}: {:?}, {} ms, peak {:.1} m/s², {:.1} km/h",
                    metrics.swing.total_swings,
                    event.swing_type,
                    event.duration_ms,
                    event.peak_acceleration,
                    event.peak_speed_kmh
                );
            }
        }
    }

    let summary = controller.stop()?;
    println!();
    println!("Samples processed: {}", summary.samples_processed);
    println!("Swings: {}", summary.swing.total_swings);
    println!("Peak swing speed: {:.1} km/h", summary.swing_speed_peak);
    println!(
        "Orientation: roll {:.1}, pitch {:.1}, yaw {:.1}",
        summary.orientation.x, summary.orientation.y, summary.orientation.z
    );
    println!(
        "Shots: {} forehand, {} backhand, {} serve",
        summary.shot_distribution.forehand,
        summary.shot_distribution.backhand,
        summary.shot_distribution.serve
    );
    println!(
        "Environment: {:.0} m altitude, {:.3} kg/m³ air density",
        summary.environment.altitude, summary.environment.air_density
    );

    Ok(())
}
