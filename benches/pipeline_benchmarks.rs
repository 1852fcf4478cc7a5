use criterion::{Criterion, black_box, criterion_group, criterion_main};
use nalgebra::Vector3;
use rand::prelude::*;
use rand_pcg::Pcg64;
use std::f32::consts::PI;
use swing_fusion::{
    AudioImpactAnalyzer, Madgwick, MotionPipeline, OrientationSmoother, SensorSample, StampedQuaternion,
    SwingDetector,
};

const PERIOD_NS: u64 = 20_000_000; // 50 Hz

// Pre-generated sensor data to eliminate RNG overhead during benchmarks
struct PreGeneratedData {
    samples: Vec<(Vector3<f32>, Vector3<f32>, Vector3<f32>)>,
    index: usize,
}

impl PreGeneratedData {
    fn new(count: usize, seed: u64) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let time = i as f32 * 0.02;
            let motion_phase = time * 0.5 * 2.0 * PI;

            // rad/s
            let gyroscope = Vector3::new(
                2.0 * motion_phase.sin() + rng.random_range(-0.02..0.02),
                1.5 * (motion_phase * 1.3).cos() + rng.random_range(-0.02..0.02),
                3.0 * (motion_phase * 0.7).sin() + rng.random_range(-0.02..0.02),
            );

            // m/s², with a swing-sized burst once per cycle
            let burst = if motion_phase.sin() > 0.9 { 35.0 } else { 0.0 };
            let accelerometer = Vector3::new(
                burst - 1.0 * motion_phase.sin() + rng.random_range(-0.05..0.05),
                1.0 * motion_phase.cos() + rng.random_range(-0.05..0.05),
                9.81 + rng.random_range(-0.05..0.05),
            );

            let magnetometer = Vector3::new(
                22.0 + 2.0 * motion_phase.cos() + rng.random_range(-0.5..0.5),
                2.0 * motion_phase.sin() + rng.random_range(-0.5..0.5),
                -40.0 + rng.random_range(-0.5..0.5),
            );

            samples.push((gyroscope, accelerometer, magnetometer));
        }

        Self { samples, index: 0 }
    }

    fn next(&mut self) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let sample = self.samples[self.index];
        self.index = (self.index + 1) % self.samples.len();
        sample
    }
}

/// Benchmark the MARG filter update
fn bench_madgwick_update(c: &mut Criterion) {
    let mut filter = Madgwick::new();
    let mut data = PreGeneratedData::new(1000, 42);

    c.bench_function("madgwick_update", |b| {
        b.iter(|| {
            let (gyroscope, accelerometer, magnetometer) = data.next();
            filter.update(
                black_box(gyroscope),
                black_box(accelerometer),
                black_box(magnetometer),
            )
        })
    });
}

/// Benchmark the filter update without magnetometer
fn bench_madgwick_update_imu(c: &mut Criterion) {
    let mut filter = Madgwick::new();
    let mut data = PreGeneratedData::new(1000, 42);

    c.bench_function("madgwick_update_imu", |b| {
        b.iter(|| {
            let (gyroscope, accelerometer, _) = data.next();
            filter.update_imu(black_box(gyroscope), black_box(accelerometer))
        })
    });
}

/// Benchmark quaternion smoothing
fn bench_smoother(c: &mut Criterion) {
    let mut smoother = OrientationSmoother::new();
    let sample = StampedQuaternion::new(0, 0.1, -0.2, 0.3, 0.92);

    c.bench_function("smoother_update", |b| {
        b.iter(|| black_box(smoother.update_orientation(black_box(sample))))
    });
}

/// Benchmark swing detection on pre-generated linear acceleration
fn bench_swing_detector(c: &mut Criterion) {
    let mut detector = SwingDetector::new();
    let mut data = PreGeneratedData::new(1000, 7);
    let gravity = Vector3::new(0.0, 0.0, 9.81);
    let mut timestamp = 0u64;

    c.bench_function("swing_detector_update", |b| {
        b.iter(|| {
            let (_, accelerometer, _) = data.next();
            timestamp += PERIOD_NS;
            black_box(detector.update(
                black_box(accelerometer - gravity),
                Vector3::zeros(),
                timestamp,
            ))
        })
    });
}

/// Benchmark a full gyro + mag + accel round through the pipeline
fn bench_pipeline_round(c: &mut Criterion) {
    let mut pipeline = MotionPipeline::new();
    let mut data = PreGeneratedData::new(1000, 1234);
    let mut timestamp = 0u64;

    c.bench_function("pipeline_sensor_round", |b| {
        b.iter(|| {
            let (g, a, m) = data.next();
            timestamp += PERIOD_NS;
            pipeline
                .process(&SensorSample::gyroscope(timestamp, g.x, g.y, g.z))
                .ok();
            pipeline
                .process(&SensorSample::magnetometer(timestamp, m.x, m.y, m.z))
                .ok();
            black_box(
                pipeline
                    .process(&SensorSample::accelerometer(timestamp, a.x, a.y, a.z))
                    .ok(),
            )
        })
    });
}

/// Benchmark audio analysis of a 10 ms buffer at 44.1 kHz
fn bench_audio_classify(c: &mut Criterion) {
    let analyzer = AudioImpactAnalyzer::default();
    let mut rng = Pcg64::seed_from_u64(99);
    let buffer: Vec<i16> = (0..441).map(|_| rng.random_range(-20000..20000)).collect();

    c.bench_function("audio_classify", |b| {
        b.iter(|| black_box(analyzer.classify(black_box(&buffer), 44_100)))
    });
}

/// Benchmark pipeline creation
fn bench_pipeline_creation(c: &mut Criterion) {
    c.bench_function("pipeline_new", |b| b.iter(|| black_box(MotionPipeline::new())));
}

criterion_group!(
    benches,
    bench_madgwick_update,
    bench_madgwick_update_imu,
    bench_smoother,
    bench_swing_detector,
    bench_pipeline_round,
    bench_audio_classify,
    bench_pipeline_creation
);

criterion_main!(benches);
