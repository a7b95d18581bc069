use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use crate::dsp::consts::{OVERSAMPLE, QUALITY};
use crate::dsp::utils::map_range;

/// Spectral floor applied before taking the log magnitude.
const LOG_FLOOR: f64 = 1e-12;

/// Oversampled minimum-phase band-limited step.
///
/// The table rises from (nearly) 0 to exactly 1 over `2 * QUALITY` output
/// samples, with `OVERSAMPLE` points per sample plus a final guard point of 1.
/// Built once and never mutated; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinBlepTable {
    points: Vec<f32>,
    zero_crossings: usize,
    oversample: usize,
}

impl Default for MinBlepTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MinBlepTable {
    pub fn new() -> Self {
        Self::with_resolution(QUALITY, OVERSAMPLE)
    }

    /// Build a step with `zero_crossings` sinc lobes on each side and
    /// `oversample` points per output sample.
    ///
    /// # Panics
    ///
    /// If either argument is zero, or if `zero_crossings` exceeds `QUALITY`:
    /// a generator only holds `2 * QUALITY` samples of pending correction.
    pub fn with_resolution(zero_crossings: usize, oversample: usize) -> Self {
        assert!(
            (1..=QUALITY).contains(&zero_crossings),
            "zero_crossings must be in 1..={QUALITY}, got {zero_crossings}"
        );
        assert!(oversample > 0, "oversample must be positive");
        let n = 2 * zero_crossings * oversample;
        let mut points = min_phase_step(zero_crossings, n);
        points.push(1.0);
        tracing::debug!(
            zero_crossings,
            oversample,
            len = points.len(),
            "built minBLEP table"
        );
        Self {
            points,
            zero_crossings,
            oversample,
        }
    }

    pub fn zero_crossings(&self) -> usize {
        self.zero_crossings
    }

    pub fn oversample(&self) -> usize {
        self.oversample
    }

    /// Output samples a single discontinuity keeps contributing to.
    pub fn span(&self) -> usize {
        2 * self.zero_crossings
    }

    pub fn points(&self) -> &[f32] {
        &self.points
    }

    /// Linearly interpolated step value at an oversampled index.
    #[inline(always)]
    pub fn interpolate(&self, index: f32) -> f32 {
        let last = self.points.len() - 1;
        if index <= 0.0 {
            return self.points[0];
        }
        let i = index as usize;
        if i >= last {
            return self.points[last];
        }
        let frac = index - i as f32;
        let a = self.points[i];
        let b = self.points[i + 1];
        a + (b - a) * frac
    }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

fn blackman_harris(p: f64) -> f64 {
    0.35875 - 0.48829 * (2.0 * PI * p).cos() + 0.14128 * (4.0 * PI * p).cos()
        - 0.01168 * (6.0 * PI * p).cos()
}

/// Windowed sinc -> real cepstrum -> minimum-phase impulse -> integrated step.
fn min_phase_step(zero_crossings: usize, n: usize) -> Vec<f32> {
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);
    let scale = 1.0 / n as f64;
    let last = (n - 1) as f32;
    let z = zero_crossings as f32;

    let mut x: Vec<Complex<f64>> = (0..n)
        .map(|i| {
            let p = map_range(i as f32, 0.0, last, -z, z) as f64;
            let w = blackman_harris(i as f64 / (n - 1) as f64);
            Complex::new(sinc(p) * w, 0.0)
        })
        .collect();

    // Real cepstrum
    forward.process(&mut x);
    for v in x.iter_mut() {
        *v = Complex::new(v.norm().max(LOG_FLOOR).ln(), 0.0);
    }
    inverse.process(&mut x);
    for v in x.iter_mut() {
        *v *= scale;
    }

    fold_cepstrum(&mut x);

    forward.process(&mut x);
    for v in x.iter_mut() {
        *v = v.exp();
    }
    inverse.process(&mut x);

    // Integrate and normalize so the step ends at exactly 1
    let mut total = 0.0f64;
    let mut step: Vec<f64> = x
        .iter()
        .map(|v| {
            total += v.re * scale;
            total
        })
        .collect();
    let norm = 1.0 / step[n - 1];
    for v in step.iter_mut() {
        *v *= norm;
    }
    step.into_iter().map(|v| v as f32).collect()
}

/// Fold a real cepstrum onto positive quefrencies: bin 0 and the Nyquist bin
/// stay, bins below Nyquist double, bins above it are cleared.
fn fold_cepstrum(x: &mut [Complex<f64>]) {
    let n = x.len();
    for v in x.iter_mut().take(n.div_ceil(2)).skip(1) {
        *v *= 2.0;
    }
    for v in x.iter_mut().skip(n / 2 + 1) {
        *v = Complex::new(0.0, 0.0);
    }
}
