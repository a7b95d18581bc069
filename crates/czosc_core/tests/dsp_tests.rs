//! Integration tests for the oscillator modules.
//!
//! Modules are constructed through the public `Registry`, configured with
//! JSON params and driven with `ControlInputs`, the same way a host does.

use std::sync::Arc;

use czosc_core::dsp::blep::MinBlepTable;
use czosc_core::dsp::oscillators::bank::{PanelControls, VoiceBank};
use czosc_core::dsp::oscillators::lane::OscillatorLane;
use czosc_core::dsp::oscillators::phase::PhaseAccumulator;
use czosc_core::dsp::oscillators::shaper::{CzSaw, InvSaw, WaveShape};
use czosc_core::{ControlInputs, PolyOutput, PolySignal, Registry, Sampleable};
use serde_json::json;

const SAMPLE_RATE: f32 = 48000.0;

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Create a named module from the registry.
fn make_module(registry: &Registry, module_type: &str, id: &str) -> Box<dyn Sampleable> {
    registry
        .create(module_type, id)
        .unwrap_or_else(|e| panic!("constructor for '{module_type}' failed: {e}"))
}

/// Set params on a module (JSON → try_update_params).
fn set_params(module: &mut dyn Sampleable, params: serde_json::Value) {
    module
        .try_update_params(params)
        .expect("try_update_params failed");
}

/// Advance N samples and collect one channel.
fn collect_channel(
    module: &mut dyn Sampleable,
    inputs: &ControlInputs,
    channel: usize,
    n: usize,
) -> Vec<f32> {
    (0..n)
        .map(|_| module.process(inputs, 1.0 / SAMPLE_RATE).get(channel))
        .collect()
}

fn collect_samples(module: &mut dyn Sampleable, inputs: &ControlInputs, n: usize) -> Vec<f32> {
    collect_channel(module, inputs, 0, n)
}

fn min_max(samples: &[f32]) -> (f32, f32) {
    let mn = samples.iter().cloned().fold(f32::INFINITY, f32::min);
    let mx = samples.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    (mn, mx)
}

/// Approximate equality within a tolerance.
fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

fn falling_zero_crossings(samples: &[f32]) -> usize {
    samples
        .windows(2)
        .filter(|w| w[0] >= 0.0 && w[1] < 0.0)
        .count()
}

// ─── Phase, shape and clamping ────────────────────────────────────────────────

#[test]
fn phase_tracks_c4_without_wrap() {
    let f = 261.63f32;
    let dt = 1.0f32 / 44100.0;
    let mut acc = PhaseAccumulator::default();
    let mut phase = 0.0;
    for _ in 0..100 {
        phase = acc.advance(f, dt).phase;
    }
    let expected = (f as f64 * 100.0 * dt as f64).fract() as f32;
    assert!(approx_eq(phase, expected, 1e-4), "{phase} vs {expected}");
}

#[test]
fn cz_saw_starts_at_peak() {
    assert_eq!(CzSaw::evaluate(0.0, 0.5), 1.0);
}

#[test]
fn shape_cv_sweep_clamps_inside_open_interval() {
    let mut lane = OscillatorLane::<CzSaw>::default();
    let mut v = 0.0f32;
    while v <= 10.0 {
        lane.set_shape(v);
        assert!(lane.shape() >= 0.01 - 1e-7 && lane.shape() <= 0.99 + 1e-7);
        assert!(lane.shape() > 0.0 && lane.shape() < 1.0);
        v += 0.05;
    }
}

// ─── Polyphony ────────────────────────────────────────────────────────────────

#[test]
fn six_channels_use_two_groups_and_park_the_rest() {
    let mut bank = VoiceBank::<CzSaw>::new(Arc::new(MinBlepTable::new()), true);
    let mut out = PolyOutput::default();
    let panel = PanelControls::default();

    let eight = ControlInputs {
        pitch: PolySignal::poly(&[0.0; 8]),
        shape: PolySignal::poly(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
    };
    for _ in 0..10 {
        bank.process(&panel, &eight, 1.0 / SAMPLE_RATE, &mut out);
    }
    let parked: Vec<_> = (6..8)
        .map(|c| (bank.lane(c).phase(), bank.lane(c).shape()))
        .collect();

    let six = ControlInputs {
        pitch: PolySignal::poly(&[0.5; 6]),
        shape: PolySignal::mono(9.0),
    };
    for _ in 0..500 {
        bank.process(&panel, &six, 1.0 / SAMPLE_RATE, &mut out);
    }

    assert_eq!(bank.active_groups(), 2);
    assert_eq!(out.channels(), 6);
    for (c, state) in (6..8).zip(parked) {
        assert_eq!((bank.lane(c).phase(), bank.lane(c).shape()), state);
    }
}

#[test]
fn output_channels_follow_pitch_input() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$czSawPulse", "osc");
    for channels in [1usize, 4, 5, 16, 3] {
        let inputs = ControlInputs {
            pitch: PolySignal::poly(&vec![0.0; channels]),
            ..Default::default()
        };
        assert_eq!(osc.process(&inputs, 1.0 / SAMPLE_RATE).channels(), channels);
    }
    // Disconnected pitch still produces one voice
    assert_eq!(
        osc.process(&ControlInputs::default(), 1.0 / SAMPLE_RATE).channels(),
        1
    );
}

#[test]
fn voices_follow_their_own_pitch() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$invSaw", "osc");
    let inputs = ControlInputs {
        pitch: PolySignal::poly(&[0.0, 1.0]),
        ..Default::default()
    };
    let mut low = Vec::new();
    let mut high = Vec::new();
    for _ in 0..SAMPLE_RATE as usize {
        let out = osc.process(&inputs, 1.0 / SAMPLE_RATE);
        low.push(out.get(0));
        high.push(out.get(1));
    }
    let low = falling_zero_crossings(&low);
    let high = falling_zero_crossings(&high);
    assert!((260..=263).contains(&low), "C4 crossings {low}");
    assert!((521..=525).contains(&high), "C5 crossings {high}");
}

// ─── Band limiting ────────────────────────────────────────────────────────────

/// Run a corrected `InvSaw` lane next to the uncorrected waveform on the same phase.
fn inv_saw_pair(frequency: f32, sample_time: f32, n: usize) -> (Vec<f32>, Vec<f32>) {
    let table = MinBlepTable::new();
    let mut lane = OscillatorLane::<InvSaw>::default();
    lane.set_frequency(frequency);
    let mut acc = PhaseAccumulator::default();
    let mut corrected = Vec::with_capacity(n);
    let mut naive = Vec::with_capacity(n);
    for _ in 0..n {
        corrected.push(lane.process(sample_time, &table));
        naive.push(InvSaw::evaluate(acc.advance(frequency, sample_time).phase, 0.0));
    }
    (corrected, naive)
}

/// Blackman-Harris windowed magnitude at an arbitrary frequency.
fn magnitude_at(samples: &[f32], frequency: f64, sample_rate: f64) -> f64 {
    let n = samples.len();
    let (mut re, mut im) = (0.0f64, 0.0f64);
    for (i, &x) in samples.iter().enumerate() {
        let p = 2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64;
        let w = 0.35875 - 0.48829 * p.cos() + 0.14128 * (2.0 * p).cos() - 0.01168 * (3.0 * p).cos();
        let arg = 2.0 * std::f64::consts::PI * frequency * i as f64 / sample_rate;
        re += x as f64 * w * arg.cos();
        im -= x as f64 * w * arg.sin();
    }
    (re * re + im * im).sqrt()
}

#[test]
fn inv_saw_suppresses_aliases() {
    // Non-integer period: wraps land at a different sub-sample offset every cycle
    let f = 3041.0;
    let sr = SAMPLE_RATE as f64;
    let (corrected, naive) = inv_saw_pair(f, 1.0 / SAMPLE_RATE, 4800 + 256);
    let (corrected, naive) = (&corrected[256..], &naive[256..]);

    // Harmonics 10..=20 lie above Nyquist and fold back clear of the 7 real ones
    for h in 10..=20 {
        let mut alias = (h as f64 * f as f64) % sr;
        if alias > sr / 2.0 {
            alias = sr - alias;
        }
        let c = magnitude_at(corrected, alias, sr);
        let n = magnitude_at(naive, alias, sr);
        assert!(
            c < n * 0.1,
            "harmonic {h} folded to {alias:.0} Hz: corrected {c:.3}, naive {n:.3}"
        );
    }

    // The fundamental survives
    assert!(magnitude_at(corrected, f as f64, sr) > magnitude_at(naive, f as f64, sr) * 0.5);
}

#[test]
fn inv_saw_wrap_is_spread_over_several_samples() {
    let (corrected, naive) = inv_saw_pair(3041.0, 1.0 / SAMPLE_RATE, 4800);
    let biggest_step = |v: &[f32]| {
        v[64..]
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0f32, f32::max)
    };
    let c = biggest_step(&corrected);
    let n = biggest_step(&naive);
    // Uncorrected, the wrap is a near full-scale jump of 2
    assert!(n > 1.8, "naive step {n}");
    assert!(c < 1.5, "corrected step {c}");
}

#[test]
fn inv_saw_is_periodic_with_corrections_in_flight() {
    // 3/64 cycles per sample: exact in f32, three cycles every 64 samples,
    // wraps every ~21 samples while each correction lasts 2 * QUALITY
    let table = MinBlepTable::new();
    let mut lane = OscillatorLane::<InvSaw>::default();
    lane.set_frequency(3.0);
    let mut samples = Vec::new();
    let mut pending = Vec::new();
    for _ in 0..400 {
        samples.push(lane.process(1.0 / 64.0, &table));
        pending.push(lane.has_pending_corrections());
    }
    assert!(pending[64..].iter().all(|&p| p));
    for i in 64..336 {
        assert!(
            approx_eq(samples[i], samples[i + 64], 1e-6),
            "sample {i}: {} vs {}",
            samples[i],
            samples[i + 64]
        );
    }
}

// ─── Modules ──────────────────────────────────────────────────────────────────

#[test]
fn cz_saw_spans_five_volts() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$czSaw", "osc");
    set_params(osc.as_mut(), json!({ "shape": 5.0 }));
    let samples = collect_samples(osc.as_mut(), &ControlInputs::mono(0.0), 4800);
    let (mn, mx) = min_max(&samples);
    assert!(mx > 4.9 && mx <= 5.0, "max {mx}");
    assert!(mn < -4.9 && mn >= -5.0, "min {mn}");
}

#[test]
fn cz_saw_is_periodic() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$czSaw", "osc");
    set_params(osc.as_mut(), json!({ "shape": 3.0, "pitchApprox": "exact" }));
    // 16 Hz at 64 Hz sample rate: a quarter cycle per sample
    let inputs = ControlInputs::mono((16.0f32 / 261.6256).log2());
    let samples: Vec<f32> = (0..200)
        .map(|_| osc.process(&inputs, 1.0 / 64.0).get(0))
        .collect();
    for i in 32..196 {
        assert!(
            approx_eq(samples[i], samples[i + 4], 1e-2),
            "sample {i}: {} vs {}",
            samples[i],
            samples[i + 4]
        );
    }
}

#[test]
fn pitch_strings_set_frequency() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$invSaw", "osc");
    let inputs: ControlInputs = serde_json::from_value(json!({ "pitch": "a4" })).unwrap();
    let samples = collect_samples(osc.as_mut(), &inputs, SAMPLE_RATE as usize);
    let crossings = falling_zero_crossings(&samples);
    assert!((438..=442).contains(&crossings), "A4 crossings {crossings}");
}

#[test]
fn inv_saw_stays_in_range() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$invSaw", "osc");
    // ~2 kHz: wraps every ~23 samples
    let inputs = ControlInputs::mono(3.0);
    let samples = collect_samples(osc.as_mut(), &inputs, 48000);
    assert!(samples.iter().all(|v| v.is_finite()));
    let (mn, mx) = min_max(&samples);
    assert!(mn > -7.5 && mx < 7.5, "range {mn}..{mx}");
    assert!(mx > 2.5 && mn < -2.5, "range {mn}..{mx}");
}

#[test]
fn lfo_mode_runs_slow_with_offset() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$invSaw", "lfo");
    set_params(osc.as_mut(), json!({ "lfo": true, "fine": -0.5 }));
    let samples = collect_samples(osc.as_mut(), &ControlInputs::mono(0.0), 48000);
    let (mn, mx) = min_max(&samples);
    // Swing of 5V around a -2.5V offset
    assert!(mn > -8.5 && mx < 4.0, "range {mn}..{mx}");
    assert!(mx > 1.5 && mn < -6.5);
}

#[test]
fn reset_restarts_the_waveform() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$czSaw", "osc");
    let inputs = ControlInputs::mono(0.3);
    let first = collect_samples(osc.as_mut(), &inputs, 64);
    collect_samples(osc.as_mut(), &inputs, 1000);
    osc.reset();
    let again = collect_samples(osc.as_mut(), &inputs, 64);
    assert_eq!(first, again);
}

#[test]
fn params_update_between_cycles() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$czSaw", "osc");
    let inputs = ControlInputs::mono(0.0);
    collect_samples(osc.as_mut(), &inputs, 10);
    set_params(osc.as_mut(), json!({ "freq": 12.0 }));
    let samples = collect_samples(osc.as_mut(), &inputs, 48000);
    let crossings = falling_zero_crossings(&samples);
    assert!((520..=526).contains(&crossings), "crossings {crossings}");
}

#[test]
fn invalid_params_are_rejected_without_changing_state() {
    let registry = Registry::new();
    let mut osc = make_module(&registry, "$czSaw", "osc");
    set_params(osc.as_mut(), json!({ "shape": 2.0 }));
    assert!(osc.try_update_params(json!({ "shape": "wide" })).is_err());
    assert!(registry.validate_params("$czSaw", &json!({ "shape": "wide" })).is_err());
}
