use std::f32::consts::TAU;

/// A closed-form naive (aliased) waveform of phase and shape.
///
/// Implementors are zero-sized; the shape argument is the normalized value
/// in `(0.01, 0.99)` and is ignored by families without a shape control.
pub trait WaveShape: Copy + Default + Send + 'static {
    /// Whether the family responds to the shape control.
    const HAS_SHAPE: bool;

    fn evaluate(phase: f32, shape: f32) -> f32;

    /// Size of the jump the naive waveform makes as phase wraps from 1 back to 0.
    #[inline(always)]
    fn wrap_jump(shape: f32) -> f32 {
        Self::evaluate(0.0, shape) - Self::evaluate(1.0, shape)
    }
}

/// CZ style saw: two linear phase ramps meeting at the peak, read through a cosine.
///
/// Shape sweeps the ramp slopes from near-triangle to near-pulse.
#[derive(Debug, Clone, Copy, Default)]
pub struct CzSaw;

impl WaveShape for CzSaw {
    const HAS_SHAPE: bool = true;

    #[inline(always)]
    fn evaluate(phase: f32, shape: f32) -> f32 {
        let l = 0.5 - shape * 0.5;
        let slope_up = (0.5 - l) / l;
        let slope_down = (0.5 - l) / (1.0 - l);
        let a = phase * slope_up;
        let b = (1.0 - phase) * slope_down;
        let m = phase + a.min(b);
        (m * TAU).cos()
    }
}

/// CZ style saw-pulse; shape sets the pulse width.
#[derive(Debug, Clone, Copy, Default)]
pub struct CzSawPulse;

impl WaveShape for CzSawPulse {
    const HAS_SHAPE: bool = true;

    #[inline(always)]
    fn evaluate(phase: f32, shape: f32) -> f32 {
        let a = 2.0 * (1.0 - phase);
        let b = (1.0 - a) * (shape / (1.0 - shape));
        let c = 0.5 * (a - a.min(b));
        let m = c.min(phase);
        (m * TAU).cos()
    }
}

/// Moog style inverted saw with a parabolic soft knee.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvSaw;

impl WaveShape for InvSaw {
    const HAS_SHAPE: bool = false;

    #[inline(always)]
    fn evaluate(phase: f32, _shape: f32) -> f32 {
        let a = 2.0 * (1.0 - phase) - 1.0;
        let b = (a * a - 1.0) / 4.0;
        a + b
    }
}
