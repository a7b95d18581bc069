/// Reference frequency for 0 V on a pitch input (C4).
pub const FREQ_C4: f32 = 261.6256;

/// Phase increment bounds in cycles per sample.
pub const MIN_PHASE_INCREMENT: f32 = 1e-6;
pub const MAX_PHASE_INCREMENT: f32 = 0.35;

/// Raw shape voltage bounds before scaling by `SHAPE_SCALE`.
pub const SHAPE_VOLTS_MIN: f32 = 0.1;
pub const SHAPE_VOLTS_MAX: f32 = 9.9;
pub const SHAPE_SCALE: f32 = 0.1;

/// Lanes processed together as one batch.
pub const LANE_WIDTH: usize = 4;

/// Divisor for the per-lane detune: lane `i` of a group is raised by `i / DETUNE` Hz.
pub const DETUNE: f32 = 50.0;

/// Zero crossings on each side of the minBLEP kernel.
pub const QUALITY: usize = 16;
/// Table points per output sample.
pub const OVERSAMPLE: usize = 16;

/// Output scaling from the normalized waveform to volts.
pub const OUTPUT_VOLTS: f32 = 5.0;

/// Panel ranges.
pub const FREQ_PARAM_RANGE: (f32, f32) = (-54.0, 54.0);
pub const FINE_PARAM_RANGE: (f32, f32) = (-1.0, 1.0);
pub const SHAPE_PARAM_RANGE: (f32, f32) = (0.0, 10.0);
