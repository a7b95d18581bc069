use std::marker::PhantomData;

use super::phase::PhaseAccumulator;
use super::shaper::WaveShape;
use crate::dsp::blep::{MinBlepGenerator, MinBlepTable};
use crate::dsp::consts::{SHAPE_SCALE, SHAPE_VOLTS_MAX, SHAPE_VOLTS_MIN};
use crate::dsp::utils::clamp_finite;

/// Jumps smaller than this are treated as continuous.
const JUMP_EPSILON: f32 = 1e-6;

/// One voice: phase accumulator, waveform family and minBLEP corrections.
#[derive(Debug, Clone, Copy)]
pub struct OscillatorLane<S: WaveShape> {
    phase: PhaseAccumulator,
    frequency: f32,
    shape: f32,
    out_value: f32,
    blep: MinBlepGenerator,
    _shape: PhantomData<S>,
}

impl<S: WaveShape> Default for OscillatorLane<S> {
    fn default() -> Self {
        Self {
            phase: PhaseAccumulator::default(),
            frequency: 0.0,
            shape: SHAPE_VOLTS_MIN * SHAPE_SCALE,
            out_value: 0.0,
            blep: MinBlepGenerator::default(),
            _shape: PhantomData,
        }
    }
}

impl<S: WaveShape> OscillatorLane<S> {
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
    }

    /// Shape from a control voltage: clamped to `[0.1, 9.9]` V, then scaled to `(0.01, 0.99)`.
    pub fn set_shape(&mut self, shape_volts: f32) {
        self.shape = clamp_finite(shape_volts, SHAPE_VOLTS_MIN, SHAPE_VOLTS_MAX) * SHAPE_SCALE;
    }

    pub fn phase(&self) -> f32 {
        self.phase.phase()
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn shape(&self) -> f32 {
        self.shape
    }

    /// Last corrected sample.
    pub fn out(&self) -> f32 {
        self.out_value
    }

    pub fn has_pending_corrections(&self) -> bool {
        self.blep.is_pending()
    }

    pub fn reset(&mut self) {
        self.phase.reset();
        self.blep.clear();
        self.out_value = 0.0;
    }

    /// Advance one sample and compute the corrected output.
    #[inline(always)]
    pub fn process(&mut self, sample_time: f32, table: &MinBlepTable) -> f32 {
        let step = self.phase.advance(self.frequency, sample_time);
        if step.wrapped {
            let jump = S::wrap_jump(self.shape);
            if jump.abs() > JUMP_EPSILON {
                self.blep.insert(step.wrap_offset(), jump, table);
            }
        }
        self.out_value = S::evaluate(step.phase, self.shape) + self.blep.process();
        self.out_value
    }
}
