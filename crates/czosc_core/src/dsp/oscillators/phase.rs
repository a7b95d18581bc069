use crate::dsp::consts::{MAX_PHASE_INCREMENT, MIN_PHASE_INCREMENT};
use crate::dsp::utils::clamp_finite;

/// Result of advancing a phase accumulator by one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStep {
    /// Phase after the step, in `[0, 1)`
    pub phase: f32,
    /// Clamped increment that was applied
    pub increment: f32,
    /// Whether the phase crossed 1 during this step
    pub wrapped: bool,
}

impl PhaseStep {
    /// Sub-sample position of the wrap, in `(-1, 0]` relative to the current frame.
    ///
    /// Only meaningful when `wrapped` is set.
    #[inline(always)]
    pub fn wrap_offset(&self) -> f32 {
        -(self.phase / self.increment)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseAccumulator {
    phase: f32,
}

impl PhaseAccumulator {
    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Advance by `frequency * sample_time` cycles, clamped to the allowed increment range.
    #[inline(always)]
    pub fn advance(&mut self, frequency: f32, sample_time: f32) -> PhaseStep {
        let increment = clamp_finite(
            frequency * sample_time,
            MIN_PHASE_INCREMENT,
            MAX_PHASE_INCREMENT,
        );
        self.phase += increment;
        let wrapped = self.phase >= 1.0;
        if wrapped {
            self.phase -= self.phase.floor();
        }
        PhaseStep {
            phase: self.phase,
            increment,
            wrapped,
        }
    }
}
