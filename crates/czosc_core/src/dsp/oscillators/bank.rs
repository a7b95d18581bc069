use std::sync::Arc;

use super::lane::OscillatorLane;
use super::shaper::WaveShape;
use crate::dsp::blep::MinBlepTable;
use crate::dsp::consts::{
    DETUNE, FINE_PARAM_RANGE, FREQ_C4, FREQ_PARAM_RANGE, LANE_WIDTH, OUTPUT_VOLTS,
    SHAPE_PARAM_RANGE,
};
use crate::dsp::utils::{PitchApprox, clamp_finite, quadratic_bipolar};
use crate::poly::{PORT_MAX_CHANNELS, PolyOutput};
use crate::types::ControlInputs;

const GROUPS: usize = PORT_MAX_CHANNELS / LANE_WIDTH;

/// Panel knob state for one processing cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanelControls {
    /// base frequency in semitones from C4
    pub freq: f32,
    /// fine tune, or the DC offset in LFO mode
    pub fine: f32,
    /// shape knob (0-10)
    pub shape: f32,
    pub lfo: bool,
}

impl PanelControls {
    /// Base pitch in volts before the pitch CV is added.
    pub fn base_pitch(&self) -> f32 {
        let fine = clamp_finite(self.fine, FINE_PARAM_RANGE.0, FINE_PARAM_RANGE.1);
        let mut pitch = clamp_finite(self.freq, FREQ_PARAM_RANGE.0, FREQ_PARAM_RANGE.1) / 12.0;
        if self.lfo {
            pitch = pitch * 2.0 - 5.0;
        }
        pitch + quadratic_bipolar(fine) * 3.0 / 12.0
    }

    /// DC offset added to every output channel (LFO mode only).
    pub fn output_offset(&self) -> f32 {
        if self.lfo {
            clamp_finite(self.fine, FINE_PARAM_RANGE.0, FINE_PARAM_RANGE.1) * OUTPUT_VOLTS
        } else {
            0.0
        }
    }

    pub fn shape_knob(&self) -> f32 {
        clamp_finite(self.shape, SHAPE_PARAM_RANGE.0, SHAPE_PARAM_RANGE.1)
    }
}

/// Converts pitch voltages to lane frequencies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlMapper {
    pub approx: PitchApprox,
    /// Spread lanes within a group by `lane / DETUNE` Hz
    pub detune: bool,
}

impl ControlMapper {
    #[inline(always)]
    pub fn frequency(&self, pitch_volts: f32, lane: usize) -> f32 {
        let frequency = FREQ_C4 * self.approx.exp2(pitch_volts);
        if self.detune {
            frequency + (lane % LANE_WIDTH) as f32 / DETUNE
        } else {
            frequency
        }
    }
}

/// Lanes processed together as one batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaneGroup<S: WaveShape> {
    lanes: [OscillatorLane<S>; LANE_WIDTH],
}

impl<S: WaveShape> LaneGroup<S> {
    pub fn lanes(&self) -> &[OscillatorLane<S>; LANE_WIDTH] {
        &self.lanes
    }
}

/// Every lane a module owns, grouped by `LANE_WIDTH`.
///
/// Lanes beyond the active channel count keep their state untouched, so a
/// voice that comes back resumes from its previous phase and shape.
#[derive(Debug, Clone)]
pub struct VoiceBank<S: WaveShape> {
    groups: [LaneGroup<S>; GROUPS],
    table: Arc<MinBlepTable>,
    mapper: ControlMapper,
    active_groups: usize,
}

impl<S: WaveShape> VoiceBank<S> {
    pub fn new(table: Arc<MinBlepTable>, detune: bool) -> Self {
        Self {
            groups: [LaneGroup::default(); GROUPS],
            table,
            mapper: ControlMapper {
                approx: PitchApprox::default(),
                detune,
            },
            active_groups: 0,
        }
    }

    pub fn set_pitch_approx(&mut self, approx: PitchApprox) {
        self.mapper.approx = approx;
    }

    /// Lane groups advanced by the last `process` call.
    pub fn active_groups(&self) -> usize {
        self.active_groups
    }

    pub fn groups(&self) -> &[LaneGroup<S>] {
        &self.groups
    }

    pub fn lane(&self, channel: usize) -> &OscillatorLane<S> {
        &self.groups[channel / LANE_WIDTH].lanes[channel % LANE_WIDTH]
    }

    pub fn reset(&mut self) {
        for group in self.groups.iter_mut() {
            for lane in group.lanes.iter_mut() {
                lane.reset();
            }
        }
        self.active_groups = 0;
    }

    /// Map controls onto the active lanes, advance them one sample and write
    /// `5 * lane + offset` volts per channel.
    pub fn process(
        &mut self,
        panel: &PanelControls,
        inputs: &ControlInputs,
        sample_time: f32,
        out: &mut PolyOutput,
    ) {
        profiling::scope!("voice_bank");

        let channels = inputs.channel_count().min(PORT_MAX_CHANNELS);
        let base_pitch = panel.base_pitch();
        let shape_knob = panel.shape_knob();
        let offset = panel.output_offset();
        let groups = channels.div_ceil(LANE_WIDTH);

        for (g, group) in self.groups[..groups].iter_mut().enumerate() {
            let first = g * LANE_WIDTH;
            let width = (channels - first).min(LANE_WIDTH);
            for (i, lane) in group.lanes[..width].iter_mut().enumerate() {
                let ch = first + i;
                lane.set_frequency(self.mapper.frequency(base_pitch + inputs.pitch.get(ch), i));
                if S::HAS_SHAPE {
                    lane.set_shape(shape_knob + inputs.shape.get(ch));
                }
                let v = lane.process(sample_time, &self.table);
                out.set(ch, OUTPUT_VOLTS * v + offset);
            }
        }

        out.set_channels(channels);
        self.active_groups = groups;
    }
}
