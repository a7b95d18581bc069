use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::bank::{PanelControls, VoiceBank};
use super::shaper::CzSaw;
use crate::dsp::blep::MinBlepTable;
use crate::dsp::utils::PitchApprox;
use crate::poly::PolyOutput;
use crate::types::ControlInputs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct CzSawOscillatorParams {
    /// low frequency mode: pitch drops by 5 octaves and `fine` becomes a DC offset
    lfo: bool,
    /// base frequency in semitones from C4 (-54 to 54)
    freq: f32,
    /// fine tune (-1 to 1), or output offset in LFO mode
    fine: f32,
    /// shape (0-10), added to the shape input
    shape: f32,
    /// exponential used for pitch to frequency conversion
    pitch_approx: PitchApprox,
}

#[derive(Module)]
#[module("$czSaw", "CZ style phase distortion saw", range = (-10.0, 10.0))]
pub struct CzSawOscillator {
    id: String,
    params: CzSawOscillatorParams,
    outputs: PolyOutput,
    bank: VoiceBank<CzSaw>,
}

impl CzSawOscillator {
    pub fn new(id: &str, table: Arc<MinBlepTable>) -> Self {
        Self {
            id: id.to_owned(),
            params: CzSawOscillatorParams::default(),
            outputs: PolyOutput::default(),
            bank: VoiceBank::new(table, true),
        }
    }

    fn update(&mut self, inputs: &ControlInputs, sample_time: f32) {
        let panel = PanelControls {
            freq: self.params.freq,
            fine: self.params.fine,
            shape: self.params.shape,
            lfo: self.params.lfo,
        };
        self.bank.set_pitch_approx(self.params.pitch_approx);
        self.bank
            .process(&panel, inputs, sample_time, &mut self.outputs);
    }

    fn on_reset(&mut self) {
        self.bank.reset();
        self.outputs = PolyOutput::default();
    }
}
