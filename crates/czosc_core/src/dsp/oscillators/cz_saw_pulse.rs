use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::bank::{PanelControls, VoiceBank};
use super::shaper::CzSawPulse;
use crate::dsp::blep::MinBlepTable;
use crate::dsp::utils::PitchApprox;
use crate::poly::PolyOutput;
use crate::types::ControlInputs;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct CzSawPulseOscillatorParams {
    /// base frequency in semitones from C4 (-54 to 54)
    freq: f32,
    /// fine tune (-1 to 1)
    fine: f32,
    /// pulse width (0-10), added to the shape input
    shape: f32,
    pitch_approx: PitchApprox,
}

#[derive(Module)]
#[module("$czSawPulse", "CZ style saw-pulse with variable width", range = (-5.0, 5.0))]
pub struct CzSawPulseOscillator {
    id: String,
    params: CzSawPulseOscillatorParams,
    outputs: PolyOutput,
    bank: VoiceBank<CzSawPulse>,
}

impl CzSawPulseOscillator {
    pub fn new(id: &str, table: Arc<MinBlepTable>) -> Self {
        Self {
            id: id.to_owned(),
            params: CzSawPulseOscillatorParams::default(),
            outputs: PolyOutput::default(),
            bank: VoiceBank::new(table, false),
        }
    }

    fn update(&mut self, inputs: &ControlInputs, sample_time: f32) {
        let panel = PanelControls {
            freq: self.params.freq,
            fine: self.params.fine,
            shape: self.params.shape,
            lfo: false,
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
