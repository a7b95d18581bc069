//! Band-limited oscillators.
//!
//! Each module owns a [`bank::VoiceBank`] of lanes; a lane pairs a
//! [`phase::PhaseAccumulator`] with a [`shaper::WaveShape`] family and a
//! minBLEP correction buffer.

use std::collections::HashMap;

use crate::types::{Module, ModuleSchema, ParamsValidator, SampleableConstructor};

pub mod bank;
pub mod cz_saw;
pub mod cz_saw_pulse;
pub mod inv_saw;
pub mod lane;
pub mod phase;
pub mod shaper;

pub fn install_constructors(map: &mut HashMap<String, SampleableConstructor>) {
    cz_saw::CzSawOscillator::install_constructor(map);
    cz_saw_pulse::CzSawPulseOscillator::install_constructor(map);
    inv_saw::InvSawOscillator::install_constructor(map);
}

pub fn install_param_validators(map: &mut HashMap<String, ParamsValidator>) {
    cz_saw::CzSawOscillator::install_params_validator(map);
    cz_saw_pulse::CzSawPulseOscillator::install_params_validator(map);
    inv_saw::InvSawOscillator::install_params_validator(map);
}

pub fn schemas() -> Vec<ModuleSchema> {
    vec![
        cz_saw::CzSawOscillator::get_schema(),
        cz_saw_pulse::CzSawPulseOscillator::get_schema(),
        inv_saw::InvSawOscillator::get_schema(),
    ]
}
