//! Band-limited oscillator core
//!
//! This crate provides the DSP core for a family of phase-distortion style
//! oscillators (CZ saw, CZ saw-pulse and an inverse saw) with minBLEP
//! anti-aliasing at the waveform discontinuities.
//! It is a pure library with no I/O; rendering and benchmarking belong in the CLI.

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate czosc_derive;

extern crate serde;
extern crate serde_json;

pub mod dsp;
pub mod patch;
pub mod poly;
pub mod types;

// Re-export commonly used items
pub use dsp::Registry;
pub use patch::Patch;
pub use poly::{PORT_MAX_CHANNELS, PolyOutput, PolySignal};

pub use types::{
    ControlInputs, Error, Module, ModuleSchema, ModuleState, PatchGraph, Result, Sampleable,
    SampleableConstructor,
};
