use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::result::Result as StdResult;
use std::sync::Arc;

use crate::dsp::blep::MinBlepTable;
use crate::dsp::consts::FREQ_C4;
use crate::poly::{PolyOutput, PolySignal};

lazy_static! {
    static ref RE_HZ: Regex = Regex::new(r"(?i)^(-?\d*\.?\d+)hz$").unwrap();
    static ref RE_MIDI: Regex = Regex::new(r"(?i)^(-?\d*\.?\d+)m$").unwrap();
    static ref RE_NOTE: Regex = Regex::new(r"^([A-Ga-g])([#b]?)(-?\d+)?$").unwrap();
}

#[derive(Debug)]
pub enum Error {
    UnknownModuleType(String),
    DuplicateModuleId(String),
    InvalidParams {
        module_type: String,
        source: serde_json::Error,
    },
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownModuleType(t) => write!(f, "unknown module type '{t}'"),
            Error::DuplicateModuleId(id) => write!(f, "duplicate module id '{id}'"),
            Error::InvalidParams {
                module_type,
                source,
            } => write!(f, "invalid params for {module_type}: {source}"),
            Error::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParams { source, .. } => Some(source),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

pub type Result<T> = StdResult<T, Error>;

/// Per-cycle control voltages the host hands to an oscillator module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlInputs {
    /// pitch in V/Oct (0V = C4); its channel count sets the module's polyphony
    pub pitch: PolySignal,
    /// shape control voltage (0-10V), read per pitch channel
    pub shape: PolySignal,
}

impl ControlInputs {
    pub fn mono(pitch: f32) -> Self {
        Self {
            pitch: PolySignal::mono(pitch),
            shape: PolySignal::default(),
        }
    }

    /// Active channel count for this cycle: the pitch input's, at least one.
    pub fn channel_count(&self) -> usize {
        self.pitch.channels().max(1)
    }
}

/// A constructed oscillator module as seen by the host.
pub trait Sampleable: Send {
    fn get_id(&self) -> &str;
    fn get_module_type(&self) -> &'static str;
    /// Read inputs, advance every active lane one sample, return the output.
    fn process(&mut self, inputs: &ControlInputs, sample_time: f32) -> &PolyOutput;
    /// Output computed by the most recent `process` call.
    fn output(&self) -> &PolyOutput;
    fn try_update_params(&mut self, params: Value) -> Result<()>;
    /// Return every lane to phase 0 with no corrections in flight.
    fn reset(&mut self);
}

pub trait Module {
    fn install_constructor(map: &mut HashMap<String, SampleableConstructor>);
    fn get_schema() -> ModuleSchema;

    /// Register this module's parameter validator in the provided map.
    ///
    /// The key is the module type string (e.g. "$czSaw"). The value is a function
    /// that attempts to deserialize a JSON params object into the module's concrete
    /// `*Params` type.
    fn install_params_validator(map: &mut HashMap<String, ParamsValidator>);

    /// Validate a JSON params object by attempting to parse it as the module's concrete
    /// params type.
    fn validate_params_json(params: &Value) -> Result<()>;
}

pub type SampleableConstructor = fn(&str, Arc<MinBlepTable>) -> Box<dyn Sampleable>;

/// Function pointer type used to validate a module's `ModuleState.params`.
pub type ParamsValidator = fn(&Value) -> Result<()>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    pub min_value: f32,
    pub max_value: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSchema {
    pub name: String,
    pub description: String,
    pub params_schema: schemars::Schema,
    pub inputs_schema: schemars::Schema,
    pub outputs: Vec<OutputSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleState {
    pub id: String,
    pub module_type: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub inputs: ControlInputs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchGraph {
    pub modules: Vec<ModuleState>,
}

fn note_semitone(name: &str, accidental: &str) -> i32 {
    let base = match name.to_ascii_lowercase().as_str() {
        "c" => 0,
        "d" => 2,
        "e" => 4,
        "f" => 5,
        "g" => 7,
        "a" => 9,
        _ => 11,
    };
    match accidental {
        "#" => base + 1,
        "b" => base - 1,
        _ => base,
    }
}

/// Parse a pitch string into V/Oct relative to C4.
///
/// Accepts `"<f>hz"`, `"<n>m"` (MIDI note number) and note names like `"a#3"`.
pub fn parse_signal_string(s: &str) -> StdResult<f32, String> {
    let s = s.trim();

    if let Some(caps) = RE_HZ.captures(s) {
        let hz: f32 = caps[1]
            .parse()
            .map_err(|_| "Invalid frequency number".to_string())?;
        if hz <= 0.0 {
            return Err("Frequency must be positive".to_string());
        }
        return Ok((hz / FREQ_C4).log2());
    }

    if let Some(caps) = RE_MIDI.captures(s) {
        let midi: f32 = caps[1]
            .parse()
            .map_err(|_| "Invalid MIDI number".to_string())?;
        return Ok((midi - 60.0) / 12.0);
    }

    if let Some(caps) = RE_NOTE.captures(s) {
        let octave: i32 = caps
            .get(3)
            .map(|m| m.as_str().parse().unwrap_or(4))
            .unwrap_or(4);
        let semitone = note_semitone(&caps[1], &caps[2]);
        return Ok(((octave - 4) * 12 + semitone) as f32 / 12.0);
    }

    Err(format!("Invalid signal format: '{s}'"))
}
