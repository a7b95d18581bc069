//! Multichannel ports.
//!
//! A cable carries up to [`PORT_MAX_CHANNELS`] voltages. Oscillators write a
//! [`PolyOutput`] per cycle and read their pitch and shape CVs from
//! [`PolySignal`]s supplied by the host.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;

use crate::types::parse_signal_string;

/// Channel limit per cable, as in VCV Rack
pub const PORT_MAX_CHANNELS: usize = 16;

/// Voltages one module produced this cycle.
///
/// Slots past `channels` are kept at zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolyOutput {
    voltages: [f32; PORT_MAX_CHANNELS],
    channels: usize,
}

impl PartialEq for PolyOutput {
    fn eq(&self, other: &Self) -> bool {
        self.channels == other.channels
            && self.voltages[..self.channels] == other.voltages[..other.channels]
    }
}

impl PolyOutput {
    /// Voltage on `channel`, 0.0 past the active count
    pub fn get(&self, channel: usize) -> f32 {
        if channel < self.channels {
            self.voltages[channel]
        } else {
            0.0
        }
    }

    pub fn set(&mut self, channel: usize, value: f32) {
        if channel < PORT_MAX_CHANNELS {
            self.voltages[channel] = value;
        }
    }

    /// Resize the active range; channels dropped by a shrink read 0.0 if regrown
    pub fn set_channels(&mut self, channels: usize) {
        let channels = channels.min(PORT_MAX_CHANNELS);
        if channels < self.channels {
            self.voltages[channels..self.channels].fill(0.0);
        }
        self.channels = channels;
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Active voltages as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.voltages[..self.channels]
    }
}

// === Serialization ===

impl Serialize for PolyOutput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Serialize as a struct with channels and voltages array
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PolyOutput", 2)?;
        state.serialize_field("channels", &self.channels)?;
        state.serialize_field("voltages", self.as_slice())?;
        state.end()
    }
}

// =============================================================================
// PolySignal - Polyphonic control voltage input
// =============================================================================

/// A polyphonic input buffer of control voltages.
///
/// The host supplies these once per processing cycle. The `channels` field
/// indicates how many voltages are semantically valid:
/// - 0 = disconnected
/// - 1 = monophonic
/// - 2-16 = polyphonic
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolySignal {
    voltages: [f32; PORT_MAX_CHANNELS],
    channels: usize,
}

impl PolySignal {
    /// Create a monophonic input from a single voltage
    pub fn mono(value: f32) -> Self {
        let mut ps = Self::default();
        ps.voltages[0] = value;
        ps.channels = 1;
        ps
    }

    /// Create a polyphonic input from a slice of voltages
    pub fn poly(values: &[f32]) -> Self {
        let channels = values.len().min(PORT_MAX_CHANNELS);
        let mut ps = Self::default();
        ps.voltages[..channels].copy_from_slice(&values[..channels]);
        ps.channels = channels;
        ps
    }

    // === Accessors ===

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Overwrite one channel's voltage, growing the channel count if needed
    pub fn set(&mut self, channel: usize, value: f32) {
        if channel < PORT_MAX_CHANNELS {
            self.voltages[channel] = value;
            self.channels = self.channels.max(channel + 1);
        }
    }

    /// Voltage at a channel, 0.0 beyond the active range
    pub fn get(&self, channel: usize) -> f32 {
        if channel < self.channels {
            self.voltages[channel]
        } else {
            0.0
        }
    }
}

// === Serialization for PolySignal ===

impl Serialize for PolySignal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Serialize as array of voltages (only active channels)
        self.voltages[..self.channels].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PolySignal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Accept a bare number, a pitch string, or arrays of either
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum PolySignalDe {
            Number(f64),
            NumberArray(Vec<f64>),
            String(String),
            StringArray(Vec<String>),
            Tagged(Tagged),
        }

        #[derive(Deserialize)]
        #[serde(tag = "type", rename_all = "camelCase")]
        enum Tagged {
            Disconnected,
        }

        match PolySignalDe::deserialize(deserializer)? {
            PolySignalDe::Number(value) => Ok(PolySignal::mono(value as f32)),
            PolySignalDe::NumberArray(values) => {
                let mut ps = PolySignal::default();
                for (i, v) in values.into_iter().take(PORT_MAX_CHANNELS).enumerate() {
                    ps.set(i, v as f32);
                }
                Ok(ps)
            }
            PolySignalDe::String(s) => parse_signal_string(&s)
                .map(PolySignal::mono)
                .map_err(serde::de::Error::custom),
            PolySignalDe::StringArray(items) => {
                let mut ps = PolySignal::default();
                for (i, item) in items.iter().take(PORT_MAX_CHANNELS).enumerate() {
                    let v = parse_signal_string(item).map_err(serde::de::Error::custom)?;
                    ps.set(i, v);
                }
                Ok(ps)
            }
            PolySignalDe::Tagged(Tagged::Disconnected) => Ok(PolySignal::default()),
        }
    }
}

impl JsonSchema for PolySignal {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("PolySignal")
    }

    fn json_schema(r#gen: &mut schemars::SchemaGenerator) -> schemars::Schema {
        // Schema matches the accepted input shapes
        #[derive(JsonSchema)]
        #[serde(untagged)]
        #[allow(dead_code)]
        enum PolySignalSchema {
            Number(f64),
            NumberArray(Vec<f64>),
            String(String),
            StringArray(Vec<String>),
        }
        PolySignalSchema::json_schema(r#gen)
    }
}
