//! Patch structure for offline and benchmark processing
//!
//! A `Patch` is a flat set of oscillator modules built from a `PatchGraph`.
//! Each module keeps the control inputs it was configured with and is
//! processed once per frame.

use std::collections::HashMap;

use crate::dsp::Registry;
use crate::poly::PolyOutput;
use crate::types::{ControlInputs, Error, PatchGraph, Result, Sampleable};

struct PatchModule {
    module: Box<dyn Sampleable>,
    inputs: ControlInputs,
}

pub struct Patch {
    modules: Vec<PatchModule>,
    index: HashMap<String, usize>,
}

impl Patch {
    /// Construct and configure every module in `graph`.
    pub fn from_graph(graph: &PatchGraph, registry: &Registry) -> Result<Self> {
        let mut modules = Vec::with_capacity(graph.modules.len());
        let mut index = HashMap::with_capacity(graph.modules.len());

        for state in &graph.modules {
            if index.contains_key(&state.id) {
                return Err(Error::DuplicateModuleId(state.id.clone()));
            }

            let mut module = registry.create(&state.module_type, &state.id)?;
            // A missing params object means all defaults
            if !state.params.is_null() {
                module.try_update_params(state.params.clone())?;
            }

            index.insert(state.id.clone(), modules.len());
            modules.push(PatchModule {
                module,
                inputs: state.inputs,
            });
        }

        tracing::debug!(modules = modules.len(), "patch built");
        Ok(Patch { modules, index })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module ids in graph order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.module.get_id())
    }

    /// Process every module once.
    #[inline]
    pub fn process_frame(&mut self, sample_time: f32) {
        profiling::scope!("process_frame");
        for m in self.modules.iter_mut() {
            m.module.process(&m.inputs, sample_time);
        }
    }

    /// Latest output of the module with `id`.
    pub fn output(&self, id: &str) -> Option<&PolyOutput> {
        self.index
            .get(id)
            .map(|&i| self.modules[i].module.output())
    }

    /// Replace the control inputs a module is driven with.
    pub fn set_inputs(&mut self, id: &str, inputs: ControlInputs) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.modules[i].inputs = inputs;
                true
            }
            None => false,
        }
    }

    /// Sum of every active channel of every module, for monitoring.
    pub fn mix_down(&self) -> f32 {
        self.modules
            .iter()
            .map(|m| m.module.output().as_slice().iter().sum::<f32>())
            .sum()
    }

    pub fn reset(&mut self) {
        for m in self.modules.iter_mut() {
            m.module.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleState;
    use serde_json::json;

    fn graph(value: serde_json::Value) -> PatchGraph {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builds_from_json() {
        let registry = Registry::new();
        let g = graph(json!({
            "modules": [
                { "id": "a", "moduleType": "$czSaw", "params": { "shape": 4.0 }, "inputs": { "pitch": "a4" } },
                { "id": "b", "moduleType": "$invSaw" }
            ]
        }));
        let patch = Patch::from_graph(&g, &registry).unwrap();
        assert_eq!(patch.len(), 2);
        assert_eq!(patch.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let registry = Registry::new();
        let state = ModuleState {
            id: "osc".into(),
            module_type: "$czSaw".into(),
            params: json!({}),
            inputs: ControlInputs::default(),
        };
        let g = PatchGraph {
            modules: vec![state.clone(), state],
        };
        assert!(matches!(
            Patch::from_graph(&g, &registry),
            Err(Error::DuplicateModuleId(id)) if id == "osc"
        ));
    }

    #[test]
    fn rejects_unknown_types_and_bad_params() {
        let registry = Registry::new();
        let unknown = graph(json!({ "modules": [{ "id": "x", "moduleType": "$sine" }] }));
        assert!(matches!(
            Patch::from_graph(&unknown, &registry),
            Err(Error::UnknownModuleType(_))
        ));

        let bad = graph(json!({
            "modules": [{ "id": "x", "moduleType": "$czSaw", "params": { "freq": "high" } }]
        }));
        assert!(matches!(
            Patch::from_graph(&bad, &registry),
            Err(Error::InvalidParams { .. })
        ));
    }

    #[test]
    fn process_frame_updates_outputs() {
        let registry = Registry::new();
        let g = graph(json!({
            "modules": [
                { "id": "poly", "moduleType": "$czSawPulse", "inputs": { "pitch": [0.0, 0.5, 1.0] } },
                { "id": "mono", "moduleType": "$invSaw" }
            ]
        }));
        let mut patch = Patch::from_graph(&g, &registry).unwrap();
        assert_eq!(patch.output("poly").unwrap().channels(), 0);

        patch.process_frame(1.0 / 48000.0);
        assert_eq!(patch.output("poly").unwrap().channels(), 3);
        assert_eq!(patch.output("mono").unwrap().channels(), 1);
        assert!(patch.output("missing").is_none());

        let expected: f32 = ["poly", "mono"]
            .iter()
            .map(|id| patch.output(id).unwrap().as_slice().iter().sum::<f32>())
            .sum();
        assert_eq!(patch.mix_down(), expected);
    }

    #[test]
    fn set_inputs_changes_polyphony() {
        let registry = Registry::new();
        let g = graph(json!({ "modules": [{ "id": "a", "moduleType": "$czSaw" }] }));
        let mut patch = Patch::from_graph(&g, &registry).unwrap();
        assert!(patch.set_inputs("a", ControlInputs {
            pitch: crate::poly::PolySignal::poly(&[0.0; 7]),
            ..Default::default()
        }));
        assert!(!patch.set_inputs("b", ControlInputs::default()));
        patch.process_frame(1.0 / 48000.0);
        assert_eq!(patch.output("a").unwrap().channels(), 7);
    }
}
