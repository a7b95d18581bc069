use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::types::{Error, ModuleSchema, ParamsValidator, Result, Sampleable, SampleableConstructor};

pub mod blep;
pub mod consts;
pub mod oscillators;
pub mod utils;

use blep::MinBlepTable;

pub fn get_constructors() -> HashMap<String, SampleableConstructor> {
    let mut map = HashMap::new();
    oscillators::install_constructors(&mut map);
    map
}

/// Returns a map of `module_type` -> typed params validator.
///
/// A typed params validator attempts to deserialize a module's `ModuleState.params` JSON
/// into that module's concrete `*Params` struct.
pub fn get_param_validators() -> HashMap<String, ParamsValidator> {
    let mut map = HashMap::new();
    oscillators::install_param_validators(&mut map);
    map
}

pub fn schema() -> Vec<ModuleSchema> {
    oscillators::schemas()
}

/// Caller-owned handle for constructing oscillator modules.
///
/// Owns the minBLEP table every constructed module shares. Build one per
/// host and keep it for the lifetime of the modules it creates.
pub struct Registry {
    table: Arc<MinBlepTable>,
    constructors: HashMap<String, SampleableConstructor>,
    validators: HashMap<String, ParamsValidator>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_table(Arc::new(MinBlepTable::new()))
    }

    pub fn with_table(table: Arc<MinBlepTable>) -> Self {
        let constructors = get_constructors();
        tracing::debug!(
            module_types = constructors.len(),
            table_points = table.points().len(),
            "oscillator registry ready"
        );
        Self {
            table,
            constructors,
            validators: get_param_validators(),
        }
    }

    pub fn table(&self) -> &Arc<MinBlepTable> {
        &self.table
    }

    pub fn create(&self, module_type: &str, id: &str) -> Result<Box<dyn Sampleable>> {
        let constructor = self
            .constructors
            .get(module_type)
            .ok_or_else(|| Error::UnknownModuleType(module_type.to_string()))?;
        Ok(constructor(id, Arc::clone(&self.table)))
    }

    pub fn validate_params(&self, module_type: &str, params: &Value) -> Result<()> {
        let validator = self
            .validators
            .get(module_type)
            .ok_or_else(|| Error::UnknownModuleType(module_type.to_string()))?;
        validator(params)
    }

    pub fn schemas(&self) -> Vec<ModuleSchema> {
        schema()
    }

    /// Registered module type names, sorted.
    pub fn module_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
