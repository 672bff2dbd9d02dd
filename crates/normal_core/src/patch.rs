//! Patch container used by hosts, tests, and the CLI tooling.
//!
//! A patch is a flat map of module instances. Processing is two-phase per
//! audio frame: every module computes from the samples published by the
//! previous frame, then every module publishes. Control mutations (params,
//! commands) land between frames through the per-module locks.

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};

use crate::dsp;
use crate::types::{
    MenuDisposition, ModuleCommand, ModuleState, Param, PatchGraph, PatchMap,
    SampleableConstructor,
};

lazy_static! {
    static ref CONSTRUCTORS: HashMap<String, SampleableConstructor> = dsp::get_constructors();
}

pub struct Patch {
    pub sampleables: PatchMap,
    sample_rate: f32,
}

impl Patch {
    pub fn new(sample_rate: f32) -> Self {
        Patch {
            sampleables: PatchMap::new(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn create_module(&mut self, id: &str, module_type: &str) -> Result<()> {
        if self.sampleables.contains_key(id) {
            bail!("module with id {} already exists", id);
        }
        let constructor = CONSTRUCTORS
            .get(module_type)
            .ok_or_else(|| anyhow!("module type {} does not exist", module_type))?;
        let module = constructor(id)?;
        self.sampleables.insert(id.to_owned(), module);
        Ok(())
    }

    pub fn update_param(&self, module_id: &str, param_name: &str, new_param: &Param) -> Result<()> {
        self.get(module_id)?.update_param(param_name, new_param)
    }

    pub fn handle_module_command(
        &self,
        module_id: &str,
        command: &ModuleCommand,
    ) -> Result<MenuDisposition> {
        self.get(module_id)?.handle_command(command)
    }

    fn get(&self, module_id: &str) -> Result<&Box<dyn crate::types::Sampleable>> {
        self.sampleables
            .get(module_id)
            .ok_or_else(|| anyhow!("module with id {} does not exist", module_id))
    }

    /// Process one audio frame: update every module against the snapshot
    /// published last frame, then publish the new samples.
    pub fn process_frame(&self) {
        for module in self.sampleables.values() {
            module.update(&self.sampleables, self.sample_rate);
        }
        for module in self.sampleables.values() {
            module.tick();
        }
    }

    pub fn get_state(&self) -> Vec<ModuleState> {
        let mut modules: Vec<ModuleState> = self
            .sampleables
            .values()
            .map(|module| module.get_state())
            .collect();
        modules.sort_by(|a, b| a.id.cmp(&b.id));
        modules
    }

    pub fn to_graph(&self) -> PatchGraph {
        PatchGraph {
            modules: self.get_state(),
        }
    }

    pub fn from_graph(graph: &PatchGraph, sample_rate: f32) -> Result<Patch> {
        let mut patch = Patch::new(sample_rate);
        for module_state in &graph.modules {
            patch.create_module(&module_state.id, &module_state.module_type)?;
            for (param_name, param) in &module_state.params {
                patch.update_param(&module_state.id, param_name, param)?;
            }
            if let Some(state) = &module_state.state {
                patch.get(&module_state.id)?.load_state(state)?;
            }
        }
        Ok(patch)
    }
}
