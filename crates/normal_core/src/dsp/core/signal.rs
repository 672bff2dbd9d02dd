use std::collections::HashMap;

use anyhow::{Result, anyhow};
use parking_lot::{Mutex, RwLock};

use crate::types::{
    ModuleSchema, ModuleState, OutputSchema, Param, ParamSchema, PatchMap, Sampleable,
    SampleableConstructor,
};

const NAME: &str = "signal";
const SOURCE: &str = "source";
const OUTPUT: &str = "output";

#[derive(Debug, Default)]
struct SignalParams {
    source: Param,
}

#[derive(Debug, Default)]
struct SignalModule {
    sample: f32,
    params: SignalParams,
}

impl SignalModule {
    fn update(&mut self, patch_map: &PatchMap) -> () {
        self.sample = self.params.source.get_value(patch_map);
    }
}

pub struct Signal {
    id: String,
    sample: RwLock<f32>,
    module: Mutex<SignalModule>,
}

impl Sampleable for Signal {
    fn get_id(&self) -> &str {
        &self.id
    }

    fn tick(&self) -> () {
        *self.sample.write() = self.module.lock().sample;
    }

    fn update(&self, patch_map: &PatchMap, _sample_rate: f32) -> () {
        self.module.lock().update(patch_map);
    }

    fn get_sample(&self, port: &str) -> Result<f32> {
        if port == OUTPUT {
            return Ok(*self.sample.read());
        }
        Err(anyhow!(
            "{} with id {} does not have port {}",
            NAME,
            self.id,
            port
        ))
    }

    fn get_state(&self) -> ModuleState {
        let module = self.module.lock();
        let mut params = HashMap::new();
        if module.params.source != Param::Disconnected {
            params.insert(SOURCE.to_owned(), module.params.source.clone());
        }
        ModuleState {
            module_type: NAME.to_owned(),
            id: self.id.clone(),
            params,
            state: None,
        }
    }

    fn update_param(&self, param_name: &str, new_param: &Param) -> Result<()> {
        if param_name == SOURCE {
            self.module.lock().params.source = new_param.clone();
            return Ok(());
        }
        Err(anyhow!(
            "{} is not a valid param name for {} with id {}",
            param_name,
            NAME,
            self.id
        ))
    }
}

pub const SCHEMA: ModuleSchema = ModuleSchema {
    name: NAME,
    description: "a signal",
    params: &[ParamSchema {
        name: SOURCE,
        description: "signal input",
    }],
    outputs: &[OutputSchema {
        name: OUTPUT,
        description: "signal output",
    }],
};

fn constructor(id: &str) -> Result<Box<dyn Sampleable>> {
    Ok(Box::new(Signal {
        id: id.to_owned(),
        sample: RwLock::new(0.0),
        module: Mutex::new(SignalModule::default()),
    }))
}

pub fn install_constructor(map: &mut HashMap<String, SampleableConstructor>) {
    map.insert(NAME.into(), Box::new(constructor));
}
