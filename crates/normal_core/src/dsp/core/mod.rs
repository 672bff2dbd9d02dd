use std::collections::HashMap;

use crate::types::{ModuleSchema, SampleableConstructor};

pub mod normal;
pub mod signal;

pub fn install_constructors(map: &mut HashMap<String, SampleableConstructor>) {
    signal::install_constructor(map);
    normal::install_constructors(map);
}

pub fn schemas() -> Vec<&'static ModuleSchema> {
    vec![&signal::SCHEMA, &normal::SCHEMA, &normal::SWITCHED_SCHEMA]
}
