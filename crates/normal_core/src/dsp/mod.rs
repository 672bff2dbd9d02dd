use std::collections::HashMap;

use crate::types::{ModuleSchema, SampleableConstructor};

pub mod core;

#[cfg(test)]
mod test_chain;

pub fn get_constructors() -> HashMap<String, SampleableConstructor> {
    let mut map = HashMap::new();
    core::install_constructors(&mut map);
    map
}

pub fn schema() -> Vec<&'static ModuleSchema> {
    core::schemas()
}
