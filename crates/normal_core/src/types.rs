use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Number of independent channels on the attenuverter block.
pub const NUM_CHANNELS: usize = 6;

pub type PatchMap = HashMap<String, Box<dyn Sampleable>>;

pub type SampleableConstructor = Box<dyn Fn(&str) -> Result<Box<dyn Sampleable>> + Send + Sync>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(tag = "param_type", rename_all = "kebab-case")]
pub enum Param {
    Value { value: f32 },
    Cable { module: String, port: String },
    Disconnected,
}

impl Default for Param {
    fn default() -> Self {
        Param::Disconnected
    }
}

impl Param {
    pub fn get_value(&self, patch_map: &PatchMap) -> f32 {
        self.get_value_or(patch_map, 0.0)
    }

    pub fn get_value_or(&self, patch_map: &PatchMap, default: f32) -> f32 {
        self.get_value_optional(patch_map).unwrap_or(default)
    }

    /// Resolves the param to a voltage, or `None` when nothing is patched in.
    /// A cable to a missing module or port counts as unpatched.
    pub fn get_value_optional(&self, patch_map: &PatchMap) -> Option<f32> {
        match self {
            Param::Value { value } => Some(*value),
            Param::Cable { module, port } => patch_map
                .get(module)
                .and_then(|module| module.get_sample(port).ok()),
            Param::Disconnected => None,
        }
    }
}

/// Commands dispatched to a module from the host's context menu.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ModuleCommand {
    /// Flip one channel between attenuate and offset behavior.
    ToggleChannelMode { channel: usize },
}

/// What the host menu should do once a command handler has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuDisposition {
    /// Close the menu, the ordinary dismiss-on-action behavior.
    Dismiss,
    /// Leave the menu open so further commands can be issued from it.
    KeepOpen,
}

pub trait Sampleable: Send + Sync {
    fn get_id(&self) -> &str;
    /// Publish the samples computed by the last `update` to the output ports.
    fn tick(&self) -> ();
    /// Compute this frame's samples from the snapshot published by `tick`.
    fn update(&self, patch_map: &PatchMap, sample_rate: f32) -> ();
    fn get_sample(&self, port: &str) -> Result<f32>;
    fn get_state(&self) -> ModuleState;
    fn update_param(&self, param_name: &str, new_param: &Param) -> Result<()>;

    fn handle_command(&self, _command: &ModuleCommand) -> Result<MenuDisposition> {
        Ok(MenuDisposition::Dismiss)
    }

    /// State that survives a save/load cycle, beyond the params.
    fn save_state(&self) -> Option<Value> {
        None
    }

    fn load_state(&self, _state: &Value) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModuleState {
    pub id: String,
    pub module_type: String,
    #[serde(default)]
    pub params: HashMap<String, Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PatchGraph {
    pub modules: Vec<ModuleState>,
}

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize)]
pub struct ParamSchema {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize)]
pub struct OutputSchema {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize)]
pub struct ModuleSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSchema],
    pub outputs: &'static [OutputSchema],
}
