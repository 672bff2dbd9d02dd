use std::collections::HashMap;

use anyhow::{Result, anyhow};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};

use crate::types::{
    MenuDisposition, ModuleCommand, ModuleSchema, ModuleState, NUM_CHANNELS, OutputSchema, Param,
    ParamSchema, PatchMap, Sampleable, SampleableConstructor,
};

const NAME: &str = "normal";
const SWITCHED_NAME: &str = "normalSwitched";

const MODE_OFFSET_KEY: &str = "modeOffset";

const KNOB_DEFAULT: f32 = 0.5;

const INPUT_PARAMS: [&str; NUM_CHANNELS] = [
    "input-1", "input-2", "input-3", "input-4", "input-5", "input-6",
];
const KNOB_PARAMS: [&str; NUM_CHANNELS] = [
    "knob-1", "knob-2", "knob-3", "knob-4", "knob-5", "knob-6",
];
const RANGE_PARAMS: [&str; NUM_CHANNELS] = [
    "range-1", "range-2", "range-3", "range-4", "range-5", "range-6",
];
const POLARITY_PARAMS: [&str; NUM_CHANNELS] = [
    "polarity-1",
    "polarity-2",
    "polarity-3",
    "polarity-4",
    "polarity-5",
    "polarity-6",
];
const MODE_PARAMS: [&str; NUM_CHANNELS] = [
    "mode-1", "mode-2", "mode-3", "mode-4", "mode-5", "mode-6",
];
const OUTPUT_PORTS: [&str; NUM_CHANNELS] = [
    "output-1", "output-2", "output-3", "output-4", "output-5", "output-6",
];

/// Where a channel's attenuate/offset selection comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSource {
    /// Sampled each frame from the per-channel mode switch param.
    Switch,
    /// Held in module state, flipped by a menu command, persisted with the patch.
    Stored,
}

fn type_name(mode_source: ModeSource) -> &'static str {
    match mode_source {
        ModeSource::Switch => SWITCHED_NAME,
        ModeSource::Stored => NAME,
    }
}

/// One channel's control positions, latched at the top of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelControls {
    /// Attenuation knob position, nominally in [0, 1]. Out-of-range values
    /// are not clamped and propagate arithmetically.
    pub knob: f32,
    /// false selects the 5 V reference range, true selects 10 V.
    pub range_10v: bool,
    /// false maps the knob to [-1, 1], true leaves it at [0, 1].
    pub unipolar: bool,
    /// false attenuates, true offsets.
    pub offset: bool,
}

impl Default for ChannelControls {
    fn default() -> Self {
        ChannelControls {
            knob: KNOB_DEFAULT,
            range_10v: false,
            unipolar: false,
            offset: false,
        }
    }
}

/// Computes one channel's output voltage.
///
/// An unpatched input is normalled to the reference range voltage, so the
/// channel doubles as a knob-scaled constant voltage source.
pub fn transfer(controls: &ChannelControls, input: Option<f32>) -> f32 {
    let range = if controls.range_10v { 10.0 } else { 5.0 };
    let signal = input.unwrap_or(range);
    let scaled = if controls.unipolar {
        controls.knob
    } else {
        controls.knob * 2.0 - 1.0
    };
    if controls.offset {
        signal + scaled * range
    } else {
        signal * scaled
    }
}

#[derive(Debug, Default)]
struct NormalParams {
    inputs: [Param; NUM_CHANNELS],
    knobs: [Param; NUM_CHANNELS],
    ranges: [Param; NUM_CHANNELS],
    polarities: [Param; NUM_CHANNELS],
    modes: [Param; NUM_CHANNELS],
}

#[derive(Debug)]
struct NormalModule {
    samples: [f32; NUM_CHANNELS],
    params: NormalParams,
    mode_source: ModeSource,
    mode_offset: [bool; NUM_CHANNELS],
}

impl NormalModule {
    fn update(&mut self, patch_map: &PatchMap) -> () {
        for channel in 0..NUM_CHANNELS {
            let controls = self.sample_controls(channel, patch_map);
            let input = self.params.inputs[channel].get_value_optional(patch_map);
            self.samples[channel] = transfer(&controls, input);
        }
    }

    fn sample_controls(&self, channel: usize, patch_map: &PatchMap) -> ChannelControls {
        ChannelControls {
            knob: self.params.knobs[channel].get_value_or(patch_map, KNOB_DEFAULT),
            range_10v: self.params.ranges[channel].get_value(patch_map) != 0.0,
            unipolar: self.params.polarities[channel].get_value(patch_map) != 0.0,
            offset: match self.mode_source {
                ModeSource::Switch => self.params.modes[channel].get_value(patch_map) > 0.0,
                ModeSource::Stored => self.mode_offset[channel],
            },
        }
    }
}

pub struct Normal {
    id: String,
    samples: RwLock<[f32; NUM_CHANNELS]>,
    module: Mutex<NormalModule>,
}

impl Sampleable for Normal {
    fn get_id(&self) -> &str {
        &self.id
    }

    fn tick(&self) -> () {
        *self.samples.write() = self.module.lock().samples;
    }

    fn update(&self, patch_map: &PatchMap, _sample_rate: f32) -> () {
        self.module.lock().update(patch_map);
    }

    fn get_sample(&self, port: &str) -> Result<f32> {
        match OUTPUT_PORTS.iter().position(|name| *name == port) {
            Some(channel) => Ok(self.samples.read()[channel]),
            None => Err(anyhow!(
                "{} with id {} does not have port {}",
                type_name(self.module.lock().mode_source),
                self.id,
                port
            )),
        }
    }

    fn get_state(&self) -> ModuleState {
        let module = self.module.lock();
        let mut tables: Vec<(&[&str; NUM_CHANNELS], &[Param; NUM_CHANNELS])> = vec![
            (&INPUT_PARAMS, &module.params.inputs),
            (&KNOB_PARAMS, &module.params.knobs),
            (&RANGE_PARAMS, &module.params.ranges),
            (&POLARITY_PARAMS, &module.params.polarities),
        ];
        if module.mode_source == ModeSource::Switch {
            tables.push((&MODE_PARAMS, &module.params.modes));
        }

        let mut params = HashMap::new();
        for (names, list) in tables {
            for channel in 0..NUM_CHANNELS {
                if list[channel] != Param::Disconnected {
                    params.insert(names[channel].to_owned(), list[channel].clone());
                }
            }
        }

        ModuleState {
            module_type: type_name(module.mode_source).to_owned(),
            id: self.id.clone(),
            params,
            state: match module.mode_source {
                ModeSource::Stored => Some(json!({ MODE_OFFSET_KEY: module.mode_offset.to_vec() })),
                ModeSource::Switch => None,
            },
        }
    }

    fn update_param(&self, param_name: &str, new_param: &Param) -> Result<()> {
        let mut module = self.module.lock();
        if let Some(channel) = INPUT_PARAMS.iter().position(|name| *name == param_name) {
            module.params.inputs[channel] = new_param.clone();
            return Ok(());
        }
        if let Some(channel) = KNOB_PARAMS.iter().position(|name| *name == param_name) {
            module.params.knobs[channel] = new_param.clone();
            return Ok(());
        }
        if let Some(channel) = RANGE_PARAMS.iter().position(|name| *name == param_name) {
            module.params.ranges[channel] = new_param.clone();
            return Ok(());
        }
        if let Some(channel) = POLARITY_PARAMS.iter().position(|name| *name == param_name) {
            module.params.polarities[channel] = new_param.clone();
            return Ok(());
        }
        if let Some(channel) = MODE_PARAMS.iter().position(|name| *name == param_name) {
            if module.mode_source == ModeSource::Stored {
                return Err(anyhow!(
                    "{} with id {} holds channel modes in state; use the toggleChannelMode command",
                    NAME,
                    self.id
                ));
            }
            module.params.modes[channel] = new_param.clone();
            return Ok(());
        }
        Err(anyhow!(
            "{} is not a valid param name for {} with id {}",
            param_name,
            type_name(module.mode_source),
            self.id
        ))
    }

    fn handle_command(&self, command: &ModuleCommand) -> Result<MenuDisposition> {
        match command {
            ModuleCommand::ToggleChannelMode { channel } => {
                let mut module = self.module.lock();
                if module.mode_source != ModeSource::Stored {
                    return Err(anyhow!(
                        "{} with id {} has no stored channel modes",
                        SWITCHED_NAME,
                        self.id
                    ));
                }
                let flag = module.mode_offset.get_mut(*channel).ok_or_else(|| {
                    anyhow!(
                        "channel {} is out of range for {} with id {}",
                        channel,
                        NAME,
                        self.id
                    )
                })?;
                *flag = !*flag;
                // The host menu stays open so several channels can be flipped
                // in one visit.
                Ok(MenuDisposition::KeepOpen)
            }
        }
    }

    fn save_state(&self) -> Option<Value> {
        let module = self.module.lock();
        match module.mode_source {
            ModeSource::Stored => Some(json!({ MODE_OFFSET_KEY: module.mode_offset.to_vec() })),
            ModeSource::Switch => None,
        }
    }

    fn load_state(&self, state: &Value) -> Result<()> {
        let mut module = self.module.lock();
        if module.mode_source != ModeSource::Stored {
            return Ok(());
        }
        // Positions present in the array overwrite the flag; anything absent,
        // extra, or of the wrong type keeps the prior value.
        if let Some(flags) = state.get(MODE_OFFSET_KEY).and_then(Value::as_array) {
            for (channel, flag) in flags.iter().take(NUM_CHANNELS).enumerate() {
                if let Some(flag) = flag.as_bool() {
                    module.mode_offset[channel] = flag;
                }
            }
        }
        Ok(())
    }
}

pub const SCHEMA: ModuleSchema = ModuleSchema {
    name: NAME,
    description: "a 6 channel attenuverter and offset, unpatched channels normalled to the reference range",
    params: &[
        ParamSchema { name: "input-1", description: "channel 1 voltage input" },
        ParamSchema { name: "input-2", description: "channel 2 voltage input" },
        ParamSchema { name: "input-3", description: "channel 3 voltage input" },
        ParamSchema { name: "input-4", description: "channel 4 voltage input" },
        ParamSchema { name: "input-5", description: "channel 5 voltage input" },
        ParamSchema { name: "input-6", description: "channel 6 voltage input" },
        ParamSchema { name: "knob-1", description: "channel 1 attenuation knob (0-1)" },
        ParamSchema { name: "knob-2", description: "channel 2 attenuation knob (0-1)" },
        ParamSchema { name: "knob-3", description: "channel 3 attenuation knob (0-1)" },
        ParamSchema { name: "knob-4", description: "channel 4 attenuation knob (0-1)" },
        ParamSchema { name: "knob-5", description: "channel 5 attenuation knob (0-1)" },
        ParamSchema { name: "knob-6", description: "channel 6 attenuation knob (0-1)" },
        ParamSchema { name: "range-1", description: "channel 1 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-2", description: "channel 2 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-3", description: "channel 3 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-4", description: "channel 4 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-5", description: "channel 5 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-6", description: "channel 6 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "polarity-1", description: "channel 1 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-2", description: "channel 2 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-3", description: "channel 3 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-4", description: "channel 4 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-5", description: "channel 5 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-6", description: "channel 6 polarity switch (0 = bipolar, otherwise unipolar)" },
    ],
    outputs: &[
        OutputSchema { name: "output-1", description: "channel 1 voltage output" },
        OutputSchema { name: "output-2", description: "channel 2 voltage output" },
        OutputSchema { name: "output-3", description: "channel 3 voltage output" },
        OutputSchema { name: "output-4", description: "channel 4 voltage output" },
        OutputSchema { name: "output-5", description: "channel 5 voltage output" },
        OutputSchema { name: "output-6", description: "channel 6 voltage output" },
    ],
};

pub const SWITCHED_SCHEMA: ModuleSchema = ModuleSchema {
    name: SWITCHED_NAME,
    description: "a 6 channel attenuverter and offset with per-channel mode switches",
    params: &[
        ParamSchema { name: "input-1", description: "channel 1 voltage input" },
        ParamSchema { name: "input-2", description: "channel 2 voltage input" },
        ParamSchema { name: "input-3", description: "channel 3 voltage input" },
        ParamSchema { name: "input-4", description: "channel 4 voltage input" },
        ParamSchema { name: "input-5", description: "channel 5 voltage input" },
        ParamSchema { name: "input-6", description: "channel 6 voltage input" },
        ParamSchema { name: "knob-1", description: "channel 1 attenuation knob (0-1)" },
        ParamSchema { name: "knob-2", description: "channel 2 attenuation knob (0-1)" },
        ParamSchema { name: "knob-3", description: "channel 3 attenuation knob (0-1)" },
        ParamSchema { name: "knob-4", description: "channel 4 attenuation knob (0-1)" },
        ParamSchema { name: "knob-5", description: "channel 5 attenuation knob (0-1)" },
        ParamSchema { name: "knob-6", description: "channel 6 attenuation knob (0-1)" },
        ParamSchema { name: "range-1", description: "channel 1 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-2", description: "channel 2 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-3", description: "channel 3 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-4", description: "channel 4 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-5", description: "channel 5 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "range-6", description: "channel 6 range switch (0 = 5V, otherwise 10V)" },
        ParamSchema { name: "polarity-1", description: "channel 1 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-2", description: "channel 2 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-3", description: "channel 3 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-4", description: "channel 4 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-5", description: "channel 5 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "polarity-6", description: "channel 6 polarity switch (0 = bipolar, otherwise unipolar)" },
        ParamSchema { name: "mode-1", description: "channel 1 mode switch (positive = offset, otherwise attenuate)" },
        ParamSchema { name: "mode-2", description: "channel 2 mode switch (positive = offset, otherwise attenuate)" },
        ParamSchema { name: "mode-3", description: "channel 3 mode switch (positive = offset, otherwise attenuate)" },
        ParamSchema { name: "mode-4", description: "channel 4 mode switch (positive = offset, otherwise attenuate)" },
        ParamSchema { name: "mode-5", description: "channel 5 mode switch (positive = offset, otherwise attenuate)" },
        ParamSchema { name: "mode-6", description: "channel 6 mode switch (positive = offset, otherwise attenuate)" },
    ],
    outputs: &[
        OutputSchema { name: "output-1", description: "channel 1 voltage output" },
        OutputSchema { name: "output-2", description: "channel 2 voltage output" },
        OutputSchema { name: "output-3", description: "channel 3 voltage output" },
        OutputSchema { name: "output-4", description: "channel 4 voltage output" },
        OutputSchema { name: "output-5", description: "channel 5 voltage output" },
        OutputSchema { name: "output-6", description: "channel 6 voltage output" },
    ],
};

fn create(id: &str, mode_source: ModeSource) -> Result<Box<dyn Sampleable>> {
    Ok(Box::new(Normal {
        id: id.to_owned(),
        samples: RwLock::new([0.0; NUM_CHANNELS]),
        module: Mutex::new(NormalModule {
            samples: [0.0; NUM_CHANNELS],
            params: NormalParams::default(),
            mode_source,
            mode_offset: [false; NUM_CHANNELS],
        }),
    }))
}

fn constructor(id: &str) -> Result<Box<dyn Sampleable>> {
    create(id, ModeSource::Stored)
}

fn switched_constructor(id: &str) -> Result<Box<dyn Sampleable>> {
    create(id, ModeSource::Switch)
}

pub fn install_constructors(map: &mut HashMap<String, SampleableConstructor>) {
    map.insert(NAME.into(), Box::new(constructor));
    map.insert(SWITCHED_NAME.into(), Box::new(switched_constructor));
}
