use anyhow::Result;
use crossbeam_channel::Sender;
use uuid::Uuid;

use crate::dsp::schema;
use crate::patch::Patch;
use crate::types::{MenuDisposition, ModuleCommand, ModuleSchema, ModuleState, Param, PatchGraph};

pub enum InputMessage {
    Echo(String),
    GetSchemas,
    GetModules,
    GetModule(String),
    CreateModule(String),
    UpdateParam(String, String, Param),
    ModuleCommand(String, ModuleCommand),
    SavePatch,
    LoadPatch(PatchGraph),
}

pub enum OutputMessage {
    Echo(String),
    Schemas(Vec<&'static ModuleSchema>),
    PatchState(Vec<ModuleState>),
    ModuleState(String, Option<ModuleState>),
    CreatedModule(String, String),
    MenuDisposition(String, MenuDisposition),
    PatchDocument(PatchGraph),
}

pub fn handle_message(
    message: InputMessage,
    patch: &mut Patch,
    sender: &Sender<OutputMessage>,
) -> Result<()> {
    match message {
        InputMessage::Echo(s) => sender.send(OutputMessage::Echo(format!("{}!", s)))?,
        InputMessage::GetSchemas => sender.send(OutputMessage::Schemas(schema()))?,
        InputMessage::GetModules => {
            sender.send(OutputMessage::PatchState(patch.get_state()))?;
        }
        InputMessage::GetModule(id) => {
            let state = patch.sampleables.get(&id).map(|module| module.get_state());
            sender.send(OutputMessage::ModuleState(id, state))?;
        }
        InputMessage::CreateModule(module_type) => {
            let id = Uuid::new_v4().to_string();
            patch.create_module(&id, &module_type)?;
            sender.send(OutputMessage::CreatedModule(module_type, id))?;
        }
        InputMessage::UpdateParam(id, param_name, param) => {
            patch.update_param(&id, &param_name, &param)?;
        }
        InputMessage::ModuleCommand(id, command) => {
            let disposition = patch.handle_module_command(&id, &command)?;
            sender.send(OutputMessage::MenuDisposition(id, disposition))?;
        }
        InputMessage::SavePatch => {
            sender.send(OutputMessage::PatchDocument(patch.to_graph()))?;
        }
        InputMessage::LoadPatch(graph) => {
            *patch = Patch::from_graph(&graph, patch.sample_rate())?;
        }
    };
    Ok(())
}
