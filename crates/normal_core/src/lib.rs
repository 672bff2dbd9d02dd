//! Six-channel attenuverter/offset modules for a modular synthesizer host.
//!
//! The host owns the audio graph and the UI; this crate supplies the
//! per-frame channel transform, the static wiring of controls to ports, and
//! the small amount of state that survives a save/load cycle.

#[macro_use]
extern crate lazy_static;

pub mod dsp;
pub mod message;
pub mod patch;
pub mod types;
