// Cross-module tests: cables between a signal source and the attenuverter,
// driven through the Patch frame loop.

use crate::patch::Patch;
use crate::types::{ModuleCommand, Param};

fn cable(module: &str, port: &str) -> Param {
    Param::Cable {
        module: module.to_owned(),
        port: port.to_owned(),
    }
}

fn volts(value: f32) -> Param {
    Param::Value { value }
}

fn settle(patch: &Patch) {
    // Cable hops publish with one frame of latency; two frames settle a
    // single hop.
    patch.process_frame();
    patch.process_frame();
}

#[test]
fn test_patched_channel_attenuates_cable_voltage() {
    let mut patch = Patch::new(48000.0);
    patch.create_module("lfo", "signal").unwrap();
    patch.update_param("lfo", "source", &volts(4.0)).unwrap();
    patch.create_module("normal-1", "normal").unwrap();
    patch
        .update_param("normal-1", "input-1", &cable("lfo", "output"))
        .unwrap();
    patch
        .update_param("normal-1", "knob-1", &volts(0.75))
        .unwrap();

    settle(&patch);

    let out = patch
        .sampleables
        .get("normal-1")
        .unwrap()
        .get_sample("output-1")
        .unwrap();
    // bipolar gain 0.5 on a 4 V cable
    assert!((out - 2.0).abs() < 0.0001, "got {}", out);
}

#[test]
fn test_unpatched_channel_free_runs_while_sibling_is_patched() {
    let mut patch = Patch::new(48000.0);
    patch.create_module("lfo", "signal").unwrap();
    patch.update_param("lfo", "source", &volts(4.0)).unwrap();
    patch.create_module("normal-1", "normal").unwrap();
    patch
        .update_param("normal-1", "input-1", &cable("lfo", "output"))
        .unwrap();
    patch
        .update_param("normal-1", "knob-1", &volts(1.0))
        .unwrap();
    patch
        .update_param("normal-1", "knob-2", &volts(1.0))
        .unwrap();

    settle(&patch);

    let module = patch.sampleables.get("normal-1").unwrap();
    assert!((module.get_sample("output-1").unwrap() - 4.0).abs() < 0.0001);
    // channel 2 has no cable: normalled to the 5 V reference range
    assert!((module.get_sample("output-2").unwrap() - 5.0).abs() < 0.0001);
}

#[test]
fn test_toggled_mode_offsets_cable_voltage() {
    let mut patch = Patch::new(48000.0);
    patch.create_module("lfo", "signal").unwrap();
    patch.update_param("lfo", "source", &volts(3.0)).unwrap();
    patch.create_module("normal-1", "normal").unwrap();
    patch
        .update_param("normal-1", "input-4", &cable("lfo", "output"))
        .unwrap();
    patch
        .update_param("normal-1", "knob-4", &volts(0.5))
        .unwrap();
    patch
        .update_param("normal-1", "range-4", &volts(1.0))
        .unwrap();
    patch
        .update_param("normal-1", "polarity-4", &volts(1.0))
        .unwrap();
    patch
        .handle_module_command("normal-1", &ModuleCommand::ToggleChannelMode { channel: 3 })
        .unwrap();

    settle(&patch);

    let out = patch
        .sampleables
        .get("normal-1")
        .unwrap()
        .get_sample("output-4")
        .unwrap();
    // 3 V input plus 0.5 * 10 V offset
    assert!((out - 8.0).abs() < 0.0001, "got {}", out);
}

#[test]
fn test_mode_switch_driven_by_cable() {
    // The switched variant samples its mode from a host control, which can
    // itself be a cable like any other param.
    let mut patch = Patch::new(48000.0);
    patch.create_module("mode-src", "signal").unwrap();
    patch.create_module("normal-1", "normalSwitched").unwrap();
    patch
        .update_param("normal-1", "input-1", &volts(2.0))
        .unwrap();
    patch
        .update_param("normal-1", "mode-1", &cable("mode-src", "output"))
        .unwrap();
    patch
        .update_param("normal-1", "knob-1", &volts(1.0))
        .unwrap();

    settle(&patch);
    let module = patch.sampleables.get("normal-1").unwrap();
    // mode source at 0 V: attenuate, gain 1
    assert!((module.get_sample("output-1").unwrap() - 2.0).abs() < 0.0001);

    patch
        .update_param("mode-src", "source", &volts(1.0))
        .unwrap();
    settle(&patch);
    // mode source high: offset, 2 + 1 * 5
    assert!((module.get_sample("output-1").unwrap() - 7.0).abs() < 0.0001);
}

#[test]
fn test_frame_reads_consistent_snapshot() {
    // A module patched to itself sees last frame's published output, not the
    // value being computed this frame.
    let mut patch = Patch::new(48000.0);
    patch.create_module("normal-1", "normal").unwrap();
    patch
        .update_param("normal-1", "input-1", &cable("normal-1", "output-2"))
        .unwrap();
    patch
        .update_param("normal-1", "knob-1", &volts(1.0))
        .unwrap();
    patch
        .update_param("normal-1", "knob-2", &volts(1.0))
        .unwrap();

    let module = patch.sampleables.get("normal-1").unwrap();
    patch.process_frame();
    // first frame: channel 1 saw channel 2's initial 0 V
    assert!((module.get_sample("output-1").unwrap() - 0.0).abs() < 0.0001);
    patch.process_frame();
    // second frame: channel 1 sees the 5 V published last frame
    assert!((module.get_sample("output-1").unwrap() - 5.0).abs() < 0.0001);
}
