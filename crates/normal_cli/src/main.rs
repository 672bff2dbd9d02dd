//! normal-bench: offline render and benchmark harness for normal patches
//!
//! This binary drives the DSP crate without a live audio host, enabling use
//! of native profiling tools like samply, Instruments, or perf.
//!
//! Usage:
//!   normal-bench run patches/free_run.json --frames 1000000
//!   normal-bench render patches/attenuvert_lfo.json shaper --frames 4
//!   normal-bench schemas --format json
//!   normal-bench list

use clap::{Parser, Subcommand};
use colored::Colorize;
use normal_core::dsp;
use normal_core::patch::Patch;
use normal_core::types::PatchGraph;
use serde_json::json;
use std::fs;
use std::hint::black_box;
use std::path::PathBuf;
use std::time::Instant;

const DEFAULT_SAMPLE_RATE: f32 = 48000.0;
const DEFAULT_FRAMES: u64 = 48000 * 10; // 10 seconds at 48kHz

/// Render and benchmark harness for the normal attenuverter modules
#[derive(Parser)]
#[command(name = "normal-bench")]
#[command(about = "Render and benchmark normal patches offline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum SchemaFormat {
    Table,
    Json,
    Document,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark with a patch file
    Run {
        /// Path to the patch JSON file
        patch: PathBuf,

        /// Number of audio frames to process
        #[arg(short, long, default_value_t = DEFAULT_FRAMES)]
        frames: u64,

        /// Sample rate in Hz
        #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: f32,

        /// Warmup frames before measurement
        #[arg(short, long, default_value_t = 48000)]
        warmup: u64,

        /// Read this module's outputs every frame ("module-id:port")
        #[arg(long)]
        probe: Option<String>,
    },

    /// Process a few frames and print one module's outputs as JSON lines
    Render {
        /// Path to the patch JSON file
        patch: PathBuf,

        /// Id of the module whose outputs to print
        module: String,

        /// Number of audio frames to render
        #[arg(short, long, default_value_t = 8)]
        frames: u64,

        /// Sample rate in Hz
        #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: f32,
    },

    /// Print the module schemas
    Schemas {
        /// Output format
        #[arg(long, default_value = "table")]
        format: SchemaFormat,
    },

    /// List available patch files
    List,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            patch,
            frames,
            sample_rate,
            warmup,
            probe,
        } => {
            run_benchmark(&patch, frames, sample_rate, warmup, probe.as_deref());
        }
        Commands::Render {
            patch,
            module,
            frames,
            sample_rate,
        } => {
            render(&patch, &module, frames, sample_rate);
        }
        Commands::Schemas { format } => {
            print_schemas(format);
        }
        Commands::List => {
            list_patches();
        }
    }
}

fn load_graph(patch_path: &PathBuf) -> PatchGraph {
    let patch_json = fs::read_to_string(patch_path)
        .unwrap_or_else(|e| panic!("Failed to read patch file {:?}: {}", patch_path, e));

    serde_json::from_str(&patch_json).unwrap_or_else(|e| panic!("Failed to parse patch JSON: {}", e))
}

fn build_patch(graph: &PatchGraph, sample_rate: f32) -> Patch {
    Patch::from_graph(graph, sample_rate).unwrap_or_else(|e| panic!("Failed to build patch: {}", e))
}

/// Output port names for a module id, looked up through the schemas.
fn output_ports(graph: &PatchGraph, module_id: &str) -> Vec<&'static str> {
    let module_type = graph
        .modules
        .iter()
        .find(|m| m.id == module_id)
        .unwrap_or_else(|| panic!("No module with id {} in the patch", module_id))
        .module_type
        .clone();

    dsp::schema()
        .iter()
        .find(|s| s.name == module_type)
        .map(|s| s.outputs.iter().map(|o| o.name).collect())
        .unwrap_or_else(|| panic!("No schema for module type {}", module_type))
}

fn run_benchmark(
    patch_path: &PathBuf,
    frames: u64,
    sample_rate: f32,
    warmup: u64,
    probe: Option<&str>,
) {
    let graph = load_graph(patch_path);
    println!("Loaded patch: {} modules", graph.modules.len());
    for module in &graph.modules {
        println!("  - {} ({})", module.id, module.module_type.cyan());
    }

    let patch = build_patch(&graph, sample_rate);

    let probe = probe.map(|target| {
        let (module_id, port) = target
            .split_once(':')
            .unwrap_or_else(|| panic!("Probe must look like module-id:port, got {}", target));
        (module_id.to_owned(), port.to_owned())
    });

    let read_probe = |patch: &Patch| {
        if let Some((module_id, port)) = &probe {
            if let Some(module) = patch.sampleables.get(module_id) {
                if let Ok(sample) = module.get_sample(port) {
                    black_box(sample);
                }
            }
        }
    };

    println!(
        "\nRunning benchmark: {} frames ({:.2}s at {}Hz)",
        frames,
        frames as f64 / sample_rate as f64,
        sample_rate
    );
    println!("  Warmup: {} frames", warmup);

    print!("Warming up...");
    for _ in 0..warmup {
        patch.process_frame();
        read_probe(&patch);
    }
    println!(" done");

    print!("Benchmarking...");
    let start = Instant::now();
    for _ in 0..frames {
        patch.process_frame();
        read_probe(&patch);
    }
    let elapsed = start.elapsed();
    println!(" done\n");

    let total_ns = elapsed.as_nanos() as f64;
    let ns_per_frame = total_ns / frames as f64;
    let frames_per_sec = 1_000_000_000.0 / ns_per_frame;
    let realtime_budget_ns = 1_000_000_000.0 / sample_rate as f64;
    let budget_usage = (ns_per_frame / realtime_budget_ns) * 100.0;

    println!("Results:");
    println!("  Total time:     {:?}", elapsed);
    println!("  Frames:         {}", frames);
    println!("  ns/frame:       {:.2}", ns_per_frame);
    println!("  frames/sec:     {:.0}", frames_per_sec);
    println!(
        "  Real-time budget: {:.2} ns/frame @ {}Hz",
        realtime_budget_ns, sample_rate
    );
    println!("  Budget usage:   {:.2}%", budget_usage);

    if budget_usage > 100.0 {
        println!("\n  {}", "WARNING: Exceeds real-time budget!".red());
    } else {
        println!(
            "\n  {}",
            format!("Within real-time budget ({:.1}x headroom)", 100.0 / budget_usage).green()
        );
    }
}

fn render(patch_path: &PathBuf, module_id: &str, frames: u64, sample_rate: f32) {
    let graph = load_graph(patch_path);
    let ports = output_ports(&graph, module_id);
    let patch = build_patch(&graph, sample_rate);

    for frame in 0..frames {
        patch.process_frame();
        let module = patch
            .sampleables
            .get(module_id)
            .unwrap_or_else(|| panic!("No module with id {} in the patch", module_id));

        let mut outputs = serde_json::Map::new();
        for port in &ports {
            if let Ok(sample) = module.get_sample(port) {
                outputs.insert((*port).to_owned(), json!(sample));
            }
        }
        println!(
            "{}",
            json!({ "frame": frame, "module": module_id, "outputs": outputs })
        );
    }
}

fn print_schemas(format: SchemaFormat) {
    let schemas = dsp::schema();
    match format {
        SchemaFormat::Table => {
            for schema in schemas {
                println!("{} - {}", schema.name.cyan(), schema.description);
                for param in schema.params {
                    println!("  {} {}", param.name.yellow(), param.description.dimmed());
                }
                for output in schema.outputs {
                    println!(
                        "  {} {}",
                        output.name.green(),
                        output.description.dimmed()
                    );
                }
                println!();
            }
        }
        SchemaFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&schemas).unwrap());
        }
        SchemaFormat::Document => {
            let schema = schemars::schema_for!(PatchGraph);
            println!("{}", serde_json::to_string_pretty(&schema).unwrap());
        }
    }
}

fn get_patches_dir() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    let candidates = [
        PathBuf::from("patches"),
        PathBuf::from("crates/normal_cli/patches"),
        exe_dir
            .clone()
            .map(|p| p.join("patches"))
            .unwrap_or_default(),
        exe_dir
            .map(|p| p.join("../../../crates/normal_cli/patches"))
            .unwrap_or_default(),
    ];

    for path in &candidates {
        if path.exists() && path.is_dir() {
            return path.clone();
        }
    }

    PathBuf::from("crates/normal_cli/patches")
}

fn list_patches() {
    let patches_dir = get_patches_dir();
    println!("Patches directory: {:?}", patches_dir);

    if !patches_dir.exists() {
        println!("  (directory does not exist - create patches here)");
        return;
    }

    let entries: Vec<_> = fs::read_dir(&patches_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.path()
                        .extension()
                        .map(|ext| ext == "json")
                        .unwrap_or(false)
                })
                .collect()
        })
        .unwrap_or_default();

    if entries.is_empty() {
        println!("  (no .json patches found)");
        return;
    }

    println!("\nAvailable patches:");
    for entry in entries {
        let path = entry.path();
        let name = path.file_name().unwrap_or_default().to_string_lossy();

        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(graph) = serde_json::from_str::<PatchGraph>(&content) {
                println!("  {} ({} modules)", name, graph.modules.len());
            } else {
                println!("  {} (invalid JSON)", name);
            }
        } else {
            println!("  {} (unreadable)", name);
        }
    }
}
