//! czosc: render and benchmark oscillator patches offline
//!
//! Usage:
//!   czosc render patches/cz_saw_chord.json --out chord.wav --seconds 4
//!   czosc bench patches/full_bank.json --frames 480000
//!   czosc schema > schemas.json
//!   czosc list
//!   samply record ./target/profiling/czosc bench patches/full_bank.json

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use czosc_core::Registry;
use czosc_core::patch::Patch;
use czosc_core::types::PatchGraph;
use hound::{WavSpec, WavWriter};
use std::fs;
use std::hint::black_box;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_SAMPLE_RATE: f32 = 48000.0;
const DEFAULT_FRAMES: u64 = 48000 * 10; // 10 seconds at 48kHz

/// Render, benchmark and inspect band-limited oscillator patches
#[derive(Parser)]
#[command(name = "czosc")]
#[command(about = "Render and benchmark band-limited oscillator patches")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a patch to a 32-bit float WAV file
    Render {
        /// Path to the patch JSON file
        patch: PathBuf,

        /// Output WAV path
        #[arg(short, long)]
        out: PathBuf,

        /// Length of the render in seconds
        #[arg(long, default_value_t = 2.0)]
        seconds: f32,

        /// Sample rate in Hz
        #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: f32,

        /// Write every poly channel of this module instead of a mono mixdown
        #[arg(short, long)]
        module: Option<String>,

        /// Scale applied to module voltages (0.2 maps ±5V to full scale)
        #[arg(long, default_value_t = 0.2)]
        gain: f32,
    },

    /// Run a benchmark with a patch file
    Bench {
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
    },

    /// Print every module schema as JSON
    Schema,

    /// List the bundled patches
    List,

    /// Build and run every bundled patch briefly
    Smoke {
        /// Frames per patch for smoke test
        #[arg(short, long, default_value_t = 4800)]
        frames: u64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    #[cfg(feature = "profile")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let registry = Registry::new();

    match cli.command {
        Commands::Render {
            patch,
            out,
            seconds,
            sample_rate,
            module,
            gain,
        } => render(
            &registry,
            &patch,
            &out,
            seconds,
            sample_rate,
            module.as_deref(),
            gain,
        ),
        Commands::Bench {
            patch,
            frames,
            sample_rate,
            warmup,
        } => run_benchmark(&registry, &patch, frames, sample_rate, warmup),
        Commands::Schema => {
            let json = serde_json::to_string_pretty(&registry.schemas())
                .context("failed to serialize module schemas")?;
            println!("{json}");
            Ok(())
        }
        Commands::List => list_patches(),
        Commands::Smoke { frames } => smoke_test(&registry, frames),
    }
}

fn load_graph(path: &Path) -> Result<PatchGraph> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read patch file {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("failed to parse patch JSON {}", path.display()))
}

fn load_patch(registry: &Registry, path: &Path) -> Result<Patch> {
    let graph = load_graph(path)?;
    for module in &graph.modules {
        info!(id = %module.id, module_type = %module.module_type, "loading module");
    }
    Patch::from_graph(&graph, registry)
        .with_context(|| format!("failed to build patch {}", path.display()))
}

fn render(
    registry: &Registry,
    patch_path: &Path,
    out: &Path,
    seconds: f32,
    sample_rate: f32,
    module: Option<&str>,
    gain: f32,
) -> Result<()> {
    if !(sample_rate > 0.0) {
        bail!("sample rate must be positive, got {sample_rate}");
    }
    let mut patch = load_patch(registry, patch_path)?;
    let sample_time = 1.0 / sample_rate;
    let frames = (seconds.max(0.0) * sample_rate) as u64;

    // Channel count is fixed by the first frame
    patch.process_frame(sample_time);
    let channels = match module {
        Some(id) => patch
            .output(id)
            .with_context(|| format!("patch has no module '{id}'"))?
            .channels()
            .max(1),
        None => 1,
    };

    let spec = WavSpec {
        channels: channels as u16,
        sample_rate: sample_rate as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = WavWriter::create(out, spec)
        .with_context(|| format!("failed to create {}", out.display()))?;

    info!(
        frames,
        channels,
        sample_rate,
        out = %out.display(),
        "rendering"
    );

    for frame in 0..frames {
        if frame > 0 {
            patch.process_frame(sample_time);
        }
        match module.and_then(|id| patch.output(id)) {
            Some(poly) => {
                for ch in 0..channels {
                    writer.write_sample(poly.get(ch) * gain)?;
                }
            }
            None => writer.write_sample(patch.mix_down() * gain)?,
        }
    }
    writer.finalize().context("failed to finalize WAV file")?;

    println!(
        "{} {} ({} frames, {} channel{})",
        "Wrote".green(),
        out.display(),
        frames,
        channels,
        if channels == 1 { "" } else { "s" }
    );
    Ok(())
}

fn run_benchmark(
    registry: &Registry,
    patch_path: &Path,
    frames: u64,
    sample_rate: f32,
    warmup: u64,
) -> Result<()> {
    if frames == 0 {
        bail!("frames must be greater than zero");
    }
    let mut patch = load_patch(registry, patch_path)?;
    let sample_time = 1.0 / sample_rate;

    println!(
        "\nRunning benchmark: {} frames ({:.2}s at {}Hz)",
        frames,
        frames as f64 / sample_rate as f64,
        sample_rate
    );
    println!("  Warmup: {} frames", warmup);
    println!("  Modules: {}", patch.len());

    for _ in 0..warmup {
        patch.process_frame(sample_time);
        black_box(patch.mix_down());
    }

    let start = Instant::now();
    for _ in 0..frames {
        patch.process_frame(sample_time);
        black_box(patch.mix_down());
    }
    let elapsed = start.elapsed();

    let ns_per_frame = elapsed.as_nanos() as f64 / frames as f64;
    let frames_per_sec = 1_000_000_000.0 / ns_per_frame;
    let realtime_budget_ns = 1_000_000_000.0 / sample_rate as f64;
    let budget_usage = (ns_per_frame / realtime_budget_ns) * 100.0;

    println!("\nResults:");
    println!("  Total time:     {:?}", elapsed);
    println!("  ns/frame:       {:.2}", ns_per_frame);
    println!("  frames/sec:     {:.0}", frames_per_sec);
    println!(
        "  Real-time budget: {:.2} ns/frame @ {}Hz",
        realtime_budget_ns, sample_rate
    );
    println!("  Budget usage:   {:.2}%", budget_usage);

    if budget_usage > 100.0 {
        println!("\n  {}", "WARNING: Exceeds real-time budget!".red().bold());
    } else {
        println!(
            "\n  {}",
            format!(
                "Within real-time budget ({:.1}x headroom)",
                100.0 / budget_usage
            )
            .green()
        );
    }
    Ok(())
}

fn get_patches_dir() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    let candidates = [
        PathBuf::from("patches"),
        PathBuf::from("crates/czosc_cli/patches"),
        exe_dir
            .clone()
            .map(|p| p.join("patches"))
            .unwrap_or_default(),
        exe_dir
            .map(|p| p.join("../../crates/czosc_cli/patches"))
            .unwrap_or_default(),
    ];

    for path in &candidates {
        if path.is_dir() {
            return path.clone();
        }
    }

    PathBuf::from("crates/czosc_cli/patches")
}

fn patch_files() -> Result<Vec<PathBuf>> {
    let dir = get_patches_dir();
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .with_context(|| format!("failed to read patches directory {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

fn list_patches() -> Result<()> {
    println!("Patches directory: {}", get_patches_dir().display());
    let files = patch_files()?;
    if files.is_empty() {
        println!("  (no .json patches found)");
        return Ok(());
    }

    println!("\nAvailable patches:");
    for path in files {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        match load_graph(&path) {
            Ok(graph) => println!("  {} ({} modules)", name, graph.modules.len()),
            Err(_) => println!("  {} {}", name, "(invalid)".yellow()),
        }
    }
    Ok(())
}

fn smoke_test(registry: &Registry, frames: u64) -> Result<()> {
    println!("Running smoke test with {} frames per patch\n", frames);
    let sample_time = 1.0 / DEFAULT_SAMPLE_RATE;
    let mut failures = 0;

    for path in patch_files()? {
        let name = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
        print!("Testing {}... ", name);

        match load_graph(&path).and_then(|g| Ok(Patch::from_graph(&g, registry)?)) {
            Ok(mut patch) => {
                let start = Instant::now();
                let mut finite = true;
                for _ in 0..frames {
                    patch.process_frame(sample_time);
                    finite &= patch.mix_down().is_finite();
                }
                let ns_per_frame = start.elapsed().as_nanos() as f64 / frames.max(1) as f64;
                if finite {
                    println!("{} ({:.2} ns/frame)", "OK".green(), ns_per_frame);
                } else {
                    failures += 1;
                    println!("{}: non-finite output", "FAILED".red());
                }
            }
            Err(e) => {
                failures += 1;
                println!("{}: {:#}", "FAILED".red(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{failures} patch(es) failed");
    }
    Ok(())
}
