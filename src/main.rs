//! Gesture Tree - particle Christmas tree driven by hand gestures
//!
//! CLI commands:
//! - view: Launch the native viewer with a simulated hand
//! - simulate: Replay a scripted gesture timeline headlessly
//! - snapshot: Render one frame of a mode to PNG
//! - sample-text: Rasterize the greeting and report the point pool
//! - config: Write the default settings as YAML

mod gui;
mod logging;
mod render;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use gesture_tree::config::{Environment, Settings};
use gesture_tree::experience::Experience;
use gesture_tree::mode::Mode;
use gesture_tree::script::{self, Script};
use gesture_tree::text;

#[derive(Parser)]
#[command(name = "gesture_tree")]
#[command(about = "Gesture-driven particle Christmas tree")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to tree.yaml settings
    #[arg(short, long, default_value = "tree.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch native viewer
    View,

    /// Replay a gesture script without a window
    Simulate {
        /// Script file (YAML)
        #[arg(short, long)]
        script: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a single frame to PNG
    Snapshot {
        /// Mode to show (tree, scatter, focus, new-year)
        #[arg(short, long, default_value = "tree")]
        mode: Mode,

        /// Frames to run before capturing
        #[arg(short, long, default_value = "240")]
        frames: u32,

        /// Output image
        #[arg(short, long, default_value = "tree.png")]
        output: PathBuf,

        /// Image edge in pixels
        #[arg(long, default_value = "512")]
        size: u32,
    },

    /// Rasterize the greeting and save the bitmap
    SampleText {
        /// Output image
        #[arg(short, long, default_value = "message.png")]
        output: PathBuf,
    },

    /// Write the default settings
    Config {
        /// Output file
        #[arg(short, long, default_value = "tree.yaml")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let env = Environment::load();

    // Initialize logging first
    logging::init_logging(&env.log_dir)?;
    tracing::info!("Gesture Tree starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let mut settings = Settings::load_or_default(&cli.config)?;
    if let Some(seed) = env.seed {
        tracing::info!("Using seed {} from environment", seed);
        settings.seed = Some(seed);
    }

    match cli.command {
        Commands::View => {
            tracing::info!("Launching native viewer");
            gui::run_viewer(settings)?;
        }

        Commands::Simulate { script, json } => {
            simulate(settings, &script, json)?;
        }

        Commands::Snapshot { mode, frames, output, size } => {
            let mut experience = Experience::new(settings);
            experience.select_mode(mode);
            for _ in 0..frames {
                experience.tick((script::FRAME_MS / 1000.0) as f32);
            }
            render::snapshot(&experience, &output, size)?;
            println!("{} after {} frames -> {}", mode.label(), frames, output.display());
        }

        Commands::SampleText { output } => {
            sample_text(&settings, &output)?;
        }

        Commands::Config { output } => {
            std::fs::write(&output, settings.to_yaml()?)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote settings to {}", output.display());
        }
    }

    Ok(())
}

/// Replay a script and print what happened
fn simulate(settings: Settings, path: &Path, json: bool) -> anyhow::Result<()> {
    let script = Script::load(path).with_context(|| format!("loading script {}", path.display()))?;
    let report = script::run(&script, settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Ran {} ms: {} frames, {} camera frames, {} detection failures",
        report.duration_ms, report.frames, report.camera_frames, report.detection_failures
    );
    println!();
    for t in &report.transitions {
        let via = if t.manual { "legend" } else { "gesture" };
        println!("  {:>6} ms  {} -> {} ({})", t.at_ms, t.from.label(), t.to.label(), via);
    }
    println!();

    let last = &report.last;
    println!("Final mode: {}", last.mode.label());
    if let Some(id) = &last.focused_photo {
        println!("Focused photo: {}", id);
    }
    println!("Photos: {}", last.photos);
    for g in &last.groups {
        println!(
            "  {:<10} {:>5} elements  scatter {:.3}  message {:.3}",
            g.kind.label(),
            g.count,
            g.weights.scatter,
            g.weights.message
        );
    }
    Ok(())
}

/// Save the rasterized greeting and report the sampled pool
fn sample_text(settings: &Settings, output: &Path) -> anyhow::Result<()> {
    let message = &settings.message;
    let img = text::rasterize(&message.lines, message.canvas, message.canvas);
    img.save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    let pool = text::sample(&img, message.stride, message.threshold, message.scale);
    let (min, max) = pool.bounds();
    println!("Lines: {:?}", message.lines);
    println!(
        "Canvas {}x{}, stride {}: {} points{}",
        message.canvas,
        message.canvas,
        message.stride,
        pool.len(),
        if pool.is_fallback() { " (fallback)" } else { "" }
    );
    println!(
        "Bounds: x [{:.2}, {:.2}]  y [{:.2}, {:.2}]",
        min[0], max[0], min[1], max[1]
    );
    println!("Bitmap saved to {}", output.display());
    Ok(())
}
