#![deny(unsafe_code)]
//! CLI binary for flowfield.
//!
//! Subcommands:
//! - `render` runs a particle flow simulation N steps and writes a PNG
//! - `inspect` builds the vector field only and reports its shape and angles

mod error;
mod loader;
mod snapshot;

use clap::{Args, Parser, Subcommand};
use error::CliError;
use flowfield_core::{Engine, FieldSource, RunSpec, VectorField};
use flowfield_sim::FlowSim;
use loader::ImageFileLoader;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "flowfield", about = "Flow-field particle renderer")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Plane, grid and source options shared by every subcommand.
#[derive(Args)]
struct FieldArgs {
    /// Plane width in pixels.
    #[arg(short = 'W', long, default_value_t = 640)]
    width: usize,

    /// Plane height in pixels.
    #[arg(short = 'H', long, default_value_t = 480)]
    height: usize,

    /// Number of noise layers.
    #[arg(short, long, default_value_t = 1)]
    depth: usize,

    /// Cell edge length in pixels.
    #[arg(short, long, default_value_t = 10)]
    resolution: usize,

    /// PRNG seed for particles, and for noise unless --noise sets one.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Derive the field from this image's red channel.
    #[arg(long, conflicts_with = "noise")]
    image: Option<String>,

    /// Noise config as a JSON object, e.g. '{"seed": 7, "res": {"x": 0.05}}'.
    #[arg(long)]
    noise: Option<String>,

    /// Load the whole run from a spec file; other run options are ignored.
    #[arg(long)]
    spec: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a particle flow for N steps and write a PNG snapshot.
    Render {
        #[command(flatten)]
        field: FieldArgs,

        /// Number of simulation steps.
        #[arg(short, long, default_value_t = 500)]
        steps: usize,

        /// Simulation parameters as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,

        /// Save the resolved run spec to this file.
        #[arg(long)]
        save_spec: Option<PathBuf>,

        /// Draw the active field layer over the trail.
        #[arg(long)]
        overlay: bool,

        /// Output file path.
        #[arg(short, long, default_value = "flowfield.png")]
        output: PathBuf,
    },
    /// Build the field and print its shape and angle statistics.
    Inspect {
        #[command(flatten)]
        field: FieldArgs,
    },
}

fn parse_json(text: &str, flag: &str) -> Result<Value, CliError> {
    serde_json::from_str(text).map_err(|e| CliError::Input(format!("invalid {flag} JSON: {e}")))
}

fn load_spec(path: &Path) -> Result<RunSpec, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Input(format!("invalid spec {}: {e}", path.display())))
}

/// Resolves the run from `--spec` or from the individual options.
fn resolve_spec(args: &FieldArgs, steps: usize, params: &str) -> Result<RunSpec, CliError> {
    let spec = match &args.spec {
        Some(path) => load_spec(path)?,
        None => {
            let mut spec = RunSpec::new(args.width, args.height, args.resolution, args.seed);
            spec.depth = args.depth;
            spec.steps = steps;
            spec.params = parse_json(params, "--params")?;
            let source = match (&args.image, &args.noise) {
                (Some(path), _) => Value::String(path.clone()),
                (None, Some(noise)) => parse_json(noise, "--noise")?,
                (None, None) => json!({ "seed": args.seed }),
            };
            // Saved specs carry the fully defaulted noise config.
            spec.source = FieldSource::from_json(&source)?.to_json();
            spec
        }
    };
    spec.validate()?;
    Ok(spec)
}

fn save_spec(spec: &RunSpec, path: &Path) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(spec)?;
    fs::write(path, text).map_err(|e| CliError::Io(format!("{}: {e}", path.display())))
}

/// Angle statistics of the active layer: `(min, max, mean)` in radians.
fn angle_stats(field: &VectorField) -> Option<(f64, f64, f64)> {
    let mut count = 0usize;
    let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
    for (_, _, cell) in field.cells() {
        let a = cell.angle();
        min = min.min(a);
        max = max.max(a);
        sum += a;
        count += 1;
    }
    (count > 0).then(|| (min, max, sum / count as f64))
}

fn render(
    args: &FieldArgs,
    steps: usize,
    params: &str,
    save_spec_to: Option<&Path>,
    overlay: bool,
    output: &Path,
    json_mode: bool,
) -> Result<(), CliError> {
    let spec = resolve_spec(args, steps, params)?;
    if let Some(path) = save_spec_to {
        save_spec(&spec, path)?;
        log::info!("saved run spec to {}", path.display());
    }

    let mut sim = FlowSim::from_spec(&spec, ImageFileLoader)?;
    (0..spec.steps).try_for_each(|_| sim.step())?;
    log::info!("ran {} steps", spec.steps);

    let img = snapshot::render(sim.trail(), overlay.then(|| sim.field()))?;
    if overlay {
        sim.field_mut().clear_dirty();
    }
    snapshot::write_png(&img, output)?;

    if json_mode {
        let info = json!({
            "width": spec.width,
            "height": spec.height,
            "depth": sim.field().depth(),
            "resolution": spec.resolution,
            "steps": sim.tick(),
            "seed": spec.seed,
            "particles": sim.particles().len(),
            "params": sim.params(),
            "output": output.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        eprintln!(
            "rendered {}x{} ({} particles, {} steps, seed {}) -> {}",
            spec.width,
            spec.height,
            sim.particles().len(),
            spec.steps,
            spec.seed,
            output.display()
        );
    }
    Ok(())
}

fn inspect(args: &FieldArgs, json_mode: bool) -> Result<(), CliError> {
    let spec = resolve_spec(args, 0, "{}")?;
    let mut field = VectorField::from_json(spec.dims(), &spec.source, ImageFileLoader)?;
    field.wait_ready()?;
    let stats = angle_stats(&field);

    if json_mode {
        let angles = stats.map(|(min, max, mean)| json!({"min": min, "max": max, "mean": mean}));
        let info = json!({
            "width": field.width(),
            "height": field.height(),
            "resolution": field.resolution(),
            "rows": field.rows(),
            "cols": field.cols(),
            "depth": field.depth(),
            "active_layer": field.active_layer(),
            "angles": angles,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("rows:   {}", field.rows());
        println!("cols:   {}", field.cols());
        println!("depth:  {}", field.depth());
        if let Some((min, max, mean)) = stats {
            println!("angle:  min {min:.4}  max {max:.4}  mean {mean:.4}");
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Render {
            field,
            steps,
            params,
            save_spec,
            overlay,
            output,
        } => render(
            &field,
            steps,
            &params,
            save_spec.as_deref(),
            overlay,
            &output,
            cli.json,
        ),
        Command::Inspect { field } => inspect(&field, cli.json),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
