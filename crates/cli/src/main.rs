#![deny(unsafe_code)]
//! CLI binary for the cliffray field raymarcher.
//!
//! Subcommands:
//! - `render` — raytrace a preset or JSON field on the CPU, write PNG
//! - `validate` — run camera and algorithm configs through the pipeline builder
//! - `shader` — print the generated GLSL
//! - `list` — print available presets and view modes
//!
//! JSON arguments accept either inline JSON or `@path` to read a file.

mod error;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use cliffray_core::pipeline::{
    fragment_shader_source, validate_camera_mathematics,
    validate_raymarching_algorithm_structure, vertex_shader_source, FieldSignature,
    RaymarchPipelineBuilder,
};
use cliffray_core::{CameraState, MultivectorField, RenderingParameters, TextureEncoding, ViewMode};
use cliffray_snapshot::FieldPreset;
use error::CliError;
use serde_json::Value;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "cliffray", about = "Clifford field raymarcher CLI")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Raytrace a field on the CPU and write a PNG snapshot.
    Render {
        /// Field preset name (see `list`). Ignored when --field is given.
        #[arg(short, long, default_value = DEFAULT_PRESET)]
        preset: String,

        /// Field as JSON: a 16-element array or an object with `components`.
        #[arg(long)]
        field: Option<String>,

        /// Animation frame for animated presets.
        #[arg(long, default_value_t = 0)]
        frame: u64,

        /// Camera JSON (`position`, `target`, `up`, `fov`, `aspect_ratio`).
        /// Missing keys take defaults: (0, 0, 8) looking at the origin, fov
        /// 60, the image aspect.
        #[arg(long)]
        camera: Option<String>,

        /// Rendering JSON (`max_steps`, `min_distance`, `max_distance`).
        /// Missing keys take defaults.
        #[arg(long)]
        rendering: Option<String>,

        /// Image width in pixels.
        #[arg(short = 'W', long, default_value_t = 256)]
        width: u32,

        /// Image height in pixels.
        #[arg(short = 'H', long, default_value_t = 256)]
        height: u32,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,
    },
    /// Validate camera and algorithm configs and build a pipeline from them.
    Validate {
        /// Camera JSON.
        #[arg(long)]
        camera: String,

        /// Algorithm JSON (`max_steps`, `min_distance`, `max_distance`).
        #[arg(long)]
        algorithm: Option<String>,

        /// Field algebra signature.
        #[arg(long, default_value = "Cl(1,3)")]
        algebra: String,

        /// Field dimension.
        #[arg(long, default_value_t = 16)]
        dimension: usize,
    },
    /// Print the generated shader source.
    Shader {
        /// Sphere-tracing step budget baked into the fragment shader.
        #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u32).range(1..))]
        max_steps: u32,

        /// Field texel encoding the shader decodes.
        #[arg(long, value_enum, default_value_t = EncodingArg::Float32)]
        encoding: EncodingArg,

        /// Which stage to print.
        #[arg(long, value_enum, default_value_t = StageArg::Fragment)]
        stage: StageArg,
    },
    /// List available presets and view modes.
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Float32,
    QuantizedU8,
}

impl From<EncodingArg> for TextureEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Float32 => TextureEncoding::Float32,
            EncodingArg::QuantizedU8 => TextureEncoding::QuantizedU8,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Vertex,
    Fragment,
}

/// Parses inline JSON, or the contents of a file for `@path`.
fn read_json(arg: &str, what: &str) -> Result<Value, CliError> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| CliError::Io(format!("cannot read {what} from {path}: {e}")))?,
        None => arg.to_owned(),
    };
    serde_json::from_str(&text).map_err(|e| CliError::Input(format!("invalid {what} JSON: {e}")))
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

const DEFAULT_PRESET: &str = "scalar";

/// The field to render and a label for it: `--field` JSON wins over the preset.
fn load_field(
    json: Option<&str>,
    preset: &str,
    frame: u64,
) -> Result<(MultivectorField, String), CliError> {
    let Some(json) = json else {
        let field = FieldPreset::from_name(preset)?.field(frame);
        log::info!(
            "preset {preset} at frame {frame}: {} non-zero components",
            field.non_zero_count()
        );
        return Ok((field, preset.to_owned()));
    };
    if preset != DEFAULT_PRESET {
        log::warn!("--field given, ignoring preset '{preset}'");
    }
    let value = read_json(json, "field")?;
    let field: MultivectorField = serde_json::from_value(value)
        .map_err(|e| CliError::Input(format!("invalid field: {e}")))?;
    log::info!("field from JSON: {} non-zero components", field.non_zero_count());
    Ok((field, "json".to_owned()))
}

/// Camera for a `width` x `height` image. Missing keys take defaults and
/// the aspect follows the image unless given.
fn render_camera(json: Option<&str>, width: u32, height: u32) -> Result<CameraState, CliError> {
    let image_aspect = width as f32 / height.max(1) as f32;
    let Some(json) = json else {
        return Ok(CameraState {
            aspect_ratio: image_aspect,
            ..CameraState::default()
        });
    };
    let value = read_json(json, "camera")?;
    let mut camera = CameraState::from_params(&value);
    if value.get("aspect_ratio").is_none() {
        log::debug!("camera aspect_ratio not given, using image aspect {image_aspect:.3}");
        camera.aspect_ratio = image_aspect;
    }
    let camera = validate_camera_mathematics(&serde_json::to_value(camera)?)?;
    log::debug!(
        "camera at {} looking at {}, fov {}",
        camera.position,
        camera.target,
        camera.fov
    );
    Ok(camera)
}

/// Sphere-tracing thresholds with defaults for missing keys.
fn render_parameters(json: Option<&str>) -> Result<RenderingParameters, CliError> {
    let Some(json) = json else {
        return Ok(RenderingParameters::default());
    };
    let value = read_json(json, "rendering")?;
    let rendering = RenderingParameters::from_params(&value);
    let rendering = validate_raymarching_algorithm_structure(&serde_json::to_value(rendering)?)?;
    log::debug!(
        "rendering: {} steps, distance {}..{}",
        rendering.max_steps,
        rendering.min_distance,
        rendering.max_distance
    );
    Ok(rendering)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let presets = FieldPreset::list_presets();
            let views = ViewMode::list_names();
            if cli.json {
                print_json(&serde_json::json!({
                    "presets": presets,
                    "views": views,
                }))?;
            } else {
                println!("Presets:");
                for name in presets {
                    println!("  {name}");
                }
                println!("Views:");
                println!("  {}", views.join(", "));
            }
        }
        Command::Shader {
            max_steps,
            encoding,
            stage,
        } => {
            let source = match stage {
                StageArg::Vertex => vertex_shader_source(),
                StageArg::Fragment => fragment_shader_source(max_steps, encoding.into()),
            };
            if cli.json {
                print_json(&serde_json::json!({ "source": source }))?;
            } else {
                print!("{source}");
            }
        }
        Command::Validate {
            camera,
            algorithm,
            algebra,
            dimension,
        } => {
            let camera = read_json(&camera, "camera")?;
            let mut builder = RaymarchPipelineBuilder::new();
            if let Some(algorithm) = algorithm {
                builder = builder.with_algorithm(read_json(&algorithm, "algorithm")?);
            }
            let signature = FieldSignature { algebra, dimension };
            let pipeline = builder.create_raymarching_pipeline(&signature, &camera)?;
            log::info!(
                "pipeline built: {} uniforms, {} fragment lines",
                pipeline.uniforms.len(),
                pipeline.fragment_source.lines().count()
            );

            if cli.json {
                print_json(&serde_json::json!({
                    "camera": pipeline.camera,
                    "rendering": pipeline.rendering,
                    "uniforms": pipeline.uniforms.keys().collect::<Vec<_>>(),
                    "fragment_lines": pipeline.fragment_source.lines().count(),
                }))?;
            } else {
                let c = &pipeline.camera;
                let r = &pipeline.rendering;
                println!(
                    "camera ok: position {}, fov {}, aspect {:.3}",
                    c.position, c.fov, c.aspect_ratio
                );
                println!(
                    "algorithm ok: {} steps, distance {}..{}",
                    r.max_steps, r.min_distance, r.max_distance
                );
            }
        }
        Command::Render {
            preset,
            field,
            frame,
            camera,
            rendering,
            width,
            height,
            output,
        } => {
            let (field, source) = load_field(field.as_deref(), &preset, frame)?;
            let camera = render_camera(camera.as_deref(), width, height)?;
            let rendering = render_parameters(rendering.as_deref())?;

            cliffray_snapshot::snapshot::write_png(
                &field,
                &camera,
                &rendering,
                (width, height),
                &output,
            )?;

            if cli.json {
                print_json(&serde_json::json!({
                    "field": source,
                    "frame": frame,
                    "width": width,
                    "height": height,
                    "max_steps": rendering.max_steps,
                    "output": output.display().to_string(),
                }))?;
            } else {
                eprintln!(
                    "rendered {source} ({width}x{height}, frame {frame}, {} steps) -> {}",
                    rendering.max_steps,
                    output.display()
                );
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let filter = log_filter(cli.verbose);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
