//! Scene Translator CLI
//!
//! Translate scene bundles into a manifest directory.

use clap::{Parser, Subcommand, ValueEnum};
use scene_translator::source::SourceNodeKind;
use scene_translator::{
    export_scene, load_scene_bundle, write_manifest, ExportOptions, KeyframeMode, TextureFormat,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scene-translator")]
#[command(author, version, about = "Translate 3D scene bundles into a normalized intermediate model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a bundle and write manifest.json plus textures
    Export {
        /// Scene bundle (ZIP or directory containing scene.json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// JSON file with export options; flags below override it
        #[arg(long)]
        options: Option<PathBuf>,

        /// Maximum baked texture size
        #[arg(long)]
        max_texture_size: Option<u32>,

        /// Texture file format
        #[arg(long, value_enum)]
        texture_format: Option<FormatArg>,

        /// Keyframe sampling mode
        #[arg(long, value_enum)]
        keyframes: Option<KeyframeArg>,

        /// Step in frames for step sampling (implies --keyframes step)
        #[arg(long)]
        step: Option<f32>,

        /// Translation scale factor (0.1 converts mm to cm)
        #[arg(long)]
        unit_scale: Option<f32>,

        /// Convert RGB layers feeding scalar channels to luminance
        #[arg(long)]
        grayscale: bool,

        /// Always re-bake bitmaps instead of reusing them
        #[arg(long)]
        no_passthrough: bool,

        /// Drop skin weights and skeleton bindings
        #[arg(long)]
        no_skin: bool,

        /// Drop vertex colors
        #[arg(long)]
        no_vertex_colors: bool,

        /// Ignore the subdivision flag of meshes
        #[arg(long)]
        no_subdivision: bool,
    },

    /// Show information about a scene bundle
    Info {
        /// Scene bundle (ZIP or directory containing scene.json)
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Keep the source format
    Keep,
    Png,
    Jpeg,
}

impl From<FormatArg> for TextureFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Keep => TextureFormat::Keep,
            FormatArg::Png => TextureFormat::Png,
            FormatArg::Jpeg => TextureFormat::Jpeg,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum KeyframeArg {
    /// No animation
    None,
    /// Native keyframes only
    Native,
    /// Native keyframes plus fixed steps
    Step,
}

impl From<KeyframeArg> for KeyframeMode {
    fn from(arg: KeyframeArg) -> Self {
        match arg {
            KeyframeArg::None => KeyframeMode::None,
            KeyframeArg::Native => KeyframeMode::Native,
            KeyframeArg::Step => KeyframeMode::Step,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            options,
            max_texture_size,
            texture_format,
            keyframes,
            step,
            unit_scale,
            grayscale,
            no_passthrough,
            no_skin,
            no_vertex_colors,
            no_subdivision,
        } => {
            let mut config = match options {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => ExportOptions::default(),
            };
            if let Some(size) = max_texture_size {
                config = config.with_max_texture_size(size);
            }
            if let Some(format) = texture_format {
                config = config.with_texture_format(format.into());
            }
            if let Some(mode) = keyframes {
                config = config.with_keyframes(mode.into());
            }
            if let Some(step) = step {
                config = config.with_step_keyframes(step);
            }
            if let Some(scale) = unit_scale {
                config = config.with_unit_scale(scale);
            }
            if grayscale {
                config = config.with_grayscale(true);
            }
            if no_passthrough {
                config = config.with_passthrough(false);
            }
            config.export_skin &= !no_skin;
            config.export_vertex_colors &= !no_vertex_colors;
            config.subdivision &= !no_subdivision;

            export_bundle(&input, &output, &config)?;
        }
        Commands::Info { input } => {
            show_bundle_info(&input)?;
        }
    }

    Ok(())
}

fn export_bundle(
    input: &PathBuf,
    output_dir: &PathBuf,
    options: &ExportOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene bundle from {:?}...", input);
    let scene = load_scene_bundle(input)?;
    println!("  Found {} nodes, {} surfaces, {} bitmaps", scene.node_count(), scene.surfaces.len(), scene.bitmaps.len());

    let output = export_scene(&scene, options);
    println!(
        "  Generated {} meshes, {} vertices, {} faces",
        output.mesh_count(),
        output.total_vertices(),
        output.total_faces()
    );
    println!(
        "  {} materials, {} images, {} skeletons",
        output.materials.len(),
        output.images.len(),
        output.skeletons.len()
    );
    if !output.warnings.is_empty() {
        println!("  {} warnings:", output.warnings.len());
        for warning in &output.warnings {
            println!("    - {}", warning);
        }
    }

    let manifest = write_manifest(&output, &scene, output_dir)?;
    println!("Exported manifest to {:?}", manifest);

    Ok(())
}

fn show_bundle_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene bundle from {:?}...", input);
    let scene = load_scene_bundle(input)?;

    let mut meshes = 0;
    let mut joints = 0;
    let mut instances = 0;
    scene.walk(|node, _| match &node.kind {
        SourceNodeKind::Mesh { .. } => meshes += 1,
        SourceNodeKind::Joint(_) => joints += 1,
        SourceNodeKind::Instance { .. } => instances += 1,
        _ => {}
    });
    let decoded = scene.bitmaps.iter().filter(|b| b.image.is_some()).count();

    println!("\nScene Bundle Info:");
    println!("  Name: {}", scene.name);
    println!("  Frames: {} - {} @ {} fps", scene.start_frame, scene.end_frame, scene.frames_per_second);
    println!("  Nodes: {}", scene.node_count());
    println!("  Meshes: {}", meshes);
    println!("  Joints: {}", joints);
    println!("  Instances: {}", instances);
    println!("  Surfaces: {}", scene.surfaces.len());
    println!("  Bitmaps: {} ({} decoded)", scene.bitmaps.len(), decoded);

    Ok(())
}
