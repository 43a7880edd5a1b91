use anyhow::Context;
use clap::{Parser, Subcommand};
use glint_assets::{AssetCache, AssetSource, HdrImage, ModelData, PrefilteredEnvironment, fetch};
use glint_common::config::{DEFAULT_ENVIRONMENT, DEFAULT_MODEL};
use glint_render::{DebugTextRenderer, Renderer, RgbShiftParams, rgb_shift};
use glint_scene::Scene;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glint-cli", about = "CLI tool for glint assets")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Cache directory for downloaded assets
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print versions and viewer defaults
    Info,
    /// Import a glTF/GLB model and summarise it
    InspectModel {
        /// Path or URL
        source: String,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode an HDR environment and print its prefiltered levels
    InspectEnv {
        /// Path or URL
        source: String,
        /// Maximum number of levels
        #[arg(long, default_value = "8")]
        levels: u32,
    },
    /// Apply the RGB shift to an image file
    Shift {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        amount: Option<f32>,
        #[arg(long)]
        angle: Option<f32>,
    },
}

const ROUGHNESS_SAMPLES: [f32; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

fn env_report(env: &PrefilteredEnvironment) -> String {
    let mut out = String::new();
    for (i, level) in env.levels.iter().enumerate() {
        let [r, g, b] = level.mean();
        out.push_str(&format!(
            "level {i}: {}x{} mean=({r:.4}, {g:.4}, {b:.4})\n",
            level.width, level.height
        ));
    }
    for roughness in ROUGHNESS_SAMPLES {
        out.push_str(&format!(
            "roughness {roughness:.2} -> level {:.2}\n",
            env.level_for_roughness(roughness)
        ));
    }
    out
}

fn shift_file(input: &Path, output: &Path, params: &RgbShiftParams) -> anyhow::Result<()> {
    let img = image::open(input)
        .with_context(|| format!("reading {}", input.display()))?
        .to_rgba8();
    let shifted = rgb_shift(&img, params);
    shifted
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let cache = cli.cache_dir.as_ref().map(AssetCache::open).transpose()?;
    if let Some(cache) = &cache {
        tracing::debug!("asset cache at {}", cache.dir().display());
    }

    match cli.command {
        Commands::Info => {
            println!("glint-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("assets: {}", glint_assets::crate_info());
            println!("render: {}", glint_render::crate_info());
            println!("input: {}", glint_input::crate_info());
            println!("default model: {DEFAULT_MODEL}");
            println!("default environment: {DEFAULT_ENVIRONMENT}");
            let shift = RgbShiftParams::default();
            println!("rgb shift: amount={} angle={}", shift.amount, shift.angle);
        }
        Commands::InspectModel { source, json } => {
            let source = AssetSource::parse(&source)?;
            tracing::info!("importing {source}");
            let model = ModelData::load(&source, cache.as_ref())
                .with_context(|| format!("loading {source}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&model.summary())?);
            } else {
                let bounds = model.bounds();
                let mut scene = Scene::new();
                scene.add_model(Arc::new(model));
                print!("{}", DebugTextRenderer::new().render(&scene));
                if let Some((min, max)) = bounds {
                    println!("bounds: {min} .. {max}");
                }
            }
        }
        Commands::InspectEnv { source, levels } => {
            let source = AssetSource::parse(&source)?;
            tracing::info!("decoding {source}");
            let bytes = fetch(&source, cache.as_ref()).with_context(|| format!("loading {source}"))?;
            let hdr = HdrImage::decode(&bytes)?;
            let [r, g, b] = hdr.mean();
            println!(
                "{source}: {}x{} mean=({r:.4}, {g:.4}, {b:.4}) peak luminance={:.2}",
                hdr.width,
                hdr.height,
                hdr.peak_luminance()
            );
            let env = PrefilteredEnvironment::from_equirect(&hdr, levels.max(1));
            print!("{}", env_report(&env));
        }
        Commands::Shift {
            input,
            output,
            amount,
            angle,
        } => {
            let defaults = RgbShiftParams::default();
            let params = RgbShiftParams::new(
                amount.unwrap_or(defaults.amount),
                angle.unwrap_or(defaults.angle),
            );
            tracing::info!("shifting {} with {params:?}", input.display());
            shift_file(&input, &output, &params)?;
            println!(
                "wrote {} (amount={}, angle={})",
                output.display(),
                params.amount,
                params.angle
            );
        }
    }

    Ok(())
}
