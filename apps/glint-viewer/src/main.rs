mod app;
mod hud;
mod loader;

use anyhow::Result;
use clap::Parser;
use glint_assets::{AssetCache, AssetSource, environment::DEFAULT_LEVELS};
use glint_common::ViewerConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser, Debug)]
#[command(name = "glint-viewer", about = "HDR-lit glTF viewer with RGB-shift post-processing")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// glTF/GLB model path or URL
    #[arg(long)]
    model: Option<String>,

    /// Radiance HDR environment path or URL
    #[arg(long)]
    environment: Option<String>,

    /// Cache directory for downloaded assets
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// RGB shift amount in texture coordinates
    #[arg(long)]
    rgb_shift_amount: Option<f32>,

    /// RGB shift direction in radians
    #[arg(long)]
    rgb_shift_angle: Option<f32>,

    /// Tone mapping exposure
    #[arg(long)]
    exposure: Option<f32>,

    /// Upper bound on the render pixel ratio
    #[arg(long)]
    max_pixel_ratio: Option<f64>,

    /// Draw the environment behind the model
    #[arg(long)]
    background: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn resolve(&self) -> Result<ViewerConfig> {
        let mut config = ViewerConfig::load_or_default(self.config.as_deref())?;
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(environment) = &self.environment {
            config.environment = environment.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(amount) = self.rgb_shift_amount {
            config.rgb_shift_amount = amount;
        }
        if let Some(angle) = self.rgb_shift_angle {
            config.rgb_shift_angle = angle;
        }
        if let Some(exposure) = self.exposure {
            config.exposure = exposure;
        }
        if let Some(ratio) = self.max_pixel_ratio {
            config.max_pixel_ratio = ratio;
        }
        if self.background {
            config.show_background = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("glint-viewer starting");
    let config = cli.resolve()?;

    let cache = config.cache_dir.as_ref().map(AssetCache::open).transpose()?;
    if let Some(cache) = &cache {
        tracing::info!("asset cache at {}", cache.dir().display());
    }
    let receiver = loader::spawn(loader::LoadJob {
        environment: AssetSource::parse(&config.environment)?,
        model: AssetSource::parse(&config.model)?,
        cache,
        env_levels: DEFAULT_LEVELS,
    })?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::GpuApp::new(config, receiver);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_flags() {
        let cli = Cli::try_parse_from(["glint-viewer"]).unwrap();
        assert_eq!(cli.resolve().unwrap(), ViewerConfig::default());
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model: from_file.glb\nexposure: 0.9\nrgb_shift_amount: 0.01").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let cli = Cli::try_parse_from([
            "glint-viewer",
            "--config",
            &path,
            "--exposure",
            "1.2",
            "--background",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.model, "from_file.glb");
        assert_eq!(config.rgb_shift_amount, 0.01);
        assert_eq!(config.exposure, 1.2);
        assert!(config.show_background);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = Cli::try_parse_from(["glint-viewer", "--exposure", "0"]).unwrap();
        assert!(cli.resolve().is_err());
    }
}
