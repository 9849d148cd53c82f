use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use compositor::{
    run_preview, DemoScene, DisplaySize, FrameOrchestrator, PointerTracker, PreviewConfig,
    SoftwareBackend,
};
use fxconfig::{DisplayConfig, DistortionParameters, FxConfig, Preset, CONFIG_VERSION};
use image::DynamicImage;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::{GlobalArgs, InitArgs, RenderArgs};
use crate::paths::AppPaths;
use crate::scripted;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Configuration resolved from the config file and command-line flags.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub config_file: Option<PathBuf>,
    pub preset: Preset,
    pub display: DisplayConfig,
    pub parameters: DistortionParameters,
}

impl Session {
    pub fn resolve(options: &GlobalArgs, paths: &AppPaths) -> Result<Self> {
        let (config, config_file) = load_config(options.config.as_deref(), paths)?;
        let parameters = config
            .resolve_with(options.preset, &options.tuning.overrides())
            .context("invalid distortion parameters")?;
        let display = match options.size {
            Some(size) => DisplayConfig {
                width: size.width,
                height: size.height,
            },
            None => config.display(),
        };
        Ok(Self {
            config_file,
            preset: options.preset.or(config.preset).unwrap_or_default(),
            display,
            parameters,
        })
    }

    pub fn display_size(&self) -> DisplaySize {
        DisplaySize::new(self.display.width, self.display.height)
    }
}

fn load_config(explicit: Option<&Path>, paths: &AppPaths) -> Result<(FxConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let config = FxConfig::from_path(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?;
        return Ok((config, Some(path.to_path_buf())));
    }

    let default_path = paths.config_file();
    if default_path.is_file() {
        let config = FxConfig::from_path(&default_path)
            .with_context(|| format!("failed to load configuration {}", default_path.display()))?;
        tracing::debug!(path = %default_path.display(), "loaded configuration");
        Ok((config, Some(default_path)))
    } else {
        tracing::debug!(path = %default_path.display(), "no configuration file; using defaults");
        Ok((FxConfig::default(), None))
    }
}

pub fn preview(session: Session) -> Result<()> {
    tracing::info!(
        preset = %session.preset,
        size = %session.display_size(),
        "opening preview window"
    );
    run_preview(PreviewConfig {
        size: session.display_size(),
        params: session.parameters,
        title: format!("trailfx ({})", session.preset),
    })
}

pub fn render(session: &Session, args: &RenderArgs) -> Result<()> {
    let size = session.display_size();
    let mut orchestrator =
        FrameOrchestrator::new(SoftwareBackend::new(), session.parameters, size)?;
    let mut scene = DemoScene::new(args.fps);
    let mut tracker = PointerTracker::new();

    for frame in 0..args.frames {
        tracker.move_to(scripted::position(args.path, frame, args.frames));
        let pointer = tracker.latch(orchestrator.frame_index());
        let outcome = orchestrator.render_frame(&pointer, &mut scene);
        tracing::trace!(frame, ?outcome, "rendered headless frame");
    }

    let stats = orchestrator.stats();
    tracing::info!(
        frames = args.frames,
        presented = stats.presented,
        stale = stats.stale,
        skipped = stats.skipped,
        "headless render complete"
    );

    let Some(output) = orchestrator.backend().output() else {
        bail!("no frame was presented; nothing to write");
    };
    let pixels = DynamicImage::ImageRgba32F(output.clone()).to_rgba8();
    if let Some(parent) = args.out.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    pixels
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    tracing::info!(path = %args.out.display(), %size, "wrote frame");
    Ok(())
}

/// Writes the preset, flag overrides and display size as a fresh config file.
///
/// Any existing file is left alone unless `--force` is given; its contents are
/// never merged in.
pub fn init(options: &GlobalArgs, paths: &AppPaths, args: &InitArgs) -> Result<()> {
    let target = options
        .config
        .clone()
        .unwrap_or_else(|| paths.config_file());
    if target.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            target.display()
        );
    }

    let config = FxConfig {
        version: CONFIG_VERSION,
        preset: Some(options.preset.unwrap_or_default()),
        parameters: options.tuning.overrides(),
        display: Some(match options.size {
            Some(size) => DisplayConfig {
                width: size.width,
                height: size.height,
            },
            None => DisplayConfig::default(),
        }),
    };
    config
        .validate()
        .context("invalid distortion parameters")?;
    let text = config
        .to_toml_string()
        .context("failed to serialise configuration")?;

    if let Some(parent) = target.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&target, text)
        .with_context(|| format!("failed to write {}", target.display()))?;
    tracing::info!(path = %target.display(), "wrote configuration");
    Ok(())
}

pub fn print_params(session: &Session) -> Result<()> {
    let json = serde_json::to_string_pretty(session).context("failed to serialise parameters")?;
    println!("{json}");
    Ok(())
}

pub fn print_where(paths: &AppPaths) {
    let config_file = paths.config_file();
    println!("Configuration:");
    println!("  dir:    {}", paths.config_dir().display());
    println!(
        "  file:   {} ({})",
        config_file.display(),
        if config_file.is_file() {
            "present"
        } else {
            "missing"
        }
    );
}
