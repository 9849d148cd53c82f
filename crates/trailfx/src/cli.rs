use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use compositor::DisplaySize;
use fxconfig::{BlurKernel, FeedbackSource, KernelShape, ParameterOverrides, Preset};

#[derive(Parser, Debug)]
#[command(
    name = "trailfx",
    author,
    version,
    about = "Pointer-reactive distortion compositor",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (defaults to `trailfx.toml` in the config directory).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Parameter preset: `motion`, `fluid`, `lens`, `subtle` or `frosted`.
    #[arg(long, global = true, value_name = "NAME", value_parser = parse_preset)]
    pub preset: Option<Preset>,

    /// Display size (e.g. `1280x720`).
    #[arg(long, global = true, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<DisplaySize>,

    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Per-parameter overrides. Anything left unset comes from the config file or preset.
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Per-frame multiplier applied to the previous field.
    #[arg(long, global = true, value_name = "FACTOR")]
    pub decay: Option<f32>,

    /// Brush radius in normalized viewport units.
    #[arg(long, global = true, value_name = "RADIUS")]
    pub radius: Option<f32>,

    #[arg(long, global = true, value_name = "GAIN")]
    pub splat_gain: Option<f32>,

    /// Length of the motion-blur streak along the field direction.
    #[arg(long, global = true, value_name = "EXTENT")]
    pub blur_extent: Option<f32>,

    #[arg(long, global = true, value_name = "COUNT")]
    pub samples: Option<u32>,

    /// Channel separation of the chromatic split.
    #[arg(long, global = true, value_name = "SCALE")]
    pub chromatic: Option<f32>,

    #[arg(long, global = true, value_name = "GAIN")]
    pub magnitude_gain: Option<f32>,

    /// Downsampler kernel as `WIDTH[:SHAPE]`, e.g. `5:tent`.
    #[arg(long, global = true, value_name = "KERNEL", value_parser = parse_kernel)]
    pub kernel: Option<BlurKernel>,

    #[arg(long, global = true, value_name = "AMPLITUDE")]
    pub jitter: Option<f32>,

    #[arg(long, global = true, value_name = "SEED")]
    pub seed: Option<u32>,

    /// Painter feedback source: `blurred` or `working`.
    #[arg(long, global = true, value_name = "SOURCE", value_parser = parse_feedback)]
    pub feedback: Option<FeedbackSource>,

    #[arg(long, global = true, value_name = "AMOUNT")]
    pub diffusion: Option<f32>,

    /// Measure brush distances without correcting for the aspect ratio.
    #[arg(long, global = true)]
    pub no_aspect_correct: bool,

    /// Spiral blur strength near the pointer; 0 disables it.
    #[arg(long, global = true, value_name = "STRENGTH")]
    pub selective_blur: Option<f32>,

    #[arg(long, global = true, value_name = "RADIUS")]
    pub selective_radius: Option<f32>,

    /// Colour-split the image wherever the distortion changed it.
    #[arg(long, global = true)]
    pub selective_chromatic: bool,
}

impl TuningArgs {
    pub fn overrides(&self) -> ParameterOverrides {
        ParameterOverrides {
            decay_factor: self.decay,
            trail_radius: self.radius,
            splat_gain: self.splat_gain,
            blur_extent: self.blur_extent,
            motion_blur_samples: self.samples,
            chromatic_offset_scale: self.chromatic,
            magnitude_gain: self.magnitude_gain,
            blur_kernel: self.kernel,
            jitter_amplitude: self.jitter,
            noise_seed: self.seed,
            feedback: self.feedback,
            diffusion: self.diffusion,
            aspect_correct: self.no_aspect_correct.then_some(false),
            selective_blur_strength: self.selective_blur,
            selective_blur_radius: self.selective_radius,
            selective_chromatic: self.selective_chromatic.then_some(true),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the demo scene headlessly with a scripted pointer and write a PNG.
    Render(RenderArgs),
    /// Print the resolved parameters as JSON.
    Params,
    /// Print the resolved configuration directory and file.
    Where,
    /// Write a config file from the preset and flags given on the command line.
    Init(InitArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Replace an existing config file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Number of frames to simulate before writing the last one.
    #[arg(long, value_name = "COUNT", default_value_t = 120, value_parser = clap::value_parser!(u32).range(1..))]
    pub frames: u32,

    /// Output PNG path.
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Scripted pointer movement.
    #[arg(long, value_enum, default_value_t = PathKind::Circle)]
    pub path: PathKind,

    /// Frame rate used to animate the demo scene.
    #[arg(long, value_name = "FPS", default_value_t = 60.0)]
    pub fps: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// One loop around the centre.
    Circle,
    /// Left to right across the middle.
    Sweep,
    /// Pointer held at the centre.
    Still,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_preset(value: &str) -> Result<Preset, String> {
    value.parse::<Preset>().map_err(|err| err.to_string())
}

pub fn parse_size(value: &str) -> Result<DisplaySize, String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}' in size", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}' in size", height.trim()))?;
    if width == 0 || height == 0 {
        return Err("display dimensions must be greater than zero".to_string());
    }
    Ok(DisplaySize::new(width, height))
}

pub fn parse_feedback(value: &str) -> Result<FeedbackSource, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "blurred" | "low-res" | "lowres" => Ok(FeedbackSource::Blurred),
        "working" | "paint" => Ok(FeedbackSource::Working),
        other => Err(format!(
            "unknown feedback source '{other}'; expected blurred or working"
        )),
    }
}

pub fn parse_kernel(value: &str) -> Result<BlurKernel, String> {
    let trimmed = value.trim();
    let (width, shape) = match trimmed.split_once(':') {
        Some((width, shape)) => (width, Some(shape)),
        None => (trimmed, None),
    };
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid kernel width '{}'", width.trim()))?;
    let shape = match shape.map(|shape| shape.trim().to_ascii_lowercase()) {
        None => KernelShape::default(),
        Some(shape) => match shape.as_str() {
            "box" => KernelShape::Box,
            "tent" | "binomial" => KernelShape::Tent,
            other => {
                return Err(format!(
                    "unknown kernel shape '{other}'; expected box or tent"
                ))
            }
        },
    };
    Ok(BlurKernel { width, shape })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), DisplaySize::new(1280, 720));
        assert_eq!(parse_size(" 64 X 48 ").unwrap(), DisplaySize::new(64, 48));
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("1280").is_err());
        assert!(parse_size("wide x tall").is_err());
    }

    #[test]
    fn parses_kernels() {
        assert_eq!(
            parse_kernel("5:tent").unwrap(),
            BlurKernel {
                width: 5,
                shape: KernelShape::Tent
            }
        );
        assert_eq!(parse_kernel("3").unwrap().shape, KernelShape::Box);
        assert!(parse_kernel("3:gauss").is_err());
        assert!(parse_kernel("three").is_err());
    }

    #[test]
    fn parses_feedback_sources() {
        assert_eq!(parse_feedback("Working").unwrap(), FeedbackSource::Working);
        assert_eq!(parse_feedback("blurred").unwrap(), FeedbackSource::Blurred);
        assert!(parse_feedback("both").is_err());
    }

    #[test]
    fn global_flags_reach_subcommands() {
        let cli = Cli::try_parse_from([
            "trailfx",
            "render",
            "--out",
            "frame.png",
            "--preset",
            "lens",
            "--decay",
            "0.9",
            "--no-aspect-correct",
        ])
        .unwrap();
        assert_eq!(cli.options.preset, Some(Preset::Lens));
        let overrides = cli.options.tuning.overrides();
        assert_eq!(overrides.decay_factor, Some(0.9));
        assert_eq!(overrides.aspect_correct, Some(false));
        assert_eq!(overrides.trail_radius, None);
        match cli.command {
            Some(Command::Render(args)) => {
                assert_eq!(args.frames, 120);
                assert_eq!(args.path, PathKind::Circle);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn selective_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "trailfx",
            "params",
            "--selective-blur",
            "12",
            "--selective-chromatic",
        ])
        .unwrap();
        let overrides = cli.options.tuning.overrides();
        assert_eq!(overrides.selective_blur_strength, Some(12.0));
        assert_eq!(overrides.selective_blur_radius, None);
        assert_eq!(overrides.selective_chromatic, Some(true));
    }

    #[test]
    fn render_requires_at_least_one_frame() {
        let result = Cli::try_parse_from(["trailfx", "render", "--out", "x.png", "--frames", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn no_subcommand_means_preview() {
        let cli = Cli::try_parse_from(["trailfx", "--size", "800x600"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.options.size, Some(DisplaySize::new(800, 600)));
    }
}
