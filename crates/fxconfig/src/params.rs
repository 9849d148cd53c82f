use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upper bound on motion-blur taps. Each tap is a scene read per output pixel.
pub const MAX_MOTION_BLUR_SAMPLES: u32 = 64;

/// Upper bound on the selective blur strength. The spiral reach at full mask is
/// `strength * 0.008` of the viewport.
pub const MAX_SELECTIVE_BLUR_STRENGTH: f32 = 50.0;

/// Kernel widths accepted by the field downsampler.
pub const KERNEL_WIDTHS: [u32; 4] = [1, 3, 5, 7];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("{name} must be within {} (got {value})", describe_bounds(.min, .max, .exclusive))]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
        /// Both bounds are excluded.
        exclusive: bool,
    },
    #[error("{name} must be greater than zero (got {value})")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must be a finite number")]
    NotFinite { name: &'static str },
    #[error("motion_blur_samples must be within 1..={max} (got {value})")]
    SampleCount { value: u32, max: u32 },
    #[error("blur kernel width must be one of 1, 3, 5 or 7 (got {0})")]
    KernelWidth(u32),
    #[error("unknown preset '{0}' (expected motion, fluid, lens, subtle or frosted)")]
    UnknownPreset(String),
    #[error("display size must be non-zero (got {width}x{height})")]
    DisplaySize { width: u32, height: u32 },
}

/// Where the velocity painter reads last frame's field from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSource {
    /// Seed from the blurred low-resolution field (dispersing trails).
    #[default]
    Blurred,
    /// Seed from the previous paint buffer at working resolution.
    Working,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelShape {
    /// Equal weights across the kernel.
    #[default]
    Box,
    /// Binomial weights (1-2-1 for a width of three).
    Tent,
}

/// Separable low-pass kernel used by the downsampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlurKernel {
    pub width: u32,
    #[serde(default)]
    pub shape: KernelShape,
}

impl Default for BlurKernel {
    fn default() -> Self {
        Self {
            width: 3,
            shape: KernelShape::Box,
        }
    }
}

impl BlurKernel {
    pub fn radius(&self) -> i32 {
        (self.width / 2) as i32
    }

    /// One-dimensional weights, normalised to sum to one. The 2D kernel is the
    /// outer product of this row with itself.
    pub fn weights(&self) -> Vec<f32> {
        let width = self.width.max(1) as usize;
        let raw: Vec<f32> = match self.shape {
            KernelShape::Box => vec![1.0; width],
            KernelShape::Tent => {
                let mut row = vec![1.0f32];
                for _ in 1..width {
                    let mut next = vec![1.0f32; row.len() + 1];
                    for index in 1..row.len() {
                        next[index] = row[index - 1] + row[index];
                    }
                    row = next;
                }
                row
            }
        };
        let total: f32 = raw.iter().sum();
        raw.into_iter().map(|weight| weight / total).collect()
    }

    fn validate(&self) -> Result<(), ParameterError> {
        if KERNEL_WIDTHS.contains(&self.width) {
            Ok(())
        } else {
            Err(ParameterError::KernelWidth(self.width))
        }
    }
}

/// Every tunable of the distortion pipeline. Read-only while a frame is in
/// flight; hosts replace the whole set between frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistortionParameters {
    pub decay_factor: f32,
    pub trail_radius: f32,
    pub splat_gain: f32,
    pub blur_extent: f32,
    pub motion_blur_samples: u32,
    pub chromatic_offset_scale: f32,
    pub magnitude_gain: f32,
    pub blur_kernel: BlurKernel,
    pub jitter_amplitude: f32,
    pub noise_seed: u32,
    pub feedback: FeedbackSource,
    pub diffusion: f32,
    pub aspect_correct: bool,
    /// Spiral blur strength of the post stage. Zero turns the blur off.
    pub selective_blur_strength: f32,
    /// Radius around the pointer the selective blur reaches.
    pub selective_blur_radius: f32,
    /// Colour-split the composed image where it departs from the scene.
    pub selective_chromatic: bool,
}

impl Default for DistortionParameters {
    fn default() -> Self {
        Self {
            decay_factor: 0.97,
            trail_radius: 0.2,
            splat_gain: 1.0,
            blur_extent: 0.06,
            motion_blur_samples: 16,
            chromatic_offset_scale: 0.01,
            magnitude_gain: 4.0,
            blur_kernel: BlurKernel::default(),
            jitter_amplitude: 0.002,
            noise_seed: 0,
            feedback: FeedbackSource::default(),
            diffusion: 0.0,
            aspect_correct: true,
            selective_blur_strength: 0.0,
            selective_blur_radius: 0.3,
            selective_chromatic: false,
        }
    }
}

impl DistortionParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_open_range("decay_factor", self.decay_factor, 0.0, 1.0)?;
        check_positive("trail_radius", self.trail_radius)?;
        check_range("trail_radius", self.trail_radius, 0.0, 2.0)?;
        check_range("splat_gain", self.splat_gain, 0.0, 20.0)?;
        check_range("blur_extent", self.blur_extent, 0.0, 1.0)?;
        if self.motion_blur_samples == 0 || self.motion_blur_samples > MAX_MOTION_BLUR_SAMPLES {
            return Err(ParameterError::SampleCount {
                value: self.motion_blur_samples,
                max: MAX_MOTION_BLUR_SAMPLES,
            });
        }
        check_range(
            "chromatic_offset_scale",
            self.chromatic_offset_scale,
            0.0,
            0.1,
        )?;
        check_range("magnitude_gain", self.magnitude_gain, 0.0, 100.0)?;
        self.blur_kernel.validate()?;
        check_range("jitter_amplitude", self.jitter_amplitude, 0.0, 0.05)?;
        check_range("diffusion", self.diffusion, 0.0, 1.0)?;
        check_range(
            "selective_blur_strength",
            self.selective_blur_strength,
            0.0,
            MAX_SELECTIVE_BLUR_STRENGTH,
        )?;
        check_positive("selective_blur_radius", self.selective_blur_radius)?;
        check_range("selective_blur_radius", self.selective_blur_radius, 0.0, 2.0)?;
        Ok(())
    }

    /// Whether the selective post stage runs after compositing.
    pub fn post_effects_enabled(&self) -> bool {
        self.selective_blur_strength > 0.0 || self.selective_chromatic
    }

    /// Number of frames a field at rest needs to fall below `fraction` of its peak.
    pub fn frames_to_decay(&self, fraction: f32) -> Option<u32> {
        if self.decay_factor <= 0.0 {
            return Some(1);
        }
        if self.decay_factor >= 1.0 || fraction <= 0.0 || fraction >= 1.0 {
            return None;
        }
        let frames = (fraction.ln() / self.decay_factor.ln()).ceil();
        Some(frames as u32)
    }
}

fn check_finite(name: &'static str, value: f32) -> Result<(), ParameterError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::NotFinite { name })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ParameterError> {
    check_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::NotPositive { name, value })
    }
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<(), ParameterError> {
    check_finite(name, value)?;
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name,
            value,
            min,
            max,
            exclusive: false,
        })
    }
}

fn check_open_range(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), ParameterError> {
    check_finite(name, value)?;
    if value > min && value < max {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name,
            value,
            min,
            max,
            exclusive: true,
        })
    }
}

fn describe_bounds(min: &f32, max: &f32, exclusive: &bool) -> String {
    if *exclusive {
        format!("({min}, {max}) exclusive")
    } else {
        format!("{min}..={max}")
    }
}

/// Partial parameter set layered over a preset (config file table or CLI flags).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterOverrides {
    pub decay_factor: Option<f32>,
    pub trail_radius: Option<f32>,
    pub splat_gain: Option<f32>,
    pub blur_extent: Option<f32>,
    pub motion_blur_samples: Option<u32>,
    pub chromatic_offset_scale: Option<f32>,
    pub magnitude_gain: Option<f32>,
    pub blur_kernel: Option<BlurKernel>,
    pub jitter_amplitude: Option<f32>,
    pub noise_seed: Option<u32>,
    pub feedback: Option<FeedbackSource>,
    pub diffusion: Option<f32>,
    pub aspect_correct: Option<bool>,
    pub selective_blur_strength: Option<f32>,
    pub selective_blur_radius: Option<f32>,
    pub selective_chromatic: Option<bool>,
}

impl ParameterOverrides {
    pub fn apply(&self, base: DistortionParameters) -> DistortionParameters {
        DistortionParameters {
            decay_factor: self.decay_factor.unwrap_or(base.decay_factor),
            trail_radius: self.trail_radius.unwrap_or(base.trail_radius),
            splat_gain: self.splat_gain.unwrap_or(base.splat_gain),
            blur_extent: self.blur_extent.unwrap_or(base.blur_extent),
            motion_blur_samples: self.motion_blur_samples.unwrap_or(base.motion_blur_samples),
            chromatic_offset_scale: self
                .chromatic_offset_scale
                .unwrap_or(base.chromatic_offset_scale),
            magnitude_gain: self.magnitude_gain.unwrap_or(base.magnitude_gain),
            blur_kernel: self.blur_kernel.unwrap_or(base.blur_kernel),
            jitter_amplitude: self.jitter_amplitude.unwrap_or(base.jitter_amplitude),
            noise_seed: self.noise_seed.unwrap_or(base.noise_seed),
            feedback: self.feedback.unwrap_or(base.feedback),
            diffusion: self.diffusion.unwrap_or(base.diffusion),
            aspect_correct: self.aspect_correct.unwrap_or(base.aspect_correct),
            selective_blur_strength: self
                .selective_blur_strength
                .unwrap_or(base.selective_blur_strength),
            selective_blur_radius: self
                .selective_blur_radius
                .unwrap_or(base.selective_blur_radius),
            selective_chromatic: self.selective_chromatic.unwrap_or(base.selective_chromatic),
        }
    }

    /// Field-wise merge where `other` wins.
    pub fn merge(&self, other: &ParameterOverrides) -> ParameterOverrides {
        ParameterOverrides {
            decay_factor: other.decay_factor.or(self.decay_factor),
            trail_radius: other.trail_radius.or(self.trail_radius),
            splat_gain: other.splat_gain.or(self.splat_gain),
            blur_extent: other.blur_extent.or(self.blur_extent),
            motion_blur_samples: other.motion_blur_samples.or(self.motion_blur_samples),
            chromatic_offset_scale: other.chromatic_offset_scale.or(self.chromatic_offset_scale),
            magnitude_gain: other.magnitude_gain.or(self.magnitude_gain),
            blur_kernel: other.blur_kernel.or(self.blur_kernel),
            jitter_amplitude: other.jitter_amplitude.or(self.jitter_amplitude),
            noise_seed: other.noise_seed.or(self.noise_seed),
            feedback: other.feedback.or(self.feedback),
            diffusion: other.diffusion.or(self.diffusion),
            aspect_correct: other.aspect_correct.or(self.aspect_correct),
            selective_blur_strength: other
                .selective_blur_strength
                .or(self.selective_blur_strength),
            selective_blur_radius: other.selective_blur_radius.or(self.selective_blur_radius),
            selective_chromatic: other.selective_chromatic.or(self.selective_chromatic),
        }
    }
}

/// Named parameter sets covering the distinct looks the effect ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Motion,
    Fluid,
    Lens,
    Subtle,
    /// Lens look plus the selective frost and colour split around the pointer.
    Frosted,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Motion,
        Preset::Fluid,
        Preset::Lens,
        Preset::Subtle,
        Preset::Frosted,
    ];

    pub fn parameters(self) -> DistortionParameters {
        let base = DistortionParameters::default();
        match self {
            Preset::Motion => base,
            Preset::Fluid => DistortionParameters {
                decay_factor: 0.98,
                trail_radius: 0.15,
                splat_gain: 5.0,
                diffusion: 0.5,
                blur_kernel: BlurKernel {
                    width: 3,
                    shape: KernelShape::Tent,
                },
                ..base
            },
            Preset::Lens => DistortionParameters {
                blur_extent: 0.12,
                chromatic_offset_scale: 0.025,
                magnitude_gain: 8.0,
                ..base
            },
            Preset::Subtle => DistortionParameters {
                motion_blur_samples: 8,
                blur_extent: 0.01,
                chromatic_offset_scale: 0.005,
                magnitude_gain: 2.5,
                ..base
            },
            Preset::Frosted => DistortionParameters {
                selective_blur_strength: 10.0,
                selective_blur_radius: 0.3,
                selective_chromatic: true,
                ..Preset::Lens.parameters()
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::Motion => "motion",
            Preset::Fluid => "fluid",
            Preset::Lens => "lens",
            Preset::Subtle => "subtle",
            Preset::Frosted => "frosted",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = ParameterError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "motion" | "default" => Ok(Preset::Motion),
            "fluid" | "liquid" => Ok(Preset::Fluid),
            "lens" => Ok(Preset::Lens),
            "subtle" => Ok(Preset::Subtle),
            "frosted" | "frost" => Ok(Preset::Frosted),
            _ => Err(ParameterError::UnknownPreset(raw.to_string())),
        }
    }
}
