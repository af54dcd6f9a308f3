//! Generation request shape, defaults and parameter validation.
//!
//! [`GenerateRequest`] is the loose wire shape clients send; [`GenerateRequest::resolve`]
//! turns it into a fully specified, validated [`GenerationParams`] or rejects it.
//! Resolution order is defaults, then explicit fields, then the preset (which
//! overwrites frame geometry and timing wholesale).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::preset::{FrameSpec, Preset};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const DEFAULT_FRAME_COUNT: u32 = 61;
pub const DEFAULT_FRAME_RATE: u32 = 15;
pub const DEFAULT_STEP_COUNT: u32 = 30;
pub const DEFAULT_GUIDANCE_SCALE: f64 = 1.0;
pub const DEFAULT_FLOW_SHIFT: f64 = 7.0;
pub const DEFAULT_EMBEDDED_GUIDANCE_SCALE: f64 = 6.0;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

pub const MIN_DIMENSION: i64 = 256;
pub const MAX_DIMENSION: i64 = 1280;

/// Width and height must be multiples of this (engine latent constraint).
pub const DIMENSION_MULTIPLE: i64 = 16;

pub const MIN_FRAME_COUNT: i64 = 13;
pub const MAX_FRAME_COUNT: i64 = 129;

pub const MIN_FRAME_RATE: i64 = 8;
pub const MAX_FRAME_RATE: i64 = 30;

pub const MIN_STEP_COUNT: i64 = 10;
pub const MAX_STEP_COUNT: i64 = 50;

pub const GUIDANCE_SCALE_RANGE: (f64, f64) = (1.0, 20.0);
pub const FLOW_SHIFT_RANGE: (f64, f64) = (0.0, 10.0);
pub const EMBEDDED_GUIDANCE_SCALE_RANGE: (f64, f64) = (1.0, 20.0);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Body of `POST /api/generate`.
///
/// Integers are signed on the wire so out-of-range values (including
/// negatives) surface as validation errors rather than decode failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_inference_steps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_guidance_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

/// Fully resolved engine parameters. Immutable once attached to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "video_length")]
    pub frame_count: u32,
    #[serde(rename = "fps")]
    pub frame_rate: u32,
    pub seed: Option<i64>,
    #[serde(rename = "num_inference_steps")]
    pub step_count: u32,
    pub guidance_scale: f64,
    pub flow_shift: f64,
    pub embedded_guidance_scale: f64,
}

impl GenerateRequest {
    /// Replace frame geometry/timing with the named preset's values.
    ///
    /// Used by the webhook gateway to expand its preset shorthand before
    /// forwarding. The preset name is consumed so the upstream request
    /// carries only explicit values.
    pub fn expand_preset(mut self) -> Result<Self, CoreError> {
        if let Some(name) = self.preset.take() {
            let spec = name.parse::<Preset>()?.frame_spec();
            self.width = Some(i64::from(spec.width));
            self.height = Some(i64::from(spec.height));
            self.video_length = Some(i64::from(spec.frame_count));
            self.fps = Some(i64::from(spec.frame_rate));
        }
        Ok(self)
    }

    /// Apply defaults and preset, then validate every field.
    pub fn resolve(&self) -> Result<GenerationParams, CoreError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(CoreError::Validation(
                "prompt must not be empty".to_string(),
            ));
        }

        let preset = self
            .preset
            .as_deref()
            .map(str::parse::<Preset>)
            .transpose()?;

        let (width, height, frame_count, frame_rate) = match preset {
            Some(p) => {
                let FrameSpec {
                    width,
                    height,
                    frame_count,
                    frame_rate,
                } = p.frame_spec();
                (
                    i64::from(width),
                    i64::from(height),
                    i64::from(frame_count),
                    i64::from(frame_rate),
                )
            }
            None => (
                self.width.unwrap_or(i64::from(DEFAULT_WIDTH)),
                self.height.unwrap_or(i64::from(DEFAULT_HEIGHT)),
                self.video_length.unwrap_or(i64::from(DEFAULT_FRAME_COUNT)),
                self.fps.unwrap_or(i64::from(DEFAULT_FRAME_RATE)),
            ),
        };
        let step_count = self
            .num_inference_steps
            .unwrap_or(i64::from(DEFAULT_STEP_COUNT));
        let guidance_scale = self.guidance_scale.unwrap_or(DEFAULT_GUIDANCE_SCALE);
        let flow_shift = self.flow_shift.unwrap_or(DEFAULT_FLOW_SHIFT);
        let embedded_guidance_scale = self
            .embedded_guidance_scale
            .unwrap_or(DEFAULT_EMBEDDED_GUIDANCE_SCALE);

        Ok(GenerationParams {
            prompt: prompt.to_string(),
            width: validate_dimension(width, "width")?,
            height: validate_dimension(height, "height")?,
            frame_count: validate_int_range(
                frame_count,
                MIN_FRAME_COUNT,
                MAX_FRAME_COUNT,
                "video_length",
            )?,
            frame_rate: validate_int_range(frame_rate, MIN_FRAME_RATE, MAX_FRAME_RATE, "fps")?,
            seed: self.seed,
            step_count: validate_int_range(
                step_count,
                MIN_STEP_COUNT,
                MAX_STEP_COUNT,
                "num_inference_steps",
            )?,
            guidance_scale: validate_float_range(
                guidance_scale,
                GUIDANCE_SCALE_RANGE,
                "guidance_scale",
            )?,
            flow_shift: validate_float_range(flow_shift, FLOW_SHIFT_RANGE, "flow_shift")?,
            embedded_guidance_scale: validate_float_range(
                embedded_guidance_scale,
                EMBEDDED_GUIDANCE_SCALE_RANGE,
                "embedded_guidance_scale",
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate an integer field against an inclusive range.
pub fn validate_int_range(value: i64, min: i64, max: i64, name: &str) -> Result<u32, CoreError> {
    if !(min..=max).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }
    u32::try_from(value)
        .map_err(|_| CoreError::Validation(format!("{name} is out of range: {value}")))
}

/// Validate a frame dimension: in range and a multiple of [`DIMENSION_MULTIPLE`].
pub fn validate_dimension(value: i64, name: &str) -> Result<u32, CoreError> {
    let value = validate_int_range(value, MIN_DIMENSION, MAX_DIMENSION, name)?;
    if i64::from(value) % DIMENSION_MULTIPLE != 0 {
        return Err(CoreError::Validation(format!(
            "{name} must be divisible by {DIMENSION_MULTIPLE}, got {value}"
        )));
    }
    Ok(value)
}

/// Validate a finite float against an inclusive `(min, max)` range.
pub fn validate_float_range(value: f64, range: (f64, f64), name: &str) -> Result<f64, CoreError> {
    let (min, max) = range;
    if !value.is_finite() || value < min || value > max {
        return Err(CoreError::Validation(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(value)
}
