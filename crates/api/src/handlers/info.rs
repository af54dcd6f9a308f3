use axum::extract::State;
use axum::Json;
use serde_json::{json, Map, Value};
use vidgen_core::estimation::estimate_total_secs;
use vidgen_core::generation::{
    DEFAULT_EMBEDDED_GUIDANCE_SCALE, DEFAULT_FLOW_SHIFT, DEFAULT_FRAME_COUNT, DEFAULT_FRAME_RATE,
    DEFAULT_GUIDANCE_SCALE, DEFAULT_HEIGHT, DEFAULT_STEP_COUNT, DEFAULT_WIDTH,
    DIMENSION_MULTIPLE, EMBEDDED_GUIDANCE_SCALE_RANGE, FLOW_SHIFT_RANGE, GUIDANCE_SCALE_RANGE,
    MAX_DIMENSION, MAX_FRAME_COUNT, MAX_FRAME_RATE, MAX_STEP_COUNT, MIN_DIMENSION,
    MIN_FRAME_COUNT, MIN_FRAME_RATE, MIN_STEP_COUNT,
};
use vidgen_core::preset::Preset;

use crate::state::AppState;

/// GET /api/info
///
/// Accepted parameter ranges, defaults, presets and the deployment's
/// worker and estimate settings.
pub async fn get_info(State(state): State<AppState>) -> Json<Value> {
    let presets: Map<String, Value> = Preset::ALL
        .iter()
        .map(|preset| {
            let spec = preset.frame_spec();
            (
                preset.name().to_string(),
                json!({
                    "width": spec.width,
                    "height": spec.height,
                    "video_length": spec.frame_count,
                    "fps": spec.frame_rate,
                }),
            )
        })
        .collect();

    let per_step = state.config.seconds_per_step;

    Json(json!({
        "engine": state.engine.name(),
        "model_loaded": state.engine.is_loaded(),
        "workers": state.dispatcher.config().workers,
        "engine_concurrency": state.dispatcher.config().effective_concurrency(),
        "parameters": {
            "width": {
                "min": MIN_DIMENSION,
                "max": MAX_DIMENSION,
                "multiple_of": DIMENSION_MULTIPLE,
                "default": DEFAULT_WIDTH,
            },
            "height": {
                "min": MIN_DIMENSION,
                "max": MAX_DIMENSION,
                "multiple_of": DIMENSION_MULTIPLE,
                "default": DEFAULT_HEIGHT,
            },
            "video_length": {
                "min": MIN_FRAME_COUNT,
                "max": MAX_FRAME_COUNT,
                "default": DEFAULT_FRAME_COUNT,
            },
            "fps": {
                "min": MIN_FRAME_RATE,
                "max": MAX_FRAME_RATE,
                "default": DEFAULT_FRAME_RATE,
            },
            "num_inference_steps": {
                "min": MIN_STEP_COUNT,
                "max": MAX_STEP_COUNT,
                "default": DEFAULT_STEP_COUNT,
            },
            "guidance_scale": {
                "min": GUIDANCE_SCALE_RANGE.0,
                "max": GUIDANCE_SCALE_RANGE.1,
                "default": DEFAULT_GUIDANCE_SCALE,
            },
            "flow_shift": {
                "min": FLOW_SHIFT_RANGE.0,
                "max": FLOW_SHIFT_RANGE.1,
                "default": DEFAULT_FLOW_SHIFT,
            },
            "embedded_guidance_scale": {
                "min": EMBEDDED_GUIDANCE_SCALE_RANGE.0,
                "max": EMBEDDED_GUIDANCE_SCALE_RANGE.1,
                "default": DEFAULT_EMBEDDED_GUIDANCE_SCALE,
            },
            "seed": { "default": null },
        },
        "presets": presets,
        "estimated_generation_time": {
            "seconds_per_step": per_step,
            "default_job_secs": estimate_total_secs(DEFAULT_STEP_COUNT, per_step),
            "max_job_secs": estimate_total_secs(MAX_STEP_COUNT as u32, per_step),
        },
    }))
}
