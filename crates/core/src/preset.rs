//! Named frame presets for common delivery formats.
//!
//! Presets are a closed table. Resolving one yields a fully specified
//! [`FrameSpec`]; when a request names a preset, the preset's values replace
//! any explicit width/height/frame count/frame rate in the same request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/* --------------------------------------------------------------------------
   Frame spec
   -------------------------------------------------------------------------- */

/// The frame geometry and timing a preset pins down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub frame_rate: u32,
}

/* --------------------------------------------------------------------------
   Preset table
   -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preset {
    #[serde(rename = "portrait_60s")]
    Portrait60s,
    #[serde(rename = "portrait_30s")]
    Portrait30s,
    #[serde(rename = "landscape_60s")]
    Landscape60s,
    #[serde(rename = "landscape_30s")]
    Landscape30s,
}

impl Preset {
    /// Every preset, in the order they are advertised by `/api/info`.
    pub const ALL: [Preset; 4] = [
        Preset::Portrait60s,
        Preset::Portrait30s,
        Preset::Landscape60s,
        Preset::Landscape30s,
    ];

    /// Wire name of the preset.
    pub fn name(self) -> &'static str {
        match self {
            Preset::Portrait60s => "portrait_60s",
            Preset::Portrait30s => "portrait_30s",
            Preset::Landscape60s => "landscape_60s",
            Preset::Landscape30s => "landscape_30s",
        }
    }

    /// Concrete frame parameters for this preset.
    pub fn frame_spec(self) -> FrameSpec {
        match self {
            Preset::Portrait60s => FrameSpec {
                width: 544,
                height: 960,
                frame_count: 129,
                frame_rate: 24,
            },
            Preset::Portrait30s => FrameSpec {
                width: 544,
                height: 960,
                frame_count: 65,
                frame_rate: 24,
            },
            Preset::Landscape60s => FrameSpec {
                width: 960,
                height: 544,
                frame_count: 129,
                frame_rate: 24,
            },
            Preset::Landscape30s => FrameSpec {
                width: 960,
                height: 544,
                frame_count: 65,
                frame_rate: 24,
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
                CoreError::Validation(format!(
                    "Unknown preset '{s}'. Valid presets: {}",
                    valid.join(", ")
                ))
            })
    }
}

/// Resolve a preset name to its frame parameters.
pub fn resolve(name: &str) -> Result<FrameSpec, CoreError> {
    name.parse::<Preset>().map(Preset::frame_spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portrait_60s_matches_table() {
        let spec = resolve("portrait_60s").unwrap();
        assert_eq!(
            spec,
            FrameSpec {
                width: 544,
                height: 960,
                frame_count: 129,
                frame_rate: 24,
            }
        );
    }

    #[test]
    fn landscape_presets_swap_orientation() {
        let portrait = Preset::Portrait30s.frame_spec();
        let landscape = Preset::Landscape30s.frame_spec();
        assert_eq!(portrait.width, landscape.height);
        assert_eq!(portrait.height, landscape.width);
        assert_eq!(landscape.frame_count, 65);
    }

    #[test]
    fn unknown_preset_rejected() {
        let err = resolve("square_10s").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Unknown preset 'square_10s'"));
        assert!(msg.contains("portrait_60s"));
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Preset::Landscape60s).unwrap();
        assert_eq!(json, "\"landscape_60s\"");
    }
}
