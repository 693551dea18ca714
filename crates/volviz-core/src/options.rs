//! Configuration options for volviz.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How per-vertex isosurface normals are produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum NormalMode {
    /// Area-weighted average over triangles sharing a vertex position.
    #[default]
    Smooth,
    /// Face normal replicated to all three vertices.
    Flat,
}

/// Settings for the progressive slice-stride controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressiveOptions {
    /// Whether stride adaptation is active. When off every layer is drawn.
    pub enabled: bool,

    /// Coarsest stride (power of two).
    pub max_stride: u32,

    /// Number of still frames after which the stride is halved.
    pub stillness_threshold: u32,

    /// Per-component tolerance when comparing camera poses.
    pub camera_epsilon: f32,

    /// Representative per-slice opacity used to derive the alpha compensation.
    pub reference_alpha: f32,
}

impl Default for ProgressiveOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_stride: 8,
            stillness_threshold: 10,
            camera_epsilon: 1e-4,
            reference_alpha: 0.05,
        }
    }
}

/// Global configuration options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizOptions {
    /// Normal reconstruction for isosurfaces.
    pub normal_mode: NormalMode,

    /// Per-component distance under which two isosurface vertices are the same point.
    pub normal_epsilon: f32,

    /// Per-axis scale applied to edge vectors when weighting normals, to correct
    /// for non-cubic grid spacing or viewports.
    pub normal_axis_scale: Option<[f32; 3]>,

    /// Per-axis extent scale used by the volume intensity correction.
    pub axis_scale_override: Option<[f32; 3]>,

    /// Progressive level-of-detail settings for volume rendering.
    pub progressive: ProgressiveOptions,

    /// Largest triangle count one isosurface may hold. Extraction beyond it
    /// fails with `ResourceExhausted` and the previous surface is kept.
    pub max_triangles: Option<usize>,
}

impl Default for VizOptions {
    fn default() -> Self {
        Self {
            normal_mode: NormalMode::Smooth,
            normal_epsilon: 1e-5,
            normal_axis_scale: None,
            axis_scale_override: None,
            progressive: ProgressiveOptions::default(),
            max_triangles: None,
        }
    }
}

impl VizOptions {
    /// Parses options from JSON. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the options to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
