//! Transfer functions: scalar value to RGBA.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use crate::backend::ColormapLookup;
use crate::grid::Axis;

/// User opacity callback evaluated at the raw scalar value.
pub type AlphaFn = Arc<dyn Fn(f32) -> f32 + Send + Sync>;

/// User opacity callback evaluated at the raw scalar value and its index-space gradient.
pub type GradientAlphaFn = Arc<dyn Fn(f32, Vec3) -> f32 + Send + Sync>;

/// Where texel opacity comes from.
#[derive(Clone)]
pub enum AlphaSource {
    /// Linear ramp from `min` at `datamin` to `max` at `datamax`; zero below `datamin`.
    Ramp { min: f32, max: f32 },
    /// Caller-supplied function of the raw value.
    Function(AlphaFn),
    /// Caller-supplied function of the raw value and local gradient.
    GradientFunction(GradientAlphaFn),
}

impl fmt::Debug for AlphaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlphaSource::Ramp { min, max } => f
                .debug_struct("Ramp")
                .field("min", min)
                .field("max", max)
                .finish(),
            AlphaSource::Function(_) => f.write_str("Function(..)"),
            AlphaSource::GradientFunction(_) => f.write_str("GradientFunction(..)"),
        }
    }
}

/// Maps scalar values to colour (through an indexed colour table) and opacity.
#[derive(Debug, Clone)]
pub struct TransferFunction {
    /// Value mapped to the first colour index.
    pub data_min: f32,
    /// Value mapped to the last colour index.
    pub data_max: f32,
    /// Opacity source.
    pub alpha: AlphaSource,
}

impl TransferFunction {
    /// Ramp opacity between `alpha_min` and `alpha_max` over the data range.
    #[must_use]
    pub fn ramp(data_min: f32, data_max: f32, alpha_min: f32, alpha_max: f32) -> Self {
        Self {
            data_min,
            data_max,
            alpha: AlphaSource::Ramp {
                min: alpha_min,
                max: alpha_max,
            },
        }
    }

    /// Opacity from a caller-supplied function of the raw value.
    pub fn with_alpha_fn(
        data_min: f32,
        data_max: f32,
        alpha: impl Fn(f32) -> f32 + Send + Sync + 'static,
    ) -> Self {
        Self {
            data_min,
            data_max,
            alpha: AlphaSource::Function(Arc::new(alpha)),
        }
    }

    /// Opacity from a caller-supplied function of the raw value and gradient.
    pub fn with_gradient_alpha_fn(
        data_min: f32,
        data_max: f32,
        alpha: impl Fn(f32, Vec3) -> f32 + Send + Sync + 'static,
    ) -> Self {
        Self {
            data_min,
            data_max,
            alpha: AlphaSource::GradientFunction(Arc::new(alpha)),
        }
    }

    /// Returns true if opacity depends on the local gradient.
    #[must_use]
    pub fn needs_gradient(&self) -> bool {
        matches!(self.alpha, AlphaSource::GradientFunction(_))
    }

    /// Normalizes `value` into `[0, 1]` over the data range.
    ///
    /// A degenerate range maps everything to 0.
    #[must_use]
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.data_max - self.data_min;
        if span == 0.0 || !span.is_finite() {
            return 0.0;
        }
        let t = (value - self.data_min) / span;
        if t.is_nan() {
            0.0
        } else {
            t.clamp(0.0, 1.0)
        }
    }

    /// Colour index for a normalized value within the inclusive range `(c1, c2)`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn color_index(t: f32, (c1, c2): (u32, u32)) -> u32 {
        let span = c2.saturating_sub(c1);
        c1 + (t * span as f32).round() as u32
    }

    /// RGB colour of a raw value.
    pub fn color(&self, value: f32, colormap: &dyn ColormapLookup) -> Vec3 {
        let t = self.normalize(value);
        colormap.color(Self::color_index(t, colormap.color_index_range()))
    }

    /// Opacity of a raw value, scaled by `intensity` and clamped to `[0, 1]`.
    #[must_use]
    pub fn alpha(&self, value: f32, gradient: Vec3, intensity: f32) -> f32 {
        let a = match &self.alpha {
            AlphaSource::Ramp { min, max } => {
                if value < self.data_min {
                    0.0
                } else {
                    min + self.normalize(value) * (max - min)
                }
            }
            AlphaSource::Function(f) => f(value),
            AlphaSource::GradientFunction(f) => f(value, gradient),
        };
        let a = a * intensity;
        if a.is_nan() {
            0.0
        } else {
            a.clamp(0.0, 1.0)
        }
    }

    /// Packed RGBA8 texel for a raw value.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rgba(
        &self,
        value: f32,
        gradient: Vec3,
        intensity: f32,
        colormap: &dyn ColormapLookup,
    ) -> [u8; 4] {
        let rgb = self.color(value, colormap).clamp(Vec3::ZERO, Vec3::ONE);
        let a = self.alpha(value, gradient, intensity);
        let to_u8 = |c: f32| (c * 255.0).round() as u8;
        [to_u8(rgb.x), to_u8(rgb.y), to_u8(rgb.z), to_u8(a)]
    }
}

/// Opacity correction for non-cubic volumes viewed along `axis`.
///
/// Returns 1.0 when all (optionally scaled) extents agree, otherwise the ratio
/// of the smallest extent to the extent along the viewed axis, so that thin
/// stacks are not rendered more opaque than deep ones.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn intensity_factor(extents: [usize; 3], axis: Axis, scale: Option<[f32; 3]>) -> f32 {
    let scale = scale.unwrap_or([1.0; 3]);
    let e = [0, 1, 2].map(|a| extents[a] as f32 * scale[a]);
    if e[0] == e[1] && e[1] == e[2] {
        return 1.0;
    }
    let along = e[axis.index()];
    if along <= 0.0 {
        return 1.0;
    }
    e[0].min(e[1]).min(e[2]) / along
}
