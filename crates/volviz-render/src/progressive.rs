//! Progressive level of detail for slice rendering.
//!
//! While the camera moves only every `stride`-th layer is drawn. Once the
//! view has been still for a while the stride is halved step by step until
//! every layer is drawn again. Skipped layers are compensated by raising the
//! per-slice opacity so the accumulated opacity stays roughly constant.

use volviz_core::{CameraPose, ProgressiveOptions};

/// Opacity of one slice standing in for `layers_per_slice` slices of opacity `alpha`.
///
/// `n` layers of opacity `a` composited over each other have opacity
/// `1 - (1 - a)^n`. For two layers that is `2a - a^2`, so a stride of `2^n`
/// over a full stack is that step applied `n` times. Ratios of 1 or less
/// return `alpha` unchanged.
#[must_use]
pub fn compensated_alpha(alpha: f32, layers_per_slice: f32) -> f32 {
    let a = alpha.clamp(0.0, 1.0);
    if layers_per_slice.is_nan() || layers_per_slice <= 1.0 {
        return a;
    }
    1.0 - (1.0 - a).powf(layers_per_slice)
}

/// Largest power of two not above `n` (and at least 1).
fn floor_power_of_two(n: u32) -> u32 {
    1 << (31 - n.max(1).leading_zeros())
}

/// Stride and stillness state for one volume.
#[derive(Debug, Clone, Default)]
pub struct ProgressiveQuality {
    stride: u32,
    stillness: u32,
    last_pose: Option<CameraPose>,
}

impl ProgressiveQuality {
    /// Creates a controller that has not seen a frame yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current layer stride (1 draws every layer).
    #[must_use]
    pub fn stride(&self) -> u32 {
        self.stride.max(1)
    }

    /// Consecutive frames without camera movement.
    #[must_use]
    pub fn stillness(&self) -> u32 {
        self.stillness
    }

    /// Advances one frame and returns the stride to draw with.
    ///
    /// The first frame and forced frames start at the coarsest stride. A pose
    /// of `None` counts as no movement.
    pub fn update(
        &mut self,
        pose: Option<CameraPose>,
        force: bool,
        options: &ProgressiveOptions,
    ) -> u32 {
        if !options.enabled {
            self.stride = 1;
            self.stillness = 0;
            self.last_pose = pose;
            return 1;
        }

        let max_stride = floor_power_of_two(options.max_stride);
        let initial = self.stride == 0;

        if force || initial {
            self.stride = max_stride;
            self.stillness = 0;
        } else {
            let moved = match (self.last_pose, pose) {
                (Some(prev), Some(now)) => !prev.approx_eq(&now, options.camera_epsilon),
                (None, Some(_)) => true,
                (_, None) => false,
            };
            if moved {
                self.stride = self.stride.saturating_mul(2).min(max_stride);
                self.stillness = 0;
            } else {
                self.stillness += 1;
                if self.stillness > options.stillness_threshold {
                    self.stride = (self.stride / 2).max(1);
                    self.stillness = 0;
                    log::trace!("camera still, stride refined to {}", self.stride);
                }
            }
        }

        if pose.is_some() {
            self.last_pose = pose;
        }
        self.stride
    }

    /// Multiplier for slice opacity when `drawn` quads stand in for `layers`
    /// layers.
    ///
    /// Uses the real layer ratio rather than the stride, so a stack whose
    /// depth is not a multiple of the stride is not over-compensated.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn alpha_scale(&self, options: &ProgressiveOptions, layers: usize, drawn: usize) -> f32 {
        let reference = options.reference_alpha;
        if !options.enabled || reference <= 0.0 || drawn == 0 || drawn >= layers {
            return 1.0;
        }
        compensated_alpha(reference, layers as f32 / drawn as f32) / reference
    }

    /// Forgets all state; the next frame starts coarse again.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
