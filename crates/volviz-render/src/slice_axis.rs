//! View-dependent choice of the slicing axis.

use glam::Vec3;
use volviz_core::{Axis, GridTransform};

/// The axis to slice perpendicular to, and the layer drawing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisSelection {
    /// Grid axis the slices are perpendicular to.
    pub axis: Axis,
    /// When true, layers are drawn from the highest index down.
    pub reverse: bool,
}

impl AxisSelection {
    /// Layer indices in drawing order for the range `lo..=hi`, taking every
    /// `stride`-th layer.
    pub fn layers(self, lo: usize, hi: usize, stride: usize) -> impl Iterator<Item = usize> {
        let stride = stride.max(1);
        let count = layer_count(lo, hi, stride);
        let reverse = self.reverse;
        (0..count).map(move |n| if reverse { hi - n * stride } else { lo + n * stride })
    }
}

/// Number of layers in `lo..=hi` visited at `stride`.
#[must_use]
pub fn layer_count(lo: usize, hi: usize, stride: usize) -> usize {
    hi.saturating_sub(lo) / stride.max(1) + 1
}

/// Picks the grid axis most aligned with `view_dir`.
///
/// Each axis is tested with non-strict comparisons against the other two, in
/// the order I, J, K, and a later match overwrites an earlier one. Exact ties
/// therefore go to the later axis. `reverse` is set when the signed dot
/// product with the chosen axis is positive, i.e. the camera looks along the
/// increasing index direction.
///
/// Returns `None` for a zero or non-finite view direction, or a transform
/// whose basis is entirely degenerate.
#[must_use]
pub fn select_axis(view_dir: Vec3, transform: &GridTransform) -> Option<AxisSelection> {
    let dir = view_dir.try_normalize()?;
    let basis = transform.normalized_basis();
    if basis.iter().all(|b| *b == Vec3::ZERO) {
        return None;
    }

    let dots = basis.map(|b| dir.dot(b));
    let [dx, dy, dz] = dots.map(f32::abs);

    let mut axis = None;
    if dx >= dy && dx >= dz {
        axis = Some(Axis::I);
    }
    if dy >= dx && dy >= dz {
        axis = Some(Axis::J);
    }
    if dz >= dx && dz >= dy {
        axis = Some(Axis::K);
    }

    let axis = axis?;
    Some(AxisSelection {
        axis,
        reverse: dots[axis.index()] > 0.0,
    })
}
