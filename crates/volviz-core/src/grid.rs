//! Read-only scalar grids.
//!
//! A [`ScalarGrid`] is a shared view over a caller-owned 3-D array of floats.
//! Values are stored with the last index varying fastest: node `(i, j, k)`
//! lives at `(i * bdim + j) * cdim + k`. Cloning a grid clones the view, never
//! the samples.

use std::sync::Arc;

use glam::Vec3;

use crate::error::{Result, VizError};
use crate::transform::GridTransform;

/// One of the three grid axes.
///
/// Axes are numbered 1, 2 and 3 in user-facing APIs; [`Axis::index`] gives the
/// zero-based position used for array access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// First grid index (`i`, extent `adim`).
    I,
    /// Second grid index (`j`, extent `bdim`).
    J,
    /// Third grid index (`k`, extent `cdim`).
    K,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::I, Axis::J, Axis::K];

    /// Zero-based index of this axis.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Axis::I => 0,
            Axis::J => 1,
            Axis::K => 2,
        }
    }

    /// One-based axis number (1, 2 or 3).
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Axis::I => 1,
            Axis::J => 2,
            Axis::K => 3,
        }
    }

    /// Converts from a one-based axis number. Returns `None` for anything but 1..=3.
    #[must_use]
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Axis::I),
            2 => Some(Axis::J),
            3 => Some(Axis::K),
            _ => None,
        }
    }

    /// The two remaining axes, in index order.
    #[must_use]
    pub fn others(self) -> (Axis, Axis) {
        match self {
            Axis::I => (Axis::J, Axis::K),
            Axis::J => (Axis::I, Axis::K),
            Axis::K => (Axis::I, Axis::J),
        }
    }
}

/// Inclusive index bounds selecting the active sub-volume of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridRange {
    /// Lower bounds `(a1, b1, c1)`.
    pub lo: [usize; 3],
    /// Upper bounds `(a2, b2, c2)`, inclusive.
    pub hi: [usize; 3],
}

impl GridRange {
    /// Creates a range from inclusive lower and upper bounds.
    #[must_use]
    pub fn new(lo: [usize; 3], hi: [usize; 3]) -> Self {
        Self { lo, hi }
    }

    /// The range covering every node of a grid with the given dimensions.
    ///
    /// Dimensions must be non-zero.
    #[must_use]
    pub fn full(dims: [usize; 3]) -> Self {
        Self::new([0; 3], dims.map(|d| d.saturating_sub(1)))
    }

    /// Number of nodes along `axis`.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> usize {
        let a = axis.index();
        self.hi[a] + 1 - self.lo[a]
    }

    /// Number of nodes along each axis.
    #[must_use]
    pub fn extents(&self) -> [usize; 3] {
        Axis::ALL.map(|axis| self.extent(axis))
    }

    fn validate(&self, dims: [usize; 3]) -> Result<()> {
        for axis in Axis::ALL {
            let a = axis.index();
            if self.lo[a] > self.hi[a] || self.hi[a] >= dims[a] {
                return Err(VizError::InvalidArgument(format!(
                    "range {}..={} on axis {} does not fit dimension {}",
                    self.lo[a],
                    self.hi[a],
                    axis.number(),
                    dims[a]
                )));
            }
        }
        Ok(())
    }
}

/// A shared, read-only 3-D scalar field with an active sub-range and an
/// index-to-world transform.
#[derive(Debug, Clone)]
pub struct ScalarGrid {
    values: Arc<[f32]>,
    dims: [usize; 3],
    range: GridRange,
    transform: GridTransform,
}

impl ScalarGrid {
    /// Creates a grid over `values` with dimensions `[adim, bdim, cdim]`.
    ///
    /// The active range covers the whole grid and the transform is the identity.
    pub fn new(values: impl Into<Arc<[f32]>>, dims: [usize; 3]) -> Result<Self> {
        let values = values.into();
        let expected = Self::node_count(dims)?;
        if values.len() != expected {
            return Err(VizError::SizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            values,
            dims,
            range: GridRange::full(dims),
            transform: GridTransform::IDENTITY,
        })
    }

    /// Number of nodes for `dims`; rejects zero and overflowing dimensions.
    fn node_count(dims: [usize; 3]) -> Result<usize> {
        if dims.iter().any(|&d| d == 0) {
            return Err(VizError::InvalidArgument(format!(
                "grid dimensions must be non-zero, got {dims:?}"
            )));
        }
        dims.iter()
            .try_fold(1_usize, |n, &d| n.checked_mul(d))
            .ok_or_else(|| {
                VizError::InvalidArgument(format!("grid dimensions {dims:?} overflow usize"))
            })
    }

    /// Samples `f(i, j, k)` at every node of a grid with the given dimensions.
    pub fn from_fn(
        dims: [usize; 3],
        mut f: impl FnMut(usize, usize, usize) -> f32,
    ) -> Result<Self> {
        let mut values = Vec::new();
        values.try_reserve_exact(Self::node_count(dims)?)?;
        for i in 0..dims[0] {
            for j in 0..dims[1] {
                for k in 0..dims[2] {
                    values.push(f(i, j, k));
                }
            }
        }
        Self::new(values, dims)
    }

    /// Restricts the grid to a sub-range.
    pub fn with_range(mut self, range: GridRange) -> Result<Self> {
        range.validate(self.dims)?;
        self.range = range;
        Ok(self)
    }

    /// Sets the index-to-world transform.
    #[must_use]
    pub fn with_transform(mut self, transform: GridTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Grid dimensions `[adim, bdim, cdim]`.
    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// The active sub-range.
    #[must_use]
    pub fn range(&self) -> GridRange {
        self.range
    }

    /// The index-to-world transform.
    #[must_use]
    pub fn transform(&self) -> &GridTransform {
        &self.transform
    }

    /// Number of active nodes along `axis`.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> usize {
        self.range.extent(axis)
    }

    /// All samples in storage order.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns true when both grids view the same sample storage.
    #[must_use]
    pub fn shares_values(&self, other: &ScalarGrid) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    /// Value at node `(i, j, k)`.
    ///
    /// # Panics
    /// Panics if the index lies outside the grid dimensions.
    #[inline]
    #[must_use]
    pub fn value(&self, i: usize, j: usize, k: usize) -> f32 {
        self.values[(i * self.dims[1] + j) * self.dims[2] + k]
    }

    /// Value at a node addressed by an `[i, j, k]` array.
    #[inline]
    #[must_use]
    pub fn value_at(&self, idx: [usize; 3]) -> f32 {
        self.value(idx[0], idx[1], idx[2])
    }

    /// Gradient in index space at node `(i, j, k)`.
    ///
    /// Central differences in the interior, one-sided differences on the grid
    /// border, zero along axes with a single node.
    #[must_use]
    pub fn gradient(&self, i: usize, j: usize, k: usize) -> Vec3 {
        let idx = [i, j, k];
        let mut g = [0.0_f32; 3];
        for axis in Axis::ALL {
            let a = axis.index();
            if self.dims[a] < 2 {
                continue;
            }
            let lo = idx[a].saturating_sub(1);
            let hi = (idx[a] + 1).min(self.dims[a] - 1);
            let mut lo_idx = idx;
            let mut hi_idx = idx;
            lo_idx[a] = lo;
            hi_idx[a] = hi;
            #[allow(clippy::cast_precision_loss)]
            let span = (hi - lo) as f32;
            g[a] = (self.value_at(hi_idx) - self.value_at(lo_idx)) / span;
        }
        Vec3::from_array(g)
    }

    /// Minimum and maximum finite value over the active range.
    ///
    /// Returns `(0.0, 1.0)` when the range holds no finite value.
    #[must_use]
    pub fn data_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let r = self.range;
        for i in r.lo[0]..=r.hi[0] {
            for j in r.lo[1]..=r.hi[1] {
                for k in r.lo[2]..=r.hi[2] {
                    let v = self.value(i, j, k);
                    if v.is_finite() {
                        min = min.min(v);
                        max = max.max(v);
                    }
                }
            }
        }
        if min > max {
            (0.0, 1.0)
        } else {
            (min, max)
        }
    }

    /// World position of a (possibly fractional) grid index.
    #[must_use]
    pub fn world_position(&self, p: Vec3) -> Vec3 {
        self.transform.apply(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn ramp() -> ScalarGrid {
        ScalarGrid::from_fn([3, 4, 5], |i, j, k| (i * 100 + j * 10 + k) as f32).unwrap()
    }

    #[test]
    fn test_value_layout() {
        let grid = ramp();
        assert_eq!(grid.value(0, 0, 0), 0.0);
        assert_eq!(grid.value(2, 3, 4), 234.0);
        assert_eq!(grid.value(1, 2, 3), 123.0);
        assert_eq!(grid.values()[(4 + 2) * 5 + 3], 123.0);
    }

    #[test]
    fn test_size_mismatch() {
        let err = ScalarGrid::new(vec![0.0; 10], [2, 2, 2]).unwrap_err();
        assert!(matches!(err, VizError::SizeMismatch { expected: 8, actual: 10 }));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(ScalarGrid::new(Vec::<f32>::new(), [0, 2, 2]).is_err());
    }

    #[test]
    fn test_overflowing_dimensions_rejected() {
        let err = ScalarGrid::new(Vec::<f32>::new(), [usize::MAX, 2, 1]).unwrap_err();
        assert!(matches!(err, VizError::InvalidArgument(_)));
        let err = ScalarGrid::from_fn([usize::MAX, 2, 1], |_, _, _| 0.0).unwrap_err();
        assert!(matches!(err, VizError::InvalidArgument(_)));
    }

    #[test]
    fn test_range_validation() {
        let grid = ramp();
        assert!(grid.clone().with_range(GridRange::new([0, 1, 1], [2, 3, 4])).is_ok());
        assert!(grid.clone().with_range(GridRange::new([0, 0, 0], [3, 3, 4])).is_err());
        assert!(grid.with_range(GridRange::new([2, 0, 0], [1, 3, 4])).is_err());
    }

    #[test]
    fn test_extents() {
        let grid = ramp().with_range(GridRange::new([1, 0, 2], [2, 3, 4])).unwrap();
        assert_eq!(grid.extent(Axis::I), 2);
        assert_eq!(grid.extent(Axis::J), 4);
        assert_eq!(grid.extent(Axis::K), 3);
    }

    #[test]
    fn test_gradient() {
        let grid = ramp();
        assert_eq!(grid.gradient(1, 1, 1), Vec3::new(100.0, 10.0, 1.0));
        // One-sided on the border
        assert_eq!(grid.gradient(0, 0, 0), Vec3::new(100.0, 10.0, 1.0));
    }

    #[test]
    fn test_data_range_uses_active_range() {
        let grid = ramp().with_range(GridRange::new([1, 1, 1], [1, 2, 3])).unwrap();
        assert_eq!(grid.data_range(), (111.0, 123.0));
    }

    #[test]
    fn test_clone_shares_values() {
        let grid = ramp();
        let view = grid.clone().with_range(GridRange::new([0, 0, 0], [1, 1, 1])).unwrap();
        assert!(grid.shares_values(&view));
        assert!(!grid.shares_values(&ramp()));
    }

    #[test]
    fn test_axis_numbers() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_number(axis.number()), Some(axis));
        }
        assert_eq!(Axis::from_number(0), None);
        assert_eq!(Axis::J.others(), (Axis::I, Axis::K));
    }
}
