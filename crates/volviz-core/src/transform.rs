//! Affine mapping from grid indices to world space.
//!
//! A [`GridTransform`] holds the 12 coefficients of an affine map in the
//! layout used by scientific plotting packages:
//!
//! ```text
//! x = tr[0] + tr[1]*i + tr[2]*j  + tr[3]*k
//! y = tr[4] + tr[5]*i + tr[6]*j  + tr[7]*k
//! z = tr[8] + tr[9]*i + tr[10]*j + tr[11]*k
//! ```

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::grid::Axis;

/// 12-coefficient affine transform from `(i, j, k)` to `(x, y, z)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridTransform {
    tr: [f32; 12],
}

impl GridTransform {
    /// The identity mapping (grid index == world coordinate).
    pub const IDENTITY: Self = Self {
        tr: [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Creates a transform from raw coefficients.
    #[must_use]
    pub const fn new(tr: [f32; 12]) -> Self {
        Self { tr }
    }

    /// Creates an axis-aligned transform: node `(0,0,0)` lands on `origin` and
    /// neighbouring nodes are `spacing` apart.
    #[must_use]
    pub fn from_origin_spacing(origin: Vec3, spacing: Vec3) -> Self {
        Self::new([
            origin.x, spacing.x, 0.0, 0.0, //
            origin.y, 0.0, spacing.y, 0.0, //
            origin.z, 0.0, 0.0, spacing.z,
        ])
    }

    /// Returns the raw coefficients.
    #[must_use]
    pub fn coefficients(&self) -> &[f32; 12] {
        &self.tr
    }

    /// Maps a (possibly fractional) grid index to world space.
    #[must_use]
    pub fn apply(&self, p: Vec3) -> Vec3 {
        let tr = &self.tr;
        Vec3::new(
            tr[0] + tr[1] * p.x + tr[2] * p.y + tr[3] * p.z,
            tr[4] + tr[5] * p.x + tr[6] * p.y + tr[7] * p.z,
            tr[8] + tr[9] * p.x + tr[10] * p.y + tr[11] * p.z,
        )
    }

    /// World-space step of one index along `axis` (not normalized).
    #[must_use]
    pub fn basis(&self, axis: Axis) -> Vec3 {
        let a = axis.index();
        Vec3::new(self.tr[1 + a], self.tr[5 + a], self.tr[9 + a])
    }

    /// The three basis vectors, each normalized.
    ///
    /// A zero-length basis vector stays zero.
    #[must_use]
    pub fn normalized_basis(&self) -> [Vec3; 3] {
        Axis::ALL.map(|axis| self.basis(axis).normalize_or_zero())
    }

    /// Returns the equivalent homogeneous matrix.
    #[must_use]
    pub fn to_mat4(&self) -> Mat4 {
        let tr = &self.tr;
        Mat4::from_cols(
            Vec4::new(tr[1], tr[5], tr[9], 0.0),
            Vec4::new(tr[2], tr[6], tr[10], 0.0),
            Vec4::new(tr[3], tr[7], tr[11], 0.0),
            Vec4::new(tr[0], tr[4], tr[8], 1.0),
        )
    }

    /// Builds a transform from the affine part of a matrix.
    #[must_use]
    pub fn from_mat4(m: Mat4) -> Self {
        let (x, y, z, w) = (m.x_axis, m.y_axis, m.z_axis, m.w_axis);
        Self::new([
            w.x, x.x, y.x, z.x, //
            w.y, x.y, y.y, z.y, //
            w.z, x.z, y.z, z.z,
        ])
    }

    /// Returns the transform that applies `self` first and `outer` second.
    #[must_use]
    pub fn then(&self, outer: &GridTransform) -> GridTransform {
        Self::from_mat4(outer.to_mat4() * self.to_mat4())
    }
}

impl Default for GridTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// Bitwise equality: cache keys must be stable even for NaN or signed zeros.
impl PartialEq for GridTransform {
    fn eq(&self, other: &Self) -> bool {
        self.tr
            .iter()
            .zip(other.tr.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for GridTransform {}
