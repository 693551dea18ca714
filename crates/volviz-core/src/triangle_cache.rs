//! Triangle storage for extracted isosurfaces, with normal reconstruction.

use std::collections::HashMap;

use glam::Vec3;

use crate::backend::IsoVertex;
use crate::error::Result;
use crate::marching_cubes::Triangle;
use crate::options::NormalMode;
use crate::transform::GridTransform;

/// Upper bound on how many vertices are merged into one shared normal.
///
/// Degenerate input (many coincident vertices) starts a fresh group once a
/// group is full, so the matching pass always terminates.
pub const MAX_SHARED_VERTICES: usize = 32;

/// Accumulated isosurface triangles with per-triangle colour and per-vertex normals.
#[derive(Debug, Clone, Default)]
pub struct TriangleCache {
    triangles: Vec<Triangle>,
    colors: Vec<Vec3>,
    normals: Vec<Vec3>,
}

impl TriangleCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored triangles.
    #[must_use]
    pub fn ntri(&self) -> usize {
        self.triangles.len()
    }

    /// Returns true if no triangles are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// World-space triangles.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Per-triangle colours.
    #[must_use]
    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    /// Per-vertex normals, three per triangle. Empty while normals are stale.
    #[must_use]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Returns true when every vertex has a normal from the latest normal pass.
    #[must_use]
    pub fn normals_current(&self) -> bool {
        self.normals.len() == 3 * self.triangles.len()
    }

    /// Drops all triangles and releases their storage.
    pub fn clear(&mut self) {
        self.triangles = Vec::new();
        self.colors = Vec::new();
        self.normals = Vec::new();
    }

    /// Appends a triangle after mapping its vertices through `transform`.
    ///
    /// Invalidates normals until the next [`compute_normals`](Self::compute_normals).
    pub fn append(&mut self, tri: &Triangle, color: Vec3, transform: &GridTransform) -> Result<()> {
        self.triangles.try_reserve(1)?;
        self.colors.try_reserve(1)?;
        self.triangles.push(tri.map(|p| transform.apply(p)));
        self.colors.push(color);
        self.normals.clear();
        Ok(())
    }

    /// Total surface area of the stored triangles.
    #[must_use]
    pub fn surface_area(&self) -> f32 {
        self.triangles
            .iter()
            .map(|[a, b, c]| 0.5 * (*b - *a).cross(*c - *a).length())
            .sum()
    }

    /// Recomputes every vertex normal.
    ///
    /// In [`NormalMode::Smooth`] vertices closer than `epsilon` in every
    /// component share the normalized, area-weighted sum of their face
    /// normals. `axis_scale` multiplies edge vectors per component before the
    /// cross product, for grids or viewports that are not cubic.
    pub fn compute_normals(
        &mut self,
        mode: NormalMode,
        epsilon: f32,
        axis_scale: Option<[f32; 3]>,
    ) -> Result<()> {
        let scale = Vec3::from_array(axis_scale.unwrap_or([1.0; 3]));
        let mut faces = Vec::new();
        faces.try_reserve_exact(self.triangles.len())?;
        faces.extend(self.triangles.iter().map(|[a, b, c]| {
            // Half the cross product: direction of the face, length of its area
            0.5 * ((*b - *a) * scale).cross((*c - *a) * scale)
        }));

        let mut normals = Vec::new();
        normals.try_reserve_exact(3 * self.triangles.len())?;

        match mode {
            NormalMode::Flat => {
                for face in &faces {
                    let n = face.normalize_or_zero();
                    normals.extend([n, n, n]);
                }
            }
            NormalMode::Smooth => {
                let groups = VertexGroups::build(&self.triangles, epsilon)?;
                let mut sums = vec![Vec3::ZERO; groups.len()];
                for (v, &g) in groups.membership.iter().enumerate() {
                    sums[g] += faces[v / 3];
                }
                for (v, &g) in groups.membership.iter().enumerate() {
                    let n = sums[g].normalize_or_zero();
                    normals.push(if n == Vec3::ZERO {
                        faces[v / 3].normalize_or_zero()
                    } else {
                        n
                    });
                }
            }
        }

        self.normals = normals;
        log::trace!(
            "computed {:?} normals for {} triangles",
            mode,
            self.triangles.len()
        );
        Ok(())
    }

    /// Interleaved vertices ready for submission, three per triangle.
    ///
    /// Normals must be current; stale normals come out as zero vectors.
    pub fn to_vertices(&self) -> Result<Vec<IsoVertex>> {
        let mut out = Vec::new();
        out.try_reserve_exact(3 * self.triangles.len())?;
        for (t, (tri, color)) in self.triangles.iter().zip(&self.colors).enumerate() {
            for (corner, position) in tri.iter().enumerate() {
                let normal = self.normals.get(3 * t + corner).copied().unwrap_or(Vec3::ZERO);
                out.push(IsoVertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    color: color.to_array(),
                });
            }
        }
        Ok(out)
    }
}

/// Assignment of every vertex to a group of coincident vertices.
struct VertexGroups {
    membership: Vec<usize>,
    count: usize,
}

impl VertexGroups {
    /// Groups vertices with a spatial hash on positions quantized to `epsilon`.
    ///
    /// A vertex joins the first non-full group, in creation order, whose
    /// anchor lies within `epsilon` per component, looked up over the 27
    /// neighbouring hash cells.
    #[allow(clippy::cast_possible_truncation)]
    fn build(triangles: &[Triangle], epsilon: f32) -> Result<Self> {
        let cell = f64::from(epsilon.max(f32::EPSILON));
        let key = |p: Vec3| p.to_array().map(|c| (f64::from(c) / cell).floor() as i64);

        let mut membership = Vec::new();
        membership.try_reserve_exact(3 * triangles.len())?;
        let mut anchors: Vec<Vec3> = Vec::new();
        let mut sizes: Vec<usize> = Vec::new();
        let mut buckets: HashMap<[i64; 3], Vec<usize>> = HashMap::new();

        for &p in triangles.iter().flatten() {
            let [x, y, z] = key(p);
            let mut found: Option<usize> = None;
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(bucket) = buckets.get(&[x + dx, y + dy, z + dz]) else {
                            continue;
                        };
                        for &g in bucket {
                            if sizes[g] < MAX_SHARED_VERTICES
                                && anchors[g].abs_diff_eq(p, epsilon)
                                && found.map_or(true, |f| g < f)
                            {
                                found = Some(g);
                            }
                        }
                    }
                }
            }

            let g = if let Some(g) = found {
                g
            } else {
                anchors.try_reserve(1)?;
                sizes.try_reserve(1)?;
                anchors.push(p);
                sizes.push(0);
                let g = anchors.len() - 1;
                buckets.entry([x, y, z]).or_default().push(g);
                g
            };
            sizes[g] += 1;
            membership.push(g);
        }

        Ok(Self {
            membership,
            count: anchors.len(),
        })
    }

    fn len(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_cache() -> TriangleCache {
        // Two triangles folded along the x axis, sharing the edge (0,0,0)-(1,0,0)
        let mut cache = TriangleCache::new();
        let id = GridTransform::IDENTITY;
        cache
            .append(&[Vec3::ZERO, Vec3::X, Vec3::Y], Vec3::ONE, &id)
            .unwrap();
        cache
            .append(&[Vec3::ZERO, Vec3::Z, Vec3::X], Vec3::ONE, &id)
            .unwrap();
        cache
    }

    #[test]
    fn test_append_applies_transform() {
        let mut cache = TriangleCache::new();
        let tr = GridTransform::from_origin_spacing(Vec3::new(10.0, 0.0, 0.0), Vec3::splat(2.0));
        cache
            .append(&[Vec3::ZERO, Vec3::X, Vec3::Y], Vec3::X, &tr)
            .unwrap();
        assert_eq!(cache.ntri(), 1);
        assert_eq!(cache.triangles()[0][1], Vec3::new(12.0, 0.0, 0.0));
        assert_eq!(cache.colors()[0], Vec3::X);
    }

    #[test]
    fn test_append_invalidates_normals() {
        let mut cache = quad_cache();
        cache.compute_normals(NormalMode::Smooth, 1e-5, None).unwrap();
        assert!(cache.normals_current());
        assert_eq!(cache.normals().len(), 6);
        cache
            .append(&[Vec3::ONE, Vec3::X, Vec3::Y], Vec3::ONE, &GridTransform::IDENTITY)
            .unwrap();
        assert!(!cache.normals_current());
    }

    #[test]
    fn test_flat_normals() {
        let mut cache = quad_cache();
        cache.compute_normals(NormalMode::Flat, 1e-5, None).unwrap();
        assert_eq!(&cache.normals()[..3], &[Vec3::Z; 3]);
        assert_eq!(&cache.normals()[3..], &[Vec3::Y; 3]);
    }

    #[test]
    fn test_smooth_normals_share_edge() {
        let mut cache = quad_cache();
        cache.compute_normals(NormalMode::Smooth, 1e-5, None).unwrap();
        let shared = (Vec3::Z + Vec3::Y).normalize();
        let n = cache.normals();
        // Vertices on the shared edge get the averaged normal, the rest keep their face normal
        assert!((n[0] - shared).length() < 1e-6);
        assert!((n[1] - shared).length() < 1e-6);
        assert!((n[3] - shared).length() < 1e-6);
        assert!((n[5] - shared).length() < 1e-6);
        assert!((n[2] - Vec3::Z).length() < 1e-6);
        assert!((n[4] - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_area_weighting() {
        let mut cache = TriangleCache::new();
        let id = GridTransform::IDENTITY;
        // Large face in the xy plane, small face in the xz plane, sharing the origin
        cache
            .append(&[Vec3::ZERO, Vec3::X * 3.0, Vec3::Y * 3.0], Vec3::ONE, &id)
            .unwrap();
        cache
            .append(&[Vec3::ZERO, Vec3::Z, Vec3::X], Vec3::ONE, &id)
            .unwrap();
        cache.compute_normals(NormalMode::Smooth, 1e-5, None).unwrap();
        let expected = (Vec3::Z * 4.5 + Vec3::Y * 0.5).normalize();
        assert!((cache.normals()[0] - expected).length() < 1e-6);
    }

    #[test]
    fn test_zero_area_triangle_keeps_neighbour_normal() {
        let mut cache = quad_cache();
        cache
            .append(&[Vec3::ZERO, Vec3::ZERO, Vec3::ZERO], Vec3::ONE, &GridTransform::IDENTITY)
            .unwrap();
        cache.compute_normals(NormalMode::Smooth, 1e-5, None).unwrap();
        let shared = (Vec3::Z + Vec3::Y).normalize();
        assert!((cache.normals()[6] - shared).length() < 1e-6);
    }

    #[test]
    fn test_degenerate_pileup_terminates() {
        let mut cache = TriangleCache::new();
        for _ in 0..100 {
            cache
                .append(&[Vec3::ZERO, Vec3::X, Vec3::Y], Vec3::ONE, &GridTransform::IDENTITY)
                .unwrap();
        }
        cache.compute_normals(NormalMode::Smooth, 1e-5, None).unwrap();
        assert_eq!(cache.normals().len(), 300);
        assert!(cache.normals().iter().all(|n| (*n - Vec3::Z).length() < 1e-6));
    }

    #[test]
    fn test_axis_scale_tilts_normal() {
        let mut cache = TriangleCache::new();
        let tri = [Vec3::ZERO, Vec3::X, Vec3::new(0.0, 1.0, 1.0)];
        cache
            .append(&tri, Vec3::ONE, &GridTransform::IDENTITY)
            .unwrap();
        cache
            .compute_normals(NormalMode::Flat, 1e-5, Some([1.0, 1.0, 0.0]))
            .unwrap();
        assert!((cache.normals()[0] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_to_vertices_layout() {
        let mut cache = quad_cache();
        cache.compute_normals(NormalMode::Flat, 1e-5, None).unwrap();
        let verts = cache.to_vertices().unwrap();
        assert_eq!(verts.len(), 6);
        assert_eq!(verts[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(verts[4].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_surface_area_and_clear() {
        let mut cache = quad_cache();
        assert!((cache.surface_area() - 1.0).abs() < 1e-6);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.surface_area(), 0.0);
    }
}
