//! Per-layer RGBA textures for slice-based volume rendering.

use glam::Vec3;
use volviz_core::{
    intensity_factor, Axis, ColormapLookup, Result, ScalarGrid, TextureBackend, TextureHandle,
    TransferFunction, VizError,
};

/// Texel data for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceImage {
    /// Width in texels (extent of the first remaining axis).
    pub width: u32,
    /// Height in texels (extent of the second remaining axis).
    pub height: u32,
    /// Row-major RGBA8 data, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// Texture size `(width, height)` for slices perpendicular to `axis`.
///
/// Slicing along I gives `B x C`, along J `A x C`, along K `A x B`.
pub fn slice_size(grid: &ScalarGrid, axis: Axis) -> Result<(u32, u32)> {
    let (u, v) = axis.others();
    let to_u32 = |n: usize| {
        u32::try_from(n)
            .map_err(|_| VizError::InvalidArgument(format!("slice extent {n} exceeds u32")))
    };
    Ok((to_u32(grid.extent(u))?, to_u32(grid.extent(v))?))
}

/// Renders layer `layer` (absolute grid index along `axis`) to RGBA texels.
///
/// Texel `(u, v)` sits at byte offset `(v * width + u) * 4`, with `u` running
/// over the lower-numbered remaining axis.
pub fn render_slice(
    grid: &ScalarGrid,
    transfer: &TransferFunction,
    colormap: &dyn ColormapLookup,
    axis: Axis,
    layer: usize,
    intensity: f32,
) -> Result<SliceImage> {
    let (width, height) = slice_size(grid, axis)?;
    let (u_axis, v_axis) = axis.others();
    let range = grid.range();
    let with_gradient = transfer.needs_gradient();

    let mut rgba = Vec::new();
    rgba.try_reserve_exact(width as usize * height as usize * 4)?;

    let mut idx = [0_usize; 3];
    idx[axis.index()] = layer;
    for v in range.lo[v_axis.index()]..=range.hi[v_axis.index()] {
        idx[v_axis.index()] = v;
        for u in range.lo[u_axis.index()]..=range.hi[u_axis.index()] {
            idx[u_axis.index()] = u;
            let value = grid.value_at(idx);
            let gradient = if with_gradient {
                grid.gradient(idx[0], idx[1], idx[2])
            } else {
                Vec3::ZERO
            };
            rgba.extend_from_slice(&transfer.rgba(value, gradient, intensity, colormap));
        }
    }

    Ok(SliceImage {
        width,
        height,
        rgba,
    })
}

/// The set of slice textures for the currently selected axis.
///
/// Holds exactly one texture per layer of the active range along `axis`
/// once built. The whole set is replaced when the axis changes or a reload
/// is forced; nothing is retained across axis switches.
#[derive(Debug, Default)]
pub struct SliceTextureSet {
    axis: Option<Axis>,
    handles: Vec<TextureHandle>,
    size: (u32, u32),
    rebuild_count: u64,
}

impl SliceTextureSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The axis the current textures were built for.
    #[must_use]
    pub fn axis(&self) -> Option<Axis> {
        self.axis
    }

    /// Texture handles in increasing layer order.
    #[must_use]
    pub fn handles(&self) -> &[TextureHandle] {
        &self.handles
    }

    /// Number of textures held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if no textures are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Texture size `(width, height)` of the current set.
    #[must_use]
    pub fn texture_size(&self) -> (u32, u32) {
        self.size
    }

    /// How many times the set has been (re)built successfully.
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    /// Texture for the layer at `offset` from the lower range bound.
    #[must_use]
    pub fn handle(&self, offset: usize) -> Option<TextureHandle> {
        self.handles.get(offset).copied()
    }

    /// Makes sure textures exist for `axis`, rebuilding them all if the axis
    /// changed or `force` is set. Returns true when a rebuild happened.
    ///
    /// If any allocation or upload fails, the partially built textures are
    /// destroyed and the previous set is kept.
    #[allow(clippy::too_many_arguments)]
    pub fn ensure(
        &mut self,
        axis: Axis,
        force: bool,
        grid: &ScalarGrid,
        transfer: &TransferFunction,
        colormap: &dyn ColormapLookup,
        axis_scale: Option<[f32; 3]>,
        backend: &mut dyn TextureBackend,
    ) -> Result<bool> {
        if self.axis == Some(axis) && !force {
            return Ok(false);
        }

        let intensity = intensity_factor(grid.range().extents(), axis, axis_scale);
        let (width, height) = slice_size(grid, axis)?;
        let range = grid.range();
        let a = axis.index();

        let mut fresh = Vec::new();
        fresh.try_reserve_exact(grid.extent(axis))?;
        for layer in range.lo[a]..=range.hi[a] {
            let built = render_slice(grid, transfer, colormap, axis, layer, intensity)
                .and_then(|image| {
                    let handle = backend.allocate(width, height)?;
                    fresh.push(handle);
                    backend.write(handle, &image.rgba)?;
                    backend.commit(handle)
                });
            if let Err(err) = built {
                log::error!(
                    "failed to build slice textures for axis {}: {err}",
                    axis.number()
                );
                for handle in fresh {
                    backend.destroy(handle);
                }
                return Err(err);
            }
        }

        for handle in std::mem::replace(&mut self.handles, fresh) {
            backend.destroy(handle);
        }
        self.axis = Some(axis);
        self.size = (width, height);
        self.rebuild_count += 1;
        log::debug!(
            "built {} slice textures of {}x{} for axis {} (intensity {intensity})",
            self.handles.len(),
            width,
            height,
            axis.number()
        );
        Ok(true)
    }

    /// Destroys every texture and forgets the axis.
    pub fn release(&mut self, backend: &mut dyn TextureBackend) {
        for handle in self.handles.drain(..) {
            backend.destroy(handle);
        }
        self.axis = None;
        self.size = (0, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use volviz_core::{GridRange, IndexedColorMap};

    #[allow(clippy::cast_precision_loss)]
    fn grid() -> ScalarGrid {
        ScalarGrid::from_fn([2, 3, 4], |i, j, k| (i * 100 + j * 10 + k) as f32).unwrap()
    }

    fn tf() -> TransferFunction {
        TransferFunction::ramp(0.0, 123.0, 0.0, 1.0)
    }

    #[test]
    fn test_slice_sizes() {
        let g = grid();
        assert_eq!(slice_size(&g, Axis::I).unwrap(), (3, 4));
        assert_eq!(slice_size(&g, Axis::J).unwrap(), (2, 4));
        assert_eq!(slice_size(&g, Axis::K).unwrap(), (2, 3));
    }

    #[test]
    fn test_texel_layout() {
        let g = grid();
        let grey = IndexedColorMap::greyscale(0, 123).unwrap();
        let image = render_slice(&g, &tf(), &grey, Axis::K, 3, 1.0).unwrap();
        assert_eq!(image.rgba.len(), 2 * 3 * 4);
        // (u, v) = (i, j) = (1, 2) holds value 123, the top of the range
        let offset = (2 * 2 + 1) * 4;
        assert_eq!(&image.rgba[offset..offset + 4], &[255, 255, 255, 255]);
        // (0, 0) holds value 3
        assert_eq!(image.rgba[3], 6);
    }

    #[test]
    fn test_sub_range_slices() {
        let g = grid()
            .with_range(GridRange::new([0, 1, 1], [1, 2, 2]))
            .unwrap();
        let grey = IndexedColorMap::greyscale(0, 255).unwrap();
        let image = render_slice(&g, &tf(), &grey, Axis::I, 1, 1.0).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
    }

    #[test]
    fn test_ensure_same_axis_is_noop() {
        let g = grid();
        let grey = IndexedColorMap::greyscale(0, 255).unwrap();
        let mut backend = HeadlessBackend::new();
        let mut set = SliceTextureSet::new();

        assert!(set.ensure(Axis::K, false, &g, &tf(), &grey, None, &mut backend).unwrap());
        assert_eq!(set.len(), 4);
        assert_eq!(backend.live_textures(), 4);
        assert!(!set.ensure(Axis::K, false, &g, &tf(), &grey, None, &mut backend).unwrap());
        assert_eq!(backend.allocations(), 4);

        assert!(set.ensure(Axis::K, true, &g, &tf(), &grey, None, &mut backend).unwrap());
        assert_eq!(set.rebuild_count(), 2);
        assert_eq!(backend.live_textures(), 4);
    }

    #[test]
    fn test_axis_change_replaces_set() {
        let g = grid();
        let grey = IndexedColorMap::greyscale(0, 255).unwrap();
        let mut backend = HeadlessBackend::new();
        let mut set = SliceTextureSet::new();

        set.ensure(Axis::K, false, &g, &tf(), &grey, None, &mut backend).unwrap();
        set.ensure(Axis::I, false, &g, &tf(), &grey, None, &mut backend).unwrap();
        assert_eq!(set.axis(), Some(Axis::I));
        assert_eq!(set.len(), 2);
        assert_eq!(set.texture_size(), (3, 4));
        assert_eq!(backend.live_textures(), 2);

        set.release(&mut backend);
        assert!(set.is_empty());
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_failed_allocation_keeps_previous_set() {
        let g = grid();
        let grey = IndexedColorMap::greyscale(0, 255).unwrap();
        let mut backend = HeadlessBackend::new();
        let mut set = SliceTextureSet::new();

        set.ensure(Axis::I, false, &g, &tf(), &grey, None, &mut backend).unwrap();
        let before = set.handles().to_vec();

        backend.set_allocation_limit(Some(backend.live_textures() + 1));
        let err = set.ensure(Axis::K, false, &g, &tf(), &grey, None, &mut backend);
        assert!(matches!(err, Err(VizError::ResourceExhausted(_))));
        assert_eq!(set.axis(), Some(Axis::I));
        assert_eq!(set.handles(), &before[..]);
        assert_eq!(backend.live_textures(), 2);
    }
}
