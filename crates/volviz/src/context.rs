//! The visualization context: registration, update, drawing and teardown.

use std::collections::HashMap;
use std::fmt;

use volviz_core::{
    Axis, CameraSource, ColorMapRegistry, ColormapLookup, GeometrySink, Result, ScalarGrid,
    TextureBackend, TransMode, Vec3, VizError, VizOptions,
};
use volviz_structures::{
    ColorFn, Isosurface, IsosurfaceDescriptor, VolumeDescriptor, VolumeFrame, VolumeVisual,
};

/// Opaque handle to a registered isosurface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsosurfaceId(pub u32);

/// Opaque handle to a registered volume visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(pub u32);

impl fmt::Display for IsosurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "isosurface #{}", self.0)
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "volume #{}", self.0)
    }
}

/// Logs a rejected call and hands the error back.
fn rejected<T>(err: VizError) -> Result<T> {
    log::warn!("{err}");
    Err(err)
}

/// Hands out `*next` and advances it, refusing once the counter is spent.
fn take_id(next: &mut u32, kind: &str) -> Result<u32> {
    let id = *next;
    match id.checked_add(1) {
        Some(following) => {
            *next = following;
            Ok(id)
        }
        None => rejected(VizError::InvalidArgument(format!("{kind} ids exhausted"))),
    }
}

/// Owns every isosurface and volume visual of one viewer.
///
/// All calls take `&mut self`, so an entity can never be drawn while it is
/// being rebuilt. A context shared through `RefCell` turns a nested call from
/// a callback into a borrow error instead.
///
/// Slice textures live in the host's texture backend, so the context must be
/// torn down with [`shutdown`](Self::shutdown) (or volumes removed with
/// [`remove_volume`](Self::remove_volume)) to release them.
pub struct VizContext {
    options: VizOptions,
    color_maps: ColorMapRegistry,
    isosurfaces: HashMap<IsosurfaceId, Isosurface>,
    volumes: HashMap<VolumeId, VolumeVisual>,
    next_isosurface: u32,
    next_volume: u32,
}

impl VizContext {
    /// Creates an empty context.
    pub fn new(options: VizOptions) -> Self {
        log::info!("volviz context created");
        Self {
            options,
            color_maps: ColorMapRegistry::new(),
            isosurfaces: HashMap::new(),
            volumes: HashMap::new(),
            next_isosurface: 1,
            next_volume: 1,
        }
    }

    /// Current options.
    pub fn options(&self) -> &VizOptions {
        &self.options
    }

    /// Mutable access to the options. Changes apply from the next draw;
    /// normal settings only take effect on the next rebuild.
    pub fn options_mut(&mut self) -> &mut VizOptions {
        &mut self.options
    }

    /// Named colour maps.
    pub fn color_maps(&self) -> &ColorMapRegistry {
        &self.color_maps
    }

    /// Mutable access to the named colour maps.
    pub fn color_maps_mut(&mut self) -> &mut ColorMapRegistry {
        &mut self.color_maps
    }

    // --- Isosurfaces ---

    /// Registers an isosurface. Extraction happens on its first draw.
    pub fn register_isosurface(&mut self, descr: IsosurfaceDescriptor) -> Result<IsosurfaceId> {
        let iso = match Isosurface::new(descr) {
            Ok(iso) => iso,
            Err(err) => return rejected(err),
        };
        let id = IsosurfaceId(take_id(&mut self.next_isosurface, "isosurface")?);
        log::info!("registered {id} at level {}", iso.descriptor().level);
        self.isosurfaces.insert(id, iso);
        Ok(id)
    }

    /// Looks up an isosurface.
    pub fn isosurface(&self, id: IsosurfaceId) -> Option<&Isosurface> {
        self.isosurfaces.get(&id)
    }

    /// Number of registered isosurfaces.
    pub fn num_isosurfaces(&self) -> usize {
        self.isosurfaces.len()
    }

    fn isosurface_mut(&mut self, id: IsosurfaceId) -> Result<&mut Isosurface> {
        match self.isosurfaces.get_mut(&id) {
            Some(iso) => Ok(iso),
            None => rejected(VizError::UnknownIsosurface(id.0)),
        }
    }

    /// Sets the iso level.
    pub fn set_isosurface_level(&mut self, id: IsosurfaceId, level: f32) -> Result<()> {
        if let Err(err) = self.isosurface_mut(id)?.set_level(level) {
            return rejected(err);
        }
        Ok(())
    }

    /// Sets a fixed surface colour.
    pub fn set_isosurface_color(&mut self, id: IsosurfaceId, color: Vec3) -> Result<()> {
        self.isosurface_mut(id)?.set_color(color);
        Ok(())
    }

    /// Colours the surface with a function of each triangle's world-space centroid.
    pub fn set_isosurface_color_fn(&mut self, id: IsosurfaceId, f: ColorFn) -> Result<()> {
        self.isosurface_mut(id)?.set_color_fn(f);
        Ok(())
    }

    /// Sets opacity and blending mode.
    pub fn set_isosurface_alpha(
        &mut self,
        id: IsosurfaceId,
        alpha: f32,
        mode: TransMode,
    ) -> Result<()> {
        if let Err(err) = self.isosurface_mut(id)?.set_alpha(alpha, mode) {
            return rejected(err);
        }
        Ok(())
    }

    /// Sets the cell step.
    pub fn set_isosurface_resolution(
        &mut self,
        id: IsosurfaceId,
        resolution: usize,
    ) -> Result<()> {
        if let Err(err) = self.isosurface_mut(id)?.set_resolution(resolution) {
            return rejected(err);
        }
        Ok(())
    }

    /// Replaces the source grid.
    pub fn set_isosurface_grid(&mut self, id: IsosurfaceId, grid: ScalarGrid) -> Result<()> {
        self.isosurface_mut(id)?.set_grid(grid);
        Ok(())
    }

    /// Draws an isosurface, re-extracting first if it changed or `force` is set.
    ///
    /// On [`VizError::ResourceExhausted`] nothing is drawn and the previous
    /// surface is kept for later frames.
    pub fn draw_isosurface(
        &mut self,
        id: IsosurfaceId,
        force: bool,
        sink: &mut dyn GeometrySink,
    ) -> Result<()> {
        let options = self.options.clone();
        self.isosurface_mut(id)?.draw(force, &options, sink)
    }

    /// Removes an isosurface and frees its triangles.
    pub fn remove_isosurface(&mut self, id: IsosurfaceId) -> Result<()> {
        match self.isosurfaces.remove(&id) {
            Some(_) => {
                log::info!("removed {id}");
                Ok(())
            }
            None => rejected(VizError::UnknownIsosurface(id.0)),
        }
    }

    // --- Volumes ---

    /// Registers a volume visual. Textures are built on its first draw.
    pub fn register_volume(&mut self, descr: VolumeDescriptor) -> Result<VolumeId> {
        let dims = descr.grid.range().extents();
        let volume = match VolumeVisual::new(descr) {
            Ok(volume) => volume,
            Err(err) => return rejected(err),
        };
        let id = VolumeId(take_id(&mut self.next_volume, "volume")?);
        log::info!("registered {id} with extents {dims:?}");
        self.volumes.insert(id, volume);
        Ok(id)
    }

    /// Looks up a volume visual.
    pub fn volume(&self, id: VolumeId) -> Option<&VolumeVisual> {
        self.volumes.get(&id)
    }

    /// Number of registered volume visuals.
    pub fn num_volumes(&self) -> usize {
        self.volumes.len()
    }

    fn volume_mut(&mut self, id: VolumeId) -> Result<&mut VolumeVisual> {
        match self.volumes.get_mut(&id) {
            Some(volume) => Ok(volume),
            None => rejected(VizError::UnknownVolume(id.0)),
        }
    }

    /// Draws a volume visual.
    ///
    /// `force` rebuilds the slice textures and restarts progressive
    /// refinement. `axis_override` fixes the slicing axis for offline
    /// rendering. Returns `Ok(None)` when nothing could be drawn yet because
    /// the camera has no pose.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_volume(
        &mut self,
        id: VolumeId,
        force: bool,
        axis_override: Option<Axis>,
        textures: &mut dyn TextureBackend,
        colormap: &dyn ColormapLookup,
        camera: &dyn CameraSource,
        sink: &mut dyn GeometrySink,
    ) -> Result<Option<VolumeFrame>> {
        let options = self.options.clone();
        self.volume_mut(id)?
            .draw(force, axis_override, &options, textures, colormap, camera, sink)
    }

    /// Removes a volume visual, destroying its slice textures.
    pub fn remove_volume(
        &mut self,
        id: VolumeId,
        textures: &mut dyn TextureBackend,
    ) -> Result<()> {
        match self.volumes.remove(&id) {
            Some(mut volume) => {
                volume.release(textures);
                log::info!("removed {id}");
                Ok(())
            }
            None => rejected(VizError::UnknownVolume(id.0)),
        }
    }

    /// Tears the context down, releasing every slice texture.
    pub fn shutdown(mut self, textures: &mut dyn TextureBackend) {
        let released: usize = self
            .volumes
            .values_mut()
            .map(|volume| {
                let n = volume.textures().len();
                volume.release(textures);
                n
            })
            .sum();
        log::info!(
            "volviz context shut down: {} isosurfaces, {} volumes, {released} textures released",
            self.isosurfaces.len(),
            self.volumes.len()
        );
        self.volumes.clear();
        self.isosurfaces.clear();
    }
}

impl Default for VizContext {
    fn default() -> Self {
        Self::new(VizOptions::default())
    }
}

impl Drop for VizContext {
    fn drop(&mut self) {
        let leaked: usize = self.volumes.values().map(|v| v.textures().len()).sum();
        if leaked > 0 {
            log::warn!("volviz context dropped without shutdown, {leaked} slice textures leaked");
        }
    }
}

impl fmt::Debug for VizContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VizContext")
            .field("options", &self.options)
            .field("isosurfaces", &self.isosurfaces.len())
            .field("volumes", &self.volumes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volviz_core::TransferFunction;
    use volviz_render::HeadlessBackend;

    fn grid() -> ScalarGrid {
        ScalarGrid::from_fn([4, 4, 4], |i, _, _| if i < 2 { 0.0 } else { 1.0 }).unwrap()
    }

    #[test]
    fn test_ids_are_distinct() {
        let mut ctx = VizContext::default();
        let a = ctx.register_isosurface(IsosurfaceDescriptor::new(grid(), 0.5)).unwrap();
        let b = ctx.register_isosurface(IsosurfaceDescriptor::new(grid(), 0.5)).unwrap();
        assert_ne!(a, b);
        assert_eq!(ctx.num_isosurfaces(), 2);
        ctx.remove_isosurface(a).unwrap();
        assert!(ctx.isosurface(a).is_none());
        assert!(ctx.remove_isosurface(a).is_err());
    }

    #[test]
    fn test_exhausted_ids_are_rejected() {
        let mut ctx = VizContext::default();
        ctx.next_isosurface = u32::MAX - 1;
        ctx.next_volume = u32::MAX;
        let last = ctx.register_isosurface(IsosurfaceDescriptor::new(grid(), 0.5)).unwrap();
        assert_eq!(last, IsosurfaceId(u32::MAX - 1));
        assert!(matches!(
            ctx.register_isosurface(IsosurfaceDescriptor::new(grid(), 0.5)),
            Err(VizError::InvalidArgument(_))
        ));
        assert_eq!(ctx.num_isosurfaces(), 1);

        let transfer = TransferFunction::ramp(0.0, 1.0, 0.0, 1.0);
        assert!(matches!(
            ctx.register_volume(VolumeDescriptor::new(grid(), transfer)),
            Err(VizError::InvalidArgument(_))
        ));
        assert_eq!(ctx.num_volumes(), 0);
    }

    #[test]
    fn test_unknown_ids() {
        let mut ctx = VizContext::default();
        let mut backend = HeadlessBackend::new();
        assert!(matches!(
            ctx.set_isosurface_level(IsosurfaceId(42), 1.0),
            Err(VizError::UnknownIsosurface(42))
        ));
        assert!(matches!(
            ctx.remove_volume(VolumeId(7), &mut backend),
            Err(VizError::UnknownVolume(7))
        ));
    }

    #[test]
    fn test_rejected_registration() {
        let mut ctx = VizContext::default();
        let bad = IsosurfaceDescriptor::new(grid(), 0.5).with_resolution(0);
        assert!(ctx.register_isosurface(bad).is_err());
        let transfer = TransferFunction::ramp(0.0, f32::INFINITY, 0.0, 1.0);
        assert!(ctx.register_volume(VolumeDescriptor::new(grid(), transfer)).is_err());
        assert_eq!(ctx.num_isosurfaces(), 0);
        assert_eq!(ctx.num_volumes(), 0);
    }

    #[test]
    fn test_debug_summary() {
        let ctx = VizContext::default();
        assert!(format!("{ctx:?}").contains("isosurfaces: 0"));
    }
}
