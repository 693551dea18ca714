//! Cached marching-cubes isosurfaces.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use volviz_core::marching_cubes::{polygonize, GridCell};
use volviz_core::{
    GeometrySink, GridTransform, Result, ScalarGrid, TransMode, TriangleCache, VizError,
    VizOptions,
};

/// Colour callback evaluated at a triangle's world-space centroid.
pub type ColorFn = Arc<dyn Fn(Vec3) -> Vec3 + Send + Sync>;

/// Default surface colour.
pub const DEFAULT_ISOSURFACE_COLOR: Vec3 = Vec3::new(0.047, 0.451, 0.690);

/// How triangles are coloured.
#[derive(Clone)]
pub enum ColorSource {
    /// Same RGB for every triangle.
    Fixed(Vec3),
    /// RGB computed per triangle from its centroid.
    Function(ColorFn),
}

impl ColorSource {
    fn color_at(&self, centroid: Vec3) -> Vec3 {
        match self {
            ColorSource::Fixed(c) => *c,
            ColorSource::Function(f) => f(centroid),
        }
    }
}

impl fmt::Debug for ColorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSource::Fixed(c) => f.debug_tuple("Fixed").field(c).finish(),
            ColorSource::Function(_) => f.write_str("Function(..)"),
        }
    }
}

// Functions compare by identity: the same Arc means the same colouring.
impl PartialEq for ColorSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColorSource::Fixed(a), ColorSource::Fixed(b)) => bits3(*a) == bits3(*b),
            (ColorSource::Function(a), ColorSource::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn bits3(v: Vec3) -> [u32; 3] {
    v.to_array().map(f32::to_bits)
}

/// Everything that determines an isosurface's triangles and appearance.
///
/// Two descriptors are equal when every field matches exactly; the grid and
/// a colour function compare by identity of their shared storage.
#[derive(Debug, Clone)]
pub struct IsosurfaceDescriptor {
    /// Source field, with its active range and index-to-world transform.
    pub grid: ScalarGrid,
    /// Iso level.
    pub level: f32,
    /// Cell step in grid nodes (1 visits every cell).
    pub resolution: usize,
    /// Blending mode.
    pub mode: TransMode,
    /// Surface opacity.
    pub alpha: f32,
    /// Triangle colouring.
    pub color: ColorSource,
    /// Local transform applied after the grid transform.
    pub transform: GridTransform,
}

impl IsosurfaceDescriptor {
    /// An opaque surface at `level` over the whole active range of `grid`.
    pub fn new(grid: ScalarGrid, level: f32) -> Self {
        Self {
            grid,
            level,
            resolution: 1,
            mode: TransMode::Opaque,
            alpha: 1.0,
            color: ColorSource::Fixed(DEFAULT_ISOSURFACE_COLOR),
            transform: GridTransform::IDENTITY,
        }
    }

    /// Sets the cell step.
    #[must_use]
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets a fixed colour.
    #[must_use]
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = ColorSource::Fixed(color);
        self
    }

    /// Colours each triangle by `f(centroid)`.
    #[must_use]
    pub fn with_color_fn(mut self, f: impl Fn(Vec3) -> Vec3 + Send + Sync + 'static) -> Self {
        self.color = ColorSource::Function(Arc::new(f));
        self
    }

    /// Sets opacity and blending mode.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32, mode: TransMode) -> Self {
        self.alpha = alpha;
        self.mode = mode;
        self
    }

    /// Sets the local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: GridTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Checks that the parameters can be used for extraction.
    pub fn validate(&self) -> Result<()> {
        if !self.level.is_finite() {
            return Err(VizError::InvalidArgument(format!(
                "iso level must be finite, got {}",
                self.level
            )));
        }
        if self.resolution == 0 {
            return Err(VizError::InvalidArgument(
                "isosurface resolution must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(VizError::InvalidArgument(format!(
                "isosurface alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }

    /// Grid transform followed by the local transform.
    #[must_use]
    pub fn world_transform(&self) -> GridTransform {
        self.grid.transform().then(&self.transform)
    }
}

impl PartialEq for IsosurfaceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.grid.shares_values(&other.grid)
            && self.grid.dims() == other.grid.dims()
            && self.grid.range() == other.grid.range()
            && self.grid.transform() == other.grid.transform()
            && self.level.to_bits() == other.level.to_bits()
            && self.resolution == other.resolution
            && self.mode == other.mode
            && self.alpha.to_bits() == other.alpha.to_bits()
            && self.color == other.color
            && self.transform == other.transform
    }
}

/// Runs marching cubes over the active range of `descr` into a fresh cache.
pub fn extract(descr: &IsosurfaceDescriptor, options: &VizOptions) -> Result<TriangleCache> {
    let grid = &descr.grid;
    let range = grid.range();
    let (lo, hi) = (range.lo, range.hi);
    let step = descr.resolution.max(1);
    let world = descr.world_transform();

    let mut cache = TriangleCache::new();
    for i in (lo[0]..hi[0]).step_by(step) {
        for j in (lo[1]..hi[1]).step_by(step) {
            for k in (lo[2]..hi[2]).step_by(step) {
                let cell = GridCell::from_grid(grid, [i, j, k], step, hi);
                for tri in polygonize(&cell, descr.level).as_slice() {
                    let centroid = world.apply((tri[0] + tri[1] + tri[2]) / 3.0);
                    cache.append(tri, descr.color.color_at(centroid), &world)?;
                    if let Some(max) = options.max_triangles.filter(|&max| cache.ntri() > max) {
                        return Err(VizError::ResourceExhausted(format!(
                            "isosurface exceeds the budget of {max} triangles"
                        )));
                    }
                }
            }
        }
    }

    cache.compute_normals(
        options.normal_mode,
        options.normal_epsilon,
        options.normal_axis_scale,
    )?;
    Ok(cache)
}

/// An isosurface entity: its current descriptor and the triangles last built from it.
#[derive(Debug)]
pub struct Isosurface {
    descr: IsosurfaceDescriptor,
    cached_descr: Option<IsosurfaceDescriptor>,
    cache: TriangleCache,
    build_count: u64,
}

impl Isosurface {
    /// Creates an isosurface. Nothing is extracted until the first draw.
    pub fn new(descr: IsosurfaceDescriptor) -> Result<Self> {
        descr.validate()?;
        Ok(Self {
            descr,
            cached_descr: None,
            cache: TriangleCache::new(),
            build_count: 0,
        })
    }

    /// The current descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &IsosurfaceDescriptor {
        &self.descr
    }

    /// The descriptor the cache was built from, if any build succeeded.
    #[must_use]
    pub fn cached_descriptor(&self) -> Option<&IsosurfaceDescriptor> {
        self.cached_descr.as_ref()
    }

    /// The cached triangles.
    #[must_use]
    pub fn cache(&self) -> &TriangleCache {
        &self.cache
    }

    /// Number of successful extractions so far.
    #[must_use]
    pub fn build_count(&self) -> u64 {
        self.build_count
    }

    /// Returns true when the next draw will re-extract.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.cached_descr.as_ref() != Some(&self.descr)
    }

    /// Sets the iso level.
    pub fn set_level(&mut self, level: f32) -> Result<&mut Self> {
        self.update(|d| d.level = level)
    }

    /// Sets a fixed surface colour.
    pub fn set_color(&mut self, color: Vec3) -> &mut Self {
        self.descr.color = ColorSource::Fixed(color);
        self
    }

    /// Colours triangles with a function of their centroid.
    pub fn set_color_fn(&mut self, f: ColorFn) -> &mut Self {
        self.descr.color = ColorSource::Function(f);
        self
    }

    /// Sets opacity and blending mode.
    pub fn set_alpha(&mut self, alpha: f32, mode: TransMode) -> Result<&mut Self> {
        self.update(|d| {
            d.alpha = alpha;
            d.mode = mode;
        })
    }

    /// Sets the cell step.
    pub fn set_resolution(&mut self, resolution: usize) -> Result<&mut Self> {
        self.update(|d| d.resolution = resolution)
    }

    /// Replaces the source grid.
    pub fn set_grid(&mut self, grid: ScalarGrid) -> &mut Self {
        self.descr.grid = grid;
        self
    }

    /// Sets the local transform.
    pub fn set_transform(&mut self, transform: GridTransform) -> &mut Self {
        self.descr.transform = transform;
        self
    }

    fn update(&mut self, f: impl FnOnce(&mut IsosurfaceDescriptor)) -> Result<&mut Self> {
        let mut next = self.descr.clone();
        f(&mut next);
        next.validate()?;
        self.descr = next;
        Ok(self)
    }

    /// Re-extracts if the descriptor changed or `force` is set.
    ///
    /// Returns true when a rebuild happened. On failure the previous cache
    /// and cached descriptor stay in place.
    pub fn refresh(&mut self, force: bool, options: &VizOptions) -> Result<bool> {
        if !force && !self.is_stale() {
            return Ok(false);
        }
        match extract(&self.descr, options) {
            Ok(cache) => {
                self.cache = cache;
                self.cached_descr = Some(self.descr.clone());
                self.build_count += 1;
                log::debug!(
                    "extracted isosurface at level {} ({} triangles, build {})",
                    self.descr.level,
                    self.cache.ntri(),
                    self.build_count
                );
                Ok(true)
            }
            Err(err) => {
                log::error!("isosurface extraction failed, keeping previous surface: {err}");
                Err(err)
            }
        }
    }

    /// Brings the cache up to date and submits it.
    ///
    /// If the rebuild fails the previous surface is still submitted, with the
    /// alpha and mode it was built under, and the error is returned.
    pub fn draw(
        &mut self,
        force: bool,
        options: &VizOptions,
        sink: &mut dyn GeometrySink,
    ) -> Result<()> {
        let refreshed = self.refresh(force, options);
        self.submit(refreshed.is_ok(), options, sink)?;
        refreshed.map(|_| ())
    }

    fn submit(
        &mut self,
        current: bool,
        options: &VizOptions,
        sink: &mut dyn GeometrySink,
    ) -> Result<()> {
        if self.cache.is_empty() {
            return Ok(());
        }
        if !self.cache.normals_current() {
            self.cache.compute_normals(
                options.normal_mode,
                options.normal_epsilon,
                options.normal_axis_scale,
            )?;
        }
        let shown = match &self.cached_descr {
            Some(cached) if !current => cached,
            _ => &self.descr,
        };
        let (alpha, mode) = (shown.alpha, shown.mode);
        let vertices = self.cache.to_vertices()?;
        sink.draw_triangles(&vertices, alpha, mode);
        Ok(())
    }
}
