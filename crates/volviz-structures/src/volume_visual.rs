//! Texture-sliced volume visuals.

use volviz_core::{
    Axis, CameraSource, ColormapLookup, GeometrySink, GridTransform, Result, ScalarGrid,
    TextureBackend, TransferFunction, VizError, VizOptions,
};
use volviz_render::{
    draw_slices, layer_count, select_axis, AxisSelection, ProgressiveQuality, SliceTextureSet,
};

/// Source data and transfer function of a volume visual.
#[derive(Debug, Clone)]
pub struct VolumeDescriptor {
    /// Source field, with its active range and index-to-world transform.
    pub grid: ScalarGrid,
    /// Scalar to RGBA mapping.
    pub transfer: TransferFunction,
    /// Local transform applied after the grid transform.
    pub transform: GridTransform,
}

impl VolumeDescriptor {
    /// A volume over `grid` mapped through `transfer`.
    pub fn new(grid: ScalarGrid, transfer: TransferFunction) -> Self {
        Self {
            grid,
            transfer,
            transform: GridTransform::IDENTITY,
        }
    }

    /// Sets the local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: GridTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Grid transform followed by the local transform.
    #[must_use]
    pub fn world_transform(&self) -> GridTransform {
        self.grid.transform().then(&self.transform)
    }

    /// Checks that the data range is usable.
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = (self.transfer.data_min, self.transfer.data_max);
        if !lo.is_finite() || !hi.is_finite() {
            return Err(VizError::InvalidArgument(format!(
                "volume data range must be finite, got {lo}..{hi}"
            )));
        }
        Ok(())
    }
}

/// What one volume draw did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeFrame {
    /// Slicing axis and order used.
    pub selection: AxisSelection,
    /// Whether the slice textures were rebuilt this frame.
    pub rebuilt: bool,
    /// Layer stride used.
    pub stride: u32,
    /// Opacity multiplier handed to every quad.
    pub alpha_scale: f32,
    /// Number of quads submitted.
    pub quads: usize,
}

/// A volume entity: descriptor, slice textures and progressive state.
///
/// Owns its textures; call [`release`](Self::release) before dropping it.
#[derive(Debug)]
pub struct VolumeVisual {
    descr: VolumeDescriptor,
    textures: SliceTextureSet,
    progressive: ProgressiveQuality,
    selection: Option<AxisSelection>,
    reload_pending: bool,
}

impl VolumeVisual {
    /// Creates a volume visual. No textures exist until the first draw.
    pub fn new(descr: VolumeDescriptor) -> Result<Self> {
        descr.validate()?;
        Ok(Self {
            descr,
            textures: SliceTextureSet::new(),
            progressive: ProgressiveQuality::new(),
            selection: None,
            reload_pending: false,
        })
    }

    /// The current descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &VolumeDescriptor {
        &self.descr
    }

    /// The slice textures.
    #[must_use]
    pub fn textures(&self) -> &SliceTextureSet {
        &self.textures
    }

    /// Axis and order of the last draw, `None` before the first.
    #[must_use]
    pub fn selection(&self) -> Option<AxisSelection> {
        self.selection
    }

    /// The progressive quality state.
    #[must_use]
    pub fn progressive(&self) -> &ProgressiveQuality {
        &self.progressive
    }

    /// Replaces the transfer function; textures are rebuilt on the next draw.
    pub fn set_transfer_function(&mut self, transfer: TransferFunction) -> Result<&mut Self> {
        let next = VolumeDescriptor {
            transfer,
            ..self.descr.clone()
        };
        next.validate()?;
        self.descr = next;
        self.reload_pending = true;
        Ok(self)
    }

    /// Orders `axis` for the camera; without a pose layers run upward.
    fn oriented(
        axis: Axis,
        camera: &dyn CameraSource,
        transform: &GridTransform,
    ) -> AxisSelection {
        let dir = transform.normalized_basis()[axis.index()];
        AxisSelection {
            axis,
            reverse: camera
                .pose()
                .is_some_and(|p| p.view_direction.dot(dir) > 0.0),
        }
    }

    /// Picks the axis for this frame.
    ///
    /// An override keeps the camera's drawing order when a camera exists.
    fn choose_axis(
        axis_override: Option<Axis>,
        camera: &dyn CameraSource,
        transform: &GridTransform,
    ) -> Option<AxisSelection> {
        match axis_override {
            Some(axis) => Some(Self::oriented(axis, camera, transform)),
            None => select_axis(camera.pose()?.view_direction, transform),
        }
    }

    /// Advances progressive state and submits the slice stack along `selection`.
    ///
    /// Returns the stride, alpha scale and quad count used.
    #[allow(clippy::too_many_arguments)]
    fn submit(
        &mut self,
        selection: AxisSelection,
        full_stack: bool,
        force: bool,
        options: &VizOptions,
        camera: &dyn CameraSource,
        transform: &GridTransform,
        sink: &mut dyn GeometrySink,
    ) -> (u32, f32, usize) {
        let range = self.descr.grid.range();
        let a = selection.axis.index();
        let (stride, alpha_scale) = if full_stack {
            (1, 1.0)
        } else {
            let stride = self
                .progressive
                .update(camera.pose(), force, &options.progressive);
            let layers = range.extent(selection.axis);
            let drawn = layer_count(range.lo[a], range.hi[a], stride as usize);
            (
                stride,
                self.progressive
                    .alpha_scale(&options.progressive, layers, drawn),
            )
        };

        let quads = draw_slices(
            selection,
            &range,
            transform,
            &self.textures,
            stride,
            alpha_scale,
            sink,
        );
        (stride, alpha_scale, quads)
    }

    /// Draws the volume for this frame.
    ///
    /// Returns `Ok(None)` without drawing when no axis can be chosen yet
    /// (no camera pose and no override). An axis override draws every layer
    /// at full opacity, bypassing progressive refinement.
    ///
    /// When the slice textures cannot be rebuilt the previous set stays in
    /// place and is still drawn along its own axis before the error is
    /// returned.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        force: bool,
        axis_override: Option<Axis>,
        options: &VizOptions,
        backend: &mut dyn TextureBackend,
        colormap: &dyn ColormapLookup,
        camera: &dyn CameraSource,
        sink: &mut dyn GeometrySink,
    ) -> Result<Option<VolumeFrame>> {
        let transform = self.descr.world_transform();
        let Some(selection) = Self::choose_axis(axis_override, camera, &transform) else {
            log::debug!("no camera pose yet, skipping volume draw");
            return Ok(None);
        };

        let reload = force || self.reload_pending;
        let ensured = self.textures.ensure(
            selection.axis,
            reload,
            &self.descr.grid,
            &self.descr.transfer,
            colormap,
            options.axis_scale_override,
            backend,
        );
        let rebuilt = match ensured {
            Ok(rebuilt) => rebuilt,
            Err(err) => {
                if let Some(axis) = self.textures.axis() {
                    let kept = Self::oriented(axis, camera, &transform);
                    let full_stack = axis_override.is_some();
                    self.submit(kept, full_stack, force, options, camera, &transform, sink);
                    log::warn!(
                        "volume drawn from retained axis {} textures after failed rebuild",
                        axis.number()
                    );
                }
                return Err(err);
            }
        };
        self.reload_pending = false;
        self.selection = Some(selection);

        let full_stack = axis_override.is_some();
        let (stride, alpha_scale, quads) =
            self.submit(selection, full_stack, force, options, camera, &transform, sink);

        Ok(Some(VolumeFrame {
            selection,
            rebuilt,
            stride,
            alpha_scale,
            quads,
        }))
    }

    /// Destroys all slice textures.
    pub fn release(&mut self, backend: &mut dyn TextureBackend) {
        self.textures.release(backend);
        self.progressive.reset();
        self.selection = None;
    }
}
