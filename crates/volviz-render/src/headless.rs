//! Headless collaborators for tests, batch rendering and demos.
//!
//! [`HeadlessBackend`] keeps textures in memory and records submitted
//! geometry instead of drawing it. [`FixedCamera`] reports a settable pose.

use std::collections::HashMap;

use volviz_core::{
    CameraPose, CameraSource, GeometrySink, IsoVertex, Result, SliceQuad, TextureBackend,
    TextureHandle, TransMode, VizError,
};

/// An in-memory RGBA texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessTexture {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Last written RGBA data.
    pub rgba: Vec<u8>,
    /// Whether the data has been committed.
    pub committed: bool,
}

/// One recorded `draw_triangles` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleBatch {
    /// Submitted vertices, three per triangle.
    pub vertices: Vec<IsoVertex>,
    /// Surface opacity.
    pub alpha: f32,
    /// Blending mode.
    pub mode: TransMode,
}

/// Texture store and geometry recorder with call counters.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u32,
    textures: HashMap<TextureHandle, HeadlessTexture>,
    allocation_limit: Option<usize>,
    allocations: usize,
    destroys: usize,
    batches: Vec<TriangleBatch>,
    quads: Vec<SliceQuad>,
}

impl HeadlessBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of textures alive at once; `None` removes the cap.
    ///
    /// Allocations beyond the cap fail with [`VizError::ResourceExhausted`].
    pub fn set_allocation_limit(&mut self, limit: Option<usize>) {
        self.allocation_limit = limit;
    }

    /// Number of textures currently alive.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Total successful allocations.
    #[must_use]
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Total destroyed textures.
    #[must_use]
    pub fn destroys(&self) -> usize {
        self.destroys
    }

    /// Looks up a live texture.
    #[must_use]
    pub fn texture(&self, handle: TextureHandle) -> Option<&HeadlessTexture> {
        self.textures.get(&handle)
    }

    /// Triangle batches recorded since the last [`clear_frame`](Self::clear_frame).
    #[must_use]
    pub fn triangle_batches(&self) -> &[TriangleBatch] {
        &self.batches
    }

    /// Quads recorded since the last [`clear_frame`](Self::clear_frame).
    #[must_use]
    pub fn quads(&self) -> &[SliceQuad] {
        &self.quads
    }

    /// Forgets recorded geometry; textures stay alive.
    pub fn clear_frame(&mut self) {
        self.batches.clear();
        self.quads.clear();
    }

    fn texture_mut(&mut self, handle: TextureHandle) -> Result<&mut HeadlessTexture> {
        self.textures
            .get_mut(&handle)
            .ok_or_else(|| VizError::Texture(format!("unknown texture {}", handle.0)))
    }
}

impl TextureBackend for HeadlessBackend {
    fn allocate(&mut self, width: u32, height: u32) -> Result<TextureHandle> {
        if self
            .allocation_limit
            .is_some_and(|limit| self.textures.len() >= limit)
        {
            return Err(VizError::ResourceExhausted(format!(
                "texture limit reached allocating {width}x{height}"
            )));
        }
        let handle = TextureHandle(self.next_id);
        self.next_id += 1;
        self.textures.insert(
            handle,
            HeadlessTexture {
                width,
                height,
                rgba: Vec::new(),
                committed: false,
            },
        );
        self.allocations += 1;
        Ok(handle)
    }

    fn write(&mut self, handle: TextureHandle, rgba: &[u8]) -> Result<()> {
        let texture = self.texture_mut(handle)?;
        let expected = texture.width as usize * texture.height as usize * 4;
        if rgba.len() != expected {
            return Err(VizError::SizeMismatch {
                expected,
                actual: rgba.len(),
            });
        }
        texture.rgba = rgba.to_vec();
        texture.committed = false;
        Ok(())
    }

    fn commit(&mut self, handle: TextureHandle) -> Result<()> {
        self.texture_mut(handle)?.committed = true;
        Ok(())
    }

    fn destroy(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle).is_some() {
            self.destroys += 1;
        }
    }
}

impl GeometrySink for HeadlessBackend {
    fn draw_triangles(&mut self, vertices: &[IsoVertex], alpha: f32, mode: TransMode) {
        self.batches.push(TriangleBatch {
            vertices: vertices.to_vec(),
            alpha,
            mode,
        });
    }

    fn draw_textured_quad(&mut self, quad: &SliceQuad) {
        self.quads.push(*quad);
    }
}

/// A camera that reports whatever pose it was last given.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCamera {
    pose: Option<CameraPose>,
}

impl FixedCamera {
    /// Creates a camera at `pose`.
    #[must_use]
    pub fn new(pose: CameraPose) -> Self {
        Self { pose: Some(pose) }
    }

    /// A camera that has no pose yet.
    #[must_use]
    pub fn unset() -> Self {
        Self { pose: None }
    }

    /// Moves the camera.
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.pose = Some(pose);
    }
}

impl CameraSource for FixedCamera {
    fn pose(&self) -> Option<CameraPose> {
        self.pose
    }
}
