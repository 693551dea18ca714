//! Interfaces to the surrounding viewer.
//!
//! The visualization core never talks to a graphics API directly. Textures,
//! colour tables, the camera and geometry submission are reached through the
//! traits in this module, implemented by the host application (or by the
//! headless backend in `volviz-render` for tests and batch use).

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque handle to a 2-D RGBA texture owned by a [`TextureBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Texture lifecycle provided by the host.
pub trait TextureBackend {
    /// Allocates a `width` x `height` RGBA8 texture.
    fn allocate(&mut self, width: u32, height: u32) -> Result<TextureHandle>;

    /// Writes `width * height * 4` bytes of RGBA data into the texture.
    fn write(&mut self, handle: TextureHandle, rgba: &[u8]) -> Result<()>;

    /// Uploads the written data so the texture can be drawn.
    fn commit(&mut self, handle: TextureHandle) -> Result<()>;

    /// Releases the texture. Unknown handles are ignored.
    fn destroy(&mut self, handle: TextureHandle);
}

/// Indexed colour table provided by the host.
pub trait ColormapLookup {
    /// The active colour-index range `(c1, c2)`, inclusive.
    fn color_index_range(&self) -> (u32, u32);

    /// RGB colour (components in `[0, 1]`) of a colour index.
    fn color(&self, index: u32) -> Vec3;
}

/// Camera position and orientation in the same space as the volume transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Eye position.
    pub position: Vec3,
    /// Direction the camera looks along.
    pub view_direction: Vec3,
    /// Up vector.
    pub up: Vec3,
}

impl CameraPose {
    /// Creates a pose looking from `position` along `view_direction`.
    #[must_use]
    pub fn new(position: Vec3, view_direction: Vec3, up: Vec3) -> Self {
        Self {
            position,
            view_direction,
            up,
        }
    }

    /// Returns true when every component of both poses differs by at most `epsilon`.
    #[must_use]
    pub fn approx_eq(&self, other: &CameraPose, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && self.view_direction.abs_diff_eq(other.view_direction, epsilon)
            && self.up.abs_diff_eq(other.up, epsilon)
    }
}

/// Camera query provided by the host.
pub trait CameraSource {
    /// The current camera pose, or `None` before a camera exists.
    fn pose(&self) -> Option<CameraPose>;
}

/// Blending mode used when drawing isosurface triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransMode {
    /// Opaque surface, alpha ignored.
    #[default]
    Opaque,
    /// Standard alpha blending.
    Transparent,
    /// Additive blending (glowing shells).
    Additive,
}

/// One isosurface vertex as submitted to the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IsoVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Unit normal.
    pub normal: [f32; 3],
    /// RGB colour.
    pub color: [f32; 3],
}

/// One corner of a slice quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SliceVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Texture coordinate.
    pub tex_coord: [f32; 2],
}

/// A textured, alpha-blended quad covering one volume layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceQuad {
    /// Texture holding the layer.
    pub texture: TextureHandle,
    /// Corners in drawing order.
    pub vertices: [SliceVertex; 4],
    /// Opacity multiplier applied to every texel.
    pub alpha: f32,
}

/// Geometry submission provided by the host.
pub trait GeometrySink {
    /// Draws a triangle list (3 vertices per triangle) with per-vertex colour and normal.
    fn draw_triangles(&mut self, vertices: &[IsoVertex], alpha: f32, mode: TransMode);

    /// Draws one alpha-blended textured quad.
    fn draw_textured_quad(&mut self, quad: &SliceQuad);
}
