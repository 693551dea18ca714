//! volviz: isosurfaces and texture-sliced volume rendering for scalar fields.
//!
//! volviz is the visualization core of an interactive viewer for volumetric
//! data such as simulation or observational cubes. The host owns the window,
//! the GPU and the camera; volviz turns registered scalar grids into triangle
//! lists and textured quads and hands them to the host through the traits in
//! [`backend`].
//!
//! # Quick Start
//!
//! ```no_run
//! use volviz::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!     let mut ctx = VizContext::default();
//!
//!     // Distance from the centre of a 32^3 grid
//!     let grid = ScalarGrid::from_fn([32, 32, 32], |i, j, k| {
//!         Vec3::new(i as f32, j as f32, k as f32).distance(Vec3::splat(15.5))
//!     })?;
//!     let sphere = ctx.register_isosurface(IsosurfaceDescriptor::new(grid, 10.0))?;
//!
//!     // Each frame: draw into the host's geometry sink
//!     let mut sink = HeadlessBackend::new();
//!     ctx.draw_isosurface(sphere, false, &mut sink)?;
//!
//!     ctx.shutdown(&mut sink);
//!     Ok(())
//! }
//! ```
//!
//! # Entities
//!
//! - [`Isosurface`] - marching-cubes surface, re-extracted only when its
//!   [`IsosurfaceDescriptor`] changes
//! - [`VolumeVisual`] - stack of alpha-blended slices along the grid axis
//!   facing the camera, with progressive refinement while the view is still

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod context;
mod init;

pub use context::{IsosurfaceId, VizContext, VolumeId};
pub use init::init_logging;

// Re-export core types
pub use volviz_core::{
    backend, intensity_factor, AlphaSource, Axis, CameraPose, CameraSource, ColorMap,
    ColorMapRegistry, ColormapLookup, GeometrySink, GridRange, GridTransform, IndexedColorMap,
    IsoVertex, Mat4, NormalMode, ProgressiveOptions, Result, ScalarGrid, SliceQuad, SliceVertex,
    TextureBackend, TextureHandle, TransMode, TransferFunction, TriangleCache, Vec2, Vec3, Vec4,
    VizError, VizOptions,
};

// Re-export render types
pub use volviz_render::{
    select_axis, AxisSelection, FixedCamera, HeadlessBackend, HeadlessTexture, ProgressiveQuality,
    SliceTextureSet, TriangleBatch,
};

// Re-export structures
pub use volviz_structures::{
    ColorFn, ColorSource, Isosurface, IsosurfaceDescriptor, VolumeDescriptor, VolumeFrame,
    VolumeVisual,
};
