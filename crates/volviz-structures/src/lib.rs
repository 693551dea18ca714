//! Visual entities for volviz.
//!
//! This crate provides the two kinds of entity a viewer registers:
//! - [`Isosurface`]: marching-cubes surface cached against its descriptor
//! - [`VolumeVisual`]: texture-sliced volume with progressive refinement

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

pub mod isosurface;
pub mod volume_visual;

pub use isosurface::{
    extract, ColorFn, ColorSource, Isosurface, IsosurfaceDescriptor, DEFAULT_ISOSURFACE_COLOR,
};
pub use volume_visual::{VolumeDescriptor, VolumeFrame, VolumeVisual};
