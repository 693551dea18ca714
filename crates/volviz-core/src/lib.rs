//! Core abstractions for volviz.
//!
//! This crate provides the leaf types used throughout volviz:
//! - [`ScalarGrid`] and [`GridTransform`] for caller-owned volumetric data
//! - [`TransferFunction`] and colour maps for scalar-to-RGBA mapping
//! - The marching-cubes polygonizer and [`TriangleCache`]
//! - Collaborator traits the host viewer implements (see [`backend`])
//! - Configuration options and errors

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Index names i, j, k follow the grid axes
#![allow(clippy::many_single_char_names)]

pub mod backend;
pub mod color_maps;
pub mod error;
pub mod grid;
pub mod marching_cubes;
pub mod options;
pub mod transfer;
pub mod transform;
pub mod triangle_cache;

pub use backend::{
    CameraPose, CameraSource, ColormapLookup, GeometrySink, IsoVertex, SliceQuad, SliceVertex,
    TextureBackend, TextureHandle, TransMode,
};
pub use color_maps::{ColorMap, ColorMapRegistry, IndexedColorMap};
pub use error::{Result, VizError};
pub use grid::{Axis, GridRange, ScalarGrid};
pub use marching_cubes::{polygonize, GridCell, Triangle};
pub use options::{NormalMode, ProgressiveOptions, VizOptions};
pub use transfer::{intensity_factor, AlphaSource, TransferFunction};
pub use transform::GridTransform;
pub use triangle_cache::{TriangleCache, MAX_SHARED_VERTICES};

// Re-export glam types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
