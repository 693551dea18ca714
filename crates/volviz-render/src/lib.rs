//! Slice-based volume rendering for volviz.
//!
//! This crate turns a [`ScalarGrid`](volviz_core::ScalarGrid) into a stack of
//! alpha-blended textured quads:
//! - View-dependent slicing axis and drawing order ([`select_axis`])
//! - Per-layer RGBA textures through a transfer function ([`SliceTextureSet`])
//! - Progressive stride and opacity compensation ([`ProgressiveQuality`])
//! - Quad generation and submission ([`draw_slices`])
//! - A headless texture store and geometry recorder ([`HeadlessBackend`])

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod headless;
pub mod progressive;
pub mod slice_axis;
pub mod slice_textures;
pub mod volume_render;

pub use headless::{FixedCamera, HeadlessBackend, HeadlessTexture, TriangleBatch};
pub use progressive::{compensated_alpha, ProgressiveQuality};
pub use slice_axis::{layer_count, select_axis, AxisSelection};
pub use slice_textures::{render_slice, slice_size, SliceImage, SliceTextureSet};
pub use volume_render::{draw_slices, slice_quad};
