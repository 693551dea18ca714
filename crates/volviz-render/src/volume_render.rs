//! Submission of ordered slice quads.

use glam::Vec3;
use volviz_core::{GeometrySink, GridRange, GridTransform, SliceQuad, SliceVertex, TextureHandle};

use crate::slice_axis::AxisSelection;
use crate::slice_textures::SliceTextureSet;

/// Builds the world-space quad for `layer` (absolute index along the slice axis).
///
/// The quad spans the active range of the two remaining axes. Texture
/// coordinates are inset by half a texel so texel centres land on grid nodes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn slice_quad(
    selection: AxisSelection,
    layer: usize,
    range: &GridRange,
    transform: &GridTransform,
    texture: TextureHandle,
    (width, height): (u32, u32),
    alpha: f32,
) -> SliceQuad {
    let (u_axis, v_axis) = selection.axis.others();
    let (u, v) = (u_axis.index(), v_axis.index());

    let corner = |cu: usize, cv: usize| {
        let mut idx = [0.0_f32; 3];
        idx[selection.axis.index()] = layer as f32;
        idx[u] = cu as f32;
        idx[v] = cv as f32;
        transform.apply(Vec3::from_array(idx)).to_array()
    };

    let half_u = 0.5 / width.max(1) as f32;
    let half_v = 0.5 / height.max(1) as f32;
    let (s0, s1) = (half_u, 1.0 - half_u);
    let (t0, t1) = (half_v, 1.0 - half_v);

    let (lo, hi) = (range.lo, range.hi);
    SliceQuad {
        texture,
        vertices: [
            SliceVertex {
                position: corner(lo[u], lo[v]),
                tex_coord: [s0, t0],
            },
            SliceVertex {
                position: corner(hi[u], lo[v]),
                tex_coord: [s1, t0],
            },
            SliceVertex {
                position: corner(hi[u], hi[v]),
                tex_coord: [s1, t1],
            },
            SliceVertex {
                position: corner(lo[u], hi[v]),
                tex_coord: [s0, t1],
            },
        ],
        alpha,
    }
}

/// Draws every `stride`-th layer back to front. Returns the number of quads submitted.
///
/// Layers without a texture (the set was built for another range) are skipped.
pub fn draw_slices(
    selection: AxisSelection,
    range: &GridRange,
    transform: &GridTransform,
    textures: &SliceTextureSet,
    stride: u32,
    alpha: f32,
    sink: &mut dyn GeometrySink,
) -> usize {
    let a = selection.axis.index();
    let (lo, hi) = (range.lo[a], range.hi[a]);
    let mut drawn = 0;
    for layer in selection.layers(lo, hi, stride as usize) {
        let Some(texture) = textures.handle(layer - lo) else {
            continue;
        };
        let quad = slice_quad(
            selection,
            layer,
            range,
            transform,
            texture,
            textures.texture_size(),
            alpha,
        );
        sink.draw_textured_quad(&quad);
        drawn += 1;
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use volviz_core::Axis;

    #[test]
    fn test_quad_corners_follow_transform() {
        let sel = AxisSelection {
            axis: Axis::K,
            reverse: false,
        };
        let range = GridRange::new([0, 0, 0], [3, 1, 5]);
        let tr =
            GridTransform::from_origin_spacing(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 0.5));
        let quad = slice_quad(sel, 4, &range, &tr, TextureHandle(7), (4, 2), 0.3);
        assert_eq!(quad.vertices[0].position, [1.0, 0.0, 2.0]);
        assert_eq!(quad.vertices[2].position, [7.0, 1.0, 2.0]);
        assert_eq!(quad.vertices[0].tex_coord, [0.125, 0.25]);
        assert_eq!(quad.vertices[2].tex_coord, [0.875, 0.75]);
        assert_eq!(quad.texture, TextureHandle(7));
        assert_eq!(quad.alpha, 0.3);
    }

    #[test]
    fn test_quad_for_axis_i_spans_j_and_k() {
        let sel = AxisSelection {
            axis: Axis::I,
            reverse: true,
        };
        let range = GridRange::new([0, 1, 2], [4, 3, 6]);
        let id = GridTransform::IDENTITY;
        let quad = slice_quad(sel, 2, &range, &id, TextureHandle(0), (3, 5), 1.0);
        assert_eq!(quad.vertices[0].position, [2.0, 1.0, 2.0]);
        assert_eq!(quad.vertices[1].position, [2.0, 3.0, 2.0]);
        assert_eq!(quad.vertices[3].position, [2.0, 1.0, 6.0]);
    }
}
