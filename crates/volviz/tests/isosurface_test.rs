//! Isosurface integration tests for volviz.
//!
//! Each test owns its own `VizContext`, so tests run independently and in
//! parallel.

use std::collections::HashMap;
use std::sync::Arc;

use volviz::*;

/// Distance from the world origin, sampled 4 nodes per unit over `[-3, 3]^3`.
#[allow(clippy::cast_precision_loss)]
fn sphere_grid() -> ScalarGrid {
    let spacing = 0.25;
    let origin = Vec3::splat(-3.0);
    ScalarGrid::from_fn([25, 25, 25], |i, j, k| {
        (origin + Vec3::new(i as f32, j as f32, k as f32) * spacing).length()
    })
    .unwrap()
    .with_transform(GridTransform::from_origin_spacing(origin, Vec3::splat(spacing)))
}

fn key(p: [f32; 3]) -> [u32; 3] {
    p.map(f32::to_bits)
}

#[test]
fn test_repeated_draw_does_not_rebuild() {
    let _ = init_logging();
    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(sphere_grid(), 2.0))
        .unwrap();

    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    let ntri = ctx.isosurface(id).unwrap().cache().ntri();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();

    let iso = ctx.isosurface(id).unwrap();
    assert_eq!(iso.build_count(), 1);
    assert_eq!(iso.cache().ntri(), ntri);
    assert_eq!(sink.triangle_batches().len(), 3);

    ctx.draw_isosurface(id, true, &mut sink).unwrap();
    assert_eq!(ctx.isosurface(id).unwrap().build_count(), 2);
}

#[test]
fn test_sphere_is_watertight_with_correct_area() {
    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(sphere_grid(), 2.0))
        .unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();

    let vertices = &sink.triangle_batches()[0].vertices;
    assert!(!vertices.is_empty());
    assert_eq!(vertices.len() % 3, 0);

    // Every undirected edge is shared by exactly two triangles
    let mut edges: HashMap<([u32; 3], [u32; 3]), usize> = HashMap::new();
    for tri in vertices.chunks_exact(3) {
        for n in 0..3 {
            let a = key(tri[n].position);
            let b = key(tri[(n + 1) % 3].position);
            assert_ne!(a, b, "degenerate triangle edge");
            let edge = if a < b { (a, b) } else { (b, a) };
            *edges.entry(edge).or_default() += 1;
        }
    }
    let open = edges.values().filter(|&&count| count != 2).count();
    assert_eq!(open, 0, "{open} edges are not shared by exactly two triangles");

    let area = ctx.isosurface(id).unwrap().cache().surface_area();
    let expected = 16.0 * std::f32::consts::PI;
    assert!(
        (area - expected).abs() / expected < 0.05,
        "area {area} vs {expected}"
    );
}

#[test]
#[allow(clippy::cast_precision_loss)]
fn test_minimal_4x4x4_sphere_is_an_open_shell() {
    // Radius 2 about the centre of 4 nodes: the grid clips the sphere
    let centre = Vec3::splat(1.5);
    let grid = ScalarGrid::from_fn([4, 4, 4], |i, j, k| {
        Vec3::new(i as f32, j as f32, k as f32).distance(centre)
    })
    .unwrap();
    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(grid, 2.0))
        .unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();

    // 8 corner cells with 4 triangles, 12 edge cells with 2, none elsewhere
    let cache = ctx.isosurface(id).unwrap().cache();
    assert_eq!(cache.ntri(), 56);
    assert!(cache
        .triangles()
        .iter()
        .flatten()
        .all(|p| p.cmpge(Vec3::ZERO).all() && p.cmple(Vec3::splat(3.0)).all()));

    let mut edges: HashMap<([u32; 3], [u32; 3]), usize> = HashMap::new();
    for tri in sink.triangle_batches()[0].vertices.chunks_exact(3) {
        for n in 0..3 {
            let a = key(tri[n].position);
            let b = key(tri[(n + 1) % 3].position);
            let edge = if a < b { (a, b) } else { (b, a) };
            *edges.entry(edge).or_default() += 1;
        }
    }
    let shared = edges.values().filter(|&&count| count == 2).count();
    let boundary = edges.values().filter(|&&count| count == 1).count();
    assert_eq!((shared, boundary, edges.len()), (60, 48, 108));
}

#[test]
fn test_smoothed_normals_are_radial() {
    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(sphere_grid(), 2.0))
        .unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();

    let max_angle = 8.0_f32.to_radians();
    for v in &sink.triangle_batches()[0].vertices {
        let radial = Vec3::from_array(v.position).normalize();
        let normal = Vec3::from_array(v.normal);
        assert!((normal.length() - 1.0).abs() < 1e-4);
        // Normals point toward decreasing field values, i.e. inward
        let angle = normal.dot(-radial).clamp(-1.0, 1.0).acos();
        assert!(
            angle < max_angle,
            "normal {normal:?} at {:?} is {}° off radial",
            v.position,
            angle.to_degrees()
        );
    }
}

#[test]
fn test_flat_normals_option() {
    let options = VizOptions::from_json(r#"{ "normal_mode": "Flat" }"#).unwrap();
    let mut ctx = VizContext::new(options);
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(sphere_grid(), 2.0))
        .unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    for tri in sink.triangle_batches()[0].vertices.chunks_exact(3) {
        assert_eq!(tri[0].normal, tri[1].normal);
        assert_eq!(tri[1].normal, tri[2].normal);
    }
}

#[test]
fn test_parameter_updates_trigger_one_rebuild_each() {
    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(sphere_grid(), 2.0))
        .unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    let small = ctx.isosurface(id).unwrap().cache().surface_area();

    ctx.set_isosurface_level(id, 2.5).unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    let iso = ctx.isosurface(id).unwrap();
    assert_eq!(iso.build_count(), 2);
    assert!(iso.cache().surface_area() > small);

    ctx.set_isosurface_alpha(id, 0.5, TransMode::Transparent).unwrap();
    ctx.set_isosurface_resolution(id, 2).unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    assert_eq!(ctx.isosurface(id).unwrap().build_count(), 3);
    let last = sink.triangle_batches().last().unwrap();
    assert_eq!(last.alpha, 0.5);
    assert_eq!(last.mode, TransMode::Transparent);
}

#[test]
fn test_color_function() {
    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(sphere_grid(), 2.0))
        .unwrap();
    let upper: ColorFn = Arc::new(|c: Vec3| if c.z > 0.0 { Vec3::X } else { Vec3::Z });
    ctx.set_isosurface_color_fn(id, upper).unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();

    for tri in sink.triangle_batches()[0].vertices.chunks_exact(3) {
        let centroid_z = tri.iter().map(|v| v.position[2]).sum::<f32>() / 3.0;
        let expected = if centroid_z > 0.0 { [1.0, 0.0, 0.0] } else { [0.0, 0.0, 1.0] };
        // Centroids right at z = 0 may round either way
        if centroid_z.abs() > 1e-4 {
            assert_eq!(tri[0].color, expected);
        }
    }
}

#[test]
fn test_grid_replacement_and_sub_range() {
    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(sphere_grid(), 2.0))
        .unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    let full = ctx.isosurface(id).unwrap().cache().ntri();

    // Upper half in k only
    let half = sphere_grid()
        .with_range(GridRange::new([0, 0, 12], [24, 24, 24]))
        .unwrap();
    ctx.set_isosurface_grid(id, half).unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    let iso = ctx.isosurface(id).unwrap();
    assert_eq!(iso.build_count(), 2);
    assert!(iso.cache().ntri() < full);
    assert!(iso
        .cache()
        .triangles()
        .iter()
        .flatten()
        .all(|p| p.z >= -1e-6));
}

#[test]
fn test_invalid_arguments_are_no_ops() {
    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();
    let id = ctx
        .register_isosurface(IsosurfaceDescriptor::new(sphere_grid(), 2.0))
        .unwrap();
    ctx.draw_isosurface(id, false, &mut sink).unwrap();

    assert!(matches!(
        ctx.set_isosurface_resolution(id, 0),
        Err(VizError::InvalidArgument(_))
    ));
    assert!(matches!(
        ctx.draw_isosurface(IsosurfaceId(999), false, &mut sink),
        Err(VizError::UnknownIsosurface(999))
    ));
    // The rejected update left the surface untouched
    ctx.draw_isosurface(id, false, &mut sink).unwrap();
    assert_eq!(ctx.isosurface(id).unwrap().build_count(), 1);
}
