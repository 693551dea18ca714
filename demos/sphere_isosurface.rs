//! Extracts the isosurfaces of a distance field and reports what was drawn.
//!
//! Run with `RUST_LOG=debug` to see the extraction log.

use std::sync::Arc;

use volviz::*;

fn main() -> Result<()> {
    init_logging();

    // Distance from the origin, 4 nodes per unit over [-3, 3]^3
    let spacing = 0.25;
    let origin = Vec3::splat(-3.0);
    let grid = ScalarGrid::from_fn([25, 25, 25], |i, j, k| {
        (origin + Vec3::new(i as f32, j as f32, k as f32) * spacing).length()
    })?
    .with_transform(GridTransform::from_origin_spacing(origin, Vec3::splat(spacing)));

    let mut ctx = VizContext::default();
    let mut sink = HeadlessBackend::new();

    let sphere = ctx.register_isosurface(IsosurfaceDescriptor::new(grid.clone(), 2.0))?;
    ctx.draw_isosurface(sphere, false, &mut sink)?;
    if let Some(iso) = ctx.isosurface(sphere) {
        let area = iso.cache().surface_area();
        println!(
            "r = 2.0: {} triangles, area {area:.3} (exact {:.3})",
            iso.cache().ntri(),
            16.0 * std::f32::consts::PI
        );
    }

    // Colour by height and grow the shell
    let by_height: ColorFn = Arc::new(|c: Vec3| {
        let t = (c.z / 3.0 + 1.0) * 0.5;
        Vec3::new(t, 0.2, 1.0 - t)
    });
    ctx.set_isosurface_color_fn(sphere, by_height)?;
    ctx.set_isosurface_level(sphere, 2.75)?;
    ctx.draw_isosurface(sphere, false, &mut sink)?;

    // A coarse, translucent inner shell
    let inner = ctx.register_isosurface(
        IsosurfaceDescriptor::new(grid, 1.0)
            .with_resolution(2)
            .with_alpha(0.4, TransMode::Transparent),
    )?;
    ctx.draw_isosurface(inner, false, &mut sink)?;

    for (n, batch) in sink.triangle_batches().iter().enumerate() {
        println!(
            "batch {n}: {} triangles, alpha {} ({:?})",
            batch.vertices.len() / 3,
            batch.alpha,
            batch.mode
        );
    }

    ctx.shutdown(&mut sink);
    Ok(())
}
