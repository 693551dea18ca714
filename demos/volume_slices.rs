//! Renders a Gaussian blob as a slice stack while orbiting the camera.

use volviz::*;

fn main() -> Result<()> {
    init_logging();

    let dims = [48, 48, 32];
    let centre = Vec3::new(23.5, 23.5, 15.5);
    let grid = ScalarGrid::from_fn(dims, |i, j, k| {
        let d = Vec3::new(i as f32, j as f32, k as f32) - centre;
        (-d.length_squared() / 200.0).exp()
    })?;

    let mut ctx = VizContext::default();
    let colormap = ctx.color_maps().indexed("hot", 16, 271)?;
    let transfer = TransferFunction::ramp(0.0, 1.0, 0.0, 0.15);
    let blob = ctx.register_volume(VolumeDescriptor::new(grid, transfer))?;

    let mut textures = HeadlessBackend::new();
    let mut sink = HeadlessBackend::new();
    let mut camera = FixedCamera::unset();

    // Orbit for a few frames, then hold still and let the stack refine
    for frame in 0..60 {
        let angle = (frame.min(20) as f32) * 0.1;
        let position = centre + Vec3::new(angle.cos(), angle.sin(), 0.6) * 100.0;
        camera.set_pose(CameraPose::new(position, centre - position, Vec3::Z));

        sink.clear_frame();
        if let Some(drawn) =
            ctx.draw_volume(blob, false, None, &mut textures, &colormap, &camera, &mut sink)?
        {
            if drawn.rebuilt || frame % 10 == 0 {
                println!(
                    "frame {frame}: axis {} reverse {} stride {} alpha x{:.2} quads {}",
                    drawn.selection.axis.number(),
                    drawn.selection.reverse,
                    drawn.stride,
                    drawn.alpha_scale,
                    drawn.quads
                );
            }
        }
    }

    println!(
        "{} textures allocated, {} alive",
        textures.allocations(),
        textures.live_textures()
    );
    ctx.shutdown(&mut textures);
    Ok(())
}
