//! Headless pipeline demo.
//!
//! Runs the full draw pipeline on the reference backend — no window, no
//! GPU — and prints what the frame produced. Run with:
//!
//! ```sh
//! RUST_LOG=debug cargo run --example headless
//! ```

use glaze::passes::AntialiasProps;
use glaze::{
    Camera, Capabilities, Context, DrawItem, DrawPass, Helper, OcclusionProps, OutlineProps,
    PostprocessingProps, RenderCamera, Scene, SplatRenderer, Viewport,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

fn main() -> glaze::Result<()> {
    env_logger::init();

    let mut ctx = Context::new(WIDTH, HEIGHT, Capabilities::modern())?;
    let mut pass = DrawPass::new(&mut ctx, WIDTH, HEIGHT, true)?;
    let mut renderer = SplatRenderer::new();

    let camera = Camera::perspective(
        60.0_f32.to_radians(),
        0.1,
        100.0,
        Viewport::full(WIDTH, HEIGHT),
    );

    let scene = Scene::new(
        vec![
            DrawItem::new(1, [0.8, 0.1, 0.1, 1.0], 0.5),
            DrawItem::new(2, [0.1, 0.8, 0.1, 0.4], 0.3),
        ],
        vec![DrawItem::new(3, [0.2, 0.2, 0.9, 1.0], 0.7)],
    );

    let props = PostprocessingProps {
        occlusion: OcclusionProps { enabled: true, ..Default::default() },
        outline: OutlineProps { enabled: true, ..Default::default() },
        antialias: AntialiasProps { enabled: true, ..Default::default() },
    };

    pass.render(
        &mut ctx,
        &mut renderer,
        RenderCamera::Mono(&camera),
        &scene,
        &Helper::default(),
        true,
        [0.05, 0.05, 0.08, 1.0],
        false,
        &props,
    );

    let presentation = ctx.presentation();
    let pixels = ctx.read_pixels(presentation.key())?;
    let center = ((HEIGHT / 2 * WIDTH + WIDTH / 2) * 16) as usize;
    let texel: &[f32] = bytemuck::cast_slice(&pixels[center..center + 16]);

    println!(
        "rendered {}x{} frame ({} trace events), center texel {:?}",
        pass.width(),
        pass.height(),
        ctx.trace().len(),
        texel,
    );
    Ok(())
}
