//! Scene renderer interface.
//!
//! The draw pass orchestrates *when* and *into what* scene content is
//! drawn; the actual drawing is an external collaborator behind the
//! [`SceneRenderer`] trait. Implementations receive the context (for the
//! bound target, pipeline state and viewport), the item list of the
//! partition being drawn, the camera, and optionally a depth texture to
//! test fragments against.
//!
//! [`SplatRenderer`] is the GPU-free reference implementation used by the
//! test-suite and the headless demo: each item covers the viewport as a
//! screen-aligned splat at its fixed depth, honoring the blend/depth
//! state exactly. It is deliberately trivial — the pipeline under test is
//! the pass choreography, not rasterization.

use crate::camera::Camera;
use crate::gpu::context::Context;
use crate::gpu::packing::pack_unit_to_rgba;
use crate::gpu::state::BlendMode;
use crate::gpu::texture::TextureKey;
use crate::scene::DrawItem;

/// The narrow interface the draw pass drives scene drawing through.
pub trait SceneRenderer {
    /// Toggle transparent-background compositing for this frame.
    fn set_transparent_background(&mut self, transparent: bool);

    /// Report the drawing-buffer size for pixel-scale effects.
    fn set_drawing_buffer_size(&mut self, width: u32, height: u32);

    /// Refresh camera-dependent state before a view is rendered.
    fn update(&mut self, camera: &Camera);

    /// Draw the opaque subset of `items` with depth write enabled.
    fn render_blended_opaque(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        camera: &Camera,
        depth_input: Option<TextureKey>,
    );

    /// Draw the transparent subset of `items`, alpha-blended, unordered.
    fn render_blended_transparent(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        camera: &Camera,
        depth_input: Option<TextureKey>,
    );

    /// Draw volumes with blending, depth-tested against `depth_input`.
    fn render_blended_volume(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        camera: &Camera,
        depth_input: Option<TextureKey>,
    );

    /// Draw the opaque subset of `items` for the WBOIT strategy.
    fn render_wboit_opaque(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        camera: &Camera,
        depth_input: Option<TextureKey>,
    );

    /// Accumulate the transparent subset of `items` into the bound WBOIT
    /// draw buffers, depth-tested against `depth_input`.
    fn render_wboit_transparent(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        camera: &Camera,
        depth_input: Option<TextureKey>,
    );

    /// Depth-only capture of `items` into the bound target's color
    /// attachment, for hardware that cannot sample depth textures.
    fn render_depth(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        camera: &Camera,
        depth_input: Option<TextureKey>,
    );

    /// Draw `items` with standard blended compositing, opaque content
    /// first. Used for helper overlays.
    fn render_blended(&mut self, ctx: &mut Context, items: &[DrawItem], camera: &Camera) {
        self.render_blended_opaque(ctx, items, camera, None);
        self.render_blended_transparent(ctx, items, camera, None);
    }
}

// ---------------------------------------------------------------------------
// SplatRenderer
// ---------------------------------------------------------------------------

/// How a splat writes the surfaces it covers.
enum SplatWrite {
    /// Color attachment 0, honoring the current blend mode.
    Color,
    /// Lattice-packed depth into color attachment 0.
    DepthCapture,
    /// Weighted accumulation into the (accumulation, revealage) pair.
    WboitAccumulate,
}

/// Reference renderer drawing each item as a fixed-depth viewport splat.
#[derive(Debug, Default)]
pub struct SplatRenderer {
    transparent_background: bool,
    drawing_buffer_size: (u32, u32),
}

impl SplatRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn transparent_background(&self) -> bool {
        self.transparent_background
    }

    #[inline]
    #[must_use]
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        self.drawing_buffer_size
    }

    /// WBOIT depth weight: nearer fragments count more.
    fn wboit_weight(depth: f32, alpha: f32) -> f32 {
        (alpha * (0.01 + (1.0 - depth).powi(3) * 3000.0)).min(300.0)
    }

    /// Rasterize `items` over the viewport of the bound target.
    fn splat(ctx: &mut Context, items: &[DrawItem], depth_input: Option<TextureKey>, write: SplatWrite) {
        if items.is_empty() {
            return;
        }

        let state = ctx.state();
        let viewport = ctx.viewport();
        let input_plane = depth_input.and_then(|key| ctx.depth_plane(key).ok());

        let bound = ctx.bound();
        let Ok(mut surfaces) = ctx.surfaces_mut(bound) else {
            log::warn!("SplatRenderer: bound target has no accessible surfaces");
            return;
        };

        let (width, height) = (surfaces.width as i32, surfaces.height as i32);
        let x0 = viewport.x.max(0);
        let y0 = viewport.y.max(0);
        let x1 = (viewport.x + viewport.width as i32).min(width);
        let y1 = (viewport.y + viewport.height as i32).min(height);

        for item in items {
            for y in y0..y1 {
                for x in x0..x1 {
                    let i = (y * width + x) as usize;

                    // Depth test: against the bound depth buffer and the
                    // provided depth texture, whichever is nearer.
                    let attachment = surfaces.depth.as_ref().map(|d| d[i]);
                    let input = input_plane.as_ref().map(|p| p[i]);
                    let reference = match (attachment, input) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                    if state.depth_test
                        && let Some(reference) = reference
                        && item.depth > reference
                    {
                        continue;
                    }

                    match write {
                        SplatWrite::Color => {
                            let surface = &mut surfaces.colors[0];
                            let texel = &mut surface.data[i * surface.channels..][..surface.channels];
                            blend_texel(texel, item.color, state.blend);
                            if state.depth_write
                                && let Some(depth) = surfaces.depth.as_deref_mut()
                            {
                                depth[i] = item.depth;
                            }
                        }
                        SplatWrite::DepthCapture => {
                            let packed = pack_unit_to_rgba(item.depth);
                            let surface = &mut surfaces.colors[0];
                            surface.data[i * 4..][..4].copy_from_slice(&packed);
                            if state.depth_write
                                && let Some(depth) = surfaces.depth.as_deref_mut()
                            {
                                depth[i] = item.depth;
                            }
                        }
                        SplatWrite::WboitAccumulate => {
                            let [r, g, b, a] = item.color;
                            let w = Self::wboit_weight(item.depth, a);
                            let accum = &mut surfaces.colors[0];
                            let texel = &mut accum.data[i * 4..][..4];
                            texel[0] += r * a * w;
                            texel[1] += g * a * w;
                            texel[2] += b * a * w;
                            texel[3] += a * w;
                            let reveal = &mut surfaces.colors[1];
                            reveal.data[i] *= 1.0 - a;
                        }
                    }
                }
            }
        }
    }
}

fn blend_texel(texel: &mut [f32], src: [f32; 4], blend: BlendMode) {
    match blend {
        BlendMode::Off => texel.copy_from_slice(&src[..texel.len()]),
        BlendMode::Alpha => {
            let a = src[3];
            let dst_a = if texel.len() == 4 { texel[3] } else { 1.0 };
            for (c, s) in texel.iter_mut().take(3).zip(src) {
                *c = s * a + *c * (1.0 - a);
            }
            if texel.len() == 4 {
                texel[3] = a + dst_a * (1.0 - a);
            }
        }
        BlendMode::Additive => {
            for (c, s) in texel.iter_mut().zip(src) {
                *c += s;
            }
        }
    }
}

impl SceneRenderer for SplatRenderer {
    fn set_transparent_background(&mut self, transparent: bool) {
        self.transparent_background = transparent;
    }

    fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        self.drawing_buffer_size = (width, height);
    }

    fn update(&mut self, _camera: &Camera) {
        // No per-view uniforms in the splat model; rasterization reads the
        // viewport from the context state.
    }

    fn render_blended_opaque(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        _camera: &Camera,
        depth_input: Option<TextureKey>,
    ) {
        let opaque: Vec<DrawItem> = items.iter().filter(|i| !i.is_transparent()).copied().collect();
        ctx.set_blend(BlendMode::Off);
        ctx.set_depth_test(true);
        ctx.set_depth_write(true);
        Self::splat(ctx, &opaque, depth_input, SplatWrite::Color);
    }

    fn render_blended_transparent(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        _camera: &Camera,
        depth_input: Option<TextureKey>,
    ) {
        let transparent: Vec<DrawItem> =
            items.iter().filter(|i| i.is_transparent()).copied().collect();
        ctx.set_blend(BlendMode::Alpha);
        ctx.set_depth_test(true);
        ctx.set_depth_write(false);
        Self::splat(ctx, &transparent, depth_input, SplatWrite::Color);
    }

    fn render_blended_volume(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        _camera: &Camera,
        depth_input: Option<TextureKey>,
    ) {
        ctx.set_blend(BlendMode::Alpha);
        ctx.set_depth_test(true);
        ctx.set_depth_write(true);
        Self::splat(ctx, items, depth_input, SplatWrite::Color);
    }

    fn render_wboit_opaque(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        camera: &Camera,
        depth_input: Option<TextureKey>,
    ) {
        self.render_blended_opaque(ctx, items, camera, depth_input);
    }

    fn render_wboit_transparent(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        _camera: &Camera,
        depth_input: Option<TextureKey>,
    ) {
        let transparent: Vec<DrawItem> =
            items.iter().filter(|i| i.is_transparent()).copied().collect();
        ctx.set_blend(BlendMode::Additive);
        ctx.set_depth_test(true);
        ctx.set_depth_write(false);
        Self::splat(ctx, &transparent, depth_input, SplatWrite::WboitAccumulate);
    }

    fn render_depth(
        &mut self,
        ctx: &mut Context,
        items: &[DrawItem],
        _camera: &Camera,
        depth_input: Option<TextureKey>,
    ) {
        // Transparent content never writes depth in the main passes, so
        // the capture mirrors that.
        let opaque: Vec<DrawItem> = items.iter().filter(|i| !i.is_transparent()).copied().collect();
        ctx.set_blend(BlendMode::Off);
        ctx.set_depth_test(true);
        ctx.set_depth_write(true);
        Self::splat(ctx, &opaque, depth_input, SplatWrite::DepthCapture);
    }
}
