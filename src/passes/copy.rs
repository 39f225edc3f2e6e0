//! Copy Pass
//!
//! Replays a color+depth source pair verbatim into the currently bound
//! target. Runs only when antialiasing is disabled and the frame, having
//! been produced offscreen, must still reach the presentation surface.
//!
//! The depth side reads the canonical (merged) depth and rewrites it into
//! the destination depth buffer, so a presented frame carries scene depth
//! for anything composited on top of it later.

use crate::gpu::context::Context;
use crate::gpu::texture::TextureKey;
use crate::gpu::trace::TraceEvent;

/// Stateless full-screen color+depth copy.
pub struct CopyPass {
    color_src: TextureKey,
    depth_src: TextureKey,
    width: u32,
    height: u32,
}

impl CopyPass {
    #[must_use]
    pub fn new(color_src: TextureKey, depth_src: TextureKey, width: u32, height: u32) -> Self {
        Self { color_src, depth_src, width, height }
    }

    #[must_use]
    pub fn name() -> &'static str {
        "copy"
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Copy the source pair into the bound target.
    pub fn run(&self, ctx: &mut Context) {
        let Ok(color) = ctx.texture_data(self.color_src).map(<[f32]>::to_vec) else {
            log::warn!("CopyPass: color source missing");
            return;
        };
        let depth = ctx.depth_plane(self.depth_src).ok();

        let bound = ctx.bound();
        let Ok(mut surfaces) = ctx.surfaces_mut(bound) else {
            return;
        };

        debug_assert_eq!((surfaces.width, surfaces.height), (self.width, self.height));

        let output = &mut surfaces.colors[0];
        let len = output.data.len().min(color.len());
        output.data[..len].copy_from_slice(&color[..len]);

        if let (Some(dst), Some(src)) = (surfaces.depth.as_deref_mut(), depth) {
            let len = dst.len().min(src.len());
            dst[..len].copy_from_slice(&src[..len]);
        }
        drop(surfaces);

        ctx.record(TraceEvent::FullscreenPass(Self::name()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::context::Capabilities;
    use crate::gpu::state::ClearFlags;
    use crate::gpu::texture::{FilterMode, TextureFormat};

    #[test]
    fn copies_color_and_depth_verbatim() {
        let mut ctx = Context::new(2, 2, Capabilities::modern()).unwrap();
        let src = ctx
            .create_render_target(2, 2, false, TextureFormat::Rgba8Unorm, FilterMode::Linear)
            .unwrap();
        let depth_src = ctx
            .create_render_target(2, 2, false, TextureFormat::Rgba16Float, FilterMode::Nearest)
            .unwrap();

        // Seed the sources through regular clears.
        ctx.bind(src.key());
        ctx.set_clear_color([0.1, 0.2, 0.3, 1.0]);
        ctx.clear(ClearFlags::COLOR);
        ctx.bind(depth_src.key());
        ctx.set_clear_color([0.5, 0.0, 0.0, 1.0]);
        ctx.clear(ClearFlags::COLOR);

        let copy = CopyPass::new(src.color_texture(), depth_src.color_texture(), 2, 2);
        let dst = ctx.presentation();
        ctx.bind(dst.key());
        copy.run(&mut ctx);

        let color = ctx.texture_data(dst.color_texture()).unwrap();
        assert_eq!(&color[..4], &[0.1, 0.2, 0.3, 1.0]);
        let depth = ctx.texture_data(dst.depth_texture().unwrap()).unwrap();
        assert!(depth.iter().all(|&d| (d - 0.5).abs() < 1e-6));
        assert_eq!(ctx.trace().iter().filter(|e| e.is_pass("copy")).count(), 1);
    }
}
