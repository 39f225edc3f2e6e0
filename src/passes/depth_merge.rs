//! Depth Merge Pass
//!
//! Folds two independently rendered depth sources — primitives and
//! volumes — into the canonical depth buffer by per-pixel nearest-wins
//! selection. Primitives and volumes are rendered with separate depth
//! state (ray-marched volumes write depth differently than surface
//! geometry), so downstream consumers always read the merged result.
//!
//! # Data Flow
//!
//! ```text
//! primitive depth ──┐
//!                   ├──► DepthMergePass ──► canonical depth target
//! volume depth ─────┘
//! ```
//!
//! The pass is stateless per invocation and always fully overwrites the
//! bound target: blending, depth testing, depth writes and face culling
//! are disabled for its duration.

use crate::gpu::context::Context;
use crate::gpu::packing::encode_depth;
use crate::gpu::state::BlendMode;
use crate::gpu::texture::TextureKey;
use crate::gpu::trace::TraceEvent;

/// Full-screen nearest-wins depth merge.
pub struct DepthMergePass {
    primitives_depth: TextureKey,
    volumes_depth: TextureKey,
    /// Whether the canonical output uses the packed encoding.
    packed_depth: bool,
    width: u32,
    height: u32,
}

impl DepthMergePass {
    #[must_use]
    pub fn new(
        primitives_depth: TextureKey,
        volumes_depth: TextureKey,
        packed_depth: bool,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            primitives_depth,
            volumes_depth,
            packed_depth,
            width,
            height,
        }
    }

    #[must_use]
    pub fn name() -> &'static str {
        "depth-merge"
    }

    /// Update the uniform dimensions after a viewport change. The input
    /// textures are resized in place by their owner, so the keys stay
    /// valid.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Merge both depth sources into the currently bound target.
    pub fn run(&self, ctx: &mut Context) {
        ctx.set_blend(BlendMode::Off);
        ctx.set_depth_test(false);
        ctx.set_depth_write(false);
        ctx.set_cull(false);

        let Ok(primitives) = ctx.depth_plane(self.primitives_depth) else {
            log::warn!("DepthMergePass: primitive depth source missing");
            return;
        };
        let Ok(volumes) = ctx.depth_plane(self.volumes_depth) else {
            log::warn!("DepthMergePass: volume depth source missing");
            return;
        };

        let packed = self.packed_depth;
        let bound = ctx.bound();
        let Ok(mut surfaces) = ctx.surfaces_mut(bound) else {
            return;
        };

        debug_assert_eq!(surfaces.width, self.width);
        debug_assert_eq!(surfaces.height, self.height);

        let output = &mut surfaces.colors[0];
        let channels = output.channels;
        for (i, texel) in output.data.chunks_exact_mut(channels).enumerate() {
            let merged = primitives[i].min(volumes[i]);
            let encoded = encode_depth(packed, merged);
            texel.copy_from_slice(&encoded[..channels]);
        }
        drop(surfaces);

        ctx.record(TraceEvent::FullscreenPass(Self::name()));
    }
}
