//! Weighted-Blended Order-Independent Transparency
//!
//! WBOIT approximates correct transparency compositing without sorting:
//! transparent fragments accumulate weighted premultiplied color into one
//! buffer and multiplicative revealage into another, and a final resolve
//! pass composites the weighted average over the opaque color.
//!
//! # Data Flow
//!
//! ```text
//!               bind()                        resolve()
//! transparent ──► accumulation (rgba16f) ──┐
//!    items    ──► revealage   (r16f)     ──┴──► opaque color target
//! ```
//!
//! The accumulation buffers have no depth attachment; fragments depth-test
//! against the canonical merged depth texture instead, so transparency
//! composites correctly against both primitives and volumes.
//!
//! Requires draw buffers, float blending and depth-texture sampling; the
//! orchestrator falls back to the blended strategy when any are missing.

use crate::error::Result;
use crate::gpu::context::{Capabilities, Context};
use crate::gpu::state::BlendMode;
use crate::gpu::target::TargetKey;
use crate::gpu::texture::{FilterMode, TextureDesc, TextureFormat, TextureKey};
use crate::gpu::trace::TraceEvent;

/// Guard against division by a vanishing weight sum.
const WEIGHT_EPSILON: f32 = 1e-4;

/// Transparency accumulation and resolve stage.
pub struct WboitPass {
    accumulation: TextureKey,
    revealage: TextureKey,
    target: TargetKey,
    width: u32,
    height: u32,
}

impl WboitPass {
    /// Whether the context can host WBOIT at all.
    #[must_use]
    pub fn is_supported(caps: Capabilities) -> bool {
        caps.contains(Capabilities::DRAW_BUFFERS | Capabilities::FLOAT_BLEND | Capabilities::DEPTH_TEXTURE)
    }

    pub fn new(ctx: &mut Context, width: u32, height: u32) -> Result<Self> {
        let accumulation = ctx.create_texture(TextureDesc::new(
            width,
            height,
            TextureFormat::Rgba16Float,
            FilterMode::Nearest,
        ))?;
        let revealage = ctx.create_texture(TextureDesc::new(
            width,
            height,
            TextureFormat::R16Float,
            FilterMode::Nearest,
        ))?;
        let target = ctx.create_multi_target(&[accumulation, revealage])?;
        Ok(Self {
            accumulation,
            revealage,
            target,
            width,
            height,
        })
    }

    #[must_use]
    pub fn name() -> &'static str {
        "wboit-resolve"
    }

    pub fn set_size(&mut self, ctx: &mut Context, width: u32, height: u32) -> Result<()> {
        if (self.width, self.height) == (width, height) {
            return Ok(());
        }
        self.width = width;
        self.height = height;
        ctx.resize_texture(self.accumulation, width, height)?;
        ctx.resize_texture(self.revealage, width, height)?;
        ctx.set_target_size(self.target, width, height)
    }

    /// Bind the accumulation draw buffers and reset them: zero
    /// accumulation, full revealage.
    pub fn bind(&self, ctx: &mut Context) {
        ctx.bind(self.target);
        ctx.clear_colors(&[[0.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0]]);
    }

    /// Resolve the accumulated transparency over the bound color target.
    ///
    /// Per pixel: `average = accumulation.rgb / max(accumulation.a, ε)`,
    /// composited as `average * (1 - revealage) + destination * revealage`.
    pub fn resolve(&self, ctx: &mut Context) {
        ctx.set_blend(BlendMode::Alpha);
        ctx.set_depth_test(false);
        ctx.set_depth_write(false);

        let accumulation = match ctx.texture_data(self.accumulation) {
            Ok(data) => data.to_vec(),
            Err(_) => return,
        };
        let revealage = match ctx.texture_data(self.revealage) {
            Ok(data) => data.to_vec(),
            Err(_) => return,
        };

        let bound = ctx.bound();
        let Ok(mut surfaces) = ctx.surfaces_mut(bound) else {
            return;
        };

        let output = &mut surfaces.colors[0];
        let channels = output.channels;
        for (i, texel) in output.data.chunks_exact_mut(channels).enumerate() {
            let reveal = revealage[i];
            let weight = accumulation[i * 4 + 3];
            if weight <= 0.0 {
                continue;
            }
            let scale = 1.0 / weight.max(WEIGHT_EPSILON);
            for c in 0..channels.min(3) {
                let average = accumulation[i * 4 + c] * scale;
                texel[c] = average * (1.0 - reveal) + texel[c] * reveal;
            }
        }
        drop(surfaces);

        ctx.record(TraceEvent::FullscreenPass(Self::name()));
    }

    #[inline]
    #[must_use]
    pub fn accumulation_texture(&self) -> TextureKey {
        self.accumulation
    }

    #[inline]
    #[must_use]
    pub fn revealage_texture(&self) -> TextureKey {
        self.revealage
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> TargetKey {
        self.target
    }
}
