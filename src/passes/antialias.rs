//! Antialias Pass
//!
//! FXAA-style screen-space antialiasing: detects aliased edges via luma
//! contrast and blends along them. Operates on resolved LDR color, so it
//! is the last stage before presentation.
//!
//! # Data Flow
//!
//! ```text
//! color / postprocessing target ──► AntialiasPass ──► presentation
//!                                                     (or own target)
//! ```
//!
//! When antialiasing is disabled this pass is not run at all; the
//! orchestrator presents through the copy stage instead.

use crate::error::Result;
use crate::gpu::context::Context;
use crate::gpu::state::BlendMode;
use crate::gpu::target::RenderTarget;
use crate::gpu::texture::{FilterMode, TextureFormat, TextureKey};
use crate::gpu::trace::TraceEvent;

/// Antialias configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntialiasProps {
    pub enabled: bool,
    /// Relative luma contrast required to treat a pixel as an edge.
    pub edge_threshold: f32,
    /// Absolute contrast floor below which edges are ignored.
    pub edge_threshold_min: f32,
    /// Blend factor applied along detected edges.
    pub subpixel: f32,
}

impl Default for AntialiasProps {
    fn default() -> Self {
        Self {
            enabled: false,
            edge_threshold: 0.125,
            edge_threshold_min: 0.0312,
            subpixel: 0.75,
        }
    }
}

/// Final-resolve antialias stage.
pub struct AntialiasPass {
    target: RenderTarget,
    width: u32,
    height: u32,
}

impl AntialiasPass {
    pub fn new(ctx: &mut Context, width: u32, height: u32) -> Result<Self> {
        let target =
            ctx.create_render_target(width, height, false, TextureFormat::Rgba8Unorm, FilterMode::Linear)?;
        Ok(Self { target, width, height })
    }

    #[must_use]
    pub fn is_enabled(props: &super::postprocess::PostprocessingProps) -> bool {
        props.antialias.enabled
    }

    #[must_use]
    pub fn name() -> &'static str {
        "fxaa"
    }

    /// The target holding the antialiased frame when not presenting
    /// directly.
    #[inline]
    #[must_use]
    pub fn target(&self) -> RenderTarget {
        self.target
    }

    pub fn set_size(&mut self, ctx: &mut Context, width: u32, height: u32) -> Result<()> {
        if (self.width, self.height) == (width, height) {
            return Ok(());
        }
        self.width = width;
        self.height = height;
        ctx.resize_target(&self.target, width, height)
    }

    /// Antialias `input` into the presentation surface
    /// (`to_drawing_buffer`) or this pass's own target.
    pub fn run(
        &self,
        ctx: &mut Context,
        input: TextureKey,
        to_drawing_buffer: bool,
        props: &AntialiasProps,
    ) {
        let destination = if to_drawing_buffer {
            ctx.presentation().key()
        } else {
            self.target.key()
        };
        ctx.bind(destination);
        ctx.set_blend(BlendMode::Off);
        ctx.set_depth_test(false);
        ctx.set_depth_write(false);

        let Ok(color) = ctx.texture_data(input).map(<[f32]>::to_vec) else {
            log::warn!("AntialiasPass: input texture missing");
            return;
        };

        let (width, height) = (self.width as i32, self.height as i32);
        let bound = ctx.bound();
        let Ok(mut surfaces) = ctx.surfaces_mut(bound) else {
            return;
        };

        let output = &mut surfaces.colors[0];
        for y in 0..height {
            for x in 0..width {
                let index = (y * width + x) as usize;
                let texel = smooth_texel(&color, x, y, width, height, props);
                output.data[index * 4..][..4].copy_from_slice(&texel);
            }
        }
        drop(surfaces);

        ctx.record(TraceEvent::FullscreenPass(Self::name()));
    }
}

#[inline]
fn luma(texel: &[f32]) -> f32 {
    texel[0] * 0.299 + texel[1] * 0.587 + texel[2] * 0.114
}

fn texel_at(color: &[f32], x: i32, y: i32, width: i32, height: i32) -> [f32; 4] {
    let i = (y.clamp(0, height - 1) * width + x.clamp(0, width - 1)) as usize * 4;
    [color[i], color[i + 1], color[i + 2], color[i + 3]]
}

/// Luma-contrast edge test over the 4-neighborhood; along edges the pixel
/// blends toward its 3×3 box average by the subpixel factor.
fn smooth_texel(
    color: &[f32],
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    props: &AntialiasProps,
) -> [f32; 4] {
    let center = texel_at(color, x, y, width, height);
    let l_center = luma(&center);

    let mut l_min = l_center;
    let mut l_max = l_center;
    for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
        let l = luma(&texel_at(color, x + dx, y + dy, width, height));
        l_min = l_min.min(l);
        l_max = l_max.max(l);
    }

    let contrast = l_max - l_min;
    if contrast < (l_max * props.edge_threshold).max(props.edge_threshold_min) {
        return center;
    }

    let mut average = [0.0_f32; 4];
    for dy in -1..=1 {
        for dx in -1..=1 {
            let texel = texel_at(color, x + dx, y + dy, width, height);
            for (avg, value) in average.iter_mut().zip(texel) {
                *avg += value;
            }
        }
    }
    for value in &mut average {
        *value /= 9.0;
    }

    let t = props.subpixel;
    [
        center[0] + (average[0] - center[0]) * t,
        center[1] + (average[1] - center[1]) * t,
        center[2] + (average[2] - center[2]) * t,
        center[3],
    ]
}
