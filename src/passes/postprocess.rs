//! Post-Processing Pass
//!
//! Screen-space effects over the opaque layer: ambient occlusion and
//! outline highlighting, both reading the canonical merged depth next to
//! the rendered color.
//!
//! # Data Flow
//!
//! ```text
//! color target ──────┐
//!                    ├──► PostprocessingPass ──► postprocessing target
//! canonical depth ───┘         (occlusion, outline, composite)
//! ```
//!
//! Configuration is a per-frame snapshot ([`PostprocessingProps`]) —
//! read-only for the duration of a frame and re-evaluated on the next
//! one, never cached across frames.
//!
//! In the WBOIT strategy this pass runs *before* transparency is
//! composited: occlusion and outlines act on the opaque layer only, and
//! transparency must not receive ambient occlusion.

use crate::camera::Camera;
use crate::gpu::context::Context;
use crate::gpu::state::BlendMode;
use crate::gpu::target::RenderTarget;
use crate::gpu::texture::{FilterMode, TextureFormat, TextureKey};
use crate::gpu::trace::TraceEvent;
use crate::error::Result;

use super::antialias::AntialiasProps;
use super::outline::{self, BACKGROUND_DEPTH, OutlineParams};

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

/// Ambient-occlusion configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcclusionProps {
    pub enabled: bool,
    /// Sample ring radius in pixels.
    pub radius: u32,
    /// Depth difference below which a neighbor does not occlude.
    pub bias: f32,
    /// Darkening strength in `[0, 1]`.
    pub strength: f32,
}

impl Default for OcclusionProps {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 2,
            bias: 0.01,
            strength: 0.6,
        }
    }
}

/// Outline configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineProps {
    pub enabled: bool,
    /// Scale-free discontinuity threshold; the pass derives the view-Z
    /// window as `threshold * (far - near)`.
    pub threshold: f32,
    pub color: [f32; 3],
}

impl Default for OutlineProps {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.33,
            color: [0.0, 0.0, 0.0],
        }
    }
}

/// Per-frame post-processing configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PostprocessingProps {
    pub occlusion: OcclusionProps,
    pub outline: OutlineProps,
    pub antialias: AntialiasProps,
}

// ---------------------------------------------------------------------------
// Pass
// ---------------------------------------------------------------------------

/// Ambient occlusion + outline over the opaque layer.
pub struct PostprocessingPass {
    target: RenderTarget,
    color_src: TextureKey,
    depth_src: TextureKey,
    width: u32,
    height: u32,
}

impl PostprocessingPass {
    pub fn new(
        ctx: &mut Context,
        width: u32,
        height: u32,
        color_src: TextureKey,
        depth_src: TextureKey,
    ) -> Result<Self> {
        let target =
            ctx.create_render_target(width, height, true, TextureFormat::Rgba8Unorm, FilterMode::Linear)?;
        Ok(Self {
            target,
            color_src,
            depth_src,
            width,
            height,
        })
    }

    /// Whether the pass participates in the frame at all.
    #[must_use]
    pub fn is_enabled(props: &PostprocessingProps) -> bool {
        props.occlusion.enabled || props.outline.enabled
    }

    /// The target holding the post-processed frame.
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

    /// Apply the enabled effects, writing into the pass's own target.
    ///
    /// Also replays the merged depth into the target's depth buffer so
    /// content composited on top afterwards depth-tests correctly.
    pub fn run(&self, ctx: &mut Context, camera: &Camera, props: &PostprocessingProps) {
        ctx.bind(self.target.key());
        ctx.set_blend(BlendMode::Off);
        ctx.set_depth_test(false);
        ctx.set_depth_write(false);

        let Ok(color) = ctx.texture_data(self.color_src).map(<[f32]>::to_vec) else {
            log::warn!("PostprocessingPass: color source missing");
            return;
        };
        let Ok(depth) = ctx.depth_plane(self.depth_src) else {
            log::warn!("PostprocessingPass: depth source missing");
            return;
        };

        let occlusion = if props.occlusion.enabled {
            ctx.record(TraceEvent::FullscreenPass("occlusion"));
            Some(occlusion_map(&depth, self.width, self.height, &props.occlusion))
        } else {
            None
        };

        let outlines = if props.outline.enabled {
            ctx.record(TraceEvent::FullscreenPass("outline"));
            let params = OutlineParams {
                orthographic: camera.is_orthographic(),
                near: camera.near,
                far: camera.far,
                max_view_z_diff: props.outline.threshold * (camera.far - camera.near),
            };
            Some(outline::detect(&depth, self.width, self.height, &params))
        } else {
            None
        };

        let outline_color = props.outline.color;
        let bound = ctx.bound();
        let Ok(mut surfaces) = ctx.surfaces_mut(bound) else {
            return;
        };

        let output = &mut surfaces.colors[0];
        for (i, texel) in output.data.chunks_exact_mut(4).enumerate() {
            let mut rgba = [color[i * 4], color[i * 4 + 1], color[i * 4 + 2], color[i * 4 + 3]];
            if let Some(occlusion) = &occlusion {
                for c in &mut rgba[..3] {
                    *c *= occlusion[i];
                }
            }
            if let Some(outlines) = &outlines
                && outlines[i][0] == 0.0
            {
                rgba[..3].copy_from_slice(&outline_color);
            }
            texel.copy_from_slice(&rgba);
        }

        if let Some(dst) = surfaces.depth.as_deref_mut() {
            let len = dst.len().min(depth.len());
            dst[..len].copy_from_slice(&depth[..len]);
        }
    }
}

/// Deterministic screen-space occlusion estimate.
///
/// For each pixel, a fixed ring of eight offsets is tested against the
/// merged depth; every sufficiently nearer neighbor counts as an
/// occluder, and the result darkens proportionally. Background pixels
/// stay untouched.
fn occlusion_map(depth: &[f32], width: u32, height: u32, props: &OcclusionProps) -> Vec<f32> {
    let w = width as i32;
    let h = height as i32;
    let r = props.radius.max(1) as i32;
    let d = (r * 7 / 10).max(1);
    let offsets = [
        (r, 0),
        (-r, 0),
        (0, r),
        (0, -r),
        (d, d),
        (d, -d),
        (-d, d),
        (-d, -d),
    ];

    let mut map = vec![1.0; depth.len()];
    for y in 0..h {
        for x in 0..w {
            let index = (y * w + x) as usize;
            let self_depth = depth[index];
            if self_depth >= BACKGROUND_DEPTH {
                continue;
            }
            let mut occluders = 0;
            for (dx, dy) in offsets {
                let nx = (x + dx).clamp(0, w - 1);
                let ny = (y + dy).clamp(0, h - 1);
                if depth[(ny * w + nx) as usize] + props.bias < self_depth {
                    occluders += 1;
                }
            }
            map[index] =
                (1.0 - props.strength * occluders as f32 / offsets.len() as f32).clamp(0.0, 1.0);
        }
    }
    map
}
