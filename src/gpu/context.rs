//! Graphics context.
//!
//! Owns the resource arenas, the capability flags detected at
//! construction, the bind/clear/viewport state machine and the command
//! trace. This is the reference backend: resources carry CPU-visible
//! texel storage so the full-screen stages execute as software kernels
//! and the whole pipeline runs — and is testable — without a GPU. A
//! hardware backend would reproduce the same choreography with shaders.
//!
//! # Execution model
//!
//! Single-threaded cooperative: every operation issues synchronously in
//! program order; `flush` marks command submission. Read-after-write
//! hazards between passes are managed purely by that order.

use bitflags::bitflags;
use slotmap::SlotMap;
use smallvec::{SmallVec, smallvec};

use crate::camera::Viewport;
use crate::error::{GlazeError, Result};

use super::packing::unpack_rgba_to_unit;
use super::state::{BlendMode, ClearFlags, PipelineState};
use super::target::{RenderTarget, TargetKey, TargetResource};
use super::texture::{FilterMode, TextureDesc, TextureFormat, TextureKey, TextureResource};
use super::trace::TraceEvent;

bitflags! {
    /// Hardware capability flags, detected once at context creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        /// Depth buffers can be sampled as textures.
        const DEPTH_TEXTURE = 1 << 0;
        /// Fragments can write multiple color attachments in one pass.
        const DRAW_BUFFERS = 1 << 1;
        /// Blending into float render targets.
        const FLOAT_BLEND = 1 << 2;
    }
}

impl Capabilities {
    /// Everything a current desktop GPU exposes.
    #[must_use]
    pub fn modern() -> Self {
        Self::all()
    }
}

/// Mutable view over the surfaces of a bound target.
///
/// Produced by [`Context::surfaces_mut`] for renderers and kernels that
/// write texels directly.
pub struct TargetSurfaces<'a> {
    pub width: u32,
    pub height: u32,
    pub colors: SmallVec<[ColorSurface<'a>; 2]>,
    pub depth: Option<&'a mut [f32]>,
}

/// One color attachment surface.
pub struct ColorSurface<'a> {
    pub data: &'a mut [f32],
    pub channels: usize,
}

/// The graphics context.
pub struct Context {
    caps: Capabilities,
    textures: SlotMap<TextureKey, TextureResource>,
    targets: SlotMap<TargetKey, TargetResource>,
    presentation: RenderTarget,
    state: PipelineState,
    bound: TargetKey,
    viewport: Viewport,
    clear_color: [f32; 4],
    trace: Vec<TraceEvent>,
}

impl Context {
    /// Create a context whose presentation surface has the given size.
    pub fn new(width: u32, height: u32, caps: Capabilities) -> Result<Self> {
        validate_dims(width, height)?;

        let mut textures = SlotMap::with_key();
        let mut targets = SlotMap::with_key();

        let color = textures.insert(TextureResource::new(TextureDesc::new(
            width,
            height,
            TextureFormat::Rgba8Unorm,
            FilterMode::Nearest,
        )));
        let depth = textures.insert(TextureResource::new(TextureDesc::new(
            width,
            height,
            TextureFormat::Depth32Float,
            FilterMode::Nearest,
        )));
        let target = targets.insert(TargetResource {
            colors: smallvec![color],
            depth: Some(depth),
            width,
            height,
        });
        let presentation = RenderTarget::new(target, color, Some(depth));

        log::debug!("Context created: {width}x{height}, capabilities {caps:?}");

        Ok(Self {
            caps,
            textures,
            targets,
            presentation,
            state: PipelineState::default(),
            bound: target,
            viewport: Viewport::full(width, height),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            trace: Vec::new(),
        })
    }

    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Whether depth must be packed into color channels because the
    /// hardware cannot sample depth textures.
    #[inline]
    #[must_use]
    pub fn packed_depth(&self) -> bool {
        !self.caps.contains(Capabilities::DEPTH_TEXTURE)
    }

    // ── Resource factories ─────────────────────────────────────────────────

    /// Define a standalone texture (no backing target).
    pub fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureKey> {
        validate_dims(desc.width, desc.height)?;
        Ok(self.textures.insert(TextureResource::new(desc)))
    }

    /// Create a render target owning a color texture and, optionally, a
    /// depth texture of matching dimensions.
    pub fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        with_depth: bool,
        format: TextureFormat,
        filter: FilterMode,
    ) -> Result<RenderTarget> {
        validate_dims(width, height)?;

        let color = self
            .textures
            .insert(TextureResource::new(TextureDesc::new(width, height, format, filter)));
        let depth = if with_depth {
            Some(self.textures.insert(TextureResource::new(TextureDesc::new(
                width,
                height,
                TextureFormat::Depth32Float,
                FilterMode::Nearest,
            ))))
        } else {
            None
        };
        let target = self.targets.insert(TargetResource {
            colors: smallvec![color],
            depth,
            width,
            height,
        });
        Ok(RenderTarget::new(target, color, depth))
    }

    /// Create a target from existing textures as multiple draw buffers.
    ///
    /// Requires [`Capabilities::DRAW_BUFFERS`] for more than one
    /// attachment; all attachments must share dimensions.
    pub fn create_multi_target(&mut self, colors: &[TextureKey]) -> Result<TargetKey> {
        if colors.len() > 1 && !self.caps.contains(Capabilities::DRAW_BUFFERS) {
            return Err(GlazeError::DrawBuffersUnsupported);
        }
        let mut dims = None;
        for &key in colors {
            let desc = self.texture_desc(key)?;
            let d = (desc.width, desc.height);
            if *dims.get_or_insert(d) != d {
                return Err(GlazeError::MismatchedAttachments);
            }
        }
        let (width, height) = dims.ok_or(GlazeError::MismatchedAttachments)?;
        Ok(self.targets.insert(TargetResource {
            colors: colors.iter().copied().collect(),
            depth: None,
            width,
            height,
        }))
    }

    // ── Resizing (in place, identity preserving) ───────────────────────────

    /// Resize a standalone texture in place.
    pub fn resize_texture(&mut self, key: TextureKey, width: u32, height: u32) -> Result<()> {
        validate_dims(width, height)?;
        self.textures
            .get_mut(key)
            .ok_or(GlazeError::TextureNotFound)?
            .resize(width, height);
        Ok(())
    }

    /// Resize a render target and its owned attachments in place.
    ///
    /// The target key and the attachment keys stay valid, so stages
    /// holding references observe the new size without notification.
    /// Foreign depth textures currently attached in place of the owned
    /// one are left to their owner.
    pub fn resize_target(&mut self, rt: &RenderTarget, width: u32, height: u32) -> Result<()> {
        validate_dims(width, height)?;
        self.resize_texture(rt.color_texture(), width, height)?;
        if let Some(depth) = rt.depth_texture() {
            self.resize_texture(depth, width, height)?;
        }
        let resource = self.targets.get_mut(rt.key()).ok_or(GlazeError::TargetNotFound)?;
        resource.width = width;
        resource.height = height;
        Ok(())
    }

    /// Update the cached dimensions of a multi-attachment target after its
    /// attachments were resized.
    pub fn set_target_size(&mut self, key: TargetKey, width: u32, height: u32) -> Result<()> {
        validate_dims(width, height)?;
        let resource = self.targets.get_mut(key).ok_or(GlazeError::TargetNotFound)?;
        resource.width = width;
        resource.height = height;
        Ok(())
    }

    /// Resize the presentation surface (drawing-buffer size change).
    pub fn set_drawing_buffer_size(&mut self, width: u32, height: u32) -> Result<()> {
        let presentation = self.presentation;
        self.resize_target(&presentation, width, height)
    }

    // ── Targets and attachments ────────────────────────────────────────────

    /// The presentation surface.
    #[inline]
    #[must_use]
    pub fn presentation(&self) -> RenderTarget {
        self.presentation
    }

    pub fn target_size(&self, key: TargetKey) -> Result<(u32, u32)> {
        let resource = self.targets.get(key).ok_or(GlazeError::TargetNotFound)?;
        Ok((resource.width, resource.height))
    }

    /// Attach (or restore) a depth texture on a target's framebuffer.
    ///
    /// The attachment must match the target's color dimensions.
    pub fn attach_depth(&mut self, target: TargetKey, depth: Option<TextureKey>) -> Result<()> {
        let (color_width, color_height) = self.target_size(target)?;
        if let Some(key) = depth {
            let desc = self.texture_desc(key)?;
            if (desc.width, desc.height) != (color_width, color_height) {
                return Err(GlazeError::AttachmentSizeMismatch {
                    depth_width: desc.width,
                    depth_height: desc.height,
                    color_width,
                    color_height,
                });
            }
        }
        let resource = self.targets.get_mut(target).ok_or(GlazeError::TargetNotFound)?;
        resource.depth = depth;
        self.record(TraceEvent::DepthAttached { target, depth });
        Ok(())
    }

    /// Bind a target as the destination of subsequent draws and clears.
    pub fn bind(&mut self, target: TargetKey) {
        debug_assert!(self.targets.contains_key(target), "binding a dead target");
        self.bound = target;
        self.record(TraceEvent::TargetBound(target));
    }

    #[inline]
    #[must_use]
    pub fn bound(&self) -> TargetKey {
        self.bound
    }

    // ── State machine ──────────────────────────────────────────────────────

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.record(TraceEvent::ViewportSet {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
        });
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    pub fn set_blend(&mut self, blend: BlendMode) {
        if self.state.blend != blend {
            self.state.blend = blend;
            self.record(TraceEvent::BlendSet(blend));
        }
    }

    pub fn set_depth_test(&mut self, enabled: bool) {
        if self.state.depth_test != enabled {
            self.state.depth_test = enabled;
            self.record(TraceEvent::DepthTestSet(enabled));
        }
    }

    pub fn set_depth_write(&mut self, enabled: bool) {
        if self.state.depth_write != enabled {
            self.state.depth_write = enabled;
            self.record(TraceEvent::DepthWriteSet(enabled));
        }
    }

    pub fn set_cull(&mut self, enabled: bool) {
        if self.state.cull != enabled {
            self.state.cull = enabled;
            self.record(TraceEvent::CullSet(enabled));
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    // ── Clears ─────────────────────────────────────────────────────────────

    /// Clear the bound target's buffers to the current clear color and the
    /// far plane. Clears cover the whole surface.
    pub fn clear(&mut self, flags: ClearFlags) {
        if flags.is_empty() {
            return;
        }
        let resource = self.targets[self.bound].clone();
        if flags.contains(ClearFlags::COLOR) {
            for key in &resource.colors {
                let clear = self.clear_color;
                if let Some(tex) = self.textures.get_mut(*key) {
                    fill_color(tex, clear);
                }
            }
        }
        if flags.contains(ClearFlags::DEPTH)
            && let Some(depth) = resource.depth
            && let Some(tex) = self.textures.get_mut(depth)
        {
            tex.data.fill(1.0);
        }
        self.record(TraceEvent::Cleared(flags));
    }

    /// Clear each color attachment of the bound target to its own value.
    ///
    /// Used by stages whose draw buffers need distinct initial values
    /// (e.g. transparency accumulation vs. revealage).
    pub fn clear_colors(&mut self, values: &[[f32; 4]]) {
        let resource = self.targets[self.bound].clone();
        for (key, value) in resource.colors.iter().zip(values) {
            if let Some(tex) = self.textures.get_mut(*key) {
                fill_color(tex, *value);
            }
        }
        self.record(TraceEvent::Cleared(ClearFlags::COLOR));
    }

    // ── Submission ─────────────────────────────────────────────────────────

    /// Submit the recorded command stream.
    ///
    /// Guarantees submission, not completion; callers may read back pixels
    /// or swap buffers immediately afterwards.
    pub fn flush(&mut self) {
        self.record(TraceEvent::Flush);
    }

    // ── Trace ──────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    /// Drain the journal, returning everything recorded since the last
    /// call.
    pub fn take_trace(&mut self) -> Vec<TraceEvent> {
        std::mem::take(&mut self.trace)
    }

    pub(crate) fn record(&mut self, event: TraceEvent) {
        self.trace.push(event);
    }

    // ── Texel access ───────────────────────────────────────────────────────

    pub fn texture_desc(&self, key: TextureKey) -> Result<TextureDesc> {
        Ok(self.textures.get(key).ok_or(GlazeError::TextureNotFound)?.desc)
    }

    pub fn texture_data(&self, key: TextureKey) -> Result<&[f32]> {
        Ok(&self.textures.get(key).ok_or(GlazeError::TextureNotFound)?.data)
    }

    /// Decode a depth-carrying texture into one `f32` per texel,
    /// whichever encoding it uses (native depth, canonical red channel,
    /// or packed color channels).
    pub fn depth_plane(&self, key: TextureKey) -> Result<Vec<f32>> {
        let tex = self.textures.get(key).ok_or(GlazeError::TextureNotFound)?;
        let data = &tex.data;
        Ok(match tex.desc.format {
            TextureFormat::Depth32Float | TextureFormat::R16Float => data.clone(),
            TextureFormat::Rgba8Unorm => data
                .chunks_exact(4)
                .map(|t| unpack_rgba_to_unit([t[0], t[1], t[2], t[3]]))
                .collect(),
            TextureFormat::Rgba16Float => data.chunks_exact(4).map(|t| t[0]).collect(),
            TextureFormat::Rg16Float => data.chunks_exact(2).map(|t| t[0]).collect(),
        })
    }

    /// Read back the first color attachment of a target as raw bytes.
    pub fn read_pixels(&self, target: TargetKey) -> Result<&[u8]> {
        let resource = self.targets.get(target).ok_or(GlazeError::TargetNotFound)?;
        let color = *resource.colors.first().ok_or(GlazeError::TargetNotFound)?;
        Ok(bytemuck::cast_slice(self.texture_data(color)?))
    }

    /// Mutable surfaces of a target, for renderers and software kernels.
    pub fn surfaces_mut(&mut self, target: TargetKey) -> Result<TargetSurfaces<'_>> {
        let resource = self.targets.get(target).ok_or(GlazeError::TargetNotFound)?.clone();
        let (width, height) = (resource.width, resource.height);

        match (resource.colors.as_slice(), resource.depth) {
            ([color], None) => {
                let tex = self.textures.get_mut(*color).ok_or(GlazeError::TextureNotFound)?;
                let channels = tex.desc.format.channels();
                Ok(TargetSurfaces {
                    width,
                    height,
                    colors: smallvec![ColorSurface { data: &mut tex.data, channels }],
                    depth: None,
                })
            }
            ([color], Some(depth)) => {
                let [ct, dt] = self
                    .textures
                    .get_disjoint_mut([*color, depth])
                    .ok_or(GlazeError::TextureNotFound)?;
                let channels = ct.desc.format.channels();
                Ok(TargetSurfaces {
                    width,
                    height,
                    colors: smallvec![ColorSurface { data: &mut ct.data, channels }],
                    depth: Some(&mut dt.data),
                })
            }
            ([c0, c1], None) => {
                let [t0, t1] = self
                    .textures
                    .get_disjoint_mut([*c0, *c1])
                    .ok_or(GlazeError::TextureNotFound)?;
                let ch0 = t0.desc.format.channels();
                let ch1 = t1.desc.format.channels();
                Ok(TargetSurfaces {
                    width,
                    height,
                    colors: smallvec![
                        ColorSurface { data: &mut t0.data, channels: ch0 },
                        ColorSurface { data: &mut t1.data, channels: ch1 },
                    ],
                    depth: None,
                })
            }
            _ => Err(GlazeError::UnsupportedSurfaceAccess),
        }
    }
}

fn validate_dims(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(GlazeError::InvalidDimensions { width, height });
    }
    Ok(())
}

fn fill_color(tex: &mut TextureResource, value: [f32; 4]) {
    let channels = tex.desc.format.channels();
    for texel in tex.data.chunks_exact_mut(channels) {
        texel.copy_from_slice(&value[..channels]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            Context::new(0, 600, Capabilities::modern()),
            Err(GlazeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn resize_preserves_keys() {
        let mut ctx = Context::new(64, 64, Capabilities::modern()).unwrap();
        let rt = ctx
            .create_render_target(64, 64, true, TextureFormat::Rgba8Unorm, FilterMode::Linear)
            .unwrap();
        let color = rt.color_texture();
        ctx.resize_target(&rt, 128, 32).unwrap();
        assert_eq!(ctx.target_size(rt.key()).unwrap(), (128, 32));
        let desc = ctx.texture_desc(color).unwrap();
        assert_eq!((desc.width, desc.height), (128, 32));
    }

    #[test]
    fn attach_depth_validates_dimensions() {
        let mut ctx = Context::new(64, 64, Capabilities::modern()).unwrap();
        let rt = ctx
            .create_render_target(64, 64, false, TextureFormat::Rgba8Unorm, FilterMode::Nearest)
            .unwrap();
        let small = ctx
            .create_texture(TextureDesc::new(32, 32, TextureFormat::Depth32Float, FilterMode::Nearest))
            .unwrap();
        assert!(matches!(
            ctx.attach_depth(rt.key(), Some(small)),
            Err(GlazeError::AttachmentSizeMismatch { .. })
        ));
    }

    #[test]
    fn multi_target_requires_draw_buffers() {
        let caps = Capabilities::DEPTH_TEXTURE;
        let mut ctx = Context::new(8, 8, caps).unwrap();
        let a = ctx
            .create_texture(TextureDesc::new(8, 8, TextureFormat::Rgba16Float, FilterMode::Nearest))
            .unwrap();
        let b = ctx
            .create_texture(TextureDesc::new(8, 8, TextureFormat::R16Float, FilterMode::Nearest))
            .unwrap();
        assert!(matches!(
            ctx.create_multi_target(&[a, b]),
            Err(GlazeError::DrawBuffersUnsupported)
        ));
    }

    #[test]
    fn clear_fills_color_and_depth() {
        let mut ctx = Context::new(4, 4, Capabilities::modern()).unwrap();
        let rt = ctx
            .create_render_target(4, 4, true, TextureFormat::Rgba8Unorm, FilterMode::Nearest)
            .unwrap();
        ctx.bind(rt.key());
        ctx.set_clear_color([0.5, 0.25, 0.0, 1.0]);
        ctx.clear(ClearFlags::COLOR | ClearFlags::DEPTH);

        let color = ctx.texture_data(rt.color_texture()).unwrap();
        assert_eq!(&color[..4], &[0.5, 0.25, 0.0, 1.0]);
        let depth = ctx.texture_data(rt.depth_texture().unwrap()).unwrap();
        assert!(depth.iter().all(|&d| (d - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn trace_records_bind_clear_flush_order() {
        let mut ctx = Context::new(4, 4, Capabilities::modern()).unwrap();
        let rt = ctx
            .create_render_target(4, 4, true, TextureFormat::Rgba8Unorm, FilterMode::Nearest)
            .unwrap();
        ctx.bind(rt.key());
        ctx.clear(ClearFlags::COLOR);
        ctx.flush();

        let trace = ctx.take_trace();
        assert_eq!(
            trace,
            vec![
                TraceEvent::TargetBound(rt.key()),
                TraceEvent::Cleared(ClearFlags::COLOR),
                TraceEvent::Flush,
            ]
        );
        assert!(ctx.trace().is_empty());
    }
}
