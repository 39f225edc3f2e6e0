//! Draw Pass
//!
//! The draw-pass orchestrator: owns every offscreen target and depth
//! texture of the pipeline and, for each camera view, executes the full
//! sequence — clear, opaque/transparent/volume rendering (blended or
//! WBOIT), depth capture and merge, post-processing, antialiasing or
//! copy-presentation, flush.
//!
//! # Strategy selection
//!
//! Two mutually exclusive compositing strategies exist per instance:
//!
//! - **Blended** (`render_blended`): classic alpha blending, unordered —
//!   the default, and the fallback when WBOIT is unavailable.
//! - **WBOIT** (`render_wboit`): weighted-blended order-independent
//!   transparency; chosen at construction when requested and supported.
//!
//! # Capability branching
//!
//! `packed_depth` is captured once at construction and never reevaluated:
//! hardware that cannot sample depth textures gets two dedicated offscreen
//! targets and depth-only capture passes, everything else attaches depth
//! textures to the color framebuffer directly. The two branches are kept
//! as separated blocks rather than per-frame conditionals.
//!
//! # Resource lifetimes
//!
//! All targets are created here and resized in place; dependent stages
//! hold arena keys whose identity survives `set_size`, so a resize needs
//! no notification fan-out beyond each stage's own `set_size`.

use crate::camera::{Camera, RenderCamera};
use crate::error::Result;
use crate::gpu::context::Context;
use crate::gpu::state::ClearFlags;
use crate::gpu::target::RenderTarget;
use crate::gpu::texture::{FilterMode, TextureDesc, TextureFormat, TextureKey};
use crate::gpu::trace::{DrawPhase, TraceEvent};
use crate::renderer::SceneRenderer;
use crate::scene::{Helper, Scene};

use super::antialias::AntialiasPass;
use super::copy::CopyPass;
use super::depth_merge::DepthMergePass;
use super::postprocess::{PostprocessingPass, PostprocessingProps};
use super::wboit::WboitPass;

/// The draw-pass orchestrator.
pub struct DrawPass {
    packed_depth: bool,
    width: u32,
    height: u32,

    draw_target: RenderTarget,
    color_target: RenderTarget,
    /// Canonical merged depth, stored in a color-renderable texture.
    depth_target: RenderTarget,

    /// Offscreen capture targets, packed-depth hardware only.
    depth_target_primitives: Option<RenderTarget>,
    depth_target_volumes: Option<RenderTarget>,
    /// Readable depth sources: the capture targets' color textures on
    /// packed-depth hardware, standalone depth textures otherwise.
    depth_texture_primitives: TextureKey,
    depth_texture_volumes: TextureKey,

    depth_merge: DepthMergePass,
    copy_target: CopyPass,
    copy_postprocessing: CopyPass,
    wboit: Option<WboitPass>,
    postprocessing: PostprocessingPass,
    antialias: AntialiasPass,
}

impl DrawPass {
    pub fn new(ctx: &mut Context, width: u32, height: u32, enable_wboit: bool) -> Result<Self> {
        let packed_depth = ctx.packed_depth();

        let draw_target = ctx.presentation();
        let color_target =
            ctx.create_render_target(width, height, true, TextureFormat::Rgba8Unorm, FilterMode::Linear)?;

        // Canonical depth is color-renderable so the merge can write it on
        // any hardware; packed contexts use the lattice encoding.
        let canonical_format = if packed_depth {
            TextureFormat::Rgba8Unorm
        } else {
            TextureFormat::Rgba16Float
        };
        let depth_target =
            ctx.create_render_target(width, height, false, canonical_format, FilterMode::Nearest)?;

        let (depth_target_primitives, depth_target_volumes, depth_texture_primitives, depth_texture_volumes) =
            if packed_depth {
                let primitives =
                    ctx.create_render_target(width, height, true, TextureFormat::Rgba8Unorm, FilterMode::Nearest)?;
                let volumes =
                    ctx.create_render_target(width, height, true, TextureFormat::Rgba8Unorm, FilterMode::Nearest)?;
                (
                    Some(primitives),
                    Some(volumes),
                    primitives.color_texture(),
                    volumes.color_texture(),
                )
            } else {
                let primitives = ctx.create_texture(TextureDesc::new(
                    width,
                    height,
                    TextureFormat::Depth32Float,
                    FilterMode::Nearest,
                ))?;
                let volumes = ctx.create_texture(TextureDesc::new(
                    width,
                    height,
                    TextureFormat::Depth32Float,
                    FilterMode::Nearest,
                ))?;
                (None, None, primitives, volumes)
            };

        let depth_merge = DepthMergePass::new(
            depth_texture_primitives,
            depth_texture_volumes,
            packed_depth,
            width,
            height,
        );
        let copy_target = CopyPass::new(
            color_target.color_texture(),
            depth_target.color_texture(),
            width,
            height,
        );

        let wboit = if enable_wboit {
            if WboitPass::is_supported(ctx.capabilities()) {
                Some(WboitPass::new(ctx, width, height)?)
            } else {
                log::warn!(
                    "WBOIT requested but unsupported (needs draw buffers, float blending and depth textures); falling back to blended transparency"
                );
                None
            }
        } else {
            None
        };

        let postprocessing = PostprocessingPass::new(
            ctx,
            width,
            height,
            color_target.color_texture(),
            depth_target.color_texture(),
        )?;
        let copy_postprocessing = CopyPass::new(
            postprocessing.target().color_texture(),
            depth_target.color_texture(),
            width,
            height,
        );
        let antialias = AntialiasPass::new(ctx, width, height)?;

        log::debug!(
            "DrawPass created: {width}x{height}, packed_depth={packed_depth}, wboit={}",
            wboit.is_some()
        );

        Ok(Self {
            packed_depth,
            width,
            height,
            draw_target,
            color_target,
            depth_target,
            depth_target_primitives,
            depth_target_volumes,
            depth_texture_primitives,
            depth_texture_volumes,
            depth_merge,
            copy_target,
            copy_postprocessing,
            wboit,
            postprocessing,
            antialias,
        })
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn packed_depth(&self) -> bool {
        self.packed_depth
    }

    /// Whether the WBOIT strategy is active for this instance.
    #[inline]
    #[must_use]
    pub fn wboit_enabled(&self) -> bool {
        self.wboit.is_some()
    }

    /// The target holding the final output for the given configuration:
    /// the antialias target whenever antialiasing is enabled, else the
    /// post-processing target when post-processing is enabled, else the
    /// plain color target.
    #[must_use]
    pub fn color_target(&self, props: &PostprocessingProps) -> RenderTarget {
        if AntialiasPass::is_enabled(props) {
            self.antialias.target()
        } else if PostprocessingPass::is_enabled(props) {
            self.postprocessing.target()
        } else {
            self.color_target
        }
    }

    /// Resize every owned target and texture, and every dependent stage.
    ///
    /// Must run before the next `render` after a viewport change; a
    /// partial resize violates the matching-dimensions invariant. Calling
    /// with the current size is a no-op.
    pub fn set_size(&mut self, ctx: &mut Context, width: u32, height: u32) -> Result<()> {
        if (self.width, self.height) == (width, height) {
            return Ok(());
        }

        ctx.resize_target(&self.color_target, width, height)?;
        ctx.resize_target(&self.depth_target, width, height)?;

        if self.packed_depth {
            if let (Some(primitives), Some(volumes)) =
                (self.depth_target_primitives, self.depth_target_volumes)
            {
                ctx.resize_target(&primitives, width, height)?;
                ctx.resize_target(&volumes, width, height)?;
            }
        } else {
            ctx.resize_texture(self.depth_texture_primitives, width, height)?;
            ctx.resize_texture(self.depth_texture_volumes, width, height)?;
        }

        self.depth_merge.set_size(width, height);
        self.copy_target.set_size(width, height);
        self.copy_postprocessing.set_size(width, height);
        if let Some(wboit) = &mut self.wboit {
            wboit.set_size(ctx, width, height)?;
        }
        self.postprocessing.set_size(ctx, width, height)?;
        self.antialias.set_size(ctx, width, height)?;

        self.width = width;
        self.height = height;
        log::debug!("DrawPass resized to {width}x{height}");
        Ok(())
    }

    /// Render one frame.
    ///
    /// A stereo camera runs the full per-view sequence once per eye into
    /// the shared targets; combining the two outputs is the presenting
    /// compositor's concern.
    pub fn render<R: SceneRenderer>(
        &mut self,
        ctx: &mut Context,
        renderer: &mut R,
        camera: RenderCamera<'_>,
        scene: &Scene,
        helper: &Helper,
        to_drawing_buffer: bool,
        background_color: [f32; 4],
        transparent_background: bool,
        props: &PostprocessingProps,
    ) {
        renderer.set_transparent_background(transparent_background);
        renderer.set_drawing_buffer_size(self.width, self.height);

        let clear_color = if transparent_background {
            [background_color[0], background_color[1], background_color[2], 0.0]
        } else {
            background_color
        };
        ctx.set_clear_color(clear_color);

        match camera {
            RenderCamera::Stereo(stereo) => {
                self.render_view(ctx, renderer, &stereo.left, scene, helper, to_drawing_buffer, props);
                self.render_view(ctx, renderer, &stereo.right, scene, helper, to_drawing_buffer, props);
            }
            RenderCamera::Mono(camera) => {
                self.render_view(ctx, renderer, camera, scene, helper, to_drawing_buffer, props);
            }
        }
    }

    /// The full pipeline for a single view.
    fn render_view<R: SceneRenderer>(
        &mut self,
        ctx: &mut Context,
        renderer: &mut R,
        camera: &Camera,
        scene: &Scene,
        helper: &Helper,
        to_drawing_buffer: bool,
        props: &PostprocessingProps,
    ) {
        let antialiasing_enabled = AntialiasPass::is_enabled(props);
        let postprocessing_enabled = PostprocessingPass::is_enabled(props);

        ctx.set_viewport(camera.viewport);
        renderer.update(camera);

        if self.wboit_enabled() {
            self.render_wboit(ctx, renderer, camera, scene, props);
        } else {
            // The presentation copy replays the merged depth alongside
            // color, so even a frame headed straight for the drawing
            // buffer needs the depth merge; blended content is always
            // produced offscreen and presented by the copy or antialias
            // stage.
            self.render_blended(ctx, renderer, camera, scene, false);
            if postprocessing_enabled {
                self.postprocessing.run(ctx, camera, props);
            }
        }

        if postprocessing_enabled {
            ctx.bind(self.postprocessing.target().key());
        } else {
            ctx.bind(self.color_target.key());
        }

        // Helper overlays: always blended, always on top.
        for overlay in [&helper.debug, &helper.handle, &helper.camera] {
            if overlay.enabled {
                ctx.record(TraceEvent::Draw {
                    phase: DrawPhase::Helper,
                    items: overlay.items.len(),
                });
                renderer.render_blended(ctx, &overlay.items, camera);
            }
        }

        if antialiasing_enabled {
            let input = if postprocessing_enabled {
                self.postprocessing.target().color_texture()
            } else {
                self.color_target.color_texture()
            };
            self.antialias.run(ctx, input, to_drawing_buffer, &props.antialias);
        } else if to_drawing_buffer {
            ctx.bind(self.draw_target.key());
            ctx.set_depth_test(false);
            if postprocessing_enabled {
                self.copy_postprocessing.run(ctx);
            } else {
                self.copy_target.run(ctx);
            }
        }

        ctx.flush();
    }

    /// Blended compositing strategy.
    ///
    /// `direct` binds the presentation surface and skips the depth
    /// capture/merge work that only offscreen consumers need.
    fn render_blended<R: SceneRenderer>(
        &mut self,
        ctx: &mut Context,
        renderer: &mut R,
        camera: &Camera,
        scene: &Scene,
        direct: bool,
    ) {
        if direct {
            ctx.bind(self.draw_target.key());
        } else {
            ctx.bind(self.color_target.key());
            if !self.packed_depth {
                ctx.attach_depth(self.color_target.key(), Some(self.depth_texture_primitives))
                    .expect("primitive depth attachment must match the color target");
            }
        }

        ctx.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        ctx.record(TraceEvent::Draw {
            phase: DrawPhase::BlendedOpaque,
            items: scene.primitives.len(),
        });
        renderer.render_blended_opaque(ctx, &scene.primitives, camera, None);

        if !direct {
            // Dedicated depth pass when depth textures cannot be sampled.
            if self.packed_depth {
                let primitives = self
                    .depth_target_primitives
                    .expect("packed-depth capture targets exist");
                ctx.bind(primitives.key());
                ctx.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
                ctx.record(TraceEvent::Draw {
                    phase: DrawPhase::Depth,
                    items: scene.primitives.len(),
                });
                renderer.render_depth(ctx, &scene.primitives, camera, None);
                ctx.bind(self.color_target.key());
            }

            // Direct-volume rendering, depth-tested against primitives.
            if !self.packed_depth {
                ctx.attach_depth(self.color_target.key(), Some(self.depth_texture_volumes))
                    .expect("volume depth attachment must match the color target");
                // Stale depth from the previous frame.
                ctx.clear(ClearFlags::DEPTH);
            }
            ctx.record(TraceEvent::Draw {
                phase: DrawPhase::BlendedVolume,
                items: scene.volumes.len(),
            });
            renderer.render_blended_volume(
                ctx,
                &scene.volumes,
                camera,
                Some(self.depth_texture_primitives),
            );
            if self.packed_depth {
                let volumes = self
                    .depth_target_volumes
                    .expect("packed-depth capture targets exist");
                ctx.bind(volumes.key());
                ctx.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
                ctx.record(TraceEvent::Draw {
                    phase: DrawPhase::Depth,
                    items: scene.volumes.len(),
                });
                renderer.render_depth(
                    ctx,
                    &scene.volumes,
                    camera,
                    Some(self.depth_texture_primitives),
                );
                ctx.bind(self.color_target.key());
            } else {
                ctx.attach_depth(self.color_target.key(), Some(self.depth_texture_primitives))
                    .expect("primitive depth attachment must match the color target");
            }
        }

        // Alpha-blended, unordered; back-to-front artifacts are accepted
        // in this path.
        ctx.record(TraceEvent::Draw {
            phase: DrawPhase::BlendedTransparent,
            items: scene.primitives.len(),
        });
        renderer.render_blended_transparent(ctx, &scene.primitives, camera, None);

        if !direct {
            ctx.bind(self.depth_target.key());
            self.depth_merge.run(ctx);
            ctx.bind(self.color_target.key());
        }
    }

    /// WBOIT compositing strategy.
    ///
    /// # Panics
    ///
    /// Panics when invoked while WBOIT is inactive — an internal
    /// invariant violation, not a recoverable condition.
    fn render_wboit<R: SceneRenderer>(
        &mut self,
        ctx: &mut Context,
        renderer: &mut R,
        camera: &Camera,
        scene: &Scene,
        props: &PostprocessingProps,
    ) {
        let wboit = self.wboit.as_ref().expect("expected WBOIT to be enabled");

        ctx.bind(self.color_target.key());
        ctx.clear(ClearFlags::COLOR | ClearFlags::DEPTH);

        ctx.attach_depth(self.color_target.key(), Some(self.depth_texture_primitives))
            .expect("primitive depth attachment must match the color target");
        ctx.clear(ClearFlags::DEPTH);
        ctx.record(TraceEvent::Draw {
            phase: DrawPhase::WboitOpaque,
            items: scene.primitives.len(),
        });
        renderer.render_wboit_opaque(ctx, &scene.primitives, camera, None);

        ctx.attach_depth(self.color_target.key(), Some(self.depth_texture_volumes))
            .expect("volume depth attachment must match the color target");
        ctx.clear(ClearFlags::DEPTH);
        ctx.record(TraceEvent::Draw {
            phase: DrawPhase::WboitOpaque,
            items: scene.volumes.len(),
        });
        renderer.render_wboit_opaque(
            ctx,
            &scene.volumes,
            camera,
            Some(self.depth_texture_primitives),
        );

        ctx.bind(self.depth_target.key());
        self.depth_merge.run(ctx);

        // Occlusion and outlines act on the opaque layer only;
        // transparency must not receive ambient occlusion.
        if PostprocessingPass::is_enabled(props) {
            self.postprocessing.run(ctx, camera, props);
        }

        wboit.bind(ctx);
        let merged_depth = self.depth_target.color_texture();
        ctx.record(TraceEvent::Draw {
            phase: DrawPhase::WboitTransparent,
            items: scene.primitives.len(),
        });
        renderer.render_wboit_transparent(ctx, &scene.primitives, camera, Some(merged_depth));
        ctx.record(TraceEvent::Draw {
            phase: DrawPhase::WboitTransparent,
            items: scene.volumes.len(),
        });
        renderer.render_wboit_transparent(ctx, &scene.volumes, camera, Some(merged_depth));

        let current = if PostprocessingPass::is_enabled(props) {
            self.postprocessing.target()
        } else {
            self.color_target
        };
        ctx.bind(current.key());
        ctx.attach_depth(current.key(), Some(self.depth_texture_primitives))
            .expect("primitive depth attachment must match the current target");
        wboit.resolve(ctx);
    }
}
