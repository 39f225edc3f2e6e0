//! Draw Pass Tests
//!
//! Tests for:
//! - Construction and capability-dependent branching (packed depth, WBOIT)
//! - Resize propagation and identity preservation
//! - Blended strategy bind/clear/draw ordering
//! - WBOIT strategy ordering (post-processing before transparency,
//!   resolve last)
//! - Final-output target selection
//! - End-to-end presentation scenarios (copy stage, stereo fan-out)

use glaze::gpu::trace::{DrawPhase, TraceEvent};
use glaze::passes::{AntialiasProps, DepthMergePass, OcclusionProps, OutlineProps, WboitPass};
use glaze::{
    Camera, Capabilities, Context, DrawItem, DrawPass, Helper, OverlayScene, PostprocessingProps,
    RenderCamera, Scene, SplatRenderer, StereoCamera, Viewport,
};

const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

fn modern_context(w: u32, h: u32) -> Context {
    Context::new(w, h, Capabilities::modern()).unwrap()
}

fn packed_context(w: u32, h: u32) -> Context {
    Context::new(w, h, Capabilities::empty()).unwrap()
}

fn camera(w: u32, h: u32) -> Camera {
    Camera::perspective(60.0_f32.to_radians(), 0.1, 100.0, Viewport::full(w, h))
}

/// One opaque red primitive and one transparent green primitive.
fn simple_scene() -> Scene {
    Scene::new(
        vec![
            DrawItem::new(1, [1.0, 0.0, 0.0, 1.0], 0.5),
            DrawItem::new(2, [0.0, 1.0, 0.0, 0.5], 0.3),
        ],
        Vec::new(),
    )
}

fn scene_with_volume() -> Scene {
    let mut scene = simple_scene();
    scene.volumes.push(DrawItem::new(3, [0.0, 0.0, 1.0, 1.0], 0.7));
    scene
}

fn props_none() -> PostprocessingProps {
    PostprocessingProps::default()
}

fn props_postprocessing() -> PostprocessingProps {
    PostprocessingProps {
        occlusion: OcclusionProps { enabled: true, ..Default::default() },
        outline: OutlineProps { enabled: true, ..Default::default() },
        ..Default::default()
    }
}

fn props_antialias() -> PostprocessingProps {
    PostprocessingProps {
        antialias: AntialiasProps { enabled: true, ..Default::default() },
        ..Default::default()
    }
}

fn render_once(
    ctx: &mut Context,
    pass: &mut DrawPass,
    renderer: &mut SplatRenderer,
    scene: &Scene,
    to_drawing_buffer: bool,
    props: &PostprocessingProps,
) -> Vec<TraceEvent> {
    let cam = camera(pass.width(), pass.height());
    ctx.take_trace();
    pass.render(
        ctx,
        renderer,
        RenderCamera::Mono(&cam),
        scene,
        &Helper::default(),
        to_drawing_buffer,
        BLACK,
        false,
        props,
    );
    ctx.take_trace()
}

fn count_pass(trace: &[TraceEvent], name: &str) -> usize {
    trace.iter().filter(|e| e.is_pass(name)).count()
}

fn draw_positions(trace: &[TraceEvent], phase: DrawPhase) -> Vec<usize> {
    trace
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match e {
            TraceEvent::Draw { phase: p, .. } if *p == phase => Some(i),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Construction and Capability Branching
// ============================================================================

#[test]
fn wboit_active_only_when_requested_and_supported() {
    let mut ctx = modern_context(64, 64);
    let pass = DrawPass::new(&mut ctx, 64, 64, true).unwrap();
    assert!(pass.wboit_enabled());

    let pass = DrawPass::new(&mut ctx, 64, 64, false).unwrap();
    assert!(!pass.wboit_enabled());

    // Requested but unsupported: degrade to blended, not an error.
    let mut ctx = packed_context(64, 64);
    let pass = DrawPass::new(&mut ctx, 64, 64, true).unwrap();
    assert!(!pass.wboit_enabled());
    assert!(pass.packed_depth());
}

#[test]
fn construction_rejects_zero_dimensions() {
    let mut ctx = modern_context(64, 64);
    assert!(DrawPass::new(&mut ctx, 0, 64, false).is_err());
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn set_size_resizes_every_final_output_target() {
    let mut ctx = modern_context(800, 600);
    let mut pass = DrawPass::new(&mut ctx, 800, 600, true).unwrap();
    pass.set_size(&mut ctx, 1024, 768).unwrap();
    ctx.set_drawing_buffer_size(1024, 768).unwrap();

    for props in [props_none(), props_postprocessing(), props_antialias()] {
        let target = pass.color_target(&props);
        assert_eq!(ctx.target_size(target.key()).unwrap(), (1024, 768));
        let desc = ctx.texture_desc(target.color_texture()).unwrap();
        assert_eq!((desc.width, desc.height), (1024, 768));
    }
}

#[test]
fn set_size_with_current_dimensions_is_identity_preserving_noop() {
    let mut ctx = modern_context(800, 600);
    let mut pass = DrawPass::new(&mut ctx, 800, 600, false).unwrap();

    let before = pass.color_target(&props_none());
    pass.set_size(&mut ctx, 800, 600).unwrap();
    let after = pass.color_target(&props_none());

    assert_eq!(before, after, "target identity must be preserved");
    assert_eq!(ctx.target_size(after.key()).unwrap(), (800, 600));
}

#[test]
fn set_size_rejects_zero_dimensions() {
    let mut ctx = modern_context(64, 64);
    let mut pass = DrawPass::new(&mut ctx, 64, 64, false).unwrap();
    assert!(pass.set_size(&mut ctx, 64, 0).is_err());
}

// ============================================================================
// Blended Strategy Ordering
// ============================================================================

#[test]
fn blended_frame_never_runs_the_wboit_resolve() {
    let mut ctx = modern_context(32, 32);
    let mut pass = DrawPass::new(&mut ctx, 32, 32, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let trace = render_once(&mut ctx, &mut pass, &mut renderer, &scene_with_volume(), true, &props_none());
    assert_eq!(count_pass(&trace, WboitPass::name()), 0);
    assert!(draw_positions(&trace, DrawPhase::WboitOpaque).is_empty());
    assert!(draw_positions(&trace, DrawPhase::WboitTransparent).is_empty());
}

#[test]
fn blended_ordering_opaque_volume_transparent_merge() {
    let mut ctx = modern_context(32, 32);
    let mut pass = DrawPass::new(&mut ctx, 32, 32, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let trace = render_once(&mut ctx, &mut pass, &mut renderer, &scene_with_volume(), false, &props_none());

    let opaque = draw_positions(&trace, DrawPhase::BlendedOpaque)[0];
    let volume = draw_positions(&trace, DrawPhase::BlendedVolume)[0];
    let transparent = draw_positions(&trace, DrawPhase::BlendedTransparent)[0];
    let merge = trace
        .iter()
        .position(|e| e.is_pass(DepthMergePass::name()))
        .unwrap();

    assert!(opaque < volume, "opaque primitives before volumes");
    assert!(volume < transparent, "volumes before transparent primitives");
    assert!(transparent < merge, "depth merge folds both sources last");

    // The frame begins by clearing color and depth of the bound target.
    let first_clear = trace
        .iter()
        .position(|e| matches!(e, TraceEvent::Cleared(_)))
        .unwrap();
    assert!(first_clear < opaque);
}

#[test]
fn packed_depth_uses_capture_passes_never_attachments() {
    let mut ctx = packed_context(32, 32);
    let mut pass = DrawPass::new(&mut ctx, 32, 32, false).unwrap();
    assert!(pass.packed_depth());
    let mut renderer = SplatRenderer::new();

    let trace = render_once(&mut ctx, &mut pass, &mut renderer, &scene_with_volume(), false, &props_none());

    // Primitive and volume depth each captured by a dedicated pass.
    assert_eq!(draw_positions(&trace, DrawPhase::Depth).len(), 2);
    assert!(
        !trace.iter().any(|e| matches!(e, TraceEvent::DepthAttached { .. })),
        "packed-depth hardware must never attach depth textures"
    );
}

#[test]
fn native_depth_attaches_textures_and_skips_capture_passes() {
    let mut ctx = modern_context(32, 32);
    let mut pass = DrawPass::new(&mut ctx, 32, 32, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let trace = render_once(&mut ctx, &mut pass, &mut renderer, &scene_with_volume(), false, &props_none());

    assert!(draw_positions(&trace, DrawPhase::Depth).is_empty());
    assert!(trace.iter().any(|e| matches!(e, TraceEvent::DepthAttached { .. })));
}

// ============================================================================
// WBOIT Strategy Ordering
// ============================================================================

#[test]
fn wboit_resolves_exactly_once_after_transparency() {
    let mut ctx = modern_context(32, 32);
    let mut pass = DrawPass::new(&mut ctx, 32, 32, true).unwrap();
    let mut renderer = SplatRenderer::new();

    let trace = render_once(&mut ctx, &mut pass, &mut renderer, &scene_with_volume(), false, &props_none());

    assert_eq!(count_pass(&trace, WboitPass::name()), 1);
    let resolve = trace.iter().position(|e| e.is_pass(WboitPass::name())).unwrap();
    let transparent = draw_positions(&trace, DrawPhase::WboitTransparent);
    assert_eq!(transparent.len(), 2, "primitives then volumes accumulate");
    assert!(transparent.iter().all(|&p| p < resolve));

    let merge = trace
        .iter()
        .position(|e| e.is_pass(DepthMergePass::name()))
        .unwrap();
    assert!(merge < transparent[0], "transparency tests against merged depth");
}

#[test]
fn wboit_postprocessing_runs_before_transparency() {
    let mut ctx = modern_context(32, 32);
    let mut pass = DrawPass::new(&mut ctx, 32, 32, true).unwrap();
    let mut renderer = SplatRenderer::new();

    let trace = render_once(
        &mut ctx,
        &mut pass,
        &mut renderer,
        &scene_with_volume(),
        false,
        &props_postprocessing(),
    );

    let occlusion = trace.iter().position(|e| e.is_pass("occlusion")).unwrap();
    let outline = trace.iter().position(|e| e.is_pass("outline")).unwrap();
    let transparent = draw_positions(&trace, DrawPhase::WboitTransparent)[0];
    assert!(occlusion < transparent, "occlusion acts on the opaque layer only");
    assert!(outline < transparent);

    // The resolve composites onto the post-processing target.
    let resolve = trace.iter().position(|e| e.is_pass(WboitPass::name())).unwrap();
    let pp_target = pass.color_target(&props_postprocessing()).key();
    let last_bind = trace[..resolve]
        .iter()
        .rev()
        .find_map(|e| match e {
            TraceEvent::TargetBound(t) => Some(*t),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_bind, pp_target);
}

// ============================================================================
// Final Output Selection
// ============================================================================

#[test]
fn color_target_prefers_antialias_then_postprocessing() {
    let mut ctx = modern_context(32, 32);
    let pass = DrawPass::new(&mut ctx, 32, 32, false).unwrap();

    let aa = pass.color_target(&props_antialias());
    let pp = pass.color_target(&props_postprocessing());
    let plain = pass.color_target(&props_none());

    let mut both = props_postprocessing();
    both.antialias.enabled = true;
    assert_eq!(pass.color_target(&both), aa, "antialiasing wins regardless of post-processing");
    assert_ne!(aa, pp);
    assert_ne!(pp, plain);
}

// ============================================================================
// End-to-End Presentation
// ============================================================================

#[test]
fn presentation_frame_copies_exactly_once() {
    let mut ctx = modern_context(800, 600);
    let mut pass = DrawPass::new(&mut ctx, 800, 600, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let trace = render_once(&mut ctx, &mut pass, &mut renderer, &simple_scene(), true, &props_none());

    assert_eq!(count_pass(&trace, "copy"), 1);
    assert_eq!(count_pass(&trace, "fxaa"), 0);

    // The presentation surface holds the composited blended result:
    // opaque red under a half-transparent green.
    let presentation = ctx.presentation();
    let color = ctx.texture_data(presentation.color_texture()).unwrap();
    assert!((color[0] - 0.5).abs() < 1e-5, "red channel, got {}", color[0]);
    assert!((color[1] - 0.5).abs() < 1e-5, "green channel, got {}", color[1]);
    assert!(color[2].abs() < 1e-5);

    // The copy also replays the merged scene depth.
    let depth = ctx.texture_data(presentation.depth_texture().unwrap()).unwrap();
    assert!((depth[0] - 0.5).abs() < 1e-4);
}

#[test]
fn offscreen_frame_runs_no_copy_and_no_antialias() {
    let mut ctx = modern_context(800, 600);
    let mut pass = DrawPass::new(&mut ctx, 800, 600, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let trace = render_once(&mut ctx, &mut pass, &mut renderer, &simple_scene(), false, &props_none());

    assert_eq!(count_pass(&trace, "copy"), 0);
    assert_eq!(count_pass(&trace, "fxaa"), 0);

    // Content resides in the color target only.
    let color_target = pass.color_target(&props_none());
    let color = ctx.texture_data(color_target.color_texture()).unwrap();
    assert!((color[0] - 0.5).abs() < 1e-5);

    // The presentation surface was never touched.
    let presentation = ctx.presentation();
    let screen = ctx.texture_data(presentation.color_texture()).unwrap();
    assert!(screen.iter().all(|&v| v == 0.0));
}

#[test]
fn antialias_presents_without_copy() {
    let mut ctx = modern_context(64, 64);
    let mut pass = DrawPass::new(&mut ctx, 64, 64, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let trace = render_once(&mut ctx, &mut pass, &mut renderer, &simple_scene(), true, &props_antialias());

    assert_eq!(count_pass(&trace, "fxaa"), 1);
    assert_eq!(count_pass(&trace, "copy"), 0);

    let presentation = ctx.presentation();
    let color = ctx.texture_data(presentation.color_texture()).unwrap();
    assert!((color[0] - 0.5).abs() < 1e-4);
}

#[test]
fn wboit_presentation_matches_blended_composite() {
    let mut ctx = modern_context(64, 64);
    let mut pass = DrawPass::new(&mut ctx, 64, 64, true).unwrap();
    let mut renderer = SplatRenderer::new();

    render_once(&mut ctx, &mut pass, &mut renderer, &simple_scene(), true, &props_none());

    // A single transparent layer resolves to the same result the blended
    // path produces: the weighted average of one fragment is itself.
    let presentation = ctx.presentation();
    let color = ctx.texture_data(presentation.color_texture()).unwrap();
    assert!((color[0] - 0.5).abs() < 1e-4, "red, got {}", color[0]);
    assert!((color[1] - 0.5).abs() < 1e-4, "green, got {}", color[1]);
}

#[test]
fn packed_depth_presentation_carries_merged_depth() {
    let mut ctx = packed_context(64, 64);
    let mut pass = DrawPass::new(&mut ctx, 64, 64, false).unwrap();
    let mut renderer = SplatRenderer::new();

    render_once(&mut ctx, &mut pass, &mut renderer, &scene_with_volume(), true, &props_none());

    // Opaque primitive at 0.5 is nearer than the volume at 0.7.
    let presentation = ctx.presentation();
    let depth = ctx.texture_data(presentation.depth_texture().unwrap()).unwrap();
    assert!((depth[0] - 0.5).abs() < 1e-2, "merged depth, got {}", depth[0]);
}

// ============================================================================
// Stereo and Helpers
// ============================================================================

#[test]
fn stereo_camera_runs_the_full_sequence_twice() {
    let mut ctx = modern_context(64, 32);
    let mut pass = DrawPass::new(&mut ctx, 64, 32, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let stereo = StereoCamera {
        left: Camera::perspective(1.0, 0.1, 100.0, Viewport::new(0, 0, 32, 32)),
        right: Camera::perspective(1.0, 0.1, 100.0, Viewport::new(32, 0, 32, 32)),
    };

    ctx.take_trace();
    pass.render(
        &mut ctx,
        &mut renderer,
        RenderCamera::Stereo(&stereo),
        &simple_scene(),
        &Helper::default(),
        false,
        BLACK,
        false,
        &props_none(),
    );
    let trace = ctx.take_trace();

    assert_eq!(trace.iter().filter(|e| **e == TraceEvent::Flush).count(), 2);
    assert_eq!(draw_positions(&trace, DrawPhase::BlendedOpaque).len(), 2);
    assert_eq!(count_pass(&trace, DepthMergePass::name()), 2);
}

#[test]
fn enabled_helpers_render_on_top_after_the_main_strategy() {
    let mut ctx = modern_context(32, 32);
    let mut pass = DrawPass::new(&mut ctx, 32, 32, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let mut helper = Helper::default();
    helper.debug = OverlayScene::new(vec![DrawItem::new(9, [1.0, 1.0, 1.0, 1.0], 0.0)]);

    let cam = camera(32, 32);
    ctx.take_trace();
    pass.render(
        &mut ctx,
        &mut renderer,
        RenderCamera::Mono(&cam),
        &simple_scene(),
        &helper,
        false,
        BLACK,
        false,
        &props_none(),
    );
    let trace = ctx.take_trace();

    let helper_draw = draw_positions(&trace, DrawPhase::Helper)[0];
    let transparent = draw_positions(&trace, DrawPhase::BlendedTransparent)[0];
    assert!(helper_draw > transparent, "helpers render after the main strategy");

    // The nearest-depth white overlay wins the final image.
    let color_target = pass.color_target(&props_none());
    let color = ctx.texture_data(color_target.color_texture()).unwrap();
    assert_eq!(&color[..3], &[1.0, 1.0, 1.0]);
}

#[test]
fn transparent_background_reaches_the_renderer() {
    let mut ctx = modern_context(16, 16);
    let mut pass = DrawPass::new(&mut ctx, 16, 16, false).unwrap();
    let mut renderer = SplatRenderer::new();

    let cam = camera(16, 16);
    pass.render(
        &mut ctx,
        &mut renderer,
        RenderCamera::Mono(&cam),
        &Scene::default(),
        &Helper::default(),
        false,
        BLACK,
        true,
        &props_none(),
    );
    assert!(renderer.transparent_background());
    assert_eq!(renderer.drawing_buffer_size(), (16, 16));
}
