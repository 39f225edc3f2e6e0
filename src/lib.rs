//! Glaze: a multi-pass draw pipeline for layered 3D scene rendering.
//!
//! The crate orchestrates how complex scenes — opaque, transparent and
//! volumetric content — become a final color buffer: it sequences the
//! opaque/transparent/volume passes, merges multiple depth sources into a
//! canonical depth buffer, optionally engages weighted-blended
//! order-independent transparency, and feeds the result through
//! post-processing and antialiasing before presentation. Mono and stereo
//! cameras are supported, as is hardware without native depth-texture
//! sampling (via packed-depth capture passes).
//!
//! Scene drawing itself is external, behind the
//! [`SceneRenderer`](renderer::SceneRenderer) trait; the graphics context
//! here is a reference backend whose full-screen stages run as software
//! kernels, making the whole pipeline auditable and testable without a
//! GPU.

pub mod camera;
pub mod error;
pub mod gpu;
pub mod passes;
pub mod renderer;
pub mod scene;

pub use camera::{Camera, Projection, RenderCamera, StereoCamera, Viewport};
pub use error::{GlazeError, Result};
pub use gpu::{Capabilities, Context, FilterMode, RenderTarget, TextureFormat};
pub use passes::{
    AntialiasProps, DrawPass, OcclusionProps, OutlineProps, PostprocessingProps,
};
pub use renderer::{SceneRenderer, SplatRenderer};
pub use scene::{DrawItem, Helper, OverlayScene, Scene};
