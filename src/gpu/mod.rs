//! GPU-facing resource model.
//!
//! Provides:
//! - `Context`: capability flags, resource factories, the bind/clear state
//!   machine and the command trace
//! - `Texture`/`RenderTarget` descriptors and arena-keyed resources
//! - `PipelineState`: the explicit state record each stage manipulates
//! - depth packing helpers for hardware without native depth-texture
//!   sampling

pub mod context;
pub mod packing;
pub mod state;
pub mod target;
pub mod texture;
pub mod trace;

pub use context::{Capabilities, ColorSurface, Context, TargetSurfaces};
pub use state::{BlendMode, ClearFlags, PipelineState};
pub use target::{RenderTarget, TargetKey};
pub use texture::{FilterMode, TextureDesc, TextureFormat, TextureKey};
pub use trace::{DrawPhase, TraceEvent};
