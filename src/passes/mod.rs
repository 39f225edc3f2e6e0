//! Pipeline passes.
//!
//! Provides:
//! - `DrawPass`: the draw-pass orchestrator (clear → opaque → depth →
//!   transparent → post-process → present)
//! - `DepthMergePass`: nearest-wins merge of primitive and volume depth
//! - `CopyPass`: verbatim color+depth presentation copy
//! - `WboitPass`: weighted-blended order-independent transparency
//! - `PostprocessingPass`: ambient occlusion and outline compositing
//! - `AntialiasPass`: FXAA-style final resolve
//! - `outline`: the silhouette detection kernel

pub mod antialias;
pub mod copy;
pub mod depth_merge;
pub mod draw;
pub mod outline;
pub mod postprocess;
pub mod wboit;

pub use antialias::{AntialiasPass, AntialiasProps};
pub use copy::CopyPass;
pub use depth_merge::DepthMergePass;
pub use draw::DrawPass;
pub use postprocess::{OcclusionProps, OutlineProps, PostprocessingPass, PostprocessingProps};
pub use wboit::WboitPass;
