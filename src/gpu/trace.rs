//! Command trace.
//!
//! Every state transition, clear, draw dispatch, full-screen pass and
//! flush is journaled as a [`TraceEvent`]. The trace is the auditable
//! record of the pipeline choreography: tests assert exact orderings
//! against it instead of needing a live GPU.

use super::state::{BlendMode, ClearFlags};
use super::target::TargetKey;
use super::texture::TextureKey;

/// Which scene-renderer entry point a draw dispatch went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    BlendedOpaque,
    BlendedTransparent,
    BlendedVolume,
    WboitOpaque,
    WboitTransparent,
    /// Dedicated depth-only capture pass (packed-depth hardware).
    Depth,
    /// Helper overlay rendering.
    Helper,
}

/// One journaled pipeline event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceEvent {
    TargetBound(TargetKey),
    DepthAttached {
        target: TargetKey,
        depth: Option<TextureKey>,
    },
    Cleared(ClearFlags),
    ViewportSet {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    BlendSet(BlendMode),
    DepthTestSet(bool),
    DepthWriteSet(bool),
    CullSet(bool),
    Draw {
        phase: DrawPhase,
        items: usize,
    },
    /// A full-screen stage ran against the bound target.
    FullscreenPass(&'static str),
    Flush,
}

impl TraceEvent {
    /// Convenience predicate for counting full-screen stage invocations.
    #[inline]
    #[must_use]
    pub fn is_pass(&self, name: &str) -> bool {
        matches!(self, Self::FullscreenPass(n) if *n == name)
    }
}
