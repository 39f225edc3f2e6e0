//! Explicit pipeline state record.
//!
//! Instead of an implicit global state machine, every blend/depth/cull
//! transition goes through the context as an explicit [`PipelineState`]
//! mutation and is journaled in the command trace. This keeps the
//! inter-pass state dependencies auditable without a live graphics device.

use bitflags::bitflags;

bitflags! {
    /// Buffers affected by a clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

/// Fragment blending mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Source overwrites destination.
    #[default]
    Off,
    /// Standard `src_alpha, one_minus_src_alpha` compositing.
    Alpha,
    /// Pure accumulation (`one, one`), as used by the WBOIT buffers.
    Additive,
}

/// Snapshot of the fixed-function state a pass runs under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    pub blend: BlendMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            blend: BlendMode::Off,
            depth_test: true,
            depth_write: true,
            cull: true,
        }
    }
}
