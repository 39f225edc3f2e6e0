//! Render targets.
//!
//! A render target groups one or more color attachments with an optional
//! depth attachment. Targets are arena resources addressed by
//! [`TargetKey`]; the orchestrator exclusively owns each target and lends
//! the key to dependent stages, so an in-place resize is visible to every
//! holder without notification.

use slotmap::new_key_type;
use smallvec::SmallVec;

use super::texture::TextureKey;

new_key_type! {
    /// Arena key for a render target resource.
    pub struct TargetKey;
}

/// Internal target resource: attachment keys plus cached dimensions.
#[derive(Debug, Clone)]
pub(crate) struct TargetResource {
    pub colors: SmallVec<[TextureKey; 2]>,
    pub depth: Option<TextureKey>,
    pub width: u32,
    pub height: u32,
}

/// Handle to an offscreen color+depth surface.
///
/// A cheap copyable handle: the backing resources live in the context
/// arena. Color and depth dimensions always match; resizing goes through
/// [`Context::resize_target`](super::context::Context::resize_target),
/// which mutates the attachments in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    target: TargetKey,
    color: TextureKey,
    depth: Option<TextureKey>,
}

impl RenderTarget {
    pub(crate) fn new(target: TargetKey, color: TextureKey, depth: Option<TextureKey>) -> Self {
        Self { target, color, depth }
    }

    /// The bindable target key.
    #[inline]
    #[must_use]
    pub fn key(&self) -> TargetKey {
        self.target
    }

    /// The color texture, readable by later passes.
    #[inline]
    #[must_use]
    pub fn color_texture(&self) -> TextureKey {
        self.color
    }

    /// The owned depth texture, if the target was created with one.
    #[inline]
    #[must_use]
    pub fn depth_texture(&self) -> Option<TextureKey> {
        self.depth
    }
}
