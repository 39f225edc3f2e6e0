//! Texture resources.
//!
//! A texture is either *defined* standalone (e.g. a depth texture attached
//! to a framebuffer on demand) or owned by a render target. Resources live
//! in the context arena and are addressed by [`TextureKey`]; resizing
//! reallocates storage in place so the key — and with it every reference a
//! dependent stage holds — stays valid.
//!
//! The reference backend keeps texel storage CPU-visible as `f32` per
//! channel regardless of the declared format; the format records intent
//! (channel count, depth vs. color) and drives how the screen-space
//! kernels interpret the data.

use slotmap::new_key_type;

new_key_type! {
    /// Arena key for a texture resource.
    pub struct TextureKey;
}

/// Texel format, wgpu-style naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba16Float,
    Rg16Float,
    R16Float,
    Depth32Float,
}

impl TextureFormat {
    /// Number of `f32` channels per texel in the reference storage.
    #[inline]
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            Self::Rgba8Unorm | Self::Rgba16Float => 4,
            Self::Rg16Float => 2,
            Self::R16Float | Self::Depth32Float => 1,
        }
    }

    /// Whether this is a depth format.
    #[inline]
    #[must_use]
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float)
    }
}

/// Sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
}

impl TextureDesc {
    #[must_use]
    pub fn new(width: u32, height: u32, format: TextureFormat, filter: FilterMode) -> Self {
        Self { width, height, format, filter }
    }
}

/// A texture resource with CPU-visible storage.
#[derive(Debug, Clone)]
pub(crate) struct TextureResource {
    pub desc: TextureDesc,
    pub data: Vec<f32>,
}

impl TextureResource {
    pub fn new(desc: TextureDesc) -> Self {
        let mut resource = Self { desc, data: Vec::new() };
        resource.allocate();
        resource
    }

    /// Reallocate storage for the current descriptor dimensions.
    ///
    /// Depth formats initialize to the far plane, color formats to zero;
    /// previous contents are dropped, as on the GPU.
    pub fn allocate(&mut self) {
        let len = self.desc.width as usize * self.desc.height as usize * self.desc.format.channels();
        let fill = if self.desc.format.is_depth() { 1.0 } else { 0.0 };
        self.data = vec![fill; len];
    }

    /// Resize in place, keeping the resource (and its key) alive.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.desc.width == width && self.desc.height == height {
            return;
        }
        self.desc.width = width;
        self.desc.height = height;
        self.allocate();
    }
}
