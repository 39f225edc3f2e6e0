//! Error Types
//!
//! This module defines the error types used throughout the pipeline.
//!
//! # Overview
//!
//! The main error type [`GlazeError`] covers all failure modes including:
//! - Invalid resource dimensions
//! - Unknown resource handles
//! - Attachment and capability mismatches
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, GlazeError>`.

use thiserror::Error;

/// The main error type for the glaze pipeline.
///
/// Each variant provides specific context about what went wrong.
/// Note that the single internal invariant of the draw pass — invoking the
/// WBOIT strategy while WBOIT is inactive — is a panic, not a variant: it
/// signals a logic bug, never a runtime condition.
#[derive(Error, Debug)]
pub enum GlazeError {
    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// A texture or render target was requested with a zero dimension.
    #[error("Invalid resource dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// A texture handle did not resolve to a live resource.
    #[error("Unknown texture resource")]
    TextureNotFound,

    /// A render target handle did not resolve to a live resource.
    #[error("Unknown render target resource")]
    TargetNotFound,

    // ========================================================================
    // Attachment Errors
    // ========================================================================
    /// A depth texture attached to a framebuffer must match the color
    /// attachment dimensions.
    #[error(
        "Depth attachment {depth_width}x{depth_height} does not match color attachment {color_width}x{color_height}"
    )]
    AttachmentSizeMismatch {
        /// Depth texture width
        depth_width: u32,
        /// Depth texture height
        depth_height: u32,
        /// Color attachment width
        color_width: u32,
        /// Color attachment height
        color_height: u32,
    },

    /// Color attachments of a multi-attachment target must share dimensions.
    #[error("Color attachments of a multi-attachment target must share dimensions")]
    MismatchedAttachments,

    /// An attachment layout the software surface accessor cannot expose.
    #[error("Unsupported attachment combination for direct surface access")]
    UnsupportedSurfaceAccess,

    // ========================================================================
    // Capability Errors
    // ========================================================================
    /// Multiple draw buffers were requested on a context without
    /// draw-buffer support.
    #[error("Multiple draw buffers requested but the context lacks draw-buffer support")]
    DrawBuffersUnsupported,
}

/// Alias for `Result<T, GlazeError>`.
pub type Result<T> = std::result::Result<T, GlazeError>;
