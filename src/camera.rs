//! Camera and viewport model.
//!
//! The pipeline consumes cameras through a narrow surface: a viewport
//! rectangle, the projection kind, and the near/far planes. A camera is
//! either mono or stereo; a stereo camera exposes `left`/`right`
//! sub-cameras and the draw pass runs the full per-view sequence once for
//! each of them.

use glam::Mat4;

/// Viewport rectangle in framebuffer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Full-surface viewport at the origin.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fovy: f32,
    },
    Orthographic {
        /// Half-height of the view volume in world units.
        size: f32,
    },
}

/// A single rendering viewpoint.
///
/// Carries only what the draw pass and the screen-space kernels need:
/// projection kind, clip planes and viewport. World/view transforms are the
/// scene renderer's concern and flow through [`SceneRenderer::update`].
///
/// [`SceneRenderer::update`]: crate::renderer::SceneRenderer::update
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub viewport: Viewport,
}

impl Camera {
    #[must_use]
    pub fn perspective(fovy: f32, near: f32, far: f32, viewport: Viewport) -> Self {
        Self {
            projection: Projection::Perspective { fovy },
            near,
            far,
            viewport,
        }
    }

    #[must_use]
    pub fn orthographic(size: f32, near: f32, far: f32, viewport: Viewport) -> Self {
        Self {
            projection: Projection::Orthographic { size },
            near,
            far,
            viewport,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_orthographic(&self) -> bool {
        matches!(self.projection, Projection::Orthographic { .. })
    }

    /// Aspect ratio of the camera viewport.
    #[inline]
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.viewport.width.max(1) as f32 / self.viewport.height.max(1) as f32
    }

    /// Projection matrix for the current viewport.
    ///
    /// Uses the `[0, 1]` clip-depth convention.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fovy } => {
                Mat4::perspective_rh(fovy, self.aspect(), self.near, self.far)
            }
            Projection::Orthographic { size } => {
                let h = size;
                let w = size * self.aspect();
                Mat4::orthographic_rh(-w, w, -h, h, self.near, self.far)
            }
        }
    }
}

/// A stereo camera pair.
///
/// The draw pass renders left then right into the shared offscreen targets,
/// each view overwriting the previous one; combining the two outputs is the
/// presenting compositor's job.
#[derive(Debug, Clone, Copy)]
pub struct StereoCamera {
    pub left: Camera,
    pub right: Camera,
}

/// Camera argument of [`DrawPass::render`](crate::passes::draw::DrawPass::render).
#[derive(Debug, Clone, Copy)]
pub enum RenderCamera<'a> {
    Mono(&'a Camera),
    Stereo(&'a StereoCamera),
}

impl<'a> From<&'a Camera> for RenderCamera<'a> {
    fn from(camera: &'a Camera) -> Self {
        Self::Mono(camera)
    }
}

impl<'a> From<&'a StereoCamera> for RenderCamera<'a> {
    fn from(camera: &'a StereoCamera) -> Self {
        Self::Stereo(camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_projection_maps_near_to_zero() {
        let camera = Camera::perspective(
            60.0_f32.to_radians(),
            0.1,
            100.0,
            Viewport::full(128, 128),
        );
        let p = camera.projection_matrix() * glam::Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert!((p.z / p.w).abs() < 1e-5);
    }

    #[test]
    fn aspect_follows_viewport() {
        let camera = Camera::perspective(1.0, 0.1, 10.0, Viewport::full(200, 100));
        assert!((camera.aspect() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn orthographic_flag() {
        let camera = Camera::orthographic(10.0, 0.1, 10.0, Viewport::full(64, 64));
        assert!(camera.is_orthographic());
    }
}
