//! View and frame context
//!
//! The view provider hands the renderer one [`ViewContext`] per view per
//! frame: transforms, viewport, sample count, and the target surface. The
//! frame renderer derives a [`FrameContext`] from it once the view's
//! primitive list is collected.

use crate::foundation::math::{Mat4, Rect, Vec3};

/// Opaque handle to a target surface owned by the graphics layer
///
/// The screen swapchain image, an off-screen render target, or a world-space
/// widget surface; the core never inspects it beyond asking the backend for
/// its extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Opaque handle to a resolved snapshot of the pre-UI screen image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenImageHandle(pub u64);

/// What a view renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Screen-space overlay composited over the finished scene
    ScreenOverlay,
    /// World-space panels inside the 3D scene
    World,
}

/// Per-view parameters supplied by the view provider each frame
#[derive(Debug, Clone)]
pub struct ViewContext {
    /// Which primitives this view gathers
    pub kind: ViewKind,
    /// Target surface to render into
    pub surface: SurfaceHandle,
    /// View (world-to-camera) transform
    pub view: Mat4,
    /// Projection transform
    pub projection: Mat4,
    /// Viewport rectangle in pixels
    pub viewport: Rect,
    /// Multi-sample count of the UI surface (1 = no MSAA)
    pub sample_count: u32,
    /// Clear color applied when binding the target, or `None` to preserve
    /// the existing image (the overlay case)
    pub clear_color: Option<[f32; 4]>,
}

impl ViewContext {
    /// A screen-overlay view with an orthographic pixel-space projection
    pub fn screen_overlay(surface: SurfaceHandle, width: f32, height: f32) -> Self {
        Self {
            kind: ViewKind::ScreenOverlay,
            surface,
            view: Mat4::identity(),
            projection: Mat4::new_orthographic(0.0, width.max(1.0), height.max(1.0), 0.0, -1.0, 1.0),
            viewport: Rect::new(0.0, 0.0, width, height),
            sample_count: 1,
            clear_color: None,
        }
    }

    /// A world-space view using the scene camera's transforms
    pub fn world(surface: SurfaceHandle, view: Mat4, projection: Mat4, viewport: Rect) -> Self {
        Self {
            kind: ViewKind::World,
            surface,
            view,
            projection,
            viewport,
            sample_count: 1,
            clear_color: None,
        }
    }

    /// Replace the multi-sample count
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Replace the clear color
    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = Some(clear_color);
        self
    }

    /// Combined view-projection transform
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// The camera position in world space, recovered from the view matrix
    pub fn eye_position(&self) -> Vec3 {
        self.view
            .try_inverse()
            .map_or_else(Vec3::zeros, |inverse| {
                Vec3::new(inverse.m14, inverse.m24, inverse.m34)
            })
    }
}

/// Per-frame state derived once per view before issuing draws
#[derive(Debug, Clone)]
pub struct FrameContext {
    /// Target surface bound for the frame
    pub surface: SurfaceHandle,
    /// Target extent in pixels
    pub extent: (u32, u32),
    /// Multi-sample count in effect
    pub sample_count: u32,
    /// Combined view-projection transform for mesh draws
    pub view_projection: Mat4,
    /// The shared pre-UI screen snapshot, resolved at most once per frame
    pub screen_snapshot: Option<ScreenImageHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_overlay_defaults() {
        let view = ViewContext::screen_overlay(SurfaceHandle(1), 800.0, 600.0);
        assert_eq!(view.kind, ViewKind::ScreenOverlay);
        assert_eq!(view.sample_count, 1);
        assert!(view.clear_color.is_none());
    }

    #[test]
    fn eye_position_inverts_translation() {
        let eye = Vec3::new(3.0, -2.0, 7.0);
        let view = Mat4::new_translation(&-eye);
        let ctx = ViewContext::world(
            SurfaceHandle(1),
            view,
            Mat4::identity(),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let recovered = ctx.eye_position();
        assert!((recovered - eye).norm() < 1e-5);
    }
}
