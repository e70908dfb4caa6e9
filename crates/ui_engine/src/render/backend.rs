//! Backend abstraction for GPU submission
//!
//! The frame renderer talks to the graphics API only through this trait, so
//! the core stays platform-agnostic. A real implementation wraps the
//! engine's graphics device; [`HeadlessBackend`] records submissions for
//! tests and tooling.

use std::collections::HashMap;

use crate::element::BatchKey;
use crate::foundation::math::Mat4;
use crate::geometry::UiVertex;
use crate::pipeline::ProxyHandle;

use super::frame::{FrameContext, ScreenImageHandle, SurfaceHandle};
use super::primitive::PostProcessPrimitive;
use super::{RenderError, RenderResult};

/// The graphics operations the frame renderer needs
///
/// Implementations own all GPU-side resources. Buffer uploads arrive
/// wholesale from the command queue; after upload only the consumer thread
/// (through this trait) touches the GPU-side copy.
pub trait RenderBackend {
    /// The current extent of a target surface, or `None` if the surface is
    /// not allocated
    fn surface_extent(&self, surface: SurfaceHandle) -> Option<(u32, u32)>;

    /// Replace a proxy's GPU vertex/index buffers
    fn upload_geometry(
        &mut self,
        proxy: ProxyHandle,
        vertices: &[UiVertex],
        indices: &[u16],
    ) -> RenderResult<()>;

    /// Release a destroyed proxy's GPU buffers
    fn release_geometry(&mut self, proxy: ProxyHandle);

    /// Bind the frame's target surface, optionally clearing it
    fn begin_view(&mut self, frame: &FrameContext, clear_color: Option<[f32; 4]>)
        -> RenderResult<()>;

    /// Snapshot the target's current contents before any UI draws
    ///
    /// Called at most once per frame; the returned image is shared by every
    /// primitive that samples the pre-UI screen.
    fn snapshot_screen(&mut self, frame: &FrameContext) -> RenderResult<ScreenImageHandle>;

    /// Submit one mesh draw call
    fn draw_mesh(
        &mut self,
        frame: &FrameContext,
        proxy: ProxyHandle,
        key: &BatchKey,
        index_count: u32,
        view_projection: &Mat4,
    ) -> RenderResult<()>;

    /// Run one post-process sub-pass
    fn draw_post_process(
        &mut self,
        frame: &FrameContext,
        primitive: &PostProcessPrimitive,
        screen: Option<ScreenImageHandle>,
    ) -> RenderResult<()>;

    /// Resolve the multi-sample surface into the single-sample output
    fn resolve_multisample(&mut self, frame: &FrameContext) -> RenderResult<()>;

    /// Finish the frame's work on the target surface
    fn end_view(&mut self, frame: &FrameContext) -> RenderResult<()>;

    /// Downcast to the concrete backend type
    ///
    /// Breaks the abstraction, but inspection tooling and tests need to
    /// reach the concrete implementation behind the box.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to the mutable concrete backend type
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Target bound, with whether it was cleared
    BeginView {
        /// The bound surface
        surface: SurfaceHandle,
        /// Whether a clear was applied
        cleared: bool,
    },
    /// Pre-UI screen snapshot resolved
    Snapshot(ScreenImageHandle),
    /// One mesh draw call submitted
    MeshDraw {
        /// The drawn proxy
        proxy: ProxyHandle,
        /// Indices drawn
        index_count: u32,
    },
    /// One post-process sub-pass
    PostProcess {
        /// The snapshot the pass sampled, if any
        screen: Option<ScreenImageHandle>,
    },
    /// Multi-sample resolve pass
    Resolve,
    /// Frame finished on the target
    EndView,
}

/// A backend that records submissions instead of talking to a GPU
///
/// Used by tests and headless tooling. Surfaces must be registered with an
/// extent before a view targeting them can render, mirroring swapchain
/// allocation in a real backend.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    surfaces: HashMap<SurfaceHandle, (u32, u32)>,
    geometry: HashMap<ProxyHandle, (usize, usize)>,
    next_snapshot: u64,
    /// Every call recorded in submission order
    pub submissions: Vec<Submission>,
    /// Force snapshot allocation to fail (resource-exhaustion testing)
    pub fail_snapshots: bool,
}

impl HeadlessBackend {
    /// Create a backend with no surfaces
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or resize) a surface
    pub fn add_surface(&mut self, surface: SurfaceHandle, width: u32, height: u32) {
        self.surfaces.insert(surface, (width, height));
    }

    /// Uploaded (vertex, index) counts for a proxy, if any
    pub fn geometry_counts(&self, proxy: ProxyHandle) -> Option<(usize, usize)> {
        self.geometry.get(&proxy).copied()
    }

    /// Recorded submissions of one kind
    pub fn count_of(&self, matches: impl Fn(&Submission) -> bool) -> usize {
        self.submissions.iter().filter(|s| matches(s)).count()
    }
}

impl RenderBackend for HeadlessBackend {
    fn surface_extent(&self, surface: SurfaceHandle) -> Option<(u32, u32)> {
        self.surfaces.get(&surface).copied()
    }

    fn upload_geometry(
        &mut self,
        proxy: ProxyHandle,
        vertices: &[UiVertex],
        indices: &[u16],
    ) -> RenderResult<()> {
        self.geometry.insert(proxy, (vertices.len(), indices.len()));
        Ok(())
    }

    fn release_geometry(&mut self, proxy: ProxyHandle) {
        self.geometry.remove(&proxy);
    }

    fn begin_view(
        &mut self,
        frame: &FrameContext,
        clear_color: Option<[f32; 4]>,
    ) -> RenderResult<()> {
        self.submissions.push(Submission::BeginView {
            surface: frame.surface,
            cleared: clear_color.is_some(),
        });
        Ok(())
    }

    fn snapshot_screen(&mut self, _frame: &FrameContext) -> RenderResult<ScreenImageHandle> {
        if self.fail_snapshots {
            return Err(RenderError::ResourceExhausted(
                "snapshot surface allocation failed".into(),
            ));
        }
        self.next_snapshot += 1;
        let handle = ScreenImageHandle(self.next_snapshot);
        self.submissions.push(Submission::Snapshot(handle));
        Ok(handle)
    }

    fn draw_mesh(
        &mut self,
        _frame: &FrameContext,
        proxy: ProxyHandle,
        _key: &BatchKey,
        index_count: u32,
        _view_projection: &Mat4,
    ) -> RenderResult<()> {
        if !self.geometry.contains_key(&proxy) {
            return Err(RenderError::BackendFailure(format!(
                "draw of proxy {proxy:?} with no uploaded buffers"
            )));
        }
        self.submissions.push(Submission::MeshDraw { proxy, index_count });
        Ok(())
    }

    fn draw_post_process(
        &mut self,
        _frame: &FrameContext,
        _primitive: &PostProcessPrimitive,
        screen: Option<ScreenImageHandle>,
    ) -> RenderResult<()> {
        self.submissions.push(Submission::PostProcess { screen });
        Ok(())
    }

    fn resolve_multisample(&mut self, _frame: &FrameContext) -> RenderResult<()> {
        self.submissions.push(Submission::Resolve);
        Ok(())
    }

    fn end_view(&mut self, _frame: &FrameContext) -> RenderResult<()> {
        self.submissions.push(Submission::EndView);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
