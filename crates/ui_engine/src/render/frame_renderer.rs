//! Frame renderer
//!
//! Consumes one view's sorted run sequence and issues the actual draw
//! submissions: bind target, optional clear, at most one shared pre-UI
//! snapshot, one submission per draw call or post-process sub-pass, and a
//! final multi-sample resolve when the view rendered at a higher sample
//! count than the output.

use crate::render::primitive::UiPrimitive;
use crate::pipeline::ProxyStore;

use super::backend::RenderBackend;
use super::collector::{self, PrimitiveRun};
use super::frame::{FrameContext, ViewContext};
use super::registry::ViewRegistry;

/// Per-view outcome counters
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    /// The whole view was skipped (invalid target or nothing to render)
    pub skipped: bool,
    /// Mesh draw submissions issued
    pub mesh_draws: usize,
    /// Post-process sub-passes run
    pub post_process_passes: usize,
    /// Pre-UI snapshots resolved (0 or 1)
    pub snapshots: usize,
    /// Primitives dropped this frame (missing buffers or failed resources)
    pub skipped_primitives: usize,
    /// Whether a multi-sample resolve pass ran
    pub resolved: bool,
}

/// Issues GPU work for collected views through the backend abstraction
pub struct FrameRenderer {
    backend: Box<dyn RenderBackend>,
    frames_rendered: u64,
}

impl FrameRenderer {
    /// Create a renderer over a backend
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        Self {
            backend,
            frames_rendered: 0,
        }
    }

    /// Immutable backend access
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Mutable backend access (buffer uploads during the command drain)
    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    /// Total views rendered (not skipped) since creation
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Render one view
    ///
    /// Never fails hard: an invalid or zero-sized target skips the view for
    /// this frame (retried next frame), and a primitive whose resources are
    /// missing is dropped without blocking the rest of the sequence.
    pub fn render_view(
        &mut self,
        view: &ViewContext,
        store: &ProxyStore,
        registry: &ViewRegistry,
    ) -> FrameStats {
        let mut stats = FrameStats::default();

        let Some(extent) = self.backend.surface_extent(view.surface) else {
            log::warn!("view target {:?} not allocated, skipping view", view.surface);
            stats.skipped = true;
            return stats;
        };
        if extent.0 == 0 || extent.1 == 0 {
            log::warn!("view target {:?} is zero-sized, skipping view", view.surface);
            stats.skipped = true;
            return stats;
        }

        let list = collector::collect_view(view, store, registry);
        if list.is_empty() {
            stats.skipped = true;
            return stats;
        }

        let mut frame = FrameContext {
            surface: view.surface,
            extent,
            sample_count: view.sample_count.max(1),
            view_projection: view.view_projection(),
            screen_snapshot: None,
        };

        // the shared pre-UI snapshot: resolved once, before any UI draw,
        // never duplicated per primitive
        if list.needs_screen_snapshot {
            match self.backend.snapshot_screen(&frame) {
                Ok(image) => {
                    frame.screen_snapshot = Some(image);
                    stats.snapshots = 1;
                }
                Err(error) => {
                    log::warn!("pre-UI snapshot failed ({error}); dependent effects skipped");
                }
            }
        }

        if let Err(error) = self.backend.begin_view(&frame, view.clear_color) {
            log::warn!("failed to bind view target ({error}), skipping view");
            stats.skipped = true;
            return stats;
        }

        for run in &list.runs {
            self.render_run(run, store, &frame, &mut stats);
        }

        if frame.sample_count > 1 {
            match self.backend.resolve_multisample(&frame) {
                Ok(()) => stats.resolved = true,
                Err(error) => log::warn!("multi-sample resolve failed: {error}"),
            }
        }

        if let Err(error) = self.backend.end_view(&frame) {
            log::warn!("end_view failed: {error}");
        }

        self.frames_rendered += 1;
        log::trace!(
            "view {:?}: {} mesh draws, {} post-process passes",
            view.surface,
            stats.mesh_draws,
            stats.post_process_passes
        );
        stats
    }

    fn render_run(
        &mut self,
        run: &PrimitiveRun,
        store: &ProxyStore,
        frame: &FrameContext,
        stats: &mut FrameStats,
    ) {
        for &handle in &run.proxies {
            let Some(proxy) = store.get(handle) else {
                stats.skipped_primitives += 1;
                continue;
            };
            match &proxy.primitive {
                UiPrimitive::Mesh(mesh) => {
                    let result = self.backend.draw_mesh(
                        frame,
                        handle,
                        &mesh.key,
                        mesh.indices.len() as u32,
                        &frame.view_projection,
                    );
                    match result {
                        Ok(()) => stats.mesh_draws += 1,
                        Err(error) => {
                            // registration can race the first buffer upload;
                            // drop the primitive for this frame only
                            log::warn!("mesh draw for {handle:?} failed: {error}");
                            stats.skipped_primitives += 1;
                        }
                    }
                }
                UiPrimitive::PostProcess(effect) => {
                    if effect.needs_screen_image && frame.screen_snapshot.is_none() {
                        stats.skipped_primitives += 1;
                        continue;
                    }
                    match self
                        .backend
                        .draw_post_process(frame, effect, frame.screen_snapshot)
                    {
                        Ok(()) => stats.post_process_passes += 1,
                        Err(error) => {
                            log::warn!("post-process pass for {handle:?} failed: {error}");
                            stats.skipped_primitives += 1;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::BatchKey;
    use crate::foundation::math::Rect;
    use crate::geometry::UiVertex;
    use crate::pipeline::{ProxyHandle, ProxyPlacement, RenderCommand};
    use crate::render::backend::{HeadlessBackend, Submission};
    use crate::render::frame::SurfaceHandle;
    use crate::render::primitive::PostProcessKind;

    struct Harness {
        renderer: FrameRenderer,
        store: ProxyStore,
        registry: ViewRegistry,
    }

    fn harness() -> Harness {
        let mut backend = HeadlessBackend::new();
        backend.add_surface(SurfaceHandle(1), 800, 600);
        Harness {
            renderer: FrameRenderer::new(Box::new(backend)),
            store: ProxyStore::new(),
            registry: ViewRegistry::new(),
        }
    }

    impl Harness {
        fn backend(&self) -> &HeadlessBackend {
            self.renderer
                .backend()
                .as_any()
                .downcast_ref::<HeadlessBackend>()
                .expect("harness holds a headless backend")
        }
    }

    fn screen_view() -> ViewContext {
        ViewContext::screen_overlay(SurfaceHandle(1), 800.0, 600.0)
    }

    fn add_mesh(harness: &mut Harness, handle: u64, priority: i32) {
        harness.store.apply(
            RenderCommand::CreateMeshProxy {
                handle: ProxyHandle(handle),
                placement: ProxyPlacement::ScreenOverlay,
                key: BatchKey::untextured(),
                panel_priority: 0,
                priority,
            },
            &mut harness.registry,
        );
        let vertices = vec![
            UiVertex {
                position: [0.0; 3],
                uv: [0.0; 2],
                color: [1.0; 4],
            };
            4
        ];
        let indices = vec![0u16, 1, 2, 2, 1, 3];
        harness
            .renderer
            .backend_mut()
            .upload_geometry(ProxyHandle(handle), &vertices, &indices)
            .unwrap();
        harness.store.apply(
            RenderCommand::UploadGeometry {
                handle: ProxyHandle(handle),
                vertices,
                indices,
                positions_changed: true,
            },
            &mut harness.registry,
        );
    }

    fn add_blur(harness: &mut Harness, handle: u64, priority: i32) {
        harness.store.apply(
            RenderCommand::CreatePostProcessProxy {
                handle: ProxyHandle(handle),
                placement: ProxyPlacement::ScreenOverlay,
                effect: PostProcessKind::BackgroundBlur {
                    strength: 4.0,
                    iterations: 2,
                },
                region: Rect::new(0.0, 0.0, 64.0, 64.0),
                needs_screen_image: true,
                panel_priority: 0,
                priority,
            },
            &mut harness.registry,
        );
    }

    #[test]
    fn mesh_only_view_issues_one_draw_per_draw_call() {
        let mut h = harness();
        add_mesh(&mut h, 1, 10);
        add_mesh(&mut h, 2, 20);

        let stats = h.renderer.render_view(&screen_view(), &h.store, &h.registry);
        assert!(!stats.skipped);
        assert_eq!(stats.mesh_draws, 2);
        assert_eq!(stats.snapshots, 0);
    }

    #[test]
    fn post_process_with_mesh_shares_one_snapshot() {
        let mut h = harness();
        // mesh at lower priority draws first, blur over it
        add_mesh(&mut h, 1, 10);
        add_blur(&mut h, 2, 20);

        let stats = h.renderer.render_view(&screen_view(), &h.store, &h.registry);
        assert_eq!(stats.snapshots, 1);
        assert_eq!(stats.mesh_draws, 1);
        assert_eq!(stats.post_process_passes, 1);

        // exactly one snapshot, taken before any draw, and the blur pass
        // sampled that same image
        let backend = h.backend();
        let snapshot_count = backend.count_of(|s| matches!(s, Submission::Snapshot(_)));
        assert_eq!(snapshot_count, 1);
        let snapshot_index = backend
            .submissions
            .iter()
            .position(|s| matches!(s, Submission::Snapshot(_)))
            .unwrap();
        let first_draw_index = backend
            .submissions
            .iter()
            .position(|s| matches!(s, Submission::MeshDraw { .. }))
            .unwrap();
        assert!(snapshot_index < first_draw_index);
        let Submission::Snapshot(image) = backend.submissions[snapshot_index] else {
            unreachable!()
        };
        assert!(backend
            .submissions
            .iter()
            .any(|s| matches!(s, Submission::PostProcess { screen: Some(i) } if *i == image)));
    }

    #[test]
    fn zero_sized_target_skips_the_view() {
        let mut backend = HeadlessBackend::new();
        backend.add_surface(SurfaceHandle(1), 0, 0);
        let mut renderer = FrameRenderer::new(Box::new(backend));
        let store = ProxyStore::new();
        let registry = ViewRegistry::new();

        let stats = renderer.render_view(&screen_view(), &store, &registry);
        assert!(stats.skipped);
        assert_eq!(renderer.frames_rendered(), 0);
    }

    #[test]
    fn unallocated_target_skips_the_view() {
        let mut h = harness();
        add_mesh(&mut h, 1, 10);
        let view = ViewContext::screen_overlay(SurfaceHandle(99), 800.0, 600.0);
        let stats = h.renderer.render_view(&view, &h.store, &h.registry);
        assert!(stats.skipped);
    }

    #[test]
    fn msaa_view_resolves_once_at_the_end() {
        let mut h = harness();
        add_mesh(&mut h, 1, 10);
        let view = screen_view().with_sample_count(4);
        let stats = h.renderer.render_view(&view, &h.store, &h.registry);
        assert!(stats.resolved);
    }

    #[test]
    fn snapshot_failure_skips_dependent_effects_only() {
        let mut backend = HeadlessBackend::new();
        backend.add_surface(SurfaceHandle(1), 800, 600);
        backend.fail_snapshots = true;
        let mut h = Harness {
            renderer: FrameRenderer::new(Box::new(backend)),
            store: ProxyStore::new(),
            registry: ViewRegistry::new(),
        };
        add_mesh(&mut h, 1, 10);
        add_blur(&mut h, 2, 20);

        let stats = h.renderer.render_view(&screen_view(), &h.store, &h.registry);
        assert_eq!(stats.snapshots, 0);
        assert_eq!(stats.mesh_draws, 1, "mesh still renders");
        assert_eq!(stats.post_process_passes, 0);
        assert_eq!(stats.skipped_primitives, 1);
    }
}
