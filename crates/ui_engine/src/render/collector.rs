//! Per-frame primitive collection
//!
//! Gathers the proxies relevant to one view, culls, sorts, and groups them
//! into contiguous same-kind runs. Runs are the unit the frame renderer
//! iterates: each kind switch is a render-pass boundary (post-process
//! primitives must end the current pass to sample the in-progress image),
//! so maximal runs minimize pass switches.

use crate::foundation::math::{Mat4, Vec3};
use crate::pipeline::{ProxyHandle, ProxyStore};

use super::frame::{ViewContext, ViewKind};
use super::primitive::PrimitiveKind;
use super::registry::ViewRegistry;

/// Frustum slack for panel-origin culling; panels have extent, so the
/// origin test accepts a margin beyond the exact clip volume
const CULL_MARGIN: f32 = 1.5;

/// A maximal contiguous run of same-kind primitives
#[derive(Debug)]
pub struct PrimitiveRun {
    /// The kind shared by every primitive in the run
    pub kind: PrimitiveKind,
    /// Member proxies in final submission order
    pub proxies: Vec<ProxyHandle>,
}

/// The transient, per-view result of collection
#[derive(Debug, Default)]
pub struct ViewRenderList {
    /// Sorted runs in submission order
    pub runs: Vec<PrimitiveRun>,
    /// Whether any collected post-process primitive samples the pre-UI
    /// screen image; decides the frame's single shared snapshot
    pub needs_screen_snapshot: bool,
    /// Total primitives across all runs
    pub primitive_count: usize,
}

impl ViewRenderList {
    /// Whether nothing was collected
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Gather, cull, sort, and partition one view's primitives
pub fn collect_view(
    view: &ViewContext,
    store: &ProxyStore,
    registry: &ViewRegistry,
) -> ViewRenderList {
    let ordered = match view.kind {
        ViewKind::ScreenOverlay => gather_screen(store, registry),
        ViewKind::World => gather_world(view, store, registry),
    };
    partition_runs(store, ordered)
}

/// Screen-space: every visible overlay proxy, sorted purely by priority
fn gather_screen(store: &ProxyStore, registry: &ViewRegistry) -> Vec<ProxyHandle> {
    let mut handles: Vec<ProxyHandle> = registry
        .screen_primitives()
        .iter()
        .copied()
        .filter(|&handle| store.get(handle).is_some_and(|proxy| proxy.can_render()))
        .collect();
    // stable: equal priorities keep registration order
    handles.sort_by_key(|&handle| store.get(handle).map_or((0, 0), |proxy| proxy.sort_key()));
    handles
}

/// World-space: panels sorted by explicit priority, translucent content
/// back-to-front within equal priority; each panel contributes its visible
/// proxies in within-panel priority order
fn gather_world(
    view: &ViewContext,
    store: &ProxyStore,
    registry: &ViewRegistry,
) -> Vec<ProxyHandle> {
    let view_projection = view.view_projection();
    let eye = view.eye_position();

    struct PanelSequence {
        priority: i32,
        distance_sq: f32,
        proxies: Vec<ProxyHandle>,
    }

    let mut sequences: Vec<PanelSequence> = Vec::new();
    for (panel, entry) in registry.world_panels() {
        let origin = Vec3::new(entry.transform.m14, entry.transform.m24, entry.transform.m34);
        if !origin_in_frustum(&view_projection, origin) {
            log::trace!("panel {panel:?} culled");
            continue;
        }
        let mut proxies: Vec<ProxyHandle> = entry
            .primitives
            .iter()
            .copied()
            .filter(|&handle| store.get(handle).is_some_and(|proxy| proxy.can_render()))
            .collect();
        if proxies.is_empty() {
            continue;
        }
        proxies.sort_by_key(|&handle| store.get(handle).map_or(0, |proxy| proxy.priority));
        sequences.push(PanelSequence {
            priority: entry.priority,
            distance_sq: (origin - eye).norm_squared(),
            proxies,
        });
    }

    // explicit priority first; equal priorities draw farthest-first so
    // nearer translucent panels composite over farther ones
    sequences.sort_by(|a, b| {
        a.priority.cmp(&b.priority).then(
            b.distance_sq
                .partial_cmp(&a.distance_sq)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    sequences
        .into_iter()
        .flat_map(|sequence| sequence.proxies)
        .collect()
}

/// Clip-space containment test for a world position, with margin
fn origin_in_frustum(view_projection: &Mat4, origin: Vec3) -> bool {
    let clip = view_projection * origin.push(1.0);
    if clip.w <= 0.0 {
        return false;
    }
    let limit = clip.w * CULL_MARGIN;
    clip.x.abs() <= limit && clip.y.abs() <= limit
}

/// Partition an ordered gather into maximal same-kind runs and compute the
/// frame's screen-snapshot requirement
fn partition_runs(store: &ProxyStore, ordered: Vec<ProxyHandle>) -> ViewRenderList {
    let mut list = ViewRenderList::default();
    for handle in ordered {
        let Some(proxy) = store.get(handle) else {
            continue;
        };
        let kind = proxy.primitive.kind();
        if let crate::render::primitive::UiPrimitive::PostProcess(pp) = &proxy.primitive {
            if pp.needs_screen_image {
                list.needs_screen_snapshot = true;
            }
        }
        match list.runs.last_mut() {
            Some(run) if run.kind == kind => run.proxies.push(handle),
            _ => list.runs.push(PrimitiveRun {
                kind,
                proxies: vec![handle],
            }),
        }
        list.primitive_count += 1;
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BatchKey, PanelId};
    use crate::foundation::math::{Mat4, Rect, Vec3};
    use crate::geometry::UiVertex;
    use crate::pipeline::{ProxyPlacement, RenderCommand};
    use crate::render::frame::SurfaceHandle;
    use crate::render::primitive::PostProcessKind;

    fn mesh_vertex() -> UiVertex {
        UiVertex {
            position: [0.0; 3],
            uv: [0.0; 2],
            color: [1.0; 4],
        }
    }

    fn add_mesh(
        store: &mut ProxyStore,
        registry: &mut ViewRegistry,
        handle: u64,
        placement: ProxyPlacement,
        priority: i32,
    ) {
        store.apply(
            RenderCommand::CreateMeshProxy {
                handle: ProxyHandle(handle),
                placement,
                key: BatchKey::untextured(),
                panel_priority: 0,
                priority,
            },
            registry,
        );
        store.apply(
            RenderCommand::UploadGeometry {
                handle: ProxyHandle(handle),
                vertices: vec![mesh_vertex(); 4],
                indices: vec![0, 1, 2, 2, 1, 3],
                positions_changed: true,
            },
            registry,
        );
    }

    fn add_blur(
        store: &mut ProxyStore,
        registry: &mut ViewRegistry,
        handle: u64,
        placement: ProxyPlacement,
        priority: i32,
        needs_screen_image: bool,
    ) {
        store.apply(
            RenderCommand::CreatePostProcessProxy {
                handle: ProxyHandle(handle),
                placement,
                effect: PostProcessKind::BackgroundBlur {
                    strength: 4.0,
                    iterations: 2,
                },
                region: Rect::new(0.0, 0.0, 32.0, 32.0),
                needs_screen_image,
                panel_priority: 0,
                priority,
            },
            registry,
        );
    }

    fn screen_view() -> ViewContext {
        ViewContext::screen_overlay(SurfaceHandle(1), 800.0, 600.0)
    }

    #[test]
    fn screen_primitives_sort_by_priority() {
        let mut store = ProxyStore::new();
        let mut registry = ViewRegistry::new();
        add_mesh(&mut store, &mut registry, 1, ProxyPlacement::ScreenOverlay, 30);
        add_mesh(&mut store, &mut registry, 2, ProxyPlacement::ScreenOverlay, 10);
        add_mesh(&mut store, &mut registry, 3, ProxyPlacement::ScreenOverlay, 20);

        let list = collect_view(&screen_view(), &store, &registry);
        assert_eq!(list.runs.len(), 1);
        assert_eq!(
            list.runs[0].proxies,
            vec![ProxyHandle(2), ProxyHandle(3), ProxyHandle(1)]
        );
        assert!(!list.needs_screen_snapshot);
    }

    #[test]
    fn same_kind_primitives_form_maximal_runs() {
        let mut store = ProxyStore::new();
        let mut registry = ViewRegistry::new();
        add_mesh(&mut store, &mut registry, 1, ProxyPlacement::ScreenOverlay, 10);
        add_mesh(&mut store, &mut registry, 2, ProxyPlacement::ScreenOverlay, 20);
        add_blur(&mut store, &mut registry, 3, ProxyPlacement::ScreenOverlay, 30, true);
        add_mesh(&mut store, &mut registry, 4, ProxyPlacement::ScreenOverlay, 40);

        let list = collect_view(&screen_view(), &store, &registry);
        let kinds: Vec<_> = list.runs.iter().map(|run| run.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PrimitiveKind::Mesh,
                PrimitiveKind::PostProcess,
                PrimitiveKind::Mesh
            ]
        );
        assert_eq!(list.runs[0].proxies.len(), 2);
        assert!(list.needs_screen_snapshot);
        assert_eq!(list.primitive_count, 4);
    }

    #[test]
    fn unrenderable_proxies_are_skipped() {
        let mut store = ProxyStore::new();
        let mut registry = ViewRegistry::new();
        // created but no geometry uploaded yet: the registration/upload race
        store.apply(
            RenderCommand::CreateMeshProxy {
                handle: ProxyHandle(1),
                placement: ProxyPlacement::ScreenOverlay,
                key: BatchKey::untextured(),
                panel_priority: 0,
                priority: 0,
            },
            &mut registry,
        );
        add_mesh(&mut store, &mut registry, 2, ProxyPlacement::ScreenOverlay, 1);

        let list = collect_view(&screen_view(), &store, &registry);
        assert_eq!(list.primitive_count, 1);
        assert_eq!(list.runs[0].proxies, vec![ProxyHandle(2)]);
    }

    fn world_view() -> ViewContext {
        // camera at origin looking down -z
        let projection = Mat4::new_perspective(4.0 / 3.0, 1.0, 0.1, 1000.0);
        ViewContext::world(
            SurfaceHandle(1),
            Mat4::identity(),
            projection,
            Rect::new(0.0, 0.0, 800.0, 600.0),
        )
    }

    #[test]
    fn world_panels_sort_by_priority_then_back_to_front() {
        let mut store = ProxyStore::new();
        let mut registry = ViewRegistry::new();

        let near = PanelId(1);
        let far = PanelId(2);
        registry.upsert_panel(near, Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0)), 0);
        registry.upsert_panel(far, Mat4::new_translation(&Vec3::new(0.0, 0.0, -50.0)), 0);
        add_mesh(&mut store, &mut registry, 1, ProxyPlacement::WorldPanel(near), 0);
        add_mesh(&mut store, &mut registry, 2, ProxyPlacement::WorldPanel(far), 0);

        let list = collect_view(&world_view(), &store, &registry);
        // farther panel draws first so the nearer one composites over it
        assert_eq!(list.runs[0].proxies, vec![ProxyHandle(2), ProxyHandle(1)]);
    }

    #[test]
    fn panel_behind_camera_is_culled() {
        let mut store = ProxyStore::new();
        let mut registry = ViewRegistry::new();
        let behind = PanelId(1);
        registry.upsert_panel(behind, Mat4::new_translation(&Vec3::new(0.0, 0.0, 10.0)), 0);
        add_mesh(&mut store, &mut registry, 1, ProxyPlacement::WorldPanel(behind), 0);

        let list = collect_view(&world_view(), &store, &registry);
        assert!(list.is_empty());
    }

    #[test]
    fn panel_priority_overrides_distance() {
        let mut store = ProxyStore::new();
        let mut registry = ViewRegistry::new();
        let near_high = PanelId(1);
        let far_low = PanelId(2);
        registry.upsert_panel(near_high, Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0)), 10);
        registry.upsert_panel(far_low, Mat4::new_translation(&Vec3::new(0.0, 0.0, -50.0)), 0);
        add_mesh(&mut store, &mut registry, 1, ProxyPlacement::WorldPanel(near_high), 0);
        add_mesh(&mut store, &mut registry, 2, ProxyPlacement::WorldPanel(far_low), 0);

        let list = collect_view(&world_view(), &store, &registry);
        assert_eq!(list.runs[0].proxies, vec![ProxyHandle(2), ProxyHandle(1)]);
    }
}
