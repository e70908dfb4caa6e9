//! End-to-end tests for the producer/consumer pipeline
//!
//! These exercise the full path: facade mutations on the producer side,
//! queued commands, consumer-side proxy state, and headless frame
//! rendering — single-threaded first, then across real threads.

use crate::config::UiRendererConfig;
use crate::element::{BatchKey, DirtyFlags, TextureId, UiElement};
use crate::engine::UiEngine;
use crate::foundation::math::{Rect, Vec2, Vec4};
use crate::pipeline::{command_queue, CommandReceiver, RenderCommand};
use crate::render::backend::{HeadlessBackend, Submission};
use crate::render::dispatcher::RenderDispatcher;
use crate::render::frame::{SurfaceHandle, ViewContext};
use crate::render::primitive::PostProcessKind;

const SURFACE: SurfaceHandle = SurfaceHandle(1);

fn engine_and_dispatcher(config: UiRendererConfig) -> (UiEngine, RenderDispatcher) {
    let (sender, receiver) = command_queue();
    let engine = UiEngine::new(config, sender);
    let mut backend = HeadlessBackend::new();
    backend.add_surface(SURFACE, 800, 600);
    (engine, RenderDispatcher::new(receiver, Box::new(backend)))
}

fn screen_view() -> ViewContext {
    ViewContext::screen_overlay(SURFACE, 800.0, 600.0)
}

fn quad(depth: i32, key: BatchKey) -> UiElement {
    UiElement::quad(Vec2::new(0.0, 0.0), Vec2::new(32.0, 32.0), depth, key)
}

fn headless(dispatcher: &RenderDispatcher) -> &HeadlessBackend {
    dispatcher
        .renderer()
        .backend()
        .as_any()
        .downcast_ref::<HeadlessBackend>()
        .expect("tests use the headless backend")
}

#[test]
fn one_batch_renders_as_one_draw_submission() {
    let (mut engine, mut dispatcher) = engine_and_dispatcher(UiRendererConfig::default());
    let panel = engine.add_screen_panel(0);
    for depth in [10, 20, 30] {
        engine.register_element(panel, quad(depth, BatchKey::untextured())).unwrap();
    }
    engine.submit(screen_view());

    let stats = dispatcher.pump_frame();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].mesh_draws, 1, "three compatible quads, one draw");
    assert_eq!(dispatcher.store().len(), 1);

    // the uploaded buffer carries all three quads
    let backend = headless(&dispatcher);
    let draw = backend
        .submissions
        .iter()
        .find_map(|s| match s {
            Submission::MeshDraw { proxy, index_count } => Some((*proxy, *index_count)),
            _ => None,
        })
        .unwrap();
    assert_eq!(draw.1, 18);
    assert_eq!(backend.geometry_counts(draw.0), Some((12, 18)));
}

#[test]
fn removal_shrinks_the_shared_buffer_next_frame() {
    let (mut engine, mut dispatcher) = engine_and_dispatcher(UiRendererConfig::default());
    let panel = engine.add_screen_panel(0);
    let ids: Vec<_> = [10, 20, 30]
        .into_iter()
        .map(|d| engine.register_element(panel, quad(d, BatchKey::untextured())).unwrap())
        .collect();
    engine.submit(screen_view());
    dispatcher.pump_frame();

    engine.unregister_element(ids[1]).unwrap();
    engine.submit(screen_view());
    dispatcher.pump_frame();

    let backend = headless(&dispatcher);
    let last_draw = backend
        .submissions
        .iter()
        .rev()
        .find_map(|s| match s {
            Submission::MeshDraw { proxy, index_count } => Some((*proxy, *index_count)),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_draw.1, 12, "two quads remain");
    assert_eq!(backend.geometry_counts(last_draw.0), Some((8, 12)));
}

#[test]
fn incompatible_material_splits_into_two_submissions() {
    let (mut engine, mut dispatcher) = engine_and_dispatcher(UiRendererConfig::default());
    let panel = engine.add_screen_panel(0);
    engine.register_element(panel, quad(10, BatchKey::untextured())).unwrap();
    engine.register_element(panel, quad(30, BatchKey::untextured())).unwrap();
    engine
        .register_element(panel, quad(25, BatchKey::textured(TextureId(7))))
        .unwrap();
    engine.submit(screen_view());

    let stats = dispatcher.pump_frame();
    assert_eq!(stats[0].mesh_draws, 2);
}

#[test]
fn attribute_dirty_roundtrip_updates_the_gpu_copy() {
    let (mut engine, mut dispatcher) = engine_and_dispatcher(UiRendererConfig::default());
    let panel = engine.add_screen_panel(0);
    let id = engine.register_element(panel, quad(10, BatchKey::untextured())).unwrap();
    engine.submit(screen_view());
    dispatcher.pump_frame();

    engine.element_mut(id).unwrap().color = Vec4::new(0.2, 0.4, 0.6, 1.0);
    engine.notify_element_dirty(id, DirtyFlags::COLOR).unwrap();
    engine.submit(screen_view());
    dispatcher.pump_frame();

    // consumer-side mirror reflects the new color
    let store = dispatcher.store();
    let proxy = dispatcher
        .registry()
        .screen_primitives()
        .first()
        .and_then(|&h| store.get(h))
        .unwrap();
    match &proxy.primitive {
        crate::render::primitive::UiPrimitive::Mesh(mesh) => {
            assert_eq!(mesh.vertices[0].color, [0.2, 0.4, 0.6, 1.0]);
        }
        crate::render::primitive::UiPrimitive::PostProcess(_) => panic!("expected mesh"),
    }
}

#[test]
fn post_process_and_mesh_share_one_snapshot_per_frame() {
    let (mut engine, mut dispatcher) = engine_and_dispatcher(UiRendererConfig::default());
    let panel = engine.add_screen_panel(0);
    engine.register_element(panel, quad(10, BatchKey::untextured())).unwrap();
    engine
        .add_post_process(
            panel,
            PostProcessKind::BackgroundBlur {
                strength: 8.0,
                iterations: 3,
            },
            Rect::new(100.0, 100.0, 200.0, 150.0),
            50,
            true,
        )
        .unwrap();
    engine.submit(screen_view());

    let stats = dispatcher.pump_frame();
    assert_eq!(stats[0].snapshots, 1);
    assert_eq!(stats[0].mesh_draws, 1);
    assert_eq!(stats[0].post_process_passes, 1);

    let backend = headless(&dispatcher);
    assert_eq!(backend.count_of(|s| matches!(s, Submission::Snapshot(_))), 1);
}

#[test]
fn destroy_is_ordered_after_pending_uploads() {
    // per-proxy FIFO: a destroy enqueued after an upload must not execute
    // before it
    let (mut engine, mut dispatcher) = engine_and_dispatcher(UiRendererConfig::default());
    let panel = engine.add_screen_panel(0);
    let id = engine.register_element(panel, quad(10, BatchKey::untextured())).unwrap();
    engine.submit(screen_view());
    engine.unregister_element(id).unwrap();
    engine.submit(screen_view());

    // both frames' commands drain together; the create/upload executes
    // first, then the destroy, leaving a clean store
    dispatcher.pump_frame();
    assert!(dispatcher.store().is_empty());
    assert!(dispatcher.registry().is_empty());
}

#[test]
fn per_proxy_execution_trace_matches_enqueue_order() {
    let (sender, receiver) = command_queue();
    let mut engine = UiEngine::new(UiRendererConfig::default(), sender);
    let panel = engine.add_screen_panel(0);

    std::thread::scope(|scope| {
        scope.spawn(move || {
            let id = engine
                .register_element(panel, quad(10, BatchKey::untextured()))
                .unwrap();
            engine.submit(screen_view());
            engine.element_mut(id).unwrap().position = Vec2::new(5.0, 5.0);
            engine.notify_element_dirty(id, DirtyFlags::POSITION).unwrap();
            engine.submit(screen_view());
            engine.unregister_element(id).unwrap();
            engine.submit(screen_view());
        });
    });

    // consumer: observe commands per proxy in execution order
    let consumer: CommandReceiver = receiver;
    let commands = consumer.drain();
    let proxy_commands: Vec<&'static str> = commands
        .iter()
        .filter(|c| c.proxy_handle().is_some())
        .map(RenderCommand::name)
        .collect();
    assert_eq!(
        proxy_commands,
        vec!["CreateMeshProxy", "UploadGeometry", "UploadGeometry", "DestroyProxy"]
    );
}

#[test]
fn cross_thread_pipeline_round_trip() {
    let (sender, receiver) = command_queue();
    let mut backend = HeadlessBackend::new();
    backend.add_surface(SURFACE, 800, 600);
    let mut dispatcher = RenderDispatcher::new(receiver, Box::new(backend));

    let producer = std::thread::spawn(move || {
        let mut engine = UiEngine::new(UiRendererConfig::default(), sender);
        let panel = engine.add_screen_panel(0);
        let mut ids = Vec::new();
        for depth in 0..64 {
            let key = if depth % 2 == 0 {
                BatchKey::untextured()
            } else {
                BatchKey::textured(TextureId(1))
            };
            ids.push(engine.register_element(panel, quad(depth, key)).unwrap());
        }
        engine.submit(screen_view());
        for id in ids.iter().step_by(3) {
            engine.unregister_element(*id).unwrap();
        }
        engine.submit(screen_view());
        engine.stats(panel).unwrap()
    });
    let producer_stats = producer.join().unwrap();
    assert!(producer_stats.element_count > 0);

    let stats = dispatcher.pump_frame();
    // two submits queued before the drain; both render
    assert_eq!(stats.len(), 2);
    for frame in &stats {
        assert!(!frame.skipped);
        assert!(frame.mesh_draws > 0);
    }
}

#[test]
fn world_panel_view_renders_and_screen_view_ignores_it() {
    let (mut engine, mut dispatcher) = engine_and_dispatcher(UiRendererConfig::default());
    let transform =
        crate::foundation::math::Mat4::new_translation(&crate::foundation::math::Vec3::new(
            0.0, 0.0, -10.0,
        ));
    let panel = engine.add_world_panel(transform, 0);
    engine.register_element(panel, quad(10, BatchKey::untextured())).unwrap();

    let projection = crate::foundation::math::Mat4::new_perspective(4.0 / 3.0, 1.0, 0.1, 1000.0);
    let world_view = ViewContext::world(
        SURFACE,
        crate::foundation::math::Mat4::identity(),
        projection,
        Rect::new(0.0, 0.0, 800.0, 600.0),
    );
    engine.submit(world_view);
    engine.submit(screen_view());

    let stats = dispatcher.pump_frame();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].mesh_draws, 1, "world view draws the panel");
    assert!(stats[1].skipped, "screen view has nothing to draw");
}

#[test]
fn msaa_config_resolves_at_frame_end() {
    let config = UiRendererConfig {
        msaa_samples: 4,
        ..Default::default()
    };
    let samples = config.msaa_samples;
    let (mut engine, mut dispatcher) = engine_and_dispatcher(config);
    let panel = engine.add_screen_panel(0);
    engine.register_element(panel, quad(10, BatchKey::untextured())).unwrap();
    engine.submit(screen_view().with_sample_count(samples));

    let stats = dispatcher.pump_frame();
    assert!(stats[0].resolved);
    let backend = headless(&dispatcher);
    let resolve_index = backend
        .submissions
        .iter()
        .position(|s| matches!(s, Submission::Resolve))
        .unwrap();
    let last_draw = backend
        .submissions
        .iter()
        .rposition(|s| matches!(s, Submission::MeshDraw { .. }))
        .unwrap();
    assert!(resolve_index > last_draw, "resolve runs after all draws");
}
