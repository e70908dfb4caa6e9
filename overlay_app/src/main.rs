//! Overlay demo application
//!
//! Demonstrates the UI engine's batching and cross-thread submission by
//! running the producer and consumer on separate threads over a headless
//! backend: a HUD panel of quads, a sprite that moves every frame, a
//! background-blur effect, and a world-space panel in front of the camera.

use std::sync::mpsc;

use ui_engine::prelude::*;
use ui_engine::element::TextureId;
use ui_engine::foundation::math::Vec3;
use ui_engine::render::frame::SurfaceHandle;

const SCREEN: SurfaceHandle = SurfaceHandle(1);
const FRAMES: usize = 120;

fn main() {
    env_logger::init();
    log::info!("Starting overlay demo ({FRAMES} frames, headless backend)");

    let config = UiRendererConfig::default();
    let (sender, receiver) = command_queue();

    // consumer thread: drains the queue and issues draws once per frame.
    // The std channel only signals frame pacing; renderable state crosses
    // exclusively through the render command queue.
    let (frame_tx, frame_rx) = mpsc::channel::<()>();
    let consumer = std::thread::spawn(move || {
        let mut backend = HeadlessBackend::new();
        backend.add_surface(SCREEN, 1280, 720);
        let mut dispatcher = RenderDispatcher::new(receiver, Box::new(backend));

        let mut total_draws = 0usize;
        let mut total_passes = 0usize;
        while frame_rx.recv().is_ok() {
            for stats in dispatcher.pump_frame() {
                total_draws += stats.mesh_draws;
                total_passes += stats.post_process_passes;
            }
        }
        // drain whatever the producer enqueued after the last pacing tick
        for stats in dispatcher.pump_frame() {
            total_draws += stats.mesh_draws;
            total_passes += stats.post_process_passes;
        }
        (total_draws, total_passes)
    });

    // producer thread: this one
    let mut engine = UiEngine::new(config, sender);

    // HUD: a handful of widgets sharing one texture, so one draw call
    let hud = engine.add_screen_panel(0);
    let mut sprite = None;
    for i in 0..8 {
        let element = UiElement::quad(
            Vec2::new(16.0 + 72.0 * i as f32, 16.0),
            Vec2::new(64.0, 64.0),
            10 + i,
            BatchKey::textured(TextureId(1)),
        );
        let id = engine.register_element(hud, element).expect("hud quad fits");
        if i == 0 {
            sprite = Some(id);
        }
    }
    let sprite = sprite.expect("first hud quad registered");

    // a blur behind a dialog box, sampling the pre-UI screen image
    engine
        .add_post_process(
            hud,
            PostProcessKind::BackgroundBlur {
                strength: 6.0,
                iterations: 3,
            },
            Rect::new(400.0, 200.0, 480.0, 320.0),
            100,
            true,
        )
        .expect("panel exists");

    // a world-space panel floating in front of the camera
    let world_panel = engine.add_world_panel(Mat4::new_translation(&Vec3::new(0.0, 1.0, -6.0)), 0);
    engine
        .register_element(
            world_panel,
            UiElement::quad(
                Vec2::new(-1.0, -0.5),
                Vec2::new(2.0, 1.0),
                0,
                BatchKey::untextured(),
            )
            .with_color(Vec4::new(0.1, 0.9, 0.4, 0.8)),
        )
        .expect("world quad fits");

    let projection = Mat4::new_perspective(1280.0 / 720.0, 1.0, 0.1, 1000.0);
    for frame in 0..FRAMES {
        // animate the sprite; only its position channel is dirty
        if let Some(element) = engine.element_mut(sprite) {
            element.position = Vec2::new(16.0 + (frame as f32) * 2.0, 16.0);
        }
        engine
            .notify_element_dirty(sprite, DirtyFlags::POSITION)
            .expect("sprite registered");

        engine.submit(ViewContext::world(
            SCREEN,
            Mat4::identity(),
            projection,
            Rect::new(0.0, 0.0, 1280.0, 720.0),
        ));
        engine.submit(ViewContext::screen_overlay(SCREEN, 1280.0, 720.0));
        if frame_tx.send(()).is_err() {
            break;
        }
    }
    drop(frame_tx);

    let hud_stats = engine.stats(hud).expect("hud panel exists");
    let (draws, passes) = consumer.join().expect("consumer thread finished");
    log::info!(
        "done: {} hud draw calls over {} elements, {draws} mesh submissions, {passes} post-process passes",
        hud_stats.draw_call_count,
        hud_stats.element_count,
    );
    println!(
        "overlay demo: {FRAMES} frames, {} hud draw calls / {} elements, {draws} mesh submissions, {passes} blur passes",
        hud_stats.draw_call_count, hud_stats.element_count
    );
}
