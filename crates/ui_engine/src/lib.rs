//! # UI Engine
//!
//! A batched 2D UI rendering core for use inside a 3D engine.
//!
//! ## Features
//!
//! - **Drawcall Batching**: Packs many independent UI elements into shared
//!   vertex/index buffers, minimizing GPU draw submissions
//! - **Cross-Thread Pipeline**: Producer thread batches geometry, consumer
//!   thread talks to the GPU, connected by a single ordered command queue
//! - **Incremental Repair**: Insert/remove/depth changes patch existing
//!   batches instead of rebuilding the whole panel
//! - **Screen & World Space**: Panels render as screen overlays or as
//!   independently transformed surfaces in the 3D scene
//! - **Post-Process Effects**: Background blur/pixelate primitives that can
//!   sample a shared pre-UI snapshot of the screen
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ui_engine::prelude::*;
//!
//! fn main() {
//!     let config = UiRendererConfig::default();
//!     let (sender, receiver) = command_queue();
//!
//!     // Producer side: layout and batching
//!     let mut engine = UiEngine::new(config, sender);
//!     let panel = engine.add_screen_panel(0);
//!     let element = UiElement::quad(
//!         Vec2::new(16.0, 16.0),
//!         Vec2::new(128.0, 32.0),
//!         10,
//!         BatchKey::untextured(),
//!     );
//!     engine.register_element(panel, element).unwrap();
//!
//!     // Consumer side: GPU submission (headless backend here)
//!     let mut dispatcher = RenderDispatcher::new(receiver, Box::new(HeadlessBackend::new()));
//!
//!     engine.submit(ViewContext::screen_overlay(SurfaceHandle(1), 800.0, 600.0));
//!     dispatcher.pump_frame();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod element;
pub mod geometry;
pub mod batching;
pub mod pipeline;
pub mod render;

mod engine;

#[cfg(test)]
mod engine_tests;

pub use engine::{ElementId, PanelPlacement, UiEngine};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        batching::{BatchError, BatchResult, BatchStats},
        config::UiRendererConfig,
        element::{BatchKey, DirtyFlags, MaterialId, PanelId, TextureId, UiElement},
        engine::{ElementId, PanelPlacement, UiEngine},
        foundation::math::{Mat4, Rect, Vec2, Vec3, Vec4},
        pipeline::{command_queue, ProxyHandle},
        render::{
            backend::{HeadlessBackend, RenderBackend},
            dispatcher::RenderDispatcher,
            frame::{SurfaceHandle, ViewContext},
            primitive::PostProcessKind,
        },
    };
}
