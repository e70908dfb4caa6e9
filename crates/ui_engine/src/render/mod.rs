//! # Consumer-Thread Rendering
//!
//! Everything on the GPU side of the command queue: proxy-backed primitives,
//! the per-view registry, the per-frame collector, and the frame renderer
//! that issues draw submissions through the backend abstraction.
//!
//! ## Architecture
//!
//! - **[`primitive`]**: the closed primitive sum type {Mesh, PostProcess}
//! - **[`registry`]**: per-view registry of live primitives (screen overlay
//!   list plus world-space panels), owned by the consumer
//! - **[`collector`]**: per-frame culling, sorting, and run partitioning
//! - **[`frame`]**: view/frame context passed from the view provider
//! - **[`frame_renderer`]**: replays sorted runs against the backend
//! - **[`backend`]**: the graphics abstraction boundary; platform APIs live
//!   behind it, never in this crate
//! - **[`dispatcher`]**: drains the command queue and drives the renderer

pub mod backend;
pub mod collector;
pub mod dispatcher;
pub mod frame;
pub mod frame_renderer;
pub mod primitive;
pub mod registry;

use thiserror::Error;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while rendering a view
///
/// All of these are recovered locally: the worst case is a skipped view or
/// a missing primitive for one frame, never a crash.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The target surface is missing or zero-sized; the view's submission
    /// is skipped for this frame and retried on the next
    #[error("invalid render target: {0}")]
    InvalidTarget(String),

    /// An off-screen allocation (snapshot or multi-sample surface) failed;
    /// dependent primitives are skipped for this frame
    #[error("render resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The backend rejected a submission
    #[error("backend failure: {0}")]
    BackendFailure(String),
}
