//! Drawcall batching engine
//!
//! Packs the renderable elements of one panel into the minimal number of
//! draw calls that respect material/texture/clip compatibility and depth
//! ordering, and keeps those draw calls valid as elements are added,
//! removed, reordered, or mutated.
//!
//! ## Architecture
//!
//! - **[`DrawCall`]**: an ordered run of compatible elements backed by one
//!   shared vertex buffer and one shared index buffer
//! - **[`BatchingEngine`]**: owns a panel's elements and its ordered
//!   draw-call list; performs incremental repair on every mutation
//! - **[`FrameOps`]**: the per-frame delta (created/retired draw calls and
//!   buffer uploads) consumed by the submission pipeline
//!
//! Batches are repaired incrementally: attribute-only changes patch the
//! shared buffer region in place, membership changes rebuild only the
//! affected draw call, and a full panel rebuild never happens implicitly.

pub mod draw_call;
pub mod engine;

pub use draw_call::{DrawCall, DrawCallId, MAX_INDICES_PER_DRAW_CALL, MAX_VERTICES_PER_DRAW_CALL};
pub use engine::{BatchError, BatchResult, BatchStats, BatchingEngine, DrawCallUpload, FrameOps};

use crate::element::UiElement;
use crate::geometry::GeometryFragment;

/// An element together with its built geometry and batch membership
#[derive(Debug)]
pub struct BatchedElement {
    /// The element description provided by the layout system
    pub element: UiElement,
    /// The element's current geometry fragment
    pub fragment: GeometryFragment,
    /// The draw call currently holding the fragment, if any
    pub(crate) draw_call: Option<DrawCallId>,
}
