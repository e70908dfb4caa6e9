//! Incremental batching of one panel's elements into draw calls
//!
//! The engine owns the panel's elements, keeps the ordered draw-call list
//! valid across mutations, and emits a per-frame delta of buffer uploads
//! and draw-call lifecycle events for the submission pipeline.

use crate::element::{BatchKey, DirtyFlags, ElementKey, UiElement};
use crate::foundation::collections::SlotMap;
use crate::geometry::{self, GeometryFragment, UiVertex};

use super::draw_call::{DrawCall, DrawCallId};
use super::BatchedElement;

/// Result type for batching operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur during batching
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A single element's geometry exceeds the per-draw-call ceiling
    ///
    /// The element is excluded from rendering; accepting it would corrupt a
    /// shared buffer.
    #[error("element geometry too large for one draw call: {vertex_count} vertices, {index_count} indices")]
    GeometryTooLarge {
        /// Vertex count of the rejected fragment
        vertex_count: usize,
        /// Index count of the rejected fragment
        index_count: usize,
    },

    /// The element key does not name a registered element
    #[error("unknown element")]
    UnknownElement,

    /// The panel id does not name a registered panel
    #[error("unknown panel")]
    UnknownPanel,
}

/// Counters describing the batcher's current shape and lifetime work
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStats {
    /// Live draw calls
    pub draw_call_count: usize,
    /// Live elements
    pub element_count: usize,
    /// Draw-call merges performed by `resort`
    pub merges: u64,
    /// Full buffer recombines flushed
    pub rebuilds: u64,
    /// In-place buffer patches flushed
    pub patches: u64,
}

/// A buffer upload for one draw call, carrying owned copies of the data
///
/// Commands must be self-contained: the consumer thread never dereferences
/// producer-side storage.
#[derive(Debug, Clone)]
pub struct DrawCallUpload {
    /// Target draw call
    pub draw_call: DrawCallId,
    /// Full combined vertex buffer
    pub vertices: Vec<UiVertex>,
    /// Full combined index buffer
    pub indices: Vec<u16>,
    /// Whether vertex positions changed since the last upload
    pub positions_changed: bool,
}

/// Per-frame delta produced by [`BatchingEngine::flush_frame`]
#[derive(Debug, Default)]
pub struct FrameOps {
    /// Draw calls created since the last flush, with their signatures and
    /// initial priorities (front depth)
    pub created: Vec<(DrawCallId, BatchKey, i32)>,
    /// Draw calls destroyed since the last flush
    pub retired: Vec<DrawCallId>,
    /// Dirty shared buffers to re-upload
    pub uploads: Vec<DrawCallUpload>,
    /// Surviving draw calls whose priority changed
    pub priorities: Vec<(DrawCallId, i32)>,
}

/// Batches one panel's renderable elements into an ordered draw-call list
pub struct BatchingEngine {
    elements: SlotMap<ElementKey, BatchedElement>,
    /// Draw calls ordered by the depth of their front element
    draw_calls: Vec<DrawCall>,
    next_draw_call: u64,
    created: Vec<DrawCallId>,
    retired: Vec<DrawCallId>,
    stats: BatchStats,
}

impl BatchingEngine {
    /// Create an empty batcher
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create an empty batcher with a draw-call list capacity hint
    pub fn with_capacity(draw_call_capacity: usize) -> Self {
        Self {
            elements: SlotMap::with_key(),
            draw_calls: Vec::with_capacity(draw_call_capacity),
            next_draw_call: 0,
            created: Vec::new(),
            retired: Vec::new(),
            stats: BatchStats::default(),
        }
    }

    /// Insert an element, building its geometry and assigning it to a draw
    /// call
    ///
    /// Scans existing draw calls in depth order for the first compatible one
    /// with room whose depth range accepts the element; falls back to
    /// extending a neighboring run at the depth boundary; otherwise creates
    /// a new draw call at the ordered position. A new draw call is always
    /// preferred over reordering unrelated elements.
    pub fn insert(&mut self, element: UiElement) -> BatchResult<ElementKey> {
        let fragment = geometry::build_fragment(&element);
        if fragment.exceeds_draw_call_limit() {
            return Err(BatchError::GeometryTooLarge {
                vertex_count: fragment.vertex_count(),
                index_count: fragment.index_count(),
            });
        }
        let active = element.active;
        let key = self.elements.insert(BatchedElement {
            element,
            fragment,
            draw_call: None,
        });
        if active {
            self.place(key);
        }
        self.stats.element_count = self.elements.len();
        Ok(key)
    }

    /// Activate or deactivate an element
    ///
    /// Deactivation removes the element from its draw call (destroying the
    /// draw call if it empties) while keeping the element registered;
    /// reactivation re-places it as if freshly inserted.
    pub fn set_active(&mut self, key: ElementKey, active: bool) -> BatchResult<()> {
        let entry = self.elements.get_mut(key).ok_or(BatchError::UnknownElement)?;
        if entry.element.active == active {
            return Ok(());
        }
        entry.element.active = active;
        if active {
            self.place(key);
        } else {
            self.detach(key);
        }
        Ok(())
    }

    /// Remove an element, compacting or destroying its draw call
    pub fn remove(&mut self, key: ElementKey) -> BatchResult<UiElement> {
        if !self.elements.contains_key(key) {
            return Err(BatchError::UnknownElement);
        }
        self.detach(key);
        let removed = self.elements.remove(key).expect("checked above");
        self.stats.element_count = self.elements.len();
        Ok(removed.element)
    }

    /// React to an element's depth change
    ///
    /// Depth is the primary batching key: if the new depth still falls inside
    /// the owning draw call's range the run is resorted in place, otherwise
    /// the element is removed and reinserted.
    pub fn depth_changed(&mut self, key: ElementKey, new_depth: i32) -> BatchResult<()> {
        let entry = self.elements.get_mut(key).ok_or(BatchError::UnknownElement)?;
        if entry.element.depth == new_depth {
            return Ok(());
        }
        entry.element.depth = new_depth;
        let owner = entry.draw_call;

        if let Some(id) = owner {
            let index = self.draw_call_index(id).expect("membership is consistent");
            if self.draw_calls[index].accepts_depth(new_depth) {
                // still inside the run: resort the run, keep membership
                let (v, i) = self.fragment_counts(key);
                let dc = &mut self.draw_calls[index];
                dc.remove_element(key, v, i);
                let at = Self::run_insert_index(dc, &self.elements, new_depth);
                dc.insert_element(at, key, v, i);
                dc.update_depth_range(&self.elements);
                return Ok(());
            }
            self.detach(key);
        }
        if self.elements[key].element.active {
            self.place(key);
        }
        Ok(())
    }

    /// Mark an element's vertex data dirty without changing batch membership
    ///
    /// Refreshes the dirty channels of the element's fragment and marks the
    /// owning draw call's shared buffer for re-upload. Returns whether any
    /// position data changed (callers maintaining a world-transform cache
    /// care about that).
    pub fn mark_vertex_dirty(&mut self, key: ElementKey, flags: DirtyFlags) -> BatchResult<bool> {
        let entry = self.elements.get_mut(key).ok_or(BatchError::UnknownElement)?;
        if flags.contains(DirtyFlags::POSITION) {
            geometry::write_positions(&mut entry.fragment, &entry.element);
        }
        if flags.contains(DirtyFlags::UV) {
            geometry::write_uvs(&mut entry.fragment, &entry.element);
        }
        if flags.contains(DirtyFlags::COLOR) {
            geometry::write_colors(&mut entry.fragment, &entry.element);
        }
        let position_changed = flags.contains(DirtyFlags::POSITION);
        if let Some(id) = entry.draw_call {
            let index = self.draw_call_index(id).expect("membership is consistent");
            self.draw_calls[index].mark_vertex_update(position_changed);
        }
        Ok(position_changed)
    }

    /// Merge adjacent compatible draw calls
    ///
    /// Optimization pass, not correctness-critical; intended for idle frames
    /// or after removals. Returns the number of merges performed.
    pub fn resort(&mut self) -> usize {
        let mut merged = 0;
        let mut i = 0;
        while i + 1 < self.draw_calls.len() {
            let can_merge = self.draw_calls[i].key() == self.draw_calls[i + 1].key()
                && self.draw_calls[i].fits_merged(&self.draw_calls[i + 1]);
            if !can_merge {
                i += 1;
                continue;
            }
            let absorbed = self.draw_calls.remove(i + 1);
            self.retired.push(absorbed.id());
            let target_id = self.draw_calls[i].id();
            for &element in absorbed.elements() {
                let (v, idx) = {
                    let fragment = &self.elements[element].fragment;
                    (fragment.vertex_count(), fragment.index_count())
                };
                let depth = self.elements[element].element.depth;
                let target = &mut self.draw_calls[i];
                let at = Self::run_insert_index(target, &self.elements, depth);
                target.insert_element(at, element, v, idx);
                self.elements[element].draw_call = Some(target_id);
            }
            self.draw_calls[i].update_depth_range(&self.elements);
            merged += 1;
        }
        self.stats.merges += merged as u64;
        self.stats.draw_call_count = self.draw_calls.len();
        merged
    }

    /// Consume the dirty state accumulated since the last flush
    ///
    /// Rebuild-dirty draw calls recombine their shared buffers; patch-dirty
    /// ones copy changed vertex regions in place. Uploads carry owned buffer
    /// copies so the consumer thread never reads producer storage.
    pub fn flush_frame(&mut self) -> FrameOps {
        let mut ops = FrameOps::default();

        // a draw call created and destroyed between flushes never existed
        // as far as the consumer is concerned
        let mut created: Vec<DrawCallId> = std::mem::take(&mut self.created);
        for id in std::mem::take(&mut self.retired) {
            if let Some(position) = created.iter().position(|&c| c == id) {
                created.remove(position);
            } else {
                ops.retired.push(id);
            }
        }

        for dc in &mut self.draw_calls {
            let is_new = created.contains(&dc.id());
            let (rebuild, patch, positions) = dc.take_dirty();
            if rebuild {
                dc.rebuild(&self.elements);
                self.stats.rebuilds += 1;
            } else if patch {
                dc.patch(&self.elements);
                self.stats.patches += 1;
            }
            if rebuild || patch {
                ops.uploads.push(DrawCallUpload {
                    draw_call: dc.id(),
                    vertices: dc.vertices().to_vec(),
                    indices: dc.indices().to_vec(),
                    positions_changed: rebuild || positions,
                });
            }
            match dc.priority_delta() {
                Some(priority) if is_new => ops.created.push((dc.id(), dc.key(), priority)),
                Some(priority) => ops.priorities.push((dc.id(), priority)),
                None => {}
            }
        }
        ops
    }

    /// The ordered draw-call list
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// Look up a draw call by id
    pub fn draw_call(&self, id: DrawCallId) -> Option<&DrawCall> {
        self.draw_calls.iter().find(|dc| dc.id() == id)
    }

    /// Immutable access to an element
    pub fn element(&self, key: ElementKey) -> Option<&UiElement> {
        self.elements.get(key).map(|entry| &entry.element)
    }

    /// Mutable access to an element's description
    ///
    /// Mutations only take effect once reported through
    /// [`Self::mark_vertex_dirty`] or [`Self::depth_changed`].
    pub fn element_mut(&mut self, key: ElementKey) -> Option<&mut UiElement> {
        self.elements.get_mut(key).map(|entry| &mut entry.element)
    }

    /// The element's geometry fragment, if registered
    pub fn fragment(&self, key: ElementKey) -> Option<&GeometryFragment> {
        self.elements.get(key).map(|entry| &entry.fragment)
    }

    /// The draw call currently holding an element
    pub fn owner_of(&self, key: ElementKey) -> Option<DrawCallId> {
        self.elements.get(key).and_then(|entry| entry.draw_call)
    }

    /// Live element count
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Current statistics snapshot
    pub fn stats(&self) -> BatchStats {
        let mut stats = self.stats;
        stats.draw_call_count = self.draw_calls.len();
        stats.element_count = self.elements.len();
        stats
    }

    // --- internal ---

    fn fragment_counts(&self, key: ElementKey) -> (usize, usize) {
        let fragment = &self.elements[key].fragment;
        (fragment.vertex_count(), fragment.index_count())
    }

    fn draw_call_index(&self, id: DrawCallId) -> Option<usize> {
        self.draw_calls.iter().position(|dc| dc.id() == id)
    }

    /// Sorted insertion index for a depth within a run (after equal depths,
    /// so repeated inserts at one depth keep their arrival order)
    fn run_insert_index(
        dc: &DrawCall,
        store: &SlotMap<ElementKey, BatchedElement>,
        depth: i32,
    ) -> usize {
        dc.elements()
            .iter()
            .position(|&e| store[e].element.depth > depth)
            .unwrap_or(dc.elements().len())
    }

    /// Assign an unowned element to a draw call
    fn place(&mut self, key: ElementKey) {
        let (batch_key, depth) = {
            let entry = &self.elements[key];
            (entry.element.key, entry.element.depth)
        };
        let (v, i) = self.fragment_counts(key);

        // first compatible draw call whose depth range accepts the element
        let mut target = self
            .draw_calls
            .iter()
            .position(|dc| dc.key() == batch_key && dc.fits(v, i) && dc.accepts_depth(depth));

        // otherwise extend a compatible neighbor at the depth boundary
        let ordered_position = self
            .draw_calls
            .iter()
            .position(|dc| dc.depth_min() > depth)
            .unwrap_or(self.draw_calls.len());
        if target.is_none() && ordered_position > 0 {
            let before = &self.draw_calls[ordered_position - 1];
            if before.key() == batch_key && before.fits(v, i) && depth >= before.depth_max() {
                target = Some(ordered_position - 1);
            }
        }
        if target.is_none() && ordered_position < self.draw_calls.len() {
            let after = &self.draw_calls[ordered_position];
            if after.key() == batch_key && after.fits(v, i) && depth <= after.depth_min() {
                target = Some(ordered_position);
            }
        }

        let index = target.unwrap_or_else(|| {
            let id = DrawCallId(self.next_draw_call);
            self.next_draw_call += 1;
            self.draw_calls.insert(ordered_position, DrawCall::new(id, batch_key));
            self.created.push(id);
            ordered_position
        });

        let dc = &mut self.draw_calls[index];
        let at = Self::run_insert_index(dc, &self.elements, depth);
        dc.insert_element(at, key, v, i);
        dc.update_depth_range(&self.elements);
        let id = dc.id();
        self.elements[key].draw_call = Some(id);
        self.stats.draw_call_count = self.draw_calls.len();
    }

    /// Remove an element from its draw call, destroying the draw call if it
    /// becomes empty
    fn detach(&mut self, key: ElementKey) {
        let Some(id) = self.elements[key].draw_call.take() else {
            return;
        };
        let index = self.draw_call_index(id).expect("membership is consistent");
        let (v, i) = self.fragment_counts(key);
        let dc = &mut self.draw_calls[index];
        dc.remove_element(key, v, i);
        if dc.is_empty() {
            self.draw_calls.remove(index);
            self.retired.push(id);
        } else {
            dc.update_depth_range(&self.elements);
        }
        self.stats.draw_call_count = self.draw_calls.len();
    }
}

impl Default for BatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
