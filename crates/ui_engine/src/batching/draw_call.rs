//! Draw calls and their shared buffers
//!
//! A draw call is an ordered run of elements sharing one batching signature,
//! backed by exactly one vertex buffer and one index buffer. The buffers are
//! CPU-side; the submission pipeline uploads them wholesale when dirty.

use crate::element::{BatchKey, ElementKey};
use crate::foundation::collections::SlotMap;

use super::BatchedElement;

/// Hard per-draw-call vertex ceiling imposed by the 16-bit index format
pub const MAX_VERTICES_PER_DRAW_CALL: usize = 65_536;

/// Hard per-draw-call index ceiling (two triangles per quad at the vertex ceiling)
pub const MAX_INDICES_PER_DRAW_CALL: usize = 98_304;

/// Stable identifier of a draw call within one panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawCallId(pub u64);

/// One GPU draw submission: an element run plus its shared buffers
#[derive(Debug)]
pub struct DrawCall {
    id: DrawCallId,
    key: BatchKey,
    /// Element run in depth order (front of the list renders first)
    elements: Vec<ElementKey>,
    /// Combined vertex buffer, valid after the last rebuild/patch
    vertices: Vec<crate::geometry::UiVertex>,
    /// Combined index buffer, rebased over the shared vertex buffer
    indices: Vec<u16>,
    /// Logical totals, maintained incrementally so capacity checks do not
    /// depend on the buffers being current
    vertex_total: usize,
    index_total: usize,
    depth_min: i32,
    depth_max: i32,
    /// Element membership or counts changed; buffers must be recombined
    needs_rebuild: bool,
    /// Only attribute data changed; buffers can be patched in place
    needs_vertex_update: bool,
    /// Position data changed since the last flush (bounds/transform caches
    /// downstream care about this, pure UV/color updates do not)
    position_changed: bool,
    /// Priority reported to the submission pipeline at the last flush
    last_priority: Option<i32>,
}

impl DrawCall {
    /// Create an empty draw call for a batching signature
    pub fn new(id: DrawCallId, key: BatchKey) -> Self {
        Self {
            id,
            key,
            elements: Vec::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            vertex_total: 0,
            index_total: 0,
            depth_min: 0,
            depth_max: 0,
            needs_rebuild: false,
            needs_vertex_update: false,
            position_changed: false,
            last_priority: None,
        }
    }

    /// Stable identifier of this draw call
    pub fn id(&self) -> DrawCallId {
        self.id
    }

    /// Batching signature shared by every element in the run
    pub fn key(&self) -> BatchKey {
        self.key
    }

    /// The element run in depth order
    pub fn elements(&self) -> &[ElementKey] {
        &self.elements
    }

    /// Whether the run holds no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Minimum element depth in the run
    pub fn depth_min(&self) -> i32 {
        self.depth_min
    }

    /// Maximum element depth in the run
    pub fn depth_max(&self) -> i32 {
        self.depth_max
    }

    /// Logical vertex count of the run
    pub fn vertex_total(&self) -> usize {
        self.vertex_total
    }

    /// Logical index count of the run
    pub fn index_total(&self) -> usize {
        self.index_total
    }

    /// Combined vertex buffer (valid after the last flush)
    pub fn vertices(&self) -> &[crate::geometry::UiVertex] {
        &self.vertices
    }

    /// Combined index buffer (valid after the last flush)
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Whether a depth value lies inside this run's depth range
    pub fn accepts_depth(&self, depth: i32) -> bool {
        !self.is_empty() && depth >= self.depth_min && depth <= self.depth_max
    }

    /// Whether a fragment of the given size still fits under the ceiling
    pub fn fits(&self, vertex_count: usize, index_count: usize) -> bool {
        self.vertex_total + vertex_count <= MAX_VERTICES_PER_DRAW_CALL
            && self.index_total + index_count <= MAX_INDICES_PER_DRAW_CALL
    }

    /// Whether another draw call's run would fit into this one
    pub fn fits_merged(&self, other: &Self) -> bool {
        self.fits(other.vertex_total, other.index_total)
    }

    pub(crate) fn mark_rebuild(&mut self) {
        self.needs_rebuild = true;
    }

    pub(crate) fn mark_vertex_update(&mut self, position_changed: bool) {
        self.needs_vertex_update = true;
        if position_changed {
            self.position_changed = true;
        }
    }

    pub(crate) fn take_dirty(&mut self) -> (bool, bool, bool) {
        let state = (self.needs_rebuild, self.needs_vertex_update, self.position_changed);
        self.needs_rebuild = false;
        self.needs_vertex_update = false;
        self.position_changed = false;
        state
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.needs_rebuild || self.needs_vertex_update
    }

    /// Report the priority (depth of the run's front) if it changed since
    /// the last flush
    pub(crate) fn priority_delta(&mut self) -> Option<i32> {
        if self.last_priority == Some(self.depth_min) {
            None
        } else {
            self.last_priority = Some(self.depth_min);
            Some(self.depth_min)
        }
    }

    /// Insert an element at `index` in the run, accounting its fragment size
    pub(crate) fn insert_element(
        &mut self,
        index: usize,
        element: ElementKey,
        vertex_count: usize,
        index_count: usize,
    ) {
        self.elements.insert(index, element);
        self.vertex_total += vertex_count;
        self.index_total += index_count;
        self.needs_rebuild = true;
    }

    /// Remove an element from the run, giving back its fragment size
    ///
    /// Returns `false` if the element was not part of the run.
    pub(crate) fn remove_element(
        &mut self,
        element: ElementKey,
        vertex_count: usize,
        index_count: usize,
    ) -> bool {
        let Some(position) = self.elements.iter().position(|&e| e == element) else {
            return false;
        };
        self.elements.remove(position);
        self.vertex_total -= vertex_count;
        self.index_total -= index_count;
        self.needs_rebuild = true;
        true
    }

    /// Recompute the depth range from the current run
    pub(crate) fn update_depth_range(&mut self, store: &SlotMap<ElementKey, BatchedElement>) {
        self.depth_min = i32::MAX;
        self.depth_max = i32::MIN;
        for &key in &self.elements {
            let depth = store[key].element.depth;
            self.depth_min = self.depth_min.min(depth);
            self.depth_max = self.depth_max.max(depth);
        }
        if self.elements.is_empty() {
            self.depth_min = 0;
            self.depth_max = 0;
        }
    }

    /// Recombine every fragment into the shared buffers
    ///
    /// Fragment-local indices are rebased by the running vertex count so the
    /// whole run draws from one buffer pair.
    pub(crate) fn rebuild(&mut self, store: &SlotMap<ElementKey, BatchedElement>) {
        self.vertices.clear();
        self.indices.clear();
        for &key in &self.elements {
            let fragment = &store[key].fragment;
            let base = self.vertices.len() as u16;
            self.vertices.extend_from_slice(&fragment.vertices);
            self.indices.extend(fragment.indices.iter().map(|&i| i + base));
        }
        self.vertex_total = self.vertices.len();
        self.index_total = self.indices.len();
    }

    /// Copy each fragment's vertices over its existing region in the shared
    /// buffer
    ///
    /// Valid only while no element's vertex/index count has changed; the
    /// index buffer is untouched.
    pub(crate) fn patch(&mut self, store: &SlotMap<ElementKey, BatchedElement>) {
        let mut offset = 0;
        for &key in &self.elements {
            let fragment = &store[key].fragment;
            let count = fragment.vertices.len();
            self.vertices[offset..offset + count].copy_from_slice(&fragment.vertices);
            offset += count;
        }
    }
}
