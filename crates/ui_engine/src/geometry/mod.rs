//! Geometry builder
//!
//! Converts one element's logical rectangle (or custom mesh) into a small
//! vertex/index fragment. Pure and synchronous; runs on the producer thread.
//! Fragments are owned by the batching engine until their data is copied
//! into a draw call's shared buffer.

use crate::batching::draw_call::{MAX_INDICES_PER_DRAW_CALL, MAX_VERTICES_PER_DRAW_CALL};
use crate::element::{ElementShape, UiElement};

/// Vertex layout shared by every UI draw call
///
/// `#[repr(C)]` keeps the layout stable for GPU buffer uploads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiVertex {
    /// Position in panel space; z is reserved for the panel transform
    pub position: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
    /// Premultiplied RGBA color
    pub color: [f32; 4],
}

unsafe impl bytemuck::Pod for UiVertex {}
unsafe impl bytemuck::Zeroable for UiVertex {}

/// Ephemeral vertex/index data built for a single element
///
/// Never shared between elements; indices are fragment-local and rebased
/// when the fragment is combined into a draw call's shared buffer.
#[derive(Debug, Clone, Default)]
pub struct GeometryFragment {
    /// Fragment vertices
    pub vertices: Vec<UiVertex>,
    /// Fragment-local triangle indices
    pub indices: Vec<u16>,
}

impl GeometryFragment {
    /// Number of vertices in the fragment
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices in the fragment
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether this fragment alone exceeds the per-draw-call ceiling
    ///
    /// Such a fragment can never be batched and must be rejected before it
    /// reaches a shared buffer.
    pub fn exceeds_draw_call_limit(&self) -> bool {
        self.vertex_count() > MAX_VERTICES_PER_DRAW_CALL
            || self.index_count() > MAX_INDICES_PER_DRAW_CALL
    }
}

/// Quad triangulation: two triangles over vertices
/// `[min, (max_x, min_y), (min_x, max_y), max]`
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Build the fragment for an element according to its shape
///
/// Zero-area rectangles still produce four vertices; visibility is decided
/// later by the proxy, not by the geometry builder.
pub fn build_fragment(element: &UiElement) -> GeometryFragment {
    let (vertex_count, indices) = match &element.shape {
        ElementShape::Quad => (4, QUAD_INDICES.to_vec()),
        ElementShape::Mesh(mesh) => (mesh.positions.len(), mesh.indices.clone()),
    };
    let mut fragment = GeometryFragment {
        vertices: vec![
            UiVertex {
                position: [0.0; 3],
                uv: [0.0; 2],
                color: [0.0; 4],
            };
            vertex_count
        ],
        indices,
    };
    write_positions(&mut fragment, element);
    write_uvs(&mut fragment, element);
    write_colors(&mut fragment, element);
    fragment
}

/// Rewrite the position channel of an existing fragment in place
pub fn write_positions(fragment: &mut GeometryFragment, element: &UiElement) {
    let origin = element.origin();
    match &element.shape {
        ElementShape::Quad => {
            let (x0, y0) = (origin.x, origin.y);
            let (x1, y1) = (origin.x + element.size.x, origin.y + element.size.y);
            let corners = [[x0, y0], [x1, y0], [x0, y1], [x1, y1]];
            for (vertex, corner) in fragment.vertices.iter_mut().zip(corners) {
                vertex.position = [corner[0], corner[1], 0.0];
            }
        }
        ElementShape::Mesh(mesh) => {
            for (vertex, local) in fragment.vertices.iter_mut().zip(&mesh.positions) {
                vertex.position = [local[0] + origin.x, local[1] + origin.y, local[2]];
            }
        }
    }
}

/// Rewrite the UV channel of an existing fragment in place
pub fn write_uvs(fragment: &mut GeometryFragment, element: &UiElement) {
    match &element.shape {
        ElementShape::Quad => {
            let uv = element.uv;
            let corners = [
                [uv.x, uv.y],
                [uv.max_x(), uv.y],
                [uv.x, uv.max_y()],
                [uv.max_x(), uv.max_y()],
            ];
            for (vertex, corner) in fragment.vertices.iter_mut().zip(corners) {
                vertex.uv = corner;
            }
        }
        ElementShape::Mesh(mesh) => {
            for (vertex, &uv) in fragment.vertices.iter_mut().zip(&mesh.uvs) {
                vertex.uv = uv;
            }
        }
    }
}

/// Rewrite the color channel of an existing fragment in place
///
/// Alpha is premultiplied into RGB so translucent elements blend with the
/// additive-over operator the UI material uses.
pub fn write_colors(fragment: &mut GeometryFragment, element: &UiElement) {
    let c = element.color;
    let premultiplied = [c.x * c.w, c.y * c.w, c.z * c.w, c.w];
    for vertex in &mut fragment.vertices {
        vertex.color = premultiplied;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{BatchKey, MeshData};
    use crate::foundation::math::{Rect, Vec2, Vec4};
    use approx::assert_relative_eq;

    fn test_element() -> UiElement {
        UiElement::quad(
            Vec2::new(10.0, 20.0),
            Vec2::new(100.0, 50.0),
            0,
            BatchKey::untextured(),
        )
    }

    #[test]
    fn quad_has_four_vertices_six_indices() {
        let fragment = build_fragment(&test_element());
        assert_eq!(fragment.vertex_count(), 4);
        assert_eq!(fragment.index_count(), 6);
        assert!(!fragment.exceeds_draw_call_limit());
    }

    #[test]
    fn quad_corners_span_the_rect() {
        let fragment = build_fragment(&test_element());
        assert_eq!(fragment.vertices[0].position, [10.0, 20.0, 0.0]);
        assert_eq!(fragment.vertices[3].position, [110.0, 70.0, 0.0]);
    }

    #[test]
    fn centered_pivot_shifts_corners() {
        let element = test_element().with_pivot(Vec2::new(0.5, 0.5));
        let fragment = build_fragment(&element);
        assert_eq!(fragment.vertices[0].position, [-40.0, -5.0, 0.0]);
        assert_eq!(fragment.vertices[3].position, [60.0, 45.0, 0.0]);
    }

    #[test]
    fn uv_region_maps_to_corners() {
        let element = test_element().with_uv(Rect::new(0.25, 0.5, 0.5, 0.25));
        let fragment = build_fragment(&element);
        assert_eq!(fragment.vertices[0].uv, [0.25, 0.5]);
        assert_eq!(fragment.vertices[3].uv, [0.75, 0.75]);
    }

    #[test]
    fn color_is_premultiplied() {
        let element = test_element().with_color(Vec4::new(1.0, 0.5, 0.0, 0.5));
        let fragment = build_fragment(&element);
        let color = fragment.vertices[0].color;
        assert_relative_eq!(color[0], 0.5);
        assert_relative_eq!(color[1], 0.25);
        assert_relative_eq!(color[3], 0.5);
    }

    #[test]
    fn rewrite_matches_fresh_build() {
        let mut element = test_element();
        let mut fragment = build_fragment(&element);

        element.position = Vec2::new(-5.0, 3.0);
        element.color = Vec4::new(0.0, 1.0, 0.0, 1.0);
        write_positions(&mut fragment, &element);
        write_colors(&mut fragment, &element);

        assert_eq!(fragment.vertices, build_fragment(&element).vertices);
    }

    #[test]
    fn zero_area_rect_still_builds() {
        let mut element = test_element();
        element.size = Vec2::new(0.0, 0.0);
        let fragment = build_fragment(&element);
        assert_eq!(fragment.vertex_count(), 4);
        assert_eq!(fragment.vertices[0].position, fragment.vertices[3].position);
    }

    #[test]
    fn mesh_shape_offsets_local_positions() {
        let element = test_element().with_mesh(MeshData {
            positions: vec![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0], [0.0, 5.0, 0.0]],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            indices: vec![0, 1, 2],
        });
        let fragment = build_fragment(&element);
        assert_eq!(fragment.vertex_count(), 3);
        assert_eq!(fragment.index_count(), 3);
        assert_eq!(fragment.vertices[1].position, [15.0, 20.0, 0.0]);
        assert_eq!(fragment.vertices[2].uv, [0.0, 1.0]);
    }
}
