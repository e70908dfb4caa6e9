//! Renderable UI elements and their batching identity
//!
//! An element is a leaf node of the UI hierarchy: a rectangle with a depth,
//! a batching signature (material/texture/clip), and a set of per-attribute
//! dirty flags. The layout system owns the hierarchy; this crate only sees
//! the per-element state it needs to build and batch geometry.

use crate::foundation::math::{Rect, Vec2, Vec4};

pub use crate::foundation::collections::ElementKey;

/// Identifier of a material pipeline state
///
/// `MaterialId::DEFAULT` selects the stock UI material; any other value
/// names a custom material registered with the graphics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

impl MaterialId {
    /// The stock UI material
    pub const DEFAULT: Self = Self(0);
}

/// Identifier of a texture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

impl TextureId {
    /// The 1x1 white texture used by untextured elements
    pub const WHITE: Self = Self(0);
}

/// Identifier of a clip/mask configuration owned by the panel
///
/// `ClipId::NONE` means unclipped. Elements sharing a clip id share the
/// same scissor/mask state and may batch together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(pub u32);

impl ClipId {
    /// No clipping
    pub const NONE: Self = Self(0);
}

/// Identifier of a panel (one independently batched group of elements)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelId(pub u32);

bitflags::bitflags! {
    /// Per-attribute dirty flags for a renderable element
    ///
    /// Recomputed once per frame by the layout system and consumed by both
    /// the geometry builder and the GPU upload step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// Vertex positions changed (move/resize/pivot)
        const POSITION = 1 << 0;
        /// Texture coordinates changed (sprite region swap)
        const UV = 1 << 1;
        /// Vertex color or alpha changed
        const COLOR = 1 << 2;
    }
}

/// The batching signature of an element
///
/// Two elements may share a draw call only if their signatures are equal.
/// Font-atlas textures are tracked separately from ordinary textures so the
/// material can select the text sampling path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// Material pipeline state
    pub material: MaterialId,
    /// Bound texture
    pub texture: TextureId,
    /// Clip/mask configuration
    pub clip: ClipId,
    /// Whether `texture` is a font atlas
    pub font_texture: bool,
}

impl BatchKey {
    /// Signature for a plain solid-color element
    pub const fn untextured() -> Self {
        Self {
            material: MaterialId::DEFAULT,
            texture: TextureId::WHITE,
            clip: ClipId::NONE,
            font_texture: false,
        }
    }

    /// Signature for a sprite using the stock material
    pub const fn textured(texture: TextureId) -> Self {
        Self {
            material: MaterialId::DEFAULT,
            texture,
            clip: ClipId::NONE,
            font_texture: false,
        }
    }

    /// Replace the clip configuration
    pub const fn with_clip(mut self, clip: ClipId) -> Self {
        self.clip = clip;
        self
    }
}

/// Local-space mesh data for custom-shaped elements
///
/// Positions are relative to the element's origin; the geometry builder
/// offsets them into panel space and applies the element tint.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Local-space vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex texture coordinates, parallel to `positions`
    pub uvs: Vec<[f32; 2]>,
    /// Triangle indices into `positions`
    pub indices: Vec<u16>,
}

/// The geometric shape an element renders as
#[derive(Debug, Clone, Default)]
pub enum ElementShape {
    /// The standard rectangle (sprites, panels, glyph quads)
    #[default]
    Quad,
    /// Arbitrary user-supplied 2D mesh (polygons, line rings, static meshes)
    Mesh(MeshData),
}

/// A renderable UI element as seen by the batching engine
///
/// Position and size are in panel space. The pivot is normalized over the
/// rectangle: `(0, 0)` anchors at the minimum corner, `(0.5, 0.5)` centers
/// the rectangle on `position`.
#[derive(Debug, Clone)]
pub struct UiElement {
    /// Anchor position in panel space
    pub position: Vec2,
    /// Rectangle extents
    pub size: Vec2,
    /// Normalized pivot inside the rectangle
    pub pivot: Vec2,
    /// Depth used as the primary batching/sort key; higher renders on top
    pub depth: i32,
    /// RGBA tint; alpha is premultiplied into the vertex color at build time
    pub color: Vec4,
    /// Texture region in normalized coordinates
    pub uv: Rect,
    /// Batching signature
    pub key: BatchKey,
    /// Geometric shape
    pub shape: ElementShape,
    /// Whether the element currently renders at all
    pub active: bool,
}

impl UiElement {
    /// Create an opaque white quad with a min-corner pivot
    pub fn quad(position: Vec2, size: Vec2, depth: i32, key: BatchKey) -> Self {
        Self {
            position,
            size,
            pivot: Vec2::new(0.0, 0.0),
            depth,
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            uv: Rect::UNIT,
            key,
            shape: ElementShape::Quad,
            active: true,
        }
    }

    /// Replace the shape with a custom mesh
    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.shape = ElementShape::Mesh(mesh);
        self
    }

    /// Replace the tint color
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Replace the normalized pivot
    pub fn with_pivot(mut self, pivot: Vec2) -> Self {
        self.pivot = pivot;
        self
    }

    /// Replace the texture region
    pub fn with_uv(mut self, uv: Rect) -> Self {
        self.uv = uv;
        self
    }

    /// The rectangle's minimum corner after applying the pivot
    pub fn origin(&self) -> Vec2 {
        Vec2::new(
            self.position.x - self.pivot.x * self.size.x,
            self.position.y - self.pivot.y * self.size.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pivot_offsets_origin() {
        let element = UiElement::quad(
            Vec2::new(100.0, 100.0),
            Vec2::new(40.0, 20.0),
            0,
            BatchKey::untextured(),
        )
        .with_pivot(Vec2::new(0.5, 0.5));
        assert_eq!(element.origin(), Vec2::new(80.0, 90.0));
    }

    #[test]
    fn batch_keys_compare_by_value() {
        let a = BatchKey::textured(TextureId(3)).with_clip(ClipId(1));
        let b = BatchKey::textured(TextureId(3)).with_clip(ClipId(1));
        let c = BatchKey::textured(TextureId(4));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dirty_flags_compose() {
        let flags = DirtyFlags::POSITION | DirtyFlags::COLOR;
        assert!(flags.contains(DirtyFlags::POSITION));
        assert!(!flags.contains(DirtyFlags::UV));
    }
}
