//! Renderable primitives
//!
//! The closed sum of things a frame can submit: ordinary mesh draw calls
//! and post-process effects. The two behaviors stay distinct arms of one
//! type; the renderer pattern-matches instead of switching on a tag field.

use crate::element::BatchKey;
use crate::foundation::math::Rect;
use crate::geometry::UiVertex;

/// Which kind of primitive a run holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Ordinary batched mesh draw
    Mesh,
    /// Post-process effect requiring its own sub-pass
    PostProcess,
}

/// GPU-visible state of one batched mesh draw call
#[derive(Debug, Clone)]
pub struct MeshPrimitive {
    /// Material/texture/clip state bound for the draw
    pub key: BatchKey,
    /// Uploaded vertex buffer contents
    pub vertices: Vec<UiVertex>,
    /// Uploaded index buffer contents
    pub indices: Vec<u16>,
}

impl MeshPrimitive {
    /// An empty mesh awaiting its first buffer upload
    pub fn new(key: BatchKey) -> Self {
        Self {
            key,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Whether buffers have arrived and the mesh can draw
    pub fn is_renderable(&self) -> bool {
        !self.indices.is_empty()
    }
}

/// The effect a post-process primitive applies
#[derive(Debug, Clone, PartialEq)]
pub enum PostProcessKind {
    /// Gaussian-style blur of the image behind the element
    BackgroundBlur {
        /// Blur radius in pixels at full strength
        strength: f32,
        /// Downsample/blur iterations
        iterations: u32,
    },
    /// Mosaic of the image behind the element
    BackgroundPixelate {
        /// Edge length of one mosaic cell in pixels
        pixel_size: f32,
    },
}

/// A post-process effect primitive
#[derive(Debug, Clone)]
pub struct PostProcessPrimitive {
    /// The effect to apply
    pub kind: PostProcessKind,
    /// Affected region in view space
    pub region: Rect,
    /// Whether the effect samples the pre-UI screen image
    ///
    /// Set once at creation; the collector scans this to decide whether the
    /// frame needs a shared screen snapshot.
    pub needs_screen_image: bool,
}

/// One renderable unit submitted per frame
#[derive(Debug, Clone)]
pub enum UiPrimitive {
    /// Ordinary batched mesh
    Mesh(MeshPrimitive),
    /// Post-process effect
    PostProcess(PostProcessPrimitive),
}

impl UiPrimitive {
    /// The primitive's kind, used for run partitioning
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Mesh(_) => PrimitiveKind::Mesh,
            Self::PostProcess(_) => PrimitiveKind::PostProcess,
        }
    }

    /// Whether the primitive is currently capable of rendering
    ///
    /// A mesh whose buffers have not been uploaded yet (registration racing
    /// its first upload) is not renderable and is silently skipped for the
    /// frame.
    pub fn is_renderable(&self) -> bool {
        match self {
            Self::Mesh(mesh) => mesh.is_renderable(),
            Self::PostProcess(_) => true,
        }
    }
}
