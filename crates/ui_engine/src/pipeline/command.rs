//! Render commands
//!
//! The closed set of mutations the producer may apply to consumer-owned
//! state. Every variant carries owned data — never references into
//! producer-side structures — so executing a command cannot race the
//! producer's next frame.

use crate::element::{BatchKey, PanelId};
use crate::foundation::math::{Mat4, Rect};
use crate::geometry::UiVertex;
use crate::render::frame::ViewContext;
use crate::render::primitive::PostProcessKind;

use super::{ProxyHandle, ProxyPlacement};

/// A state mutation queued from the producer to the consumer thread
#[derive(Debug, Clone)]
pub enum RenderCommand {
    /// Create a mesh proxy mirroring one draw call
    CreateMeshProxy {
        /// Address of the new proxy
        handle: ProxyHandle,
        /// View list the proxy joins
        placement: ProxyPlacement,
        /// Material/texture/clip state of the draw call
        key: BatchKey,
        /// Sort priority of the owning panel
        panel_priority: i32,
        /// Sort priority within the panel (the run's front depth)
        priority: i32,
    },

    /// Create a post-process proxy
    CreatePostProcessProxy {
        /// Address of the new proxy
        handle: ProxyHandle,
        /// View list the proxy joins
        placement: ProxyPlacement,
        /// The effect and its screen-image dependency
        effect: PostProcessKind,
        /// Affected region in view space
        region: Rect,
        /// Whether the effect samples the pre-UI screen image
        needs_screen_image: bool,
        /// Sort priority of the owning panel
        panel_priority: i32,
        /// Sort priority within the panel
        priority: i32,
    },

    /// Replace a mesh proxy's buffers with freshly combined data
    UploadGeometry {
        /// Target proxy
        handle: ProxyHandle,
        /// Full combined vertex buffer
        vertices: Vec<UiVertex>,
        /// Full combined index buffer
        indices: Vec<u16>,
        /// Whether vertex positions changed since the last upload
        positions_changed: bool,
    },

    /// Show or hide a proxy without destroying it
    SetVisibility {
        /// Target proxy
        handle: ProxyHandle,
        /// New visibility
        visible: bool,
    },

    /// Update a proxy's within-panel sort priority
    SetPriority {
        /// Target proxy
        handle: ProxyHandle,
        /// New priority
        priority: i32,
    },

    /// Create or update a world-space panel's placement in the registry
    RegisterPanel {
        /// Panel being placed
        panel: PanelId,
        /// Panel-to-world transform
        transform: Mat4,
        /// Sort priority among panels
        priority: i32,
    },

    /// Remove a world-space panel and forget its placement
    RemovePanel {
        /// Panel being removed
        panel: PanelId,
    },

    /// Destroy a proxy and release its GPU resources
    ///
    /// Queued like any other command so destruction orders correctly against
    /// in-flight uploads for the same proxy.
    DestroyProxy {
        /// Target proxy
        handle: ProxyHandle,
    },

    /// Render one view with everything applied so far this frame
    SubmitView(ViewContext),
}

impl RenderCommand {
    /// The proxy a command addresses, if any
    pub fn proxy_handle(&self) -> Option<ProxyHandle> {
        match self {
            Self::CreateMeshProxy { handle, .. }
            | Self::CreatePostProcessProxy { handle, .. }
            | Self::UploadGeometry { handle, .. }
            | Self::SetVisibility { handle, .. }
            | Self::SetPriority { handle, .. }
            | Self::DestroyProxy { handle } => Some(*handle),
            Self::RegisterPanel { .. } | Self::RemovePanel { .. } | Self::SubmitView(_) => None,
        }
    }

    /// Short command name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMeshProxy { .. } => "CreateMeshProxy",
            Self::CreatePostProcessProxy { .. } => "CreatePostProcessProxy",
            Self::UploadGeometry { .. } => "UploadGeometry",
            Self::SetVisibility { .. } => "SetVisibility",
            Self::SetPriority { .. } => "SetPriority",
            Self::RegisterPanel { .. } => "RegisterPanel",
            Self::RemovePanel { .. } => "RemovePanel",
            Self::DestroyProxy { .. } => "DestroyProxy",
            Self::SubmitView(_) => "SubmitView",
        }
    }
}
