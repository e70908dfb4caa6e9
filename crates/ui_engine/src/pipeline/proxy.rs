//! Render proxies: the consumer-thread mirror of renderable state
//!
//! A proxy is exclusively owned by the consumer after creation. It mutates
//! only while a dequeued command executes; the producer thread never touches
//! a proxy's GPU-visible fields. Destruction is itself a queued command, so
//! it orders correctly against in-flight uploads for the same proxy.

use std::collections::HashMap;

use crate::render::primitive::{MeshPrimitive, PostProcessPrimitive, UiPrimitive};
use crate::render::registry::ViewRegistry;

use super::{ProxyHandle, ProxyPlacement, RenderCommand};

/// Lifecycle state of a proxy
///
/// `Uncreated → Created → Updated* → PendingDestroy → Destroyed`; the two
/// terminal states exist on the producer's side of the timeline — once the
/// destroy command executes, the proxy is simply gone from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    /// Created, no update applied yet
    Created,
    /// At least one update command has executed
    Updated,
}

/// Consumer-owned mirror of one renderable's GPU-visible state
#[derive(Debug)]
pub struct RenderProxy {
    /// The proxy's address
    pub handle: ProxyHandle,
    /// View list membership
    pub placement: ProxyPlacement,
    /// Lifecycle state
    pub state: ProxyState,
    /// Sort priority of the owning panel
    pub panel_priority: i32,
    /// Sort priority within the panel
    pub priority: i32,
    /// Whether the proxy currently renders
    pub visible: bool,
    /// The primitive this proxy submits
    pub primitive: UiPrimitive,
}

impl RenderProxy {
    /// Whether the proxy should be gathered for rendering this frame
    pub fn can_render(&self) -> bool {
        self.visible && self.primitive.is_renderable()
    }

    /// Combined sort key: panel priority first, then within-panel priority
    pub fn sort_key(&self) -> (i32, i32) {
        (self.panel_priority, self.priority)
    }
}

/// Storage for all live proxies, owned by the consumer thread
#[derive(Debug, Default)]
pub struct ProxyStore {
    proxies: HashMap<ProxyHandle, RenderProxy>,
}

impl ProxyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute one dequeued command against the store and registry
    ///
    /// `SubmitView` is not a state mutation; it is handed back to the caller
    /// so the frame renderer can run after the drain completes. Commands
    /// addressing an unknown proxy are consistency errors: logged and
    /// ignored, never fatal.
    pub fn apply(
        &mut self,
        command: RenderCommand,
        registry: &mut ViewRegistry,
    ) -> Option<crate::render::frame::ViewContext> {
        match command {
            RenderCommand::CreateMeshProxy {
                handle,
                placement,
                key,
                panel_priority,
                priority,
            } => {
                let previous = self.proxies.insert(
                    handle,
                    RenderProxy {
                        handle,
                        placement,
                        state: ProxyState::Created,
                        panel_priority,
                        priority,
                        visible: true,
                        primitive: UiPrimitive::Mesh(MeshPrimitive::new(key)),
                    },
                );
                debug_assert!(previous.is_none(), "proxy handle reused");
                registry.register(handle, placement);
            }

            RenderCommand::CreatePostProcessProxy {
                handle,
                placement,
                effect,
                region,
                needs_screen_image,
                panel_priority,
                priority,
            } => {
                self.proxies.insert(
                    handle,
                    RenderProxy {
                        handle,
                        placement,
                        state: ProxyState::Created,
                        panel_priority,
                        priority,
                        visible: true,
                        primitive: UiPrimitive::PostProcess(PostProcessPrimitive {
                            kind: effect,
                            region,
                            needs_screen_image,
                        }),
                    },
                );
                registry.register(handle, placement);
            }

            RenderCommand::UploadGeometry {
                handle,
                vertices,
                indices,
                positions_changed: _,
            } => match self.proxies.get_mut(&handle) {
                Some(proxy) => {
                    if let UiPrimitive::Mesh(mesh) = &mut proxy.primitive {
                        mesh.vertices = vertices;
                        mesh.indices = indices;
                        proxy.state = ProxyState::Updated;
                    } else {
                        log::warn!("UploadGeometry addressed a post-process proxy, ignoring");
                    }
                }
                None => log::warn!("UploadGeometry for unknown proxy {handle:?}, ignoring"),
            },

            RenderCommand::SetVisibility { handle, visible } => {
                match self.proxies.get_mut(&handle) {
                    Some(proxy) => {
                        proxy.visible = visible;
                        proxy.state = ProxyState::Updated;
                    }
                    None => log::warn!("SetVisibility for unknown proxy {handle:?}, ignoring"),
                }
            }

            RenderCommand::SetPriority { handle, priority } => {
                match self.proxies.get_mut(&handle) {
                    Some(proxy) => {
                        proxy.priority = priority;
                        proxy.state = ProxyState::Updated;
                    }
                    None => log::warn!("SetPriority for unknown proxy {handle:?}, ignoring"),
                }
            }

            RenderCommand::RegisterPanel {
                panel,
                transform,
                priority,
            } => registry.upsert_panel(panel, transform, priority),

            RenderCommand::RemovePanel { panel } => registry.remove_panel(panel),

            RenderCommand::DestroyProxy { handle } => {
                if self.proxies.remove(&handle).is_some() {
                    registry.unregister(handle);
                } else {
                    log::warn!("DestroyProxy for unknown proxy {handle:?}, ignoring");
                }
            }

            RenderCommand::SubmitView(view) => return Some(view),
        }
        None
    }

    /// Look up a proxy
    pub fn get(&self, handle: ProxyHandle) -> Option<&RenderProxy> {
        self.proxies.get(&handle)
    }

    /// Number of live proxies
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
