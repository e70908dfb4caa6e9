//! Consumer-thread dispatcher
//!
//! Owns everything on the GPU side of the queue: the receiver, the proxy
//! store, the view registry, and the frame renderer. Once per frame it
//! drains the queue fully — applying every state mutation in enqueue
//! order — and then renders each submitted view.

use crate::pipeline::{CommandReceiver, ProxyStore, RenderCommand};

use super::backend::RenderBackend;
use super::frame_renderer::{FrameRenderer, FrameStats};
use super::registry::ViewRegistry;

/// The consumer-thread half of the pipeline
pub struct RenderDispatcher {
    receiver: CommandReceiver,
    store: ProxyStore,
    registry: ViewRegistry,
    renderer: FrameRenderer,
}

impl RenderDispatcher {
    /// Create a dispatcher over a queue receiver and a backend
    pub fn new(receiver: CommandReceiver, backend: Box<dyn RenderBackend>) -> Self {
        Self {
            receiver,
            store: ProxyStore::new(),
            registry: ViewRegistry::new(),
            renderer: FrameRenderer::new(backend),
        }
    }

    /// Drain the queue and render every submitted view
    ///
    /// The drain is synchronous and complete before the first draw: no
    /// command enqueued before a `SubmitView` can execute after it.
    pub fn pump_frame(&mut self) -> Vec<FrameStats> {
        let mut views = Vec::new();
        for command in self.receiver.drain() {
            // geometry ownership handoff: the GPU-side copy belongs to the
            // backend from here on
            match &command {
                RenderCommand::UploadGeometry {
                    handle,
                    vertices,
                    indices,
                    ..
                } => {
                    if let Err(error) =
                        self.renderer
                            .backend_mut()
                            .upload_geometry(*handle, vertices, indices)
                    {
                        log::warn!("geometry upload for {handle:?} failed: {error}");
                    }
                }
                RenderCommand::DestroyProxy { handle } => {
                    self.renderer.backend_mut().release_geometry(*handle);
                }
                _ => {}
            }
            if let Some(view) = self.store.apply(command, &mut self.registry) {
                views.push(view);
            }
        }

        views
            .iter()
            .map(|view| self.renderer.render_view(view, &self.store, &self.registry))
            .collect()
    }

    /// The proxy store (inspection and tests)
    pub fn store(&self) -> &ProxyStore {
        &self.store
    }

    /// The view registry (inspection and tests)
    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    /// The frame renderer
    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    /// Mutable frame renderer access (surface registration in tooling)
    pub fn renderer_mut(&mut self) -> &mut FrameRenderer {
        &mut self.renderer
    }
}
