//! # UI Engine Facade
//!
//! The producer-thread entry point. Owns one batching engine per panel,
//! allocates proxy handles, and translates batching deltas into queued
//! render commands. Collaborators (the layout/hierarchy system) call
//! [`UiEngine::register_element`] / [`UiEngine::unregister_element`] /
//! [`UiEngine::notify_element_dirty`] / [`UiEngine::notify_depth_changed`]
//! as the hierarchy changes, and [`UiEngine::submit`] once per view per
//! frame.

use std::collections::HashMap;

use crate::batching::{BatchError, BatchResult, BatchStats, BatchingEngine, DrawCallId};
use crate::config::UiRendererConfig;
use crate::element::{DirtyFlags, ElementKey, PanelId, UiElement};
use crate::foundation::math::{Mat4, Rect};
use crate::pipeline::{CommandSender, ProxyHandle, ProxyPlacement, RenderCommand};
use crate::render::frame::ViewContext;
use crate::render::primitive::PostProcessKind;

/// Address of a registered element: its panel plus its key inside that
/// panel's batcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementId {
    /// Owning panel
    pub panel: PanelId,
    key: ElementKey,
}

/// Where a panel renders
#[derive(Debug, Clone, Copy)]
pub enum PanelPlacement {
    /// Composited over the screen after the scene
    ScreenOverlay,
    /// Placed in the world with its own transform
    World {
        /// Panel-to-world transform
        transform: Mat4,
    },
}

/// One panel: a batcher plus the bookkeeping linking its draw calls to
/// consumer-side proxies
struct Panel {
    batcher: BatchingEngine,
    placement: PanelPlacement,
    priority: i32,
    /// Proxy addresses per live draw call
    proxies: HashMap<DrawCallId, ProxyHandle>,
    /// Post-process proxies owned by this panel
    post_process: Vec<ProxyHandle>,
    /// The consumer's copy of the world transform needs refreshing
    transform_dirty: bool,
}

impl Panel {
    fn proxy_placement(&self, id: PanelId) -> ProxyPlacement {
        match self.placement {
            PanelPlacement::ScreenOverlay => ProxyPlacement::ScreenOverlay,
            PanelPlacement::World { .. } => ProxyPlacement::WorldPanel(id),
        }
    }
}

/// Producer-side coordinator for UI batching and render submission
pub struct UiEngine {
    config: UiRendererConfig,
    sender: CommandSender,
    panels: HashMap<PanelId, Panel>,
    next_panel: u32,
    next_proxy: u64,
}

impl UiEngine {
    /// Create an engine over the producer end of the command queue
    pub fn new(config: UiRendererConfig, sender: CommandSender) -> Self {
        log::info!("Initializing UI engine (msaa={})", config.msaa_samples);
        Self {
            config,
            sender,
            panels: HashMap::new(),
            next_panel: 0,
            next_proxy: 0,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &UiRendererConfig {
        &self.config
    }

    /// Add a screen-space overlay panel
    pub fn add_screen_panel(&mut self, priority: i32) -> PanelId {
        self.add_panel(PanelPlacement::ScreenOverlay, priority)
    }

    /// Add a world-space panel with its own transform
    pub fn add_world_panel(&mut self, transform: Mat4, priority: i32) -> PanelId {
        self.add_panel(PanelPlacement::World { transform }, priority)
    }

    fn add_panel(&mut self, placement: PanelPlacement, priority: i32) -> PanelId {
        let id = PanelId(self.next_panel);
        self.next_panel += 1;
        if let PanelPlacement::World { transform } = placement {
            self.sender.send(RenderCommand::RegisterPanel {
                panel: id,
                transform,
                priority,
            });
        }
        self.panels.insert(
            id,
            Panel {
                batcher: BatchingEngine::with_capacity(self.config.draw_call_capacity),
                placement,
                priority,
                proxies: HashMap::new(),
                post_process: Vec::new(),
                transform_dirty: false,
            },
        );
        log::debug!("panel {id:?} added");
        id
    }

    /// Move a world-space panel
    pub fn set_panel_transform(&mut self, panel: PanelId, transform: Mat4) {
        let Some(entry) = self.panels.get_mut(&panel) else {
            log::warn!("set_panel_transform on unknown panel {panel:?}");
            return;
        };
        match &mut entry.placement {
            PanelPlacement::World {
                transform: current,
            } => {
                *current = transform;
                entry.transform_dirty = true;
            }
            PanelPlacement::ScreenOverlay => {
                log::warn!("set_panel_transform on screen-space panel {panel:?}");
            }
        }
    }

    /// Remove a panel and everything it renders
    pub fn remove_panel(&mut self, panel: PanelId) {
        let Some(entry) = self.panels.remove(&panel) else {
            return;
        };
        for (_, handle) in entry.proxies {
            self.sender.send(RenderCommand::DestroyProxy { handle });
        }
        for handle in entry.post_process {
            self.sender.send(RenderCommand::DestroyProxy { handle });
        }
        if let PanelPlacement::World { .. } = entry.placement {
            self.sender.send(RenderCommand::RemovePanel { panel });
        }
        log::debug!("panel {panel:?} removed");
    }

    /// Register a renderable element with a panel
    ///
    /// Oversized geometry is rejected and reported; the element is excluded
    /// from rendering rather than corrupting a shared buffer.
    pub fn register_element(
        &mut self,
        panel: PanelId,
        element: UiElement,
    ) -> BatchResult<ElementId> {
        let entry = self.panel_mut(panel)?;
        match entry.batcher.insert(element) {
            Ok(key) => Ok(ElementId { panel, key }),
            Err(error) => {
                log::warn!("element rejected on panel {panel:?}: {error}");
                Err(error)
            }
        }
    }

    /// Remove an element, compacting or destroying its draw call
    pub fn unregister_element(&mut self, id: ElementId) -> BatchResult<UiElement> {
        let eager_merge = self.config.eager_merge;
        let entry = self.panel_mut(id.panel)?;
        let element = entry.batcher.remove(id.key)?;
        if eager_merge {
            entry.batcher.resort();
        }
        Ok(element)
    }

    /// Mutable access to an element's description
    ///
    /// Mutations take effect once reported through
    /// [`Self::notify_element_dirty`] or [`Self::notify_depth_changed`].
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut UiElement> {
        self.panels
            .get_mut(&id.panel)
            .and_then(|entry| entry.batcher.element_mut(id.key))
    }

    /// Report changed element attributes
    ///
    /// Does not change batch membership; marks the owning draw call's shared
    /// buffer for re-upload and, when positions changed on a world panel,
    /// refreshes the consumer's copy of the panel transform.
    pub fn notify_element_dirty(&mut self, id: ElementId, flags: DirtyFlags) -> BatchResult<()> {
        let entry = self.panel_mut(id.panel)?;
        let position_changed = entry.batcher.mark_vertex_dirty(id.key, flags)?;
        if position_changed {
            if let PanelPlacement::World { .. } = entry.placement {
                entry.transform_dirty = true;
            }
        }
        Ok(())
    }

    /// Report an element's depth change
    ///
    /// Depth is the primary batching key, so this may move the element
    /// between draw calls.
    pub fn notify_depth_changed(&mut self, id: ElementId, new_depth: i32) -> BatchResult<()> {
        let eager_merge = self.config.eager_merge;
        let entry = self.panel_mut(id.panel)?;
        entry.batcher.depth_changed(id.key, new_depth)?;
        if eager_merge {
            entry.batcher.resort();
        }
        Ok(())
    }

    /// Activate or deactivate an element without unregistering it
    pub fn set_element_active(&mut self, id: ElementId, active: bool) -> BatchResult<()> {
        self.panel_mut(id.panel)?.batcher.set_active(id.key, active)
    }

    /// Add a post-process effect primitive to a panel
    ///
    /// Post-process primitives never batch; each becomes its own proxy,
    /// ordered against the panel's draw calls by depth.
    pub fn add_post_process(
        &mut self,
        panel: PanelId,
        effect: PostProcessKind,
        region: Rect,
        depth: i32,
        needs_screen_image: bool,
    ) -> BatchResult<ProxyHandle> {
        let handle = ProxyHandle(self.next_proxy);
        self.next_proxy += 1;
        let entry = self.panel_mut(panel)?;
        entry.post_process.push(handle);
        let command = RenderCommand::CreatePostProcessProxy {
            handle,
            placement: entry.proxy_placement(panel),
            effect,
            region,
            needs_screen_image,
            panel_priority: entry.priority,
            priority: depth,
        };
        self.sender.send(command);
        Ok(handle)
    }

    /// Remove a post-process primitive
    pub fn remove_post_process(&mut self, panel: PanelId, handle: ProxyHandle) -> BatchResult<()> {
        let entry = self.panel_mut(panel)?;
        entry.post_process.retain(|&h| h != handle);
        self.sender.send(RenderCommand::DestroyProxy { handle });
        Ok(())
    }

    /// Show or hide a proxy (post-process primitives, mainly)
    pub fn set_proxy_visible(&self, handle: ProxyHandle, visible: bool) {
        self.sender
            .send(RenderCommand::SetVisibility { handle, visible });
    }

    /// Run the deferred draw-call merge pass on one panel
    ///
    /// Cheap when nothing merged; intended for idle frames.
    pub fn resort(&mut self, panel: PanelId) -> BatchResult<usize> {
        Ok(self.panel_mut(panel)?.batcher.resort())
    }

    /// Batching statistics for a panel
    pub fn stats(&self, panel: PanelId) -> Option<BatchStats> {
        self.panels.get(&panel).map(|entry| entry.batcher.stats())
    }

    /// Flush pending batching state and submit one view for rendering
    ///
    /// Called once per view per frame. Flushing is idempotent within a
    /// frame: panels with no pending changes enqueue nothing.
    pub fn submit(&mut self, view: ViewContext) {
        let panel_ids: Vec<PanelId> = self.panels.keys().copied().collect();
        for panel in panel_ids {
            self.flush_panel(panel);
        }
        self.sender.send(RenderCommand::SubmitView(view));
    }

    // --- internal ---

    fn panel_mut(&mut self, panel: PanelId) -> BatchResult<&mut Panel> {
        self.panels.get_mut(&panel).ok_or(BatchError::UnknownPanel)
    }

    /// Translate one panel's batching delta into queued commands
    fn flush_panel(&mut self, panel: PanelId) {
        let Some(entry) = self.panels.get_mut(&panel) else {
            return;
        };
        let ops = entry.batcher.flush_frame();
        let placement = entry.proxy_placement(panel);

        for id in ops.retired {
            if let Some(handle) = entry.proxies.remove(&id) {
                self.sender.send(RenderCommand::DestroyProxy { handle });
            }
        }

        for (id, key, priority) in ops.created {
            let handle = ProxyHandle(self.next_proxy);
            self.next_proxy += 1;
            entry.proxies.insert(id, handle);
            self.sender.send(RenderCommand::CreateMeshProxy {
                handle,
                placement,
                key,
                panel_priority: entry.priority,
                priority,
            });
        }

        for (id, priority) in ops.priorities {
            if let Some(&handle) = entry.proxies.get(&id) {
                self.sender
                    .send(RenderCommand::SetPriority { handle, priority });
            }
        }

        for upload in ops.uploads {
            if let Some(&handle) = entry.proxies.get(&upload.draw_call) {
                self.sender.send(RenderCommand::UploadGeometry {
                    handle,
                    vertices: upload.vertices,
                    indices: upload.indices,
                    positions_changed: upload.positions_changed,
                });
            }
        }

        if entry.transform_dirty {
            if let PanelPlacement::World { transform } = entry.placement {
                self.sender.send(RenderCommand::RegisterPanel {
                    panel,
                    transform,
                    priority: entry.priority,
                });
            }
            entry.transform_dirty = false;
        }
    }
}
