//! Per-view primitive registry
//!
//! An explicit registry object with a defined lifecycle: constructed with
//! the consumer, destroyed with it, and passed by reference — never ambient
//! global state. Holds the screen-space overlay list and one entry per
//! world-space panel.

use std::collections::HashMap;

use crate::element::PanelId;
use crate::foundation::math::Mat4;
use crate::pipeline::{ProxyHandle, ProxyPlacement};

/// Placement of one world-space panel and the proxies it carries
#[derive(Debug, Clone)]
pub struct WorldPanelEntry {
    /// Panel-to-world transform
    pub transform: Mat4,
    /// Sort priority among panels
    pub priority: i32,
    /// Proxies registered to the panel, in registration order
    pub primitives: Vec<ProxyHandle>,
}

/// Registry of live primitives per view
#[derive(Debug, Default)]
pub struct ViewRegistry {
    screen: Vec<ProxyHandle>,
    world: HashMap<PanelId, WorldPanelEntry>,
}

impl ViewRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proxy into its view list
    pub fn register(&mut self, handle: ProxyHandle, placement: ProxyPlacement) {
        match placement {
            ProxyPlacement::ScreenOverlay => self.screen.push(handle),
            ProxyPlacement::WorldPanel(panel) => {
                self.world
                    .entry(panel)
                    .or_insert_with(|| WorldPanelEntry {
                        transform: Mat4::identity(),
                        priority: 0,
                        primitives: Vec::new(),
                    })
                    .primitives
                    .push(handle);
            }
        }
    }

    /// Remove a proxy from whichever list holds it
    pub fn unregister(&mut self, handle: ProxyHandle) {
        self.screen.retain(|&h| h != handle);
        for entry in self.world.values_mut() {
            entry.primitives.retain(|&h| h != handle);
        }
    }

    /// Create or update a world panel's placement
    pub fn upsert_panel(&mut self, panel: PanelId, transform: Mat4, priority: i32) {
        let entry = self.world.entry(panel).or_insert_with(|| WorldPanelEntry {
            transform,
            priority,
            primitives: Vec::new(),
        });
        entry.transform = transform;
        entry.priority = priority;
    }

    /// Remove a world panel and forget its proxies' placement
    pub fn remove_panel(&mut self, panel: PanelId) {
        self.world.remove(&panel);
    }

    /// The screen-space overlay list in registration order
    pub fn screen_primitives(&self) -> &[ProxyHandle] {
        &self.screen
    }

    /// All world panels, unordered
    pub fn world_panels(&self) -> impl Iterator<Item = (&PanelId, &WorldPanelEntry)> {
        self.world.iter()
    }

    /// Total registered proxies across all lists
    pub fn len(&self) -> usize {
        self.screen.len()
            + self
                .world
                .values()
                .map(|entry| entry.primitives.len())
                .sum::<usize>()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
