//! # Cross-Thread Render Pipeline
//!
//! Moves per-frame renderable state from the producer thread (layout and
//! batching) to the consumer thread (GPU submission) without data races.
//!
//! ## Contract
//!
//! The command queue is the only synchronization primitive between the two
//! threads. Commands are self-contained payloads carrying owned copies of
//! their data; they execute strictly in enqueue order, so a proxy's destroy
//! command can never run before the create/update commands that precede it.
//! Enqueue is fire-and-forget: the producer never blocks on the consumer.
//! The consumer drains the whole queue once per frame before issuing draws.

pub mod command;
pub mod proxy;
pub mod queue;

pub use command::RenderCommand;
pub use proxy::{ProxyState, ProxyStore, RenderProxy};
pub use queue::{command_queue, CommandReceiver, CommandSender};

use crate::element::PanelId;

/// Opaque address of a render proxy, allocated by the producer
///
/// Handles are never reused, so a stale command addressing a destroyed
/// proxy is detectable as a no-op instead of corrupting a new proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyHandle(pub u64);

/// Which view list a proxy registers into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyPlacement {
    /// The screen-space overlay list
    ScreenOverlay,
    /// A world-space panel's list
    WorldPanel(PanelId),
}
