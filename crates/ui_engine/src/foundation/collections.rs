//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable key for a renderable element inside one panel's batcher
    pub struct ElementKey;
}
