//! Renderer configuration
//!
//! Tuning knobs for the batching engine and frame renderer, loadable from a
//! TOML file. Configuration is read-only input; nothing in this crate is
//! persisted back to disk.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`UiRendererConfig`]
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its supported range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Configuration for the UI renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiRendererConfig {
    /// Multi-sample count for UI surfaces (1 = no MSAA)
    pub msaa_samples: u32,

    /// Merge adjacent compatible draw calls on every mutation instead of
    /// waiting for an explicit idle-time `resort` pass
    pub eager_merge: bool,

    /// Clear color applied when a view binds its target, or `None` to
    /// preserve the existing image (the normal overlay case)
    pub clear_color: Option<[f32; 4]>,

    /// Capacity hint for per-panel draw-call lists
    pub draw_call_capacity: usize,
}

impl Default for UiRendererConfig {
    fn default() -> Self {
        Self {
            msaa_samples: 1,
            eager_merge: false,
            clear_color: None,
            draw_call_capacity: 16,
        }
    }
}

impl UiRendererConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.msaa_samples == 0 || !self.msaa_samples.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "msaa_samples must be a power of two >= 1, got {}",
                self.msaa_samples
            )));
        }
        Ok(())
    }
}
