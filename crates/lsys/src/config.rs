//! Engine configuration - YAML (or JSON) file with buffer and turtle settings.
//!
//! Every field has a default, so an empty file is a valid config:
//!
//! ```yaml
//! max_buffer_bytes: 67108864
//! max_symbols: 16777216
//! fit_size: 1.9
//! growth: doubling
//! turtle:
//!   heading: 90
//!   step: 1.0
//!   alphabet:
//!     draw: "FAB"
//!     move_forward: "f"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buffer::{GrowthPolicy, MAX_BUF};
use crate::error::LsysError;
use crate::geometry::VERTEX_BYTES;
use crate::turtle::{Turtle, TurtleConfig};

/// Side of the square every iteration is scaled to fit (clip space is 2 wide).
pub const FIT_SIZE: f32 = 1.9;

/// Default ceiling on the length of one iteration's symbol string.
///
/// Grammars whose growth never draws anything (`X -> XX`) would otherwise
/// only stop when memory runs out.
pub const MAX_SYMBOLS: usize = 1 << 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard ceiling on the geometry buffer
    pub max_buffer_bytes: usize,
    /// Hard ceiling on the symbols in one iteration
    pub max_symbols: usize,
    /// Normalized display square size
    pub fit_size: f32,
    pub growth: GrowthPolicy,
    pub turtle: TurtleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_buffer_bytes: MAX_BUF,
            max_symbols: MAX_SYMBOLS,
            fit_size: FIT_SIZE,
            growth: GrowthPolicy::default(),
            turtle: TurtleConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LsysError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LsysError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, LsysError> {
        // An empty document deserializes to unit, not to an empty map.
        let config: EngineConfig = if content.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| LsysError::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LsysError> {
        if self.max_buffer_bytes < VERTEX_BYTES * 2 {
            return Err(LsysError::Config(format!(
                "max_buffer_bytes must hold at least one segment ({} bytes), got {}",
                VERTEX_BYTES * 2,
                self.max_buffer_bytes
            )));
        }
        if self.max_symbols == 0 {
            return Err(LsysError::Config("max_symbols must be at least 1".to_string()));
        }
        if !(self.fit_size.is_finite() && self.fit_size > 0.0) {
            return Err(LsysError::Config(format!(
                "fit_size must be positive, got {}",
                self.fit_size
            )));
        }
        Turtle::new(&self.turtle)?;
        Ok(())
    }
}
