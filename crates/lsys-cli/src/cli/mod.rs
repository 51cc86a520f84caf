//! CLI command implementations.
//!
//! - `render` - Draw one iteration to SVG, PNG or JSON
//! - `strings` - Print every iteration's symbol string
//! - `stats` - Per-iteration buffer usage and timing
//! - `view` - Interactive terminal viewer

pub mod common;
pub mod render;
pub mod stats;
pub mod strings;
pub mod view;

pub use render::{RenderArgs, cmd_render};
pub use stats::{StatsArgs, cmd_stats};
pub use strings::{StringsArgs, cmd_strings};
pub use view::{ViewArgs, cmd_view};
