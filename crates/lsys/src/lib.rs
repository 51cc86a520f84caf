//! # lsys
//!
//! L-system engine: grammar rewriting, turtle geometry and an append-only
//! vertex buffer that keeps every iteration drawable.
//!
//! ```text
//! grammar text ─► Grammar ─► rewrite ─► Turtle ─► GeometryBuffer ─► RenderSink
//!                                 ▲                     │
//!                                 └── last iteration ◄──┘
//! ```
//!
//! ## Rust Lesson #7: Modules
//!
//! - `mod foo;` = load from `foo.rs` or `foo/mod.rs`
//! - `pub mod foo;` = also export it publicly
//! - `pub use foo::Bar;` = re-export Bar at this level

pub mod buffer;
pub mod chain;
pub mod config;
pub mod error;
pub mod geometry;
pub mod grammar;
pub mod lsystem;
pub mod render;
pub mod turtle;

// Re-export common types at crate root for convenience.
pub use buffer::{GeometryBuffer, GrowthPolicy, MAX_BUF};
pub use chain::{Chain, ChainConfig, ChainStats, chain_segments};
pub use config::{EngineConfig, FIT_SIZE, MAX_SYMBOLS};
pub use error::LsysError;
pub use geometry::{Point, Transform, VERTEX_BYTES, VertexRange, point};
pub use grammar::{Grammar, ParseError, ParseErrorKind, preprocess};
pub use lsystem::{IterationRecord, LSystem, LoadReport};
pub use render::{DrawCall, Pipeline, RenderSink, SvgSink, fit_viewport, to_mat3};
pub use turtle::{Alphabet, Turtle, TurtleCommand, TurtleConfig};
