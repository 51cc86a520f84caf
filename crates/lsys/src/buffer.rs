//! Append-only vertex storage with a hard size ceiling.
//!
//! This is the CPU side of the vertex buffer the renderer draws from.
//! Every reallocation bumps [`GeometryBuffer::generation`] so a GPU mirror
//! can tell it has to re-upload instead of patching the tail.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LsysError;
use crate::geometry::{Point, VERTEX_BYTES, VertexRange};

/// Default ceiling: 64 MiB of vertices.
pub const MAX_BUF: usize = 1 << 26;

/// How capacity grows when an append doesn't fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthPolicy {
    /// Reallocate to exactly the required size
    #[default]
    Exact,
    /// Reallocate to at least twice the current capacity, clamped to the ceiling
    Doubling,
}

/// A growable, append-only store of 2D vertices.
///
/// Invariant: `used_bytes() <= capacity_bytes() <= max_bytes()`.
#[derive(Debug, Clone)]
pub struct GeometryBuffer {
    vertices: Vec<Point>,
    capacity_bytes: usize,
    max_bytes: usize,
    growth: GrowthPolicy,
    generation: u64,
}

impl Default for GeometryBuffer {
    fn default() -> Self {
        Self::new(MAX_BUF, GrowthPolicy::default())
    }
}

impl GeometryBuffer {
    pub fn new(max_bytes: usize, growth: GrowthPolicy) -> Self {
        Self {
            vertices: Vec::new(),
            capacity_bytes: 0,
            max_bytes,
            growth,
            generation: 0,
        }
    }

    /// An empty buffer with the same ceiling and growth policy.
    pub fn empty_like(&self) -> Self {
        Self::new(self.max_bytes, self.growth)
    }

    /// Move the contents out, leaving `self` empty (same ceiling and policy).
    pub fn take(&mut self) -> Self {
        let empty = self.empty_like();
        std::mem::replace(self, empty)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.vertices.len() * VERTEX_BYTES
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn growth(&self) -> GrowthPolicy {
        self.growth
    }

    /// Number of reallocations so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Append `points` after the current contents.
    ///
    /// Fails without touching the buffer if the result would exceed the ceiling.
    pub fn append(&mut self, points: &[Point]) -> Result<VertexRange, LsysError> {
        let first = self.vertices.len();
        let required = first
            .checked_add(points.len())
            .and_then(|n| n.checked_mul(VERTEX_BYTES))
            .unwrap_or(usize::MAX);

        if required > self.max_bytes {
            return Err(LsysError::CapacityExceeded {
                required,
                max: self.max_bytes,
            });
        }

        if required > self.capacity_bytes {
            self.grow(required);
        }

        self.vertices.extend_from_slice(points);
        Ok(VertexRange::new(first, points.len()))
    }

    /// Reallocate and copy only the vertices in use.
    fn grow(&mut self, required: usize) {
        let new_capacity = match self.growth {
            GrowthPolicy::Exact => required,
            GrowthPolicy::Doubling => required
                .max(self.capacity_bytes.saturating_mul(2))
                .min(self.max_bytes),
        };

        let mut storage = Vec::with_capacity(new_capacity / VERTEX_BYTES);
        storage.extend_from_slice(&self.vertices);
        self.vertices = storage;

        debug!(
            old_bytes = self.capacity_bytes,
            new_bytes = new_capacity,
            used_bytes = self.used_bytes(),
            "reallocated geometry buffer"
        );

        self.capacity_bytes = new_capacity;
        self.generation += 1;
    }

    /// The vertices in `range`, or `None` if it reaches past the end.
    pub fn vertices(&self, range: VertexRange) -> Option<&[Point]> {
        self.vertices.get(range.first..range.end())
    }
}
