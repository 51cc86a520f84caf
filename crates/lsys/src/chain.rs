//! Segment chaining - join turtle segments into continuous polylines.
//!
//! The turtle emits every segment on its own, even when one starts exactly
//! where the last one ended. For SVG output that means thousands of
//! two-point paths; chaining turns runs of connected segments into a
//! single polyline.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::geometry::Point;

/// A chain of connected points forming a polyline.
pub type Chain = Vec<Point>;

/// Configuration for segment chaining.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Maximum distance between endpoints to consider them connected.
    pub tolerance: f32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { tolerance: 1e-3 }
    }
}

impl ChainConfig {
    pub fn with_tolerance(tolerance: f32) -> Self {
        Self { tolerance }
    }
}

/// Chain segments given as a flat vertex list (pairs of endpoints).
///
/// # Algorithm
///
/// 1. Hash every endpoint into a grid of `tolerance`-sized cells
/// 2. For each unused segment, start a new chain
/// 3. Extend forward by finding segments whose start matches our end
/// 4. Extend backward by finding segments whose end matches our start
///
/// A trailing unpaired vertex is ignored.
pub fn chain_segments(vertices: &[Point], config: &ChainConfig) -> Vec<Chain> {
    let segments: Vec<(Point, Point)> = vertices.chunks_exact(2).map(|s| (s[0], s[1])).collect();
    if segments.is_empty() {
        return Vec::new();
    }

    let grid_size = config.tolerance.max(1e-6);
    let tolerance_sq = config.tolerance * config.tolerance;

    let mut used = vec![false; segments.len()];

    // grid cell -> (segment index, is_start_point)
    let mut grid: HashMap<(i64, i64), Vec<(usize, bool)>> = HashMap::new();
    for (i, &(start, end)) in segments.iter().enumerate() {
        grid.entry(point_to_cell(start, grid_size)).or_default().push((i, true));
        grid.entry(point_to_cell(end, grid_size)).or_default().push((i, false));
    }

    let lookup = Lookup {
        grid: &grid,
        segments: &segments,
        grid_size,
        tolerance_sq,
    };

    let mut chains = Vec::new();

    for start_idx in 0..segments.len() {
        if used[start_idx] {
            continue;
        }

        used[start_idx] = true;
        let (start, end) = segments[start_idx];
        let mut chain = VecDeque::from([start, end]);

        // Forward: segments whose START matches our END
        while let Some(&tail) = chain.back() {
            let Some(next_idx) = lookup.find(tail, &used, true) else {
                break;
            };
            used[next_idx] = true;
            chain.push_back(segments[next_idx].1);
        }

        // Backward: segments whose END matches our START
        while let Some(&head) = chain.front() {
            let Some(prev_idx) = lookup.find(head, &used, false) else {
                break;
            };
            used[prev_idx] = true;
            chain.push_front(segments[prev_idx].0);
        }

        chains.push(Vec::from(chain));
    }

    chains
}

#[inline]
fn point_to_cell(p: Point, grid_size: f32) -> (i64, i64) {
    ((p.x / grid_size).floor() as i64, (p.y / grid_size).floor() as i64)
}

struct Lookup<'a> {
    grid: &'a HashMap<(i64, i64), Vec<(usize, bool)>>,
    segments: &'a [(Point, Point)],
    grid_size: f32,
    tolerance_sq: f32,
}

impl Lookup<'_> {
    /// Find an unused segment whose start (or end) lies within tolerance of `p`.
    fn find(&self, p: Point, used: &[bool], match_start: bool) -> Option<usize> {
        let cell = point_to_cell(p, self.grid_size);

        // This cell and all 8 neighbors
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(candidates) = self.grid.get(&(cell.0 + dx, cell.1 + dy)) else {
                    continue;
                };
                for &(idx, is_start) in candidates {
                    if used[idx] || is_start != match_start {
                        continue;
                    }
                    let (start, end) = self.segments[idx];
                    let q = if match_start { start } else { end };
                    if (q - p).square_length() <= self.tolerance_sq {
                        return Some(idx);
                    }
                }
            }
        }

        None
    }
}

/// Statistics about a chaining result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainStats {
    /// Number of input segments
    pub input_segments: usize,
    /// Number of output chains
    pub output_chains: usize,
    /// Average chain length (points per chain)
    pub avg_chain_length: f64,
    /// Longest chain (points)
    pub max_chain_length: usize,
    /// Reduction ratio (1.0 - chains/segments)
    pub reduction_ratio: f64,
}

impl ChainStats {
    pub fn from_chains(input_segments: usize, chains: &[Chain]) -> Self {
        let output_chains = chains.len();
        let total_points: usize = chains.iter().map(|c| c.len()).sum();
        let max_chain_length = chains.iter().map(|c| c.len()).max().unwrap_or(0);

        Self {
            input_segments,
            output_chains,
            avg_chain_length: if output_chains > 0 {
                total_points as f64 / output_chains as f64
            } else {
                0.0
            },
            max_chain_length,
            reduction_ratio: if input_segments > 0 {
                1.0 - (output_chains as f64 / input_segments as f64)
            } else {
                0.0
            },
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
