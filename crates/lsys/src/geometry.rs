//! Core geometry types for lsys.
//!
//! Points, vectors and affine transforms are `euclid` types, re-exported
//! through `lyon_geom`. A 2D affine `Transform` is the same thing as a 3x3
//! homogeneous matrix whose last column is `(0, 0, 1)`.
//!
//! ## Rust Lesson #25: Type aliases
//!
//! `pub type Point = ...` doesn't create a new type, it just gives a long
//! generic name a short one. Everything `euclid` implements for
//! `Point2D<f32, UnknownUnit>` works on our `Point` for free.

use lyon_geom::euclid::default::{Box2D, Point2D, Transform2D, Vector2D};

/// A 2D vertex. `#[repr(C)]` in euclid, two `f32`s, 8 bytes.
pub type Point = Point2D<f32>;
/// A 2D displacement.
pub type Vector = Vector2D<f32>;
/// A 2D affine transform (row-vector convention: `a.then(&b)` applies `a` first).
pub type Transform = Transform2D<f32>;
/// An axis-aligned bounding box.
pub type Bounds = Box2D<f32>;

/// Size of one vertex in the geometry buffer.
pub const VERTEX_BYTES: usize = std::mem::size_of::<Point>();

/// Shorthand constructor, like `lyon_geom::point`.
#[inline]
pub fn point(x: f32, y: f32) -> Point {
    Point::new(x, y)
}

/// Half-open range of vertices inside the geometry buffer.
///
/// Consecutive pairs of vertices in the range form line segments.
/// Ranges are indices, not pointers, so they stay valid when the
/// buffer reallocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexRange {
    /// Index of the first vertex
    pub first: usize,
    /// Number of vertices
    pub count: usize,
}

impl VertexRange {
    #[inline]
    pub fn new(first: usize, count: usize) -> Self {
        Self { first, count }
    }

    /// One past the last vertex.
    #[inline]
    pub fn end(&self) -> usize {
        self.first + self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of line segments in the range.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.count / 2
    }

    pub fn byte_offset(&self) -> usize {
        self.first * VERTEX_BYTES
    }

    pub fn byte_len(&self) -> usize {
        self.count * VERTEX_BYTES
    }
}

/// Axis-aligned bounding box of a point set, `None` when empty.
pub fn bounding_box(points: &[Point]) -> Option<Bounds> {
    let (first, rest) = points.split_first()?;
    let mut min = *first;
    let mut max = *first;

    for p in rest {
        min = min.min(*p);
        max = max.max(*p);
    }

    Some(Bounds::new(min, max))
}

/// Transform that scales a point set to fit a `fit_size` square centered at the origin.
///
/// The largest side of the bounding box is mapped to `fit_size`. A
/// degenerate box (single point, or all points on one spot) keeps scale 1
/// and is only centered. An empty point set gets the identity.
pub fn normalize_transform(points: &[Point], fit_size: f32) -> Transform {
    let Some(bounds) = bounding_box(points) else {
        return Transform::identity();
    };

    let size = bounds.size();
    let extent = size.width.max(size.height);
    let scale = if extent > 0.0 { fit_size / extent } else { 1.0 };
    let center = bounds.center();

    Transform::translation(-center.x, -center.y).then_scale(scale, scale)
}
