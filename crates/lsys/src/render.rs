//! Render binding - how iterations reach something that can draw them.
//!
//! The engine doesn't talk to a graphics API. It hands a [`RenderSink`] a
//! [`DrawCall`]: the shared [`Pipeline`], a combined transform and the
//! vertex slice to draw as disconnected line segments. The sink can be a
//! GPU backend, an SVG writer, a terminal canvas or a test recorder.

use std::fmt::Write as _;
use std::rc::Rc;

use tracing::debug;

use crate::chain::{ChainConfig, chain_segments};
use crate::geometry::{Point, Transform, VERTEX_BYTES, VertexRange, point};

/// Vertex format of the line pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    /// `f32` components per vertex
    pub components: usize,
    /// Bytes between consecutive vertices
    pub stride: usize,
}

/// The line-drawing program shared by every L-system.
///
/// ## Rust Lesson #26: Rc instead of a static refcount
///
/// Several L-systems draw with the same program. Rather than a global
/// counter, each one holds an `Rc<Pipeline>`; the program is released
/// (here: `Drop` runs) when the last holder goes away. `Rc` (not `Arc`)
/// because everything here runs on the render thread.
#[derive(Debug)]
pub struct Pipeline {
    label: String,
    layout: VertexLayout,
}

impl Pipeline {
    /// Create the shared pipeline.
    pub fn shared(label: impl Into<String>) -> Rc<Self> {
        let pipeline = Self {
            label: label.into(),
            layout: VertexLayout {
                components: 2,
                stride: VERTEX_BYTES,
            },
        };
        debug!(label = %pipeline.label, "created shared line pipeline");
        Rc::new(pipeline)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// Number of live holders of this pipeline.
    pub fn holders(this: &Rc<Self>) -> usize {
        Rc::strong_count(this)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        debug!(label = %self.label, "released shared line pipeline");
    }
}

/// Everything a sink needs to draw one iteration.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub pipeline: &'a Pipeline,
    /// `view * normalize`, applied to every vertex
    pub transform: Transform,
    /// Where the vertices live in the geometry buffer
    pub range: VertexRange,
    /// Buffer generation; changes whenever the buffer was reallocated
    pub generation: u64,
    /// The vertices in `range`, untransformed
    pub vertices: &'a [Point],
}

impl DrawCall<'_> {
    /// Transformed segment endpoints.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.vertices.chunks_exact(2).map(move |s| {
            (
                self.transform.transform_point(s[0]),
                self.transform.transform_point(s[1]),
            )
        })
    }

    /// The transform as a column-major 3x3 matrix, ready for a uniform upload.
    pub fn transform_matrix(&self) -> [[f32; 3]; 3] {
        to_mat3(&self.transform)
    }
}

/// Anything that can draw line segments.
pub trait RenderSink {
    fn draw(&mut self, call: DrawCall<'_>);
}

/// Column-major homogeneous 3x3 matrix of a 2D affine transform.
pub fn to_mat3(t: &Transform) -> [[f32; 3]; 3] {
    [[t.m11, t.m12, 0.0], [t.m21, t.m22, 0.0], [t.m31, t.m32, 1.0]]
}

/// View transform that keeps a unit square square on a `width` x `height` target.
///
/// Clip space is [-1, 1] on both axes; the longer axis gets squeezed.
pub fn fit_viewport(width: f32, height: f32) -> Transform {
    if width <= 0.0 || height <= 0.0 {
        return Transform::identity();
    }
    if width > height {
        Transform::scale(height / width, 1.0)
    } else {
        Transform::scale(1.0, width / height)
    }
}

/// Writes drawn segments as an SVG document.
///
/// Clip space [-1, 1]² maps onto the `width` x `height` canvas with y
/// pointing up. Connected segments are joined into `<polyline>`s.
#[derive(Debug, Clone)]
pub struct SvgSink {
    width: u32,
    height: u32,
    stroke: String,
    stroke_width: f32,
    background: Option<String>,
    vertices: Vec<Point>,
}

impl SvgSink {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stroke: "black".to_string(),
            stroke_width: 1.0,
            background: None,
            vertices: Vec::new(),
        }
    }

    pub fn with_stroke(mut self, color: impl Into<String>, width: f32) -> Self {
        self.stroke = color.into();
        self.stroke_width = width;
        self
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    pub fn segment_count(&self) -> usize {
        self.vertices.len() / 2
    }

    fn to_canvas(&self, p: Point) -> Point {
        point(
            (p.x + 1.0) * 0.5 * self.width as f32,
            (1.0 - p.y) * 0.5 * self.height as f32,
        )
    }

    /// Render everything drawn so far.
    pub fn finish(&self) -> String {
        let chains = chain_segments(&self.vertices, &ChainConfig::with_tolerance(0.01));

        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
"#,
            w = self.width,
            h = self.height,
        );

        if let Some(bg) = &self.background {
            let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="{}"/>"#, bg);
        }

        let _ = writeln!(
            svg,
            concat!(
                r#"<g stroke="{}" stroke-width="{}" "#,
                r#"stroke-linecap="round" stroke-linejoin="round" fill="none">"#
            ),
            self.stroke, self.stroke_width
        );

        for chain in &chains {
            if chain.len() < 2 {
                continue;
            }
            let points: String = chain
                .iter()
                .map(|p| format!("{:.2},{:.2}", p.x, p.y))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(svg, r#"  <polyline points="{}"/>"#, points);
        }

        svg.push_str("</g>\n</svg>\n");
        svg
    }
}

impl RenderSink for SvgSink {
    fn draw(&mut self, call: DrawCall<'_>) {
        let canvas: Vec<Point> = call
            .segments()
            .flat_map(|(a, b)| [self.to_canvas(a), self.to_canvas(b)])
            .collect();
        self.vertices.extend(canvas);
    }
}
