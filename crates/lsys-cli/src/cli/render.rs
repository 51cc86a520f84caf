//! Render command implementation.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, ValueEnum};
use resvg::usvg;
use serde::Serialize;
use tiny_skia::Pixmap;

use lsys::{DrawCall, EngineConfig, LSystem, RenderSink, SvgSink, fit_viewport};

use super::common::{load_lsystem, resolve_iteration, write_output};

/// Output format for the render command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

/// Canvas size as `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
        let width: u32 = w.trim().parse().map_err(|_| format!("bad width {:?}", w))?;
        let height: u32 = h.trim().parse().map_err(|_| format!("bad height {:?}", h))?;
        if width == 0 || height == 0 {
            return Err("width and height must be non-zero".to_string());
        }
        Ok(Self { width, height })
    }
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Grammar file (- for stdin)
    pub grammar: String,

    /// Iteration to draw (default: latest)
    #[arg(short, long)]
    pub iteration: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Svg)]
    pub format: OutputFormat,

    /// Output file (- or omitted for stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Canvas size
    #[arg(long, default_value = "800x800")]
    pub size: Size,

    /// Stroke color
    #[arg(long, default_value = "black")]
    pub stroke: String,

    /// Stroke width in pixels
    #[arg(long, default_value_t = 1.0)]
    pub stroke_width: f32,
}

/// A segment in JSON output format (clip space).
#[derive(Serialize)]
struct JsonSegment {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// One draw call in JSON output format.
#[derive(Serialize)]
struct JsonDraw {
    pipeline: String,
    stride: usize,
    first: usize,
    count: usize,
    generation: u64,
    transform: [[f32; 3]; 3],
    segments: Vec<JsonSegment>,
}

/// JSON output for one iteration.
#[derive(Serialize)]
struct JsonIteration {
    index: usize,
    symbols: usize,
    #[serde(flatten)]
    draw: JsonDraw,
}

/// Collects draw calls for JSON output.
#[derive(Default)]
struct JsonSink {
    calls: Vec<JsonDraw>,
}

impl RenderSink for JsonSink {
    fn draw(&mut self, call: DrawCall<'_>) {
        let segments = call
            .segments()
            .map(|(a, b)| JsonSegment {
                x1: a.x,
                y1: a.y,
                x2: b.x,
                y2: b.y,
            })
            .collect();
        self.calls.push(JsonDraw {
            pipeline: call.pipeline.label().to_string(),
            stride: call.pipeline.layout().stride,
            first: call.range.first,
            count: call.range.count,
            generation: call.generation,
            transform: call.transform_matrix(),
            segments,
        });
    }
}

/// Execute the render command.
pub fn cmd_render(args: &RenderArgs, config: &EngineConfig) -> Result<()> {
    let (lsystem, _) = load_lsystem(&args.grammar, config)?;
    let index = resolve_iteration(&lsystem, args.iteration)?;

    let bytes = match args.format {
        OutputFormat::Svg => render_svg(&lsystem, index, args)?.into_bytes(),
        OutputFormat::Png => render_png(&lsystem, index, args)?,
        OutputFormat::Json => render_json(&lsystem, index, args)?,
    };

    write_output(args.output.as_ref(), &bytes)
}

fn render_svg(lsystem: &LSystem, index: usize, args: &RenderArgs) -> Result<String> {
    let Size { width, height } = args.size;
    let view = fit_viewport(width as f32, height as f32);

    let mut sink = SvgSink::new(width, height)
        .with_stroke(args.stroke.as_str(), args.stroke_width)
        .with_background("white");
    lsystem.render(index, &view, &mut sink)?;

    Ok(sink.finish())
}

/// Rasterize the SVG output with resvg.
fn render_png(lsystem: &LSystem, index: usize, args: &RenderArgs) -> Result<Vec<u8>> {
    let svg = render_svg(lsystem, index, args)?;

    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(&svg, &options).context("parsing generated SVG")?;

    let Size { width, height } = args.size;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot allocate a {}x{} image", width, height))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap.encode_png().map_err(|e| anyhow!("encoding PNG: {}", e))
}

fn render_json(lsystem: &LSystem, index: usize, args: &RenderArgs) -> Result<Vec<u8>> {
    let view = fit_viewport(args.size.width as f32, args.size.height as f32);
    let mut sink = JsonSink::default();
    lsystem.render(index, &view, &mut sink)?;

    let draw = sink
        .calls
        .pop()
        .ok_or_else(|| anyhow!("iteration {} produced no draw call", index))?;

    let output = JsonIteration {
        index,
        symbols: lsystem.symbol_string(index)?.chars().count(),
        draw,
    };

    let mut json = serde_json::to_vec_pretty(&output)?;
    json.push(b'\n');
    Ok(json)
}
