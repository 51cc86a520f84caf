//! Iteration history - the L-system itself.
//!
//! Holds every generated symbol string (iteration 0 is the axiom), the
//! geometry of each one in a shared [`GeometryBuffer`], and a per-iteration
//! normalization transform so any past iteration can be redrawn as-is.

use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::buffer::GeometryBuffer;
use crate::config::{EngineConfig, FIT_SIZE, MAX_SYMBOLS};
use crate::error::LsysError;
use crate::geometry::{Transform, VertexRange, normalize_transform};
use crate::grammar::Grammar;
use crate::render::{DrawCall, Pipeline, RenderSink};
use crate::turtle::Turtle;

/// One generation: its symbols, where its vertices live, and how to fit it on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    symbols: String,
    range: VertexRange,
    normalize: Transform,
}

impl IterationRecord {
    pub fn symbols(&self) -> &str {
        &self.symbols
    }

    pub fn range(&self) -> VertexRange {
        self.range
    }

    /// Scales this iteration into the fit square, centered at the origin.
    pub fn normalize(&self) -> Transform {
        self.normalize
    }
}

/// Outcome of loading a grammar and precomputing its iterations.
#[derive(Debug)]
pub struct LoadReport {
    /// Iterations the grammar asked for
    pub target: u32,
    /// Iterations actually held after the load
    pub reached: usize,
    /// Why precompute stopped short, if it did
    pub stopped_early: Option<LsysError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.stopped_early.is_none()
    }
}

/// A grammar plus every iteration generated from it so far.
///
/// ## Rust Lesson #27: Moves are free, transfers are explicit
///
/// Moving an `LSystem` (`let b = a;`) already hands everything over and
/// makes `a` unusable. [`LSystem::transfer`] is for when the old owner
/// has to stay around (say, a slot in a `Vec`): it moves the contents
/// out and leaves an empty but valid L-system behind.
#[derive(Debug)]
pub struct LSystem {
    grammar: Grammar,
    history: Vec<IterationRecord>,
    buffer: GeometryBuffer,
    turtle: Turtle,
    fit_size: f32,
    max_symbols: usize,
    pipeline: Rc<Pipeline>,
}

impl LSystem {
    /// An empty L-system with the default configuration.
    pub fn new(pipeline: Rc<Pipeline>) -> Self {
        Self {
            grammar: Grammar::default(),
            history: Vec::new(),
            buffer: GeometryBuffer::default(),
            turtle: Turtle::default(),
            fit_size: FIT_SIZE,
            max_symbols: MAX_SYMBOLS,
            pipeline,
        }
    }

    pub fn with_config(pipeline: Rc<Pipeline>, config: &EngineConfig) -> Result<Self, LsysError> {
        config.validate()?;
        Ok(Self {
            grammar: Grammar::default(),
            history: Vec::new(),
            buffer: GeometryBuffer::new(config.max_buffer_bytes, config.growth),
            turtle: Turtle::new(&config.turtle)?,
            fit_size: config.fit_size,
            max_symbols: config.max_symbols,
            pipeline,
        })
    }

    /// Replace the current L-system with the grammar in `text`.
    ///
    /// On a parse error nothing changes.
    pub fn load_from_text(&mut self, text: &str) -> Result<LoadReport, LsysError> {
        let grammar = Grammar::parse(text)?;
        self.initialize(grammar)
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<LoadReport, LsysError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LsysError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let report = self.load_from_text(&text)?;
        info!(path = %path.display(), iterations = report.reached, "loaded grammar file");
        Ok(report)
    }

    /// Replace the current L-system with `grammar` and precompute its iterations.
    ///
    /// Iteration 0 is built on the side and swapped in only once it fits;
    /// if even the axiom overflows the buffer, the old state is kept.
    /// Running out of room later just stops precompute early.
    pub fn initialize(&mut self, grammar: Grammar) -> Result<LoadReport, LsysError> {
        let axiom_len = grammar.axiom().chars().count();
        if axiom_len > self.max_symbols {
            return Err(LsysError::SymbolLimitExceeded {
                required: axiom_len,
                max: self.max_symbols,
            });
        }

        let mut buffer = self.buffer.empty_like();
        let axiom = Self::build_record(
            &self.turtle,
            grammar.axiom().to_string(),
            grammar.angle(),
            self.fit_size,
            &mut buffer,
        )?;

        self.grammar = grammar;
        self.history = vec![axiom];
        self.buffer = buffer;

        let target = self.grammar.target_iterations();
        let mut stopped_early = None;
        while self.history.len() < target as usize {
            if let Err(err) = self.advance() {
                warn!(
                    requested = target,
                    reached = self.history.len(),
                    error = %err,
                    "stopped precomputing iterations"
                );
                stopped_early = Some(err);
                break;
            }
        }

        info!(
            requested = target,
            reached = self.history.len(),
            rules = self.grammar.rules().len(),
            "initialized L-system"
        );

        Ok(LoadReport {
            target,
            reached: self.history.len(),
            stopped_early,
        })
    }

    /// Rewrite the newest string and append its geometry.
    ///
    /// Returns the index of the new iteration. When the new string would
    /// pass the symbol limit, or its geometry the buffer ceiling, the
    /// iteration is discarded and the history is unchanged.
    pub fn advance(&mut self) -> Result<usize, LsysError> {
        let last = self.history.last().ok_or(LsysError::NotLoaded)?;

        let required = self.grammar.expansion_len(last.symbols()).unwrap_or(usize::MAX);
        if required > self.max_symbols {
            return Err(LsysError::SymbolLimitExceeded {
                required,
                max: self.max_symbols,
            });
        }
        let symbols = self.grammar.rewrite(last.symbols());

        let record = Self::build_record(
            &self.turtle,
            symbols,
            self.grammar.angle(),
            self.fit_size,
            &mut self.buffer,
        )?;
        self.history.push(record);

        Ok(self.history.len() - 1)
    }

    fn build_record(
        turtle: &Turtle,
        symbols: String,
        angle: f32,
        fit_size: f32,
        buffer: &mut GeometryBuffer,
    ) -> Result<IterationRecord, LsysError> {
        let vertices = turtle.interpret(&symbols, angle);
        let range = buffer.append(&vertices)?;
        let normalize = normalize_transform(&vertices, fit_size);

        debug!(
            symbols = symbols.len(),
            first = range.first,
            count = range.count,
            used_bytes = buffer.used_bytes(),
            capacity_bytes = buffer.capacity_bytes(),
            "appended iteration geometry"
        );

        Ok(IterationRecord {
            symbols,
            range,
            normalize,
        })
    }

    pub fn iteration_count(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn iteration(&self, index: usize) -> Result<&IterationRecord, LsysError> {
        self.history.get(index).ok_or(LsysError::IndexOutOfRange {
            index,
            len: self.history.len(),
        })
    }

    pub fn symbol_string(&self, index: usize) -> Result<&str, LsysError> {
        self.iteration(index).map(IterationRecord::symbols)
    }

    pub fn latest(&self) -> Option<&IterationRecord> {
        self.history.last()
    }

    pub fn iterations(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn buffer(&self) -> &GeometryBuffer {
        &self.buffer
    }

    pub fn pipeline(&self) -> &Rc<Pipeline> {
        &self.pipeline
    }

    /// Draw iteration `index` with `view` applied after its normalization.
    pub fn render(
        &self,
        index: usize,
        view: &Transform,
        sink: &mut dyn RenderSink,
    ) -> Result<(), LsysError> {
        let record = self.iteration(index)?;
        let vertices = self
            .buffer
            .vertices(record.range)
            .ok_or(LsysError::IndexOutOfRange {
                index: record.range.end(),
                len: self.buffer.len(),
            })?;

        sink.draw(DrawCall {
            pipeline: &self.pipeline,
            transform: record.normalize.then(view),
            range: record.range,
            generation: self.buffer.generation(),
            vertices,
        });
        Ok(())
    }

    /// Draw the newest iteration. Does nothing when empty.
    pub fn render_latest(
        &self,
        view: &Transform,
        sink: &mut dyn RenderSink,
    ) -> Result<(), LsysError> {
        match self.history.len() {
            0 => Ok(()),
            n => self.render(n - 1, view, sink),
        }
    }

    /// Move grammar, history and buffer into a new owner, leaving `self` empty.
    ///
    /// Both keep a handle on the shared pipeline; it is released when the
    /// last of them is dropped.
    pub fn transfer(&mut self) -> LSystem {
        LSystem {
            grammar: std::mem::take(&mut self.grammar),
            history: std::mem::take(&mut self.history),
            buffer: self.buffer.take(),
            turtle: self.turtle.clone(),
            fit_size: self.fit_size,
            max_symbols: self.max_symbols,
            pipeline: Rc::clone(&self.pipeline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::GrowthPolicy;
    use crate::geometry::{Point, VERTEX_BYTES};

    const KOCH: &str = "90\n2\nF\nF F+F-F-F+F\n";

    /// Remembers every draw call it receives.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Transform, VertexRange, u64, Vec<Point>)>,
    }

    impl RenderSink for Recorder {
        fn draw(&mut self, call: DrawCall<'_>) {
            self.calls.push((call.transform, call.range, call.generation, call.vertices.to_vec()));
        }
    }

    fn small(max_buffer_bytes: usize) -> LSystem {
        let config = EngineConfig {
            max_buffer_bytes,
            ..EngineConfig::default()
        };
        LSystem::with_config(Pipeline::shared("test"), &config).unwrap()
    }

    #[test]
    fn koch_scenario() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        let report = ls.load_from_text(KOCH).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.reached, 2);
        assert_eq!(ls.symbol_string(0).unwrap(), "F");
        assert_eq!(ls.symbol_string(1).unwrap(), "F+F-F-F+F");
        assert_eq!(ls.iteration(0).unwrap().range(), VertexRange::new(0, 2));
        assert_eq!(ls.iteration(1).unwrap().range(), VertexRange::new(2, 10));
    }

    #[test]
    fn zero_or_one_target_keeps_only_axiom() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text("90\n0\nF\nF FF\n").unwrap();
        assert_eq!(ls.iteration_count(), 1);
        ls.load_from_text("90\n1\nF\nF FF\n").unwrap();
        assert_eq!(ls.iteration_count(), 1);
    }

    #[test]
    fn advance_grows_by_one_and_ranges_are_contiguous() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text("25\n1\nX\nX F+[[X]-X]-F[-FX]+X\nF FF\n").unwrap();

        for expected in 1..5 {
            assert_eq!(ls.advance().unwrap(), expected);
            assert_eq!(ls.iteration_count(), expected + 1);
        }

        let mut next = 0;
        for record in ls.iterations() {
            assert_eq!(record.range().first, next);
            assert_eq!(record.range().count % 2, 0);
            next = record.range().end();
        }
        assert_eq!(next * VERTEX_BYTES, ls.buffer().used_bytes());
    }

    #[test]
    fn advance_before_load_fails() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        assert!(matches!(ls.advance(), Err(LsysError::NotLoaded)));
    }

    #[test]
    fn capacity_stops_precompute_early() {
        // 512 vertices: 2 + 10 + 50 + 250 fit, the next 1250 don't
        let mut ls = small(4096);
        let report = ls.load_from_text("90\n50\nF\nF F+F-F-F+F\n").unwrap();

        assert_eq!(report.target, 50);
        assert_eq!(report.reached, 4);
        assert!(report.stopped_early.as_ref().is_some_and(LsysError::is_capacity_exceeded));
        assert_eq!(ls.iteration_count(), 4);
        assert_eq!(ls.buffer().used_bytes(), 312 * VERTEX_BYTES);

        // the last good iteration still draws
        let mut rec = Recorder::default();
        ls.render(3, &Transform::identity(), &mut rec).unwrap();
        assert_eq!(rec.calls[0].3.len(), 250);
    }

    #[test]
    fn failed_advance_changes_nothing() {
        let mut ls = small(4096);
        ls.load_from_text("90\n4\nF\nF F+F-F-F+F\n").unwrap();
        let used = ls.buffer().used_bytes();

        let err = ls.advance().unwrap_err();
        assert!(err.is_capacity_exceeded());
        assert_eq!(ls.iteration_count(), 4);
        assert_eq!(ls.buffer().used_bytes(), used);

        // and it keeps failing the same way
        assert!(ls.advance().unwrap_err().is_capacity_exceeded());
        assert_eq!(ls.iteration_count(), 4);
    }

    fn symbol_limited(max_symbols: usize) -> LSystem {
        let config = EngineConfig {
            max_symbols,
            ..EngineConfig::default()
        };
        LSystem::with_config(Pipeline::shared("test"), &config).unwrap()
    }

    #[test]
    fn growth_without_geometry_stops_at_symbol_limit() {
        // X doubles and never draws: 1, 2, 4, ... 4096 symbols fit
        let mut ls = symbol_limited(4096);
        let report = ls.load_from_text("90\n50\nX\nX XX\n").unwrap();

        assert_eq!(report.reached, 13);
        assert!(matches!(
            report.stopped_early,
            Some(LsysError::SymbolLimitExceeded { required: 8192, max: 4096 })
        ));
        assert_eq!(ls.symbol_string(12).unwrap().len(), 4096);
        assert!(ls.buffer().is_empty());

        // retrying fails the same way without touching the history
        assert!(ls.advance().unwrap_err().is_capacity_exceeded());
        assert_eq!(ls.iteration_count(), 13);
    }

    #[test]
    fn default_symbol_limit_stops_doubling_grammar() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        let report = ls.load_from_text("90\n50\nX\nX XX\n").unwrap();

        assert!(report.stopped_early.as_ref().is_some_and(LsysError::is_capacity_exceeded));
        assert_eq!(report.reached, 25);
        assert_eq!(ls.latest().unwrap().symbols().len(), MAX_SYMBOLS);
    }

    #[test]
    fn oversized_axiom_by_symbols_keeps_previous_state() {
        let mut ls = symbol_limited(4);
        ls.load_from_text("90\n1\nF\n").unwrap();

        let err = ls.load_from_text("90\n1\nF+F+F\n").unwrap_err();
        assert!(matches!(err, LsysError::SymbolLimitExceeded { required: 5, max: 4 }));
        assert_eq!(ls.symbol_string(0).unwrap(), "F");
    }

    #[test]
    fn parse_error_keeps_previous_grammar() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text(KOCH).unwrap();

        let err = ls.load_from_text("90\n2\n").unwrap_err();
        assert!(matches!(err, LsysError::Parse(_)));
        assert_eq!(ls.symbol_string(0).unwrap(), "F");
        assert_eq!(ls.iteration_count(), 2);
        assert_eq!(ls.grammar().rule('F'), Some("F+F-F-F+F"));
    }

    #[test]
    fn oversized_axiom_keeps_previous_state() {
        let mut ls = small(64);
        ls.load_from_text("90\n1\nF\n").unwrap();

        let err = ls.load_from_text("90\n1\nFFFFFFFFFF\n").unwrap_err();
        assert!(err.is_capacity_exceeded());
        assert_eq!(ls.symbol_string(0).unwrap(), "F");
        assert_eq!(ls.buffer().used_bytes(), 2 * VERTEX_BYTES);
    }

    #[test]
    fn reload_replaces_history() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text(KOCH).unwrap();
        ls.load_from_text("60\n1\nA\nA B-A-B\nB A+B+A\n").unwrap();

        assert_eq!(ls.iteration_count(), 1);
        assert_eq!(ls.symbol_string(0).unwrap(), "A");
        assert_eq!(ls.iteration(0).unwrap().range(), VertexRange::new(0, 0));
        assert!(ls.buffer().is_empty());
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text(KOCH).unwrap();

        let err = ls.iteration(2).unwrap_err();
        assert!(matches!(err, LsysError::IndexOutOfRange { index: 2, len: 2 }));
        assert!(ls.symbol_string(99).is_err());
        let mut rec = Recorder::default();
        assert!(ls.render(2, &Transform::identity(), &mut rec).is_err());
        assert!(rec.calls.is_empty());
    }

    #[test]
    fn unmapped_symbols_survive_every_generation() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text("90\n5\nFX\nF F+F\n").unwrap();
        for record in ls.iterations() {
            assert_eq!(record.symbols().matches('X').count(), 1);
            assert!(record.symbols().ends_with('X'));
        }
    }

    #[test]
    fn axiom_without_geometry_is_empty_not_an_error() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        let report = ls.load_from_text("90\n2\nX\nX F\n").unwrap();
        assert_eq!(report.reached, 2);
        assert!(ls.iteration(0).unwrap().range().is_empty());
        assert_eq!(ls.iteration(0).unwrap().normalize(), Transform::identity());
        assert_eq!(ls.iteration(1).unwrap().range().count, 2);
    }

    #[test]
    fn redraw_is_stable_across_advances() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text(KOCH).unwrap();
        let view = Transform::scale(0.5, 1.0);

        let mut before = Recorder::default();
        ls.render(1, &view, &mut before).unwrap();
        ls.advance().unwrap();
        ls.advance().unwrap();
        let mut after = Recorder::default();
        ls.render(1, &view, &mut after).unwrap();
        ls.render(1, &view, &mut after).unwrap();

        assert_eq!(before.calls[0].0, after.calls[0].0);
        assert_eq!(after.calls[0].0, after.calls[1].0);
        assert_eq!(before.calls[0].1, after.calls[0].1);
        assert_eq!(before.calls[0].3, after.calls[0].3);
    }

    #[test]
    fn render_combines_normalize_then_view() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text("90\n1\nF\n").unwrap();
        let view = Transform::scale(0.5, 1.0);

        let mut rec = Recorder::default();
        ls.render_latest(&view, &mut rec).unwrap();
        let (transform, range, _, verts) = &rec.calls[0];

        assert_eq!(*range, VertexRange::new(0, 2));
        // (0,0)-(0,1) is centered and scaled to 1.9 tall, then x is squeezed
        let top = transform.transform_point(verts[1]);
        assert!((top.y - 0.95).abs() < 1e-4);
        assert!(top.x.abs() < 1e-4);
        let bottom = transform.transform_point(verts[0]);
        assert!((bottom.y + 0.95).abs() < 1e-4);
    }

    #[test]
    fn render_latest_on_empty_is_noop() {
        let ls = LSystem::new(Pipeline::shared("test"));
        let mut rec = Recorder::default();
        ls.render_latest(&Transform::identity(), &mut rec).unwrap();
        assert!(rec.calls.is_empty());
    }

    #[test]
    fn generation_tracks_reallocation() {
        let config = EngineConfig {
            growth: GrowthPolicy::Exact,
            ..EngineConfig::default()
        };
        let mut ls = LSystem::with_config(Pipeline::shared("test"), &config).unwrap();
        ls.load_from_text(KOCH).unwrap();
        let gen_before = ls.buffer().generation();
        ls.advance().unwrap();
        assert!(ls.buffer().generation() > gen_before);
    }

    #[test]
    fn transfer_leaves_source_empty() {
        let pipeline = Pipeline::shared("test");
        let mut a = LSystem::new(Rc::clone(&pipeline));
        a.load_from_text(KOCH).unwrap();

        let b = a.transfer();
        assert_eq!(b.iteration_count(), 2);
        assert_eq!(b.symbol_string(1).unwrap(), "F+F-F-F+F");
        assert!(a.is_empty());
        assert!(a.buffer().is_empty());
        assert!(matches!(a.advance(), Err(LsysError::NotLoaded)));
        assert_eq!(Pipeline::holders(&pipeline), 3);

        // the emptied source is still a working L-system
        a.load_from_text("90\n1\nF\n").unwrap();
        assert_eq!(a.iteration_count(), 1);

        drop(a);
        assert_eq!(Pipeline::holders(&pipeline), 2);
        let mut rec = Recorder::default();
        b.render(1, &Transform::identity(), &mut rec).unwrap();
        assert_eq!(rec.calls.len(), 1);
    }

    #[test]
    fn pipeline_released_with_last_holder() {
        let pipeline = Pipeline::shared("test");
        let weak = Rc::downgrade(&pipeline);

        let mut a = LSystem::new(pipeline);
        let b = a.transfer();
        let c = LSystem::new(Rc::clone(b.pipeline()));
        assert_eq!(weak.strong_count(), 3);

        drop(b);
        drop(a);
        assert!(weak.upgrade().is_some());
        drop(c);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn bad_config_rejected() {
        let config = EngineConfig {
            fit_size: -1.0,
            ..EngineConfig::default()
        };
        assert!(LSystem::with_config(Pipeline::shared("test"), &config).is_err());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        let err = ls.load_from_file("/no/such/grammar.lsys").unwrap_err();
        assert!(matches!(err, LsysError::Io { .. }));
    }

    #[test]
    fn normalize_uses_own_extent() {
        let mut ls = LSystem::new(Pipeline::shared("test"));
        ls.load_from_text(KOCH).unwrap();
        // iteration 0 is 1 tall, iteration 1 is 3 tall: different scales
        let s0 = ls.iteration(0).unwrap().normalize().m22;
        let s1 = ls.iteration(1).unwrap().normalize().m22;
        assert!((s0 - 1.9).abs() < 1e-4);
        assert!((s1 - 1.9 / 3.0).abs() < 1e-4);
    }
}
