//! Interactive terminal viewer.
//!
//! Iterations are drawn into a braille canvas. New iterations can be
//! computed on demand and the grammar file reloaded while the viewer runs.

use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        Block, Borders, List, ListItem, ListState, Paragraph,
        canvas::{Canvas, Line as CanvasLine},
    },
};

use lsys::{DrawCall, EngineConfig, LSystem, Pipeline, RenderSink, fit_viewport};

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Grammar file
    pub grammar: PathBuf,
}

/// Collects clip-space segments for the canvas.
#[derive(Default)]
struct CanvasSink {
    segments: Vec<(f64, f64, f64, f64)>,
}

impl RenderSink for CanvasSink {
    fn draw(&mut self, call: DrawCall<'_>) {
        self.segments.extend(
            call.segments()
                .map(|(a, b)| (a.x as f64, a.y as f64, b.x as f64, b.y as f64)),
        );
    }
}

struct App {
    path: PathBuf,
    lsystem: LSystem,
    selected: usize,
    status: String,
    should_quit: bool,
}

impl App {
    fn new(path: PathBuf, config: &EngineConfig) -> Result<Self> {
        let mut lsystem = LSystem::with_config(Pipeline::shared("lsys-view"), config)?;
        let report = lsystem.load_from_file(&path)?;

        let status = match &report.stopped_early {
            Some(err) => format!("Stopped at {} of {}: {}", report.reached, report.target, err),
            None => format!("Loaded {} iterations", report.reached),
        };

        Ok(Self {
            path,
            selected: lsystem.iteration_count().saturating_sub(1),
            lsystem,
            status,
            should_quit: false,
        })
    }

    fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn next(&mut self) {
        if self.selected + 1 < self.lsystem.iteration_count() {
            self.selected += 1;
        }
    }

    fn advance(&mut self) {
        match self.lsystem.advance() {
            Ok(index) => {
                self.selected = index;
                self.status = format!("Computed iteration {}", index);
            }
            Err(e) => self.status = format!("Cannot advance: {}", e),
        }
    }

    /// Reload the grammar file. A failed reload keeps the current system.
    fn reload(&mut self) {
        match self.lsystem.load_from_file(&self.path) {
            Ok(report) => {
                self.selected = self.lsystem.iteration_count().saturating_sub(1);
                self.status = match report.stopped_early {
                    Some(err) => format!("Reloaded, stopped at {}: {}", report.reached, err),
                    None => format!("Reloaded {} iterations", report.reached),
                };
            }
            Err(e) => self.status = format!("Reload failed: {}", e),
        }
    }

    fn segments(&self, area: Rect) -> Vec<(f64, f64, f64, f64)> {
        // Braille cells are 2x4 dots
        let view = fit_viewport(area.width as f32 * 2.0, area.height as f32 * 4.0);
        let mut sink = CanvasSink::default();
        if self.lsystem.render(self.selected, &view, &mut sink).is_err() {
            return Vec::new();
        }
        sink.segments
    }
}

/// Execute the view command.
pub fn cmd_view(args: &ViewArgs, config: &EngineConfig) -> Result<()> {
    let mut app = App::new(args.grammar.clone(), config)?;

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                        KeyCode::Left | KeyCode::Char('h') | KeyCode::Up | KeyCode::Char('k') => {
                            app.prev()
                        }
                        KeyCode::Right
                        | KeyCode::Char('l')
                        | KeyCode::Down
                        | KeyCode::Char('j') => app.next(),
                        KeyCode::Char('n') | KeyCode::Char(' ') => app.advance(),
                        KeyCode::Char('r') => app.reload(),
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(3)])
        .split(frame.area());

    let top_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(26), Constraint::Min(40)])
        .split(main_layout[0]);

    let sidebar_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(8)])
        .split(top_layout[0]);

    // Iteration list
    let items: Vec<ListItem> = app
        .lsystem
        .iterations()
        .iter()
        .enumerate()
        .map(|(i, record)| {
            ListItem::new(format!("{:>2}  {} segs", i, record.range().segment_count()))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Iterations ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("► ");

    let mut list_state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, sidebar_layout[0], &mut list_state);

    // Stats panel
    let buffer = app.lsystem.buffer();
    let symbols = app.lsystem.symbol_string(app.selected).map(|s| s.chars().count()).unwrap_or(0);
    let stats_text = format!(
        "Angle: {}°\nSymbols: {}\nBuffer: {} KiB\nCapacity: {} KiB\nGeneration: {}",
        app.lsystem.grammar().angle(),
        symbols,
        buffer.used_bytes() / 1024,
        buffer.capacity_bytes() / 1024,
        buffer.generation()
    );
    let stats = Paragraph::new(stats_text)
        .block(
            Block::default()
                .title(" Stats ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(stats, sidebar_layout[1]);

    // Drawing
    let canvas_block = Block::default()
        .title(format!(" {} ", app.path.display()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    let inner = canvas_block.inner(top_layout[1]);
    let segments = app.segments(inner);

    let canvas = Canvas::default()
        .block(canvas_block)
        .marker(Marker::Braille)
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(move |ctx| {
            for &(x1, y1, x2, y2) in &segments {
                ctx.draw(&CanvasLine {
                    x1,
                    y1,
                    x2,
                    y2,
                    color: Color::White,
                });
            }
        });
    frame.render_widget(canvas, top_layout[1]);

    // Help bar
    let help = Paragraph::new(format!(
        "←/→ select  n advance  r reload  q quit  │  {}",
        app.status
    ))
    .block(Block::default().borders(Borders::ALL))
    .style(Style::default().fg(Color::Gray));
    frame.render_widget(help, main_layout[1]);
}
