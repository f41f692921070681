/// Ratatui front end for branchview.
///
/// Architecture:
///   main thread:  event loop, crossterm key/mouse/resize events + mpsc LoadResult drain
///   load task:    tokio::spawn, reads an export with tokio::fs and sends a LoadResult back
///
/// Layout:
///   ┌────────────────────────────────────────────────┐
///   │  toolbar / status (1 line)                     │
///   ├──────────────────────────────┬─────────────────┤
///   │  canvas (Min(0))             │  side panel     │
///   ├──────────────────────────────┴─────────────────┤
///   │  minimap strip                                 │
///   ├────────────────────────────────────────────────┤
///   │  stats bar (1 line)                            │
///   └────────────────────────────────────────────────┘
pub mod canvas;
pub mod minimap_view;
pub mod overlays;
pub mod panel_view;
pub mod render;

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use tokio::sync::mpsc;

use crate::app::App;
use crate::config::ResolvedConfig;
use crate::conversation::ConversationNode;
use crate::hierarchy::{Hierarchy, NodeId};
use crate::importer::{self, ImportOptions, ImportedConversation};
use crate::layout::{LayoutEngine, Point};
use crate::panel::{self, Nav};
use crate::scene::{ToggleState, node_point};
use crate::stats::Stats;
use crate::ui;
use render::Areas;

// ── LoadResult: file reads coming back from spawned tasks ─────────────────────

#[derive(Debug)]
pub enum LoadResult {
    Loaded { path: PathBuf, conversations: Vec<ImportedConversation> },
    Failed { path: PathBuf, error: String },
}

// ── Modes / actions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// Typing a path into the open-file prompt.
    OpenPrompt,
    /// Choosing among the conversations of the current export.
    Picker,
    Help,
}

/// What the event loop must do after a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Open(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragTarget {
    Canvas,
    Minimap,
    /// A fork or sibling row; only a click counts.
    Panel,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    target: DragTarget,
    last: (u16, u16),
    moved: bool,
}

// ── TuiState ──────────────────────────────────────────────────────────────────

pub struct TuiState {
    pub app: App,
    pub mode: Mode,
    pub conversations: Vec<ImportedConversation>,
    /// Index into `conversations` of what is on screen.
    pub current: usize,
    pub picker_selected: usize,
    pub prompt: String,
    pub status: Option<Status>,
    pub source: Option<PathBuf>,
    /// Terminal size the areas were computed for.
    pub size: Rect,
    /// True while frames must keep coming from the ticker.
    pub animating: bool,
    drag: Option<Drag>,
}

impl TuiState {
    pub fn new(
        config: ResolvedConfig,
        conversations: Vec<ImportedConversation>,
        source: Option<PathBuf>,
        size: Rect,
        now: Instant,
    ) -> Self {
        let areas = Areas::compute(size, &config);
        let (width, height) = canvas_px(areas.canvas, &config);
        let app = match conversations.first() {
            Some(c) => App::new(config, &c.tree, &c.title, width, height, now),
            None => App::new(config, &ConversationNode::placeholder("(no conversations)"), "", width, height, now),
        };
        Self {
            app,
            mode: Mode::Normal,
            conversations,
            current: 0,
            picker_selected: 0,
            prompt: String::new(),
            status: None,
            source,
            size,
            animating: true,
            drag: None,
        }
    }

    pub fn areas(&self) -> Areas {
        Areas::compute(self.size, self.app.config())
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(Status { text: text.into(), error: false });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(Status { text: text.into(), error: true });
    }

    pub fn import_options(&self) -> ImportOptions {
        self.app.config().import.clone()
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    /// Show conversation `index` of the current export.
    pub fn load_conversation(&mut self, index: usize, now: Instant) {
        let Some(c) = self.conversations.get(index) else {
            return;
        };
        let status = format!("{} · {} messages", c.title, c.tree.count());
        self.app.load(&c.tree, &c.title, now);
        self.current = index;
        self.set_status(status);
    }

    /// Apply a finished file read. A failure leaves the current view untouched.
    pub fn apply_load(&mut self, result: LoadResult, now: Instant) {
        match result {
            LoadResult::Loaded { path, conversations } => {
                if conversations.is_empty() {
                    self.set_error(format!("{}: no conversations", path.display()));
                    return;
                }
                tracing::info!(path = %path.display(), conversations = conversations.len(), "export loaded");
                self.conversations = conversations;
                self.source = Some(path);
                self.picker_selected = 0;
                self.load_conversation(0, now);
            }
            LoadResult::Failed { path, error } => {
                tracing::warn!(path = %path.display(), %error, "load failed");
                self.set_error(error);
            }
        }
    }

    // ── Resize ────────────────────────────────────────────────────────────────

    pub fn handle_resize(&mut self, cols: u16, rows: u16, now: Instant) {
        self.size = Rect::new(0, 0, cols, rows);
        let (width, height) = canvas_px(self.areas().canvas, self.app.config());
        self.app.resize(width, height, now);
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        if key.kind == KeyEventKind::Release {
            return Action::None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }
        match self.mode {
            Mode::Normal => self.handle_normal_key(key, now),
            Mode::OpenPrompt => self.handle_prompt_key(key),
            Mode::Picker => {
                self.handle_picker_key(key, now);
                Action::None
            }
            Mode::Help => {
                self.mode = Mode::Normal;
                Action::None
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        let step = self.app.config().viewport.pan_step;
        let zoom = self.app.config().viewport.zoom_step;
        let selected = self.app.panel().is_open();
        match key.code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char('f') => self.app.fit_to_view(now),
            KeyCode::Char('e') => self.app.expand_all(now),
            KeyCode::Char('c') => self.app.collapse_all(now),
            KeyCode::Char(' ') | KeyCode::Char('t') => {
                if !self.app.toggle_selected(now) && !selected {
                    self.set_status("select a node first (Enter selects the root)");
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.app.zoom(zoom, now),
            KeyCode::Char('-') => self.app.zoom(1.0 / zoom, now),
            KeyCode::Char('h') => self.app.pan(step, 0.0, now),
            KeyCode::Char('l') => self.app.pan(-step, 0.0, now),
            KeyCode::Char('k') => self.app.pan(0.0, step, now),
            KeyCode::Char('j') => self.app.pan(0.0, -step, now),
            KeyCode::Left if selected => {
                self.app.navigate(Nav::Parent, now);
            }
            KeyCode::Right if selected => {
                self.app.navigate(Nav::FirstChild, now);
            }
            KeyCode::Up if selected => {
                self.app.navigate(Nav::Prev, now);
            }
            KeyCode::Down if selected => {
                self.app.navigate(Nav::Next, now);
            }
            KeyCode::Left => self.app.pan(step, 0.0, now),
            KeyCode::Right => self.app.pan(-step, 0.0, now),
            KeyCode::Up => self.app.pan(0.0, step, now),
            KeyCode::Down => self.app.pan(0.0, -step, now),
            KeyCode::Enter if !selected => {
                let root = self.app.hierarchy().root();
                self.app.select(root, now);
            }
            KeyCode::Esc => self.app.close_panel(),
            KeyCode::Char('o') => {
                self.prompt.clear();
                self.mode = Mode::OpenPrompt;
            }
            KeyCode::Char('p') => {
                self.picker_selected = self.current;
                self.mode = Mode::Picker;
            }
            KeyCode::Char('?') => self.mode = Mode::Help,
            _ => {}
        }
        Action::None
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                let path = self.prompt.trim().to_string();
                if !path.is_empty() {
                    self.set_status(format!("reading {path}…"));
                    return Action::Open(PathBuf::from(path));
                }
            }
            KeyCode::Backspace => {
                self.prompt.pop();
            }
            KeyCode::Char(c) => self.prompt.push(c),
            _ => {}
        }
        Action::None
    }

    fn handle_picker_key(&mut self, key: KeyEvent, now: Instant) {
        let last = self.conversations.len().saturating_sub(1);
        match key.code {
            KeyCode::Esc | KeyCode::Char('p') => self.mode = Mode::Normal,
            KeyCode::Up | KeyCode::Char('k') => {
                self.picker_selected = self.picker_selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.picker_selected = (self.picker_selected + 1).min(last);
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                if self.picker_selected != self.current {
                    self.load_conversation(self.picker_selected, now);
                }
            }
            _ => {}
        }
    }

    // ── Mouse ─────────────────────────────────────────────────────────────────

    pub fn handle_mouse(&mut self, ev: MouseEvent, now: Instant) {
        if self.mode != Mode::Normal {
            return;
        }
        let (col, row) = (ev.column, ev.row);
        let cell = self.cell_size();
        match ev.kind {
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                let inward = ev.kind == MouseEventKind::ScrollUp;
                if self.minimap_point(col, row).is_some() {
                    let step = self.app.config().minimap.wheel_step;
                    self.app.minimap_resize(if inward { 1.0 / step } else { step }, now);
                } else if let Some(p) = self.canvas_point(col, row) {
                    let step = self.app.config().viewport.zoom_step;
                    self.app.zoom_at(p, if inward { step } else { 1.0 / step }, now);
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let target = if self.panel_item_at(col, row).is_some() {
                    Some(DragTarget::Panel)
                } else if self.minimap_point(col, row).is_some() {
                    Some(DragTarget::Minimap)
                } else if self.canvas_point(col, row).is_some() {
                    Some(DragTarget::Canvas)
                } else {
                    None
                };
                self.drag = target.map(|target| Drag { target, last: (col, row), moved: false });
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some(drag) = self.drag.as_mut() else {
                    return;
                };
                let dx = (col as f64 - drag.last.0 as f64) * cell.0;
                let dy = (row as f64 - drag.last.1 as f64) * cell.1;
                drag.last = (col, row);
                drag.moved = true;
                let target = drag.target;
                match target {
                    DragTarget::Canvas => self.app.pan(dx, dy, now),
                    DragTarget::Minimap => self.app.minimap_drag(dx, dy, now),
                    DragTarget::Panel => {}
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some(drag) = self.drag.take() else {
                    return;
                };
                if drag.moved {
                    return;
                }
                match drag.target {
                    DragTarget::Panel => {
                        if let Some(id) = self.panel_item_at(col, row) {
                            self.app.select(id, now);
                        }
                    }
                    DragTarget::Canvas => {
                        if let Some(p) = self.canvas_point(col, row) {
                            self.app.click(p, now);
                        }
                    }
                    DragTarget::Minimap => {
                        if let Some(p) = self.minimap_point(col, row) {
                            self.app.minimap_jump(p, now);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn cell_size(&self) -> (f64, f64) {
        let t = &self.app.config().terminal;
        (t.cell_width, t.cell_height)
    }

    /// Screen pixel under a terminal cell of the canvas, outside the side panel.
    pub fn canvas_point(&self, col: u16, row: u16) -> Option<Point> {
        let areas = self.areas();
        if self.app.panel().is_open() && contains(areas.panel(self.app.config().panel.width), col, row) {
            return None;
        }
        cell_point(areas.canvas, col, row, self.cell_size())
    }

    /// Fork or sibling listed under a terminal cell of the open side panel.
    pub fn panel_item_at(&self, col: u16, row: u16) -> Option<NodeId> {
        let view = self.app.panel().view()?;
        let area = self.areas().panel(self.app.config().panel.width);
        panel_view::item_at(view, area, col, row)
    }

    /// Minimap-space point under a terminal cell of the strip.
    pub fn minimap_point(&self, col: u16, row: u16) -> Option<Point> {
        cell_point(self.areas().minimap?, col, row, self.cell_size())
    }
}

fn contains(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x && col < area.right() && row >= area.y && row < area.bottom()
}

fn cell_point(area: Rect, col: u16, row: u16, cell: (f64, f64)) -> Option<Point> {
    if !contains(area, col, row) {
        return None;
    }
    Some(Point::new(
        ((col - area.x) as f64 + 0.5) * cell.0,
        ((row - area.y) as f64 + 0.5) * cell.1,
    ))
}

/// Canvas size in screen pixels.
fn canvas_px(canvas: Rect, config: &ResolvedConfig) -> (f64, f64) {
    (
        canvas.width as f64 * config.terminal.cell_width,
        canvas.height as f64 * config.terminal.cell_height,
    )
}

// ── Terminal setup / teardown ─────────────────────────────────────────────────

fn setup_terminal(mouse: bool) -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if mouse {
        execute!(stdout, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) {
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen);
    let _ = terminal.show_cursor();
}

// ── Main TUI run loop ─────────────────────────────────────────────────────────

pub async fn run(
    config: ResolvedConfig,
    conversations: Vec<ImportedConversation>,
    source: Option<PathBuf>,
) -> Result<()> {
    let mut terminal = setup_terminal(config.terminal.mouse)?;

    // Panic hook: restore terminal before printing panic
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        orig_hook(info);
    }));

    let result = event_loop(&mut terminal, config, conversations, source).await;

    restore_terminal(&mut terminal);
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: ResolvedConfig,
    conversations: Vec<ImportedConversation>,
    source: Option<PathBuf>,
) -> Result<()> {
    let size = terminal.size()?;
    let frame = config.animation.frame();
    let mut state = TuiState::new(
        config,
        conversations,
        source,
        Rect::new(0, 0, size.width, size.height),
        Instant::now(),
    );

    // Channel: load tasks → TUI
    let (load_tx, mut load_rx) = mpsc::unbounded_channel::<LoadResult>();

    let mut crossterm_events = EventStream::new();
    let mut ticker = tokio::time::interval(frame);

    // Splash screen
    terminal.draw(|f| render::draw_splash(f))?;
    tokio::time::sleep(tokio::time::Duration::from_millis(700)).await;
    terminal.draw(|f| render::draw(f, &state, Instant::now()))?;

    loop {
        tokio::select! {
            // ── Animation tick ────────────────────────────────────────────────
            _ = ticker.tick() => {
                if state.animating {
                    let now = Instant::now();
                    state.animating = state.app.tick(now);
                    terminal.draw(|f| render::draw(f, &state, now))?;
                }
            }

            // ── Finished file reads ───────────────────────────────────────────
            Some(result) = load_rx.recv() => {
                state.apply_load(result, Instant::now());
                state.animating = true;
            }

            // ── Keyboard / mouse / resize ─────────────────────────────────────
            Some(Ok(ev)) = crossterm_events.next() => {
                let now = Instant::now();
                match ev {
                    Event::Key(key) => match state.handle_key(key, now) {
                        Action::Quit => break,
                        Action::Open(path) => spawn_load(path, state.import_options(), load_tx.clone()),
                        Action::None => {}
                    },
                    Event::Mouse(mouse) => state.handle_mouse(mouse, now),
                    Event::Resize(cols, rows) => state.handle_resize(cols, rows, now),
                    _ => {}
                }
                state.animating = true;
                terminal.draw(|f| render::draw(f, &state, now))?;
            }
        }
    }

    Ok(())
}

/// Read and convert `path` off the UI thread. Every call is independent, so the
/// last read to finish is the one that ends up on screen.
fn spawn_load(path: PathBuf, opts: ImportOptions, tx: mpsc::UnboundedSender<LoadResult>) {
    tracing::debug!(path = %path.display(), "spawning load");
    tokio::spawn(async move {
        let result = match importer::read_export(&path, &opts).await {
            Ok(conversations) => LoadResult::Loaded { path, conversations },
            Err(e) => LoadResult::Failed { path, error: format!("{e:#}") },
        };
        let _ = tx.send(result);
    });
}

// ── Plain outline (--dump) ────────────────────────────────────────────────────

/// The initial visible tree as an indented outline with scene coordinates.
pub fn dump(conversation: &ImportedConversation, config: &ResolvedConfig) -> String {
    let mut hierarchy = Hierarchy::build(&conversation.tree);
    let engine = LayoutEngine::new(config.layout.clone());
    let layout = engine.layout(&mut hierarchy);
    let extents = engine.extents(&hierarchy, &layout.nodes);

    let mut out = String::new();
    out.push_str(&format!("{}\n", conversation.title));
    if !conversation.id.is_empty() {
        out.push_str(&format!("  id {}\n", conversation.id));
    }
    out.push('\n');

    let mut stack = vec![hierarchy.root()];
    while let Some(id) = stack.pop() {
        let Some(node) = hierarchy.get(id) else {
            continue;
        };
        let at = node_point(node);
        let marker = match ToggleState::of(node).marker() {
            "" => String::new(),
            m => format!(" {m}"),
        };
        out.push_str(&format!(
            "{indent}{glyph} {badge:<9} ({x:>6.0}, {y:>6.0}){marker}  {text}\n",
            indent = "  ".repeat(node.depth),
            glyph = ui::speaker_glyph(node.data.speaker),
            badge = node.data.speaker.badge(),
            x = at.x,
            y = at.y,
            text = panel::preview(&node.data.text, 60),
        ));
        stack.extend(node.children().iter().rev());
    }

    out.push('\n');
    out.push_str(&format!("{}\n", Stats::compute(&hierarchy)));
    out.push_str(&format!(
        "extents ({:.0}, {:.0}) {:.0}×{:.0}\n",
        extents.x, extents.y, extents.width, extents.height
    ));
    out
}
