/// Ratatui draw entry-point for branchview.
/// Thin dispatcher: the canvas, minimap, side panel and popups live in their own modules.
use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use super::{Mode, TuiState};
use crate::config::ResolvedConfig;
use crate::stats::Stats;
use crate::ui::{gap_between, truncate_to_width};
use unicode_width::UnicodeWidthStr;

// ── Splash screen ─────────────────────────────────────────────────────────────

const LOGO: &str = r#"
  ██████╗ ██████╗  █████╗ ███╗   ██╗ ██████╗██╗  ██╗██╗   ██╗██╗███████╗██╗    ██╗
  ██╔══██╗██╔══██╗██╔══██╗████╗  ██║██╔════╝██║  ██║██║   ██║██║██╔════╝██║    ██║
  ██████╔╝██████╔╝███████║██╔██╗ ██║██║     ███████║██║   ██║██║█████╗  ██║ █╗ ██║
  ██╔══██╗██╔══██╗██╔══██║██║╚██╗██║██║     ██╔══██║╚██╗ ██╔╝██║██╔══╝  ██║███╗██║
  ██████╔╝██║  ██║██║  ██║██║ ╚████║╚██████╗██║  ██║ ╚████╔╝ ██║███████╗╚███╔███╔╝
  ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚═╝  ╚═══╝ ╚═════╝╚═╝  ╚═╝  ╚═══╝  ╚═╝╚══════╝ ╚══╝╚══╝
"#;

pub fn draw_splash(f: &mut Frame) {
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(Color::Black)),
        area,
    );

    let logo_lines: Vec<Line> = LOGO
        .lines()
        .enumerate()
        .map(|(i, line)| {
            // blue for the user half of the gradient, green for the assistant half
            let color = match i % 6 {
                0 => Color::DarkGray,
                1 | 2 => Color::Rgb(90, 170, 255),
                3 => Color::Rgb(105, 190, 200),
                _ => Color::Rgb(120, 210, 140),
            };
            Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
        })
        .collect();

    let logo_height = logo_lines.len() as u16;
    let y = area.height.saturating_sub(logo_height + 4) / 2;

    let logo_area = Rect {
        x: area.x,
        y: area.y + y,
        width: area.width,
        height: logo_height.min(area.height),
    };
    let subtitle_area = Rect {
        x: area.x,
        y: (logo_area.y + logo_height + 1).min(area.bottom().saturating_sub(1)),
        width: area.width,
        height: 1,
    };

    f.render_widget(
        Paragraph::new(logo_lines).alignment(Alignment::Center),
        logo_area,
    );
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("branching conversations", Style::default().fg(Color::DarkGray)),
            Span::styled("  ·  ", Style::default().fg(Color::DarkGray)),
            Span::styled("as a tree you can walk", Style::default().fg(Color::DarkGray)),
        ]))
        .alignment(Alignment::Center),
        subtitle_area,
    );
}

// ── Areas ─────────────────────────────────────────────────────────────────────

/// Where each part of the screen goes for a given terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Areas {
    pub toolbar: Rect,
    pub canvas: Rect,
    pub minimap: Option<Rect>,
    pub stats: Rect,
}

impl Areas {
    pub fn compute(area: Rect, config: &ResolvedConfig) -> Self {
        let strip = if config.minimap.enabled { minimap_rows(config) } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),     // toolbar
                Constraint::Min(0),        // canvas
                Constraint::Length(strip), // minimap
                Constraint::Length(1),     // stats bar
            ])
            .split(area);
        Self {
            toolbar: chunks[0],
            canvas: chunks[1],
            minimap: (strip > 0 && chunks[2].height > 0).then_some(chunks[2]),
            stats: chunks[3],
        }
    }

    /// Side panel: the right edge of the canvas, drawn over it.
    pub fn panel(&self, width: u16) -> Rect {
        let w = width.min(self.canvas.width / 2).max(1).min(self.canvas.width);
        Rect {
            x: self.canvas.right().saturating_sub(w),
            width: w,
            ..self.canvas
        }
    }
}

/// Terminal rows needed for the minimap's pixel height.
pub fn minimap_rows(config: &ResolvedConfig) -> u16 {
    (config.minimap.height / config.terminal.cell_height).ceil().max(1.0) as u16
}

// ── Main draw entry point ─────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, state: &TuiState, now: Instant) {
    let full = f.area();
    let areas = Areas::compute(full, state.app.config());

    draw_toolbar(f, state, areas.toolbar);
    super::canvas::draw_canvas(f, &state.app, areas.canvas, now);
    if let Some(view) = state.app.panel().view() {
        let panel = areas.panel(state.app.config().panel.width);
        super::panel_view::draw_panel(f, view, panel);
    }
    if let Some(strip) = areas.minimap {
        super::minimap_view::draw_minimap(f, &state.app, strip, now);
    }
    draw_stats_bar(f, state.app.stats(), zoom_pct(state, now), areas.stats);

    match state.mode {
        Mode::Normal => {}
        Mode::OpenPrompt => super::overlays::draw_open_prompt(f, &state.prompt, full),
        Mode::Picker => super::overlays::draw_picker(f, state, full),
        Mode::Help => super::overlays::draw_help(f, full),
    }
}

fn zoom_pct(state: &TuiState, now: Instant) -> u32 {
    (state.app.viewport().transform(now).k * 100.0).round() as u32
}

// ── Toolbar / status ──────────────────────────────────────────────────────────

fn draw_toolbar(f: &mut Frame, state: &TuiState, area: Rect) {
    let w = area.width as usize;
    let source = state
        .source
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| format!("  {}", n.to_string_lossy()))
        .unwrap_or_else(|| "  sample".to_string());

    let (right, right_style) = match &state.status {
        Some(s) if s.error => (format!("✗ {} ", s.text), Style::default().fg(Color::Rgb(230, 90, 90))),
        Some(s) => (format!("{} ", s.text), Style::default().fg(Color::Rgb(140, 140, 180))),
        None => (
            "f fit  e expand  c collapse  o open  p pick  ? help ".to_string(),
            Style::default().fg(Color::Rgb(60, 55, 90)),
        ),
    };

    let left = format!(" ⑂ branchview  {}", state.app.title());
    let left = truncate_to_width(&left, w.saturating_sub(source.width() + 2));
    let right = truncate_to_width(&right, w.saturating_sub(left.width() + source.width()));
    let gap = gap_between(&format!("{left}{source}"), &right, w);

    let line = Line::from(vec![
        Span::styled(left, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled(source, Style::default().fg(Color::DarkGray)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, right_style),
    ]);
    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Rgb(6, 6, 12))),
        area,
    );
}

// ── Stats bar ─────────────────────────────────────────────────────────────────

fn draw_stats_bar(f: &mut Frame, s: &Stats, zoom: u32, area: Rect) {
    let label = Style::default().fg(Color::Rgb(60, 55, 100));
    let value = Style::default().fg(Color::Rgb(120, 110, 180));
    let pair = |v: usize, t: usize| format!("{v}/{t}");

    let line = Line::from(vec![
        Span::styled("  nodes ", label),
        Span::styled(pair(s.visible_nodes, s.total_nodes), value),
        Span::styled("  leaves ", label),
        Span::styled(pair(s.visible_leaves, s.total_leaves), value),
        Span::styled("  forks ", label),
        Span::styled(s.forks.to_string(), value),
        Span::styled("  depth ", label),
        Span::styled(pair(s.visible_depth, s.total_depth), value),
        Span::styled("  zoom ", label),
        Span::styled(format!("{zoom}%"), Style::default().fg(Color::Rgb(80, 80, 120))),
    ]);

    f.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Rgb(7, 7, 14))),
        area,
    );
}
