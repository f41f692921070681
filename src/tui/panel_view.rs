/// Side panel: full text of the selected turn plus its forks and siblings.
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::hierarchy::NodeId;
use crate::panel::{PanelItem, PanelView};
use crate::ui::{gap_between, speaker_color, speaker_glyph, truncate_to_width};

const PANEL_BG: Color = Color::Rgb(6, 6, 12);
const DIM: Color = Color::Rgb(60, 57, 90);

/// Panel regions: header, message text, forks/siblings list, nav hint.
fn sections(view: &PanelView, area: Rect) -> Option<(Rect, [Rect; 4])> {
    if area.width < 4 || area.height < 4 {
        return None;
    }
    let inner = panel_block().inner(area);
    let rows = list_entries(view).len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header + rule
            Constraint::Min(1),    // message text
            Constraint::Length(rows.min(inner.height / 2)), // forks / siblings
            Constraint::Length(1), // nav hint
        ])
        .split(inner);
    Some((inner, [chunks[0], chunks[1], chunks[2], chunks[3]]))
}

fn panel_block() -> Block<'static> {
    Block::default()
        .borders(Borders::LEFT)
        .border_style(Style::default().fg(Color::Rgb(40, 38, 60)))
        .style(Style::default().bg(PANEL_BG))
}

pub fn draw_panel(f: &mut Frame, view: &PanelView, area: Rect) {
    let Some((inner, [head, text, list, hint])) = sections(view, area) else {
        return;
    };
    f.render_widget(Clear, area);
    f.render_widget(panel_block(), area);

    let w = inner.width as usize;
    let rows: Vec<ListItem<'static>> = list_entries(view).into_iter().map(|e| e.row(w)).collect();

    f.render_widget(Paragraph::new(header(view, w)), head);
    f.render_widget(
        Paragraph::new(view.text.as_str())
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(Color::Rgb(215, 215, 225))),
        text,
    );
    f.render_widget(List::new(rows), list);
    f.render_widget(Paragraph::new(nav_hint(view)), hint);
}

/// Fork or sibling drawn at terminal cell (`col`, `row`) of a panel at `area`.
pub fn item_at(view: &PanelView, area: Rect, col: u16, row: u16) -> Option<NodeId> {
    let (_, [_, _, list, _]) = sections(view, area)?;
    if col < list.x || col >= list.right() || row < list.y || row >= list.bottom() {
        return None;
    }
    match list_entries(view).into_iter().nth((row - list.y) as usize)? {
        Entry::Item(item) => Some(item.id),
        _ => None,
    }
}

fn header(view: &PanelView, w: usize) -> Vec<Line<'static>> {
    let color = speaker_color(view.speaker);
    let left = format!(" {} {}", speaker_glyph(view.speaker), view.speaker.badge());
    let ts = truncate_to_width(&view.timestamp, w.saturating_sub(left.len() + 2));
    let right = format!("{ts} ");
    let gap = gap_between(&left, &right, w);
    vec![
        Line::from(vec![
            Span::styled(left, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::raw(" ".repeat(gap)),
            Span::styled(right, Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(Span::styled("─".repeat(w), Style::default().fg(Color::Rgb(35, 33, 55)))),
    ]
}

/// One row of the forks/siblings list.
enum Entry<'a> {
    Section(String),
    Item(&'a PanelItem),
    Divider,
}

impl Entry<'_> {
    fn row(&self, w: usize) -> ListItem<'static> {
        match self {
            Entry::Section(title) => section_header(title),
            Entry::Item(item) => item_row(item, w),
            Entry::Divider => divider(),
        }
    }
}

fn list_entries(view: &PanelView) -> Vec<Entry<'_>> {
    let mut entries = Vec::new();
    if !view.forks.is_empty() {
        entries.push(Entry::Section(format!("Forks ({})", view.forks.len())));
        entries.extend(view.forks.iter().map(Entry::Item));
    }
    if !view.siblings.is_empty() {
        if !entries.is_empty() {
            entries.push(Entry::Divider);
        }
        entries.push(Entry::Section(format!("Siblings ({})", view.siblings.len())));
        entries.extend(view.siblings.iter().map(Entry::Item));
    }
    entries
}

fn item_row(item: &PanelItem, w: usize) -> ListItem<'static> {
    let glyph = format!("  {} ", speaker_glyph(item.speaker));
    let preview = truncate_to_width(&item.preview, w.saturating_sub(5));
    ListItem::new(Line::from(vec![
        Span::styled(glyph, Style::default().fg(speaker_color(item.speaker))),
        Span::styled(preview, Style::default().fg(Color::Rgb(150, 145, 190))),
    ]))
}

fn section_header(title: &str) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(title.to_string(), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    ]))
}

fn divider() -> ListItem<'static> {
    ListItem::new(Line::raw(""))
}

/// Arrow keys, lit only when the move exists.
fn nav_hint(view: &PanelView) -> Line<'static> {
    let key = |label: &'static str, on: bool| {
        let fg = if on { Color::Cyan } else { DIM };
        Span::styled(label, Style::default().fg(fg))
    };
    Line::from(vec![
        Span::raw(" "),
        key("← parent", view.has_parent),
        Span::raw("  "),
        key("→ child", view.has_first_child),
        Span::raw("  "),
        key("↑ prev", view.has_prev),
        Span::raw("  "),
        key("↓ next", view.has_next),
        Span::styled("  esc", Style::default().fg(DIM)),
    ])
}
