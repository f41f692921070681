/// Popup overlays: open-file prompt, conversation picker, key help.
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use super::TuiState;
use crate::ui::truncate_to_width;

const ACCENT: Color = Color::Rgb(160, 140, 255);

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

fn popup_block(title: &str, border: Color) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

/// Hint row pinned to the last line of `inner`; returns the rows above it.
fn split_hint(f: &mut Frame, inner: Rect, hint: Line<'static>) -> Rect {
    let hint_area = Rect {
        y: inner.y + inner.height.saturating_sub(1),
        height: 1.min(inner.height),
        ..inner
    };
    f.render_widget(Paragraph::new(hint), hint_area);
    Rect {
        height: inner.height.saturating_sub(1),
        ..inner
    }
}

// ── Open-file prompt ──────────────────────────────────────────────────────────

pub fn draw_open_prompt(f: &mut Frame, input: &str, area: Rect) {
    let popup_area = centered(area, 70, 5);
    if popup_area.width < 3 || popup_area.height < 3 {
        return;
    }
    f.render_widget(Clear, popup_area);
    let block = popup_block("Open export", Color::Cyan);
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let body = split_hint(
        f,
        inner,
        Line::from(vec![
            Span::styled("  Enter", Style::default().fg(Color::Cyan)),
            Span::styled(" open  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc", Style::default().fg(Color::Cyan)),
            Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
        ]),
    );

    // keep the tail of long paths in view
    let room = (body.width as usize).saturating_sub(4);
    let shown: String = {
        let chars: Vec<char> = input.chars().collect();
        let skip = chars.len().saturating_sub(room);
        chars[skip..].iter().collect()
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(" › ", Style::default().fg(Color::Cyan)),
            Span::styled(shown, Style::default().fg(Color::White)),
            Span::styled("█", Style::default().fg(Color::Cyan)),
        ])),
        body,
    );
}

// ── Conversation picker ───────────────────────────────────────────────────────

pub fn draw_picker(f: &mut Frame, state: &TuiState, area: Rect) {
    let popup_area = centered(area, 72, 20);
    if popup_area.width < 3 || popup_area.height < 3 {
        return;
    }
    f.render_widget(Clear, popup_area);
    let block = popup_block(&format!("Conversations ({})", state.conversations.len()), ACCENT);
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let list_area = split_hint(
        f,
        inner,
        Line::from(vec![
            Span::styled("  ↑↓ navigate  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Enter", Style::default().fg(ACCENT)),
            Span::styled(" open  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Esc", Style::default().fg(ACCENT)),
            Span::styled(" close", Style::default().fg(Color::DarkGray)),
        ]),
    );

    let w = list_area.width as usize;
    let items: Vec<ListItem<'static>> = state
        .conversations
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let selected = i == state.picker_selected;
            let bg = if selected { Color::Rgb(40, 35, 70) } else { Color::Reset };
            let bullet = if i == state.current { "●" } else { "○" };
            let meta = format!("  {}m", c.tree.count());
            let created = if c.created.is_empty() { String::new() } else { format!("  {}", c.created) };
            let title = truncate_to_width(&c.title, w.saturating_sub(4 + meta.len() + created.len()));
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {bullet} "), Style::default().fg(ACCENT).bg(bg)),
                Span::styled(
                    title,
                    Style::default().fg(Color::White).bg(bg).add_modifier(if selected {
                        Modifier::BOLD
                    } else {
                        Modifier::empty()
                    }),
                ),
                Span::styled(created, Style::default().fg(Color::DarkGray).bg(bg)),
                Span::styled(meta, Style::default().fg(Color::Rgb(110, 90, 200)).bg(bg)),
            ]))
        })
        .collect();

    // Scroll to keep selected in view
    let visible = list_area.height as usize;
    let skip = if state.picker_selected >= visible {
        state.picker_selected - visible + 1
    } else {
        0
    };
    let sliced: Vec<ListItem<'static>> = items.into_iter().skip(skip).collect();
    f.render_widget(List::new(sliced), list_area);
}

// ── Help ──────────────────────────────────────────────────────────────────────

const HELP: &[(&str, &str)] = &[
    ("f", "fit tree to view"),
    ("e / c", "expand all / collapse all"),
    ("space, t", "toggle selected node"),
    ("+ / -", "zoom in / out"),
    ("h j k l", "pan"),
    ("← → ↑ ↓", "parent / child / prev / next (pan when nothing selected)"),
    ("Enter", "select the root"),
    ("Esc", "close side panel"),
    ("o", "open an export file"),
    ("p", "pick a conversation"),
    ("mouse", "drag pans, wheel zooms, click selects or toggles"),
    ("minimap", "drag moves view, wheel resizes it, click jumps"),
    ("panel", "click a fork or sibling to jump to it"),
    ("q, Ctrl+C", "quit"),
];

pub fn draw_help(f: &mut Frame, area: Rect) {
    let popup_area = centered(area, 74, HELP.len() as u16 + 3);
    if popup_area.width < 3 || popup_area.height < 3 {
        return;
    }
    f.render_widget(Clear, popup_area);
    let block = popup_block("Keys", Color::Cyan);
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let body = split_hint(
        f,
        inner,
        Line::from(Span::styled("  any key to close", Style::default().fg(Color::DarkGray))),
    );
    let items: Vec<ListItem<'static>> = HELP
        .iter()
        .map(|(k, what)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("  {k:<12}"), Style::default().fg(Color::Cyan)),
                Span::styled(what.to_string(), Style::default().fg(Color::White)),
            ]))
        })
        .collect();
    f.render_widget(List::new(items), body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::conversation::{self, ConversationNode, Speaker};
    use crate::importer::ImportedConversation;
    use ratatui::{Terminal, backend::TestBackend};
    use std::time::Instant;

    fn text_of(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_centered_fits_inside() {
        let r = centered(Rect::new(0, 0, 40, 10), 70, 20);
        assert_eq!(r.width, 36);
        assert_eq!(r.height, 8);
        assert_eq!(r.x, 2);
    }

    #[test]
    fn test_open_prompt_shows_tail_of_input() {
        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        let long = format!("{}/conversations.json", "a".repeat(80));
        terminal.draw(|f| draw_open_prompt(f, &long, f.area())).unwrap();
        let text = text_of(&terminal);
        assert!(text.contains("Open export"));
        assert!(text.contains("conversations.json"));
    }

    #[test]
    fn test_picker_lists_titles() {
        let convs = vec![
            ImportedConversation {
                title: "Tokyo".into(),
                id: "a".into(),
                created: String::new(),
                tree: conversation::sample(),
            },
            ImportedConversation {
                title: "Groceries".into(),
                id: "b".into(),
                created: "2025-01-02 03:04:05Z".into(),
                tree: ConversationNode::new(Speaker::User, "milk", ""),
            },
        ];
        let state = TuiState::new(ResolvedConfig::default(), convs, None, Rect::new(0, 0, 100, 40), Instant::now());
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| draw_picker(f, &state, f.area())).unwrap();
        let text = text_of(&terminal);
        assert!(text.contains("Conversations (2)"));
        assert!(text.contains("Tokyo"));
        assert!(text.contains("Groceries"));
        assert!(text.contains("8m"));
    }

    #[test]
    fn test_help_lists_keys() {
        let mut terminal = Terminal::new(TestBackend::new(90, 30)).unwrap();
        terminal.draw(|f| draw_help(f, f.area())).unwrap();
        let text = text_of(&terminal);
        assert!(text.contains("fit tree to view"));
        assert!(text.contains("Ctrl+C"));
    }
}
