/// Speaker styling and width-aware text helpers shared by the TUI and `--dump`.
use ratatui::style::Color;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::conversation::Speaker;

// ── Speaker glyphs / colours ──────────────────────────────────────────────────

pub fn speaker_glyph(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "●",
        Speaker::Assistant => "◆",
    }
}

/// Border and badge colour.
pub fn speaker_color(speaker: Speaker) -> Color {
    match speaker {
        Speaker::User => Color::Rgb(90, 170, 255),
        Speaker::Assistant => Color::Rgb(120, 210, 140),
    }
}

/// Card fill behind the text.
pub fn speaker_bg(speaker: Speaker) -> Color {
    match speaker {
        Speaker::User => Color::Rgb(14, 22, 36),
        Speaker::Assistant => Color::Rgb(14, 28, 20),
    }
}

// ── Text fitting ──────────────────────────────────────────────────────────────

/// Cut `s` to at most `max` terminal columns, ending in `…` when shortened.
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Spaces needed to right-align `right` after `left` inside `total` columns.
pub fn gap_between(left: &str, right: &str, total: usize) -> usize {
    total.saturating_sub(left.width() + right.width())
}
