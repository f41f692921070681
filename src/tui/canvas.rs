/// Main scene: braille link curves underneath, message cards on top.
///
/// Cards are rendered into a scratch buffer of their full size and then copied
/// cell by cell, so a card hanging off the canvas edge is clipped rather than
/// squashed.
use std::time::Instant;

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Paragraph, Widget, Wrap,
        canvas::{Canvas, Line as Segment},
    },
};

use crate::app::App;
use crate::layout::Point;
use crate::scene::{Card, sample_curve};
use crate::ui::{speaker_bg, speaker_color, speaker_glyph, truncate_to_width};

const CANVAS_BG: Color = Color::Rgb(8, 8, 14);
const LINK_COLOR: Color = Color::Rgb(70, 70, 105);
const LINK_EXIT_COLOR: Color = Color::Rgb(35, 35, 50);
const SELECTED_COLOR: Color = Color::Rgb(250, 210, 90);
const CURVE_STEPS: usize = 16;

/// Below this many cells a card collapses to its speaker glyph.
const MIN_CARD_COLS: i32 = 8;
const MIN_CARD_ROWS: i32 = 3;

/// A card's footprint in cells, relative to the canvas origin. May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellBox {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

pub fn draw_canvas(f: &mut Frame, app: &App, area: Rect, now: Instant) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    draw_links(f, app, area, now);

    let t = app.viewport().transform(now);
    let cell = (app.config().terminal.cell_width, app.config().terminal.cell_height);
    let selected = app.panel().selected();
    let scene = app.scene();
    let buf = f.buffer_mut();

    // exiting cards first so present ones stay on top
    let exiting = scene.nodes().iter().filter(|n| n.is_exiting());
    let present = scene.nodes().iter().filter(|n| !n.is_exiting());
    for node in exiting.chain(present) {
        let r = scene.card_rect(node.position(now));
        let top_left = t.apply(Point::new(r.x, r.y));
        let b = CellBox {
            x: (top_left.x / cell.0).floor() as i32,
            y: (top_left.y / cell.1).floor() as i32,
            w: (r.width * t.k / cell.0).round() as i32,
            h: (r.height * t.k / cell.1).round() as i32,
        };
        draw_card(buf, area, b, &node.card, selected == Some(node.id), node.is_exiting());
    }
}

// ── Links ─────────────────────────────────────────────────────────────────────

fn draw_links(f: &mut Frame, app: &App, area: Rect, now: Instant) {
    let t = app.viewport().transform(now);
    let width = area.width as f64 * app.config().terminal.cell_width;
    let height = area.height as f64 * app.config().terminal.cell_height;
    let scene = app.scene();

    let curves: Vec<(Vec<Point>, Color)> = scene
        .links()
        .iter()
        .map(|link| {
            let ctrl = scene.link_curve(link, now);
            let points = sample_curve(&ctrl, CURVE_STEPS).into_iter().map(|p| t.apply(p)).collect();
            let color = if link.is_exiting() { LINK_EXIT_COLOR } else { LINK_COLOR };
            (points, color)
        })
        .collect();

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .background_color(CANVAS_BG)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for (points, color) in &curves {
                for pair in points.windows(2) {
                    // canvas y grows upwards
                    ctx.draw(&Segment::new(
                        pair[0].x,
                        height - pair[0].y,
                        pair[1].x,
                        height - pair[1].y,
                        *color,
                    ));
                }
            }
        });
    f.render_widget(canvas, area);
}

// ── Cards ─────────────────────────────────────────────────────────────────────

fn draw_card(buf: &mut Buffer, area: Rect, b: CellBox, card: &Card, selected: bool, exiting: bool) {
    let (cols, rows) = (area.width as i32, area.height as i32);
    if b.x + b.w <= 0 || b.y + b.h <= 0 || b.x >= cols || b.y >= rows {
        return;
    }

    if b.w < MIN_CARD_COLS || b.h < MIN_CARD_ROWS {
        let (cx, cy) = (b.x + b.w / 2, b.y + b.h / 2);
        if (0..cols).contains(&cx) && (0..rows).contains(&cy) {
            let color = if selected {
                SELECTED_COLOR
            } else if exiting {
                LINK_COLOR
            } else {
                speaker_color(card.speaker)
            };
            if let Some(c) = buf.cell_mut((area.x + cx as u16, area.y + cy as u16)) {
                c.set_symbol(speaker_glyph(card.speaker));
                c.set_style(Style::default().fg(color).add_modifier(Modifier::BOLD));
            }
        }
        return;
    }

    let w = b.w.min(u16::MAX as i32) as u16;
    let h = b.h.min(u16::MAX as i32) as u16;
    let mut scratch = Buffer::empty(Rect::new(0, 0, w, h));
    render_card(card, selected, exiting, scratch.area, &mut scratch);
    blit(&scratch, buf, (area.x as i32 + b.x, area.y as i32 + b.y), area);
}

fn render_card(card: &Card, selected: bool, exiting: bool, area: Rect, buf: &mut Buffer) {
    let color = if exiting { LINK_COLOR } else { speaker_color(card.speaker) };
    let (border_type, border_style) = if selected {
        (BorderType::Thick, Style::default().fg(SELECTED_COLOR).add_modifier(Modifier::BOLD))
    } else {
        (BorderType::Rounded, Style::default().fg(color))
    };
    let inner_w = area.width.saturating_sub(2) as usize;
    let badge = card.speaker.badge();

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .style(Style::default().bg(speaker_bg(card.speaker)))
        .title(Line::from(Span::styled(
            format!(" {badge} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

    let room = inner_w.saturating_sub(badge.len() + 4);
    if !card.timestamp.is_empty() && room > 4 {
        let ts = truncate_to_width(&card.timestamp, room);
        block = block.title(
            Line::from(Span::styled(format!(" {ts} "), Style::default().fg(Color::DarkGray))).right_aligned(),
        );
    }
    let marker = card.toggle.marker();
    if !marker.is_empty() {
        block = block.title_bottom(
            Line::from(Span::styled(marker, Style::default().fg(color).add_modifier(Modifier::BOLD)))
                .right_aligned(),
        );
    }

    let text_fg = if exiting { Color::DarkGray } else { Color::Rgb(215, 215, 225) };
    Paragraph::new(card.text.as_str())
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(text_fg))
        .block(block)
        .render(area, buf);
}

/// Copy `src` to `dst` with its origin at `at`, dropping cells outside `clip`.
fn blit(src: &Buffer, dst: &mut Buffer, at: (i32, i32), clip: Rect) {
    for sy in 0..src.area.height {
        for sx in 0..src.area.width {
            let (x, y) = (at.0 + sx as i32, at.1 + sy as i32);
            if x < clip.x as i32 || y < clip.y as i32 || x >= clip.right() as i32 || y >= clip.bottom() as i32 {
                continue;
            }
            if let (Some(cell), Some(target)) = (src.cell((sx, sy)), dst.cell_mut((x as u16, y as u16))) {
                *target = cell.clone();
            }
        }
    }
}
