/// Minimap strip: tree overview plus the viewbox of the main canvas.
use std::time::Instant;

use ratatui::{
    Frame,
    layout::Rect,
    style::Color,
    symbols::Marker,
    widgets::canvas::{Canvas, Line as Segment, Points, Rectangle},
};

use crate::app::App;
use crate::conversation::Speaker;
use crate::ui::speaker_color;

const STRIP_BG: Color = Color::Rgb(5, 5, 10);
const LINE_COLOR: Color = Color::Rgb(45, 45, 70);
const VIEWBOX_COLOR: Color = Color::Rgb(250, 210, 90);

pub fn draw_minimap(f: &mut Frame, app: &App, area: Rect, now: Instant) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let minimap = app.minimap();
    // the strip's pixel box, as the terminal grid sees it
    let width = area.width as f64 * app.config().terminal.cell_width;
    let height = area.height as f64 * app.config().terminal.cell_height;
    let flip = |y: f64| height - y;

    let users: Vec<(f64, f64)> = dots_of(app, Speaker::User, flip);
    let assistants: Vec<(f64, f64)> = dots_of(app, Speaker::Assistant, flip);
    let viewbox = minimap.viewbox(app.viewport(), now);

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .background_color(STRIP_BG)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for (a, b) in minimap.lines() {
                ctx.draw(&Segment::new(a.x, flip(a.y), b.x, flip(b.y), LINE_COLOR));
            }
            ctx.layer();
            ctx.draw(&Points { coords: &users, color: speaker_color(Speaker::User) });
            ctx.draw(&Points { coords: &assistants, color: speaker_color(Speaker::Assistant) });
            ctx.layer();
            ctx.draw(&Rectangle {
                x: viewbox.x,
                y: flip(viewbox.bottom()),
                width: viewbox.width,
                height: viewbox.height,
                color: VIEWBOX_COLOR,
            });
        });
    f.render_widget(canvas, area);
}

fn dots_of(app: &App, speaker: Speaker, flip: impl Fn(f64) -> f64) -> Vec<(f64, f64)> {
    app.minimap()
        .dots()
        .iter()
        .filter(|d| d.speaker == speaker)
        .map(|d| (d.at.x, flip(d.at.y)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::conversation;
    use ratatui::{Terminal, backend::TestBackend};

    #[test]
    fn test_strip_draws_something() {
        let now = Instant::now();
        let app = App::new(ResolvedConfig::default(), &conversation::sample(), "Sample", 960.0, 480.0, now);
        let mut terminal = Terminal::new(TestBackend::new(120, 10)).unwrap();
        terminal.draw(|f| draw_minimap(f, &app, f.area(), now)).unwrap();
        let buf = terminal.backend().buffer();
        let painted = buf
            .content()
            .iter()
            .filter(|c| c.symbol().chars().any(|ch| ('\u{2801}'..='\u{28ff}').contains(&ch)))
            .count();
        assert!(painted > 0);
        let user = buf.content().iter().any(|c| c.fg == speaker_color(Speaker::User));
        assert!(user);
    }

    #[test]
    fn test_zero_area_is_noop() {
        let now = Instant::now();
        let app = App::new(ResolvedConfig::default(), &conversation::sample(), "Sample", 960.0, 480.0, now);
        let mut terminal = Terminal::new(TestBackend::new(10, 4)).unwrap();
        terminal.draw(|f| draw_minimap(f, &app, Rect::new(0, 0, 0, 0), now)).unwrap();
    }
}
