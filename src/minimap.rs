//! Overview strip: the whole visible tree at its own scale plus a rectangle
//! marking what the main viewport shows.
//!
//! Gestures on the strip are turned into a selection rectangle and projected
//! back into a main-viewport transform.
use std::time::Instant;

use crate::config::MinimapConfig;
use crate::conversation::Speaker;
use crate::hierarchy::{Hierarchy, NodeId};
use crate::layout::{LayoutResult, Point, Rect};
use crate::scene::node_point;
use crate::viewport::{Transform, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiniDot {
    pub id: NodeId,
    pub speaker: Speaker,
    pub at: Point,
}

#[derive(Debug, Clone)]
pub struct Minimap {
    config: MinimapConfig,
    width: f64,
    k: f64,
    tx: f64,
    ty: f64,
    dots: Vec<MiniDot>,
    lines: Vec<(Point, Point)>,
}

impl Minimap {
    pub fn new(config: MinimapConfig, width: f64) -> Self {
        Self {
            config,
            width: width.max(1.0),
            k: 1.0,
            tx: 0.0,
            ty: 0.0,
            dots: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.config.height
    }

    pub fn scale(&self) -> f64 {
        self.k
    }

    pub fn dots(&self) -> &[MiniDot] {
        &self.dots
    }

    /// Straight parent→child segments in minimap coordinates.
    pub fn lines(&self) -> &[(Point, Point)] {
        &self.lines
    }

    /// Width follows the window; callers rebuild afterwards.
    pub fn resize(&mut self, width: f64) {
        self.width = width.max(1.0);
    }

    /// Refit the projection to `extents` and reproject dots and lines.
    pub fn rebuild(&mut self, hierarchy: &Hierarchy, layout: &LayoutResult, extents: Rect) {
        let pad = self.config.pad;
        let h = self.config.height;
        let kx = (self.width - pad * 2.0) / extents.width;
        let ky = (h - pad * 2.0) / extents.height;
        self.k = kx.min(ky).max(1e-4);
        if !self.k.is_finite() {
            self.k = 1e-4;
        }
        self.tx = pad - self.k * extents.x;
        self.ty = (h - self.k * extents.height) / 2.0 - self.k * extents.y;

        self.dots = layout
            .nodes
            .iter()
            .filter_map(|id| hierarchy.get(*id))
            .map(|n| MiniDot {
                id: n.id,
                speaker: n.data.speaker,
                at: self.to_mini(node_point(n)),
            })
            .collect();
        self.lines = layout
            .links
            .iter()
            .filter_map(|l| Some((hierarchy.get(l.source)?, hierarchy.get(l.target)?)))
            .map(|(s, t)| (self.to_mini(node_point(s)), self.to_mini(node_point(t))))
            .collect();
    }

    /// Scene → minimap.
    pub fn to_mini(&self, p: Point) -> Point {
        Point::new(self.tx + self.k * p.x, self.ty + self.k * p.y)
    }

    /// Minimap → scene.
    pub fn from_mini(&self, p: Point) -> Point {
        Point::new((p.x - self.tx) / self.k, (p.y - self.ty) / self.k)
    }

    fn viewbox_of(&self, t: Transform, viewport: &Viewport) -> Rect {
        let origin = self.to_mini(t.invert(Point::new(0.0, 0.0)));
        Rect::new(
            origin.x,
            origin.y,
            self.k * viewport.width / t.k,
            self.k * viewport.height / t.k,
        )
    }

    /// The main view's visible region in minimap coordinates.
    pub fn viewbox(&self, viewport: &Viewport, now: Instant) -> Rect {
        self.viewbox_of(viewport.transform(now), viewport)
    }

    /// Transform that makes the main view show the scene region under `selection`.
    pub fn brush(&self, selection: Rect, viewport: &Viewport) -> Transform {
        let a = self.from_mini(Point::new(selection.x, selection.y));
        let b = self.from_mini(Point::new(selection.right(), selection.bottom()));
        let sel = Rect::from_corners(a, b);
        let k = (viewport.width / sel.width.max(1.0)).min(viewport.height / sel.height.max(1.0));
        let k = viewport.bounds.clamp(k);
        Transform::centered(sel.center(), k, viewport.width, viewport.height)
    }

    /// Move the viewbox by a minimap-space delta.
    pub fn drag(&self, dx: f64, dy: f64, viewport: &Viewport) -> Transform {
        let vb = self.viewbox_of(viewport.target(), viewport);
        self.brush(Rect::new(vb.x + dx, vb.y + dy, vb.width, vb.height), viewport)
    }

    /// Grow (`factor > 1`) or shrink the viewbox about its centre.
    pub fn resize_viewbox(&self, factor: f64, viewport: &Viewport) -> Transform {
        let vb = self.viewbox_of(viewport.target(), viewport);
        let c = vb.center();
        let (w, h) = (vb.width * factor, vb.height * factor);
        self.brush(Rect::new(c.x - w / 2.0, c.y - h / 2.0, w, h), viewport)
    }

    /// Centre the viewbox on a minimap point.
    pub fn jump(&self, at: Point, viewport: &Viewport) -> Transform {
        let vb = self.viewbox_of(viewport.target(), viewport);
        self.brush(
            Rect::new(at.x - vb.width / 2.0, at.y - vb.height / 2.0, vb.width, vb.height),
            viewport,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation;
    use crate::layout::LayoutEngine;
    use crate::viewport::ScaleBounds;
    use proptest::prelude::*;

    fn built() -> (Hierarchy, LayoutResult, Minimap) {
        let mut h = Hierarchy::build(&conversation::sample());
        let engine = LayoutEngine::default();
        let result = engine.layout(&mut h);
        let extents = engine.extents(&h, &result.nodes);
        let mut m = Minimap::new(MinimapConfig::default(), 1000.0);
        m.rebuild(&h, &result, extents);
        (h, result, m)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_rebuild_fits_inside_strip() {
        let (_, result, m) = built();
        assert_eq!(m.dots().len(), result.nodes.len());
        assert_eq!(m.lines().len(), result.links.len());
        for d in m.dots() {
            assert!(d.at.x >= 0.0 && d.at.x <= m.width());
            assert!(d.at.y >= 0.0 && d.at.y <= m.height());
        }
    }

    #[test]
    fn test_content_left_aligned_and_centred() {
        let engine = LayoutEngine::default();
        let mut h = Hierarchy::build(&conversation::sample());
        let result = engine.layout(&mut h);
        let extents = engine.extents(&h, &result.nodes);
        let mut m = Minimap::new(MinimapConfig::default(), 1000.0);
        m.rebuild(&h, &result, extents);
        let tl = m.to_mini(Point::new(extents.x, extents.y));
        let br = m.to_mini(Point::new(extents.right(), extents.bottom()));
        assert!(close(tl.x, 8.0));
        assert!(close((tl.y + br.y) / 2.0, 80.0));
    }

    #[test]
    fn test_projection_round_trip() {
        let (_, _, m) = built();
        let p = Point::new(123.0, -45.0);
        let back = m.from_mini(m.to_mini(p));
        assert!(close(back.x, p.x) && close(back.y, p.y));
    }

    #[test]
    fn test_degenerate_extents_give_finite_scale() {
        let (h, result, mut m) = built();
        m.rebuild(&h, &result, Rect::new(0.0, 0.0, 0.0, 0.0));
        assert!(m.scale().is_finite() && m.scale() >= 1e-4);
    }

    #[test]
    fn test_drag_moves_view_by_scaled_delta() {
        let (_, _, m) = built();
        let mut vp = Viewport::new(800.0, 400.0, ScaleBounds::default());
        vp.set(Transform::new(100.0, 50.0, 1.0));
        let t = m.drag(10.0, 0.0, &vp);
        assert!(close(t.k, 1.0));
        assert!(close(t.x, 100.0 - 10.0 / m.scale()));
        assert!(close(t.y, 50.0));
    }

    #[test]
    fn test_resize_viewbox_zooms_out() {
        let (_, _, m) = built();
        let mut vp = Viewport::new(800.0, 400.0, ScaleBounds::default());
        vp.set(Transform::new(0.0, 0.0, 1.0));
        let t = m.resize_viewbox(1.25, &vp);
        assert!(close(t.k, 0.8));
    }

    #[test]
    fn test_jump_centres_on_point() {
        let (_, _, m) = built();
        let mut vp = Viewport::new(800.0, 400.0, ScaleBounds::default());
        vp.set(Transform::new(0.0, 0.0, 1.0));
        let target = Point::new(500.0, 80.0);
        let t = m.jump(target, &vp);
        let centre = t.invert(Point::new(400.0, 200.0));
        let scene = m.from_mini(target);
        assert!(close(centre.x, scene.x) && close(centre.y, scene.y));
    }

    proptest! {
        #[test]
        fn prop_brush_of_viewbox_round_trips(x in -2000.0f64..2000.0, y in -2000.0f64..2000.0, k in 0.3f64..2.5) {
            let (_, _, m) = built();
            let mut vp = Viewport::new(900.0, 500.0, ScaleBounds::default());
            vp.set(Transform::new(x, y, k));
            let now = Instant::now();
            let t = m.brush(m.viewbox(&vp, now), &vp);
            prop_assert!((t.k - k).abs() < 1e-6);
            prop_assert!((t.x - x).abs() < 1e-4);
            prop_assert!((t.y - y).abs() < 1e-4);
        }
    }
}
