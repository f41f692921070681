//! Pan/zoom transform of the main canvas.
//!
//! Screen coordinates are pixels inside the canvas area; scene coordinates are
//! the layout's. `screen = scene * k + (x, y)`.
use std::time::{Duration, Instant};

use crate::animation::{Lerp, Tween};
use crate::config::ViewportConfig;
use crate::layout::{Point, Rect};

// ── Transform ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, k: 1.0 };

    pub fn new(x: f64, y: f64, k: f64) -> Self {
        Self { x, y, k }
    }

    /// Scene → screen.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    /// Screen → scene.
    pub fn invert(&self, p: Point) -> Point {
        Point::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Transform that shows `center` (scene) in the middle of a `width`×`height`
    /// screen at scale `k`.
    pub fn centered(center: Point, k: f64, width: f64, height: f64) -> Self {
        Self::new(width / 2.0 - k * center.x, height / 2.0 - k * center.y, k)
    }
}

impl Lerp for Transform {
    fn lerp(self, to: Self, t: f64) -> Self {
        Transform::new(self.x.lerp(to.x, t), self.y.lerp(to.y, t), self.k.lerp(to.k, t))
    }
}

// ── Bounds ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
    /// Fit never zooms in past this, even when the content is tiny.
    pub fit_max: f64,
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self::from(&ViewportConfig::default())
    }
}

impl From<&ViewportConfig> for ScaleBounds {
    fn from(c: &ViewportConfig) -> Self {
        Self {
            min: c.min_scale,
            max: c.max_scale,
            fit_max: c.fit_max_scale.min(c.max_scale),
        }
    }
}

impl ScaleBounds {
    pub fn clamp(&self, k: f64) -> f64 {
        if !k.is_finite() {
            return self.min;
        }
        k.clamp(self.min, self.max)
    }

    pub fn clamp_fit(&self, k: f64) -> f64 {
        if !k.is_finite() {
            return self.min;
        }
        k.clamp(self.min, self.fit_max)
    }
}

// ── Viewport ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub bounds: ScaleBounds,
    /// Where the view is or is heading to.
    target: Transform,
    tween: Option<Tween<Transform>>,
}

impl Viewport {
    pub fn new(width: f64, height: f64, bounds: ScaleBounds) -> Self {
        Self {
            width,
            height,
            bounds,
            target: Transform::IDENTITY,
            tween: None,
        }
    }

    /// Transform on screen at `now`.
    pub fn transform(&self, now: Instant) -> Transform {
        match &self.tween {
            Some(tween) => tween.sample(now),
            None => self.target,
        }
    }

    /// Final transform once any running transition ends.
    pub fn target(&self) -> Transform {
        self.target
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.tween.as_ref().is_none_or(|t| t.is_done(now))
    }

    /// Drop a finished transition.
    pub fn tick(&mut self, now: Instant) {
        if self.tween.as_ref().is_some_and(|t| t.is_done(now)) {
            self.tween = None;
        }
    }

    /// Jump straight to `t`, cancelling any transition.
    pub fn set(&mut self, t: Transform) {
        self.tween = None;
        self.target = Transform { k: self.bounds.clamp(t.k), ..t };
    }

    /// Glide from the current on-screen transform to `t`.
    pub fn animate_to(&mut self, t: Transform, now: Instant, duration: Duration) {
        let from = self.transform(now);
        self.target = Transform { k: self.bounds.clamp(t.k), ..t };
        self.tween = if duration.is_zero() {
            None
        } else {
            Some(Tween::new(from, self.target, now, duration))
        };
    }

    /// Scale `extents` (scene) to fit inside the viewport minus `padding` and
    /// centre them.
    pub fn fit_transform(&self, extents: Rect, padding: f64) -> Transform {
        let avail_w = (self.width - padding * 2.0).max(1.0);
        let avail_h = (self.height - padding * 2.0).max(1.0);
        let k = (avail_w / extents.width.max(1.0)).min(avail_h / extents.height.max(1.0));
        let k = self.bounds.clamp_fit(k);
        Transform::centered(extents.center(), k, self.width, self.height)
    }

    pub fn fit_to_view(&mut self, extents: Rect, padding: f64, now: Instant, duration: Duration) {
        let t = self.fit_transform(extents, padding);
        tracing::debug!(k = t.k, x = t.x, y = t.y, "fit to view");
        self.animate_to(t, now, duration);
    }

    /// Move by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64, now: Instant) {
        let t = self.transform(now);
        self.set(Transform::new(t.x + dx, t.y + dy, t.k));
    }

    /// Multiply the scale by `factor` keeping the scene point under `at` fixed.
    pub fn zoom_at(&mut self, at: Point, factor: f64, now: Instant) {
        let t = self.transform(now);
        let k = self.bounds.clamp(t.k * factor);
        let anchor = t.invert(at);
        self.set(Transform::new(at.x - anchor.x * k, at.y - anchor.y * k, k));
    }

    /// Bring `p` (scene) to the centre, keeping the scale.
    pub fn center_on(&mut self, p: Point, now: Instant, duration: Duration) {
        let k = self.target.k;
        let t = Transform::centered(p, k, self.width, self.height);
        self.animate_to(t, now, duration);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Hierarchy;
    use crate::hierarchy::tests::arb_tree;
    use crate::layout::LayoutEngine;
    use crate::scene::node_point;
    use proptest::prelude::*;

    fn vp() -> Viewport {
        Viewport::new(1000.0, 600.0, ScaleBounds::default())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_apply_invert_round_trip() {
        let t = Transform::new(12.0, -7.0, 1.5);
        let p = Point::new(33.0, 44.0);
        let back = t.invert(t.apply(p));
        assert!(close(back.x, p.x) && close(back.y, p.y));
    }

    #[test]
    fn test_fit_centres_content() {
        let v = vp();
        let extents = Rect::new(0.0, 0.0, 880.0, 240.0);
        let t = v.fit_transform(extents, 60.0);
        assert!(close(t.k, 1.0));
        let c = t.apply(extents.center());
        assert!(close(c.x, 500.0) && close(c.y, 300.0));
    }

    #[test]
    fn test_fit_scale_clamped() {
        let v = vp();
        let tiny = v.fit_transform(Rect::new(0.0, 0.0, 10.0, 10.0), 60.0);
        assert_eq!(tiny.k, 2.0);
        let huge = v.fit_transform(Rect::new(0.0, 0.0, 1e6, 1e6), 60.0);
        assert_eq!(huge.k, 0.3);
        let degenerate = v.fit_transform(Rect::new(0.0, 0.0, 0.0, 0.0), 60.0);
        assert!(degenerate.k.is_finite());
    }

    #[test]
    fn test_fit_animates_then_settles() {
        let mut v = vp();
        let t0 = Instant::now();
        v.fit_to_view(Rect::new(0.0, 0.0, 880.0, 240.0), 60.0, t0, Duration::from_millis(400));
        assert!(!v.is_settled(t0));
        assert_eq!(v.transform(t0), Transform::IDENTITY);
        let end = t0 + Duration::from_millis(400);
        assert!(v.is_settled(end));
        assert_eq!(v.transform(end), v.target());
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut v = vp();
        let now = Instant::now();
        v.set(Transform::new(100.0, 50.0, 1.0));
        let at = Point::new(400.0, 300.0);
        let before = v.transform(now).invert(at);
        v.zoom_at(at, 1.5, now);
        let after = v.transform(now).invert(at);
        assert!(close(before.x, after.x) && close(before.y, after.y));
        assert_eq!(v.transform(now).k, 1.5);
    }

    #[test]
    fn test_zoom_clamped_to_bounds() {
        let mut v = vp();
        let now = Instant::now();
        for _ in 0..20 {
            v.zoom_at(Point::new(0.0, 0.0), 2.0, now);
        }
        assert_eq!(v.transform(now).k, 2.5);
        for _ in 0..40 {
            v.zoom_at(Point::new(0.0, 0.0), 0.5, now);
        }
        assert_eq!(v.transform(now).k, 0.3);
    }

    #[test]
    fn test_pan_cancels_tween() {
        let mut v = vp();
        let t0 = Instant::now();
        v.animate_to(Transform::new(200.0, 0.0, 1.0), t0, Duration::from_millis(100));
        v.pan(10.0, 5.0, t0);
        assert!(v.is_settled(t0));
        assert_eq!(v.transform(t0), Transform::new(10.0, 5.0, 1.0));
    }

    #[test]
    fn test_center_on_keeps_scale() {
        let mut v = vp();
        let now = Instant::now();
        v.set(Transform::new(0.0, 0.0, 0.5));
        v.center_on(Point::new(100.0, 100.0), now, Duration::ZERO);
        let t = v.transform(now);
        assert_eq!(t.k, 0.5);
        let c = t.apply(Point::new(100.0, 100.0));
        assert!(close(c.x, 500.0) && close(c.y, 300.0));
    }

    proptest! {
        #[test]
        fn prop_fit_keeps_every_card_on_screen(
            tree in arb_tree(),
            width in 200.0f64..2000.0,
            height in 200.0f64..1200.0,
            padding in 0.0f64..60.0,
        ) {
            let mut h = Hierarchy::build(&tree);
            let engine = LayoutEngine::default();
            let result = engine.layout(&mut h);
            let extents = engine.extents(&h, &result.nodes);
            let bounds = ScaleBounds { min: 1e-4, max: 100.0, fit_max: 100.0 };
            let t = Viewport::new(width, height, bounds).fit_transform(extents, padding);
            prop_assume!(t.k > bounds.min && t.k < bounds.fit_max);

            let (half_w, half_h) = (engine.config().node_width / 2.0, engine.config().node_height / 2.0);
            for id in &result.nodes {
                let c = node_point(h.get(*id).unwrap());
                let top_left = t.apply(Point::new(c.x - half_w, c.y - half_h));
                let bottom_right = t.apply(Point::new(c.x + half_w, c.y + half_h));
                prop_assert!(top_left.x >= padding - 1e-6 && top_left.y >= padding - 1e-6);
                prop_assert!(bottom_right.x <= width - padding + 1e-6);
                prop_assert!(bottom_right.y <= height - padding + 1e-6);
            }
        }
    }
}
