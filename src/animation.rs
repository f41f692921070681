//! Time-based tweens and deferred actions.
//!
//! Nothing here owns a clock: every call takes `now`, so the event loop drives
//! frames and tests step time by hand.
use std::time::{Duration, Instant};

use crate::config::AnimationConfig;
use crate::layout::Point;

// ── Interpolation ─────────────────────────────────────────────────────────────

pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(self, to: Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Point {
    fn lerp(self, to: Self, t: f64) -> Self {
        Point::new(self.x.lerp(to.x, t), self.y.lerp(to.y, t))
    }
}

/// Cubic in-out: slow start, fast middle, slow finish.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

// ── Tween ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T> {
    from: T,
    to: T,
    start: Instant,
    duration: Duration,
}

impl<T: Lerp> Tween<T> {
    pub fn new(from: T, to: T, start: Instant, duration: Duration) -> Self {
        Self { from, to, start, duration }
    }

    /// Already at rest on `value`.
    pub fn still(value: T, now: Instant) -> Self {
        Self::new(value, value, now, Duration::ZERO)
    }

    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn sample(&self, now: Instant) -> T {
        let p = self.progress(now);
        if p >= 1.0 {
            return self.to;
        }
        self.from.lerp(self.to, ease_cubic_in_out(p))
    }

    pub fn is_done(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    pub fn target(&self) -> T {
        self.to
    }

    /// Continue from wherever the tween is right now toward a new target.
    pub fn retarget(&mut self, to: T, now: Instant, duration: Duration) {
        self.from = self.sample(now);
        self.to = to;
        self.start = now;
        self.duration = duration;
    }
}

// ── Durations ─────────────────────────────────────────────────────────────────

impl AnimationConfig {
    pub fn enter(&self) -> Duration {
        Duration::from_millis(self.enter_ms)
    }

    pub fn exit(&self) -> Duration {
        Duration::from_millis(self.exit_ms)
    }

    pub fn fit(&self) -> Duration {
        Duration::from_millis(self.fit_ms)
    }

    pub fn recentre(&self) -> Duration {
        Duration::from_millis(self.recentre_ms)
    }

    pub fn brush(&self) -> Duration {
        Duration::from_millis(self.brush_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}

// ── Deferred actions ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deferred {
    FitToView { padding: f64 },
}

/// Holds actions that must wait until every transition has finished.
#[derive(Debug, Default)]
pub struct Animator {
    pending: Vec<Deferred>,
}

impl Animator {
    /// Queue an action. A newer request of the same kind replaces the older one.
    pub fn defer(&mut self, action: Deferred) {
        self.pending
            .retain(|p| std::mem::discriminant(p) != std::mem::discriminant(&action));
        self.pending.push(action);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Hand back queued actions once the caller reports everything at rest.
    pub fn take_ready(&mut self, settled: bool) -> Vec<Deferred> {
        if settled {
            std::mem::take(&mut self.pending)
        } else {
            Vec::new()
        }
    }
}
