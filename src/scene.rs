//! Keyed scene graph of cards and links with animated positions.
//!
//! Every render diffs the new layout against what is currently on screen:
//! entering items grow out of the origin node's previous position, persisting
//! items glide from wherever they are, and exiting items shrink into the origin
//! node's new position before `prune` drops them.
use std::collections::HashMap;
use std::time::Instant;

use crate::animation::Tween;
use crate::config::{AnimationConfig, LayoutConfig};
use crate::conversation::Speaker;
use crate::hierarchy::{Hierarchy, LayoutNode, NodeId};
use crate::layout::{LayoutResult, Point, Rect};

/// Toggle hot zone in the card's bottom-right corner, scene pixels.
const TOGGLE_W: f64 = 40.0;
const TOGGLE_H: f64 = 32.0;

/// Scene position of a node's centre: the depth axis runs left to right.
pub fn node_point(node: &LayoutNode) -> Point {
    Point::new(node.y, node.x)
}

fn previous_point(node: &LayoutNode) -> Point {
    Point::new(node.previous_y, node.previous_x)
}

// ── Cards ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    /// No children at all.
    Leaf,
    /// Children are hidden; activating shows them.
    Collapsed,
    /// Children are on screen; activating hides them.
    Expanded,
}

impl ToggleState {
    pub fn of(node: &LayoutNode) -> Self {
        if !node.has_children() {
            ToggleState::Leaf
        } else if node.is_collapsed() {
            ToggleState::Collapsed
        } else {
            ToggleState::Expanded
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            ToggleState::Leaf => "",
            ToggleState::Collapsed => "[+]",
            ToggleState::Expanded => "[−]",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub speaker: Speaker,
    pub timestamp: String,
    /// Full message text; drawing truncates.
    pub text: String,
    pub toggle: ToggleState,
}

impl Card {
    fn of(node: &LayoutNode) -> Self {
        Self {
            speaker: node.data.speaker,
            timestamp: node.data.timestamp.clone(),
            text: node.data.text.clone(),
            toggle: ToggleState::of(node),
        }
    }
}

// ── Scene items ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub card: Card,
    position: Tween<Point>,
    exiting: bool,
}

impl SceneNode {
    pub fn position(&self, now: Instant) -> Point {
        self.position.sample(now)
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }
}

#[derive(Debug, Clone)]
pub struct SceneLink {
    pub target: NodeId,
    from: Tween<Point>,
    to: Tween<Point>,
    exiting: bool,
}

impl SceneLink {
    /// Card centres of the two ends at `now`.
    pub fn endpoints(&self, now: Instant) -> (Point, Point) {
        (self.from.sample(now), self.to.sample(now))
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    fn is_done(&self, now: Instant) -> bool {
        self.from.is_done(now) && self.to.is_done(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneHit {
    Card(NodeId),
    Toggle(NodeId),
}

// ── Link curves ───────────────────────────────────────────────────────────────

/// Cubic Bézier from the right edge of the parent card to the left edge of the
/// child card, control points pushed out horizontally by `curvature`.
pub fn link_curve(source: Point, target: Point, node_width: f64, curvature: f64) -> [Point; 4] {
    let half = node_width / 2.0;
    [
        Point::new(source.x + half, source.y),
        Point::new(source.x + half + curvature, source.y),
        Point::new(target.x - half - curvature, target.y),
        Point::new(target.x - half, target.y),
    ]
}

/// Evaluate a cubic Bézier at `steps + 1` evenly spaced parameters.
pub fn sample_curve(ctrl: &[Point; 4], steps: usize) -> Vec<Point> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            Point::new(
                a * ctrl[0].x + b * ctrl[1].x + c * ctrl[2].x + d * ctrl[3].x,
                a * ctrl[0].y + b * ctrl[1].y + c * ctrl[2].y + d * ctrl[3].y,
            )
        })
        .collect()
}

// ── Scene ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Scene {
    layout: LayoutConfig,
    timing: AnimationConfig,
    /// Draw order: present nodes in layout order, then exiting ones.
    nodes: Vec<SceneNode>,
    links: Vec<SceneLink>,
}

impl Scene {
    pub fn new(layout: LayoutConfig, timing: AnimationConfig) -> Self {
        Self {
            layout,
            timing,
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[SceneLink] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Drop everything without transitions (a new conversation was loaded).
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }

    /// Diff the scene against a fresh layout and start the transitions.
    /// Finishes by stashing every visible node's coordinates as its previous ones.
    pub fn render(&mut self, hierarchy: &mut Hierarchy, layout: &LayoutResult, origin: NodeId, now: Instant) {
        let (origin_from, origin_to) = match hierarchy.get(origin) {
            Some(o) => (previous_point(o), node_point(o)),
            None => (Point::default(), Point::default()),
        };
        let enter = self.timing.enter();
        let exit = self.timing.exit();

        // Nodes.
        let mut old: HashMap<NodeId, SceneNode> =
            self.nodes.drain(..).map(|n| (n.id, n)).collect();
        let mut nodes = Vec::with_capacity(layout.nodes.len());
        let (mut entered, mut updated) = (0usize, 0usize);
        for &id in &layout.nodes {
            let Some(node) = hierarchy.get(id) else { continue };
            let target = node_point(node);
            let scene_node = match old.remove(&id) {
                Some(mut existing) => {
                    existing.position.retarget(target, now, enter);
                    existing.card = Card::of(node);
                    existing.exiting = false;
                    updated += 1;
                    existing
                }
                None => {
                    entered += 1;
                    SceneNode {
                        id,
                        card: Card::of(node),
                        position: Tween::new(origin_from, target, now, enter),
                        exiting: false,
                    }
                }
            };
            nodes.push(scene_node);
        }
        let exited = old.len();
        let mut leaving: Vec<SceneNode> = old.into_values().collect();
        leaving.sort_by_key(|n| n.id);
        for mut n in leaving {
            n.position.retarget(origin_to, now, exit);
            n.exiting = true;
            nodes.push(n);
        }
        self.nodes = nodes;

        // Links, keyed by their child end.
        let mut old: HashMap<NodeId, SceneLink> =
            self.links.drain(..).map(|l| (l.target, l)).collect();
        let mut links = Vec::with_capacity(layout.links.len());
        for link in &layout.links {
            let (Some(s), Some(t)) = (hierarchy.get(link.source), hierarchy.get(link.target)) else {
                continue;
            };
            let (sp, tp) = (node_point(s), node_point(t));
            let scene_link = match old.remove(&link.target) {
                Some(mut existing) => {
                    existing.from.retarget(sp, now, enter);
                    existing.to.retarget(tp, now, enter);
                    existing.exiting = false;
                    existing
                }
                None => SceneLink {
                    target: link.target,
                    from: Tween::new(origin_from, sp, now, enter),
                    to: Tween::new(origin_from, tp, now, enter),
                    exiting: false,
                },
            };
            links.push(scene_link);
        }
        let mut leaving: Vec<SceneLink> = old.into_values().collect();
        leaving.sort_by_key(|l| l.target);
        for mut l in leaving {
            l.from.retarget(origin_to, now, exit);
            l.to.retarget(origin_to, now, exit);
            l.exiting = true;
            links.push(l);
        }
        self.links = links;

        for &id in &layout.nodes {
            if let Some(node) = hierarchy.get_mut(id) {
                node.previous_x = node.x;
                node.previous_y = node.y;
            }
        }
        tracing::debug!(entered, updated, exited, "scene render");
    }

    /// Remove exiting items whose transition has finished.
    pub fn prune(&mut self, now: Instant) {
        self.nodes.retain(|n| !(n.exiting && n.position.is_done(now)));
        self.links.retain(|l| !(l.exiting && l.is_done(now)));
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.nodes.iter().all(|n| n.position.is_done(now)) && self.links.iter().all(|l| l.is_done(now))
    }

    /// Card footprint of a node in scene space.
    pub fn card_rect(&self, center: Point) -> Rect {
        let (w, h) = (self.layout.node_width, self.layout.node_height);
        Rect::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    /// Toggle hot zone of a card.
    pub fn toggle_rect(&self, center: Point) -> Rect {
        let card = self.card_rect(center);
        Rect::new(card.right() - TOGGLE_W, card.bottom() - TOGGLE_H, TOGGLE_W, TOGGLE_H)
    }

    /// Topmost present card under a scene point.
    pub fn hit_test(&self, p: Point, now: Instant) -> Option<SceneHit> {
        self.nodes.iter().rev().filter(|n| !n.exiting).find_map(|n| {
            let center = n.position(now);
            if !self.card_rect(center).contains(p) {
                return None;
            }
            if n.card.toggle != ToggleState::Leaf && self.toggle_rect(center).contains(p) {
                Some(SceneHit::Toggle(n.id))
            } else {
                Some(SceneHit::Card(n.id))
            }
        })
    }

    /// Control points of a link at `now`.
    pub fn link_curve(&self, link: &SceneLink, now: Instant) -> [Point; 4] {
        let (s, t) = link.endpoints(now);
        link_curve(s, t, self.layout.node_width, self.layout.link_curvature)
    }
}
