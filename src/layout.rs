//! Tidy horizontal tree layout.
//!
//! Visible leaves are stacked top to bottom in pre-order at a fixed row spacing,
//! every parent sits at the mean of its visible children, and the depth column is
//! a pure function of depth. Nodes hidden inside collapsed branches are skipped
//! and keep whatever coordinates they had.
use crate::config::LayoutConfig;
use crate::hierarchy::{Hierarchy, NodeId};

// ── Geometry ──────────────────────────────────────────────────────────────────

/// A point in scene space: `x` grows right (depth), `y` grows down (siblings).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Rectangle spanning two corners given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs())
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    /// Visible nodes in pre-order.
    pub nodes: Vec<NodeId>,
    /// One entry per visible non-root node, in the same order.
    pub links: Vec<Link>,
}

// ── Engine ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Recompute coordinates of every visible node in place.
    pub fn layout(&self, hierarchy: &mut Hierarchy) -> LayoutResult {
        let nodes = hierarchy.visible_nodes();
        let spacing = self.config.row_spacing();
        let column = self.config.column_spacing();

        // Leaves first, in pre-order.
        let mut cursor: Option<(f64, Option<NodeId>)> = None;
        for &id in &nodes {
            if !hierarchy.children(id).is_empty() {
                continue;
            }
            let parent = hierarchy.parent(id);
            let x = match cursor {
                None => 0.0,
                Some((last, last_parent)) if last_parent == parent => last + spacing,
                Some((last, _)) => last + self.config.subtree_spacing(),
            };
            if let Some(node) = hierarchy.get_mut(id) {
                node.x = x;
            }
            cursor = Some((x, parent));
        }

        // Parents after their children: reverse pre-order.
        for &id in nodes.iter().rev() {
            let kids = hierarchy.children(id);
            if kids.is_empty() {
                continue;
            }
            let sum: f64 = kids.iter().filter_map(|k| hierarchy.get(*k)).map(|k| k.x).sum();
            let mean = sum / kids.len() as f64;
            if let Some(node) = hierarchy.get_mut(id) {
                node.x = mean;
            }
        }

        let shift = hierarchy.get(hierarchy.root()).map(|r| r.x).unwrap_or(0.0);
        let mut links = Vec::with_capacity(nodes.len().saturating_sub(1));
        for &id in &nodes {
            let Some(node) = hierarchy.get_mut(id) else { continue };
            node.x -= shift;
            node.y = node.depth as f64 * column;
            if let Some(source) = node.parent {
                links.push(Link { source, target: id });
            }
        }

        tracing::debug!(visible = nodes.len(), links = links.len(), "layout pass");
        LayoutResult { nodes, links }
    }

    /// Bounding box of the card footprints of `ids` in scene space. Degenerate
    /// spans fall back to one card so callers never divide by zero.
    pub fn extents(&self, hierarchy: &Hierarchy, ids: &[NodeId]) -> Rect {
        let (w, h) = (self.config.node_width, self.config.node_height);
        let mut left = f64::INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut top = f64::INFINITY;
        let mut bottom = f64::NEG_INFINITY;
        for node in ids.iter().filter_map(|id| hierarchy.get(*id)) {
            left = left.min(node.y - w / 2.0);
            right = right.max(node.y + w / 2.0);
            top = top.min(node.x - h / 2.0);
            bottom = bottom.max(node.x + h / 2.0);
        }

        let (x, width) = span_or(left, right, w);
        let (y, height) = span_or(top, bottom, h);
        Rect::new(x, y, width, height)
    }
}

fn span_or(lo: f64, hi: f64, fallback: f64) -> (f64, f64) {
    let span = hi - lo;
    if lo.is_finite() && span.is_finite() && span >= 1.0 {
        (lo, span)
    } else if lo.is_finite() && hi.is_finite() {
        ((lo + hi - fallback) / 2.0, fallback)
    } else {
        (-fallback / 2.0, fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{self, ConversationNode, Speaker};
    use crate::hierarchy::tests::arb_tree;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(LayoutConfig::default())
    }

    fn pos(h: &Hierarchy, id: NodeId) -> (f64, f64) {
        let n = h.get(id).unwrap();
        (n.x, n.y)
    }

    #[test]
    fn test_root_at_origin_and_columns_by_depth() {
        let mut h = Hierarchy::build(&conversation::sample());
        let result = engine().layout(&mut h);
        assert_eq!(pos(&h, h.root()), (0.0, 0.0));
        for id in &result.nodes {
            let n = h.get(*id).unwrap();
            assert_eq!(n.y, n.depth as f64 * 340.0);
        }
    }

    #[test]
    fn test_leaves_spaced_and_parents_centred() {
        let mut h = Hierarchy::build(&conversation::sample());
        engine().layout(&mut h);
        let first = h.children(h.root())[0];
        let grand = h.children(first).to_vec();
        // Two collapsed grandchildren are leaves of the visible tree.
        let (a, _) = pos(&h, grand[0]);
        let (b, _) = pos(&h, grand[1]);
        assert_eq!(b - a, 150.0);
        assert_eq!(pos(&h, first).0, (a + b) / 2.0);
    }

    #[test]
    fn test_links_one_per_visible_non_root() {
        let mut h = Hierarchy::build(&conversation::sample());
        let result = engine().layout(&mut h);
        assert_eq!(result.links.len(), result.nodes.len() - 1);
        for link in &result.links {
            assert_eq!(h.parent(link.target), Some(link.source));
        }
    }

    #[test]
    fn test_collapsed_nodes_keep_coordinates() {
        let mut h = Hierarchy::build_expanded(&conversation::sample());
        let e = engine();
        e.layout(&mut h);
        let deep = h.iter().find(|n| n.depth == 3).unwrap().id;
        let before = pos(&h, deep);
        h.collapse_all();
        e.layout(&mut h);
        assert_eq!(pos(&h, deep), before);
    }

    #[test]
    fn test_subtree_separation_widens_cousin_gap() {
        let tree = ConversationNode::new(Speaker::User, "r", "").with_children(vec![
            ConversationNode::new(Speaker::Assistant, "a", "")
                .with_children(vec![ConversationNode::new(Speaker::User, "a1", "")]),
            ConversationNode::new(Speaker::Assistant, "b", "")
                .with_children(vec![ConversationNode::new(Speaker::User, "b1", "")]),
        ]);
        let mut h = Hierarchy::build_expanded(&tree);
        let e = LayoutEngine::new(LayoutConfig {
            subtree_separation: 2.0,
            ..LayoutConfig::default()
        });
        e.layout(&mut h);
        let kids = h.children(h.root()).to_vec();
        let a1 = h.children(kids[0])[0];
        let b1 = h.children(kids[1])[0];
        assert_eq!(pos(&h, b1).0 - pos(&h, a1).0, 300.0);
    }

    #[test]
    fn test_tight_subtree_separation_keeps_cousins_apart() {
        let tree = ConversationNode::new(Speaker::User, "r", "").with_children(vec![
            ConversationNode::new(Speaker::Assistant, "a", "")
                .with_children(vec![ConversationNode::new(Speaker::User, "a1", "")]),
            ConversationNode::new(Speaker::Assistant, "b", "")
                .with_children(vec![ConversationNode::new(Speaker::User, "b1", "")]),
        ]);
        let mut h = Hierarchy::build_expanded(&tree);
        let e = LayoutEngine::new(LayoutConfig {
            subtree_separation: 0.1,
            ..LayoutConfig::default()
        });
        e.layout(&mut h);
        let kids = h.children(h.root()).to_vec();
        let a1 = h.children(kids[0])[0];
        let b1 = h.children(kids[1])[0];
        assert_eq!(pos(&h, b1).0 - pos(&h, a1).0, 150.0);
    }

    #[test]
    fn test_extents_single_node_is_one_card() {
        let mut h = Hierarchy::build(&ConversationNode::new(Speaker::User, "solo", ""));
        let e = engine();
        let result = e.layout(&mut h);
        let r = e.extents(&h, &result.nodes);
        assert_eq!(r, Rect::new(-130.0, -60.0, 260.0, 120.0));
    }

    #[test]
    fn test_extents_empty_falls_back() {
        let h = Hierarchy::build(&conversation::sample());
        let r = engine().extents(&h, &[]);
        assert_eq!((r.width, r.height), (260.0, 120.0));
        assert!(r.x.is_finite() && r.y.is_finite());
    }

    proptest! {
        #[test]
        fn prop_layout_is_deterministic(tree in arb_tree()) {
            let e = engine();
            let mut a = Hierarchy::build(&tree);
            let mut b = Hierarchy::build(&tree);
            let ra = e.layout(&mut a);
            let rb = e.layout(&mut b);
            prop_assert_eq!(ra.nodes.len(), rb.nodes.len());
            for (x, y) in ra.nodes.iter().zip(&rb.nodes) {
                prop_assert_eq!(pos(&a, *x), pos(&b, *y));
            }
            // Running twice on the same hierarchy changes nothing.
            let first: Vec<_> = ra.nodes.iter().map(|id| pos(&a, *id)).collect();
            e.layout(&mut a);
            let second: Vec<_> = ra.nodes.iter().map(|id| pos(&a, *id)).collect();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_same_column_cards_never_overlap(tree in arb_tree()) {
            let e = engine();
            let mut h = Hierarchy::build_expanded(&tree);
            let result = e.layout(&mut h);
            let mut columns: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
            for id in &result.nodes {
                let n = h.get(*id).unwrap();
                columns.entry(n.depth).or_default().push(n.x);
            }
            for xs in columns.values_mut() {
                xs.sort_by(f64::total_cmp);
                for pair in xs.windows(2) {
                    prop_assert!(pair[1] - pair[0] >= e.config().row_spacing() - 1e-6);
                }
            }
        }

        #[test]
        fn prop_extents_cover_every_card(tree in arb_tree()) {
            let e = engine();
            let mut h = Hierarchy::build(&tree);
            let result = e.layout(&mut h);
            let r = e.extents(&h, &result.nodes);
            prop_assert!(r.width >= 260.0 && r.height >= 120.0);
            for id in &result.nodes {
                let n = h.get(*id).unwrap();
                prop_assert!(r.contains(Point::new(n.y, n.x)));
            }
        }
    }
}
