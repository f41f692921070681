//! Side panel state: the selected node, its detail view, and the linear reading
//! order used for previous/next navigation.
//!
//! The panel never touches the viewport or the hierarchy itself; the app makes
//! the node visible and recentres before calling `open`.
use crate::conversation::Speaker;
use crate::hierarchy::{Hierarchy, NodeId};

const ELLIPSIS: char = '…';

/// Collapse runs of whitespace and cut to `max_chars` characters plus an ellipsis.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        let mut cut: String = flat.chars().take(max_chars).collect();
        cut.push(ELLIPSIS);
        cut
    } else {
        flat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Prev,
    Next,
    Parent,
    FirstChild,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelItem {
    pub id: NodeId,
    pub speaker: Speaker,
    pub timestamp: String,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub id: NodeId,
    pub speaker: Speaker,
    pub timestamp: String,
    pub text: String,
    /// Every child, hidden or not.
    pub forks: Vec<PanelItem>,
    pub siblings: Vec<PanelItem>,
    pub has_prev: bool,
    pub has_next: bool,
    pub has_parent: bool,
    pub has_first_child: bool,
}

#[derive(Debug, Clone)]
pub struct SidePanel {
    preview_chars: usize,
    selected: Option<NodeId>,
    order: Vec<NodeId>,
    view: Option<PanelView>,
}

impl SidePanel {
    pub fn new(preview_chars: usize) -> Self {
        Self {
            preview_chars,
            selected: None,
            order: Vec::new(),
            view: None,
        }
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn is_open(&self) -> bool {
        self.selected.is_some()
    }

    pub fn view(&self) -> Option<&PanelView> {
        self.view.as_ref()
    }

    /// Visible nodes, column by column, top to bottom.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn open(&mut self, id: NodeId, hierarchy: &Hierarchy) {
        self.selected = Some(id);
        self.rebuild_order(hierarchy);
        self.render(hierarchy);
    }

    pub fn on_tree_updated(&mut self, hierarchy: &Hierarchy) {
        self.rebuild_order(hierarchy);
        if self.selected.is_some() {
            self.render(hierarchy);
        }
    }

    pub fn close(&mut self) {
        self.selected = None;
        self.view = None;
    }

    /// Node reached by `nav` from the selection, if any.
    pub fn target(&self, nav: Nav, hierarchy: &Hierarchy) -> Option<NodeId> {
        let id = self.selected?;
        match nav {
            Nav::Prev => {
                let i = self.position(id)?;
                i.checked_sub(1).and_then(|p| self.order.get(p)).copied()
            }
            Nav::Next => {
                let i = self.position(id)?;
                self.order.get(i + 1).copied()
            }
            Nav::Parent => hierarchy.parent(id),
            Nav::FirstChild => hierarchy.all_children(id).first().copied(),
        }
    }

    fn position(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|o| *o == id)
    }

    fn rebuild_order(&mut self, hierarchy: &Hierarchy) {
        let mut nodes: Vec<(f64, f64, NodeId)> = hierarchy
            .visible_nodes()
            .into_iter()
            .filter_map(|id| hierarchy.get(id).map(|n| (n.y, n.x, id)))
            .collect();
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        self.order = nodes.into_iter().map(|(_, _, id)| id).collect();
    }

    fn item(&self, hierarchy: &Hierarchy, id: NodeId) -> Option<PanelItem> {
        let n = hierarchy.get(id)?;
        Some(PanelItem {
            id,
            speaker: n.data.speaker,
            timestamp: n.data.timestamp.clone(),
            preview: preview(&n.data.text, self.preview_chars),
        })
    }

    fn render(&mut self, hierarchy: &Hierarchy) {
        let Some(id) = self.selected else { return };
        let Some(node) = hierarchy.get(id) else {
            self.close();
            return;
        };
        let forks = node
            .all_children()
            .iter()
            .filter_map(|c| self.item(hierarchy, *c))
            .collect();
        let siblings = hierarchy
            .siblings(id)
            .into_iter()
            .filter_map(|s| self.item(hierarchy, s))
            .collect();
        let view = PanelView {
            id,
            speaker: node.data.speaker,
            timestamp: node.data.timestamp.clone(),
            text: node.data.text.clone(),
            forks,
            siblings,
            has_prev: self.target(Nav::Prev, hierarchy).is_some(),
            has_next: self.target(Nav::Next, hierarchy).is_some(),
            has_parent: node.parent.is_some(),
            has_first_child: node.has_children(),
        };
        self.view = Some(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation;
    use crate::hierarchy::tests::arb_tree;
    use crate::layout::LayoutEngine;
    use proptest::prelude::*;

    fn laid_out() -> Hierarchy {
        let mut h = Hierarchy::build(&conversation::sample());
        LayoutEngine::default().layout(&mut h);
        h
    }

    #[test]
    fn test_preview_collapses_and_truncates() {
        assert_eq!(preview("  a \n\n b\tc  ", 180), "a b c");
        let long = "x".repeat(200);
        let p = preview(&long, 180);
        assert_eq!(p.chars().count(), 181);
        assert!(p.ends_with('…'));
        assert_eq!(preview(&"y".repeat(180), 180), "y".repeat(180));
    }

    #[test]
    fn test_order_is_column_then_row() {
        let h = laid_out();
        let mut panel = SidePanel::new(180);
        panel.open(h.root(), &h);
        let order = panel.order();
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], h.root());
        for pair in order.windows(2) {
            let (a, b) = (h.get(pair[0]).unwrap(), h.get(pair[1]).unwrap());
            assert!(a.y < b.y || (a.y == b.y && a.x <= b.x));
        }
    }

    #[test]
    fn test_view_lists_forks_and_siblings() {
        let h = laid_out();
        let mut panel = SidePanel::new(180);
        let first = h.children(h.root())[0];
        panel.open(first, &h);
        let view = panel.view().unwrap();
        assert_eq!(view.forks.len(), 2);
        assert_eq!(view.siblings.len(), 1);
        assert_eq!(view.siblings[0].id, h.children(h.root())[1]);
        assert!(view.has_parent && view.has_first_child && view.has_prev && view.has_next);
    }

    #[test]
    fn test_forks_include_hidden_children() {
        let h = laid_out();
        let mut panel = SidePanel::new(180);
        let first = h.children(h.root())[0];
        let collapsed = h.children(first)[0];
        assert!(h.get(collapsed).unwrap().is_collapsed());
        panel.open(collapsed, &h);
        assert_eq!(panel.view().unwrap().forks.len(), 2);
        assert!(panel.target(Nav::FirstChild, &h).is_some());
    }

    #[test]
    fn test_navigation_targets() {
        let h = laid_out();
        let mut panel = SidePanel::new(180);
        panel.open(h.root(), &h);
        assert_eq!(panel.target(Nav::Prev, &h), None);
        assert_eq!(panel.target(Nav::Parent, &h), None);
        assert_eq!(panel.target(Nav::Next, &h), Some(panel.order()[1]));
        assert_eq!(panel.target(Nav::FirstChild, &h), Some(h.children(h.root())[0]));
    }

    #[test]
    fn test_close_clears_selection() {
        let h = laid_out();
        let mut panel = SidePanel::new(180);
        panel.open(h.root(), &h);
        panel.close();
        assert!(!panel.is_open());
        assert!(panel.view().is_none());
        assert_eq!(panel.target(Nav::Next, &h), None);
    }

    #[test]
    fn test_tree_update_rerenders_open_node() {
        let mut h = laid_out();
        let mut panel = SidePanel::new(180);
        panel.open(h.root(), &h);
        h.collapse_all();
        LayoutEngine::default().layout(&mut h);
        panel.on_tree_updated(&h);
        assert_eq!(panel.order(), &[h.root()]);
        assert!(!panel.view().unwrap().has_next);
    }

    proptest! {
        #[test]
        fn prop_next_then_prev_returns_to_start(
            tree in arb_tree(),
            toggles in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
            pick in any::<prop::sample::Index>(),
        ) {
            let mut h = Hierarchy::build(&tree);
            let all: Vec<NodeId> = h.iter().map(|n| n.id).collect();
            for t in toggles {
                h.toggle(all[t.index(all.len())]);
            }
            LayoutEngine::default().layout(&mut h);
            let visible = h.visible_nodes();
            let start = visible[pick.index(visible.len())];

            let mut panel = SidePanel::new(180);
            panel.open(start, &h);
            if let Some(next) = panel.target(Nav::Next, &h) {
                panel.open(next, &h);
                prop_assert_eq!(panel.target(Nav::Prev, &h), Some(start));
            }
            panel.open(start, &h);
            if let Some(prev) = panel.target(Nav::Prev, &h) {
                panel.open(prev, &h);
                prop_assert_eq!(panel.target(Nav::Next, &h), Some(start));
            }
        }
    }
}
