//! Visible-versus-total counts shown in the stats bar.
use std::fmt;

use crate::hierarchy::Hierarchy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub visible_nodes: usize,
    pub total_nodes: usize,
    /// Visible nodes with nothing shown beneath them, collapsed ones included.
    pub visible_leaves: usize,
    pub total_leaves: usize,
    /// Nodes with two or more children in either state.
    pub forks: usize,
    pub visible_depth: usize,
    pub total_depth: usize,
}

impl Stats {
    pub fn compute(hierarchy: &Hierarchy) -> Self {
        let visible = hierarchy.visible_nodes();
        let visible_leaves = visible.iter().filter(|id| hierarchy.children(**id).is_empty()).count();
        let visible_depth = visible
            .iter()
            .filter_map(|id| hierarchy.get(*id))
            .map(|n| n.depth)
            .max()
            .unwrap_or(0);

        let mut stats = Stats {
            visible_nodes: visible.len(),
            total_nodes: hierarchy.node_count(),
            visible_leaves,
            visible_depth,
            ..Stats::default()
        };
        for node in hierarchy.iter() {
            let degree = node.all_children().len();
            if degree == 0 {
                stats.total_leaves += 1;
            }
            if degree > 1 {
                stats.forks += 1;
            }
            stats.total_depth = stats.total_depth.max(node.depth);
        }
        stats
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes {}/{} · leaves {}/{} · forks {} · depth {}/{}",
            self.visible_nodes,
            self.total_nodes,
            self.visible_leaves,
            self.total_leaves,
            self.forks,
            self.visible_depth,
            self.total_depth
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{self, ConversationNode, Speaker};
    use crate::hierarchy::tests::arb_tree;
    use proptest::prelude::*;

    #[test]
    fn test_sample_initial_stats() {
        let h = Hierarchy::build(&conversation::sample());
        let s = Stats::compute(&h);
        assert_eq!(
            s,
            Stats {
                visible_nodes: 5,
                total_nodes: 8,
                visible_leaves: 3,
                total_leaves: 4,
                forks: 3,
                visible_depth: 2,
                total_depth: 3,
            }
        );
        assert_eq!(s.to_string(), "nodes 5/8 · leaves 3/4 · forks 3 · depth 2/3");
    }

    #[test]
    fn test_single_node() {
        let h = Hierarchy::build(&ConversationNode::new(Speaker::User, "hi", ""));
        let s = Stats::compute(&h);
        assert_eq!((s.visible_nodes, s.total_nodes, s.visible_leaves, s.forks), (1, 1, 1, 0));
    }

    #[test]
    fn test_totals_ignore_collapse_state() {
        let mut h = Hierarchy::build(&conversation::sample());
        let before = Stats::compute(&h);
        h.collapse_all();
        let after = Stats::compute(&h);
        assert_eq!(after.visible_nodes, 1);
        assert_eq!(after.visible_leaves, 1);
        assert_eq!(
            (after.total_nodes, after.total_leaves, after.forks, after.total_depth),
            (before.total_nodes, before.total_leaves, before.forks, before.total_depth)
        );
    }

    proptest! {
        #[test]
        fn prop_visible_never_exceeds_total(tree in arb_tree()) {
            let mut h = Hierarchy::build(&tree);
            for expand in [false, true] {
                if expand {
                    h.expand_all();
                }
                let s = Stats::compute(&h);
                prop_assert!(s.visible_nodes <= s.total_nodes);
                prop_assert!(s.visible_depth <= s.total_depth);
                prop_assert!(s.visible_leaves >= 1);
                if expand {
                    prop_assert_eq!(s.visible_nodes, s.total_nodes);
                    prop_assert_eq!(s.visible_leaves, s.total_leaves);
                }
            }
        }
    }
}
