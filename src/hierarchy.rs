//! Hierarchy model: an id-addressed arena wrapping one conversation tree.
//!
//! Each node stores its parent's id (never a reference) and a tagged child list:
//! `Branch::Expanded` while its children are on screen, `Branch::Collapsed` while
//! they are saved aside. Ids come from a process-wide counter so two loads can
//! never hand the renderer colliding keys.
//!
//! Nodes are created once by `build` and never added or removed afterwards; every
//! mutation here only moves lists between the two branch states. Callers must
//! re-run layout after any of them.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::conversation::{ConversationNode, Speaker};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

// ── Ids ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// ── Branch state ──────────────────────────────────────────────────────────────

/// Child list tagged with its visibility. Leaves are always `Expanded(vec![])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    Expanded(Vec<NodeId>),
    Collapsed(Vec<NodeId>),
}

impl Branch {
    /// Every child, whichever state the list is in.
    pub fn ids(&self) -> &[NodeId] {
        match self {
            Branch::Expanded(ids) | Branch::Collapsed(ids) => ids,
        }
    }

    /// Children currently on screen.
    pub fn visible(&self) -> &[NodeId] {
        match self {
            Branch::Expanded(ids) => ids,
            Branch::Collapsed(_) => &[],
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, Branch::Collapsed(_))
    }

    fn swap(&mut self) {
        let next = match std::mem::replace(self, Branch::Expanded(Vec::new())) {
            Branch::Expanded(ids) => Branch::Collapsed(ids),
            Branch::Collapsed(ids) => Branch::Expanded(ids),
        };
        *self = next;
    }
}

// ── Nodes ─────────────────────────────────────────────────────────────────────

/// The message a node displays. Text is kept whole; truncation is a drawing concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: NodeId,
    pub data: Turn,
    pub parent: Option<NodeId>,
    pub depth: usize,
    branch: Branch,
    /// Position along the sibling (vertical) axis.
    pub x: f64,
    /// Position along the depth (horizontal) axis.
    pub y: f64,
    pub previous_x: f64,
    pub previous_y: f64,
}

impl LayoutNode {
    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    pub fn children(&self) -> &[NodeId] {
        self.branch.visible()
    }

    pub fn all_children(&self) -> &[NodeId] {
        self.branch.ids()
    }

    pub fn has_children(&self) -> bool {
        !self.branch.ids().is_empty()
    }

    /// True when this node hides at least one child.
    pub fn is_collapsed(&self) -> bool {
        self.branch.is_collapsed() && self.has_children()
    }
}

// ── Hierarchy ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Hierarchy {
    base: u64,
    /// Arena in depth-first pre-order; index = id - base.
    nodes: Vec<LayoutNode>,
}

impl Hierarchy {
    /// Wrap a raw tree and apply the initial-view collapse policy.
    pub fn build(raw: &ConversationNode) -> Self {
        let mut hierarchy = Self::build_expanded(raw);
        hierarchy.collapse_below_first_level();
        tracing::debug!(
            nodes = hierarchy.node_count(),
            visible = hierarchy.visible_nodes().len(),
            "hierarchy built"
        );
        hierarchy
    }

    /// Wrap a raw tree with every branch expanded.
    pub fn build_expanded(raw: &ConversationNode) -> Self {
        // First pass fixes the pre-order so the id range can be reserved in one go.
        let mut order: Vec<(&ConversationNode, Option<usize>, usize)> = Vec::new();
        let mut stack = vec![(raw, None, 0usize)];
        while let Some((node, parent, depth)) = stack.pop() {
            let index = order.len();
            order.push((node, parent, depth));
            for child in node.children.iter().rev() {
                stack.push((child, Some(index), depth + 1));
            }
        }

        let base = NEXT_ID.fetch_add(order.len() as u64, Ordering::Relaxed);
        let mut nodes: Vec<LayoutNode> = Vec::with_capacity(order.len());
        for (index, (node, parent, depth)) in order.into_iter().enumerate() {
            let id = NodeId(base + index as u64);
            let parent = parent.map(|p| {
                if let Branch::Expanded(ids) = &mut nodes[p].branch {
                    ids.push(id);
                }
                NodeId(base + p as u64)
            });
            nodes.push(LayoutNode {
                id,
                data: Turn {
                    speaker: node.speaker,
                    text: node.text.clone(),
                    timestamp: node.timestamp.clone(),
                },
                parent,
                depth,
                branch: Branch::Expanded(Vec::new()),
                x: 0.0,
                y: 0.0,
                previous_x: 0.0,
                previous_y: 0.0,
            });
        }
        Self { base, nodes }
    }

    fn index(&self, id: NodeId) -> Option<usize> {
        let index = id.0.checked_sub(self.base)? as usize;
        (index < self.nodes.len()).then_some(index)
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.base)
    }

    pub fn get(&self, id: NodeId) -> Option<&LayoutNode> {
        self.index(id).map(|i| &self.nodes[i])
    }

    /// Mutable access for position bookkeeping. Branch state stays private.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut LayoutNode> {
        self.index(id).map(|i| &mut self.nodes[i])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index(id).is_some()
    }

    /// Total node count, collapsed subtrees included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every node in pre-order, visible or not.
    pub fn iter(&self) -> impl Iterator<Item = &LayoutNode> {
        self.nodes.iter()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(LayoutNode::children).unwrap_or(&[])
    }

    pub fn all_children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(LayoutNode::all_children).unwrap_or(&[])
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| !n.branch.is_collapsed())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// The parent's children (both states) without `id` itself, in order.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        self.parent(id)
            .map(|p| self.all_children(p).iter().copied().filter(|s| *s != id).collect())
            .unwrap_or_default()
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(a) = cursor {
            out.push(a);
            cursor = self.parent(a);
        }
        out
    }

    /// A node is visible when every ancestor is expanded.
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.contains(id)
            && self
                .ancestors(id)
                .iter()
                .all(|a| self.is_expanded(*a))
    }

    /// Nodes reachable from the root through expanded branches, pre-order.
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Initial view: root and its children stay open, every grandchild is
    /// collapsed so nothing deeper than depth 2 shows.
    pub fn collapse_below_first_level(&mut self) {
        let grandchildren: Vec<NodeId> = self
            .children(self.root())
            .iter()
            .flat_map(|c| self.children(*c).to_vec())
            .collect();
        for g in grandchildren {
            self.collapse(g);
        }
    }

    /// Hide the whole subtree under `id`: every node reachable through expanded
    /// branches is collapsed, then `id` itself.
    pub fn collapse(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(node) = self.get_mut(n) else { continue };
            stack.extend(node.branch.visible().iter().copied());
            if !node.branch.is_collapsed() && node.has_children() {
                node.branch.swap();
            }
        }
    }

    /// Toolbar "collapse all": every branch at every level, including ones
    /// already tucked inside collapsed subtrees. Only the root stays visible.
    pub fn collapse_all(&mut self) {
        for node in &mut self.nodes {
            if !node.branch.is_collapsed() && node.has_children() {
                node.branch.swap();
            }
        }
    }

    /// Shallow swap of one node's branch state. Leaves are left alone.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        match self.get_mut(id) {
            Some(node) if node.has_children() => {
                node.branch.swap();
                true
            }
            _ => false,
        }
    }

    /// Expand a single collapsed node; reports whether anything changed.
    pub fn expand(&mut self, id: NodeId) -> bool {
        match self.get_mut(id) {
            Some(node) if node.branch.is_collapsed() => {
                node.branch.swap();
                true
            }
            _ => false,
        }
    }

    pub fn expand_all(&mut self) {
        for node in &mut self.nodes {
            if node.branch.is_collapsed() {
                node.branch.swap();
            }
        }
    }

    /// Expand every collapsed ancestor of `id` so it shows on screen.
    pub fn ensure_visible(&mut self, id: NodeId) -> bool {
        let mut changed = false;
        for a in self.ancestors(id) {
            changed |= self.expand(a);
        }
        changed
    }
}
