//! Raw conversation tree: the shape every loader produces and the hierarchy consumes.
//!
//! Nodes are plain owned data. Once a tree is handed to `Hierarchy::build` it is
//! never mutated again; loading a different conversation replaces it wholesale.
use serde::{Deserialize, Serialize};

// ── Speaker ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    #[default]
    Assistant,
}

impl Speaker {
    /// Uppercase badge label shown on cards and in the side panel.
    pub fn badge(self) -> &'static str {
        match self {
            Speaker::User => "USER",
            Speaker::Assistant => "ASSISTANT",
        }
    }

    /// Map an export author role onto the two drawable speakers.
    /// Anything that is not `user` (system, tool, function) is drawn assistant-style.
    pub fn from_role(role: &str) -> Self {
        if role == "user" { Speaker::User } else { Speaker::Assistant }
    }
}

// ── ConversationNode ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationNode {
    #[serde(default)]
    pub speaker: Speaker,
    #[serde(default)]
    pub text: String,
    /// ISO-like timestamp, empty when the export carried none.
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub children: Vec<ConversationNode>,
}

impl ConversationNode {
    pub fn new(speaker: Speaker, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: timestamp.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ConversationNode>) -> Self {
        self.children = children;
        self
    }

    /// Assistant-styled stand-in used whenever a load produces nothing drawable.
    pub fn placeholder(label: &str) -> Self {
        Self::new(Speaker::Assistant, label, "")
    }

    /// Total node count of this subtree, root included.
    pub fn count(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter());
        }
        total
    }
}

// Long linear chains would otherwise drop one stack frame per turn.
impl Drop for ConversationNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

// ── Sample data ───────────────────────────────────────────────────────────────

/// Built-in conversation shown when no export file is given.
pub fn sample() -> ConversationNode {
    use Speaker::{Assistant, User};

    ConversationNode::new(User, "Plan me a weekend in Tokyo. I like food and tech.", "2025-08-10 09:12")
        .with_children(vec![
            ConversationNode::new(
                Assistant,
                "Great! Do you prefer street food crawls or Michelin-tier experiences? I can also weave in Akihabara and TeamLab.",
                "2025-08-10 09:12",
            )
            .with_children(vec![
                ConversationNode::new(User, "Street food, lots of walking. Keep it cheap.", "2025-08-10 09:13")
                    .with_children(vec![
                        ConversationNode::new(
                            Assistant,
                            "Copy! Here are three sample routes for day 1 with yakitori alleys, ramen counters, and a retro arcade stop.",
                            "2025-08-10 09:13",
                        ),
                        ConversationNode::new(
                            Assistant,
                            "Alt plan: Tsukiji outer market early, Asakusa snack crawl, Ueno park stroll, and Akihabara retro. (Click to expand for details...)",
                            "2025-08-10 09:14",
                        ),
                    ]),
                ConversationNode::new(User, "Michelin please — tasting menus are fine.", "2025-08-10 09:13")
                    .with_children(vec![ConversationNode::new(
                        Assistant,
                        "Understood. I can propose 2× tasting menus and a coffee omakase, with exhibit/bookstore stops between.",
                        "2025-08-10 09:14",
                    )]),
            ]),
            ConversationNode::new(
                Assistant,
                "Here is a cost-sensitive itinerary with public transit optimizations and some gadget stops.",
                "2025-08-10 09:12",
            ),
        ])
}
