//! Explicit publish/subscribe registry owned by the app.
//!
//! The bus only records who listens to what; the app walks `subscribers` and
//! delivers each event synchronously, in registration order.
use std::fmt;

use crate::hierarchy::NodeId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    WindowResize { width: f64, height: f64 },
    TreeUpdated { root: NodeId, nodes: usize, links: usize },
    PanelOpen(NodeId),
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::WindowResize { .. } => EventKind::WindowResize,
            AppEvent::TreeUpdated { .. } => EventKind::TreeUpdated,
            AppEvent::PanelOpen(_) => EventKind::PanelOpen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    WindowResize,
    TreeUpdated,
    PanelOpen,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::WindowResize => "window:resize",
            EventKind::TreeUpdated => "tree:updated",
            EventKind::PanelOpen => "panel:open",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Components that can react to events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscriber {
    Minimap,
    SidePanel,
    Stats,
    Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

#[derive(Debug, Default)]
pub struct EventBus {
    next_id: u64,
    entries: Vec<(Subscription, Subscriber)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, subscriber: Subscriber) -> Subscription {
        let sub = Subscription { kind, id: self.next_id };
        self.next_id += 1;
        self.entries.push((sub, subscriber));
        sub
    }

    /// Returns false when the subscription was already gone.
    pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(s, _)| *s != sub);
        self.entries.len() != before
    }

    /// Listeners for `kind` in the order they subscribed.
    pub fn subscribers(&self, kind: EventKind) -> Vec<Subscriber> {
        self.entries
            .iter()
            .filter(|(s, _)| s.kind == kind)
            .map(|(_, sub)| *sub)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order_preserved() {
        let mut bus = EventBus::new();
        bus.subscribe(EventKind::TreeUpdated, Subscriber::SidePanel);
        bus.subscribe(EventKind::PanelOpen, Subscriber::SidePanel);
        bus.subscribe(EventKind::TreeUpdated, Subscriber::Minimap);
        bus.subscribe(EventKind::TreeUpdated, Subscriber::Stats);
        assert_eq!(
            bus.subscribers(EventKind::TreeUpdated),
            vec![Subscriber::SidePanel, Subscriber::Minimap, Subscriber::Stats]
        );
        assert!(bus.subscribers(EventKind::WindowResize).is_empty());
    }

    #[test]
    fn test_unsubscribe_removes_only_that_entry() {
        let mut bus = EventBus::new();
        let a = bus.subscribe(EventKind::TreeUpdated, Subscriber::Stats);
        bus.subscribe(EventKind::TreeUpdated, Subscriber::Stats);
        assert!(bus.unsubscribe(a));
        assert!(!bus.unsubscribe(a));
        assert_eq!(bus.subscribers(EventKind::TreeUpdated), vec![Subscriber::Stats]);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::TreeUpdated.to_string(), "tree:updated");
        let e = AppEvent::WindowResize { width: 1.0, height: 2.0 };
        assert_eq!(e.kind().name(), "window:resize");
    }
}
