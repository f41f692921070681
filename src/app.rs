//! Application context: owns every engine component and runs the
//! mutate → layout → render → notify pipeline.
//!
//! Everything here is single-threaded and clock-free; the terminal loop passes
//! `now` into each call and redraws from the accessors.
use std::collections::HashMap;
use std::time::Instant;

use crate::animation::{Animator, Deferred};
use crate::config::ResolvedConfig;
use crate::conversation::ConversationNode;
use crate::events::{AppEvent, EventBus, EventKind, Subscriber};
use crate::hierarchy::{Hierarchy, NodeId};
use crate::layout::{LayoutEngine, LayoutResult, Point, Rect};
use crate::minimap::Minimap;
use crate::panel::{Nav, SidePanel};
use crate::scene::{node_point, Scene, SceneHit};
use crate::stats::Stats;
use crate::viewport::{ScaleBounds, Viewport};

pub struct App {
    config: ResolvedConfig,
    title: String,
    hierarchy: Hierarchy,
    engine: LayoutEngine,
    layout: LayoutResult,
    scene: Scene,
    viewport: Viewport,
    minimap: Minimap,
    panel: SidePanel,
    stats: Stats,
    bus: EventBus,
    animator: Animator,
    emitted: HashMap<EventKind, u64>,
}

impl App {
    /// Build the context around `tree` for a canvas of `width`×`height` screen pixels.
    pub fn new(config: ResolvedConfig, tree: &ConversationNode, title: &str, width: f64, height: f64, now: Instant) -> Self {
        let engine = LayoutEngine::new(config.layout.clone());
        let scene = Scene::new(config.layout.clone(), config.animation.clone());
        let viewport = Viewport::new(width.max(1.0), height.max(1.0), ScaleBounds::from(&config.viewport));
        let minimap = Minimap::new(config.minimap.clone(), width);
        let panel = SidePanel::new(config.panel.preview_chars);

        let mut bus = EventBus::new();
        bus.subscribe(EventKind::TreeUpdated, Subscriber::SidePanel);
        bus.subscribe(EventKind::TreeUpdated, Subscriber::Minimap);
        bus.subscribe(EventKind::TreeUpdated, Subscriber::Stats);
        bus.subscribe(EventKind::PanelOpen, Subscriber::SidePanel);
        bus.subscribe(EventKind::WindowResize, Subscriber::Viewport);
        bus.subscribe(EventKind::WindowResize, Subscriber::Minimap);

        let hierarchy = Hierarchy::build(tree);
        let mut app = Self {
            config,
            title: title.to_string(),
            hierarchy,
            engine,
            layout: LayoutResult::default(),
            scene,
            viewport,
            minimap,
            panel,
            stats: Stats::default(),
            bus,
            animator: Animator::default(),
            emitted: HashMap::new(),
        };
        let root = app.hierarchy.root();
        app.refresh(root, now);
        app.defer_fit();
        app
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn layout(&self) -> &LayoutResult {
        &self.layout
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn minimap(&self) -> &Minimap {
        &self.minimap
    }

    pub fn panel(&self) -> &SidePanel {
        &self.panel
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// How many times `kind` has been emitted since construction.
    pub fn emitted(&self, kind: EventKind) -> u64 {
        self.emitted.get(&kind).copied().unwrap_or(0)
    }

    /// Bounding box of the visible cards.
    pub fn extents(&self) -> Rect {
        self.engine.extents(&self.hierarchy, &self.layout.nodes)
    }

    // ── Pipeline ──────────────────────────────────────────────────────────────

    /// Swap in a new conversation. The previous view is discarded wholesale.
    pub fn load(&mut self, tree: &ConversationNode, title: &str, now: Instant) {
        tracing::info!(title, nodes = tree.count(), "loading conversation");
        self.title = title.to_string();
        self.hierarchy = Hierarchy::build(tree);
        self.scene.clear();
        self.panel.close();
        let root = self.hierarchy.root();
        self.refresh(root, now);
        self.defer_fit();
    }

    /// Layout, render and announce. The single path every structural change takes.
    pub fn refresh(&mut self, origin: NodeId, now: Instant) {
        let layout = self.engine.layout(&mut self.hierarchy);
        self.scene.render(&mut self.hierarchy, &layout, origin, now);
        let event = AppEvent::TreeUpdated {
            root: self.hierarchy.root(),
            nodes: layout.nodes.len(),
            links: layout.links.len(),
        };
        self.layout = layout;
        self.emit(event, now);
    }

    pub fn emit(&mut self, event: AppEvent, now: Instant) {
        let kind = event.kind();
        *self.emitted.entry(kind).or_default() += 1;
        tracing::trace!(event = %kind, "emit");
        for subscriber in self.bus.subscribers(kind) {
            self.deliver(subscriber, event, now);
        }
    }

    fn deliver(&mut self, subscriber: Subscriber, event: AppEvent, now: Instant) {
        match (subscriber, event) {
            (Subscriber::SidePanel, AppEvent::TreeUpdated { .. }) => {
                self.panel.on_tree_updated(&self.hierarchy);
            }
            (Subscriber::SidePanel, AppEvent::PanelOpen(id)) => self.open_panel(id, now),
            (Subscriber::Minimap, AppEvent::TreeUpdated { .. }) => self.rebuild_minimap(),
            (Subscriber::Minimap, AppEvent::WindowResize { width, .. }) => {
                self.minimap.resize(width);
                self.rebuild_minimap();
            }
            (Subscriber::Stats, AppEvent::TreeUpdated { .. }) => {
                self.stats = Stats::compute(&self.hierarchy);
            }
            (Subscriber::Viewport, AppEvent::WindowResize { .. }) => self.defer_fit(),
            _ => {}
        }
    }

    fn rebuild_minimap(&mut self) {
        let extents = self.extents();
        self.minimap.rebuild(&self.hierarchy, &self.layout, extents);
    }

    fn defer_fit(&mut self) {
        self.animator.defer(Deferred::FitToView {
            padding: self.config.viewport.fit_padding,
        });
    }

    /// Advance time: drop finished exits and run deferred work once at rest.
    /// Returns true while another frame is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.scene.prune(now);
        self.viewport.tick(now);
        let settled = self.scene.is_settled(now) && self.viewport.is_settled(now);
        for action in self.animator.take_ready(settled) {
            match action {
                Deferred::FitToView { padding } => self.fit_with_padding(padding, now),
            }
        }
        self.is_animating(now)
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        !self.scene.is_settled(now) || !self.viewport.is_settled(now) || self.animator.has_pending()
    }

    // ── Structural commands ───────────────────────────────────────────────────

    pub fn toggle(&mut self, id: NodeId, now: Instant) -> bool {
        if !self.hierarchy.toggle(id) {
            return false;
        }
        tracing::debug!(node = %id, collapsed = !self.hierarchy.is_expanded(id), "toggle");
        self.refresh(id, now);
        self.defer_fit();
        true
    }

    pub fn toggle_selected(&mut self, now: Instant) -> bool {
        match self.panel.selected() {
            Some(id) => self.toggle(id, now),
            None => false,
        }
    }

    pub fn expand_all(&mut self, now: Instant) {
        self.hierarchy.expand_all();
        let root = self.hierarchy.root();
        self.refresh(root, now);
        self.defer_fit();
    }

    pub fn collapse_all(&mut self, now: Instant) {
        self.hierarchy.collapse_all();
        let root = self.hierarchy.root();
        self.refresh(root, now);
        self.defer_fit();
    }

    // ── Viewport commands ─────────────────────────────────────────────────────

    pub fn fit_to_view(&mut self, now: Instant) {
        self.fit_with_padding(self.config.viewport.fit_padding, now);
    }

    fn fit_with_padding(&mut self, padding: f64, now: Instant) {
        let extents = self.extents();
        let duration = self.config.animation.fit();
        self.viewport.fit_to_view(extents, padding, now, duration);
    }

    pub fn resize(&mut self, width: f64, height: f64, now: Instant) {
        self.viewport.resize(width, height);
        let (width, height) = (self.viewport.width, self.viewport.height);
        self.emit(AppEvent::WindowResize { width, height }, now);
    }

    pub fn pan(&mut self, dx: f64, dy: f64, now: Instant) {
        self.viewport.pan(dx, dy, now);
    }

    pub fn zoom_at(&mut self, at: Point, factor: f64, now: Instant) {
        self.viewport.zoom_at(at, factor, now);
    }

    /// Zoom about the middle of the canvas.
    pub fn zoom(&mut self, factor: f64, now: Instant) {
        let at = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        self.zoom_at(at, factor, now);
    }

    pub fn minimap_drag(&mut self, dx: f64, dy: f64, now: Instant) {
        let t = self.minimap.drag(dx, dy, &self.viewport);
        self.viewport.animate_to(t, now, self.config.animation.brush());
    }

    pub fn minimap_resize(&mut self, factor: f64, now: Instant) {
        let t = self.minimap.resize_viewbox(factor, &self.viewport);
        self.viewport.animate_to(t, now, self.config.animation.brush());
    }

    pub fn minimap_jump(&mut self, at: Point, now: Instant) {
        let t = self.minimap.jump(at, &self.viewport);
        self.viewport.animate_to(t, now, self.config.animation.brush());
    }

    // ── Selection ─────────────────────────────────────────────────────────────

    /// Select a node; the panel reacts through `panel:open`.
    pub fn select(&mut self, id: NodeId, now: Instant) {
        if self.hierarchy.contains(id) {
            self.emit(AppEvent::PanelOpen(id), now);
        }
    }

    /// Reveal `id`, show it in the panel and recentre on it. Runs on `panel:open`.
    pub fn open_panel(&mut self, id: NodeId, now: Instant) {
        if !self.hierarchy.contains(id) {
            return;
        }
        if self.hierarchy.ensure_visible(id) {
            self.refresh(id, now);
        }
        self.panel.open(id, &self.hierarchy);
        if let Some(node) = self.hierarchy.get(id) {
            let duration = self.config.animation.recentre();
            self.viewport.center_on(node_point(node), now, duration);
        }
    }

    pub fn close_panel(&mut self) {
        self.panel.close();
    }

    pub fn navigate(&mut self, nav: Nav, now: Instant) -> bool {
        match self.panel.target(nav, &self.hierarchy) {
            Some(target) => {
                self.select(target, now);
                true
            }
            None => false,
        }
    }

    /// A click on the canvas at a screen point.
    pub fn click(&mut self, at: Point, now: Instant) -> Option<SceneHit> {
        let scene_point = self.viewport.transform(now).invert(at);
        let hit = self.scene.hit_test(scene_point, now)?;
        match hit {
            SceneHit::Card(id) => self.select(id, now),
            SceneHit::Toggle(id) => {
                self.toggle(id, now);
            }
        }
        Some(hit)
    }
}
