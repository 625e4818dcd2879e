//! The diagram session owns the mutable half of the system: the active view,
//! the anchor registry, overlay state and the layout scheduler. Every state
//! change is an explicit event that schedules a recompute cascade; each tick
//! lets the surface report geometry, routes every connector against the
//! registry as it is at that moment, and presents the result.

use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use crate::anchors::AnchorRegistry;
use crate::config::Config;
use crate::overlay::{
    DecorationCache, Decorations, OverlayFlags, OverlayKind, OverlayScope, OverlayStates,
    OverlayTransition,
};
use crate::render::{RenderSurface, Viewport};
use crate::routing::{RoutedPath, Router, RoutingError};
use crate::scheduler::{CascadeId, LayoutScheduler, Tick, Trigger};
use crate::schema::{Schema, View};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("unknown view `{0}`")]
    UnknownView(String),
}

/// Routed connectors of one recompute tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub view: String,
    pub cascade: CascadeId,
    pub trigger: Trigger,
    pub tick: usize,
    pub is_final: bool,
    pub flags: OverlayFlags,
    pub paths: Vec<RoutedPath>,
    /// Connectors skipped this tick because an endpoint was not mounted.
    #[serde(skip)]
    pub unresolved: Vec<RoutingError>,
}

impl Frame {
    pub fn path(&self, connector_key: &str) -> Option<&RoutedPath> {
        self.paths.iter().find(|path| path.connector == connector_key)
    }
}

pub struct DiagramSession<'a, S: RenderSurface> {
    schema: &'a Schema,
    schema_version: u64,
    router: Router,
    anchors: AnchorRegistry,
    scheduler: LayoutScheduler,
    overlays: OverlayStates,
    global_views: HashSet<String>,
    decorations: DecorationCache,
    surface: S,
    viewport: Viewport,
    active: Option<&'a View>,
    last_frame: Option<Frame>,
    recomputes: usize,
}

impl<'a, S: RenderSurface> DiagramSession<'a, S> {
    pub fn new(schema: &'a Schema, config: &Config, surface: S) -> Self {
        Self {
            schema,
            schema_version: schema.version(),
            router: Router::new(config.routing.clone()),
            anchors: AnchorRegistry::new(),
            scheduler: LayoutScheduler::new(&config.scheduler.cascade_ms),
            overlays: OverlayStates::new(config.overlay.defaults),
            global_views: config.overlay.global_views.iter().cloned().collect(),
            decorations: DecorationCache::new(),
            surface,
            viewport: Viewport::new(config.render.width, config.render.height),
            active: None,
            last_frame: None,
            recomputes: 0,
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn active_view(&self) -> Option<&'a View> {
        self.active
    }

    pub fn anchors(&self) -> &AnchorRegistry {
        &self.anchors
    }

    pub fn scheduler(&self) -> &LayoutScheduler {
        &self.scheduler
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Ticks processed since the session started.
    pub fn recomputes(&self) -> usize {
        self.recomputes
    }

    /// Which overlay instance a view reads.
    pub fn overlay_scope(&self, view_id: &str) -> OverlayScope {
        if self.global_views.contains(view_id) {
            OverlayScope::Global
        } else {
            OverlayScope::PerView(view_id.to_string())
        }
    }

    pub fn overlay_flags(&self) -> OverlayFlags {
        match self.active {
            Some(view) => self.overlays.flags(&self.overlay_scope(&view.id)),
            None => self.overlays.flags(&OverlayScope::Global),
        }
    }

    pub fn decorations(&mut self) -> Option<Rc<Decorations>> {
        let view = self.active?;
        let flags = self.overlay_flags();
        Some(self.decorations.get(self.schema_version, view, flags))
    }

    /// Switches the active view. The previous view is torn down first, its
    /// pending ticks cancelled and its anchors dropped.
    pub fn activate_view(
        &mut self,
        view_id: &str,
        now: Duration,
    ) -> Result<CascadeId, SessionError> {
        let view = self
            .schema
            .view(view_id)
            .ok_or_else(|| SessionError::UnknownView(view_id.to_string()))?;
        if self.active.is_some() {
            self.teardown();
        }
        self.overlays.reset_view(view_id);
        self.decorations.invalidate();
        self.anchors.activate(view_id);
        self.active = Some(view);
        self.surface.mount(view, self.viewport);
        tracing::info!(view = view_id, connectors = view.connectors.len(), "view activated");
        Ok(self.scheduler.schedule(Trigger::ViewActivated, now))
    }

    /// Flips an overlay flag for the active view's scope. `None` when no
    /// view is active.
    pub fn toggle_overlay(
        &mut self,
        kind: OverlayKind,
        now: Duration,
    ) -> Option<OverlayTransition> {
        let view = self.active?;
        let scope = self.overlay_scope(&view.id);
        let transition = self.overlays.toggle(scope, kind);
        self.decorations.invalidate();
        tracing::debug!(
            view = %view.id,
            ?kind,
            from = ?transition.from,
            to = ?transition.to,
            "overlay toggled"
        );
        self.scheduler.schedule(Trigger::OverlayToggled, now);
        Some(transition)
    }

    /// Sets both flags at once, scheduling a cascade only if they changed.
    pub fn set_overlay(&mut self, flags: OverlayFlags, now: Duration) -> bool {
        let Some(view) = self.active else {
            return false;
        };
        let scope = self.overlay_scope(&view.id);
        let changed = self.overlays.set(&scope, flags);
        if changed {
            self.decorations.invalidate();
            self.scheduler.schedule(Trigger::OverlayToggled, now);
        }
        changed
    }

    pub fn resize(&mut self, width: f32, height: f32, now: Duration) {
        self.viewport = Viewport::new(width, height);
        if self.active.is_some() {
            self.scheduler.schedule(Trigger::ContainerResized, now);
        }
    }

    /// Runs every tick due at `now`. Returns how many ran.
    pub fn advance(&mut self, now: Duration) -> usize {
        let ticks = self.scheduler.due(now);
        let count = ticks.len();
        for tick in ticks {
            self.recompute(tick);
        }
        count
    }

    /// Runs the pending cascade to completion, jumping the clock to each
    /// deadline. Returns the time of the last tick.
    pub fn settle(&mut self, now: Duration) -> Duration {
        let mut clock = now;
        while let Some(deadline) = self.scheduler.next_deadline() {
            clock = clock.max(deadline);
            self.advance(clock);
        }
        clock
    }

    /// Unmounts the active view and cancels everything pending for it.
    pub fn teardown(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        if let Some(view) = self.active.take() {
            tracing::debug!(view = %view.id, cancelled, "view torn down");
        }
        self.surface.unmount();
        self.anchors.clear();
        self.decorations.invalidate();
    }

    fn recompute(&mut self, tick: Tick) {
        let Some(view) = self.active else {
            return;
        };
        self.recomputes += 1;
        let flags = self.overlay_flags();
        let decorations = self.decorations.get(self.schema_version, view, flags);

        self.surface
            .sync_geometry(view, &decorations, self.viewport, &mut self.anchors);

        let mut paths = Vec::with_capacity(view.connectors.len());
        let mut unresolved = Vec::new();
        for (index, connector) in view.connectors.iter().enumerate() {
            match self
                .router
                .route_with_labels(connector, &self.anchors, decorations.labels(index))
            {
                Ok(path) => paths.push(path),
                Err(err) => {
                    if tick.is_final {
                        tracing::warn!(view = %view.id, error = %err, "connector omitted");
                    } else {
                        tracing::debug!(
                            view = %view.id,
                            tick = tick.index,
                            error = %err,
                            "connector not routable yet"
                        );
                    }
                    unresolved.push(err);
                }
            }
        }

        let frame = Frame {
            view: view.id.clone(),
            cascade: tick.cascade,
            trigger: tick.trigger,
            tick: tick.index,
            is_final: tick.is_final,
            flags,
            paths,
            unresolved,
        };
        self.surface.present(&frame);
        self.last_frame = Some(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::Rect;
    use crate::schema::{Component, Connector, Layer};

    /// Surface that mounts one component per tick, like a slow reflow.
    #[derive(Default)]
    struct LazySurface {
        mounted: usize,
        presented: Vec<(usize, usize, bool)>,
        unmounts: usize,
    }

    impl RenderSurface for LazySurface {
        fn sync_geometry(
            &mut self,
            view: &View,
            _decorations: &Decorations,
            _viewport: Viewport,
            anchors: &mut AnchorRegistry,
        ) {
            self.mounted += 1;
            for (i, component) in view.components().take(self.mounted).enumerate() {
                anchors.register(&component.id, Rect::new(0.0, i as f32 * 100.0, 80.0, 40.0));
            }
        }

        fn present(&mut self, frame: &Frame) {
            self.presented
                .push((frame.tick, frame.paths.len(), frame.is_final));
        }

        fn unmount(&mut self) {
            self.mounted = 0;
            self.unmounts += 1;
        }
    }

    fn component(id: &str) -> Component {
        Component {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: None,
            features: Vec::new(),
            threats: Vec::new(),
            auth: None,
        }
    }

    fn schema() -> Schema {
        let view = |id: &str| View {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            layers: vec![Layer {
                id: "L1".to_string(),
                title: "L1".to_string(),
                description: String::new(),
                color: None,
                icon: None,
                threat_count: 0,
                components: vec![component("A"), component("B"), component("C")],
            }],
            connectors: vec![Connector::new("A", "B"), Connector::new("B", "C")],
        };
        Schema {
            system: "Test".to_string(),
            views: vec![view("logical"), view("identity")],
            catalogs: Default::default(),
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn cascade_converges_as_geometry_settles() {
        let schema = schema();
        let mut session = DiagramSession::new(&schema, &Config::default(), LazySurface::default());
        session.activate_view("logical", ms(0)).unwrap();
        session.settle(ms(0));

        let presented = &session.surface().presented;
        assert_eq!(presented.len(), 4);
        assert_eq!(presented[0], (0, 0, false));
        assert_eq!(presented[1], (1, 1, false));
        assert_eq!(presented[2], (2, 2, false));
        assert_eq!(presented[3], (3, 2, true));
        assert!(session.last_frame().unwrap().unresolved.is_empty());
    }

    #[test]
    fn unknown_view_is_rejected() {
        let schema = schema();
        let mut session = DiagramSession::new(&schema, &Config::default(), LazySurface::default());
        assert_eq!(
            session.activate_view("physical", ms(0)),
            Err(SessionError::UnknownView("physical".to_string()))
        );
        assert!(session.active_view().is_none());
    }

    #[test]
    fn switching_views_tears_down_the_previous_one() {
        let schema = schema();
        let mut session = DiagramSession::new(&schema, &Config::default(), LazySurface::default());
        session.activate_view("logical", ms(0)).unwrap();
        session.advance(ms(0));
        assert_eq!(session.anchors().view(), Some("logical"));

        session.activate_view("identity", ms(10)).unwrap();
        assert_eq!(session.surface().unmounts, 1);
        assert_eq!(session.anchors().view(), Some("identity"));
        assert!(session.anchors().is_empty());
        assert_eq!(session.scheduler().pending(), 4);
    }

    #[test]
    fn toggle_without_active_view_is_a_no_op() {
        let schema = schema();
        let mut session = DiagramSession::new(&schema, &Config::default(), LazySurface::default());
        assert!(session.toggle_overlay(OverlayKind::Threats, ms(0)).is_none());
        assert_eq!(session.scheduler().pending(), 0);
    }

    #[test]
    fn global_scope_survives_view_switches() {
        let schema = schema();
        let mut config = Config::default();
        config.overlay.global_views = vec!["logical".to_string(), "identity".to_string()];
        let mut session = DiagramSession::new(&schema, &config, LazySurface::default());
        session.activate_view("logical", ms(0)).unwrap();
        session.toggle_overlay(OverlayKind::Threats, ms(5));
        session.activate_view("identity", ms(10)).unwrap();
        assert!(session.overlay_flags().show_threats);
    }

    #[test]
    fn per_view_scope_resets_on_switch() {
        let schema = schema();
        let mut session = DiagramSession::new(&schema, &Config::default(), LazySurface::default());
        session.activate_view("logical", ms(0)).unwrap();
        session.toggle_overlay(OverlayKind::AuthFlow, ms(5));
        assert!(session.overlay_flags().show_auth_flow);
        session.activate_view("identity", ms(10)).unwrap();
        session.activate_view("logical", ms(20)).unwrap();
        assert!(!session.overlay_flags().show_auth_flow);
    }
}
