//! Threat and auth-flow overlays.
//!
//! Overlay state is two booleans per scope. It only decides what the surface
//! shows; the schema is read, never written. Decorations derived from
//! (schema, view, flags) are memoized in [`DecorationCache`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::schema::{CatalogKind, ConnectorLabel, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayFlags {
    #[serde(default)]
    pub show_threats: bool,
    #[serde(default)]
    pub show_auth_flow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverlayMode {
    Off,
    ThreatsOnly,
    AuthFlowOnly,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayKind {
    Threats,
    AuthFlow,
}

impl OverlayFlags {
    pub const OFF: OverlayFlags = OverlayFlags {
        show_threats: false,
        show_auth_flow: false,
    };

    pub fn new(show_threats: bool, show_auth_flow: bool) -> Self {
        Self {
            show_threats,
            show_auth_flow,
        }
    }

    pub fn mode(self) -> OverlayMode {
        match (self.show_threats, self.show_auth_flow) {
            (false, false) => OverlayMode::Off,
            (true, false) => OverlayMode::ThreatsOnly,
            (false, true) => OverlayMode::AuthFlowOnly,
            (true, true) => OverlayMode::Both,
        }
    }

    pub fn toggled(self, kind: OverlayKind) -> Self {
        match kind {
            OverlayKind::Threats => Self {
                show_threats: !self.show_threats,
                ..self
            },
            OverlayKind::AuthFlow => Self {
                show_auth_flow: !self.show_auth_flow,
                ..self
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum OverlayScope {
    Global,
    PerView(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayTransition {
    pub scope: OverlayScope,
    pub kind: OverlayKind,
    pub from: OverlayMode,
    pub to: OverlayMode,
}

/// One global overlay instance plus one per view. Views read whichever scope
/// they were configured for.
#[derive(Debug, Clone, Default)]
pub struct OverlayStates {
    defaults: OverlayFlags,
    global: OverlayFlags,
    per_view: HashMap<String, OverlayFlags>,
}

impl OverlayStates {
    pub fn new(defaults: OverlayFlags) -> Self {
        Self {
            defaults,
            global: defaults,
            per_view: HashMap::new(),
        }
    }

    pub fn flags(&self, scope: &OverlayScope) -> OverlayFlags {
        match scope {
            OverlayScope::Global => self.global,
            OverlayScope::PerView(view) => {
                self.per_view.get(view).copied().unwrap_or(self.defaults)
            }
        }
    }

    /// Flips one flag. Only ever called on explicit user action.
    pub fn toggle(&mut self, scope: OverlayScope, kind: OverlayKind) -> OverlayTransition {
        let from = self.flags(&scope);
        let to = from.toggled(kind);
        self.store(&scope, to);
        OverlayTransition {
            scope,
            kind,
            from: from.mode(),
            to: to.mode(),
        }
    }

    pub fn set(&mut self, scope: &OverlayScope, flags: OverlayFlags) -> bool {
        let changed = self.flags(scope) != flags;
        self.store(scope, flags);
        changed
    }

    /// Restores a view's local state to the default (view switch).
    pub fn reset_view(&mut self, view_id: &str) -> bool {
        self.per_view
            .remove(view_id)
            .is_some_and(|previous| previous != self.defaults)
    }

    fn store(&mut self, scope: &OverlayScope, flags: OverlayFlags) {
        match scope {
            OverlayScope::Global => self.global = flags,
            OverlayScope::PerView(view) => {
                self.per_view.insert(view.clone(), flags);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "catalog", rename_all = "camelCase")]
pub enum BadgeKind {
    Threat(Option<CatalogKind>),
    Auth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub kind: BadgeKind,
    pub text: String,
}

/// What the surface should add on top of the schema for one view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decorations {
    pub flags: OverlayFlags,
    nodes: BTreeMap<String, Vec<Badge>>,
    connector_labels: Vec<Vec<ConnectorLabel>>,
}

impl Decorations {
    pub fn badges(&self, component_id: &str) -> &[Badge] {
        self.nodes
            .get(component_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Labels to draw for the connector at `index` in the view's list.
    pub fn labels(&self, index: usize) -> &[ConnectorLabel] {
        self.connector_labels
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn badge_count(&self) -> usize {
        self.nodes.values().map(Vec::len).sum()
    }
}

pub fn decorate(view: &View, flags: OverlayFlags) -> Decorations {
    let mut nodes = BTreeMap::new();
    for component in view.components() {
        let mut badges = Vec::new();
        if flags.show_threats {
            badges.extend(component.threats.iter().map(|id| Badge {
                kind: BadgeKind::Threat(CatalogKind::classify(id)),
                text: id.clone(),
            }));
        }
        if flags.show_auth_flow
            && let Some(auth) = &component.auth
        {
            badges.push(Badge {
                kind: BadgeKind::Auth,
                text: auth.clone(),
            });
        }
        if !badges.is_empty() {
            nodes.insert(component.id.clone(), badges);
        }
    }

    let connector_labels = view
        .connectors
        .iter()
        .map(|connector| match (&connector.auth_label, flags.show_auth_flow) {
            (Some(auth), true) => vec![ConnectorLabel::new(auth.clone())],
            _ => connector.labels.clone(),
        })
        .collect();

    Decorations {
        flags,
        nodes,
        connector_labels,
    }
}

type CacheKey = (u64, String, OverlayFlags);

/// Single-entry memo of the last decorations built.
#[derive(Debug, Default)]
pub struct DecorationCache {
    entry: Option<(CacheKey, Rc<Decorations>)>,
    builds: usize,
}

impl DecorationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &mut self,
        schema_version: u64,
        view: &View,
        flags: OverlayFlags,
    ) -> Rc<Decorations> {
        let key = (schema_version, view.id.clone(), flags);
        if let Some((cached_key, value)) = &self.entry
            && *cached_key == key
        {
            return Rc::clone(value);
        }
        let value = Rc::new(decorate(view, flags));
        self.builds += 1;
        self.entry = Some((key, Rc::clone(&value)));
        value
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Number of times decorations were rebuilt.
    pub fn builds(&self) -> usize {
        self.builds
    }
}
