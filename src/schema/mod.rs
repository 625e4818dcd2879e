//! Declarative diagram schema: views, layers, components, connectors and the
//! threat catalogs they cite. Loaded once and handed to every consumer.

mod catalog;
mod validate;

pub use catalog::{CatalogKind, ThreatCatalogEntry, ThreatCatalogs};
pub use validate::{
    SchemaError, ThreatCountDrift, UnknownThreatRef, threat_count_drift, unknown_threat_refs,
    validate_catalog_ids, validate_connector_references, validate_unique_ids,
};

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// System name, used for exported artifact filenames.
    pub system: String,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default = "ThreatCatalogs::builtin")]
    pub catalogs: ThreatCatalogs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Authored badge value. Not derived from the components' threat lists.
    #[serde(default)]
    pub threat_count: u32,
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub threats: Vec<String>,
    /// Authentication method shown by the auth-flow overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl AnchorSide {
    pub fn is_vertical_exit(self) -> bool {
        matches!(self, AnchorSide::Top | AnchorSide::Bottom)
    }

    /// Unit normal pointing away from the box on this side.
    pub fn normal(self) -> (f32, f32) {
        match self {
            AnchorSide::Top => (0.0, -1.0),
            AnchorSide::Bottom => (0.0, 1.0),
            AnchorSide::Left => (-1.0, 0.0),
            AnchorSide::Right => (1.0, 0.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnchorSide::Top => "top",
            AnchorSide::Bottom => "bottom",
            AnchorSide::Left => "left",
            AnchorSide::Right => "right",
        }
    }
}

/// Attachment point of a connector endpoint. A missing side is chosen from
/// the relative position of the two boxes at routing time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<AnchorSide>,
    #[serde(default)]
    pub offset: f32,
}

impl AnchorSpec {
    pub fn side(side: AnchorSide) -> Self {
        Self {
            side: Some(side),
            offset: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }
}

/// A 0..=1 fraction. Authored either as a number (`0.3`) or as a percentage
/// string (`"30%"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FractionRepr", into = "f32")]
pub struct Fraction(f32);

impl Fraction {
    pub const HALF: Fraction = Fraction(0.5);

    pub fn new(value: f32) -> Self {
        Fraction(if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.5 })
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl From<Fraction> for f32 {
    fn from(value: Fraction) -> Self {
        value.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FractionRepr {
    Number(f32),
    Text(String),
}

impl TryFrom<FractionRepr> for Fraction {
    type Error = String;

    fn try_from(repr: FractionRepr) -> Result<Self, Self::Error> {
        match repr {
            FractionRepr::Number(value) => Ok(Fraction::new(value)),
            FractionRepr::Text(text) => {
                let trimmed = text.trim();
                let value = if let Some(percent) = trimmed.strip_suffix('%') {
                    percent
                        .trim()
                        .parse::<f32>()
                        .map(|v| v / 100.0)
                        .map_err(|_| format!("invalid percentage `{text}`"))?
                } else {
                    trimmed
                        .parse::<f32>()
                        .map_err(|_| format!("invalid fraction `{text}`"))?
                };
                Ok(Fraction::new(value))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum PathStyle {
    #[default]
    Straight,
    Smooth {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        curvature: Option<f32>,
    },
    #[serde(rename_all = "camelCase")]
    Grid {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grid_break: Option<Fraction>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorLabel {
    pub text: String,
    /// Fraction of the path length; the midpoint when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Fraction>,
}

impl ConnectorLabel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub start_anchor: AnchorSpec,
    #[serde(default)]
    pub end_anchor: AnchorSpec,
    #[serde(default)]
    pub path: PathStyle,
    #[serde(default)]
    pub labels: Vec<ConnectorLabel>,
    /// Replaces `labels` while the auth-flow overlay is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
    #[serde(default = "default_show_head")]
    pub show_head: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_size: Option<f32>,
}

fn default_show_head() -> bool {
    true
}

impl Connector {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: None,
            from: from.into(),
            to: to.into(),
            start_anchor: AnchorSpec::default(),
            end_anchor: AnchorSpec::default(),
            path: PathStyle::Straight,
            labels: Vec::new(),
            auth_label: None,
            color: None,
            width: None,
            dash: None,
            show_head: true,
            head_size: None,
        }
    }

    /// Stable key for logs and frame lookups: the authored id, or `from->to`.
    pub fn key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}->{}", self.from, self.to),
        }
    }
}

impl View {
    /// Components in layer order, then component order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.layers.iter().flat_map(|layer| layer.components.iter())
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components().find(|component| component.id == id)
    }

    pub fn layer_of(&self, component_id: &str) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|layer| layer.components.iter().any(|c| c.id == component_id))
    }
}

impl Schema {
    pub fn from_json5(source: &str) -> anyhow::Result<Self> {
        Ok(json5::from_str(source)?)
    }

    pub fn view(&self, view_id: &str) -> Option<&View> {
        self.views.iter().find(|view| view.id == view_id)
    }

    pub fn get_component(&self, view_id: &str, component_id: &str) -> Option<&Component> {
        self.view(view_id)?.component(component_id)
    }

    /// Runs every invariant check and collects all violations.
    pub fn validate(&self) -> Vec<SchemaError> {
        let mut errors = Vec::new();
        for view in &self.views {
            errors.extend(validate::duplicate_ids(view));
            errors.extend(validate::dangling_references(view));
        }
        errors.extend(validate::duplicate_catalog_ids(&self.catalogs));
        errors
    }

    /// Content hash, used to key caches of derived view models.
    pub fn version(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        serde_json::to_vec(self)
            .unwrap_or_default()
            .hash(&mut hasher);
        hasher.finish()
    }
}

pub fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    let contents = std::fs::read_to_string(path)?;
    Schema::from_json5(&contents)
        .map_err(|err| anyhow::anyhow!("{}: {err}", path.display()))
}
