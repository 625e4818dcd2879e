use std::collections::HashSet;

use super::{CatalogKind, ThreatCatalogs, View};

/// Invariant violations in authored configuration. Only produced when a
/// validation pass is invoked explicitly; the render path never runs them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("view `{view}`: duplicate component id `{id}`")]
    DuplicateId { view: String, id: String },
    #[error("view `{view}`: connector `{connector}` references unknown component `{id}`")]
    DanglingConnectorReference {
        view: String,
        connector: String,
        id: String,
    },
    #[error("{catalog} catalog: duplicate entry id `{id}`")]
    DuplicateCatalogId { catalog: CatalogKind, id: String },
}

pub fn validate_unique_ids(view: &View) -> Result<(), SchemaError> {
    match duplicate_ids(view).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub fn validate_connector_references(view: &View) -> Result<(), SchemaError> {
    match dangling_references(view).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub fn validate_catalog_ids(catalogs: &ThreatCatalogs) -> Result<(), SchemaError> {
    match duplicate_catalog_ids(catalogs).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

pub(super) fn duplicate_ids(view: &View) -> Vec<SchemaError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();
    for component in view.components() {
        if !seen.insert(component.id.as_str()) {
            errors.push(SchemaError::DuplicateId {
                view: view.id.clone(),
                id: component.id.clone(),
            });
        }
    }
    errors
}

pub(super) fn dangling_references(view: &View) -> Vec<SchemaError> {
    let known: HashSet<&str> = view.components().map(|c| c.id.as_str()).collect();
    let mut errors = Vec::new();
    for connector in &view.connectors {
        for endpoint in [&connector.from, &connector.to] {
            if !known.contains(endpoint.as_str()) {
                errors.push(SchemaError::DanglingConnectorReference {
                    view: view.id.clone(),
                    connector: connector.key(),
                    id: endpoint.clone(),
                });
            }
        }
    }
    errors
}

pub(super) fn duplicate_catalog_ids(catalogs: &ThreatCatalogs) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    for kind in CatalogKind::ALL {
        let mut seen = HashSet::new();
        for entry in catalogs.catalog(kind) {
            if !seen.insert(entry.id.as_str()) {
                errors.push(SchemaError::DuplicateCatalogId {
                    catalog: kind,
                    id: entry.id.clone(),
                });
            }
        }
    }
    errors
}

/// A layer whose authored `threatCount` badge disagrees with the threat
/// references of its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatCountDrift {
    pub layer: String,
    pub declared: u32,
    pub referenced: usize,
}

pub fn threat_count_drift(view: &View) -> Vec<ThreatCountDrift> {
    view.layers
        .iter()
        .filter_map(|layer| {
            let referenced: usize = layer.components.iter().map(|c| c.threats.len()).sum();
            (referenced != layer.threat_count as usize).then(|| ThreatCountDrift {
                layer: layer.id.clone(),
                declared: layer.threat_count,
                referenced,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownThreatRef {
    pub component: String,
    pub id: String,
}

pub fn unknown_threat_refs(view: &View, catalogs: &ThreatCatalogs) -> Vec<UnknownThreatRef> {
    view.components()
        .flat_map(|component| {
            component
                .threats
                .iter()
                .filter(|id| catalogs.lookup(id).is_none())
                .map(|id| UnknownThreatRef {
                    component: component.id.clone(),
                    id: id.clone(),
                })
        })
        .collect()
}
