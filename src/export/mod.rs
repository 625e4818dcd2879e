//! Deterministic Markdown projection of a view.
//!
//! The document is a pure function of the schema, the view and the overlay
//! flags. Risk and auth columns are always written; the threat overlay only
//! adds a legend that resolves the referenced catalog ids.

mod artifact;
mod skill;

pub use artifact::{
    Artifact, ArtifactSink, DirectorySink, MARKDOWN_MIME, MemorySink, artifact_filename,
};
pub use skill::generation_skill;

use std::fmt::Write as _;

use crate::overlay::OverlayFlags;
use crate::schema::{Component, Connector, PathStyle, Schema, View};

const PLACEHOLDER: &str = "-";

pub struct DocumentExporter<'a> {
    schema: &'a Schema,
}

impl<'a> DocumentExporter<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn export(&self, view: &View, overlay: OverlayFlags) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {} Design Spec", cell(&self.schema.system));
        out.push('\n');
        let _ = writeln!(out, "## {} (`{}`)", cell(&view.title), cell(&view.id));
        if !view.description.trim().is_empty() {
            out.push('\n');
            let _ = writeln!(out, "{}", view.description.trim());
        }

        for layer in &view.layers {
            out.push('\n');
            let _ = writeln!(out, "### {}", cell(&layer.title));
            if !layer.description.trim().is_empty() {
                out.push('\n');
                let _ = writeln!(out, "{}", layer.description.trim());
            }
            out.push('\n');
            let _ = writeln!(out, "Threat count: {}", layer.threat_count);
            out.push('\n');
            if layer.components.is_empty() {
                let _ = writeln!(out, "_No components._");
                continue;
            }
            out.push_str("| Component | Description | Features | Risks | Auth |\n");
            out.push_str("| --- | --- | --- | --- | --- |\n");
            for component in &layer.components {
                component_row(&mut out, component);
            }
        }

        if !view.connectors.is_empty() {
            out.push('\n');
            out.push_str("## Connections\n\n");
            out.push_str("| From | To | Path | Labels | Auth |\n");
            out.push_str("| --- | --- | --- | --- | --- |\n");
            for connector in &view.connectors {
                connector_row(&mut out, view, connector);
            }
        }

        if overlay.show_threats {
            self.legend(&mut out, view);
        }
        out
    }

    /// `<System>_Design_Spec.md`
    pub fn design_spec_artifact(&self, view: &View, overlay: OverlayFlags) -> Artifact {
        Artifact::markdown(
            artifact_filename(&self.schema.system, "Design_Spec"),
            self.export(view, overlay),
        )
    }

    /// `<System>_Generation_Skill.md`
    pub fn skill_artifact(&self) -> Artifact {
        Artifact::markdown(
            artifact_filename(&self.schema.system, "Generation_Skill"),
            generation_skill(),
        )
    }

    fn legend(&self, out: &mut String, view: &View) {
        let mut seen: Vec<&str> = Vec::new();
        for component in view.components() {
            for id in &component.threats {
                if !seen.contains(&id.as_str()) {
                    seen.push(id.as_str());
                }
            }
        }
        if seen.is_empty() {
            return;
        }
        out.push('\n');
        out.push_str("## Threat Legend\n\n");
        out.push_str("| Id | Catalog | Name |\n");
        out.push_str("| --- | --- | --- |\n");
        for id in seen {
            match self.schema.catalogs.lookup(id) {
                Some((kind, entry)) => {
                    let _ = writeln!(out, "| {} | {} | {} |", cell(id), kind, cell(&entry.name));
                }
                None => {
                    let _ = writeln!(out, "| {} | {PLACEHOLDER} | not in catalog |", cell(id));
                }
            }
        }
    }
}

fn component_row(out: &mut String, component: &Component) {
    let features = if component.features.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        component
            .features
            .iter()
            .map(|feature| cell(feature))
            .collect::<Vec<_>>()
            .join("<br>")
    };
    let risks = if component.threats.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        component
            .threats
            .iter()
            .map(|id| cell(id))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let _ = writeln!(
        out,
        "| **{}** (`{}`) | {} | {} | {} | {} |",
        cell(&component.name),
        cell(&component.id),
        or_placeholder(&component.description),
        features,
        risks,
        component
            .auth
            .as_deref()
            .map(or_placeholder)
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
    );
}

fn connector_row(out: &mut String, view: &View, connector: &Connector) {
    let name = |id: &str| match view.component(id) {
        Some(component) => cell(&component.name),
        None => format!("`{}` (missing)", cell(id)),
    };
    let path = match connector.path {
        PathStyle::Straight => "straight".to_string(),
        PathStyle::Smooth { .. } => "smooth".to_string(),
        PathStyle::Grid { grid_break } => match grid_break {
            Some(fraction) => format!("grid {:.0}%", fraction.get() * 100.0),
            None => "grid".to_string(),
        },
    };
    let labels = if connector.labels.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        connector
            .labels
            .iter()
            .map(|label| cell(&label.text))
            .collect::<Vec<_>>()
            .join(" / ")
    };
    let _ = writeln!(
        out,
        "| {} | {} | {} | {} | {} |",
        name(&connector.from),
        name(&connector.to),
        path,
        labels,
        connector
            .auth_label
            .as_deref()
            .map(or_placeholder)
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
    );
}

/// Table-safe text: pipes escaped, line breaks folded.
fn cell(text: &str) -> String {
    text.trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

fn or_placeholder(text: &str) -> String {
    if text.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        cell(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        system: "Agent Platform",
        views: [{
            id: "logical",
            title: "Logical",
            layers: [{
                id: "L1",
                title: "Edge",
                threatCount: 1,
                components: [
                    { id: "A", name: "Gateway", description: "Ingress | routing", features: ["TLS"], threats: ["LLM01:2025"], auth: "OIDC" },
                    { id: "B", name: "Agent", threats: [] },
                ],
            }],
            connectors: [
                { from: "A", to: "B", path: { style: "grid", gridBreak: "50%" }, labels: [{ text: "HTTPS" }], authLabel: "JWT" },
            ],
        }],
    }"#;

    fn row<'a>(doc: &'a str, needle: &str) -> &'a str {
        doc.lines().find(|line| line.contains(needle)).unwrap()
    }

    #[test]
    fn risk_column_is_overlay_independent() {
        let schema = Schema::from_json5(SCHEMA).unwrap();
        let view = schema.view("logical").unwrap();
        let exporter = DocumentExporter::new(&schema);

        for flags in [OverlayFlags::OFF, OverlayFlags::new(true, false)] {
            let doc = exporter.export(view, flags);
            let a = row(&doc, "**Gateway**");
            let b = row(&doc, "**Agent**");
            assert!(a.contains("LLM01:2025"));
            let b_cells: Vec<&str> = b.split(" | ").collect();
            assert_eq!(b_cells[3], "-");
        }
    }

    #[test]
    fn legend_only_with_threats_shown() {
        let schema = Schema::from_json5(SCHEMA).unwrap();
        let view = schema.view("logical").unwrap();
        let exporter = DocumentExporter::new(&schema);
        let off = exporter.export(view, OverlayFlags::OFF);
        let on = exporter.export(view, OverlayFlags::new(true, true));
        assert!(!off.contains("## Threat Legend"));
        assert!(on.contains("| LLM01:2025 | LLM risks | Prompt Injection |"));
        assert!(on.starts_with(&off));
    }

    #[test]
    fn cells_are_escaped_and_connections_listed() {
        let schema = Schema::from_json5(SCHEMA).unwrap();
        let view = schema.view("logical").unwrap();
        let doc = DocumentExporter::new(&schema).export(view, OverlayFlags::OFF);
        assert!(doc.contains("Ingress \\| routing"));
        assert!(doc.contains("| Gateway | Agent | grid 50% | HTTPS | JWT |"));
    }

    #[test]
    fn pipes_in_ids_keep_rows_well_formed() {
        let schema = Schema::from_json5(
            r#"{
                system: "Pipes",
                views: [{
                    id: "v|1",
                    title: "Piped",
                    layers: [{
                        id: "L1",
                        title: "Edge",
                        components: [{ id: "a|b", name: "A" }],
                    }],
                    connectors: [{ from: "a|b", to: "x|y" }],
                }],
            }"#,
        )
        .unwrap();
        let view = schema.view("v|1").unwrap();
        let doc = DocumentExporter::new(&schema).export(view, OverlayFlags::OFF);
        let columns = |line: &str| line.replace("\\|", "").matches('|').count() - 1;

        assert!(doc.contains("## Piped (`v\\|1`)"));
        let component = row(&doc, "**A**");
        assert_eq!(component, "| **A** (`a\\|b`) | - | - | - | - |");
        assert_eq!(columns(component), 5);
        let connector = row(&doc, "(missing)");
        assert_eq!(columns(connector), 5);
        assert!(connector.contains("`x\\|y` (missing)"));
    }

    #[test]
    fn artifacts_are_named_after_the_system() {
        let schema = Schema::from_json5(SCHEMA).unwrap();
        let view = schema.view("logical").unwrap();
        let exporter = DocumentExporter::new(&schema);
        let spec = exporter.design_spec_artifact(view, OverlayFlags::OFF);
        assert_eq!(spec.filename, "Agent_Platform_Design_Spec.md");
        assert_eq!(spec.mime, "text/markdown");
        let skill = exporter.skill_artifact();
        assert_eq!(skill.filename, "Agent_Platform_Generation_Skill.md");
        assert_eq!(skill.body, generation_skill());
    }
}
