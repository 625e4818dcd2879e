use crate::icons::IconLookup;
use crate::overlay::OverlayFlags;
use crate::render::{Scene, SvgSurface};
use crate::routing::{RoutedPath, RoutingError};
use crate::session::Frame;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDump {
    pub view: String,
    pub width: f32,
    pub height: f32,
    pub flags: OverlayFlags,
    pub layers: Vec<LayerDump>,
    pub nodes: Vec<NodeDump>,
    pub connectors: Vec<RoutedPath>,
    pub omitted: Vec<OmittedDump>,
}

#[derive(Debug, Serialize)]
pub struct LayerDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub components: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub layer: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub badges: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OmittedDump {
    pub connector: String,
    pub reason: String,
}

impl SceneDump {
    pub fn from_scene(scene: &Scene, frame: Option<&Frame>) -> Self {
        let layers = scene
            .bands
            .iter()
            .map(|band| LayerDump {
                id: band.id.clone(),
                x: band.rect.x,
                y: band.rect.y,
                width: band.rect.width,
                height: band.rect.height,
                components: scene
                    .nodes
                    .iter()
                    .filter(|node| node.layer == band.id)
                    .map(|node| node.id.clone())
                    .collect(),
            })
            .collect();

        let nodes = scene
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                layer: node.layer.clone(),
                x: node.rect.x,
                y: node.rect.y,
                width: node.rect.width,
                height: node.rect.height,
                badges: node.badges.iter().map(|badge| badge.text.clone()).collect(),
            })
            .collect();

        let (connectors, omitted) = match frame {
            Some(frame) => (
                frame.paths.clone(),
                frame
                    .unresolved
                    .iter()
                    .map(|err| match err {
                        RoutingError::UnresolvedAnchor { connector, .. } => OmittedDump {
                            connector: connector.clone(),
                            reason: err.to_string(),
                        },
                    })
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        SceneDump {
            view: scene.view.clone(),
            width: scene.width,
            height: scene.height,
            flags: scene.flags,
            layers,
            nodes,
            connectors,
            omitted,
        }
    }

    /// Dump of whatever the surface currently shows, if it has a scene.
    pub fn from_surface<I: IconLookup>(surface: &SvgSurface<I>) -> Option<Self> {
        surface
            .scene()
            .map(|scene| Self::from_scene(scene, surface.frame()))
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn write_scene_dump(path: &Path, dump: &SceneDump) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, dump)?;
    tracing::info!(path = %path.display(), nodes = dump.nodes.len(), "scene dump written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::schema::Schema;
    use crate::session::DiagramSession;
    use std::time::Duration;

    const SCHEMA: &str = r#"{
        system: "Dump",
        views: [{
            id: "logical",
            title: "Logical",
            layers: [{
                id: "L1",
                title: "Edge",
                components: [
                    { id: "A", name: "Gateway", threats: ["LLM01:2025"] },
                    { id: "B", name: "Agent" },
                ],
            }],
            connectors: [
                { from: "A", to: "B" },
                { from: "A", to: "Ghost" },
            ],
        }],
    }"#;

    #[test]
    fn dump_lists_routed_and_omitted_connectors() {
        let schema = Schema::from_json5(SCHEMA).unwrap();
        let config = Config::default();
        let surface = SvgSurface::new(config.theme.clone(), config.layout.clone()).fast_text(true);
        let mut session = DiagramSession::new(&schema, &config, surface);
        session.activate_view("logical", Duration::ZERO).unwrap();
        session.settle(Duration::ZERO);

        let dump = SceneDump::from_surface(session.surface()).unwrap();
        assert_eq!(dump.view, "logical");
        assert_eq!(dump.layers[0].components, vec!["A", "B"]);
        assert_eq!(dump.connectors.len(), 1);
        assert_eq!(dump.omitted.len(), 1);
        assert_eq!(dump.omitted[0].connector, "A->Ghost");

        let json = dump.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nodes"][0]["id"], "A");
        assert_eq!(value["flags"]["showThreats"], false);
    }
}
