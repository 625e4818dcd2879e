use std::path::Path;
use std::time::Duration;

use archd::config::Config;
use archd::export::{ArtifactSink, DirectorySink, DocumentExporter, MemorySink, generation_skill};
use archd::overlay::{OverlayFlags, OverlayKind};
use archd::render::SvgSurface;
use archd::schema::{Schema, load_schema};
use archd::session::DiagramSession;

fn platform() -> Schema {
    load_schema(
        &Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/agent_platform.json5"),
    )
    .unwrap()
}

#[test]
fn export_is_deterministic() {
    let schema = platform();
    let exporter = DocumentExporter::new(&schema);
    for view in &schema.views {
        for flags in [
            OverlayFlags::OFF,
            OverlayFlags::new(true, false),
            OverlayFlags::new(false, true),
            OverlayFlags::new(true, true),
        ] {
            assert_eq!(exporter.export(view, flags), exporter.export(view, flags));
        }
    }
}

#[test]
fn toggling_and_reverting_leaves_export_unchanged() {
    let schema = platform();
    let config = Config::default();
    let surface = SvgSurface::new(config.theme.clone(), config.layout.clone()).fast_text(true);
    let mut session = DiagramSession::new(&schema, &config, surface);
    session.activate_view("logical", Duration::ZERO).unwrap();
    session.settle(Duration::ZERO);

    let exporter = DocumentExporter::new(&schema);
    let view = session.active_view().unwrap();
    let before = exporter.export(view, session.overlay_flags());

    let mut now = Duration::from_millis(100);
    for kind in [
        OverlayKind::Threats,
        OverlayKind::AuthFlow,
        OverlayKind::Threats,
        OverlayKind::AuthFlow,
    ] {
        session.toggle_overlay(kind, now);
        now += Duration::from_millis(20);
    }
    session.settle(now);

    assert_eq!(session.overlay_flags(), OverlayFlags::OFF);
    assert_eq!(exporter.export(view, session.overlay_flags()), before);
}

#[test]
fn risk_column_keeps_threats_when_overlay_is_off() {
    let schema = platform();
    let view = schema.view("logical").unwrap();
    let doc = DocumentExporter::new(&schema).export(view, OverlayFlags::OFF);

    let web = doc.lines().find(|l| l.contains("**Web Console**")).unwrap();
    assert!(web.contains("| LLM01:2025 |"));
    let gateway = doc.lines().find(|l| l.contains("**API Gateway**")).unwrap();
    let cells: Vec<&str> = gateway.split(" | ").collect();
    assert_eq!(cells[3], "-");
    assert!(!doc.contains("Threat Legend"));
}

#[test]
fn components_follow_layer_order() {
    let schema = platform();
    let view = schema.view("logical").unwrap();
    let doc = DocumentExporter::new(&schema).export(view, OverlayFlags::OFF);
    let position = |needle: &str| doc.find(needle).unwrap();
    assert!(position("### Access") < position("### Agent Runtime"));
    assert!(position("**Web Console**") < position("**API Gateway**"));
    assert!(position("**API Gateway**") < position("**Orchestrator**"));
    assert!(position("**Vector Store**") < position("## Connections"));
}

#[test]
fn legend_flags_ids_missing_from_the_catalogs() {
    let schema = platform();
    let view = schema.view("identity").unwrap();
    let doc = DocumentExporter::new(&schema).export(view, OverlayFlags::new(true, false));
    assert!(doc.contains("| ASI03 | Agentic risks | Identity and Privilege Abuse |"));
    assert!(doc.contains("| MCP11 | - | not in catalog |"));
}

#[test]
fn artifacts_reach_the_sink() {
    let schema = platform();
    let view = schema.view("physical").unwrap();
    let exporter = DocumentExporter::new(&schema);

    let mut memory = MemorySink::default();
    memory
        .deliver(&exporter.design_spec_artifact(view, OverlayFlags::OFF))
        .unwrap();
    memory.deliver(&exporter.skill_artifact()).unwrap();
    let names: Vec<&str> = memory.artifacts.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(
        names,
        ["Agent_Platform_Design_Spec.md", "Agent_Platform_Generation_Skill.md"]
    );
    assert_eq!(memory.artifacts[1].body, generation_skill());

    let dir = std::env::temp_dir().join(format!("archd-export-{}", std::process::id()));
    let mut sink = DirectorySink::new(&dir);
    for artifact in &memory.artifacts {
        sink.deliver(artifact).unwrap();
    }
    let written = std::fs::read_to_string(dir.join("Agent_Platform_Design_Spec.md")).unwrap();
    assert_eq!(written, memory.artifacts[0].body);
    std::fs::remove_dir_all(&dir).ok();
}
