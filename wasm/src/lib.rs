use archd::{OverlayFlags, RenderOptions, Schema, render_view_svg};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagramRenderOptions {
    theme: Option<String>,
    view: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    width: Option<f32>,
    show_threats: Option<bool>,
    show_auth_flow: Option<bool>,
}

fn build_render_options(options: &DiagramRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("classic") {
        RenderOptions::classic()
    } else {
        RenderOptions::modern()
    };

    if let Some(font_family) = &options.font_family {
        render_options.config.theme.font_family = font_family.clone();
    }
    if let Some(font_size) = options.font_size {
        render_options.config.theme.font_size = font_size;
    }
    if let Some(width) = options.width {
        render_options.config.render.width = width;
    }

    // No system fonts inside the browser sandbox.
    render_options
        .with_fast_text(true)
        .with_overlay(OverlayFlags::new(
            options.show_threats.unwrap_or(false),
            options.show_auth_flow.unwrap_or(false),
        ))
}

fn parse_options(options_json: Option<String>) -> Result<DiagramRenderOptions, JsValue> {
    match options_json {
        Some(raw) => {
            serde_json::from_str(&raw).map_err(|error| JsValue::from_str(&error.to_string()))
        }
        None => Ok(DiagramRenderOptions::default()),
    }
}

fn view_id(schema: &Schema, requested: Option<&str>) -> Result<String, JsValue> {
    match requested {
        Some(id) => Ok(id.to_string()),
        None => schema
            .views
            .first()
            .map(|view| view.id.clone())
            .ok_or_else(|| JsValue::from_str("schema has no views")),
    }
}

#[wasm_bindgen]
pub fn render_diagram_svg(
    schema_json5: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = parse_options(options_json)?;
    let schema =
        Schema::from_json5(schema_json5).map_err(|error| JsValue::from_str(&error.to_string()))?;
    let view = view_id(&schema, options.view.as_deref())?;
    render_view_svg(&schema, &view, &build_render_options(&options))
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

#[wasm_bindgen]
pub fn export_markdown(
    schema_json5: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = parse_options(options_json)?;
    let schema =
        Schema::from_json5(schema_json5).map_err(|error| JsValue::from_str(&error.to_string()))?;
    let id = view_id(&schema, options.view.as_deref())?;
    let view = schema
        .view(&id)
        .ok_or_else(|| JsValue::from_str(&format!("unknown view `{id}`")))?;
    let flags = build_render_options(&options).overlay;
    Ok(archd::DocumentExporter::new(&schema).export(view, flags))
}

#[cfg(test)]
mod tests {
    use archd::{Schema, render_view_svg};

    use crate::{DiagramRenderOptions, build_render_options};

    #[test]
    fn renders_view_with_labels_and_badges() {
        let schema = Schema::from_json5(
            r#"{
                system: "Demo",
                views: [{
                    id: "logical",
                    title: "Logical",
                    layers: [
                        { id: "L1", title: "Edge", components: [{ id: "gw", name: "Gateway", threats: ["LLM01:2025"] }] },
                        { id: "L2", title: "Core", components: [{ id: "agent", name: "Agent" }] },
                    ],
                    connectors: [{ from: "gw", to: "agent", labels: [{ text: "yes" }] }],
                }],
            }"#,
        )
        .unwrap();
        let options = DiagramRenderOptions {
            show_threats: Some(true),
            ..Default::default()
        };

        let svg = render_view_svg(&schema, "logical", &build_render_options(&options))
            .expect("view should render");

        assert!(svg.contains("<svg"));
        assert!(svg.contains("yes"));
        assert!(svg.contains("LLM01:2025"));
    }
}
