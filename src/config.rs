use crate::overlay::OverlayFlags;
use crate::scheduler::DEFAULT_CASCADE_MS;
use crate::schema::Fraction;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Box-model metrics of the reference SVG surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub padding: f32,
    pub title_height: f32,
    pub layer_gap: f32,
    pub layer_header_height: f32,
    pub layer_padding_x: f32,
    pub layer_padding_y: f32,
    pub node_gap: f32,
    pub node_min_width: f32,
    pub node_max_width: f32,
    pub node_padding: f32,
    pub node_title_height: f32,
    pub feature_line_height: f32,
    pub feature_font_scale: f32,
    pub badge_height: f32,
    pub badge_gap: f32,
    pub badge_font_scale: f32,
    pub icon_size: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 24.0,
            title_height: 36.0,
            layer_gap: 20.0,
            layer_header_height: 34.0,
            layer_padding_x: 20.0,
            layer_padding_y: 14.0,
            node_gap: 28.0,
            node_min_width: 140.0,
            node_max_width: 260.0,
            node_padding: 10.0,
            node_title_height: 22.0,
            feature_line_height: 16.0,
            feature_font_scale: 0.82,
            badge_height: 18.0,
            badge_gap: 4.0,
            badge_font_scale: 0.75,
            icon_size: 18.0,
            label_padding_x: 6.0,
            label_padding_y: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    /// Bow of `smooth` connectors as a fraction of the endpoint distance.
    pub curvature: f32,
    /// Where `grid` connectors cross, as a fraction of the travel distance.
    /// Accepts `0.3` or `"30%"`, like the schema's `gridBreak`.
    pub grid_break: Fraction,
    pub head_size: f32,
    pub stroke_width: f32,
    pub label_position: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            curvature: 0.25,
            grid_break: Fraction::HALF,
            head_size: 8.0,
            stroke_width: 1.5,
            label_position: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    pub cascade_ms: Vec<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cascade_ms: DEFAULT_CASCADE_MS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    /// Views that read the diagram-global overlay instead of their own.
    pub global_views: Vec<String>,
    pub defaults: OverlayFlags,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            global_views: Vec::new(),
            defaults: OverlayFlags::OFF,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub routing: RoutingConfig,
    pub scheduler: SchedulerConfig,
    pub overlay: OverlayConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            routing: RoutingConfig::default(),
            scheduler: SchedulerConfig::default(),
            overlay: OverlayConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    text_color: Option<String>,
    node_fill: Option<String>,
    node_border: Option<String>,
    line_color: Option<String>,
    threat_badge_fill: Option<String>,
    auth_badge_fill: Option<String>,
    layer_palette: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfig>,
    routing: Option<RoutingConfig>,
    scheduler: Option<SchedulerConfig>,
    overlay: Option<OverlayConfig>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "classic" | "default" | "base" => config.theme = Theme::classic(),
            other => tracing::warn!(theme = other, "unknown theme, keeping default"),
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = v;
        }
        if let Some(v) = vars.node_border {
            config.theme.node_border = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.threat_badge_fill {
            config.theme.threat_badge_fill = v;
        }
        if let Some(v) = vars.auth_badge_fill {
            config.theme.auth_badge_fill = v;
        }
        if let Some(v) = vars.layer_palette
            && !v.is_empty()
        {
            config.theme.layer_palette = v;
        }
    }

    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(routing) = parsed.routing {
        config.routing = routing;
    }
    if let Some(scheduler) = parsed.scheduler {
        config.scheduler = scheduler;
    }
    if let Some(overlay) = parsed.overlay {
        config.overlay = overlay;
    }
    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.scheduler.cascade_ms, vec![0, 50, 150, 300]);
        assert_eq!(config.routing.grid_break, Fraction::HALF);
    }

    #[test]
    fn partial_sections_merge_onto_defaults() {
        let config = parse_config(
            r##"{
                "theme": "classic",
                "themeVariables": { "lineColor": "#FF0000", "fontSize": 12 },
                "routing": { "gridBreak": "30%" },
                "scheduler": { "cascadeMs": [0, 100] },
                "overlay": { "globalViews": ["identity"], "defaults": { "showThreats": true } },
                "render": { "width": 640 }
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.line_color, "#FF0000");
        assert_eq!(config.theme.font_size, 12.0);
        assert_eq!(config.theme.node_border, Theme::classic().node_border);
        assert!((config.routing.grid_break.get() - 0.3).abs() < 1e-6);
        assert_eq!(config.routing.head_size, 8.0);
        assert_eq!(config.scheduler.cascade_ms, vec![0, 100]);
        assert_eq!(config.overlay.global_views, vec!["identity".to_string()]);
        assert!(config.overlay.defaults.show_threats);
        assert_eq!(config.render.width, 640.0);
        assert_eq!(config.render.height, 800.0);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(parse_config("{ not json").is_err());
    }
}
