use serde::Serialize;

use super::{RenderSurface, Viewport, escape_xml};
use crate::anchors::{AnchorRegistry, Rect};
use crate::config::LayoutConfig;
use crate::icons::{IconLookup, IconTable};
use crate::overlay::{Badge, BadgeKind, Decorations, OverlayFlags};
use crate::routing::RoutedPath;
use crate::schema::View;
use crate::session::Frame;
use crate::text_metrics::text_width;
use crate::theme::Theme;

// Badge pill padding around its text.
const BADGE_PAD_X: f32 = 4.0;
const NODE_RADIUS: f32 = 8.0;
const BAND_RADIUS: f32 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeBox {
    pub id: String,
    pub layer: String,
    pub rect: Rect,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub features: Vec<String>,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandLayout {
    pub id: String,
    pub title: String,
    pub description: String,
    pub fill: String,
    pub rect: Rect,
    pub threat_count: u32,
}

/// Box model of one view: layer bands stacked vertically, components
/// flowing left to right inside them and wrapping like inline blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub view: String,
    pub title: String,
    pub flags: OverlayFlags,
    pub width: f32,
    pub height: f32,
    pub bands: Vec<BandLayout>,
    pub nodes: Vec<NodeBox>,
}

impl Scene {
    pub fn node(&self, id: &str) -> Option<&NodeBox> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

struct Measure<'a> {
    theme: &'a Theme,
    config: &'a LayoutConfig,
    fast: bool,
}

impl Measure<'_> {
    fn width(&self, text: &str, scale: f32) -> f32 {
        text_width(
            text,
            self.theme.font_size * scale,
            &self.theme.font_family,
            self.fast,
        )
    }

    fn badge_width(&self, badge: &Badge) -> f32 {
        self.width(&badge.text, self.config.badge_font_scale) + BADGE_PAD_X * 2.0
    }

    fn badge_rows(&self, badges: &[Badge], inner_width: f32) -> usize {
        if badges.is_empty() {
            return 0;
        }
        let mut rows = 1;
        let mut cursor = 0.0f32;
        for badge in badges {
            let w = self.badge_width(badge);
            if cursor > 0.0 && cursor + w > inner_width {
                rows += 1;
                cursor = 0.0;
            }
            cursor += w + self.config.badge_gap;
        }
        rows
    }
}

pub fn layout_scene(
    view: &View,
    decorations: &Decorations,
    viewport: Viewport,
    theme: &Theme,
    config: &LayoutConfig,
    icons: &dyn IconLookup,
    fast_text: bool,
) -> Scene {
    let measure = Measure {
        theme,
        config,
        fast: fast_text,
    };
    let band_x = config.padding;
    let band_width = (viewport.width - config.padding * 2.0)
        .max(config.node_min_width + config.layer_padding_x * 2.0);
    let inner_width = band_width - config.layer_padding_x * 2.0;

    let mut bands = Vec::with_capacity(view.layers.len());
    let mut nodes = Vec::new();
    let mut y = config.padding + config.title_height;

    for (layer_idx, layer) in view.layers.iter().enumerate() {
        // Size every node first, then break into rows.
        let sized: Vec<(usize, f32, f32)> = layer
            .components
            .iter()
            .enumerate()
            .map(|(idx, component)| {
                let badges = decorations.badges(&component.id);
                let icon_w = if component.icon.is_some() {
                    config.icon_size + 6.0
                } else {
                    0.0
                };
                let mut content = measure.width(&component.name, 1.0) + icon_w;
                for feature in &component.features {
                    content = content.max(measure.width(feature, config.feature_font_scale));
                }
                let width = (content + config.node_padding * 2.0)
                    .clamp(config.node_min_width, config.node_max_width.max(config.node_min_width))
                    .min(inner_width.max(config.node_min_width));
                let badge_rows = measure.badge_rows(badges, width - config.node_padding * 2.0);
                let height = config.node_padding * 2.0
                    + config.node_title_height
                    + component.features.len() as f32 * config.feature_line_height
                    + badge_rows as f32 * (config.badge_height + config.badge_gap);
                (idx, width, height)
            })
            .collect();

        let mut rows: Vec<Vec<(usize, f32, f32)>> = Vec::new();
        let mut row_width = 0.0f32;
        for item in sized {
            let widened = row_width + config.node_gap + item.1;
            if let Some(row) = rows.last_mut().filter(|_| widened <= inner_width) {
                row.push(item);
                row_width = widened;
            } else {
                row_width = item.1;
                rows.push(vec![item]);
            }
        }

        let band_y = y;
        let mut row_y = band_y + config.layer_header_height + config.layer_padding_y;
        for (row_idx, row) in rows.iter().enumerate() {
            if row_idx > 0 {
                row_y += config.node_gap;
            }
            let total: f32 = row.iter().map(|(_, w, _)| *w).sum::<f32>()
                + config.node_gap * (row.len().saturating_sub(1)) as f32;
            let mut x = band_x + config.layer_padding_x + (inner_width - total).max(0.0) / 2.0;
            let mut row_height = 0.0f32;
            for &(idx, width, height) in row {
                let component = &layer.components[idx];
                nodes.push(NodeBox {
                    id: component.id.clone(),
                    layer: layer.id.clone(),
                    rect: Rect::new(x, row_y, width, height),
                    name: component.name.clone(),
                    description: component.description.clone(),
                    icon: component
                        .icon
                        .as_deref()
                        .and_then(|token| icons.glyph(token))
                        .map(str::to_string),
                    features: component.features.clone(),
                    badges: decorations.badges(&component.id).to_vec(),
                });
                x += width + config.node_gap;
                row_height = row_height.max(height);
            }
            row_y += row_height;
        }
        let content_bottom = if rows.is_empty() {
            band_y + config.layer_header_height
        } else {
            row_y
        };
        let band_height = content_bottom + config.layer_padding_y - band_y;

        bands.push(BandLayout {
            id: layer.id.clone(),
            title: layer.title.clone(),
            description: layer.description.clone(),
            fill: theme.layer_fill(layer.color.as_deref(), layer_idx),
            rect: Rect::new(band_x, band_y, band_width, band_height),
            threat_count: layer.threat_count,
        });
        y = band_y + band_height + config.layer_gap;
    }

    let height = if bands.is_empty() {
        y + config.padding
    } else {
        y - config.layer_gap + config.padding
    };
    Scene {
        view: view.id.clone(),
        title: view.title.clone(),
        flags: decorations.flags,
        width: band_width + config.padding * 2.0,
        height,
        bands,
        nodes,
    }
}

/// Reference surface: lays views out as layer bands and renders SVG.
pub struct SvgSurface<I: IconLookup = IconTable> {
    theme: Theme,
    config: LayoutConfig,
    icons: I,
    fast_text: bool,
    scene: Option<Scene>,
    frame: Option<Frame>,
}

impl SvgSurface<IconTable> {
    pub fn new(theme: Theme, config: LayoutConfig) -> Self {
        Self::with_icons(theme, config, IconTable::builtin())
    }
}

impl<I: IconLookup> SvgSurface<I> {
    pub fn with_icons(theme: Theme, config: LayoutConfig, icons: I) -> Self {
        Self {
            theme,
            config,
            icons,
            fast_text: false,
            scene: None,
            frame: None,
        }
    }

    /// Use width estimates instead of loading system fonts.
    pub fn fast_text(mut self, fast: bool) -> Self {
        self.fast_text = fast;
        self
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn to_svg(&self) -> String {
        let Some(scene) = &self.scene else {
            return "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"0\" height=\"0\"></svg>"
                .to_string();
        };
        let theme = &self.theme;
        let width = scene.width;
        let height = scene.height;
        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\" font-family=\"{}\">",
            escape_xml(&theme.font_family)
        ));
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            theme.background
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.1}\" font-weight=\"600\" fill=\"{}\">{}</text>",
            self.config.padding,
            self.config.padding + theme.font_size * 1.2,
            theme.font_size * 1.3,
            theme.text_color,
            escape_xml(&scene.title)
        ));

        for band in &scene.bands {
            self.push_band(&mut svg, band, scene.flags);
        }
        if let Some(frame) = &self.frame {
            for path in &frame.paths {
                self.push_connector(&mut svg, path);
            }
        }
        for node in &scene.nodes {
            self.push_node(&mut svg, node);
        }
        if let Some(frame) = &self.frame {
            for path in &frame.paths {
                self.push_connector_labels(&mut svg, path);
            }
        }

        svg.push_str("</svg>");
        svg
    }

    fn push_band(&self, svg: &mut String, band: &BandLayout, flags: OverlayFlags) {
        let theme = &self.theme;
        let r = band.rect;
        svg.push_str(&format!(
            "<g class=\"layer\" data-id=\"{}\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{BAND_RADIUS}\" ry=\"{BAND_RADIUS}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
            escape_xml(&band.id),
            r.x,
            r.y,
            r.width,
            r.height,
            band.fill,
            theme.layer_border
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.1}\" font-weight=\"600\" fill=\"{}\">{}</text>",
            r.x + self.config.layer_padding_x,
            r.y + self.config.layer_header_height * 0.65,
            theme.font_size,
            theme.text_color,
            escape_xml(&band.title)
        ));
        if flags.show_threats && band.threat_count > 0 {
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"{:.1}\" fill=\"{}\">\u{26A0} {}</text>",
                r.right() - self.config.layer_padding_x,
                r.y + self.config.layer_header_height * 0.65,
                theme.font_size * self.config.badge_font_scale,
                theme.threat_badge_text,
                band.threat_count
            ));
        }
        svg.push_str("</g>");
    }

    fn push_node(&self, svg: &mut String, node: &NodeBox) {
        let theme = &self.theme;
        let cfg = &self.config;
        let r = node.rect;
        svg.push_str(&format!(
            "<g class=\"node\" data-id=\"{}\"><title>{}</title><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{NODE_RADIUS}\" ry=\"{NODE_RADIUS}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.2\"/>",
            escape_xml(&node.id),
            escape_xml(&node.description),
            r.x,
            r.y,
            r.width,
            r.height,
            theme.node_fill,
            theme.node_border
        ));

        let baseline = r.y + cfg.node_padding + cfg.node_title_height * 0.7;
        let mut text_x = r.x + cfg.node_padding;
        if let Some(glyph) = &node.icon {
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.1}\">{}</text>",
                text_x,
                baseline,
                cfg.icon_size * 0.9,
                escape_xml(glyph)
            ));
            text_x += cfg.icon_size + 6.0;
        }
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.1}\" font-weight=\"600\" fill=\"{}\">{}</text>",
            text_x,
            baseline,
            theme.font_size,
            theme.text_color,
            escape_xml(&node.name)
        ));

        let mut y = r.y + cfg.node_padding + cfg.node_title_height;
        for feature in &node.features {
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.1}\" fill=\"{}\">{}</text>",
                r.x + cfg.node_padding,
                y + cfg.feature_line_height * 0.75,
                theme.font_size * cfg.feature_font_scale,
                theme.muted_text_color,
                escape_xml(feature)
            ));
            y += cfg.feature_line_height;
        }

        if !node.badges.is_empty() {
            let measure = Measure {
                theme,
                config: cfg,
                fast: self.fast_text,
            };
            let inner = r.width - cfg.node_padding * 2.0;
            let mut x = 0.0f32;
            for badge in &node.badges {
                let w = measure.badge_width(badge);
                if x > 0.0 && x + w > inner {
                    x = 0.0;
                    y += cfg.badge_height + cfg.badge_gap;
                }
                let (fill, text) = match badge.kind {
                    BadgeKind::Threat(_) => (&theme.threat_badge_fill, &theme.threat_badge_text),
                    BadgeKind::Auth => (&theme.auth_badge_fill, &theme.auth_badge_text),
                };
                let bx = r.x + cfg.node_padding + x;
                svg.push_str(&format!(
                    "<rect x=\"{bx:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{fill}\" stroke=\"{text}\" stroke-width=\"0.6\"/>",
                    y + cfg.badge_gap,
                    cfg.badge_height - cfg.badge_gap,
                ));
                svg.push_str(&format!(
                    "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.1}\" fill=\"{text}\">{}</text>",
                    bx + BADGE_PAD_X,
                    y + cfg.badge_height * 0.78,
                    theme.font_size * cfg.badge_font_scale,
                    escape_xml(&badge.text)
                ));
                x += w + cfg.badge_gap;
            }
        }
        svg.push_str("</g>");
    }

    fn push_connector(&self, svg: &mut String, path: &RoutedPath) {
        let color = path
            .stroke
            .color
            .as_deref()
            .unwrap_or(self.theme.line_color.as_str());
        let dash = path
            .stroke
            .dash
            .as_deref()
            .map(|dash| format!(" stroke-dasharray=\"{}\"", escape_xml(dash)))
            .unwrap_or_default();
        svg.push_str(&format!(
            "<path class=\"connector\" data-id=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{:.2}\"{dash}/>",
            escape_xml(&path.connector),
            path.svg_data(),
            path.stroke.width
        ));
        if let Some(head) = &path.head {
            svg.push_str(&format!(
                "<polygon points=\"{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}\" fill=\"{color}\"/>",
                head.tip.0, head.tip.1, head.left.0, head.left.1, head.right.0, head.right.1
            ));
        }
    }

    fn push_connector_labels(&self, svg: &mut String, path: &RoutedPath) {
        let theme = &self.theme;
        let cfg = &self.config;
        let size = theme.font_size * cfg.feature_font_scale;
        for label in &path.labels {
            let w = text_width(&label.text, size, &theme.font_family, self.fast_text)
                + cfg.label_padding_x * 2.0;
            let h = size + cfg.label_padding_y * 2.0;
            svg.push_str(&format!(
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.6\"/>",
                label.at.0 - w / 2.0,
                label.at.1 - h / 2.0,
                theme.label_background,
                theme.node_border
            ));
            svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"{size:.1}\" fill=\"{}\">{}</text>",
                label.at.0,
                label.at.1 + size * 0.35,
                theme.text_color,
                escape_xml(&label.text)
            ));
        }
    }
}

impl<I: IconLookup> RenderSurface for SvgSurface<I> {
    fn mount(&mut self, _view: &View, _viewport: Viewport) {
        self.scene = None;
        self.frame = None;
    }

    fn sync_geometry(
        &mut self,
        view: &View,
        decorations: &Decorations,
        viewport: Viewport,
        anchors: &mut AnchorRegistry,
    ) {
        let scene = layout_scene(
            view,
            decorations,
            viewport,
            &self.theme,
            &self.config,
            &self.icons,
            self.fast_text,
        );
        for node in &scene.nodes {
            anchors.register(&node.id, node.rect);
        }
        self.scene = Some(scene);
    }

    fn present(&mut self, frame: &Frame) {
        self.frame = Some(frame.clone());
    }

    fn unmount(&mut self) {
        self.scene = None;
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::decorate;
    use crate::schema::{Component, Layer};

    fn component(id: &str, threats: &[&str]) -> Component {
        Component {
            id: id.to_string(),
            name: format!("Component {id}"),
            description: String::new(),
            icon: Some("server".to_string()),
            features: vec!["feature one".to_string()],
            threats: threats.iter().map(|t| t.to_string()).collect(),
            auth: None,
        }
    }

    fn view(count: usize) -> View {
        View {
            id: "logical".to_string(),
            title: "Logical".to_string(),
            description: String::new(),
            layers: vec![
                Layer {
                    id: "L1".to_string(),
                    title: "Edge".to_string(),
                    description: String::new(),
                    color: Some("blue".to_string()),
                    icon: None,
                    threat_count: 2,
                    components: (0..count)
                        .map(|i| component(&format!("N{i}"), &["LLM01:2025", "ASI02"]))
                        .collect(),
                },
                Layer {
                    id: "L2".to_string(),
                    title: "Data".to_string(),
                    description: String::new(),
                    color: None,
                    icon: None,
                    threat_count: 0,
                    components: vec![component("DB", &[])],
                },
            ],
            connectors: Vec::new(),
        }
    }

    fn scene(view: &View, flags: OverlayFlags, width: f32) -> Scene {
        layout_scene(
            view,
            &decorate(view, flags),
            Viewport::new(width, 600.0),
            &Theme::modern(),
            &LayoutConfig::default(),
            &IconTable::builtin(),
            true,
        )
    }

    #[test]
    fn bands_stack_in_layer_order() {
        let v = view(2);
        let scene = scene(&v, OverlayFlags::OFF, 1200.0);
        assert_eq!(scene.bands.len(), 2);
        assert!(scene.bands[1].rect.y > scene.bands[0].rect.bottom());
        let db = scene.node("DB").unwrap();
        assert!(db.rect.y > scene.node("N0").unwrap().rect.bottom());
        assert_eq!(scene.bands[0].fill, "#EFF6FF");
    }

    #[test]
    fn threat_badges_grow_nodes() {
        let v = view(1);
        let off = scene(&v, OverlayFlags::OFF, 1200.0);
        let on = scene(&v, OverlayFlags::new(true, false), 1200.0);
        let before = off.node("N0").unwrap().rect;
        let after = on.node("N0").unwrap().rect;
        assert!(after.height > before.height);
        assert_eq!(
            on.node("DB").unwrap().rect.height,
            off.node("DB").unwrap().rect.height
        );
        assert!(on.node("DB").unwrap().rect.y > off.node("DB").unwrap().rect.y);
    }

    #[test]
    fn narrow_viewports_wrap_rows() {
        let v = view(6);
        let wide = scene(&v, OverlayFlags::OFF, 2400.0);
        let narrow = scene(&v, OverlayFlags::OFF, 500.0);
        let row_ys = |s: &Scene| {
            let mut ys: Vec<i32> = s
                .nodes
                .iter()
                .filter(|n| n.layer == "L1")
                .map(|n| n.rect.y as i32)
                .collect();
            ys.dedup();
            ys.len()
        };
        assert_eq!(row_ys(&wide), 1);
        assert!(row_ys(&narrow) > 1);
    }

    #[test]
    fn surface_registers_every_node() {
        let v = view(3);
        let mut surface = SvgSurface::new(Theme::modern(), LayoutConfig::default()).fast_text(true);
        let mut anchors = AnchorRegistry::new();
        anchors.activate("logical");
        surface.sync_geometry(
            &v,
            &decorate(&v, OverlayFlags::OFF),
            Viewport::new(1200.0, 800.0),
            &mut anchors,
        );
        assert_eq!(anchors.len(), 4);
        let svg = surface.to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Component N2"));
        assert!(svg.ends_with("</svg>"));
    }
}
