//! Connector routing between named anchors.
//!
//! Routing is a pure function of the connector, the current anchor registry
//! and the routing defaults. A connector whose endpoint is not mounted yields
//! [`RoutingError::UnresolvedAnchor`]; callers skip it and report.

mod geometry;

use serde::Serialize;
use std::fmt;

use crate::anchors::AnchorRegistry;
use crate::config::RoutingConfig;
use crate::schema::{AnchorSide, Connector, ConnectorLabel, PathStyle};

use geometry::{
    Point, anchor_point, distance, facing_sides, flatten_cubic, incoming_direction,
    orthogonal_route, path_bend_count, path_length, point_at_fraction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Start,
    End,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => f.write_str("start"),
            Endpoint::End => f.write_str("end"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("connector `{connector}`: {endpoint} anchor `{component}` is not mounted")]
    UnresolvedAnchor {
        connector: String,
        component: String,
        endpoint: Endpoint,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PathSegment {
    Line { to: Point },
    Cubic { c1: Point, c2: Point, to: Point },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLabel {
    pub text: String,
    pub fraction: f32,
    pub at: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Arrowhead {
    pub tip: Point,
    pub left: Point,
    pub right: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub color: Option<String>,
    pub width: f32,
    pub dash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedPath {
    pub connector: String,
    pub from: String,
    pub to: String,
    pub start: Point,
    pub end: Point,
    pub start_side: AnchorSide,
    pub end_side: AnchorSide,
    pub segments: Vec<PathSegment>,
    /// Coordinate of the crossing leg of a Z-shaped grid route.
    pub break_at: Option<f32>,
    pub labels: Vec<PlacedLabel>,
    pub head: Option<Arrowhead>,
    pub stroke: Stroke,
}

impl RoutedPath {
    /// Path as points; cubic segments are flattened.
    pub fn polyline(&self) -> Vec<Point> {
        let mut points = vec![self.start];
        let mut cursor = self.start;
        for segment in &self.segments {
            match *segment {
                PathSegment::Line { to } => {
                    points.push(to);
                    cursor = to;
                }
                PathSegment::Cubic { c1, c2, to } => {
                    flatten_cubic(cursor, c1, c2, to, &mut points);
                    cursor = to;
                }
            }
        }
        points
    }

    pub fn length(&self) -> f32 {
        path_length(&self.polyline())
    }

    pub fn point_at(&self, fraction: f32) -> Point {
        point_at_fraction(&self.polyline(), fraction).unwrap_or(self.start)
    }

    /// Corner count of straight-segment paths. Curves report zero.
    pub fn bends(&self) -> usize {
        if self
            .segments
            .iter()
            .any(|segment| matches!(segment, PathSegment::Cubic { .. }))
        {
            return 0;
        }
        path_bend_count(&self.polyline())
    }

    /// SVG `d` attribute.
    pub fn svg_data(&self) -> String {
        let mut d = format!("M {:.2} {:.2}", self.start.0, self.start.1);
        for segment in &self.segments {
            match segment {
                PathSegment::Line { to } => d.push_str(&format!(" L {:.2} {:.2}", to.0, to.1)),
                PathSegment::Cubic { c1, c2, to } => d.push_str(&format!(
                    " C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
                    c1.0, c1.1, c2.0, c2.1, to.0, to.1
                )),
            }
        }
        d
    }
}

/// Routes connectors with a fixed set of defaults.
#[derive(Debug, Clone, Default)]
pub struct Router {
    defaults: RoutingConfig,
}

impl Router {
    pub fn new(defaults: RoutingConfig) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &RoutingConfig {
        &self.defaults
    }

    pub fn route(
        &self,
        connector: &Connector,
        anchors: &AnchorRegistry,
    ) -> Result<RoutedPath, RoutingError> {
        self.route_with_labels(connector, anchors, &connector.labels)
    }

    /// Routes with an explicit label set (overlays may substitute labels).
    pub fn route_with_labels(
        &self,
        connector: &Connector,
        anchors: &AnchorRegistry,
        labels: &[ConnectorLabel],
    ) -> Result<RoutedPath, RoutingError> {
        let from = anchors
            .get(&connector.from)
            .ok_or_else(|| unresolved(connector, &connector.from, Endpoint::Start))?;
        let to = anchors
            .get(&connector.to)
            .ok_or_else(|| unresolved(connector, &connector.to, Endpoint::End))?;

        let (auto_start, auto_end) = facing_sides(&from, &to);
        let start_side = connector.start_anchor.side.unwrap_or(auto_start);
        let end_side = connector.end_anchor.side.unwrap_or(auto_end);
        let start = anchor_point(&from, start_side, connector.start_anchor.offset);
        let end = anchor_point(&to, end_side, connector.end_anchor.offset);

        let (segments, break_at) = match connector.path {
            PathStyle::Straight => (vec![PathSegment::Line { to: end }], None),
            PathStyle::Smooth { curvature } => {
                let curvature = curvature.unwrap_or(self.defaults.curvature);
                (smooth_segments(start, start_side, end, end_side, curvature), None)
            }
            PathStyle::Grid { grid_break } => {
                let grid_break = grid_break.unwrap_or(self.defaults.grid_break).get();
                let (points, break_at) =
                    orthogonal_route(start, start_side, end, end_side, grid_break);
                let segments = points
                    .into_iter()
                    .skip(1)
                    .map(|to| PathSegment::Line { to })
                    .collect();
                (segments, break_at)
            }
        };

        let mut path = RoutedPath {
            connector: connector.key(),
            from: connector.from.clone(),
            to: connector.to.clone(),
            start,
            end,
            start_side,
            end_side,
            segments,
            break_at,
            labels: Vec::new(),
            head: None,
            stroke: Stroke {
                color: connector.color.clone(),
                width: connector.width.unwrap_or(self.defaults.stroke_width),
                dash: connector.dash.clone(),
            },
        };

        let polyline = path.polyline();
        path.labels = labels
            .iter()
            .map(|label| {
                let fraction = label
                    .position
                    .map(|f| f.get())
                    .unwrap_or(self.defaults.label_position);
                PlacedLabel {
                    text: label.text.clone(),
                    fraction,
                    at: point_at_fraction(&polyline, fraction).unwrap_or(start),
                }
            })
            .collect();

        if connector.show_head {
            let size = connector.head_size.unwrap_or(self.defaults.head_size);
            path.head = arrowhead(&polyline, end_side, size);
        }

        Ok(path)
    }
}

/// Routes with default settings.
pub fn compute_path(
    connector: &Connector,
    anchors: &AnchorRegistry,
) -> Result<RoutedPath, RoutingError> {
    Router::default().route(connector, anchors)
}

fn unresolved(connector: &Connector, component: &str, endpoint: Endpoint) -> RoutingError {
    RoutingError::UnresolvedAnchor {
        connector: connector.key(),
        component: component.to_string(),
        endpoint,
    }
}

fn smooth_segments(
    start: Point,
    start_side: AnchorSide,
    end: Point,
    end_side: AnchorSide,
    curvature: f32,
) -> Vec<PathSegment> {
    let reach = distance(start, end) * curvature.max(0.0);
    if reach <= f32::EPSILON {
        return vec![PathSegment::Line { to: end }];
    }
    let (sn_x, sn_y) = start_side.normal();
    let (en_x, en_y) = end_side.normal();
    vec![PathSegment::Cubic {
        c1: (start.0 + sn_x * reach, start.1 + sn_y * reach),
        c2: (end.0 + en_x * reach, end.1 + en_y * reach),
        to: end,
    }]
}

fn arrowhead(polyline: &[Point], end_side: AnchorSide, size: f32) -> Option<Arrowhead> {
    if size <= 0.0 {
        return None;
    }
    let tip = *polyline.last()?;
    // Degenerate paths point into the box through its side.
    let dir = incoming_direction(polyline).unwrap_or_else(|| {
        let (nx, ny) = end_side.normal();
        (-nx, -ny)
    });
    let base = (tip.0 - dir.0 * size, tip.1 - dir.1 * size);
    let half = size / 2.0;
    let perp = (-dir.1, dir.0);
    Some(Arrowhead {
        tip,
        left: (base.0 + perp.0 * half, base.1 + perp.1 * half),
        right: (base.0 - perp.0 * half, base.1 - perp.1 * half),
    })
}
