//! Rendering collaborator interface and the reference SVG surface.

#[cfg(feature = "png")]
mod png;
mod svg;

#[cfg(feature = "png")]
pub use png::write_output_png;
pub use svg::{BandLayout, NodeBox, Scene, SvgSurface, layout_scene};

use crate::anchors::AnchorRegistry;
use crate::overlay::Decorations;
use crate::schema::View;
use crate::session::Frame;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// The surface owns pixels. The core asks it to report node geometry into
/// the anchor registry (it is the registry's only writer) and hands it the
/// routed connectors to draw.
pub trait RenderSurface {
    fn mount(&mut self, _view: &View, _viewport: Viewport) {}

    /// Registers the current box of every rendered component.
    fn sync_geometry(
        &mut self,
        view: &View,
        decorations: &Decorations,
        viewport: Viewport,
        anchors: &mut AnchorRegistry,
    );

    fn present(&mut self, frame: &Frame);

    fn unmount(&mut self) {}
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
