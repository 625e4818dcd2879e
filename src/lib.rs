pub mod anchors;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod export;
pub mod icons;
pub mod overlay;
pub mod render;
pub mod routing;
pub mod scene_dump;
pub mod scheduler;
pub mod schema;
pub mod session;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use export::DocumentExporter;
pub use overlay::{OverlayFlags, OverlayKind, OverlayScope};
pub use render::{RenderSurface, SvgSurface};
pub use routing::{RoutedPath, Router, compute_path};
pub use schema::{Schema, View};
pub use session::{DiagramSession, Frame};

use std::time::Duration;

use crate::theme::Theme;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub config: Config,
    pub overlay: OverlayFlags,
    /// Estimate text widths instead of loading system fonts.
    pub fast_text: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::modern()
    }
}

impl RenderOptions {
    pub fn modern() -> Self {
        Self {
            config: Config::default(),
            overlay: OverlayFlags::OFF,
            fast_text: false,
        }
    }

    pub fn classic() -> Self {
        let mut config = Config::default();
        config.theme = Theme::classic();
        config.render.background = config.theme.background.clone();
        Self {
            config,
            overlay: OverlayFlags::OFF,
            fast_text: false,
        }
    }

    pub fn with_overlay(mut self, overlay: OverlayFlags) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_fast_text(mut self, fast: bool) -> Self {
        self.fast_text = fast;
        self
    }
}

/// Activates `view_id`, applies the overlay, and runs the stabilization
/// cascade to completion. The returned surface holds the settled scene.
pub fn render_view(
    schema: &Schema,
    view_id: &str,
    options: &RenderOptions,
) -> anyhow::Result<SvgSurface> {
    let surface = SvgSurface::new(options.config.theme.clone(), options.config.layout.clone())
        .fast_text(options.fast_text);
    let mut session = DiagramSession::new(schema, &options.config, surface);
    session.activate_view(view_id, Duration::ZERO)?;
    session.set_overlay(options.overlay, Duration::ZERO);
    session.settle(Duration::ZERO);
    Ok(session.into_surface())
}

pub fn render_view_svg(
    schema: &Schema,
    view_id: &str,
    options: &RenderOptions,
) -> anyhow::Result<String> {
    Ok(render_view(schema, view_id, options)?.to_svg())
}
