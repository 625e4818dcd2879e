use crate::config::load_config;
use crate::export::{ArtifactSink, DirectorySink, DocumentExporter};
use crate::overlay::OverlayFlags;
use crate::render::write_output_svg;
use crate::scene_dump::{SceneDump, write_scene_dump};
use crate::schema::{Schema, load_schema, threat_count_drift, unknown_threat_refs};
use crate::{RenderOptions, render_view};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "archd",
    version,
    about = "Render layered architecture diagrams and export design docs"
)]
pub struct Args {
    /// Schema file (.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// View to render. Defaults to the first view in the schema.
    #[arg(short = 'v', long = "view")]
    pub view: Option<String>,

    /// Show the threat overlay
    #[arg(long = "threats")]
    pub threats: bool,

    /// Show the auth-flow overlay
    #[arg(long = "auth")]
    pub auth: bool,

    /// Output file (svg/png/json). Defaults to stdout for SVG and JSON.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, layout, routing, scheduler, overlay)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Write the Markdown design spec into this directory
    #[arg(long = "export-dir")]
    pub export_dir: Option<PathBuf>,

    /// Also write the generation-skill document (requires --export-dir)
    #[arg(long = "skill", requires = "export_dir")]
    pub skill: bool,

    /// Validate the schema and report drift, then exit
    #[arg(long = "check")]
    pub check: bool,

    /// Estimate text widths instead of loading system fonts
    #[arg(long = "fastText")]
    pub fast_text: bool,

    /// Log cascade ticks and unresolved anchors to stderr
    #[arg(long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let schema = read_schema(args.input.as_deref())?;
    if args.check {
        return check(&schema);
    }

    let view = match args.view.as_deref() {
        Some(id) => schema
            .view(id)
            .ok_or_else(|| anyhow::anyhow!("unknown view `{id}`"))?,
        None => schema
            .views
            .first()
            .ok_or_else(|| anyhow::anyhow!("schema has no views"))?,
    };

    let defaults = config.overlay.defaults;
    let overlay = OverlayFlags::new(
        args.threats || defaults.show_threats,
        args.auth || defaults.show_auth_flow,
    );

    if let Some(dir) = &args.export_dir {
        let exporter = DocumentExporter::new(&schema);
        let mut sink = DirectorySink::new(dir);
        sink.deliver(&exporter.design_spec_artifact(view, overlay))?;
        if args.skill {
            sink.deliver(&exporter.skill_artifact())?;
        }
    }

    let options = RenderOptions {
        config,
        overlay,
        fast_text: args.fast_text,
    };
    let surface = render_view(&schema, &view.id, &options)?;

    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&surface.to_svg(), args.output.as_deref())?;
        }
        OutputFormat::Json => {
            let dump = SceneDump::from_surface(&surface)
                .ok_or_else(|| anyhow::anyhow!("view `{}` produced no scene", view.id))?;
            match args.output.as_deref() {
                Some(path) => write_scene_dump(path, &dump)?,
                None => println!("{}", dump.to_json()?),
            }
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&surface.to_svg(), &output, &options)?;
        }
    }

    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, options: &RenderOptions) -> Result<()> {
    crate::render::write_output_png(svg, output, &options.config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _options: &RenderOptions) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

/// Hard errors fail the run. Drift between authored counts, threat ids and
/// the catalogs is only reported.
fn check(schema: &Schema) -> Result<()> {
    let errors = schema.validate();
    for view in &schema.views {
        for drift in threat_count_drift(view) {
            tracing::warn!(
                view = %view.id,
                layer = %drift.layer,
                declared = drift.declared,
                referenced = drift.referenced,
                "threat count differs from component references"
            );
        }
        for unknown in unknown_threat_refs(view, &schema.catalogs) {
            tracing::warn!(
                view = %view.id,
                component = %unknown.component,
                id = %unknown.id,
                "threat id not found in any catalog"
            );
        }
    }
    if errors.is_empty() {
        eprintln!("{}: {} view(s) ok", schema.system, schema.views.len());
        return Ok(());
    }
    for error in &errors {
        eprintln!("{error}");
    }
    Err(anyhow::anyhow!("{} schema error(s)", errors.len()))
}

fn read_schema(path: Option<&Path>) -> Result<Schema> {
    match path {
        Some(path) if path != Path::new("-") => load_schema(path),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Schema::from_json5(&buf)
        }
    }
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overlay_and_export_flags() {
        let args = Args::try_parse_from([
            "archd",
            "-i",
            "platform.json5",
            "--view",
            "identity",
            "--threats",
            "--export-dir",
            "out",
            "--skill",
            "-e",
            "json",
        ])
        .unwrap();
        assert_eq!(args.view.as_deref(), Some("identity"));
        assert!(args.threats);
        assert!(!args.auth);
        assert!(args.skill);
        assert_eq!(args.output_format, OutputFormat::Json);
    }

    #[test]
    fn skill_requires_export_dir() {
        assert!(Args::try_parse_from(["archd", "--skill"]).is_err());
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        assert_eq!(
            ensure_output(&Some(PathBuf::from("a.png")), "png").unwrap(),
            PathBuf::from("a.png")
        );
    }
}
