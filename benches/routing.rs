use archd::anchors::{AnchorRegistry, Rect};
use archd::config::{Config, RoutingConfig};
use archd::export::DocumentExporter;
use archd::overlay::OverlayFlags;
use archd::render::SvgSurface;
use archd::routing::Router;
use archd::schema::{Connector, Fraction, PathStyle, Schema};
use archd::session::DiagramSession;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

fn platform() -> Schema {
    Schema::from_json5(include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/agent_platform.json5"
    )))
    .expect("fixture parse failed")
}

/// `layers` rows of `per_layer` boxes, each wired to its neighbour below
/// with styles cycling straight -> smooth -> grid.
fn dense_grid(layers: usize, per_layer: usize) -> (AnchorRegistry, Vec<Connector>) {
    let mut anchors = AnchorRegistry::new();
    anchors.activate("bench");
    for row in 0..layers {
        for col in 0..per_layer {
            anchors.register(
                &format!("N{row}_{col}"),
                Rect::new(col as f32 * 180.0, row as f32 * 140.0, 140.0, 60.0),
            );
        }
    }
    let mut connectors = Vec::new();
    for row in 0..layers.saturating_sub(1) {
        for col in 0..per_layer {
            let target = (col + row) % per_layer;
            let mut connector =
                Connector::new(format!("N{row}_{col}"), format!("N{}_{target}", row + 1));
            connector.path = match connectors.len() % 3 {
                0 => PathStyle::Straight,
                1 => PathStyle::Smooth { curvature: None },
                _ => PathStyle::Grid {
                    grid_break: Some(Fraction::new(0.4)),
                },
            };
            connectors.push(connector);
        }
    }
    (anchors, connectors)
}

fn bench_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("route");
    let router = Router::new(RoutingConfig::default());
    for (layers, per_layer) in [(3, 4), (6, 10), (12, 20)] {
        let (anchors, connectors) = dense_grid(layers, per_layer);
        group.bench_with_input(
            BenchmarkId::from_parameter(connectors.len()),
            &connectors,
            |b, connectors| {
                b.iter(|| {
                    for connector in connectors {
                        let path = router.route(black_box(connector), &anchors);
                        black_box(path.ok());
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_settle(c: &mut Criterion) {
    let mut group = c.benchmark_group("settle");
    let schema = platform();
    let config = Config::default();
    for view in ["logical", "process", "physical", "identity"] {
        group.bench_function(BenchmarkId::from_parameter(view), |b| {
            b.iter(|| {
                let surface = SvgSurface::new(config.theme.clone(), config.layout.clone())
                    .fast_text(true);
                let mut session = DiagramSession::new(&schema, &config, surface);
                session
                    .activate_view(black_box(view), Duration::ZERO)
                    .expect("view exists");
                session.set_overlay(OverlayFlags::new(true, true), Duration::ZERO);
                session.settle(Duration::ZERO);
                black_box(session.surface().to_svg().len());
            });
        });
    }
    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let schema = platform();
    let exporter = DocumentExporter::new(&schema);
    let view = schema.view("logical").expect("logical view");
    c.bench_function("export/logical", |b| {
        b.iter(|| {
            black_box(
                exporter
                    .export(black_box(view), OverlayFlags::new(true, false))
                    .len(),
            )
        });
    });
}

criterion_group!(benches, bench_route, bench_settle, bench_export);
criterion_main!(benches);
