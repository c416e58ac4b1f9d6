use std::collections::BTreeMap;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use slide_layout::config::EngineConfig;
use slide_layout::layout::LayoutEngine;
use slide_layout::template::{builtin_templates, DataItem, SlideData, Template};
use slide_layout::text_metrics::{HeuristicMeasurer, StaticImageProbe};
use slide_layout::theme::Theme;

fn data_with_items(items: usize) -> SlideData {
    let mut data = SlideData::default();
    data.texts
        .insert("title".to_string(), "Annual operating plan".to_string());
    let block: Vec<DataItem> = (0..items)
        .map(|i| DataItem::Labeled {
            label: format!("Phase {}", i + 1),
            content: format!(
                "Milestone {} covering discovery, delivery and a follow-up review",
                i + 1
            ),
        })
        .collect();
    for key in ["content", "cards", "steps", "levels", "body"] {
        data.blocks.insert(key.to_string(), block.clone());
    }
    data
}

fn builtin(kind: &str, index: usize) -> &'static Template {
    &builtin_templates(kind)[index]
}

fn bench_template_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("template_parse");
    let theme = Theme::modern();
    let source = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/src/templates/labeled_list.json5"
    ));
    group.bench_function("labeled_list", |b| {
        b.iter(|| {
            let template =
                slide_layout::template::parse_template(black_box(source), &theme)
                    .expect("parse failed");
            black_box(template.containers.len());
        });
    });
    group.finish();
}

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute");
    let theme = Theme::modern();
    let config = EngineConfig::default();
    let measurer = HeuristicMeasurer::default();
    let probe = StaticImageProbe::default();
    let engine = LayoutEngine {
        theme: &theme,
        config: &config,
        measurer: &measurer,
        probe: &probe,
    };

    for (name, kind, index) in [
        ("list", "list", 0),
        ("labeled_list", "list", 1),
        ("timeline_straight", "timeline", 0),
        ("timeline_alternating", "timeline", 1),
        ("pyramid", "pyramid", 0),
        ("two_column", "two-column", 0),
    ] {
        let template = builtin(kind, index);
        let data = data_with_items(5);
        group.bench_with_input(BenchmarkId::from_parameter(name), template, |b, t| {
            b.iter(|| {
                let layout = engine.compute(black_box(t), &data).expect("layout failed");
                black_box(layout.containers.len());
            });
        });
    }
    group.finish();
}

fn bench_compute_item_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_item_counts");
    let theme = Theme::modern();
    let config = EngineConfig::default();
    let measurer = HeuristicMeasurer::default();
    let probe = StaticImageProbe::default();
    let engine = LayoutEngine {
        theme: &theme,
        config: &config,
        measurer: &measurer,
        probe: &probe,
    };
    let template = builtin("list", 1);

    for items in [3usize, 6, 9, 12] {
        let data = data_with_items(items);
        group.bench_with_input(BenchmarkId::from_parameter(items), &data, |b, data| {
            b.iter(|| {
                let layout = engine
                    .compute(black_box(template), data)
                    .expect("layout failed");
                black_box(layout.font_sizes.len());
            });
        });
    }
    group.finish();
}

fn bench_parameter_overrides(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_with_overrides");
    let theme = Theme::modern();
    let config = EngineConfig::default();
    let measurer = HeuristicMeasurer::default();
    let probe = StaticImageProbe::default();
    let engine = LayoutEngine {
        theme: &theme,
        config: &config,
        measurer: &measurer,
        probe: &probe,
    };
    let template = builtin("pyramid", 0);
    let data = data_with_items(4);
    let mut overrides = BTreeMap::new();
    overrides.insert("PYRAMID_WIDTH".to_string(), 640.0);

    group.bench_function("pyramid_width", |b| {
        b.iter(|| {
            let layout = engine
                .compute_with_overrides(black_box(template), &data, &overrides)
                .expect("layout failed");
            black_box(layout.primitives.len());
        });
    });
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_template_parse, bench_compute, bench_compute_item_counts, bench_parameter_overrides
);
criterion_main!(benches);
