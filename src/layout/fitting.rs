//! Font fitting.
//!
//! Sizes descend from the range maximum until the wrapped text fits the
//! container height allowance; siblings playing the same role share the
//! group minimum so repeated items read uniformly. Running out of range
//! is not fatal: the floor size is used and the overflow logged.

use std::collections::BTreeMap;

use crate::config::{EngineConfig, FittingConfig};
use crate::template::{
    CombinedText, ContainerKind, DataItem, FontSizeRange, TextStyle,
};
use crate::text_metrics::{MeasureConstraints, TextMeasurer};

use super::allocator;
use super::builder;
use super::types::{Bounds, LayoutBlockInstance, Size};

/// Largest size in `range` at which `text` fits `bounds`, honoring the
/// height allowance. Steps are coarse above the threshold and fine
/// below it. Returns the range floor when nothing fits.
pub fn fit_font_size(
    measurer: &dyn TextMeasurer,
    text: &str,
    style: &TextStyle,
    bounds: Size,
    range: FontSizeRange,
    config: &FittingConfig,
) -> f32 {
    let allowance = bounds.height * config.height_margin;
    let constraints = MeasureConstraints {
        max_width: Some(bounds.width),
    };
    let mut size = range.max_size;
    while size >= range.min_size {
        let measured = measurer.measure(text, style, size, constraints);
        if measured.height <= allowance {
            return size;
        }
        size -= if size > config.coarse_threshold {
            config.coarse_step
        } else {
            config.fine_step
        };
    }
    log::debug!(
        "text does not fit at the range floor {}; keeping it",
        range.min_size
    );
    range.min_size
}

/// Shared size for a group of items: the smallest individual fit.
pub fn unify_font_sizes(sizes: impl IntoIterator<Item = f32>) -> Option<f32> {
    sizes.into_iter().reduce(f32::min)
}

/// Keep labels visually dominant: when a label size is not at least
/// `ratio` times its content size, the content shrinks instead.
pub fn apply_font_hierarchy(
    label: f32,
    content: f32,
    content_floor: f32,
    config: &FittingConfig,
) -> (f32, f32) {
    if label <= content * config.label_to_content_ratio {
        let lowered = (label / config.label_to_content_ratio).max(content_floor);
        (label, lowered.min(content))
    } else {
        (label, content)
    }
}

fn range_for(label: &str, style: Option<&TextStyle>, config: &FittingConfig) -> FontSizeRange {
    if let Some(range) = style.and_then(|s| s.font_size_range) {
        return range;
    }
    match label {
        "label" => config.label_range,
        "title" => config.title_range,
        _ => config.content_range,
    }
}

/// Fit every labeled leaf in the tree, unify per group, apply the
/// label/content hierarchy and reposition measured items inside their
/// blocks. Returns the final size per group label.
pub fn fit_instance_tree(
    root: &mut LayoutBlockInstance,
    measurer: &dyn TextMeasurer,
    config: &EngineConfig,
) -> BTreeMap<String, f32> {
    let groups = builder::collect_label_groups(root);
    let mut group_sizes: BTreeMap<String, f32> = BTreeMap::new();

    for (label, paths) in &groups {
        let mut fits = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(node) = builder::instance_at(root, path) else {
                continue;
            };
            let Some(content) = &node.content else {
                continue;
            };
            let range = range_for(label, node.text.as_ref(), &config.fitting);
            let style = node.text.clone().unwrap_or_default();
            fits.push(fit_font_size(
                measurer,
                content,
                &style,
                node.bounds.size(),
                range,
                &config.fitting,
            ));
        }
        if let Some(unified) = unify_font_sizes(fits) {
            group_sizes.insert(label.clone(), unified);
        }
    }

    if let (Some(&label_size), Some(&content_size)) =
        (group_sizes.get("label"), group_sizes.get("content"))
    {
        let (label_size, content_size) = apply_font_hierarchy(
            label_size,
            content_size,
            config.fitting.content_range.min_size,
            &config.fitting,
        );
        group_sizes.insert("label".to_string(), label_size);
        group_sizes.insert("content".to_string(), content_size);
    }

    for (label, paths) in &groups {
        let Some(&size) = group_sizes.get(label) else {
            continue;
        };
        for path in paths {
            if let Some(node) = builder::instance_at_mut(root, path) {
                node.font_size = Some(size);
            }
        }
    }

    reposition_measured(root, measurer, config);
    group_sizes
}

/// Re-stack text leaves inside their parent block using their measured
/// heights at the final font sizes.
fn reposition_measured(
    node: &mut LayoutBlockInstance,
    measurer: &dyn TextMeasurer,
    config: &EngineConfig,
) {
    for child in &mut node.children {
        reposition_measured(child, measurer, config);
    }

    let all_text_leaves = !node.repeated
        && !node.children.is_empty()
        && node.children.iter().all(|c| {
            c.kind == ContainerKind::Text && c.content.is_some() && c.font_size.is_some()
        });
    if !all_text_leaves {
        return;
    }

    let sizes: Vec<Size> = node
        .children
        .iter()
        .map(|child| {
            let style = child.text.clone().unwrap_or_default();
            let measured = measurer.measure(
                child.content.as_deref().unwrap_or_default(),
                &style,
                child.font_size.unwrap_or(config.fitting.content_range.min_size),
                MeasureConstraints {
                    max_width: Some(child.bounds.width),
                },
            );
            Size {
                width: measured.width.min(child.bounds.width),
                height: measured.height,
            }
        })
        .collect();

    let placed =
        allocator::layout_items_in_block(&sizes, node.bounds, &node.layout, &config.allocator);
    for (child, bounds) in node.children.iter_mut().zip(placed) {
        child.bounds = bounds;
    }
}

/// Fit a standalone text container and shrink its bounds to the
/// measured box, honoring horizontal alignment. The returned bounds are
/// what decorations anchor against.
pub fn fit_text_block(
    instance: &mut LayoutBlockInstance,
    measurer: &dyn TextMeasurer,
    range: FontSizeRange,
    config: &FittingConfig,
) -> Option<f32> {
    let content = instance.content.clone()?;
    let style = instance.text.clone().unwrap_or_default();
    let size = fit_font_size(
        measurer,
        &content,
        &style,
        instance.bounds.size(),
        range,
        config,
    );
    let measured = measurer.measure(
        &content,
        &style,
        size,
        MeasureConstraints {
            max_width: Some(instance.bounds.width),
        },
    );
    let width = measured.width.min(instance.bounds.width);
    let left = match style.text_align.as_deref() {
        Some("center") => instance.bounds.left + (instance.bounds.width - width) / 2.0,
        Some("right") => instance.bounds.right() - width,
        _ => instance.bounds.left,
    };
    instance.bounds = Bounds::new(left, instance.bounds.top, width, measured.height);
    instance.font_size = Some(size);
    Some(size)
}

#[derive(Debug, Clone)]
pub struct CombinedColumn {
    pub bounds: Bounds,
    pub text: String,
    pub font_size: f32,
}

fn combined_line(item: &DataItem, index: usize, combined: &CombinedText) -> String {
    let base = match &combined.pattern {
        Some(pattern) => pattern
            .replace("{content}", item.content())
            .replace("{label}", item.label().unwrap_or_default())
            .replace("{index}", &(index + 1).to_string()),
        None => item.content().to_string(),
    };
    if combined.ordered && combined.pattern.is_none() {
        format!("{}. {base}", index + 1)
    } else {
        base
    }
}

/// Merge list items into one text body and fit it. When the body still
/// overflows at the floor and wrapping is allowed, the items split into
/// two side-by-side columns fitted independently.
pub fn fit_combined(
    measurer: &dyn TextMeasurer,
    items: &[DataItem],
    combined: &CombinedText,
    bounds: Bounds,
    style: &TextStyle,
    range: FontSizeRange,
    config: &FittingConfig,
) -> Vec<CombinedColumn> {
    let lines: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, item)| combined_line(item, i, combined))
        .collect();
    let text = lines.join("\n");
    let size = fit_font_size(measurer, &text, style, bounds.size(), range, config);
    let measured = measurer.measure(
        &text,
        style,
        size,
        MeasureConstraints {
            max_width: Some(bounds.width),
        },
    );

    let overflows = measured.height > bounds.height * config.height_margin;
    if !overflows || !combined.wrapping || items.len() < 2 {
        return vec![CombinedColumn {
            bounds,
            text,
            font_size: size,
        }];
    }

    // Two-column fallback: first half left, remainder right.
    let split = lines.len().div_ceil(2);
    let column_width = (bounds.width - config.column_gap) / 2.0;
    let left_bounds = Bounds::new(bounds.left, bounds.top, column_width, bounds.height);
    let right_bounds = Bounds::new(
        bounds.left + column_width + config.column_gap,
        bounds.top,
        column_width,
        bounds.height,
    );
    [(left_bounds, &lines[..split]), (right_bounds, &lines[split..])]
        .into_iter()
        .map(|(column_bounds, column_lines)| {
            let column_text = column_lines.join("\n");
            let column_size = fit_font_size(
                measurer,
                &column_text,
                style,
                column_bounds.size(),
                range,
                config,
            );
            CombinedColumn {
                bounds: column_bounds,
                text: column_text,
                font_size: column_size,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_metrics::HeuristicMeasurer;

    fn fitting() -> FittingConfig {
        FittingConfig::default()
    }

    fn content_range() -> FontSizeRange {
        FontSizeRange {
            min_size: 12.0,
            max_size: 28.0,
        }
    }

    #[test]
    fn short_text_takes_range_max() {
        let m = HeuristicMeasurer::default();
        let size = fit_font_size(
            &m,
            "Hi",
            &TextStyle::default(),
            Size {
                width: 400.0,
                height: 120.0,
            },
            content_range(),
            &fitting(),
        );
        assert_eq!(size, 28.0);
    }

    #[test]
    fn fit_is_monotone_in_bounds() {
        let m = HeuristicMeasurer::default();
        let text = "a sentence that needs to wrap a few times to fit the box";
        let small = fit_font_size(
            &m,
            text,
            &TextStyle::default(),
            Size {
                width: 150.0,
                height: 60.0,
            },
            content_range(),
            &fitting(),
        );
        let large = fit_font_size(
            &m,
            text,
            &TextStyle::default(),
            Size {
                width: 300.0,
                height: 120.0,
            },
            content_range(),
            &fitting(),
        );
        assert!(large >= small);
    }

    #[test]
    fn overflow_returns_floor() {
        let m = HeuristicMeasurer::default();
        let size = fit_font_size(
            &m,
            "an impossibly long body of text that can never fit in a tiny box no matter what",
            &TextStyle::default(),
            Size {
                width: 40.0,
                height: 10.0,
            },
            content_range(),
            &fitting(),
        );
        assert_eq!(size, 12.0);
    }

    #[test]
    fn unify_takes_group_minimum() {
        assert_eq!(unify_font_sizes([22.0, 18.0, 26.0]), Some(18.0));
        assert_eq!(unify_font_sizes([]), None);
    }

    #[test]
    fn hierarchy_lowers_content_not_label() {
        let config = fitting();
        // Label barely above content: content drops to label / ratio.
        let (label, content) = apply_font_hierarchy(20.0, 19.0, 12.0, &config);
        assert_eq!(label, 20.0);
        assert!((content - 20.0 / 1.1).abs() < 1e-3);

        // Already dominant: untouched.
        let (label, content) = apply_font_hierarchy(24.0, 14.0, 12.0, &config);
        assert_eq!((label, content), (24.0, 14.0));
    }

    #[test]
    fn hierarchy_respects_content_floor() {
        let config = fitting();
        let (_, content) = apply_font_hierarchy(13.0, 13.0, 12.5, &config);
        assert_eq!(content, 12.5);
    }

    #[test]
    fn combined_stays_single_column_when_it_fits() {
        let m = HeuristicMeasurer::default();
        let items = vec![
            DataItem::Text("First".into()),
            DataItem::Text("Second".into()),
        ];
        let combined = CombinedText {
            enabled: true,
            wrapping: true,
            ..CombinedText::default()
        };
        let columns = fit_combined(
            &m,
            &items,
            &combined,
            Bounds::new(0.0, 0.0, 600.0, 400.0),
            &TextStyle::default(),
            content_range(),
            &fitting(),
        );
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].text, "First\nSecond");
    }

    #[test]
    fn combined_overflow_splits_into_two_columns() {
        let m = HeuristicMeasurer::default();
        let items: Vec<DataItem> = (0..9)
            .map(|i| DataItem::Text(format!("overflowing combined body line number {i}")))
            .collect();
        let combined = CombinedText {
            enabled: true,
            wrapping: true,
            ..CombinedText::default()
        };
        let bounds = Bounds::new(0.0, 100.0, 400.0, 90.0);
        let columns = fit_combined(
            &m,
            &items,
            &combined,
            bounds,
            &TextStyle::default(),
            content_range(),
            &fitting(),
        );
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].bounds.width, 190.0);
        assert_eq!(columns[1].bounds.left, 210.0);
        // First column takes the larger half.
        assert_eq!(columns[0].text.lines().count(), 5);
        assert_eq!(columns[1].text.lines().count(), 4);
    }

    #[test]
    fn ordered_combined_numbers_lines() {
        let m = HeuristicMeasurer::default();
        let items = vec![DataItem::Text("Alpha".into()), DataItem::Text("Beta".into())];
        let combined = CombinedText {
            enabled: true,
            ordered: true,
            ..CombinedText::default()
        };
        let columns = fit_combined(
            &m,
            &items,
            &combined,
            Bounds::new(0.0, 0.0, 600.0, 400.0),
            &TextStyle::default(),
            content_range(),
            &fitting(),
        );
        assert_eq!(columns[0].text, "1. Alpha\n2. Beta");
    }
}
