//! Space allocation for repeated children.
//!
//! Two layers: `distribute_items` decides how many items land on each
//! line, and `allocate` turns that into concrete slot bounds inside the
//! parent container. Slots are maximum extents; font fitting shrinks
//! content into them and `layout_items_in_block` repositions measured
//! items afterwards.

use crate::config::AllocatorConfig;
use crate::template::{
    ChildLayout, Distribution, HorizontalAlign, Orientation, VerticalAlign, WrapConfig,
    WrapDistribution,
};

use super::types::{Bounds, Size};

#[derive(Debug, Clone, Default)]
pub struct WrapAllocation {
    pub lines: usize,
    pub items_per_line: Vec<usize>,
    pub item_bounds: Vec<Bounds>,
}

/// Split `item_count` items across lines of at most `max_per_line`.
pub fn distribute_items(
    item_count: usize,
    max_per_line: usize,
    distribution: WrapDistribution,
) -> Vec<usize> {
    if item_count == 0 {
        return Vec::new();
    }
    if max_per_line == 0 {
        log::warn!("maxItemsPerLine is 0; laying out a single line");
        return vec![item_count];
    }
    if item_count <= max_per_line {
        return vec![item_count];
    }
    match distribution {
        WrapDistribution::Balanced => {
            let lines = item_count.div_ceil(max_per_line);
            let base = item_count / lines;
            let remainder = item_count % lines;
            (0..lines)
                .map(|i| if i < remainder { base + 1 } else { base })
                .collect()
        }
        WrapDistribution::TopHeavy => top_heavy(item_count, max_per_line),
        WrapDistribution::BottomHeavy => bottom_heavy(item_count, max_per_line),
    }
}

/// Pyramid taper: the per-line cap shrinks by one on every line, never
/// below one item.
fn top_heavy(item_count: usize, max_per_line: usize) -> Vec<usize> {
    let mut lines = Vec::new();
    let mut remaining = item_count;
    let mut cap = max_per_line;
    while remaining > 0 {
        let take = cap.min(remaining).max(1);
        lines.push(take);
        remaining -= take;
        cap = (cap - 1).max(1);
    }
    lines
}

/// Inverted taper: lines grow from a single item up to the cap.
fn bottom_heavy(item_count: usize, max_per_line: usize) -> Vec<usize> {
    let mut lines = Vec::new();
    let mut remaining = item_count;
    let mut current = 1;
    while remaining > 0 {
        let take = current.min(remaining);
        lines.push(take);
        remaining -= take;
        current = (current + 1).min(max_per_line);
    }
    lines
}

/// Maximum slot bounds for `count` items sharing `bounds` along
/// `orientation`. Spacing distributions hand out plain slices here;
/// their real gaps only exist once item sizes are known.
pub fn slot_bounds(
    bounds: Bounds,
    distribution: &Distribution,
    count: usize,
    orientation: Orientation,
    gap: f32,
) -> Vec<Bounds> {
    if count == 0 {
        return Vec::new();
    }
    let (start, total) = match orientation {
        Orientation::Horizontal => (bounds.left, bounds.width),
        Orientation::Vertical => (bounds.top, bounds.height),
    };
    let slots: Vec<(f32, f32)> = match distribution {
        Distribution::Equal => {
            let extent = (total - gap * (count as f32 - 1.0)) / count as f32;
            (0..count)
                .map(|i| (start + i as f32 * (extent + gap), extent))
                .collect()
        }
        Distribution::SpaceBetween | Distribution::SpaceAround => {
            let extent = total / count as f32;
            (0..count)
                .map(|i| (start + i as f32 * extent, extent))
                .collect()
        }
        Distribution::Ratio(parts) => {
            if parts.len() != count {
                log::warn!(
                    "ratio distribution has {} parts for {} items; falling back to equal",
                    parts.len(),
                    count
                );
                return slot_bounds(bounds, &Distribution::Equal, count, orientation, gap);
            }
            let sum: f32 = parts.iter().sum();
            let mut cursor = start;
            parts
                .iter()
                .map(|part| {
                    let extent = total * part / sum;
                    let slot = (cursor, extent);
                    cursor += extent;
                    slot
                })
                .collect()
        }
    };
    slots
        .into_iter()
        .map(|(pos, extent)| match orientation {
            Orientation::Horizontal => Bounds::new(pos, bounds.top, extent, bounds.height),
            Orientation::Vertical => Bounds::new(bounds.left, pos, bounds.width, extent),
        })
        .collect()
}

/// Allocate slots for `count` repeated children, wrapping onto multiple
/// lines when the template asks for it.
pub fn allocate(
    count: usize,
    bounds: Bounds,
    wrap: Option<&WrapConfig>,
    orientation: Orientation,
    gap: f32,
    distribution: &Distribution,
    config: &AllocatorConfig,
) -> WrapAllocation {
    if count == 0 {
        return WrapAllocation::default();
    }
    let Some(wrap) = wrap.filter(|w| w.enabled) else {
        return WrapAllocation {
            lines: 1,
            items_per_line: vec![count],
            item_bounds: slot_bounds(bounds, distribution, count, orientation, gap),
        };
    };

    if wrap.zigzag {
        return allocate_zigzag(count, bounds, wrap, gap);
    }

    let max_per_line = wrap.max_items_per_line.unwrap_or(count);
    let items_per_line = distribute_items(count, max_per_line, wrap.distribution);
    let lines = items_per_line.len();

    let (cross_start, cross_total) = match orientation {
        Orientation::Horizontal => (bounds.top, bounds.height),
        Orientation::Vertical => (bounds.left, bounds.width),
    };
    let line_extent = (cross_total - wrap.line_spacing * (lines as f32 - 1.0)) / lines as f32;

    let mut item_bounds = Vec::with_capacity(count);
    for (line_index, &line_count) in items_per_line.iter().enumerate() {
        let cross_pos = cross_start + line_index as f32 * (line_extent + wrap.line_spacing);
        let mut line_rect = match orientation {
            Orientation::Horizontal => {
                Bounds::new(bounds.left, cross_pos, bounds.width, line_extent)
            }
            Orientation::Vertical => Bounds::new(cross_pos, bounds.top, line_extent, bounds.height),
        };
        if wrap.alternating && line_index % 2 == 1 {
            // Odd lines shrink and center for a staggered look.
            match orientation {
                Orientation::Horizontal => {
                    let shrunk = line_rect.width * config.alternating_shrink;
                    line_rect.left += (line_rect.width - shrunk) / 2.0;
                    line_rect.width = shrunk;
                }
                Orientation::Vertical => {
                    let shrunk = line_rect.height * config.alternating_shrink;
                    line_rect.top += (line_rect.height - shrunk) / 2.0;
                    line_rect.height = shrunk;
                }
            }
        }
        item_bounds.extend(slot_bounds(
            line_rect,
            distribution,
            line_count,
            orientation,
            gap,
        ));
    }

    WrapAllocation {
        lines,
        items_per_line,
        item_bounds,
    }
}

/// Items alternate between a top and a bottom row, one column each.
/// Used by alternating timelines where decorations own the band between
/// the rows.
fn allocate_zigzag(count: usize, bounds: Bounds, wrap: &WrapConfig, gap: f32) -> WrapAllocation {
    if count == 1 {
        return WrapAllocation {
            lines: 1,
            items_per_line: vec![1],
            item_bounds: vec![bounds],
        };
    }
    let item_width = (bounds.width - gap * (count as f32 - 1.0)) / count as f32;
    let row_height = (bounds.height - wrap.line_spacing) / 2.0;
    let bottom_top = bounds.top + row_height + wrap.line_spacing;

    let item_bounds = (0..count)
        .map(|i| {
            let left = bounds.left + i as f32 * (item_width + gap);
            let top = if i % 2 == 0 { bounds.top } else { bottom_top };
            Bounds::new(left, top, item_width, row_height)
        })
        .collect();

    WrapAllocation {
        lines: 2,
        items_per_line: vec![count.div_ceil(2), count / 2],
        item_bounds,
    }
}

/// Position measured items inside a block, stacking along the block's
/// orientation. Sizes come from the text measurer after font fitting.
pub fn layout_items_in_block(
    sizes: &[Size],
    bounds: Bounds,
    layout: &ChildLayout,
    config: &AllocatorConfig,
) -> Vec<Bounds> {
    if sizes.is_empty() {
        return Vec::new();
    }
    let count = sizes.len();
    let vertical = layout.orientation == Orientation::Vertical;
    let (start, total) = if vertical {
        (bounds.top, bounds.height)
    } else {
        (bounds.left, bounds.width)
    };
    let extents: Vec<f32> = sizes
        .iter()
        .map(|s| if vertical { s.height } else { s.width })
        .collect();
    let used: f32 = extents.iter().sum();

    let positions: Vec<f32> = match &layout.distribution {
        Distribution::Equal => {
            let gap = layout.gap.unwrap_or(config.default_gap);
            let group = used + gap * (count as f32 - 1.0);
            let shift = group_shift(layout, vertical, total - group, config);
            let mut cursor = start + shift;
            extents
                .iter()
                .map(|extent| {
                    let pos = cursor;
                    cursor += extent + gap;
                    pos
                })
                .collect()
        }
        Distribution::SpaceBetween => {
            if count == 1 {
                vec![start + (total - extents[0]) / 2.0]
            } else {
                let gap = (total - used) / (count as f32 - 1.0);
                let mut cursor = start;
                extents
                    .iter()
                    .map(|extent| {
                        let pos = cursor;
                        cursor += extent + gap;
                        pos
                    })
                    .collect()
            }
        }
        Distribution::SpaceAround => {
            let gap = (total - used) / (count as f32 + 1.0);
            let mut cursor = start + gap;
            extents
                .iter()
                .map(|extent| {
                    let pos = cursor;
                    cursor += extent + gap;
                    pos
                })
                .collect()
        }
        Distribution::Ratio(parts) => {
            let parts = if parts.len() == count {
                parts.clone()
            } else {
                log::warn!(
                    "ratio distribution has {} parts for {} items; falling back to equal",
                    parts.len(),
                    count
                );
                vec![1.0; count]
            };
            let sum: f32 = parts.iter().sum();
            let mut cursor = start;
            parts
                .iter()
                .map(|part| {
                    let pos = cursor;
                    cursor += total * part / sum;
                    pos
                })
                .collect()
        }
    };

    positions
        .iter()
        .zip(sizes)
        .map(|(&pos, size)| {
            if vertical {
                let left = match layout.horizontal_alignment {
                    HorizontalAlign::Left => bounds.left,
                    HorizontalAlign::Center => bounds.left + (bounds.width - size.width) / 2.0,
                    HorizontalAlign::Right => bounds.right() - size.width,
                };
                Bounds::new(left, pos, size.width, size.height)
            } else {
                let top = match layout.vertical_alignment {
                    VerticalAlign::Top => bounds.top,
                    VerticalAlign::Center => bounds.top + (bounds.height - size.height) / 2.0,
                    VerticalAlign::Bottom => bounds.bottom() - size.height,
                };
                Bounds::new(pos, top, size.width, size.height)
            }
        })
        .collect()
}

fn group_shift(layout: &ChildLayout, vertical: bool, extra: f32, config: &AllocatorConfig) -> f32 {
    if extra <= 0.0 {
        return 0.0;
    }
    let align_center = if vertical {
        layout.vertical_alignment == VerticalAlign::Center
    } else {
        layout.horizontal_alignment == HorizontalAlign::Center
    };
    let align_end = if vertical {
        layout.vertical_alignment == VerticalAlign::Bottom
    } else {
        layout.horizontal_alignment == HorizontalAlign::Right
    };
    if align_center {
        (extra / 2.0).min(config.max_center_offset)
    } else if align_end {
        extra
    } else {
        0.0
    }
}
