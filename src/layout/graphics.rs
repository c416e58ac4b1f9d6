//! Decorative graphics.
//!
//! Templates declare decorations by referencing container ids; geometry
//! is derived here from the resolved bounds, after font fitting, so
//! underlines and connectors track what is actually on the slide. The
//! variant set is closed: adding a decoration kind means adding a match
//! arm, which the compiler enforces.

use std::collections::BTreeMap;

use crate::config::GraphicsConfig;
use crate::template::{Corner, GraphicElement, Orientation};
use crate::theme::Theme;

use super::error::{LayoutError, LayoutResult};
use super::types::{trapezoid_path, Bounds, LinePrimitive, Primitive, ShapePrimitive};

pub struct GraphicsContext<'a> {
    pub theme: &'a Theme,
    pub config: &'a GraphicsConfig,
    pub viewport: super::types::Viewport,
    /// Template-resolved bounds per container.
    pub container_bounds: &'a BTreeMap<String, Bounds>,
    /// Measured bounds for fitted text containers (titles shrink to
    /// their text box); falls back to `container_bounds`.
    pub actual_bounds: &'a BTreeMap<String, Bounds>,
    /// First-level item slots per repeated container.
    pub child_bounds: &'a BTreeMap<String, Vec<Bounds>>,
}

impl GraphicsContext<'_> {
    fn bounds_of(&self, id: &str) -> LayoutResult<Bounds> {
        self.actual_bounds
            .get(id)
            .or_else(|| self.container_bounds.get(id))
            .copied()
            .ok_or_else(|| LayoutError::MissingContainer(id.to_string()))
    }

    fn items_of(&self, id: &str, graphic: &'static str) -> LayoutResult<&[Bounds]> {
        let items = self
            .child_bounds
            .get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| LayoutError::MissingContainer(id.to_string()))?;
        if items.len() < 2 {
            return Err(LayoutError::InsufficientTimelineItems {
                graphic,
                container: id.to_string(),
                required: 2,
            });
        }
        Ok(items)
    }
}

pub fn render_graphics(
    graphics: &[GraphicElement],
    ctx: &GraphicsContext<'_>,
) -> LayoutResult<Vec<Primitive>> {
    let mut primitives = Vec::new();
    for graphic in graphics {
        primitives.extend(render_graphic(graphic, ctx)?);
    }
    Ok(primitives)
}

fn line_between(start: (f32, f32), end: (f32, f32), thickness: f32, color: &str) -> LinePrimitive {
    let left = start.0.min(end.0);
    let top = start.1.min(end.1);
    LinePrimitive {
        left,
        top,
        start: [start.0 - left, start.1 - top],
        end: [end.0 - left, end.1 - top],
        thickness,
        color: color.to_string(),
        arrow_start: false,
        arrow_end: false,
    }
}

fn line(start: (f32, f32), end: (f32, f32), thickness: f32, color: &str) -> Primitive {
    Primitive::Line(line_between(start, end, thickness, color))
}

fn arrow(start: (f32, f32), end: (f32, f32), thickness: f32, color: &str) -> Primitive {
    let mut l = line_between(start, end, thickness, color);
    l.arrow_end = true;
    Primitive::Line(l)
}

pub fn render_graphic(
    graphic: &GraphicElement,
    ctx: &GraphicsContext<'_>,
) -> LayoutResult<Vec<Primitive>> {
    match graphic {
        GraphicElement::TitleLine {
            container,
            color,
            thickness,
        } => {
            let bounds = ctx.bounds_of(container)?;
            let y = bounds.bottom() + ctx.config.title_line_spacing;
            let color = color.as_deref().unwrap_or(ctx.theme.accent(0));
            let thickness = thickness.unwrap_or(ctx.config.title_line_thickness);
            Ok(vec![line(
                (bounds.left, y),
                (bounds.right(), y),
                thickness,
                color,
            )])
        }

        GraphicElement::ContentSeparator {
            containers,
            orientation,
            color,
            thickness,
        } => {
            let a = ctx.bounds_of(&containers[0])?;
            let b = ctx.bounds_of(&containers[1])?;
            let color = color.as_deref().unwrap_or(&ctx.theme.border_color);
            let thickness = thickness.unwrap_or(ctx.config.separator_thickness);
            let primitive = match orientation {
                // A vertical separator stands between two side-by-side
                // containers and spans their combined vertical extent.
                Orientation::Vertical => {
                    let x = (a.right() + b.left) / 2.0;
                    let top = a.top.min(b.top);
                    let bottom = a.bottom().max(b.bottom());
                    line((x, top), (x, bottom), thickness, color)
                }
                Orientation::Horizontal => {
                    let y = (a.bottom() + b.top) / 2.0;
                    let left = a.left.min(b.left);
                    let right = a.right().max(b.right());
                    line((left, y), (right, y), thickness, color)
                }
            };
            Ok(vec![primitive])
        }

        GraphicElement::CornerDecoration {
            corner,
            size,
            thickness,
            color,
        } => {
            let margin = ctx.config.corner_margin;
            let size = size.unwrap_or(ctx.config.corner_size);
            let thickness = thickness.unwrap_or(ctx.config.corner_thickness);
            let color = color.as_deref().unwrap_or(ctx.theme.accent(0));
            let (w, h) = (ctx.viewport.width, ctx.viewport.height);
            let (cx, cy, dx, dy) = match corner {
                Corner::TopLeft => (margin, margin, 1.0, 1.0),
                Corner::TopRight => (w - margin, margin, -1.0, 1.0),
                Corner::BottomLeft => (margin, h - margin, 1.0, -1.0),
                Corner::BottomRight => (w - margin, h - margin, -1.0, -1.0),
            };
            Ok(vec![
                line((cx, cy), (cx + dx * size, cy), thickness, color),
                line((cx, cy), (cx, cy + dy * size), thickness, color),
            ])
        }

        GraphicElement::StraightTimeline {
            container_id,
            color,
            thickness,
        } => {
            let items = ctx.items_of(container_id, "straightTimeline")?;
            let color = color.as_deref().unwrap_or(&ctx.theme.line_color);
            let thickness = thickness.unwrap_or(ctx.config.timeline_thickness);
            Ok(items
                .windows(2)
                .map(|pair| {
                    let y = pair[0].center_y();
                    arrow(
                        (pair[0].right(), y),
                        (pair[1].left, y),
                        thickness,
                        color,
                    )
                })
                .collect())
        }

        GraphicElement::AlternatingTimeline {
            container_id,
            color,
            thickness,
        } => {
            let items = ctx.items_of(container_id, "alternatingTimeline")?;
            let color = color.as_deref().unwrap_or(&ctx.theme.line_color);
            let thickness = thickness.unwrap_or(ctx.config.timeline_thickness);

            // Even items sit on the top row, odd items on the bottom;
            // the spine runs through the band between the rows.
            let top_row_bottom = items
                .iter()
                .step_by(2)
                .map(Bounds::bottom)
                .fold(f32::MIN, f32::max);
            let bottom_row_top = items
                .iter()
                .skip(1)
                .step_by(2)
                .map(|b| b.top)
                .fold(f32::MAX, f32::min);
            let spine_y = (top_row_bottom + bottom_row_top) / 2.0;
            let first_x = items[0].center_x();
            let last_x = items[items.len() - 1].center_x();

            let mut primitives =
                vec![line((first_x, spine_y), (last_x, spine_y), thickness, color)];
            for (i, item) in items.iter().enumerate() {
                let x = item.center_x();
                let branch = if i % 2 == 0 {
                    line((x, item.bottom()), (x, spine_y), thickness, color)
                } else {
                    line((x, spine_y), (x, item.top), thickness, color)
                };
                primitives.push(branch);
            }
            Ok(primitives)
        }

        GraphicElement::WrappingTimeline {
            container_id,
            color,
            thickness,
        } => {
            let items = ctx.items_of(container_id, "wrappingTimeline")?;
            let color = color.as_deref().unwrap_or(&ctx.theme.line_color);
            let thickness = thickness.unwrap_or(ctx.config.timeline_thickness);
            let rows = group_into_rows(items, ctx.config.row_tolerance);

            let mut primitives = Vec::new();
            for (row_index, row) in rows.iter().enumerate() {
                // Even rows read left to right, odd rows snake back.
                let forward = row_index % 2 == 0;
                let ordered: Vec<&Bounds> = if forward {
                    row.iter().collect()
                } else {
                    row.iter().rev().collect()
                };
                for pair in ordered.windows(2) {
                    let y = pair[0].center_y();
                    let (start, end) = if forward {
                        ((pair[0].right(), y), (pair[1].left, y))
                    } else {
                        ((pair[0].left, y), (pair[1].right(), y))
                    };
                    primitives.push(arrow(start, end, thickness, color));
                }
                // Turn connector down to the next row at this row's end.
                if row_index + 1 < rows.len() {
                    let turning = if forward {
                        row.last()
                    } else {
                        row.first()
                    };
                    if let Some(turning) = turning {
                        let x = turning.center_x();
                        let next_top = rows[row_index + 1]
                            .iter()
                            .map(|b| b.top)
                            .fold(f32::MAX, f32::min);
                        primitives.push(arrow(
                            (x, turning.bottom()),
                            (x, next_top),
                            thickness,
                            color,
                        ));
                    }
                }
            }
            Ok(primitives)
        }

        GraphicElement::ZigzagTimeline {
            container_id,
            color,
            thickness,
        } => {
            let items = ctx.items_of(container_id, "zigzagTimeline")?;
            let color = color.as_deref().unwrap_or(&ctx.theme.line_color);
            let thickness = thickness.unwrap_or(ctx.config.timeline_thickness);
            Ok(items
                .windows(2)
                .enumerate()
                .map(|(i, pair)| {
                    let start_x = pair[0].left + pair[0].width * 0.75;
                    let end_x = pair[1].left + pair[1].width * 0.25;
                    // Even pairs descend from a top-row item, odd pairs
                    // climb back up.
                    let (start_y, end_y) = if i % 2 == 0 {
                        (pair[0].bottom(), pair[1].top)
                    } else {
                        (pair[0].top, pair[1].bottom())
                    };
                    arrow((start_x, start_y), (end_x, end_y), thickness, color)
                })
                .collect())
        }

        GraphicElement::TrapezoidPyramid {
            container_id,
            spacing,
            colors,
            reverse,
        } => {
            let items = ctx
                .child_bounds
                .get(container_id)
                .map(Vec::as_slice)
                .ok_or_else(|| LayoutError::MissingContainer(container_id.to_string()))?;
            if items.is_empty() {
                return Ok(Vec::new());
            }
            let spacing = spacing.unwrap_or(ctx.config.pyramid_spacing);

            // Side slope inferred from the first two levels, so every
            // trapezoid's edges line up into one silhouette.
            let slope_rate = if items.len() >= 2 {
                let (w0, w1) = (items[0].width, items[1].width);
                let h1 = items[1].height.max(1.0);
                let delta = (h1 / (h1 + spacing)) * (w1 - w0);
                (delta / h1).abs()
            } else {
                0.0
            };

            let level_count = items.len();
            let primitives = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let top_width = (item.width - slope_rate * item.height).max(0.0);
                    let keypoint = (top_width / (2.0 * item.width)).clamp(0.0, 0.5);
                    let color_index = if *reverse { level_count - 1 - i } else { i };
                    let fill = colors
                        .as_ref()
                        .and_then(|c| {
                            if c.is_empty() {
                                None
                            } else {
                                Some(c[color_index % c.len()].clone())
                            }
                        })
                        .unwrap_or_else(|| ctx.theme.accent(color_index).to_string());
                    Primitive::Shape(ShapePrimitive {
                        left: item.left,
                        top: item.top,
                        width: item.width,
                        height: item.height,
                        rotate: if *reverse { 180.0 } else { 0.0 },
                        path: trapezoid_path(item.width, item.height, 0.5 - keypoint),
                        viewbox: [item.width, item.height],
                        fill,
                        outline: None,
                    })
                })
                .collect();
            Ok(primitives)
        }
    }
}

/// Group item bounds into visual rows: bounds whose tops agree within
/// `tolerance` share a row. Rows come back top to bottom, each sorted
/// left to right.
pub fn group_into_rows(items: &[Bounds], tolerance: f32) -> Vec<Vec<Bounds>> {
    let mut sorted: Vec<Bounds> = items.to_vec();
    sorted.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));

    let mut rows: Vec<Vec<Bounds>> = Vec::new();
    for bounds in sorted {
        match rows.last_mut() {
            Some(row) if (bounds.top - row[0].top).abs() <= tolerance => row.push(bounds),
            _ => rows.push(vec![bounds]),
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.left.total_cmp(&b.left));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphicsConfig;
    use crate::layout::types::Viewport;

    fn theme() -> Theme {
        Theme::modern()
    }

    fn viewport() -> Viewport {
        Viewport {
            width: 1000.0,
            height: 562.5,
        }
    }

    struct Maps {
        containers: BTreeMap<String, Bounds>,
        actuals: BTreeMap<String, Bounds>,
        children: BTreeMap<String, Vec<Bounds>>,
    }

    impl Maps {
        fn new() -> Self {
            Self {
                containers: BTreeMap::new(),
                actuals: BTreeMap::new(),
                children: BTreeMap::new(),
            }
        }
    }

    fn render_with(maps: &Maps, graphic: &GraphicElement) -> LayoutResult<Vec<Primitive>> {
        let theme = theme();
        let config = GraphicsConfig::default();
        let ctx = GraphicsContext {
            theme: &theme,
            config: &config,
            viewport: viewport(),
            container_bounds: &maps.containers,
            actual_bounds: &maps.actuals,
            child_bounds: &maps.children,
        };
        render_graphic(graphic, &ctx)
    }

    fn as_line(p: &Primitive) -> &LinePrimitive {
        match p {
            Primitive::Line(l) => l,
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn title_line_sits_below_the_measured_title() {
        let mut maps = Maps::new();
        maps.actuals
            .insert("title".into(), Bounds::new(10.0, 15.0, 200.0, 50.0));
        let primitives = render_with(
            &maps,
            &GraphicElement::TitleLine {
                container: "title".into(),
                color: None,
                thickness: None,
            },
        )
        .unwrap();
        let l = as_line(&primitives[0]);
        // 15 + 50 + 10 spacing = 75; spanning the title width.
        assert_eq!((l.left, l.top), (10.0, 75.0));
        assert_eq!(l.end, [200.0, 0.0]);
    }

    #[test]
    fn title_line_unknown_container_is_fatal() {
        let maps = Maps::new();
        let err = render_with(
            &maps,
            &GraphicElement::TitleLine {
                container: "title".into(),
                color: None,
                thickness: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::MissingContainer(id) if id == "title"));
    }

    #[test]
    fn separator_splits_the_gap() {
        let mut maps = Maps::new();
        maps.containers
            .insert("left".into(), Bounds::new(0.0, 100.0, 400.0, 300.0));
        maps.containers
            .insert("right".into(), Bounds::new(500.0, 120.0, 400.0, 300.0));
        let primitives = render_with(
            &maps,
            &GraphicElement::ContentSeparator {
                containers: ["left".into(), "right".into()],
                orientation: Orientation::Vertical,
                color: None,
                thickness: None,
            },
        )
        .unwrap();
        let l = as_line(&primitives[0]);
        assert_eq!(l.left, 450.0);
        assert_eq!(l.top, 100.0);
        assert_eq!(l.end[1], 320.0);
    }

    #[test]
    fn straight_timeline_links_consecutive_items() {
        let mut maps = Maps::new();
        maps.children.insert(
            "steps".into(),
            vec![
                Bounds::new(0.0, 200.0, 200.0, 100.0),
                Bounds::new(250.0, 200.0, 200.0, 100.0),
                Bounds::new(500.0, 200.0, 200.0, 100.0),
            ],
        );
        let primitives = render_with(
            &maps,
            &GraphicElement::StraightTimeline {
                container_id: "steps".into(),
                color: None,
                thickness: None,
            },
        )
        .unwrap();
        assert_eq!(primitives.len(), 2);
        let l = as_line(&primitives[0]);
        assert!(l.arrow_end);
        assert_eq!(l.left, 200.0);
        assert_eq!(l.top, 250.0);
        assert_eq!(l.end, [50.0, 0.0]);
    }

    #[test]
    fn timeline_needs_two_items() {
        let mut maps = Maps::new();
        maps.children
            .insert("steps".into(), vec![Bounds::new(0.0, 0.0, 100.0, 50.0)]);
        let err = render_with(
            &maps,
            &GraphicElement::StraightTimeline {
                container_id: "steps".into(),
                color: None,
                thickness: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::InsufficientTimelineItems { .. }));
    }

    #[test]
    fn alternating_timeline_spine_between_rows() {
        let mut maps = Maps::new();
        maps.children.insert(
            "steps".into(),
            vec![
                Bounds::new(0.0, 100.0, 100.0, 80.0),
                Bounds::new(120.0, 300.0, 100.0, 80.0),
                Bounds::new(240.0, 100.0, 100.0, 80.0),
            ],
        );
        let primitives = render_with(
            &maps,
            &GraphicElement::AlternatingTimeline {
                container_id: "steps".into(),
                color: None,
                thickness: None,
            },
        )
        .unwrap();
        // spine + one branch per item
        assert_eq!(primitives.len(), 4);
        let spine = as_line(&primitives[0]);
        // (180 + 300) / 2 = 240
        assert_eq!(spine.top, 240.0);
    }

    #[test]
    fn wrapping_timeline_snakes() {
        let mut maps = Maps::new();
        maps.children.insert(
            "steps".into(),
            vec![
                Bounds::new(0.0, 100.0, 100.0, 80.0),
                Bounds::new(150.0, 100.0, 100.0, 80.0),
                Bounds::new(0.0, 300.0, 100.0, 80.0),
                Bounds::new(150.0, 301.0, 100.0, 80.0),
            ],
        );
        let primitives = render_with(
            &maps,
            &GraphicElement::WrappingTimeline {
                container_id: "steps".into(),
                color: None,
                thickness: None,
            },
        )
        .unwrap();
        // Row 0 arrow, turn connector, row 1 reverse arrow.
        assert_eq!(primitives.len(), 3);
        let turn = as_line(&primitives[1]);
        assert_eq!(turn.left, 200.0);
        // Second row runs right to left.
        let back = as_line(&primitives[2]);
        assert_eq!(back.start[0] + back.left, 150.0);
    }

    #[test]
    fn rows_group_within_tolerance() {
        let items = vec![
            Bounds::new(0.0, 100.0, 10.0, 10.0),
            Bounds::new(20.0, 103.0, 10.0, 10.0),
            Bounds::new(0.0, 200.0, 10.0, 10.0),
        ];
        let rows = group_into_rows(&items, 5.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn pyramid_emits_one_trapezoid_per_level() {
        let mut maps = Maps::new();
        maps.children.insert(
            "levels".into(),
            vec![
                Bounds::new(400.0, 100.0, 200.0, 80.0),
                Bounds::new(300.0, 190.0, 400.0, 80.0),
                Bounds::new(200.0, 280.0, 600.0, 80.0),
            ],
        );
        let primitives = render_with(
            &maps,
            &GraphicElement::TrapezoidPyramid {
                container_id: "levels".into(),
                spacing: Some(10.0),
                colors: None,
                reverse: false,
            },
        )
        .unwrap();
        assert_eq!(primitives.len(), 3);
        match &primitives[0] {
            Primitive::Shape(s) => {
                assert_eq!(s.rotate, 0.0);
                assert!(s.path.starts_with("M "));
            }
            other => panic!("expected shape, got {other:?}"),
        }
    }

    #[test]
    fn reversed_pyramid_rotates_and_reverses_colors() {
        let mut maps = Maps::new();
        maps.children.insert(
            "levels".into(),
            vec![
                Bounds::new(400.0, 100.0, 200.0, 80.0),
                Bounds::new(300.0, 190.0, 400.0, 80.0),
            ],
        );
        let primitives = render_with(
            &maps,
            &GraphicElement::TrapezoidPyramid {
                container_id: "levels".into(),
                spacing: None,
                colors: Some(vec!["#111111".into(), "#222222".into()]),
                reverse: true,
            },
        )
        .unwrap();
        match (&primitives[0], &primitives[1]) {
            (Primitive::Shape(a), Primitive::Shape(b)) => {
                assert_eq!(a.rotate, 180.0);
                assert_eq!(a.fill, "#222222");
                assert_eq!(b.fill, "#111111");
            }
            other => panic!("expected shapes, got {other:?}"),
        }
    }
}
