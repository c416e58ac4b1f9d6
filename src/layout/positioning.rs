//! Relative container placement.
//!
//! Containers without explicit bounds anchor against a sibling (or the
//! slide) along one axis and inherit the other axis from it, adjusted
//! by margins. Resolution runs in passes over the pending set so
//! declaration order never matters; a pass that makes no progress means
//! the anchors form a cycle.

use std::collections::BTreeMap;

use crate::template::{Anchor, Container, Orientation, RelativePositioning, SizeSpec};

use super::error::{LayoutError, LayoutResult};
use super::expr;
use super::types::{Bounds, Viewport};

/// Place one container against its anchor. `relative` is the sibling
/// bounds (or the slide for top-level anchoring).
pub fn bounds_from_positioning(
    positioning: &RelativePositioning,
    relative: Bounds,
    viewport: Viewport,
) -> Bounds {
    let (rel_main_start, rel_main_extent, rel_cross_start, rel_cross_extent) =
        match positioning.axis {
            Orientation::Vertical => (relative.top, relative.height, relative.left, relative.width),
            Orientation::Horizontal => {
                (relative.left, relative.width, relative.top, relative.height)
            }
        };
    let (main_leading, main_trailing, cross_leading, cross_trailing) = match positioning.axis {
        Orientation::Vertical => (
            positioning.margin.top,
            positioning.margin.bottom,
            positioning.margin.left,
            positioning.margin.right,
        ),
        Orientation::Horizontal => (
            positioning.margin.left,
            positioning.margin.right,
            positioning.margin.top,
            positioning.margin.bottom,
        ),
    };

    let anchored = match positioning.anchor {
        Anchor::Start => rel_main_start,
        Anchor::End => rel_main_start + rel_main_extent,
        Anchor::Center => rel_main_start + rel_main_extent / 2.0,
    };
    let main_start = anchored + positioning.offset + main_leading;

    let viewport_extent = match positioning.axis {
        Orientation::Vertical => viewport.height,
        Orientation::Horizontal => viewport.width,
    };
    let main_extent = match positioning.size {
        Some(SizeSpec::Fill) => viewport_extent - main_start - main_trailing,
        Some(SizeSpec::Literal(v)) => v as f32,
        None => rel_main_extent,
    };

    let cross_start = rel_cross_start + cross_leading;
    let cross_extent = rel_cross_extent - cross_leading - cross_trailing;

    match positioning.axis {
        Orientation::Vertical => Bounds::new(cross_start, main_start, cross_extent, main_extent),
        Orientation::Horizontal => Bounds::new(main_start, cross_start, main_extent, cross_extent),
    }
}

/// Resolve every top-level container to concrete bounds: expression
/// bounds first, then anchored containers in dependency passes.
pub fn resolve_container_positions(
    containers: &BTreeMap<String, Container>,
    constants: &BTreeMap<String, f64>,
    viewport: Viewport,
) -> LayoutResult<BTreeMap<String, Bounds>> {
    let mut resolved = expr::resolve_template_bounds(containers, constants, viewport.bounds())?;

    let mut pending: Vec<&str> = Vec::new();
    for (id, container) in containers {
        if container.bounds.is_some() {
            continue;
        }
        match &container.positioning {
            Some(positioning) => {
                if let Some(target) = &positioning.relative_to {
                    if !containers.contains_key(target) {
                        return Err(LayoutError::MissingContainer(target.clone()));
                    }
                }
                pending.push(id);
            }
            None => return Err(LayoutError::MissingGeometry(id.clone())),
        }
    }

    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|id| {
            let Some(positioning) = containers[*id].positioning.as_ref() else {
                return false;
            };
            let relative = match &positioning.relative_to {
                Some(target) => match resolved.get(target) {
                    Some(bounds) => *bounds,
                    None => return true,
                },
                None => viewport.bounds(),
            };
            let bounds = bounds_from_positioning(positioning, relative, viewport);
            resolved.insert((*id).to_string(), bounds);
            false
        });
        if pending.len() == before {
            // Every remaining container waits on another pending one.
            return Err(LayoutError::CircularDependency(pending[0].to_string()));
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ContainerKind, Margin};

    fn viewport() -> Viewport {
        Viewport {
            width: 1000.0,
            height: 562.5,
        }
    }

    fn positioned(positioning: RelativePositioning) -> Container {
        Container {
            kind: ContainerKind::Block,
            bounds: None,
            positioning: Some(positioning),
            border: None,
            shadow: None,
            background: None,
            label: None,
            text: None,
            numbering: false,
            combined: None,
            layout: None,
            children: Vec::new(),
            child_template: None,
            z_index: 0,
        }
    }

    #[test]
    fn fill_below_anchor_with_margins() {
        let title = Bounds::new(0.0, 15.0, 1000.0, 120.0);
        let positioning = RelativePositioning {
            relative_to: Some("title".into()),
            axis: Orientation::Vertical,
            anchor: Anchor::End,
            offset: 20.0,
            size: Some(SizeSpec::Fill),
            margin: Margin {
                left: 30.0,
                top: 0.0,
                right: 30.0,
                bottom: 40.0,
            },
        };
        let bounds = bounds_from_positioning(&positioning, title, viewport());
        assert_eq!(bounds, Bounds::new(30.0, 155.0, 940.0, 367.5));
    }

    #[test]
    fn horizontal_axis_swaps_roles() {
        let sidebar = Bounds::new(0.0, 0.0, 300.0, 562.5);
        let positioning = RelativePositioning {
            relative_to: Some("sidebar".into()),
            axis: Orientation::Horizontal,
            anchor: Anchor::End,
            offset: 10.0,
            size: Some(SizeSpec::Literal(400.0)),
            margin: Margin::default(),
        };
        let bounds = bounds_from_positioning(&positioning, sidebar, viewport());
        assert_eq!(bounds, Bounds::new(310.0, 0.0, 400.0, 562.5));
    }

    #[test]
    fn omitted_size_inherits_anchor_extent() {
        let anchor = Bounds::new(50.0, 100.0, 200.0, 80.0);
        let positioning = RelativePositioning {
            relative_to: None,
            axis: Orientation::Vertical,
            anchor: Anchor::End,
            offset: 0.0,
            size: None,
            margin: Margin::default(),
        };
        let bounds = bounds_from_positioning(&positioning, anchor, viewport());
        assert_eq!(bounds.height, 80.0);
    }

    #[test]
    fn chained_anchors_resolve_out_of_order() {
        let mut containers = BTreeMap::new();
        // "second" sorts before "title" but depends on it transitively.
        let mut title = positioned(RelativePositioning {
            relative_to: None,
            axis: Orientation::Vertical,
            anchor: Anchor::Start,
            offset: 0.0,
            size: None,
            margin: Margin::default(),
        });
        title.positioning = None;
        title.bounds = Some(crate::template::BoundsSpec {
            left: Some(crate::template::PositionSpec::Literal(0.0)),
            top: Some(crate::template::PositionSpec::Literal(15.0)),
            width: Some(crate::template::DimensionSpec::Literal(1000.0)),
            height: Some(crate::template::DimensionSpec::Literal(80.0)),
        });
        containers.insert("title".to_string(), title);
        containers.insert(
            "first".to_string(),
            positioned(RelativePositioning {
                relative_to: Some("title".into()),
                axis: Orientation::Vertical,
                anchor: Anchor::End,
                offset: 10.0,
                size: Some(SizeSpec::Literal(100.0)),
                margin: Margin::default(),
            }),
        );
        containers.insert(
            "second".to_string(),
            positioned(RelativePositioning {
                relative_to: Some("first".into()),
                axis: Orientation::Vertical,
                anchor: Anchor::End,
                offset: 10.0,
                size: Some(SizeSpec::Literal(100.0)),
                margin: Margin::default(),
            }),
        );
        let resolved =
            resolve_container_positions(&containers, &BTreeMap::new(), viewport()).unwrap();
        assert_eq!(resolved["first"].top, 105.0);
        assert_eq!(resolved["second"].top, 215.0);
    }

    #[test]
    fn mutual_anchors_are_a_cycle() {
        let mut containers = BTreeMap::new();
        for (id, other) in [("a", "b"), ("b", "a")] {
            containers.insert(
                id.to_string(),
                positioned(RelativePositioning {
                    relative_to: Some(other.into()),
                    axis: Orientation::Vertical,
                    anchor: Anchor::End,
                    offset: 0.0,
                    size: Some(SizeSpec::Literal(50.0)),
                    margin: Margin::default(),
                }),
            );
        }
        let err =
            resolve_container_positions(&containers, &BTreeMap::new(), viewport()).unwrap_err();
        assert!(matches!(err, LayoutError::CircularDependency(_)));
    }

    #[test]
    fn unknown_anchor_target_is_missing_container() {
        let mut containers = BTreeMap::new();
        containers.insert(
            "floater".to_string(),
            positioned(RelativePositioning {
                relative_to: Some("ghost".into()),
                axis: Orientation::Vertical,
                anchor: Anchor::Start,
                offset: 0.0,
                size: None,
                margin: Margin::default(),
            }),
        );
        let err =
            resolve_container_positions(&containers, &BTreeMap::new(), viewport()).unwrap_err();
        assert!(matches!(err, LayoutError::MissingContainer(id) if id == "ghost"));
    }
}
