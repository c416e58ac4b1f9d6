//! Instance expansion.
//!
//! Turns one template container plus its data items into a tree of
//! [`LayoutBlockInstance`]s with slot bounds attached. Instances leave
//! here with maximum bounds and no font sizes; fitting refines both.

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::template::{Container, ContainerKind, CountSpec, DataItem};

use super::allocator;
use super::types::{Bounds, LayoutBlockInstance};

/// Build the instance tree for `container` filling `bounds`.
///
/// `data` holds the items this subtree consumes: a repeated child gets
/// a single-item slice, a static subtree fans the same slice out to all
/// of its children.
pub fn build_instance(
    container: &Container,
    bounds: Bounds,
    data: &[DataItem],
    config: &EngineConfig,
) -> LayoutBlockInstance {
    build_with_index(container, bounds, data, 0, config)
}

fn build_with_index(
    container: &Container,
    bounds: Bounds,
    data: &[DataItem],
    item_index: usize,
    config: &EngineConfig,
) -> LayoutBlockInstance {
    let layout = container.layout.clone().unwrap_or_default();
    let mut instance = LayoutBlockInstance {
        kind: container.kind,
        id: None,
        label: container.label.clone(),
        bounds,
        content: None,
        font_size: None,
        text: container.text.clone(),
        border: container.border.clone(),
        shadow: container.shadow.clone(),
        background: container.background.clone(),
        combined: container.combined.clone(),
        clip: None,
        layout: layout.clone(),
        z_index: container.z_index,
        repeated: false,
        children: Vec::new(),
    };

    if container.kind == ContainerKind::Text {
        instance.content = leaf_content(container, data.first(), item_index);
    }

    if let Some(child_template) = &container.child_template {
        instance.repeated = true;
        let count = match child_template.count {
            CountSpec::Auto => data.len(),
            CountSpec::Fixed(n) => n,
        };
        let gap = layout.gap.unwrap_or(0.0);
        let allocation = allocator::allocate(
            count,
            bounds,
            child_template.wrap.as_ref(),
            layout.orientation,
            gap,
            &layout.distribution,
            &config.allocator,
        );
        for (i, slot) in allocation.item_bounds.into_iter().enumerate() {
            let item_slice = match data.get(i) {
                Some(item) => std::slice::from_ref(item),
                None => &[],
            };
            instance.children.push(build_with_index(
                &child_template.structure,
                slot,
                item_slice,
                i,
                config,
            ));
        }
    } else if !container.children.is_empty() {
        let gap = layout.gap.unwrap_or(config.allocator.default_gap);
        let slots = allocator::slot_bounds(
            bounds,
            &layout.distribution,
            container.children.len(),
            layout.orientation,
            gap,
        );
        for (child, slot) in container.children.iter().zip(slots) {
            // Static siblings all see the same data item.
            instance
                .children
                .push(build_with_index(child, slot, data, item_index, config));
        }
    }

    instance
}

fn leaf_content(
    container: &Container,
    item: Option<&DataItem>,
    item_index: usize,
) -> Option<String> {
    if container.numbering {
        return Some(format!("{:02}", item_index + 1));
    }
    let item = item?;
    match container.label.as_deref() {
        Some("label") => item.label().map(str::to_string),
        _ => Some(item.content().to_string()),
    }
}

/// Paths (child index chains) of every labeled text leaf, grouped by
/// label. Fitting unifies font sizes across each group.
pub fn collect_label_groups(root: &LayoutBlockInstance) -> BTreeMap<String, Vec<Vec<usize>>> {
    let mut groups: BTreeMap<String, Vec<Vec<usize>>> = BTreeMap::new();
    let mut path = Vec::new();
    collect(root, &mut path, &mut groups);
    groups
}

fn collect(
    node: &LayoutBlockInstance,
    path: &mut Vec<usize>,
    groups: &mut BTreeMap<String, Vec<Vec<usize>>>,
) {
    if node.kind == ContainerKind::Text && node.content.is_some() {
        if let Some(label) = &node.label {
            groups.entry(label.clone()).or_default().push(path.clone());
        }
    }
    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        collect(child, path, groups);
        path.pop();
    }
}

pub fn instance_at<'a>(
    root: &'a LayoutBlockInstance,
    path: &[usize],
) -> Option<&'a LayoutBlockInstance> {
    let mut node = root;
    for &index in path {
        node = node.children.get(index)?;
    }
    Some(node)
}

pub fn instance_at_mut<'a>(
    root: &'a mut LayoutBlockInstance,
    path: &[usize],
) -> Option<&'a mut LayoutBlockInstance> {
    let mut node = root;
    for &index in path {
        node = node.children.get_mut(index)?;
    }
    Some(node)
}

/// True when any leaf below `node` carries this label.
pub fn has_label(node: &LayoutBlockInstance, label: &str) -> bool {
    if node.label.as_deref() == Some(label) {
        return true;
    }
    node.children.iter().any(|c| has_label(c, label))
}
