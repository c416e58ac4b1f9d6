pub mod allocator;
pub mod builder;
mod error;
pub mod expr;
pub mod fitting;
pub mod graphics;
pub mod positioning;
pub(crate) mod types;

pub use error::{LayoutError, LayoutResult};
pub use types::*;

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::template::{Container, ContainerKind, DataItem, SlideData, Template};
use crate::text_metrics::{ImageProbe, TextMeasurer};
use crate::theme::Theme;

/// Fully resolved slide: one instance tree per template container,
/// final font sizes per role, and the decorative primitives.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SlideLayout {
    pub width: f32,
    pub height: f32,
    pub containers: BTreeMap<String, LayoutBlockInstance>,
    /// `container` or `container.role` keys.
    pub font_sizes: BTreeMap<String, f32>,
    pub primitives: Vec<Primitive>,
}

/// Ties the oracles and configuration together for repeated use. The
/// engine itself is stateless; every `compute` call starts from the
/// template and data alone, so identical inputs give identical output.
pub struct LayoutEngine<'a> {
    pub theme: &'a Theme,
    pub config: &'a EngineConfig,
    pub measurer: &'a dyn TextMeasurer,
    pub probe: &'a dyn ImageProbe,
}

impl LayoutEngine<'_> {
    pub fn compute(&self, template: &Template, data: &SlideData) -> LayoutResult<SlideLayout> {
        self.compute_with_overrides(template, data, &BTreeMap::new())
    }

    /// Compute with per-slide parameter overrides on top of the
    /// template's declared defaults.
    pub fn compute_with_overrides(
        &self,
        template: &Template,
        data: &SlideData,
        overrides: &BTreeMap<String, f64>,
    ) -> LayoutResult<SlideLayout> {
        let viewport = self.config.viewport.viewport();

        let mut constants: BTreeMap<String, f64> = BTreeMap::new();
        constants.insert("SLIDE_WIDTH".to_string(), viewport.width as f64);
        constants.insert("SLIDE_HEIGHT".to_string(), viewport.height as f64);
        for parameter in &template.parameters {
            constants.insert(parameter.key.clone(), parameter.default_value);
        }
        for (key, value) in overrides {
            constants.insert(key.clone(), *value);
        }

        let container_bounds =
            positioning::resolve_container_positions(&template.containers, &constants, viewport)?;

        let mut instances: BTreeMap<String, LayoutBlockInstance> = BTreeMap::new();
        let mut font_sizes: BTreeMap<String, f32> = BTreeMap::new();
        let mut actual_bounds: BTreeMap<String, Bounds> = BTreeMap::new();
        let mut child_bounds: BTreeMap<String, Vec<Bounds>> = BTreeMap::new();
        let mut card_primitives: Vec<Primitive> = Vec::new();

        for (id, container) in &template.containers {
            let bounds = container_bounds
                .get(id)
                .copied()
                .ok_or_else(|| LayoutError::MissingContainer(id.clone()))?;
            let mut instance = self.layout_container(
                id,
                container,
                bounds,
                data,
                &mut font_sizes,
                &mut actual_bounds,
            )?;
            instance.id = Some(id.clone());
            if !instance.children.is_empty() {
                child_bounds.insert(id.clone(), instance.children.iter().map(|c| c.bounds).collect());
            }
            collect_cards(&instance, self.theme, &mut card_primitives);
            instances.insert(id.clone(), instance);
        }

        let graphics_ctx = graphics::GraphicsContext {
            theme: self.theme,
            config: &self.config.graphics,
            viewport,
            container_bounds: &container_bounds,
            actual_bounds: &actual_bounds,
            child_bounds: &child_bounds,
        };
        let mut primitives = graphics::render_graphics(&template.graphics, &graphics_ctx)?;
        primitives.extend(card_primitives);

        Ok(SlideLayout {
            width: viewport.width,
            height: viewport.height,
            containers: instances,
            font_sizes,
            primitives,
        })
    }

    fn layout_container(
        &self,
        id: &str,
        container: &Container,
        bounds: Bounds,
        data: &SlideData,
        font_sizes: &mut BTreeMap<String, f32>,
        actual_bounds: &mut BTreeMap<String, Bounds>,
    ) -> LayoutResult<LayoutBlockInstance> {
        let items = data.blocks.get(id).map(Vec::as_slice).unwrap_or(&[]);

        // Combined text folds the whole list into one body.
        if let Some(combined) = container.combined.as_ref().filter(|c| c.enabled) {
            let instance = self.layout_combined(container, combined, bounds, items);
            let size = instance
                .font_size
                .into_iter()
                .chain(instance.children.iter().filter_map(|c| c.font_size))
                .reduce(f32::min);
            if let Some(size) = size {
                font_sizes.insert(id.to_string(), size);
            }
            return Ok(instance);
        }

        match container.kind {
            ContainerKind::Text => {
                let owned_item;
                let item_slice: &[DataItem] = match data.texts.get(id) {
                    Some(text) => {
                        owned_item = [DataItem::Text(text.clone())];
                        &owned_item
                    }
                    None => items,
                };
                let mut instance =
                    builder::build_instance(container, bounds, item_slice, self.config);
                if instance.content.is_some() {
                    let range = fitting_range(id, container, &self.config.fitting);
                    if let Some(size) = fitting::fit_text_block(
                        &mut instance,
                        self.measurer,
                        range,
                        &self.config.fitting,
                    ) {
                        font_sizes.insert(id.to_string(), size);
                        actual_bounds.insert(id.to_string(), instance.bounds);
                    }
                }
                Ok(instance)
            }

            ContainerKind::Image => {
                let mut instance = builder::build_instance(container, bounds, &[], self.config);
                if let Some(image) = data.images.get(id) {
                    instance.content = Some(image.src.clone());
                    let natural = match (image.width, image.height) {
                        (Some(width), Some(height)) => Some(Size { width, height }),
                        _ => self.probe.probe(&image.src),
                    };
                    if let Some(natural) = natural {
                        instance.clip = aspect_crop(natural, bounds.size());
                    }
                }
                Ok(instance)
            }

            ContainerKind::Block => {
                let mut instance = builder::build_instance(container, bounds, items, self.config);
                let sizes = fitting::fit_instance_tree(&mut instance, self.measurer, self.config);
                for (label, size) in sizes {
                    font_sizes.insert(format!("{id}.{label}"), size);
                }
                Ok(instance)
            }
        }
    }

    fn layout_combined(
        &self,
        container: &Container,
        combined: &crate::template::CombinedText,
        bounds: Bounds,
        items: &[DataItem],
    ) -> LayoutBlockInstance {
        let style = container.text.clone().unwrap_or_default();
        let range = container
            .text
            .as_ref()
            .and_then(|t| t.font_size_range)
            .unwrap_or(self.config.fitting.content_range);
        let columns = fitting::fit_combined(
            self.measurer,
            items,
            combined,
            bounds,
            &style,
            range,
            &self.config.fitting,
        );

        let mut instance = builder::build_instance(container, bounds, &[], self.config);
        if columns.len() == 1 {
            instance.content = Some(columns[0].text.clone());
            instance.font_size = Some(columns[0].font_size);
        } else {
            instance.children = columns
                .into_iter()
                .map(|column| LayoutBlockInstance {
                    kind: ContainerKind::Text,
                    id: None,
                    label: container.label.clone(),
                    bounds: column.bounds,
                    content: Some(column.text),
                    font_size: Some(column.font_size),
                    text: container.text.clone(),
                    border: None,
                    shadow: None,
                    background: None,
                    combined: None,
                    clip: None,
                    layout: Default::default(),
                    z_index: container.z_index,
                    repeated: false,
                    children: Vec::new(),
                })
                .collect();
        }
        instance
    }
}

fn fitting_range(
    id: &str,
    container: &Container,
    config: &crate::config::FittingConfig,
) -> crate::template::FontSizeRange {
    if let Some(range) = container.text.as_ref().and_then(|t| t.font_size_range) {
        return range;
    }
    if id == "title" {
        config.title_range
    } else {
        config.content_range
    }
}

/// Centered percentage crop that makes `natural` cover `container`
/// without distortion. `None` when the ratios already agree.
pub fn aspect_crop(natural: Size, container: Size) -> Option<ClipRect> {
    if natural.width <= 0.0
        || natural.height <= 0.0
        || container.width <= 0.0
        || container.height <= 0.0
    {
        return None;
    }
    let image_ratio = natural.width / natural.height;
    let container_ratio = container.width / container.height;
    if (image_ratio - container_ratio).abs() < 1e-6 {
        return None;
    }
    if image_ratio > container_ratio {
        // Image is wider: trim the sides.
        let cut = (1.0 - container_ratio / image_ratio) / 2.0 * 100.0;
        Some(ClipRect {
            left: cut,
            top: 0.0,
            right: cut,
            bottom: 0.0,
        })
    } else {
        let cut = (1.0 - image_ratio / container_ratio) / 2.0 * 100.0;
        Some(ClipRect {
            left: 0.0,
            top: cut,
            right: 0.0,
            bottom: cut,
        })
    }
}

/// Rounded-rect backdrops for bordered or filled blocks, emitted behind
/// the instance content.
fn collect_cards(instance: &LayoutBlockInstance, theme: &Theme, out: &mut Vec<Primitive>) {
    if instance.border.is_some() || instance.background.is_some() {
        let radius = instance
            .border
            .as_ref()
            .and_then(|b| b.radius)
            .unwrap_or(theme.card.border_radius);
        let fill = instance
            .background
            .as_ref()
            .map(|b| b.color.clone())
            .unwrap_or_else(|| "none".to_string());
        let outline = instance.border.as_ref().map(|border| Outline {
            color: border
                .color
                .clone()
                .unwrap_or_else(|| theme.border_color.clone()),
            width: border.width.unwrap_or(theme.card.border_width),
        });
        out.push(Primitive::Shape(ShapePrimitive {
            left: instance.bounds.left,
            top: instance.bounds.top,
            width: instance.bounds.width,
            height: instance.bounds.height,
            rotate: 0.0,
            path: round_rect_path(instance.bounds.width, instance.bounds.height, radius),
            viewbox: [instance.bounds.width, instance.bounds.height],
            fill,
            outline,
        }));
    }
    for child in &instance.children {
        collect_cards(child, theme, out);
    }
}
