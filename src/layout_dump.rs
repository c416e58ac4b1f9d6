use crate::layout::{LayoutBlockInstance, Primitive, SlideLayout};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct SlideLayoutDump {
    pub template: String,
    pub width: f32,
    pub height: f32,
    pub containers: Vec<ContainerDump>,
    pub font_sizes: Vec<FontSizeDump>,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Serialize)]
pub struct ContainerDump {
    pub id: Option<String>,
    pub kind: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub label: Option<String>,
    pub content: Option<String>,
    pub font_size: Option<f32>,
    pub clip: Option<[f32; 4]>,
    pub z_index: i32,
    pub children: Vec<ContainerDump>,
}

#[derive(Debug, Serialize)]
pub struct FontSizeDump {
    pub key: String,
    pub size: f32,
}

fn dump_instance(instance: &LayoutBlockInstance) -> ContainerDump {
    ContainerDump {
        id: instance.id.clone(),
        kind: format!("{:?}", instance.kind),
        left: instance.bounds.left,
        top: instance.bounds.top,
        width: instance.bounds.width,
        height: instance.bounds.height,
        label: instance.label.clone(),
        content: instance.content.clone(),
        font_size: instance.font_size,
        clip: instance
            .clip
            .map(|c| [c.left, c.top, c.right, c.bottom]),
        z_index: instance.z_index,
        children: instance.children.iter().map(dump_instance).collect(),
    }
}

impl SlideLayoutDump {
    pub fn from_layout(layout: &SlideLayout, template_id: &str) -> Self {
        SlideLayoutDump {
            template: template_id.to_string(),
            width: layout.width,
            height: layout.height,
            containers: layout.containers.values().map(dump_instance).collect(),
            font_sizes: layout
                .font_sizes
                .iter()
                .map(|(key, size)| FontSizeDump {
                    key: key.clone(),
                    size: *size,
                })
                .collect(),
            primitives: layout.primitives.clone(),
        }
    }
}

pub fn write_layout_dump(
    path: &Path,
    layout: &SlideLayout,
    template_id: &str,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = SlideLayoutDump::from_layout(layout, template_id);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
