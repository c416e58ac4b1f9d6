use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::layout::types::Viewport;
use crate::template::FontSizeRange;

/// Numeric knobs for the whole engine. Every field has a default tuned
/// for the 1000 x 562.5 canvas; a JSON config file can override any
/// subset of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub viewport: ViewportConfig,
    pub fitting: FittingConfig,
    pub allocator: AllocatorConfig,
    pub graphics: GraphicsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
}

impl ViewportConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: crate::SLIDE_WIDTH,
            height: crate::SLIDE_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FittingConfig {
    pub title_range: FontSizeRange,
    pub content_range: FontSizeRange,
    pub label_range: FontSizeRange,
    /// Fraction of the container height text may occupy.
    pub height_margin: f32,
    /// Step size while the candidate is above `coarse_threshold`.
    pub coarse_step: f32,
    pub fine_step: f32,
    pub coarse_threshold: f32,
    /// Labels larger than content * ratio get pulled down.
    pub label_to_content_ratio: f32,
    pub default_line_height: f32,
    /// Gap between the two columns of the overflow fallback.
    pub column_gap: f32,
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            title_range: FontSizeRange {
                min_size: 18.0,
                max_size: 48.0,
            },
            content_range: FontSizeRange {
                min_size: 12.0,
                max_size: 28.0,
            },
            label_range: FontSizeRange {
                min_size: 10.0,
                max_size: 24.0,
            },
            height_margin: 0.9,
            coarse_step: 2.0,
            fine_step: 1.0,
            coarse_threshold: 20.0,
            label_to_content_ratio: 1.1,
            default_line_height: 1.4,
            column_gap: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AllocatorConfig {
    pub default_gap: f32,
    /// Cap on the centering shift applied by group alignment.
    pub max_center_offset: f32,
    /// Width factor for odd lines when wrap alternating is on.
    pub alternating_shrink: f32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            default_gap: 12.0,
            max_center_offset: 80.0,
            alternating_shrink: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphicsConfig {
    /// Vertical gap between a title and its underline.
    pub title_line_spacing: f32,
    pub title_line_thickness: f32,
    pub separator_thickness: f32,
    pub corner_margin: f32,
    pub corner_size: f32,
    pub corner_thickness: f32,
    pub timeline_thickness: f32,
    /// Y tolerance when grouping wrapped items into rows.
    pub row_tolerance: f32,
    pub pyramid_spacing: f32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            title_line_spacing: 10.0,
            title_line_thickness: 2.0,
            separator_thickness: 2.0,
            corner_margin: 20.0,
            corner_size: 30.0,
            corner_thickness: 2.0,
            timeline_thickness: 3.0,
            row_tolerance: 5.0,
            pyramid_spacing: 10.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigFile {
    viewport: Option<ViewportConfig>,
    fitting: Option<FittingConfig>,
    allocator: Option<AllocatorConfig>,
    graphics: Option<GraphicsConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(viewport) = parsed.viewport {
        config.viewport = viewport;
    }
    if let Some(fitting) = parsed.fitting {
        config.fitting = fitting;
    }
    if let Some(allocator) = parsed.allocator {
        config.allocator = allocator;
    }
    if let Some(graphics) = parsed.graphics {
        config.graphics = graphics;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_canvas() {
        let config = EngineConfig::default();
        assert_eq!(config.viewport.width, 1000.0);
        assert_eq!(config.viewport.height, 562.5);
        assert_eq!(config.fitting.height_margin, 0.9);
    }

    #[test]
    fn partial_file_overrides_one_section() {
        let parsed: ConfigFile =
            serde_json::from_str(r#"{"allocator": {"defaultGap": 20}}"#).unwrap();
        let allocator = parsed.allocator.unwrap();
        assert_eq!(allocator.default_gap, 20.0);
        // Untouched fields keep their defaults.
        assert_eq!(allocator.max_center_offset, 80.0);
    }
}
