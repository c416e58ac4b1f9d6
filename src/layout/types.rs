use serde::Serialize;

use crate::template::{
    BackgroundStyle, BorderStyle, ChildLayout, CombinedText, ContainerKind, ShadowStyle,
    TextStyle,
};

/// Axis-aligned rectangle in canvas units. The canvas origin is the
/// top-left corner of the slide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.left + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.top + self.height / 2.0
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Logical slide canvas. Fixed 1000 x 562.5 (16:9) by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(0.0, 0.0, self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: crate::SLIDE_WIDTH,
            height: crate::SLIDE_HEIGHT,
        }
    }
}

/// Centered percentage clip applied to an image so it fills its container
/// without distortion. Values are 0-100 offsets from each edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Resolved counterpart of a template `Container`: concrete bounds, the
/// same style metadata, and fully expanded children. Built once per slide
/// and only touched again when font fitting writes final sizes.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutBlockInstance {
    pub kind: ContainerKind,
    pub id: Option<String>,
    pub label: Option<String>,
    pub bounds: Bounds,
    pub content: Option<String>,
    pub font_size: Option<f32>,
    pub text: Option<TextStyle>,
    pub border: Option<BorderStyle>,
    pub shadow: Option<ShadowStyle>,
    pub background: Option<BackgroundStyle>,
    pub combined: Option<CombinedText>,
    pub clip: Option<ClipRect>,
    pub layout: ChildLayout,
    pub z_index: i32,
    /// Children came from a repetition rule and own allocator slots;
    /// fitting must not re-stack them.
    #[serde(skip)]
    pub repeated: bool,
    pub children: Vec<LayoutBlockInstance>,
}

/// Decorative vector output. Everything the graphics renderer emits is a
/// line or a filled/outlined shape path; the downstream serializer maps
/// these onto whatever element kinds the host presentation format uses.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Primitive {
    Line(LinePrimitive),
    Shape(ShapePrimitive),
}

#[derive(Debug, Clone, Serialize)]
pub struct LinePrimitive {
    pub left: f32,
    pub top: f32,
    /// Start point relative to (left, top).
    pub start: [f32; 2],
    /// End point relative to (left, top).
    pub end: [f32; 2],
    pub thickness: f32,
    pub color: String,
    pub arrow_start: bool,
    pub arrow_end: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapePrimitive {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub rotate: f32,
    /// SVG-style path in the shape's local coordinate space.
    pub path: String,
    pub viewbox: [f32; 2],
    pub fill: String,
    pub outline: Option<Outline>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Outline {
    pub color: String,
    pub width: f32,
}

/// Rounded-rectangle path used for card backdrops.
pub fn round_rect_path(width: f32, height: f32, radius: f32) -> String {
    let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
    format!(
        "M {r} 0 L {w_r} 0 Q {w} 0 {w} {r} L {w} {h_r} Q {w} {h} {w_r} {h} L {r} {h} Q 0 {h} 0 {h_r} L 0 {r} Q 0 0 {r} 0 Z",
        r = r,
        w = width,
        h = height,
        w_r = width - r,
        h_r = height - r,
    )
}

/// Symmetric trapezoid path. `keypoint` is the fraction of the width the
/// top edge is inset on each side (0 = rectangle, 0.5 = triangle).
pub fn trapezoid_path(width: f32, height: f32, keypoint: f32) -> String {
    let inset = width * keypoint.clamp(0.0, 0.5);
    format!(
        "M {x0} 0 L {x1} 0 L {w} {h} L 0 {h} Z",
        x0 = inset,
        x1 = width - inset,
        w = width,
        h = height,
    )
}
