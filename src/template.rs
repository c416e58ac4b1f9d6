//! Serde model for slide layout templates.
//!
//! Templates are authored in JSON5: a map of named containers whose
//! geometry is given either as literal numbers, as arithmetic
//! expressions over other containers, or as relative positioning
//! against a sibling. Containers carry optional style metadata that the
//! engine threads through untouched, plus repetition rules
//! (`childTemplate`) that expand against slide data at layout time.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use anyhow::Context as _;
use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Text,
    Image,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Start,
    End,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

/// How children share space along the main axis. Ratio carries the
/// parsed weights from a "2/1/1"-style string.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Distribution {
    #[default]
    Equal,
    SpaceBetween,
    SpaceAround,
    Ratio(Vec<f32>),
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Equal => f.write_str("equal"),
            Distribution::SpaceBetween => f.write_str("space-between"),
            Distribution::SpaceAround => f.write_str("space-around"),
            Distribution::Ratio(parts) => {
                let text: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                f.write_str(&text.join("/"))
            }
        }
    }
}

impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Distribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        match text.as_str() {
            "equal" => Ok(Distribution::Equal),
            "space-between" => Ok(Distribution::SpaceBetween),
            "space-around" => Ok(Distribution::SpaceAround),
            other if other.contains('/') => {
                let parts: Result<Vec<f32>, _> =
                    other.split('/').map(|p| p.trim().parse::<f32>()).collect();
                match parts {
                    Ok(parts) if !parts.is_empty() => Ok(Distribution::Ratio(parts)),
                    _ => Err(D::Error::custom(format!(
                        "invalid ratio distribution \"{other}\""
                    ))),
                }
            }
            other => Err(D::Error::custom(format!(
                "unknown distribution \"{other}\""
            ))),
        }
    }
}

/// Expression operand: either a literal number or an arithmetic string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExprValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionSpec {
    Literal(f64),
    Expr(DimensionExpression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionExpression {
    pub expr: ExprValue,
    #[serde(default)]
    pub min: Option<ExprValue>,
    #[serde(default)]
    pub max: Option<ExprValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionSpec {
    Literal(f64),
    Expr(PositionExpression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionExpression {
    /// Arithmetic string, or the keywords `center`, `start`, `end`,
    /// `after`, `before` (the last two need `relativeTo`).
    pub expr: String,
    #[serde(default)]
    pub relative_to: Option<String>,
    #[serde(default)]
    pub offset: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundsSpec {
    pub left: Option<PositionSpec>,
    pub top: Option<PositionSpec>,
    pub width: Option<DimensionSpec>,
    pub height: Option<DimensionSpec>,
}

/// Size along the positioning axis: a literal extent or `fill` to
/// stretch to the far viewport edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    Fill,
    Literal(f64),
}

impl Serialize for SizeSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SizeSpec::Fill => serializer.serialize_str("fill"),
            SizeSpec::Literal(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for SizeSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(SizeSpec::Literal(v)),
            Raw::Text(s) if s == "fill" => Ok(SizeSpec::Fill),
            Raw::Text(s) => Err(D::Error::custom(format!("unknown size keyword \"{s}\""))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativePositioning {
    #[serde(default)]
    pub relative_to: Option<String>,
    pub axis: Orientation,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub offset: f32,
    #[serde(default)]
    pub size: Option<SizeSpec>,
    #[serde(default)]
    pub margin: Margin,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildLayout {
    pub orientation: Orientation,
    pub distribution: Distribution,
    /// `None` lets the engine default apply; explicit values (including
    /// negative overlaps) are taken as-is.
    pub gap: Option<f32>,
    pub horizontal_alignment: HorizontalAlign,
    pub vertical_alignment: VerticalAlign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSpec {
    /// One child per data item.
    Auto,
    Fixed(usize),
}

impl Serialize for CountSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CountSpec::Auto => serializer.serialize_str("auto"),
            CountSpec::Fixed(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl<'de> Deserialize<'de> for CountSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(CountSpec::Fixed(n as usize)),
            Raw::Text(s) if s == "auto" => Ok(CountSpec::Auto),
            Raw::Text(s) => Err(D::Error::custom(format!("unknown count \"{s}\""))),
        }
    }
}

impl Default for CountSpec {
    fn default() -> Self {
        CountSpec::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapDistribution {
    #[default]
    Balanced,
    TopHeavy,
    BottomHeavy,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WrapConfig {
    pub enabled: bool,
    pub max_items_per_line: Option<usize>,
    #[serde(alias = "wrapDistribution")]
    pub distribution: WrapDistribution,
    pub line_spacing: f32,
    /// Odd lines shrink and center, giving a staggered look.
    pub alternating: bool,
    /// Items alternate between two rows instead of filling lines.
    pub zigzag: bool,
    /// Fit all wrapped items with one shared font size.
    pub sync_size: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildTemplate {
    #[serde(default)]
    pub count: CountSpec,
    #[serde(default)]
    pub wrap: Option<WrapConfig>,
    pub structure: Box<Container>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSizeRange {
    pub min_size: f32,
    pub max_size: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub color: Option<String>,
    pub font_family: Option<String>,
    pub font_weight: Option<String>,
    pub font_style: Option<String>,
    pub text_align: Option<String>,
    pub line_height: Option<f32>,
    pub font_size_range: Option<FontSizeRange>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BorderStyle {
    pub color: Option<String>,
    pub width: Option<f32>,
    pub radius: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowStyle {
    #[serde(default)]
    pub h: f32,
    #[serde(default)]
    pub v: f32,
    #[serde(default)]
    pub blur: f32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundStyle {
    pub color: String,
}

/// Merge a container's list items into one text body instead of
/// separate children.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombinedText {
    pub enabled: bool,
    /// Per-item line pattern; `{content}` and `{index}` are substituted.
    pub pattern: Option<String>,
    /// Prefix each line with its ordinal.
    pub ordered: bool,
    /// Allow the two-column overflow fallback.
    pub wrapping: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(rename = "type")]
    pub kind: ContainerKind,
    #[serde(default)]
    pub bounds: Option<BoundsSpec>,
    #[serde(default)]
    pub positioning: Option<RelativePositioning>,
    #[serde(default)]
    pub border: Option<BorderStyle>,
    #[serde(default)]
    pub shadow: Option<ShadowStyle>,
    #[serde(default)]
    pub background: Option<BackgroundStyle>,
    /// Role of this node inside a repeated structure ("label",
    /// "content", ...); used to group siblings for unified font sizing.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text: Option<TextStyle>,
    /// Replace the text content with a zero-padded ordinal.
    #[serde(default)]
    pub numbering: bool,
    #[serde(default)]
    pub combined: Option<CombinedText>,
    #[serde(default)]
    pub layout: Option<ChildLayout>,
    #[serde(default)]
    pub children: Vec<Container>,
    #[serde(default)]
    pub child_template: Option<ChildTemplate>,
    #[serde(default)]
    pub z_index: i32,
}

/// Tunable numeric knob exposed by a template, merged into the
/// expression constant table at layout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParameter {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    pub default_value: f64,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Decorative overlay declared by a template. Every variant references
/// containers by id; geometry is derived from their resolved bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphicElement {
    #[serde(rename_all = "camelCase")]
    TitleLine {
        #[serde(default = "default_title_container")]
        container: String,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        thickness: Option<f32>,
    },
    #[serde(rename_all = "camelCase")]
    ContentSeparator {
        containers: [String; 2],
        orientation: Orientation,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        thickness: Option<f32>,
    },
    #[serde(rename_all = "camelCase")]
    CornerDecoration {
        corner: Corner,
        #[serde(default)]
        size: Option<f32>,
        #[serde(default)]
        thickness: Option<f32>,
        #[serde(default)]
        color: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    StraightTimeline {
        container_id: String,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        thickness: Option<f32>,
    },
    #[serde(rename_all = "camelCase")]
    AlternatingTimeline {
        container_id: String,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        thickness: Option<f32>,
    },
    #[serde(rename_all = "camelCase")]
    WrappingTimeline {
        container_id: String,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        thickness: Option<f32>,
    },
    #[serde(rename_all = "camelCase")]
    ZigzagTimeline {
        container_id: String,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        thickness: Option<f32>,
    },
    #[serde(rename_all = "camelCase")]
    TrapezoidPyramid {
        container_id: String,
        #[serde(default)]
        spacing: Option<f32>,
        #[serde(default)]
        colors: Option<Vec<String>>,
        /// Flip to widest-at-top.
        #[serde(default)]
        reverse: bool,
    },
}

fn default_title_container() -> String {
    "title".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parameters: Vec<TemplateParameter>,
    pub containers: BTreeMap<String, Container>,
    #[serde(default)]
    pub graphics: Vec<GraphicElement>,
}

/// Slide content keyed by container id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlideData {
    pub texts: BTreeMap<String, String>,
    pub blocks: BTreeMap<String, Vec<DataItem>>,
    pub images: BTreeMap<String, ImageData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataItem {
    Text(String),
    Labeled { label: String, content: String },
}

impl DataItem {
    pub fn content(&self) -> &str {
        match self {
            DataItem::Text(text) => text,
            DataItem::Labeled { content, .. } => content,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            DataItem::Text(_) => None,
            DataItem::Labeled { label, .. } => Some(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    pub src: String,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

/// Parse a JSON5 template, resolving `{{theme.*}}` placeholders against
/// the given theme before deserializing.
pub fn parse_template(source: &str, theme: &Theme) -> anyhow::Result<Template> {
    let mut value: serde_json::Value =
        json5::from_str(source).context("failed to parse template")?;
    crate::theme::resolve_placeholders(&mut value, theme);
    let template: Template =
        serde_json::from_value(value).context("template does not match the expected shape")?;
    Ok(template)
}

pub fn load_template(path: &Path, theme: &Theme) -> anyhow::Result<Template> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read template {}", path.display()))?;
    parse_template(&source, theme)
}

static BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("list", include_str!("templates/list.json5")),
    ("list", include_str!("templates/labeled_list.json5")),
    ("timeline", include_str!("templates/timeline_straight.json5")),
    (
        "timeline",
        include_str!("templates/timeline_alternating.json5"),
    ),
    ("pyramid", include_str!("templates/pyramid.json5")),
    ("two-column", include_str!("templates/two_column.json5")),
];

static BUILTIN: Lazy<BTreeMap<&'static str, Vec<Template>>> = Lazy::new(|| {
    let theme = Theme::default();
    let mut catalog: BTreeMap<&'static str, Vec<Template>> = BTreeMap::new();
    for (kind, source) in BUILTIN_SOURCES {
        match parse_template(source, &theme) {
            Ok(template) => catalog.entry(*kind).or_default().push(template),
            Err(err) => log::warn!("skipping malformed builtin template: {err:#}"),
        }
    }
    catalog
});

pub fn builtin_templates(kind: &str) -> &'static [Template] {
    BUILTIN.get(kind).map(Vec::as_slice).unwrap_or(&[])
}

pub fn builtin_template_by_id(id: &str) -> Option<&'static Template> {
    BUILTIN
        .values()
        .flat_map(|group| group.iter())
        .find(|t| t.id == id)
}

/// Round-robin picker over template variants. Each layout kind keeps
/// its own cursor so repeated slides of the same kind cycle through
/// variants instead of repeating the first one.
#[derive(Debug, Default)]
pub struct TemplateSelector {
    counters: HashMap<String, usize>,
}

impl TemplateSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next variant for `kind` from `variants`.
    pub fn select<'a>(&mut self, kind: &str, variants: &'a [Template]) -> Option<&'a Template> {
        if variants.is_empty() {
            return None;
        }
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        let picked = &variants[*counter % variants.len()];
        *counter += 1;
        Some(picked)
    }

    /// Pick the next builtin variant for `kind`.
    pub fn next_builtin(&mut self, kind: &str) -> Option<&'static Template> {
        let variants = builtin_templates(kind);
        self.select(kind, variants)
    }

    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_parses_keywords_and_ratios() {
        let d: Distribution = serde_json::from_str("\"space-between\"").unwrap();
        assert_eq!(d, Distribution::SpaceBetween);

        let d: Distribution = serde_json::from_str("\"2/1/1\"").unwrap();
        assert_eq!(d, Distribution::Ratio(vec![2.0, 1.0, 1.0]));

        assert!(serde_json::from_str::<Distribution>("\"spiral\"").is_err());
    }

    #[test]
    fn count_spec_accepts_auto_and_numbers() {
        let c: CountSpec = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(c, CountSpec::Auto);
        let c: CountSpec = serde_json::from_str("3").unwrap();
        assert_eq!(c, CountSpec::Fixed(3));
    }

    #[test]
    fn data_item_accepts_plain_and_labeled_forms() {
        let items: Vec<DataItem> =
            serde_json::from_str(r#"["plain", {"label": "2001", "content": "Founded"}]"#).unwrap();
        assert_eq!(items[0].content(), "plain");
        assert_eq!(items[1].label(), Some("2001"));
        assert_eq!(items[1].content(), "Founded");
    }

    #[test]
    fn dimension_spec_accepts_literal_and_expression() {
        let d: DimensionSpec = serde_json::from_str("120").unwrap();
        assert_eq!(d, DimensionSpec::Literal(120.0));

        let d: DimensionSpec = serde_json::from_str(
            r#"{"expr": "SLIDE_WIDTH - 80", "min": 200, "max": "SLIDE_WIDTH"}"#,
        )
        .unwrap();
        match d {
            DimensionSpec::Expr(e) => {
                assert_eq!(e.expr, ExprValue::Text("SLIDE_WIDTH - 80".into()));
                assert_eq!(e.min, Some(ExprValue::Number(200.0)));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn graphic_element_tagged_by_type() {
        let g: GraphicElement = serde_json::from_str(
            r#"{"type": "straightTimeline", "containerId": "content"}"#,
        )
        .unwrap();
        assert_eq!(
            g,
            GraphicElement::StraightTimeline {
                container_id: "content".into(),
                color: None,
                thickness: None
            }
        );
    }

    #[test]
    fn selector_cycles_per_kind() {
        let a = Template {
            id: "a".into(),
            name: None,
            parameters: vec![],
            containers: BTreeMap::new(),
            graphics: vec![],
        };
        let mut b = a.clone();
        b.id = "b".into();
        let variants = [a, b];

        let mut selector = TemplateSelector::new();
        assert_eq!(selector.select("list", &variants).map(|t| t.id.as_str()), Some("a"));
        assert_eq!(selector.select("list", &variants).map(|t| t.id.as_str()), Some("b"));
        assert_eq!(selector.select("list", &variants).map(|t| t.id.as_str()), Some("a"));
        // Independent cursor per kind.
        assert_eq!(selector.select("pyramid", &variants).map(|t| t.id.as_str()), Some("a"));

        selector.reset();
        assert_eq!(selector.select("list", &variants).map(|t| t.id.as_str()), Some("a"));
    }

    #[test]
    fn builtin_catalog_parses() {
        assert!(!builtin_templates("list").is_empty());
        assert!(!builtin_templates("timeline").is_empty());
        assert!(builtin_template_by_id("pyramid-basic").is_some());
    }
}
