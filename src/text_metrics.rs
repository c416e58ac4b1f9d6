//! Text and image measurement oracles.
//!
//! Font fitting only ever asks "how big is this text at this size,
//! wrapped to this width". That question is answered behind the
//! [`TextMeasurer`] trait so the engine stays deterministic and
//! synchronous: the real implementation reads glyph advances from
//! system fonts, while [`HeuristicMeasurer`] gives tests and headless
//! environments a stable approximation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use ttf_parser::Face;

use crate::template::TextStyle;

pub use crate::layout::types::Size;

const FALLBACK_CHAR_FACTOR: f32 = 0.56;
const DEFAULT_LINE_HEIGHT: f32 = 1.4;

#[derive(Debug, Clone, Copy, Default)]
pub struct MeasureConstraints {
    pub max_width: Option<f32>,
}

pub trait TextMeasurer {
    /// Measure `text` at `font_size`, wrapping to the constraint width
    /// when one is given. Returns the occupied box.
    fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        font_size: f32,
        constraints: MeasureConstraints,
    ) -> Size;
}

/// Natural pixel size of an image, keyed by source reference.
pub trait ImageProbe {
    fn probe(&self, src: &str) -> Option<Size>;
}

/// Probe backed by a fixed table. The host fills it with sizes it
/// already knows; anything absent simply skips cropping.
#[derive(Debug, Clone, Default)]
pub struct StaticImageProbe {
    sizes: BTreeMap<String, Size>,
}

impl StaticImageProbe {
    pub fn new(sizes: BTreeMap<String, Size>) -> Self {
        Self { sizes }
    }
}

impl ImageProbe for StaticImageProbe {
    fn probe(&self, src: &str) -> Option<Size> {
        self.sizes.get(src).copied()
    }
}

/// Pure character-count approximation. Every glyph is
/// `font_size * 0.56` wide, which tracks common UI fonts closely
/// enough for fitting decisions and never touches the filesystem.
#[derive(Debug, Clone)]
pub struct HeuristicMeasurer {
    pub char_width_factor: f32,
}

impl Default for HeuristicMeasurer {
    fn default() -> Self {
        Self {
            char_width_factor: FALLBACK_CHAR_FACTOR,
        }
    }
}

impl TextMeasurer for HeuristicMeasurer {
    fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        font_size: f32,
        constraints: MeasureConstraints,
    ) -> Size {
        if text.is_empty() || font_size <= 0.0 {
            return Size {
                width: 0.0,
                height: 0.0,
            };
        }
        let char_width = font_size * self.char_width_factor;
        let line_height = style.line_height.unwrap_or(DEFAULT_LINE_HEIGHT) * font_size;
        let mut lines = 0usize;
        let mut widest = 0.0f32;
        for paragraph in text.split('\n') {
            let width = paragraph.chars().count() as f32 * char_width;
            match constraints.max_width {
                Some(max) if width > max && max > 0.0 => {
                    let wrapped = (width / max).ceil() as usize;
                    lines += wrapped;
                    widest = widest.max(max);
                }
                _ => {
                    lines += 1;
                    widest = widest.max(width);
                }
            }
        }
        Size {
            width: widest,
            height: lines.max(1) as f32 * line_height,
        }
    }
}

/// Glyph metrics for one resolved face: per-character advances in font
/// units. Only what measurement needs is kept, so the face data itself
/// can be dropped after loading.
struct FaceMetrics {
    units_per_em: f32,
    ascii_advances: [u16; 128],
    extra: HashMap<char, f32>,
}

impl FaceMetrics {
    fn from_face(face: &Face<'_>) -> Self {
        let units_per_em = face.units_per_em().max(1) as f32;
        let mut ascii_advances = [0u16; 128];
        let mut extra = HashMap::new();
        for byte in 0u8..=127 {
            let ch = byte as char;
            if let Some(glyph) = face.glyph_index(ch) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        // Common typographic characters outside ASCII.
        for ch in ['\u{2013}', '\u{2014}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'] {
            if let Some(glyph) = face.glyph_index(ch) {
                if let Some(advance) = face.glyph_hor_advance(glyph) {
                    extra.insert(ch, advance as f32);
                }
            }
        }
        Self {
            units_per_em,
            ascii_advances,
            extra,
        }
    }

    fn char_width(&self, ch: char, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        if (ch as u32) < 128 {
            let advance = self.ascii_advances[ch as usize];
            if advance > 0 {
                return advance as f32 * scale;
            }
        } else if let Some(advance) = self.extra.get(&ch) {
            return advance * scale;
        }
        font_size * FALLBACK_CHAR_FACTOR
    }
}

struct FontInner {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FaceMetrics>>,
}

/// Measurer backed by system fonts via `fontdb`. Face metrics are
/// cached per family string; families that cannot be resolved fall
/// back to the heuristic widths so measurement never fails.
pub struct FontMeasurer {
    inner: Mutex<FontInner>,
}

impl FontMeasurer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FontInner {
                db: Database::new(),
                loaded_system_fonts: false,
                faces: HashMap::new(),
            }),
        }
    }

    fn with_metrics<R>(&self, style: &TextStyle, f: impl FnOnce(Option<&FaceMetrics>) -> R) -> R {
        let family = style
            .font_family
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("sans-serif")
            .to_string();
        let bold = style.font_weight.as_deref() == Some("bold");
        let key = format!("{family}|{}", if bold { "b" } else { "r" });

        let Ok(mut inner) = self.inner.lock() else {
            return f(None);
        };
        if !inner.faces.contains_key(&key) {
            let metrics = load_face_metrics(&mut inner, &family, bold);
            inner.faces.insert(key.clone(), metrics);
        }
        f(inner.faces.get(&key).and_then(|m| m.as_ref()))
    }
}

impl Default for FontMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

fn load_face_metrics(inner: &mut FontInner, family: &str, bold: bool) -> Option<FaceMetrics> {
    let mut names: Vec<String> = Vec::new();
    let mut generics: Vec<Family<'static>> = Vec::new();
    for part in family.split(',') {
        let raw = part.trim().trim_matches('"').trim_matches('\'');
        if raw.is_empty() {
            continue;
        }
        match raw.to_ascii_lowercase().as_str() {
            "serif" => generics.push(Family::Serif),
            "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                generics.push(Family::SansSerif)
            }
            "monospace" | "ui-monospace" => generics.push(Family::Monospace),
            "cursive" => generics.push(Family::Cursive),
            "fantasy" => generics.push(Family::Fantasy),
            _ => names.push(raw.to_string()),
        }
    }

    let mut families: Vec<Family<'_>> = names.iter().map(|n| Family::Name(n)).collect();
    families.extend(generics);
    if families.is_empty() {
        families.push(Family::SansSerif);
    }

    if !inner.loaded_system_fonts {
        inner.db.load_system_fonts();
        inner.loaded_system_fonts = true;
    }

    let query = Query {
        families: &families,
        weight: if bold { Weight::BOLD } else { Weight::NORMAL },
        stretch: Stretch::Normal,
        style: Style::Normal,
    };
    let id = inner.db.query(&query)?;
    let mut metrics = None;
    inner.db.with_face_data(id, |data, index| {
        if let Ok(face) = Face::parse(data, index) {
            metrics = Some(FaceMetrics::from_face(&face));
        }
    });
    metrics
}

impl TextMeasurer for FontMeasurer {
    fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        font_size: f32,
        constraints: MeasureConstraints,
    ) -> Size {
        if text.is_empty() || font_size <= 0.0 {
            return Size {
                width: 0.0,
                height: 0.0,
            };
        }
        let line_height = style.line_height.unwrap_or(DEFAULT_LINE_HEIGHT) * font_size;

        self.with_metrics(style, |metrics| {
            let char_width = |ch: char| match metrics {
                Some(m) => m.char_width(ch, font_size),
                None => font_size * FALLBACK_CHAR_FACTOR,
            };
            let word_width =
                |word: &str| word.chars().map(char_width).sum::<f32>();
            let space_width = char_width(' ');

            let mut lines = 0usize;
            let mut widest = 0.0f32;
            for paragraph in text.split('\n') {
                let words: Vec<&str> = paragraph.split_whitespace().collect();
                if words.is_empty() {
                    lines += 1;
                    continue;
                }
                let mut current = 0.0f32;
                let mut line_used = false;
                for word in words {
                    let width = word_width(word);
                    let candidate = if line_used {
                        current + space_width + width
                    } else {
                        width
                    };
                    let fits = match constraints.max_width {
                        Some(max) => candidate <= max || !line_used,
                        None => true,
                    };
                    if fits {
                        current = candidate;
                        line_used = true;
                    } else {
                        lines += 1;
                        widest = widest.max(current);
                        current = width;
                    }
                }
                lines += 1;
                widest = widest.max(current);
            }

            Size {
                width: widest,
                height: lines.max(1) as f32 * line_height,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> TextStyle {
        TextStyle::default()
    }

    #[test]
    fn heuristic_is_linear_in_length() {
        let m = HeuristicMeasurer::default();
        let a = m.measure("ab", &style(), 20.0, MeasureConstraints::default());
        let b = m.measure("abcd", &style(), 20.0, MeasureConstraints::default());
        assert!((b.width - 2.0 * a.width).abs() < 1e-3);
        assert_eq!(a.height, b.height);
    }

    #[test]
    fn heuristic_wraps_to_constraint() {
        let m = HeuristicMeasurer::default();
        let size = m.measure(
            "a very long piece of text that cannot fit on a single line",
            &style(),
            20.0,
            MeasureConstraints {
                max_width: Some(100.0),
            },
        );
        assert!(size.width <= 100.0);
        assert!(size.height > 20.0 * DEFAULT_LINE_HEIGHT * 2.0);
    }

    #[test]
    fn empty_text_is_zero() {
        let m = HeuristicMeasurer::default();
        let size = m.measure("", &style(), 20.0, MeasureConstraints::default());
        assert_eq!(size.width, 0.0);
        assert_eq!(size.height, 0.0);
    }

    #[test]
    fn explicit_newlines_count_as_lines() {
        let m = HeuristicMeasurer::default();
        let size = m.measure("a\nb\nc", &style(), 10.0, MeasureConstraints::default());
        assert!((size.height - 3.0 * 10.0 * DEFAULT_LINE_HEIGHT).abs() < 1e-3);
    }

    #[test]
    fn font_measurer_never_fails() {
        // Unresolvable family falls back to heuristic widths.
        let m = FontMeasurer::new();
        let mut style = style();
        style.font_family = Some("NoSuchFontFamily".to_string());
        let size = m.measure("hello", &style, 16.0, MeasureConstraints::default());
        assert!(size.width > 0.0);
        assert!(size.height >= 16.0);
    }

    #[test]
    fn static_probe_returns_known_sizes() {
        let mut sizes = BTreeMap::new();
        sizes.insert(
            "hero.png".to_string(),
            Size {
                width: 1600.0,
                height: 900.0,
            },
        );
        let probe = StaticImageProbe::new(sizes);
        assert_eq!(probe.probe("hero.png").map(|s| s.width), Some(1600.0));
        assert!(probe.probe("missing.png").is_none());
    }
}
