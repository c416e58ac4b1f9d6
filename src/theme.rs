use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub font_family: String,
    pub title_font_family: String,
    pub label_font_family: String,
    pub font_color: String,
    pub title_font_color: String,
    pub background_color: String,
    pub border_color: String,
    pub line_color: String,
    /// Accent palette indexed by `themeColors[i]` placeholders and by
    /// the graphics renderer for multi-item decorations.
    pub theme_colors: Vec<String>,
    pub card: CardTheme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTheme {
    pub border_width: f32,
    pub border_radius: f32,
}

impl Theme {
    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            title_font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif"
                .to_string(),
            label_font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif"
                .to_string(),
            font_color: "#1C2430".to_string(),
            title_font_color: "#111827".to_string(),
            background_color: "#FFFFFF".to_string(),
            border_color: "#C7D2E5".to_string(),
            line_color: "#7A8AA6".to_string(),
            theme_colors: vec![
                "#4F6BED".to_string(),
                "#12B5A5".to_string(),
                "#F0A202".to_string(),
                "#E4572E".to_string(),
                "#9B5DE5".to_string(),
            ],
            card: CardTheme {
                border_width: 1.0,
                border_radius: 8.0,
            },
        }
    }

    pub fn classic() -> Self {
        Self {
            font_family: "Georgia, Times New Roman, serif".to_string(),
            title_font_family: "Georgia, Times New Roman, serif".to_string(),
            label_font_family: "Verdana, Geneva, sans-serif".to_string(),
            font_color: "#333333".to_string(),
            title_font_color: "#1A1A1A".to_string(),
            background_color: "#FDFBF7".to_string(),
            border_color: "#B8A98A".to_string(),
            line_color: "#8C7B5E".to_string(),
            theme_colors: vec![
                "#7C3A2D".to_string(),
                "#3E5C45".to_string(),
                "#A67C00".to_string(),
                "#39506B".to_string(),
            ],
            card: CardTheme {
                border_width: 1.5,
                border_radius: 4.0,
            },
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "classic" => Some(Self::classic()),
            _ => None,
        }
    }

    /// Accent color for item `index`, cycling through the palette.
    pub fn accent(&self, index: usize) -> &str {
        if self.theme_colors.is_empty() {
            return &self.border_color;
        }
        &self.theme_colors[index % self.theme_colors.len()]
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(rest) = key.strip_prefix("themeColors[") {
            let index: usize = rest.strip_suffix(']')?.parse().ok()?;
            return self.theme_colors.get(index).map(|c| Value::from(c.clone()));
        }
        match key {
            "fontName" | "fontFamily" => Some(Value::from(self.font_family.clone())),
            "titleFontName" | "titleFontFamily" => {
                Some(Value::from(self.title_font_family.clone()))
            }
            "labelFontName" | "labelFontFamily" => {
                Some(Value::from(self.label_font_family.clone()))
            }
            "fontColor" => Some(Value::from(self.font_color.clone())),
            "titleFontColor" => Some(Value::from(self.title_font_color.clone())),
            "backgroundColor" => Some(Value::from(self.background_color.clone())),
            "borderColor" => Some(Value::from(self.border_color.clone())),
            "lineColor" => Some(Value::from(self.line_color.clone())),
            "card.borderWidth" => Some(Value::from(self.card.border_width)),
            "card.borderRadius" => Some(Value::from(self.card.border_radius)),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{theme\.([A-Za-z0-9_.\[\]]+)\}\}").unwrap());

/// Walk a parsed template and substitute `{{theme.*}}` placeholders.
///
/// A string that is exactly one placeholder takes the theme value's own
/// type, so `"{{theme.card.borderWidth}}"` becomes a number. Strings
/// with embedded placeholders get plain text substitution. Unknown keys
/// resolve to an empty string with a warning.
pub fn resolve_placeholders(value: &mut Value, theme: &Theme) {
    match value {
        Value::String(text) => {
            if let Some(caps) = PLACEHOLDER.captures(text) {
                let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                if whole == text.as_str() {
                    let key = &caps[1];
                    *value = theme.lookup(key).unwrap_or_else(|| {
                        log::warn!("unknown theme placeholder \"{key}\"");
                        Value::from("")
                    });
                    return;
                }
                let replaced = PLACEHOLDER.replace_all(text, |caps: &regex::Captures<'_>| {
                    match theme.lookup(&caps[1]) {
                        Some(Value::String(s)) => s,
                        Some(other) => other.to_string(),
                        None => {
                            log::warn!("unknown theme placeholder \"{}\"", &caps[1]);
                            String::new()
                        }
                    }
                });
                *value = Value::from(replaced.into_owned());
            }
        }
        Value::Array(items) => {
            for item in items {
                resolve_placeholders(item, theme);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                resolve_placeholders(item, theme);
            }
        }
        _ => {}
    }
}
