use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideKind {
    Title,
    #[default]
    Content,
    Bullet,
}

impl SlideKind {
    /// Unknown kinds ("image", "chart", ...) render as plain content.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "title" => SlideKind::Title,
            "bullet" => SlideKind::Bullet,
            _ => SlideKind::Content,
        }
    }
}

impl<'de> Deserialize<'de> for SlideKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(Value::as_str)
            .map(SlideKind::parse)
            .unwrap_or_default())
    }
}

/// Text field that tolerates `null` and scalars.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// Bullet list that drops `null` and non-text entries.
fn lenient_bullets<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

/// A generated slide. `html` is filled in after rendering.
///
/// Clients send slides back for export, so every field is optional on input
/// and malformed values degrade to defaults instead of failing the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: SlideKind,
    #[serde(
        rename = "bulletPoints",
        default,
        deserialize_with = "lenient_bullets",
        skip_serializing_if = "Option::is_none"
    )]
    pub bullet_points: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Slide deck payload as returned by the model for structured generation.
#[derive(Debug, Clone, Deserialize)]
pub struct SlideDeck {
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideStyle {
    #[default]
    Professional,
    Creative,
    Minimal,
    Academic,
}

impl SlideStyle {
    pub const ALL: [SlideStyle; 4] = [
        SlideStyle::Professional,
        SlideStyle::Creative,
        SlideStyle::Minimal,
        SlideStyle::Academic,
    ];

    /// Parses a style name, falling back to `Professional` for anything unknown.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "creative" => SlideStyle::Creative,
            "minimal" => SlideStyle::Minimal,
            "academic" => SlideStyle::Academic,
            _ => SlideStyle::Professional,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlideStyle::Professional => "professional",
            SlideStyle::Creative => "creative",
            SlideStyle::Minimal => "minimal",
            SlideStyle::Academic => "academic",
        }
    }

    pub fn colors(&self) -> ColorScheme {
        match self {
            SlideStyle::Professional => ColorScheme {
                primary: "#1a365d",
                secondary: "#2b6cb0",
                accent: "#ed8936",
                background: "linear-gradient(135deg, #667eea 0%, #764ba2 100%)",
                text: "#ffffff",
                ..ColorScheme::CARD
            },
            SlideStyle::Creative => ColorScheme {
                primary: "#e53e3e",
                secondary: "#dd6b20",
                accent: "#38a169",
                background: "linear-gradient(135deg, #ff6b6b 0%, #feca57 100%)",
                text: "#ffffff",
                ..ColorScheme::CARD
            },
            SlideStyle::Minimal => ColorScheme {
                primary: "#000000",
                secondary: "#2d3748",
                accent: "#4299e1",
                background: "linear-gradient(135deg, #f8f9fa 0%, #e9ecef 100%)",
                text: "#2d3748",
                ..ColorScheme::CARD
            },
            SlideStyle::Academic => ColorScheme {
                primary: "#2c5282",
                secondary: "#2b6cb0",
                accent: "#d69e2e",
                background: "linear-gradient(135deg, #4a5568 0%, #2d3748 100%)",
                text: "#ffffff",
                ..ColorScheme::CARD
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub background: &'static str,
    pub text: &'static str,
    pub card_bg: &'static str,
    pub card_text: &'static str,
}

impl ColorScheme {
    // Card colors are shared by every style.
    const CARD: ColorScheme = ColorScheme {
        primary: "",
        secondary: "",
        accent: "",
        background: "",
        text: "",
        card_bg: "#ffffff",
        card_text: "#2d3748",
    };
}

/// JSON Schema handed to the model for structured slide generation.
pub fn slide_deck_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "slides": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "content": { "type": "string" },
                        "type": { "type": "string", "enum": ["title", "content", "bullet"] },
                        "bulletPoints": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["title", "content", "type"]
                }
            }
        },
        "required": ["slides"]
    })
}
