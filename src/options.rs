//! # Conversion Options
//!
//! Everything a caller can configure about a conversion: page geometry,
//! spacing, fonts, style overrides and regex text-style rules. Every field
//! is defaulted, so `{}` is a valid options document.

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::style::{Color, CompiledRule, StyleOverride, TextStyle, TextStyleRule};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    #[serde(default)]
    pub page: PageConfig,

    /// Vertical gap added after each nested block.
    #[serde(default)]
    pub spacing: Option<f64>,

    /// Fonts available to the document. The first entry is the default
    /// family; an empty list means Helvetica.
    #[serde(default)]
    pub fonts: Vec<FontSpec>,

    #[serde(default)]
    pub styles: StyleOptions,

    /// Regex rules restyling matching spans inside text nodes, in order.
    #[serde(default)]
    pub text_style: Vec<TextStyleRule>,
}

impl Options {
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Name of the default font family.
    pub fn default_family(&self) -> &str {
        self.fonts.first().map(FontSpec::name).unwrap_or("Helvetica")
    }

    /// The document's base text style: built-in defaults, then the default
    /// family, then `styles.default`.
    pub fn base_style(&self) -> TextStyle {
        TextStyle::base(self.default_family()).with(&self.styles.default)
    }

    /// Built-in heading and link styles with user overrides layered on top.
    pub fn style_config(&self) -> StyleConfig {
        let builtin = StyleConfig::default();
        let user = &self.styles;
        let user_heads = [
            &user.head1,
            &user.head2,
            &user.head3,
            &user.head4,
            &user.head5,
            &user.head6,
        ];
        let mut headings = builtin.headings.clone();
        for (heading, over) in headings.iter_mut().zip(user_heads) {
            *heading = heading.merged(over);
        }
        StyleConfig {
            link: builtin.link.merged(&user.link),
            headings,
        }
    }

    /// Compile the text style rules. Fails on the first invalid pattern.
    pub fn compile_rules(&self) -> Result<Vec<CompiledRule>, ConvertError> {
        self.text_style.iter().map(TextStyleRule::compile).collect()
    }
}

/// Resolved heading and link overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub link: StyleOverride,
    /// `head1` through `head6`.
    pub headings: [StyleOverride; 6],
}

impl StyleConfig {
    /// Override for a heading of the given depth. Depths outside 1..=6 clamp.
    pub fn heading(&self, depth: u8) -> &StyleOverride {
        let index = usize::from(depth.clamp(1, 6)) - 1;
        &self.headings[index]
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            link: StyleOverride {
                color: Some(Color::hex("#0000FF")),
                underline: Some(true),
                ..Default::default()
            },
            headings: [
                StyleOverride::font_size(24.0),
                StyleOverride::font_size(22.0),
                StyleOverride::font_size(20.0),
                StyleOverride::font_size(18.0),
                StyleOverride::font_size(16.0),
                StyleOverride::font_size(14.0),
            ],
        }
    }
}

/// User style overrides as written in configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleOptions {
    #[serde(default)]
    pub default: StyleOverride,
    #[serde(default)]
    pub link: StyleOverride,
    #[serde(default)]
    pub head1: StyleOverride,
    #[serde(default)]
    pub head2: StyleOverride,
    #[serde(default)]
    pub head3: StyleOverride,
    #[serde(default)]
    pub head4: StyleOverride,
    #[serde(default)]
    pub head5: StyleOverride,
    #[serde(default)]
    pub head6: StyleOverride,
}

/// A font made available to the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontSpec {
    /// One of the standard families: Courier, Helvetica, Times, Symbol,
    /// ZapfDingbats.
    Standard(String),
    Custom(CustomFont),
}

impl FontSpec {
    pub fn name(&self) -> &str {
        match self {
            FontSpec::Standard(name) => name,
            FontSpec::Custom(font) => &font.name,
        }
    }
}

/// A custom font family. Each variant is base64 or a `data:` URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFont {
    pub name: String,
    pub normal: String,
    #[serde(default)]
    pub bold: Option<String>,
    #[serde(default)]
    pub italic: Option<String>,
    #[serde(default)]
    pub bolditalic: Option<String>,
}

/// Page size, orientation and margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page size. Defaults to A4.
    #[serde(default)]
    pub size: PageSize,

    #[serde(default)]
    pub orientation: Orientation,

    /// Margins in points. A bare number applies to all four edges.
    #[serde(default = "default_margin", deserialize_with = "deserialize_margin")]
    pub margin: Edges,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin: default_margin(),
        }
    }
}

impl PageConfig {
    /// Page (width, height) in points after orientation.
    pub fn dimensions(&self) -> (f64, f64) {
        let (w, h) = self.size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn content_width(&self) -> f64 {
        self.dimensions().0 - self.margin.horizontal()
    }

    pub fn content_height(&self) -> f64 {
        self.dimensions().1 - self.margin.vertical()
    }
}

fn default_margin() -> Edges {
    Edges::uniform(40.0)
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Edge values (top, right, bottom, left).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Margin spellings: `40` or `{ "top": 20 }` (missing edges stay at 40).
#[derive(Deserialize)]
#[serde(untagged)]
enum MarginValue {
    Uniform(f64),
    Partial {
        top: Option<f64>,
        right: Option<f64>,
        bottom: Option<f64>,
        left: Option<f64>,
    },
}

fn deserialize_margin<'de, D>(deserializer: D) -> Result<Edges, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let fallback = default_margin();
    Ok(match MarginValue::deserialize(deserializer)? {
        MarginValue::Uniform(v) => Edges::uniform(v),
        MarginValue::Partial {
            top,
            right,
            bottom,
            left,
        } => Edges {
            top: top.unwrap_or(fallback.top),
            right: right.unwrap_or(fallback.right),
            bottom: bottom.unwrap_or(fallback.bottom),
            left: left.unwrap_or(fallback.left),
        },
    })
}
