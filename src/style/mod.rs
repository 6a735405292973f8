//! # Text Styles
//!
//! The style vocabulary threaded through the render tree: a fully resolved
//! [`TextStyle`] carried by every text run, and the partial [`StyleOverride`]
//! used by configuration, headings, links and text-style rules.
//!
//! Overrides only ever layer on top of a resolved style. Nothing here
//! cascades implicitly; the transformer decides which override applies where.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// A fully resolved text style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Logical font family name, resolved through the font registry.
    pub font: String,
    /// Font size in points.
    pub font_size: f64,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
}

impl TextStyle {
    /// The base style for a document whose default family is `font`.
    pub fn base(font: &str) -> Self {
        Self {
            font: font.to_string(),
            font_size: 12.0,
            color: Color::BLACK,
            bold: false,
            italic: false,
            underline: false,
            strike: false,
        }
    }

    /// Return a copy of this style with `over` applied on top.
    pub fn with(&self, over: &StyleOverride) -> Self {
        Self {
            font: over.font.clone().unwrap_or_else(|| self.font.clone()),
            font_size: over.font_size.unwrap_or(self.font_size),
            color: over.color.unwrap_or(self.color),
            bold: over.bold.unwrap_or(self.bold),
            italic: over.italic.unwrap_or(self.italic),
            underline: over.underline.unwrap_or(self.underline),
            strike: over.strike.unwrap_or(self.strike),
        }
    }
}

/// A partial text style. Unset fields leave the underlying style alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOverride {
    pub font: Option<String>,
    pub font_size: Option<f64>,
    pub color: Option<Color>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strike: Option<bool>,
}

impl StyleOverride {
    pub fn font_size(size: f64) -> Self {
        Self {
            font_size: Some(size),
            ..Default::default()
        }
    }

    /// Layer `other` over `self`; fields set in `other` win.
    pub fn merged(&self, other: &StyleOverride) -> Self {
        Self {
            font: other.font.clone().or_else(|| self.font.clone()),
            font_size: other.font_size.or(self.font_size),
            color: other.color.or(self.color),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
            strike: other.strike.or(self.strike),
        }
    }
}

/// Horizontal alignment of an inline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// A regex-driven style rule as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyleRule {
    pub pattern: String,
    #[serde(default)]
    pub style: StyleOverride,
}

impl TextStyleRule {
    pub fn compile(&self) -> Result<CompiledRule, ConvertError> {
        let regex = Regex::new(&self.pattern).map_err(|source| ConvertError::InvalidPattern {
            pattern: self.pattern.clone(),
            source,
        })?;
        Ok(CompiledRule {
            regex,
            style: self.style.clone(),
        })
    }
}

/// A text style rule with its pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub regex: Regex,
    pub style: StyleOverride,
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorValue")]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const BLUE: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// `#rgb` or `#rrggbb`. Anything else, including non-hex digits, is black.
    pub fn hex(hex: &str) -> Self {
        let digits: Option<Vec<u8>> = hex
            .trim_start_matches('#')
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect();
        let (r, g, b) = match digits.as_deref() {
            Some(&[r, g, b]) => (r * 17, g * 17, b * 17),
            Some(&[r1, r2, g1, g2, b1, b2]) => (r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2),
            _ => return Color::BLACK,
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        }
    }

    /// Parse a CSS-ish color name or hex string. Unknown names are black.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with('#') {
            return Self::hex(value);
        }
        match value.to_ascii_lowercase().as_str() {
            "white" => Color::WHITE,
            "red" => Color::rgb(1.0, 0.0, 0.0),
            "green" => Color::rgb(0.0, 128.0 / 255.0, 0.0),
            "blue" => Color::BLUE,
            "gray" | "grey" => Color::rgb(0.5, 0.5, 0.5),
            _ => Color::BLACK,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Accepted spellings of a color in configuration.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorValue {
    Named(String),
    Rgba {
        r: f64,
        g: f64,
        b: f64,
        #[serde(default = "opaque")]
        a: f64,
    },
}

fn opaque() -> f64 {
    1.0
}

impl From<ColorValue> for Color {
    fn from(value: ColorValue) -> Self {
        match value {
            ColorValue::Named(name) => Color::parse(&name),
            ColorValue::Rgba { r, g, b, a } => Color { r, g, b, a },
        }
    }
}
