//! # Font Management
//!
//! Resolves a logical family plus bold/italic flags to a concrete font
//! handle. The five standard families are always available; custom
//! TrueType/OpenType families are registered from configuration. Unknown
//! families fall back to the document's default family.

pub mod metrics;

pub use metrics::{CustomFontMetrics, FontMetrics};

use std::collections::HashMap;

use base64::Engine;

use crate::error::ConvertError;
use crate::options::FontSpec;

/// Concrete font handles for one family. Only `normal` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredFont {
    pub normal: String,
    pub bold: Option<String>,
    pub italic: Option<String>,
    pub bolditalic: Option<String>,
}

impl RegisteredFont {
    fn standard(normal: &str, bold: &str, italic: &str, bolditalic: &str) -> Self {
        Self {
            normal: normal.to_string(),
            bold: Some(bold.to_string()),
            italic: Some(italic.to_string()),
            bolditalic: Some(bolditalic.to_string()),
        }
    }

    fn single(normal: &str) -> Self {
        Self {
            normal: normal.to_string(),
            bold: None,
            italic: None,
            bolditalic: None,
        }
    }

    /// Pick the handle for the requested style. Bold-italic wins over bold,
    /// bold over italic; a missing variant falls through to the next one and
    /// finally to `normal`.
    pub fn variant(&self, bold: bool, italic: bool) -> &str {
        if bold && italic {
            if let Some(handle) = &self.bolditalic {
                return handle;
            }
        }
        if bold {
            if let Some(handle) = &self.bold {
                return handle;
            }
        }
        if italic {
            if let Some(handle) = &self.italic {
                return handle;
            }
        }
        &self.normal
    }
}

/// Family name → handles, plus the raw bytes of custom fonts keyed by handle.
#[derive(Debug, Clone)]
pub struct FontRegistry {
    families: HashMap<String, RegisteredFont>,
    custom_data: HashMap<String, Vec<u8>>,
    default_family: String,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    /// A registry with only the standard families and Helvetica as default.
    pub fn new() -> Self {
        let mut families = HashMap::new();
        families.insert(
            "Helvetica".to_string(),
            RegisteredFont::standard(
                "Helvetica",
                "Helvetica-Bold",
                "Helvetica-Oblique",
                "Helvetica-BoldOblique",
            ),
        );
        families.insert(
            "Times".to_string(),
            RegisteredFont::standard(
                "Times-Roman",
                "Times-Bold",
                "Times-Italic",
                "Times-BoldItalic",
            ),
        );
        families.insert(
            "Courier".to_string(),
            RegisteredFont::standard(
                "Courier",
                "Courier-Bold",
                "Courier-Oblique",
                "Courier-BoldOblique",
            ),
        );
        families.insert("Symbol".to_string(), RegisteredFont::single("Symbol"));
        families.insert(
            "ZapfDingbats".to_string(),
            RegisteredFont::single("ZapfDingbats"),
        );

        Self {
            families,
            custom_data: HashMap::new(),
            default_family: "Helvetica".to_string(),
        }
    }

    /// Build a registry from the configured font list. The first entry
    /// becomes the default family.
    pub fn from_specs(specs: &[FontSpec]) -> Result<Self, ConvertError> {
        let mut registry = Self::new();
        for spec in specs {
            if let FontSpec::Custom(font) = spec {
                let normal = decode_font_source(&font.name, &font.normal)?;
                registry.register(&font.name, "", normal);
                if let Some(src) = &font.bold {
                    let data = decode_font_source(&font.name, src)?;
                    registry.register(&font.name, "Bold", data);
                }
                if let Some(src) = &font.italic {
                    let data = decode_font_source(&font.name, src)?;
                    registry.register(&font.name, "Italic", data);
                }
                if let Some(src) = &font.bolditalic {
                    let data = decode_font_source(&font.name, src)?;
                    registry.register(&font.name, "BoldItalic", data);
                }
            }
        }
        if let Some(first) = specs.first() {
            let name = first.name();
            if registry.families.contains_key(name) {
                registry.default_family = name.to_string();
            } else {
                log::warn!("Default font '{}' is not a known family, using Helvetica", name);
            }
        }
        Ok(registry)
    }

    /// Register one variant of a custom family. `suffix` is empty for the
    /// normal face, otherwise `Bold`, `Italic` or `BoldItalic`; the handle is
    /// `Name` or `Name-Suffix`.
    pub fn register(&mut self, family: &str, suffix: &str, data: Vec<u8>) {
        let handle = if suffix.is_empty() {
            family.to_string()
        } else {
            format!("{}-{}", family, suffix)
        };
        let entry = self
            .families
            .entry(family.to_string())
            .or_insert_with(|| RegisteredFont::single(family));
        match suffix {
            "Bold" => entry.bold = Some(handle.clone()),
            "Italic" => entry.italic = Some(handle.clone()),
            "BoldItalic" => entry.bolditalic = Some(handle.clone()),
            _ => entry.normal = handle.clone(),
        }
        self.custom_data.insert(handle, data);
    }

    /// Look up a family, falling back to the default family.
    pub fn resolve(&self, family: &str) -> &RegisteredFont {
        self.families
            .get(family)
            .or_else(|| self.families.get(&self.default_family))
            .unwrap_or_else(|| &self.families["Helvetica"])
    }

    /// Resolve a family and style straight to a handle.
    pub fn handle(&self, family: &str, bold: bool, italic: bool) -> &str {
        self.resolve(family).variant(bold, italic)
    }

    pub fn default_family(&self) -> &str {
        &self.default_family
    }

    /// Raw bytes of a custom font handle. `None` for standard fonts.
    pub fn font_data(&self, handle: &str) -> Option<&[u8]> {
        self.custom_data.get(handle).map(Vec::as_slice)
    }

    /// Iterate over custom font handles and their bytes.
    pub fn custom_fonts(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.custom_data
            .iter()
            .map(|(handle, data)| (handle.as_str(), data.as_slice()))
    }
}

/// Decode base64 or a `data:` URI into font bytes and check they parse.
fn decode_font_source(family: &str, src: &str) -> Result<Vec<u8>, ConvertError> {
    let b64 = if src.starts_with("data:") {
        src.split_once(',').map(|(_, rest)| rest).unwrap_or("")
    } else {
        src
    };
    let data = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| ConvertError::FontError(format!("{}: base64 decode error: {}", family, e)))?;
    ttf_parser::Face::parse(&data, 0)
        .map_err(|e| ConvertError::FontError(format!("{}: {}", family, e)))?;
    Ok(data)
}
