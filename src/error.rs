//! Structured error types for the conversion pipeline.
//!
//! Only fatal conditions live here: bad input, bad configuration, and layout
//! contract violations. Recoverable conditions (unsupported nodes, missing
//! images, unresolved references) are [`crate::diagnostics::Diagnostic`]s.

use thiserror::Error;

use crate::layout::LayoutError;

/// The unified error type returned by the public conversion functions.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// JSON input failed to parse as an mdast tree or as options.
    #[error("Failed to parse document: {source}{}", render_hint(.hint))]
    ParseError {
        source: serde_json::Error,
        hint: String,
    },
    /// A configured text style pattern is not a valid regex.
    #[error("Invalid text style pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// A custom font could not be decoded.
    #[error("Font error: {0}")]
    FontError(String),
    /// Layout hit a contract violation.
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}

fn render_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected mdast shape. Check node types and field names.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ConvertError::ParseError { source: e, hint }
    }
}
