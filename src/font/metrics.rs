//! # Font Metrics
//!
//! Glyph advance widths and line heights for the standard fonts (from the
//! Adobe AFM files) and for custom fonts (via ttf-parser).
//!
//! Oblique Helvetica shares the upright widths exactly. Times italics are
//! measured with the upright tables, which is close enough for wrapping.

use std::collections::HashMap;

use crate::font::FontRegistry;
use crate::paint::TextMeasure;

/// Advance widths for one standard font, in 1/1000 em.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    /// Widths of ASCII 32..=126.
    widths: &'static [u16; 95],
    /// Width used for characters outside the table.
    default_width: u16,
    /// Font bounding box height over 1000 (ascent of the bbox minus its descent).
    line_height: f64,
}

impl StandardFontMetrics {
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let code = ch as u32;
        let w = if (32..=126).contains(&code) {
            self.widths[(code - 32) as usize]
        } else if ch == '\u{2022}' {
            350
        } else if ch == '\u{00A0}' {
            self.widths[0]
        } else {
            self.default_width
        };
        w as f64 / 1000.0 * font_size
    }

    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }

    pub fn line_height(&self, font_size: f64) -> f64 {
        self.line_height * font_size
    }

    /// Metrics for a standard font handle such as `Times-Bold`.
    pub fn for_handle(handle: &str) -> Option<Self> {
        let m = match handle {
            "Helvetica" => Self::new(&HELVETICA, 556, 1.156),
            "Helvetica-Oblique" => Self::new(&HELVETICA, 556, 1.156),
            "Helvetica-Bold" => Self::new(&HELVETICA_BOLD, 611, 1.19),
            "Helvetica-BoldOblique" => Self::new(&HELVETICA_BOLD, 611, 1.19),
            "Times-Roman" => Self::new(&TIMES_ROMAN, 500, 1.116),
            "Times-Italic" => Self::new(&TIMES_ROMAN, 500, 1.1),
            "Times-Bold" => Self::new(&TIMES_BOLD, 500, 1.153),
            "Times-BoldItalic" => Self::new(&TIMES_BOLD, 500, 1.139),
            "Courier" | "Courier-Oblique" => Self::new(&COURIER, 600, 1.055),
            "Courier-Bold" | "Courier-BoldOblique" => Self::new(&COURIER, 600, 1.051),
            "Symbol" => Self::new(&COURIER, 600, 1.303),
            "ZapfDingbats" => Self::new(&COURIER, 600, 0.963),
            _ => return None,
        };
        Some(m)
    }

    const fn new(widths: &'static [u16; 95], default_width: u16, line_height: f64) -> Self {
        Self {
            widths,
            default_width,
            line_height,
        }
    }
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    pub fn line_height(&self, font_size: f64) -> f64 {
        let units = self.ascender as f64 - self.descender as f64 + self.line_gap as f64;
        units / self.units_per_em as f64 * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            line_gap: face.line_gap(),
        })
    }
}

/// [`TextMeasure`] backed by real font metrics. Unknown handles measure as
/// Helvetica.
#[derive(Debug, Clone, Default)]
pub struct FontMetrics {
    custom: HashMap<String, CustomFontMetrics>,
}

impl FontMetrics {
    /// Metrics for the standard fonts plus every custom font in `registry`.
    pub fn new(registry: &FontRegistry) -> Self {
        let custom = registry
            .custom_fonts()
            .filter_map(|(handle, data)| {
                CustomFontMetrics::from_font_data(data).map(|m| (handle.to_string(), m))
            })
            .collect();
        Self { custom }
    }

    fn standard(handle: &str) -> StandardFontMetrics {
        StandardFontMetrics::for_handle(handle)
            .unwrap_or(StandardFontMetrics::new(&HELVETICA, 556, 1.156))
    }
}

impl TextMeasure for FontMetrics {
    fn measure_text_width(&self, text: &str, font: &str, size: f64) -> f64 {
        match self.custom.get(font) {
            Some(m) => text.chars().map(|ch| m.char_width(ch, size)).sum(),
            None => Self::standard(font).measure_string(text, size),
        }
    }

    fn text_line_height(&self, font: &str, size: f64) -> f64 {
        match self.custom.get(font) {
            Some(m) => m.line_height(size),
            None => Self::standard(font).line_height(size),
        }
    }
}

#[rustfmt::skip]
static HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
static TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
static TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

static COURIER: [u16; 95] = [600; 95];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_space_width() {
        let m = FontMetrics::default();
        let w = m.measure_text_width(" ", "Helvetica", 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_bold_wider() {
        let m = FontMetrics::default();
        let regular = m.measure_text_width("Hello", "Helvetica", 12.0);
        let bold = m.measure_text_width("Hello", "Helvetica-Bold", 12.0);
        assert!(bold > regular);
    }

    #[test]
    fn test_courier_is_monospaced() {
        let m = FontMetrics::default();
        assert_eq!(
            m.measure_text_width("iiii", "Courier", 10.0),
            m.measure_text_width("MMMM", "Courier", 10.0)
        );
        assert!((m.measure_text_width("ab", "Courier", 10.0) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_height_from_bbox() {
        let m = FontMetrics::default();
        assert!((m.text_line_height("Helvetica", 10.0) - 11.56).abs() < 1e-9);
        assert!((m.text_line_height("Times-Roman", 10.0) - 11.16).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_handle_measures_as_helvetica() {
        let m = FontMetrics::default();
        assert_eq!(
            m.measure_text_width("abc", "Mystery", 12.0),
            m.measure_text_width("abc", "Helvetica", 12.0)
        );
    }

    #[test]
    fn test_table_sanity() {
        // Spot checks against the AFM files.
        let helv = StandardFontMetrics::for_handle("Helvetica").unwrap();
        assert!((helv.char_width('W', 1000.0) - 944.0).abs() < 1e-9);
        assert!((helv.char_width('i', 1000.0) - 222.0).abs() < 1e-9);
        let times = StandardFontMetrics::for_handle("Times-Roman").unwrap();
        assert!((times.char_width('m', 1000.0) - 778.0).abs() < 1e-9);
        let times_bold = StandardFontMetrics::for_handle("Times-Bold").unwrap();
        assert!((times_bold.char_width('W', 1000.0) - 1000.0).abs() < 1e-9);
    }
}
