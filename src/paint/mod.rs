//! # Painting
//!
//! The seam between layout and whatever draws pages. A [`Painter`] measures
//! text for layout (via [`TextMeasure`]) and later receives draw calls for
//! every positioned box, page by page.
//!
//! [`RecordingPainter`] keeps the calls as serializable operations. The CLI
//! writes them out as JSON, and tests assert against them.

use serde::Serialize;

use crate::font::{FontMetrics, FontRegistry};
use crate::image_loader::{ImageData, ImagePayload, RasterFormat};
use crate::layout::{LayoutBox, Page};
use crate::style::Color;

/// Text measurement used while laying out lines.
pub trait TextMeasure {
    /// Advance width of `text` set in the font `font` at `size` points.
    fn measure_text_width(&self, text: &str, font: &str, size: f64) -> f64;
    /// Height of one line of the font at `size` points.
    fn text_line_height(&self, font: &str, size: f64) -> f64;
}

/// Font settings for one draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextFont<'a> {
    pub handle: &'a str,
    pub size: f64,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextDecoration<'a> {
    pub underline: bool,
    pub strike: bool,
    pub link: Option<&'a str>,
}

/// Axis-aligned rectangle in page coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A drawing surface.
pub trait Painter: TextMeasure {
    fn add_page(&mut self);
    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn draw_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        font: &TextFont<'_>,
        decoration: &TextDecoration<'_>,
    );
    fn draw_image(&mut self, image: &ImageData, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);
}

/// Replay `pages` onto `painter`, opening a new page for each.
pub fn paint_pages<P: Painter + ?Sized>(pages: &[Page], painter: &mut P) {
    for page in pages {
        painter.add_page();
        for b in &page.boxes {
            paint_box(b, painter);
        }
    }
}

fn paint_box<P: Painter + ?Sized>(b: &LayoutBox, painter: &mut P) {
    match b {
        LayoutBox::Text(t) => {
            let font = TextFont {
                handle: &t.font,
                size: t.style.font_size,
                color: t.style.color,
            };
            let decoration = TextDecoration {
                underline: t.style.underline,
                strike: t.style.strike,
                link: t.link.as_deref(),
            };
            painter.draw_text(&t.text, t.x, t.y, &font, &decoration);
        }
        LayoutBox::Image(i) => painter.draw_image(
            &i.data,
            Rect {
                x: i.x,
                y: i.y,
                width: i.width,
                height: i.height,
            },
        ),
        LayoutBox::Block(block) => {
            for child in &block.children {
                paint_box(child, painter);
            }
            if block.border {
                painter.stroke_rect(Rect {
                    x: block.x,
                    y: block.y,
                    width: block.width,
                    height: block.height,
                });
            }
        }
        LayoutBox::PageBreak => {}
    }
}

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawOp {
    #[serde(rename_all = "camelCase")]
    Text {
        text: String,
        x: f64,
        y: f64,
        font: String,
        size: f64,
        color: Color,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        underline: bool,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        strike: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        link: Option<String>,
    },
    Image {
        format: &'static str,
        #[serde(flatten)]
        rect: Rect,
    },
    Rect {
        #[serde(flatten)]
        rect: Rect,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordedPage {
    pub ops: Vec<DrawOp>,
}

/// [`Painter`] that stores every call, measuring with real font metrics.
#[derive(Debug, Clone, Default)]
pub struct RecordingPainter {
    metrics: FontMetrics,
    pages: Vec<RecordedPage>,
}

impl RecordingPainter {
    pub fn new(fonts: &FontRegistry) -> Self {
        Self {
            metrics: FontMetrics::new(fonts),
            pages: Vec::new(),
        }
    }

    pub fn pages(&self) -> &[RecordedPage] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<RecordedPage> {
        self.pages
    }

    fn record(&mut self, op: DrawOp) {
        if self.pages.is_empty() {
            self.pages.push(RecordedPage::default());
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }
}

impl TextMeasure for RecordingPainter {
    fn measure_text_width(&self, text: &str, font: &str, size: f64) -> f64 {
        self.metrics.measure_text_width(text, font, size)
    }

    fn text_line_height(&self, font: &str, size: f64) -> f64 {
        self.metrics.text_line_height(font, size)
    }
}

impl Painter for RecordingPainter {
    fn add_page(&mut self) {
        self.pages.push(RecordedPage::default());
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        font: &TextFont<'_>,
        decoration: &TextDecoration<'_>,
    ) {
        self.record(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            font: font.handle.to_string(),
            size: font.size,
            color: font.color,
            underline: decoration.underline,
            strike: decoration.strike,
            link: decoration.link.map(str::to_string),
        });
    }

    fn draw_image(&mut self, image: &ImageData, rect: Rect) {
        let format = match &image.payload {
            ImagePayload::Raster {
                format: RasterFormat::Png,
                ..
            } => "png",
            ImagePayload::Raster {
                format: RasterFormat::Jpeg,
                ..
            } => "jpeg",
            ImagePayload::Vector { .. } => "svg",
        };
        self.record(DrawOp::Image { format, rect });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.record(DrawOp::Rect { rect });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BlockBox, TextBox};
    use crate::style::TextStyle;

    fn text_box(text: &str, y: f64) -> LayoutBox {
        let mut style = TextStyle::base("Helvetica");
        style.underline = true;
        LayoutBox::Text(TextBox {
            x: 5.0,
            y,
            width: 20.0,
            height: 12.0,
            font: "Helvetica-Bold".to_string(),
            text: text.to_string(),
            style,
            link: Some("https://example.com".to_string()),
        })
    }

    #[test]
    fn test_one_recorded_page_per_page() {
        let pages = vec![
            Page {
                boxes: vec![text_box("a", 0.0)],
            },
            Page {
                boxes: vec![text_box("b", 0.0), text_box("c", 12.0)],
            },
        ];
        let mut painter = RecordingPainter::default();
        paint_pages(&pages, &mut painter);
        let counts: Vec<usize> = painter.pages().iter().map(|p| p.ops.len()).collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_border_stroked_after_children() {
        let cell = LayoutBox::Block(BlockBox {
            x: 0.0,
            y: 0.0,
            width: 50.0,
            height: 16.0,
            border: true,
            children: vec![text_box("cell", 2.0)],
        });
        let mut painter = RecordingPainter::default();
        paint_pages(&[Page { boxes: vec![cell] }], &mut painter);
        let ops = &painter.pages()[0].ops;
        assert!(matches!(ops[0], DrawOp::Text { .. }));
        assert_eq!(
            ops[1],
            DrawOp::Rect {
                rect: Rect {
                    x: 0.0,
                    y: 0.0,
                    width: 50.0,
                    height: 16.0
                }
            }
        );
    }

    #[test]
    fn test_text_op_carries_decoration() {
        let mut painter = RecordingPainter::default();
        paint_pages(
            &[Page {
                boxes: vec![text_box("x", 3.0)],
            }],
            &mut painter,
        );
        match &painter.pages()[0].ops[0] {
            DrawOp::Text {
                font,
                underline,
                strike,
                link,
                ..
            } => {
                assert_eq!(font, "Helvetica-Bold");
                assert!(*underline);
                assert!(!*strike);
                assert_eq!(link.as_deref(), Some("https://example.com"));
            }
            other => panic!("expected text op, got {:?}", other),
        }
    }

    #[test]
    fn test_draw_without_add_page_opens_one() {
        let mut painter = RecordingPainter::default();
        painter.stroke_rect(Rect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        });
        assert_eq!(painter.pages().len(), 1);
    }

    #[test]
    fn test_recorded_json_shape() {
        let op = DrawOp::Rect {
            rect: Rect {
                x: 1.0,
                y: 2.0,
                width: 3.0,
                height: 4.0,
            },
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": "rect", "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0})
        );
    }
}
