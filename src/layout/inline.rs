//! # Inline Flow
//!
//! Places a sequence of text runs and images into lines of a fixed wrap
//! width. Text is broken at UAX#14 opportunities; consecutive words of the
//! same run that share a line are merged into one text box. Items on a line
//! are bottom-aligned, and the line as a whole is shifted for center/right
//! alignment once it is complete.

use crate::layout::{ImageBox, LayoutBox, LayoutError, LayoutOptions, TextBox};
use crate::render::{RenderNode, TextRun};
use crate::style::Align;
use crate::text::{break_units, hard_split};

/// Absorbs float noise when a line is filled exactly.
const FIT_TOLERANCE: f64 = 1e-9;

/// Boxes produced by [`measure_inlines`] and the cursor y after the last line.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineRun {
    pub boxes: Vec<LayoutBox>,
    pub end_y: f64,
}

/// Flow `items` into lines starting at (`x`, `y`) and `wrap_width` wide.
///
/// Block nodes and page breaks among `items` are ignored.
pub fn measure_inlines(
    items: &[&RenderNode],
    x: f64,
    y: f64,
    wrap_width: f64,
    align: Align,
    options: &LayoutOptions<'_>,
) -> Result<InlineRun, LayoutError> {
    let mut lines = LineBuilder {
        start_x: x,
        wrap_width,
        align,
        empty_line_height: options.default_line_height,
        x,
        y,
        line: Vec::new(),
        placed: Vec::new(),
    };

    for item in items {
        match item {
            RenderNode::Text(run) => flow_text(&mut lines, run, options)?,
            RenderNode::Image { src, data } => {
                let (mut width, mut height) = (data.width, data.height);
                if width > wrap_width && width > 0.0 {
                    let scale = wrap_width / width;
                    width *= scale;
                    height *= scale;
                }
                let image = LayoutBox::Image(ImageBox {
                    x: 0.0,
                    y: 0.0,
                    width,
                    height,
                    src: src.clone(),
                    data: data.clone(),
                });
                if lines.fits(width) {
                    lines.push(image);
                    if width >= wrap_width {
                        lines.flush_line();
                    }
                } else {
                    // Pushed to the next line, and that line holds only the image.
                    if !lines.line.is_empty() {
                        lines.flush_line();
                    }
                    lines.push(image);
                    lines.flush_line();
                }
            }
            RenderNode::Block { .. } | RenderNode::PageBreak => {}
        }
    }

    if !lines.line.is_empty() {
        lines.flush_line();
    }

    Ok(InlineRun {
        boxes: lines.placed,
        end_y: lines.y,
    })
}

fn flow_text(
    lines: &mut LineBuilder,
    run: &TextRun,
    options: &LayoutOptions<'_>,
) -> Result<(), LayoutError> {
    let style = &run.style;
    if style.font_size <= 0.0 {
        return Ok(());
    }
    let font = options.fonts.handle(&style.font, style.bold, style.italic);
    let line_height = options.measure.text_line_height(font, style.font_size);
    let width_of = |s: &str| options.measure.measure_text_width(s, font, style.font_size);

    let mut pending = Pending {
        text: String::new(),
        width: 0.0,
    };
    let make_box = |text: String, width: f64| {
        LayoutBox::Text(TextBox {
            x: 0.0,
            y: 0.0,
            width,
            height: line_height,
            font: font.to_string(),
            text,
            style: style.clone(),
            link: run.link.clone(),
        })
    };

    for unit in break_units(&run.content) {
        let word_width = width_of(unit.text);

        if word_width > lines.wrap_width + FIT_TOLERANCE {
            pending.drain_into(lines, &make_box);
            if !lines.line.is_empty() {
                lines.flush_line();
            }
            let chunks = hard_split(unit.text, lines.wrap_width, &width_of).map_err(|ch| {
                LayoutError::WrapWidthTooNarrow {
                    width: lines.wrap_width,
                    ch,
                }
            })?;
            for chunk in chunks {
                lines.push(make_box(chunk.to_string(), width_of(chunk)));
                lines.flush_line();
            }
            continue;
        }

        if !lines.fits(pending.width + word_width) {
            pending.drain_into(lines, &make_box);
            lines.flush_line();
        }
        pending.text.push_str(unit.text);
        pending.width += word_width;

        if unit.mandatory {
            pending.drain_into(lines, &make_box);
            lines.flush_line();
        }
    }
    pending.drain_into(lines, &make_box);
    Ok(())
}

/// Words of the current run waiting to become one text box.
struct Pending {
    text: String,
    width: f64,
}

impl Pending {
    fn drain_into(&mut self, lines: &mut LineBuilder, make_box: &impl Fn(String, f64) -> LayoutBox) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        lines.push(make_box(text, self.width));
        self.width = 0.0;
    }
}

struct LineBuilder {
    start_x: f64,
    wrap_width: f64,
    align: Align,
    empty_line_height: f64,
    /// Horizontal cursor within the current line.
    x: f64,
    /// Top of the current line.
    y: f64,
    /// Boxes on the current line, not yet positioned.
    line: Vec<LayoutBox>,
    placed: Vec<LayoutBox>,
}

impl LineBuilder {
    fn fits(&self, width: f64) -> bool {
        self.x + width <= self.start_x + self.wrap_width + FIT_TOLERANCE
    }

    fn push(&mut self, item: LayoutBox) {
        self.x += item.width();
        self.line.push(item);
    }

    /// Position the current line's boxes and move the cursor below it. An
    /// empty line still advances by the empty-line height.
    fn flush_line(&mut self) {
        if self.line.is_empty() {
            self.y += self.empty_line_height;
            self.x = self.start_x;
            return;
        }

        let line_width: f64 = self.line.iter().map(LayoutBox::width).sum();
        let line_height = self.line.iter().map(LayoutBox::height).fold(0.0, f64::max);
        let baseline = self.y + line_height;
        let mut cursor = self.start_x
            + match self.align {
                Align::Left => 0.0,
                Align::Center => (self.wrap_width - line_width) / 2.0,
                Align::Right => self.wrap_width - line_width,
            };

        for mut item in self.line.drain(..) {
            let width = item.width();
            let top = baseline - item.height();
            item.set_position(cursor, top);
            cursor += width;
            self.placed.push(item);
        }
        self.y = baseline;
        self.x = self.start_x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontRegistry;
    use crate::image_loader::{ImageData, ImagePayload, RasterFormat};
    use crate::layout::tests::{options, text};
    use std::sync::Arc;

    fn texts(run: &InlineRun) -> Vec<(String, f64, f64)> {
        run.boxes
            .iter()
            .filter_map(|b| match b {
                LayoutBox::Text(t) => Some((t.text.clone(), t.x, t.y)),
                _ => None,
            })
            .collect()
    }

    fn image(width: f64, height: f64) -> RenderNode {
        RenderNode::Image {
            src: "img.png".to_string(),
            data: Arc::new(ImageData {
                width,
                height,
                payload: ImagePayload::Raster {
                    format: RasterFormat::Png,
                    bytes: Vec::new(),
                },
            }),
        }
    }

    #[test]
    fn test_wraps_at_word_boundary() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        // "The quick brown " is 16 chars at 5pt each.
        let node = text("The quick brown fox", 10.0);
        let run = measure_inlines(&[&node], 0.0, 0.0, 80.0, Align::Left, &opts).unwrap();
        assert_eq!(
            texts(&run),
            vec![
                ("The quick brown ".to_string(), 0.0, 0.0),
                ("fox".to_string(), 0.0, 10.0),
            ]
        );
        assert_eq!(run.end_y, 20.0);
    }

    #[test]
    fn test_runs_share_a_line() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let a = text("ab ", 10.0);
        let b = text("cd", 10.0);
        let run = measure_inlines(&[&a, &b], 0.0, 0.0, 100.0, Align::Left, &opts).unwrap();
        assert_eq!(
            texts(&run),
            vec![("ab ".to_string(), 0.0, 0.0), ("cd".to_string(), 15.0, 0.0)]
        );
    }

    #[test]
    fn test_overlong_word_is_split() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let node = text("Supercalifragilisticexpialidocious", 20.0);
        let run = measure_inlines(&[&node], 0.0, 0.0, 80.0, Align::Left, &opts).unwrap();
        let parts: Vec<String> = texts(&run).into_iter().map(|(t, _, _)| t).collect();
        assert_eq!(parts.len(), 5);
        assert!(parts[..4].iter().all(|p| p.chars().count() == 8));
        assert_eq!(parts.concat(), "Supercalifragilisticexpialidocious");
        let ys: Vec<f64> = texts(&run).into_iter().map(|(_, _, y)| y).collect();
        assert_eq!(ys, vec![0.0, 20.0, 40.0, 60.0, 80.0]);
    }

    #[test]
    fn test_wrap_width_too_narrow() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let node = text("abc", 20.0);
        let err = measure_inlines(&[&node], 0.0, 0.0, 5.0, Align::Left, &opts).unwrap_err();
        assert_eq!(err, LayoutError::WrapWidthTooNarrow { width: 5.0, ch: 'a' });
    }

    #[test]
    fn test_mixed_sizes_bottom_align() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let small = text("a ", 10.0);
        let big = text("B", 20.0);
        let run = measure_inlines(&[&small, &big], 0.0, 0.0, 200.0, Align::Left, &opts).unwrap();
        assert_eq!(run.boxes[0].y(), 10.0);
        assert_eq!(run.boxes[1].y(), 0.0);
        assert_eq!(run.end_y, 20.0);
    }

    #[test]
    fn test_alignment_offsets() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let node = text("abcd", 10.0);
        let center = measure_inlines(&[&node], 10.0, 0.0, 100.0, Align::Center, &opts).unwrap();
        assert_eq!(texts(&center)[0].1, 50.0);
        let right = measure_inlines(&[&node], 10.0, 0.0, 100.0, Align::Right, &opts).unwrap();
        assert_eq!(texts(&right)[0].1, 90.0);
    }

    #[test]
    fn test_blank_line_advances_default_height() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let node = text("a\n\nb", 10.0);
        let run = measure_inlines(&[&node], 0.0, 0.0, 100.0, Align::Left, &opts).unwrap();
        let ys: Vec<f64> = texts(&run).into_iter().map(|(_, _, y)| y).collect();
        assert_eq!(ys, vec![0.0, 20.0]);
    }

    #[test]
    fn test_zero_size_text_is_skipped() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let node = text("hidden", 0.0);
        let run = measure_inlines(&[&node], 0.0, 5.0, 100.0, Align::Left, &opts).unwrap();
        assert!(run.boxes.is_empty());
        assert_eq!(run.end_y, 5.0);
    }

    #[test]
    fn test_wide_image_scales_and_takes_its_own_line() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let before = text("ab", 10.0);
        let img = image(200.0, 100.0);
        let after = text("cd", 10.0);
        let run =
            measure_inlines(&[&before, &img, &after], 0.0, 0.0, 100.0, Align::Left, &opts)
                .unwrap();
        assert_eq!(run.boxes.len(), 3);
        match &run.boxes[1] {
            LayoutBox::Image(i) => {
                assert_eq!((i.x, i.y, i.width, i.height), (0.0, 10.0, 100.0, 50.0));
            }
            other => panic!("expected image, got {:?}", other),
        }
        assert_eq!(run.boxes[2].y(), 60.0);
    }

    #[test]
    fn test_image_moved_to_next_line_stands_alone() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let before = text("abcdefgh", 10.0);
        let img = image(70.0, 30.0);
        let after = text("cd", 10.0);
        let run =
            measure_inlines(&[&before, &img, &after], 0.0, 0.0, 100.0, Align::Left, &opts)
                .unwrap();
        match &run.boxes[1] {
            LayoutBox::Image(i) => assert_eq!((i.x, i.y, i.height), (0.0, 10.0, 30.0)),
            other => panic!("expected image, got {:?}", other),
        }
        match &run.boxes[2] {
            LayoutBox::Text(t) => assert_eq!((t.x, t.y), (0.0, 40.0)),
            other => panic!("expected text, got {:?}", other),
        }
        assert_eq!(run.end_y, 50.0);
    }

    #[test]
    fn test_small_image_flows_with_text() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 0.0);
        let before = text("ab", 10.0);
        let img = image(20.0, 30.0);
        let run = measure_inlines(&[&before, &img], 0.0, 0.0, 100.0, Align::Left, &opts).unwrap();
        match &run.boxes[1] {
            LayoutBox::Image(i) => assert_eq!((i.x, i.y), (10.0, 0.0)),
            other => panic!("expected image, got {:?}", other),
        }
        assert_eq!(run.boxes[0].y(), 20.0);
    }
}
