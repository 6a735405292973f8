//! # Layout Engine
//!
//! Turns the render-node tree into positioned boxes on a single virtual
//! page of unbounded height. Coordinates are absolute: `x` grows rightward
//! from the page edge, `y` grows downward from the page top. Pagination
//! happens afterwards and only translates boxes.
//!
//! The one exception to "y only grows" is an explicit page break: the
//! cursor snaps back to the content top for whatever follows it, and the
//! paginator uses the break marker to start a new page.

pub mod inline;
pub mod page_break;

pub use inline::{measure_inlines, InlineRun};
pub use page_break::{paginate, Page, PageExtent};

use std::sync::Arc;

use thiserror::Error;

use crate::font::FontRegistry;
use crate::image_loader::ImageData;
use crate::paint::TextMeasure;
use crate::render::{BlockStyle, Display, RenderNode};
use crate::style::TextStyle;

/// Interior padding of a table cell, on every side.
pub const CELL_PADDING: f64 = 2.0;

/// Contract violations that make layout impossible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("wrap width {width} is narrower than the character {ch:?}")]
    WrapWidthTooNarrow { width: f64, ch: char },
    #[error("the first row of a table has no cells")]
    EmptyTableRow,
}

/// A positioned box.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutBox {
    Block(BlockBox),
    Text(TextBox),
    Image(ImageBox),
    /// Marks an explicit page break. Carries no geometry.
    PageBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Bordered blocks (table cells) are painted with a frame and are never
    /// split across pages.
    pub border: bool,
    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Concrete font handle, already resolved for bold/italic.
    pub font: String,
    pub text: String,
    pub style: TextStyle,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub src: String,
    pub data: Arc<ImageData>,
}

impl LayoutBox {
    pub fn y(&self) -> f64 {
        match self {
            LayoutBox::Block(b) => b.y,
            LayoutBox::Text(t) => t.y,
            LayoutBox::Image(i) => i.y,
            LayoutBox::PageBreak => 0.0,
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            LayoutBox::Block(b) => b.height,
            LayoutBox::Text(t) => t.height,
            LayoutBox::Image(i) => i.height,
            LayoutBox::PageBreak => 0.0,
        }
    }

    pub fn width(&self) -> f64 {
        match self {
            LayoutBox::Block(b) => b.width,
            LayoutBox::Text(t) => t.width,
            LayoutBox::Image(i) => i.width,
            LayoutBox::PageBreak => 0.0,
        }
    }

    pub(crate) fn set_position(&mut self, x: f64, y: f64) {
        match self {
            LayoutBox::Block(b) => {
                b.x = x;
                b.y = y;
            }
            LayoutBox::Text(t) => {
                t.x = x;
                t.y = y;
            }
            LayoutBox::Image(i) => {
                i.x = x;
                i.y = y;
            }
            LayoutBox::PageBreak => {}
        }
    }

    /// Move this box and everything inside it vertically.
    pub fn translate_y(&mut self, dy: f64) {
        match self {
            LayoutBox::Block(b) => {
                b.y += dy;
                for child in &mut b.children {
                    child.translate_y(dy);
                }
            }
            LayoutBox::Text(t) => t.y += dy,
            LayoutBox::Image(i) => i.y += dy,
            LayoutBox::PageBreak => {}
        }
    }
}

/// Inputs shared by every layout call.
#[derive(Clone, Copy)]
pub struct LayoutOptions<'a> {
    /// Content top; the cursor never starts above it and returns to it
    /// after a page break.
    pub top: f64,
    /// Width available to the block being laid out.
    pub width: f64,
    /// Extra vertical gap after each nested block.
    pub spacing: Option<f64>,
    /// Height of a line with nothing on it.
    pub default_line_height: f64,
    pub measure: &'a dyn TextMeasure,
    pub fonts: &'a FontRegistry,
}

impl<'a> LayoutOptions<'a> {
    fn with_width(&self, width: f64) -> Self {
        Self { width, ..*self }
    }
}

/// Lay out one render node as a block starting at (`x`, `y`).
///
/// The returned box's `y + height` is where the next sibling starts. For a
/// block that contains a page break that is a position on the block's last
/// page, not its extent.
pub fn layout_block(
    node: &RenderNode,
    x: f64,
    y: f64,
    options: &LayoutOptions<'_>,
) -> Result<BlockBox, LayoutError> {
    match node {
        RenderNode::Block { style, children } => layout_container(style, children, x, y, options),
        other => layout_container(
            &BlockStyle::default(),
            std::slice::from_ref(other),
            x,
            y,
            options,
        ),
    }
}

fn layout_container(
    style: &BlockStyle,
    children: &[RenderNode],
    x: f64,
    y: f64,
    options: &LayoutOptions<'_>,
) -> Result<BlockBox, LayoutError> {
    let start = y.max(options.top);
    match style.display {
        Display::Block | Display::TableRow => layout_flow(style, children, x, start, options),
        Display::Table => layout_table(children, x, start, options),
        Display::TableCell => layout_cell(style, children, x, start, options),
    }
}

/// Mixed block/inline content. Consecutive inline leaves form one inline
/// run; nested blocks stack below it.
fn layout_flow(
    style: &BlockStyle,
    children: &[RenderNode],
    x: f64,
    start: f64,
    options: &LayoutOptions<'_>,
) -> Result<BlockBox, LayoutError> {
    let mut y = start;
    let mut boxes = Vec::new();
    let mut pending: Vec<&RenderNode> = Vec::new();
    let mut after_page_break = false;

    let flush = |pending: &mut Vec<&RenderNode>,
                 boxes: &mut Vec<LayoutBox>,
                 y: &mut f64|
     -> Result<(), LayoutError> {
        if pending.is_empty() {
            return Ok(());
        }
        let run = measure_inlines(
            pending,
            x + style.indent,
            *y,
            options.width - style.indent,
            style.align,
            options,
        )?;
        boxes.extend(run.boxes);
        *y = run.end_y;
        pending.clear();
        Ok(())
    };

    for child in children {
        if let RenderNode::PageBreak = child {
            flush(&mut pending, &mut boxes, &mut y)?;
            boxes.push(LayoutBox::PageBreak);
            after_page_break = true;
            continue;
        }
        if after_page_break {
            y = options.top;
            after_page_break = false;
        }
        match child {
            RenderNode::Block { .. } => {
                flush(&mut pending, &mut boxes, &mut y)?;
                let block = layout_block(child, x, y, options)?;
                y = block.y + block.height;
                boxes.push(LayoutBox::Block(block));
                if let Some(spacing) = options.spacing {
                    y += spacing;
                }
            }
            _ => pending.push(child),
        }
    }
    flush(&mut pending, &mut boxes, &mut y)?;

    Ok(BlockBox {
        x,
        y: start,
        width: options.width,
        height: y - start,
        border: false,
        children: boxes,
    })
}

/// Equal-width columns sized from the first row; each row as tall as its
/// tallest cell.
fn layout_table(
    children: &[RenderNode],
    x: f64,
    start: f64,
    options: &LayoutOptions<'_>,
) -> Result<BlockBox, LayoutError> {
    let rows: Vec<&[RenderNode]> = children
        .iter()
        .filter_map(|row| match row {
            RenderNode::Block { children, .. } => Some(children.as_slice()),
            _ => None,
        })
        .collect();

    let mut boxes = Vec::new();
    let mut row_y = start;
    if let Some(first) = rows.first() {
        let column_count = first.iter().filter(|c| is_block(c)).count();
        if column_count == 0 {
            return Err(LayoutError::EmptyTableRow);
        }
        let cell_width = options.width / column_count as f64;
        let cell_options = options.with_width(cell_width);

        for row in &rows {
            let mut cells = Vec::new();
            let mut row_height: f64 = 0.0;
            for (col, cell) in row.iter().filter(|c| is_block(c)).enumerate() {
                let cell_box =
                    layout_block(cell, x + col as f64 * cell_width, row_y, &cell_options)?;
                row_height = row_height.max(cell_box.height);
                cells.push(cell_box);
            }
            let children = cells
                .into_iter()
                .map(|mut cell| {
                    cell.height = row_height;
                    LayoutBox::Block(cell)
                })
                .collect();
            boxes.push(LayoutBox::Block(BlockBox {
                x,
                y: row_y,
                width: options.width,
                height: row_height,
                border: false,
                children,
            }));
            row_y += row_height;
        }
    }

    Ok(BlockBox {
        x,
        y: start,
        width: options.width,
        height: row_y - start,
        border: false,
        children: boxes,
    })
}

/// A bordered cell holding its inline content, padded on every side.
fn layout_cell(
    style: &BlockStyle,
    children: &[RenderNode],
    x: f64,
    start: f64,
    options: &LayoutOptions<'_>,
) -> Result<BlockBox, LayoutError> {
    let inlines: Vec<&RenderNode> = children.iter().filter(|c| c.is_inline()).collect();
    let run = measure_inlines(
        &inlines,
        x + CELL_PADDING,
        start + CELL_PADDING,
        options.width - CELL_PADDING * 2.0,
        style.align,
        options,
    )?;
    let content_height = run
        .boxes
        .iter()
        .map(|b| b.y() + b.height() - start)
        .fold(0.0, f64::max);

    Ok(BlockBox {
        x,
        y: start,
        width: options.width,
        height: content_height + CELL_PADDING,
        border: true,
        children: run.boxes,
    })
}

fn is_block(node: &RenderNode) -> bool {
    matches!(node, RenderNode::Block { .. })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::render::TextRun;
    use crate::style::Align;

    /// Every character is half the font size wide; lines are exactly the
    /// font size tall.
    pub(crate) struct FixedMeasure;

    impl TextMeasure for FixedMeasure {
        fn measure_text_width(&self, text: &str, _font: &str, size: f64) -> f64 {
            text.chars().count() as f64 * size * 0.5
        }

        fn text_line_height(&self, _font: &str, size: f64) -> f64 {
            size
        }
    }

    pub(crate) fn options<'a>(fonts: &'a FontRegistry, width: f64) -> LayoutOptions<'a> {
        LayoutOptions {
            top: 0.0,
            width,
            spacing: None,
            default_line_height: 10.0,
            measure: &FixedMeasure,
            fonts,
        }
    }

    pub(crate) fn text(content: &str, size: f64) -> RenderNode {
        let mut style = TextStyle::base("Helvetica");
        style.font_size = size;
        RenderNode::Text(TextRun {
            content: content.to_string(),
            style,
            link: None,
        })
    }

    fn paragraph(children: Vec<RenderNode>) -> RenderNode {
        RenderNode::block(Display::Block, children)
    }

    fn cell(children: Vec<RenderNode>) -> RenderNode {
        RenderNode::block(Display::TableCell, children)
    }

    #[test]
    fn test_blocks_stack_with_spacing() {
        let fonts = FontRegistry::new();
        let mut opts = options(&fonts, 200.0);
        opts.spacing = Some(5.0);
        let root = paragraph(vec![
            paragraph(vec![text("one", 10.0)]),
            paragraph(vec![text("two", 10.0)]),
        ]);
        let block = layout_block(&root, 0.0, 0.0, &opts).unwrap();
        let ys: Vec<f64> = block.children.iter().map(LayoutBox::y).collect();
        assert_eq!(ys, vec![0.0, 15.0]);
        assert_eq!(block.height, 30.0);
    }

    #[test]
    fn test_indent_applies_to_inline_content() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 200.0);
        let root = RenderNode::Block {
            style: BlockStyle {
                indent: 20.0,
                ..Default::default()
            },
            children: vec![text("x", 10.0)],
        };
        let block = layout_block(&root, 40.0, 0.0, &opts).unwrap();
        assert_eq!(block.children[0].y(), 0.0);
        match &block.children[0] {
            LayoutBox::Text(t) => assert_eq!(t.x, 60.0),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_start_never_above_content_top() {
        let fonts = FontRegistry::new();
        let mut opts = options(&fonts, 200.0);
        opts.top = 40.0;
        let block = layout_block(&paragraph(vec![text("x", 10.0)]), 0.0, 0.0, &opts).unwrap();
        assert_eq!(block.y, 40.0);
        assert_eq!(block.children[0].y(), 40.0);
    }

    #[test]
    fn test_page_break_resets_cursor() {
        let fonts = FontRegistry::new();
        let mut opts = options(&fonts, 200.0);
        opts.top = 40.0;
        let root = paragraph(vec![
            paragraph(vec![text("a\nb\nc", 10.0)]),
            RenderNode::PageBreak,
            paragraph(vec![text("after", 10.0)]),
        ]);
        let block = layout_block(&root, 0.0, 40.0, &opts).unwrap();
        assert_eq!(block.children.len(), 3);
        assert_eq!(block.children[1], LayoutBox::PageBreak);
        assert_eq!(block.children[2].y(), 40.0);
        assert_eq!(block.y + block.height, 50.0);
    }

    #[test]
    fn test_table_geometry() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 300.0);
        let table = RenderNode::block(
            Display::Table,
            vec![
                RenderNode::block(
                    Display::TableRow,
                    vec![
                        cell(vec![text("a", 10.0)]),
                        cell(vec![text("b\nb", 10.0)]),
                        cell(vec![]),
                    ],
                ),
                RenderNode::block(Display::TableRow, vec![cell(vec![text("c", 10.0)])]),
            ],
        );
        let block = layout_block(&table, 0.0, 0.0, &opts).unwrap();
        assert_eq!(block.children.len(), 2);

        let LayoutBox::Block(row) = &block.children[0] else {
            panic!("expected row");
        };
        assert!(!row.border);
        // Tallest cell: two 10pt lines plus padding above and below.
        assert_eq!(row.height, 24.0);
        let xs: Vec<f64> = row
            .children
            .iter()
            .map(|c| match c {
                LayoutBox::Block(b) => {
                    assert!(b.border);
                    assert_eq!(b.width, 100.0);
                    assert_eq!(b.height, 24.0);
                    b.x
                }
                other => panic!("expected cell, got {:?}", other),
            })
            .collect();
        assert_eq!(xs, vec![0.0, 100.0, 200.0]);

        let LayoutBox::Block(second) = &block.children[1] else {
            panic!("expected row");
        };
        assert_eq!(second.y, 24.0);
        assert_eq!(second.height, 14.0);
        assert_eq!(block.height, 38.0);
    }

    #[test]
    fn test_cell_alignment() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 100.0);
        let node = RenderNode::Block {
            style: BlockStyle {
                display: Display::TableCell,
                align: Align::Right,
                ..Default::default()
            },
            children: vec![text("ab", 10.0)],
        };
        let block = layout_block(&node, 0.0, 0.0, &opts).unwrap();
        match &block.children[0] {
            // Content box is 96 wide starting at 2; "ab" is 10 wide.
            LayoutBox::Text(t) => assert_eq!(t.x, 88.0),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_first_row_is_an_error() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 100.0);
        let table = RenderNode::block(
            Display::Table,
            vec![RenderNode::block(Display::TableRow, vec![])],
        );
        assert_eq!(
            layout_block(&table, 0.0, 0.0, &opts),
            Err(LayoutError::EmptyTableRow)
        );
    }

    #[test]
    fn test_table_without_rows_is_empty() {
        let fonts = FontRegistry::new();
        let opts = options(&fonts, 100.0);
        let block =
            layout_block(&RenderNode::block(Display::Table, vec![]), 0.0, 0.0, &opts).unwrap();
        assert!(block.children.is_empty());
        assert_eq!(block.height, 0.0);
    }
}
