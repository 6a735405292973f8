//! # Pagination
//!
//! Slices the single tall virtual page produced by layout into fixed-height
//! pages. Layout never consults the page height; this pass only groups boxes
//! and translates each group so it starts at the content top.
//!
//! Non-bordered blocks are transparent here: their children are considered
//! one by one. Bordered blocks (table cells) move as a unit and are never
//! split.

use serde::Serialize;

use crate::layout::{BlockBox, LayoutBox};

/// One output page: boxes in page coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub boxes: Vec<LayoutBox>,
}

/// Geometry summary of a page, for logs and recorded output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageExtent {
    pub box_count: usize,
    pub top: f64,
    pub bottom: f64,
}

impl Page {
    pub fn extent(&self) -> PageExtent {
        let top = self.boxes.iter().map(LayoutBox::y).fold(f64::INFINITY, f64::min);
        let bottom = self
            .boxes
            .iter()
            .map(|b| b.y() + b.height())
            .fold(f64::NEG_INFINITY, f64::max);
        PageExtent {
            box_count: self.boxes.len(),
            top: if top.is_finite() { top } else { 0.0 },
            bottom: if bottom.is_finite() { bottom } else { 0.0 },
        }
    }
}

/// Split `root` into pages of `page_content_height`, each translated so its
/// topmost box sits at `content_top`.
///
/// A page break marker always closes the current page. A page that would
/// hold nothing with a positive height is not emitted, so consecutive breaks
/// never produce blank pages.
pub fn paginate(root: &BlockBox, page_content_height: f64, content_top: f64) -> Vec<Page> {
    let mut flat = Vec::new();
    flatten(&root.children, &mut flat);

    let mut pages = Vec::new();
    let mut window = Window::default();

    for item in flat {
        if let LayoutBox::PageBreak = item {
            window.close_into(&mut pages, content_top);
            continue;
        }
        if let Some(top) = window.top {
            if item.y() + item.height() - top > page_content_height {
                window.close_into(&mut pages, content_top);
            }
        }
        window.push(item);
    }
    window.close_into(&mut pages, content_top);
    pages
}

fn flatten(boxes: &[LayoutBox], out: &mut Vec<LayoutBox>) {
    for b in boxes {
        match b {
            LayoutBox::Block(block) if !block.border => flatten(&block.children, out),
            other => out.push(other.clone()),
        }
    }
}

#[derive(Default)]
struct Window {
    boxes: Vec<LayoutBox>,
    /// Smallest y among the window's boxes.
    top: Option<f64>,
}

impl Window {
    fn push(&mut self, item: LayoutBox) {
        let y = item.y();
        self.top = Some(self.top.map_or(y, |top| top.min(y)));
        self.boxes.push(item);
    }

    fn close_into(&mut self, pages: &mut Vec<Page>, content_top: f64) {
        let mut boxes = std::mem::take(&mut self.boxes);
        let top = self.top.take().unwrap_or(content_top);
        if !boxes.iter().any(|b| b.height() > 0.0) {
            return;
        }
        let dy = content_top - top;
        for b in &mut boxes {
            b.translate_y(dy);
        }
        pages.push(Page { boxes });
    }
}
