//! # mdpager
//!
//! Lays out an mdast document tree into positioned boxes and slices it into
//! fixed-size pages for a page-based painter.
//!
//! Layout happens on one virtual page of unbounded height. Lines, blocks and
//! table rows only ever move the cursor down; pagination is a separate pass
//! that groups the finished boxes into page-sized windows and translates
//! each window to the top of its page. The only thing that reaches across
//! the two is an explicit page break (a thematic break in the source).
//!
//! ## Architecture
//!
//! ```text
//! mdast JSON
//!       ↓
//!   [model]        Document tree, reference definitions
//!       ↓
//!   [image_loader] Bulk async prefetch into a write-once cache
//!       ↓
//!   [render]       Style/list/link context → render nodes
//!       ↓
//!   [layout]       Blocks, tables, inline flow → boxes
//!       ↓
//!   [page_break]   Boxes → pages
//!       ↓
//!   [paint]        Pages → Painter calls
//! ```

pub mod diagnostics;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod options;
pub mod paint;
pub mod render;
pub mod style;
pub mod text;

use diagnostics::{Diagnostic, Diagnostics};
use error::ConvertError;
use font::FontRegistry;
use image_loader::{prefetch, ImageCache, ImageLoader};
use layout::{layout_block, paginate, LayoutOptions, Page, PageExtent};
use model::{Definitions, Document};
use options::Options;
use paint::{paint_pages, Painter, TextMeasure};
use render::{render, Display, RenderContext, RenderNode};

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// One entry per painted page.
    pub pages: Vec<PageExtent>,
    /// Recoverable conditions hit along the way, in first-seen order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Conversion {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Lay out `document` into pages. Images must already be in `images`;
/// anything missing from the cache is treated as a failed load.
pub fn layout_document(
    document: &Document,
    options: &Options,
    fonts: &FontRegistry,
    images: &ImageCache,
    measure: &dyn TextMeasure,
    diagnostics: &Diagnostics,
) -> Result<Vec<Page>, ConvertError> {
    let definitions = Definitions::collect(document);
    let rules = options.compile_rules()?;
    let config = options.style_config();
    let base = options.base_style();

    let ctx = RenderContext {
        style: base.clone(),
        rules: &rules,
        config: &config,
        list: None,
        link: None,
        definitions: &definitions,
        images,
        diagnostics,
    };
    let root = RenderNode::block(Display::Block, render(&document.children, &ctx));

    let page = &options.page;
    let base_font = fonts.handle(&base.font, base.bold, base.italic);
    let layout_options = LayoutOptions {
        top: page.margin.top,
        width: page.content_width(),
        spacing: options.spacing,
        default_line_height: measure.text_line_height(base_font, base.font_size),
        measure,
        fonts,
    };
    let block = layout_block(&root, page.margin.left, page.margin.top, &layout_options)?;
    let pages = paginate(&block, page.content_height(), page.margin.top);

    log::debug!("laid out {} pages", pages.len());
    Ok(pages)
}

/// Run the whole pipeline: prefetch images through `loader`, lay out with
/// `painter`'s metrics, then paint every page.
///
/// Diagnostics are scoped to this call; the same message is only logged
/// once per conversion.
pub async fn convert<L, P>(
    document: &Document,
    options: &Options,
    fonts: &FontRegistry,
    loader: &L,
    painter: &mut P,
) -> Result<Conversion, ConvertError>
where
    L: ImageLoader + ?Sized,
    P: Painter,
{
    let diagnostics = Diagnostics::new();
    let definitions = Definitions::collect(document);
    let images = prefetch(document, &definitions, loader, &diagnostics).await;

    let pages = layout_document(document, options, fonts, &images, &*painter, &diagnostics)?;
    paint_pages(&pages, painter);

    Ok(Conversion {
        pages: pages.iter().map(Page::extent).collect(),
        diagnostics: diagnostics.entries(),
    })
}
