//! # Tree-to-Render-Node Transformer
//!
//! Walks the mdast tree depth-first and produces geometry-free render
//! nodes. Everything that affects appearance travels down in a
//! [`RenderContext`]: the current text style, the active link, the list
//! position. A context is never mutated. Every builder that changes
//! something derives a new context for its children, so siblings never see
//! each other's decoration.
//!
//! The output vocabulary is small: blocks (paragraphs, tables, rows and
//! cells), styled text runs, images and explicit page breaks.

use std::sync::Arc;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::image_loader::{ImageCache, ImageData};
use crate::model::{self, Definitions, Node};
use crate::options::StyleConfig;
use crate::style::{Align, CompiledRule, StyleOverride, TextStyle};

/// Horizontal offset applied per list nesting level.
pub const LIST_INDENT: f64 = 10.0;

/// Geometry-free output of the transformer.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Block {
        style: BlockStyle,
        children: Vec<RenderNode>,
    },
    Text(TextRun),
    Image {
        src: String,
        data: Arc<ImageData>,
    },
    PageBreak,
}

impl RenderNode {
    pub fn block(display: Display, children: Vec<RenderNode>) -> Self {
        RenderNode::Block {
            style: BlockStyle {
                display,
                ..Default::default()
            },
            children,
        }
    }

    /// Text and images flow inline; blocks and page breaks do not.
    pub fn is_inline(&self) -> bool {
        matches!(self, RenderNode::Text(_) | RenderNode::Image { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Display {
    #[default]
    Block,
    Table,
    TableRow,
    TableCell,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockStyle {
    /// Left offset for the block's inline content.
    pub indent: f64,
    pub display: Display,
    pub align: Align,
}

/// A styled run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub content: String,
    pub style: TextStyle,
    pub link: Option<String>,
}

/// How a list item announces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    Ordered(u32),
    Task { checked: bool },
}

impl ListMarker {
    /// The text prefixed to the item's first block.
    pub fn text(&self) -> String {
        match self {
            ListMarker::Bullet => "\u{2022} ".to_string(),
            ListMarker::Ordered(n) => format!("{}. ", n),
            ListMarker::Task { checked: true } => "[x] ".to_string(),
            ListMarker::Task { checked: false } => "[ ] ".to_string(),
        }
    }
}

/// Position inside a list. `marker` is only set for the first block of an
/// item; later blocks in the same item are indented but unmarked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListContext {
    pub level: usize,
    pub marker: Option<ListMarker>,
}

/// Immutable state threaded through the transformer.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub style: TextStyle,
    pub rules: &'a [CompiledRule],
    pub config: &'a StyleConfig,
    pub list: Option<ListContext>,
    pub link: Option<String>,
    pub definitions: &'a Definitions,
    pub images: &'a ImageCache,
    pub diagnostics: &'a Diagnostics,
}

impl<'a> RenderContext<'a> {
    fn with_style(&self, over: &StyleOverride) -> Self {
        Self {
            style: self.style.with(over),
            ..self.clone()
        }
    }

    fn with_list(&self, list: Option<ListContext>) -> Self {
        Self {
            list,
            ..self.clone()
        }
    }

    /// Same list position, marker already spent.
    fn without_marker(&self) -> Self {
        self.with_list(self.list.map(|list| ListContext {
            marker: None,
            ..list
        }))
    }

    fn with_link(&self, url: &str) -> Self {
        Self {
            link: Some(url.to_string()),
            style: self.style.with(&self.config.link),
            ..self.clone()
        }
    }
}

/// Transform a sequence of sibling nodes.
pub fn render(nodes: &[Node], ctx: &RenderContext<'_>) -> Vec<RenderNode> {
    let mut out = Vec::new();
    for node in nodes {
        render_node(node, ctx, &mut out);
    }
    out
}

fn render_node(node: &Node, ctx: &RenderContext<'_>, out: &mut Vec<RenderNode>) {
    match node {
        Node::Paragraph(p) => out.push(paragraph(&p.children, ctx)),
        Node::Heading(h) => {
            let heading_ctx = ctx.with_style(ctx.config.heading(h.depth));
            out.push(paragraph(&h.children, &heading_ctx));
        }
        Node::ThematicBreak => out.push(RenderNode::PageBreak),
        Node::Blockquote(q) => render_marked_blocks(&q.children, ctx, out),
        Node::List(list) => render_list(list, ctx, out),
        // A list item outside a list has no marker to show.
        Node::ListItem(item) => render_marked_blocks(&item.children, ctx, out),
        Node::Table(table) => out.push(render_table(table, ctx)),
        Node::TableRow(_) | Node::TableCell(_) | Node::Definition(_) => {}
        Node::Html(lit)
        | Node::Code(lit)
        | Node::Math(lit)
        | Node::InlineMath(lit)
        | Node::InlineCode(lit) => {
            ctx.diagnostics.report(Diagnostic::FallbackDegraded {
                kind: node.kind_name().to_string(),
            });
            text_runs(&lit.value, ctx, out);
        }
        Node::Text(lit) => text_runs(&lit.value, ctx, out),
        Node::Emphasis(p) => {
            let over = StyleOverride {
                italic: Some(true),
                ..Default::default()
            };
            out.extend(render(&p.children, &ctx.with_style(&over)));
        }
        Node::Strong(p) => {
            let over = StyleOverride {
                bold: Some(true),
                ..Default::default()
            };
            out.extend(render(&p.children, &ctx.with_style(&over)));
        }
        Node::Delete(p) => {
            let over = StyleOverride {
                strike: Some(true),
                ..Default::default()
            };
            out.extend(render(&p.children, &ctx.with_style(&over)));
        }
        Node::Break => text_runs("\n", ctx, out),
        Node::Link(link) => render_link(&link.url, &link.children, ctx, out),
        Node::LinkReference(reference) => match ctx.definitions.get(&reference.identifier) {
            Some(def) => render_link(&def.url, &reference.children, ctx, out),
            None => {
                ctx.diagnostics.report(Diagnostic::UnresolvedReference {
                    kind: "link".to_string(),
                    identifier: reference.identifier.clone(),
                });
                out.extend(render(&reference.children, ctx));
            }
        },
        Node::Image(image) => render_image(&image.url, ctx, out),
        Node::ImageReference(reference) => match ctx.definitions.get(&reference.identifier) {
            Some(def) => render_image(&def.url, ctx, out),
            None => {
                ctx.diagnostics.report(Diagnostic::UnresolvedReference {
                    kind: "image".to_string(),
                    identifier: reference.identifier.clone(),
                });
            }
        },
        Node::Unknown { kind } => {
            ctx.diagnostics.report(Diagnostic::UnsupportedNodeKind { kind: kind.clone() });
        }
    }
}

/// A paragraph-like block. Inside a list it is indented by nesting level
/// and, if it is the first block of its item, prefixed with the marker.
fn paragraph(children: &[Node], ctx: &RenderContext<'_>) -> RenderNode {
    let mut content = render(children, ctx);
    let mut indent = 0.0;
    if let Some(list) = ctx.list {
        indent = LIST_INDENT * list.level as f64;
        if let Some(marker) = list.marker {
            let style = content
                .iter()
                .find_map(|n| match n {
                    RenderNode::Text(run) => Some(run.style.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| ctx.style.clone());
            content.insert(
                0,
                RenderNode::Text(TextRun {
                    content: marker.text(),
                    style,
                    link: None,
                }),
            );
        }
    }
    RenderNode::Block {
        style: BlockStyle {
            indent,
            display: Display::Block,
            align: Align::Left,
        },
        children: content,
    }
}

fn render_list(list: &model::List, ctx: &RenderContext<'_>, out: &mut Vec<RenderNode>) {
    let level = ctx.list.map_or(0, |parent| parent.level + 1);
    let ordered = list.ordered.unwrap_or(false);
    let mut number = 0u32;
    for child in &list.children {
        let Node::ListItem(item) = child else {
            render_node(child, ctx, out);
            continue;
        };
        number += 1;
        let marker = match item.checked {
            Some(checked) => ListMarker::Task { checked },
            None if ordered => ListMarker::Ordered(number),
            None => ListMarker::Bullet,
        };
        let item_ctx = ctx.with_list(Some(ListContext {
            level,
            marker: Some(marker),
        }));
        render_marked_blocks(&item.children, &item_ctx, out);
    }
}

/// Render sibling blocks where only the first may carry the pending list
/// marker; the rest keep the indent.
fn render_marked_blocks(blocks: &[Node], ctx: &RenderContext<'_>, out: &mut Vec<RenderNode>) {
    let Some((first, rest)) = blocks.split_first() else {
        return;
    };
    render_node(first, ctx, out);
    let rest_ctx = ctx.without_marker();
    for block in rest {
        render_node(block, &rest_ctx, out);
    }
}

fn render_table(table: &model::Table, ctx: &RenderContext<'_>) -> RenderNode {
    let cell_ctx = ctx.with_list(None);
    let rows = table
        .children
        .iter()
        .filter_map(|row| match row {
            Node::TableRow(row) => Some(row),
            _ => None,
        })
        .map(|row| {
            let cells = row
                .children
                .iter()
                .filter_map(|cell| match cell {
                    Node::TableCell(cell) => Some(cell),
                    _ => None,
                })
                .enumerate()
                .map(|(col, cell)| RenderNode::Block {
                    style: BlockStyle {
                        indent: 0.0,
                        display: Display::TableCell,
                        align: table.align.get(col).copied().flatten().unwrap_or_default(),
                    },
                    children: render(&cell.children, &cell_ctx),
                })
                .collect();
            RenderNode::block(Display::TableRow, cells)
        })
        .collect();
    RenderNode::block(Display::Table, rows)
}

fn render_link(url: &str, children: &[Node], ctx: &RenderContext<'_>, out: &mut Vec<RenderNode>) {
    if url.starts_with('#') {
        // In-document anchors have no target on paper.
        out.extend(render(children, ctx));
    } else {
        out.extend(render(children, &ctx.with_link(url)));
    }
}

fn render_image(url: &str, ctx: &RenderContext<'_>, out: &mut Vec<RenderNode>) {
    if let Some(data) = ctx.images.get(url) {
        out.push(RenderNode::Image {
            src: url.to_string(),
            data: Arc::clone(data),
        });
    }
}

/// Split `text` into runs by the context's style rules. Matches are taken
/// in order of start position; a match overlapping an earlier one, or an
/// empty match, is ignored. Unmatched spans keep the context style.
fn text_runs(text: &str, ctx: &RenderContext<'_>, out: &mut Vec<RenderNode>) {
    let mut matches: Vec<(usize, usize, &StyleOverride)> = ctx
        .rules
        .iter()
        .flat_map(|rule| {
            rule.regex
                .find_iter(text)
                .map(move |m| (m.start(), m.end(), &rule.style))
        })
        .filter(|(start, end, _)| end > start)
        .collect();
    matches.sort_by_key(|(start, _, _)| *start);

    let run = |content: &str, style: TextStyle| {
        RenderNode::Text(TextRun {
            content: content.to_string(),
            style,
            link: ctx.link.clone(),
        })
    };

    let mut cursor = 0;
    for (start, end, over) in matches {
        if start < cursor {
            continue;
        }
        if cursor < start {
            out.push(run(&text[cursor..start], ctx.style.clone()));
        }
        out.push(run(&text[start..end], ctx.style.with(over)));
        cursor = end;
    }
    if cursor < text.len() {
        out.push(run(&text[cursor..], ctx.style.clone()));
    }
}
