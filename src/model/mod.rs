//! # Document Model
//!
//! The input representation: an mdast tree as produced by an external
//! markdown parser and handed over as JSON. The tree is consumed read-only.
//!
//! Only the node kinds the transformer knows how to render get their own
//! variant. Everything else (front-matter, footnotes, directives from
//! parser extensions) deserializes to [`Node::Unknown`] carrying its tag so
//! the transformer can name it in a diagnostic.

use std::collections::HashMap;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::style::Align;

/// The `root` node of an mdast tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn from_json(json: &str) -> Result<Self, crate::error::ConvertError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One mdast node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Paragraph(Parent),
    Heading(Heading),
    ThematicBreak,
    Blockquote(Parent),
    List(List),
    ListItem(ListItem),
    Table(Table),
    TableRow(Parent),
    TableCell(Parent),
    Html(Literal),
    Code(Literal),
    Math(Literal),
    InlineMath(Literal),
    InlineCode(Literal),
    Definition(Definition),
    Text(Literal),
    Emphasis(Parent),
    Strong(Parent),
    Delete(Parent),
    Break,
    Link(Link),
    LinkReference(LinkReference),
    Image(Image),
    ImageReference(ImageReference),
    /// A node kind with no renderer.
    Unknown { kind: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Parent {
    #[serde(default)]
    pub children: Vec<Node>,
}

/// A leaf carrying a raw string value (`text`, `code`, `html`, ...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Literal {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Heading {
    pub depth: u8,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct List {
    #[serde(default)]
    pub ordered: Option<bool>,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub spread: Option<bool>,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListItem {
    /// `Some` for task list items.
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub spread: Option<bool>,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Table {
    /// Per-column alignment. `null` entries mean unspecified.
    #[serde(default)]
    pub align: Vec<Option<Align>>,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Definition {
    pub identifier: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Link {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkReference {
    pub identifier: String,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageReference {
    pub identifier: String,
    #[serde(default)]
    pub alt: Option<String>,
}

impl Node {
    /// The mdast `type` tag of this node.
    pub fn kind_name(&self) -> &str {
        match self {
            Node::Paragraph(_) => "paragraph",
            Node::Heading(_) => "heading",
            Node::ThematicBreak => "thematicBreak",
            Node::Blockquote(_) => "blockquote",
            Node::List(_) => "list",
            Node::ListItem(_) => "listItem",
            Node::Table(_) => "table",
            Node::TableRow(_) => "tableRow",
            Node::TableCell(_) => "tableCell",
            Node::Html(_) => "html",
            Node::Code(_) => "code",
            Node::Math(_) => "math",
            Node::InlineMath(_) => "inlineMath",
            Node::InlineCode(_) => "inlineCode",
            Node::Definition(_) => "definition",
            Node::Text(_) => "text",
            Node::Emphasis(_) => "emphasis",
            Node::Strong(_) => "strong",
            Node::Delete(_) => "delete",
            Node::Break => "break",
            Node::Link(_) => "link",
            Node::LinkReference(_) => "linkReference",
            Node::Image(_) => "image",
            Node::ImageReference(_) => "imageReference",
            Node::Unknown { kind } => kind,
        }
    }

    /// Child nodes, if this is a parent node.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Paragraph(p)
            | Node::Blockquote(p)
            | Node::TableRow(p)
            | Node::TableCell(p)
            | Node::Emphasis(p)
            | Node::Strong(p)
            | Node::Delete(p) => &p.children,
            Node::Heading(h) => &h.children,
            Node::List(l) => &l.children,
            Node::ListItem(li) => &li.children,
            Node::Table(t) => &t.children,
            Node::Link(l) => &l.children,
            Node::LinkReference(l) => &l.children,
            _ => &[],
        }
    }

    pub fn text(value: &str) -> Self {
        Node::Text(Literal {
            value: value.to_string(),
        })
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph(Parent { children })
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| de::Error::missing_field("type"))?
            .to_string();
        node_from_value(&kind, value).map_err(de::Error::custom)
    }
}

fn node_from_value(kind: &str, value: Value) -> Result<Node, serde_json::Error> {
    use serde_json::from_value;

    let node = match kind {
        "paragraph" => Node::Paragraph(from_value(value)?),
        "heading" => Node::Heading(from_value(value)?),
        "thematicBreak" => Node::ThematicBreak,
        "blockquote" => Node::Blockquote(from_value(value)?),
        "list" => Node::List(from_value(value)?),
        "listItem" => Node::ListItem(from_value(value)?),
        "table" => Node::Table(from_value(value)?),
        "tableRow" => Node::TableRow(from_value(value)?),
        "tableCell" => Node::TableCell(from_value(value)?),
        "html" => Node::Html(from_value(value)?),
        "code" => Node::Code(from_value(value)?),
        "math" => Node::Math(from_value(value)?),
        "inlineMath" => Node::InlineMath(from_value(value)?),
        "inlineCode" => Node::InlineCode(from_value(value)?),
        "definition" => Node::Definition(from_value(value)?),
        "text" => Node::Text(from_value(value)?),
        "emphasis" => Node::Emphasis(from_value(value)?),
        "strong" => Node::Strong(from_value(value)?),
        "delete" => Node::Delete(from_value(value)?),
        "break" => Node::Break,
        "link" => Node::Link(from_value(value)?),
        "linkReference" => Node::LinkReference(from_value(value)?),
        "image" => Node::Image(from_value(value)?),
        "imageReference" => Node::ImageReference(from_value(value)?),
        other => Node::Unknown {
            kind: other.to_string(),
        },
    };
    Ok(node)
}

/// A resolved `definition` node.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionTarget {
    pub url: String,
    pub title: Option<String>,
}

/// Reference-definition resolver built from every `definition` in a tree.
/// Identifiers match case-insensitively with whitespace collapsed; the first
/// definition of an identifier wins.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    by_id: HashMap<String, DefinitionTarget>,
}

impl Definitions {
    pub fn collect(document: &Document) -> Self {
        let mut defs = Definitions::default();
        defs.visit(&document.children);
        defs
    }

    fn visit(&mut self, nodes: &[Node]) {
        for node in nodes {
            if let Node::Definition(def) = node {
                self.by_id
                    .entry(normalize_identifier(&def.identifier))
                    .or_insert_with(|| DefinitionTarget {
                        url: def.url.clone(),
                        title: def.title.clone(),
                    });
            }
            self.visit(node.children());
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&DefinitionTarget> {
        self.by_id.get(&normalize_identifier(identifier))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn normalize_identifier(identifier: &str) -> String {
    identifier
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
