use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type NodeId = Uuid;

/// A rendered piece of output text.
pub type RenderedFragment = String;

// ===== NODE KINDS =====
// The dispatch key for the rule set. `Template` is the kind of the document
// root: its rule runs once, on the fully rendered body.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Template,
    Headline,
    Section,
    Paragraph,
    Block,
    Keyword,
    FootnoteDefinition,
    Text,
    Link,
    FootnoteReference,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Template => "template",
            NodeKind::Headline => "headline",
            NodeKind::Section => "section",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Block => "block",
            NodeKind::Keyword => "keyword",
            NodeKind::FootnoteDefinition => "footnote-definition",
            NodeKind::Text => "text",
            NodeKind::Link => "link",
            NodeKind::FootnoteReference => "footnote-reference",
        }
    }
}

// ===== NODE PAYLOADS =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Headline {
    /// Number of leading stars
    pub level: usize,
    /// Title exactly as written, without stars and tags
    pub raw_title: String,
    /// Parsed title objects (text, links, footnote references)
    pub title: Vec<NodeId>,
    pub tags: Vec<String>,
    /// Property drawer entries in source order; keys upper-cased
    pub properties: Vec<(String, String)>,
    /// Blank lines between the headline (or its drawer) and its contents
    pub pre_blank: usize,
}

impl Headline {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Contents hidden when exporting visible text only
    pub fn is_folded(&self) -> bool {
        self.property("VISIBILITY")
            .is_some_and(|v| v.eq_ignore_ascii_case("folded"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Type tag: "file", "https", "id", "custom-id", "fuzzy", ...
    pub link_type: String,
    /// Path without the type prefix and without any `::search` option
    pub path: String,
    pub search_option: Option<String>,
    /// Bracket target as written, used to reproduce the link verbatim
    pub raw_target: String,
    pub has_description: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FootnoteStyle {
    /// `[fn:label]`, defined elsewhere
    Standard,
    /// `[fn:label:text]` or `[fn::text]`, carries its own definition
    Inline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootnoteReference {
    /// `None` for anonymous inline footnotes
    pub label: Option<String>,
    pub style: FootnoteStyle,
    /// Source text of the whole reference
    pub raw: String,
}

impl FootnoteReference {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeData {
    Document,
    Headline(Headline),
    Section,
    Paragraph,
    Block { raw: String },
    Keyword { key: String, value: String, raw: String },
    FootnoteDefinition { label: String },
    Text(String),
    Link(Link),
    FootnoteReference(FootnoteReference),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: NodeId,
    pub data: NodeData,
    pub children: Vec<NodeId>,
    /// Blank lines following this element in the source
    pub post_blank: usize,
}

impl DocumentNode {
    pub fn new(data: NodeData) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            children: Vec::new(),
            post_blank: 0,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Document => NodeKind::Template,
            NodeData::Headline(_) => NodeKind::Headline,
            NodeData::Section => NodeKind::Section,
            NodeData::Paragraph => NodeKind::Paragraph,
            NodeData::Block { .. } => NodeKind::Block,
            NodeData::Keyword { .. } => NodeKind::Keyword,
            NodeData::FootnoteDefinition { .. } => NodeKind::FootnoteDefinition,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Link(_) => NodeKind::Link,
            NodeData::FootnoteReference(_) => NodeKind::FootnoteReference,
        }
    }

    pub fn as_headline(&self) -> Option<&Headline> {
        match &self.data {
            NodeData::Headline(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        match &self.data {
            NodeData::Link(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_footnote_reference(&self) -> Option<&FootnoteReference> {
        match &self.data {
            NodeData::FootnoteReference(r) => Some(r),
            _ => None,
        }
    }
}

// ===== PARSED DOCUMENT =====

/// A parsed Org document: an arena of nodes rooted at a `Document` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgDocument {
    pub root: NodeId,
    pub nodes: HashMap<NodeId, DocumentNode>,
    /// `#+KEY: value` lines in source order; keys upper-cased
    pub keywords: Vec<(String, String)>,
    /// Footnote label -> definition node (first definition wins)
    pub footnote_definitions: HashMap<String, NodeId>,
}

impl OrgDocument {
    pub fn node(&self, id: NodeId) -> Option<&DocumentNode> {
        self.nodes.get(&id)
    }

    pub fn root_node(&self) -> Option<&DocumentNode> {
        self.nodes.get(&self.root)
    }

    /// Last value given for a keyword, as Org does for single-valued settings
    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.keywords
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn footnote_definition(&self, label: &str) -> Option<NodeId> {
        self.footnote_definitions.get(label).copied()
    }

    /// First headline, in document order, whose raw title matches `title`
    pub fn find_headline(&self, title: &str) -> Option<NodeId> {
        let wanted = title.trim();
        self.preorder(self.root).into_iter().find(|id| {
            self.node(*id)
                .and_then(DocumentNode::as_headline)
                .is_some_and(|h| h.raw_title.trim() == wanted)
        })
    }

    /// Node ids in document order, starting at `start`
    pub fn preorder(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            order.push(id);
            for child in node.children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }
}
