//! Org Outline Parser
//!
//! Parses the subset of Org markup the exporter understands into an
//! `OrgDocument` arena. The parser is line-oriented and never fails:
//! anything it does not recognise is kept as paragraph text so the
//! identity export reproduces it.
//!
//! Recognised structure:
//! - `#+KEY: value` keywords
//! - headlines with tags and an optional property drawer
//! - `#+BEGIN_X` ... `#+END_X` blocks (kept verbatim)
//! - footnote definitions `[fn:label] text`
//! - paragraphs with links and footnote references inline

use crate::types::*;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static HEADLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*+)\s+(.*?)(?:\s+(:(?:[\w@#%]+:)+))?\s*$").unwrap()
});

static KEYWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\+([A-Za-z][\w-]*):\s?(.*)$").unwrap());

static BLOCK_BEGIN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*#\+begin_(\w+)").unwrap());

static FOOTNOTE_DEFINITION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[fn:([\w-]+)\]\s?(.*)$").unwrap());

static PROPERTY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:([\w-]+):\s*(.*?)\s*$").unwrap());

// Links and footnote reference openers in one pass so they come out in source
// order. An inline definition body (`[fn:LABEL:...]`) may hold brackets, so
// only its opener is matched here; the body is closed by `matching_bracket`.
static INLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\]]+)\](?:\[([^\]]*)\])?\]|\[fn:([\w-]*)(:|\])").unwrap()
});

static LINK_TYPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z][\w+-]*):(.*)$").unwrap());

const KNOWN_LINK_TYPES: &[&str] = &[
    "file", "http", "https", "ftp", "mailto", "id", "doi", "news", "shell", "elisp", "help",
    "attachment", "info",
];

/// Parse Org source text into a document tree
pub fn parse_org(source: &str) -> OrgDocument {
    let lines: Vec<&str> = source.lines().collect();
    let mut builder = TreeBuilder::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = HEADLINE_REGEX.captures(line) {
            let level = caps[1].len();
            let raw_title = caps[2].to_string();
            let tags = caps
                .get(3)
                .map(|m| {
                    m.as_str()
                        .split(':')
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            i += 1;

            let mut properties = Vec::new();
            if i < lines.len() && lines[i].trim().eq_ignore_ascii_case(":PROPERTIES:") {
                i += 1;
                while i < lines.len() && !lines[i].trim().eq_ignore_ascii_case(":END:") {
                    if let Some(p) = PROPERTY_REGEX.captures(lines[i]) {
                        properties.push((p[1].to_uppercase(), p[2].to_string()));
                    }
                    i += 1;
                }
                // Skip :END:
                i += 1;
            }

            let title = builder.parse_inline(&raw_title);
            builder.open_headline(Headline {
                level,
                raw_title,
                title,
                tags,
                properties,
                pre_blank: 0,
            });
            continue;
        }

        if line.trim().is_empty() {
            builder.blank_line();
            i += 1;
            continue;
        }

        if let Some(caps) = BLOCK_BEGIN_REGEX.captures(line) {
            let end_marker = format!("#+end_{}", caps[1].to_lowercase());
            let mut raw = String::new();
            raw.push_str(line);
            raw.push('\n');
            i += 1;
            while i < lines.len() {
                raw.push_str(lines[i]);
                raw.push('\n');
                let closed = lines[i].trim().to_lowercase().starts_with(&end_marker);
                i += 1;
                if closed {
                    break;
                }
            }
            builder.push_element(DocumentNode::new(NodeData::Block { raw }));
            continue;
        }

        if let Some(caps) = KEYWORD_REGEX.captures(line) {
            let key = caps[1].to_uppercase();
            let value = caps[2].trim().to_string();
            builder.keywords.push((key.clone(), value.clone()));
            builder.push_element(DocumentNode::new(NodeData::Keyword {
                key,
                value,
                raw: format!("{line}\n"),
            }));
            i += 1;
            continue;
        }

        if let Some(caps) = FOOTNOTE_DEFINITION_REGEX.captures(line) {
            let label = caps[1].to_string();
            let mut text = caps[2].to_string();
            i += 1;
            while i < lines.len() && !ends_paragraph(lines[i]) {
                text.push('\n');
                text.push_str(lines[i]);
                i += 1;
            }
            text.push('\n');

            let mut paragraph = DocumentNode::new(NodeData::Paragraph);
            paragraph.children = builder.parse_inline(&text);
            let paragraph_id = builder.insert(paragraph);

            let mut definition = DocumentNode::new(NodeData::FootnoteDefinition {
                label: label.clone(),
            });
            definition.children.push(paragraph_id);
            let definition_id = builder.push_element(definition);
            builder
                .footnote_definitions
                .entry(label)
                .or_insert(definition_id);
            continue;
        }

        // Plain paragraph: consecutive lines until something else starts
        let mut text = String::new();
        while i < lines.len() {
            text.push_str(lines[i]);
            text.push('\n');
            i += 1;
            if i < lines.len() && ends_paragraph(lines[i]) {
                break;
            }
        }
        let mut paragraph = DocumentNode::new(NodeData::Paragraph);
        paragraph.children = builder.parse_inline(&text);
        builder.push_element(paragraph);
    }

    builder.finish()
}

/// Whether `line` terminates the paragraph (or footnote definition) above it
fn ends_paragraph(line: &str) -> bool {
    line.trim().is_empty()
        || HEADLINE_REGEX.is_match(line)
        || KEYWORD_REGEX.is_match(line)
        || BLOCK_BEGIN_REGEX.is_match(line)
        || FOOTNOTE_DEFINITION_REGEX.is_match(line)
}

/// Split a bracket-link target into (type, path, search option)
pub fn parse_link_target(target: &str) -> (String, String, Option<String>) {
    let is_file_path = ["./", "../", "/", "~/"]
        .iter()
        .any(|prefix| target.starts_with(prefix));
    if is_file_path {
        let (path, search) = split_search_option(target);
        return ("file".to_string(), path, search);
    }

    if let Some(caps) = LINK_TYPE_REGEX.captures(target) {
        let link_type = caps[1].to_lowercase();
        if KNOWN_LINK_TYPES.contains(&link_type.as_str()) {
            let rest = &caps[2];
            if link_type == "file" {
                let (path, search) = split_search_option(rest);
                return (link_type, path, search);
            }
            return (link_type, rest.to_string(), None);
        }
    }

    if let Some(id) = target.strip_prefix('#') {
        return ("custom-id".to_string(), id.to_string(), None);
    }

    ("fuzzy".to_string(), target.to_string(), None)
}

fn split_search_option(path: &str) -> (String, Option<String>) {
    match path.split_once("::") {
        Some((path, search)) => (path.to_string(), Some(search.to_string())),
        None => (path.to_string(), None),
    }
}

/// Byte offset of the `]` closing a bracket whose body starts at `from`.
/// Nested `[...]` pairs (links inside inline footnotes) are skipped.
fn matching_bracket(text: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in text[from..].char_indices() {
        match ch {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(from + offset),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

struct TreeBuilder {
    root: NodeId,
    nodes: HashMap<NodeId, DocumentNode>,
    keywords: Vec<(String, String)>,
    footnote_definitions: HashMap<String, NodeId>,
    /// Open headlines, outermost first: (level, id)
    headlines: Vec<(usize, NodeId)>,
    section: Option<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        let root = DocumentNode::new(NodeData::Document);
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            root: root_id,
            nodes,
            keywords: Vec::new(),
            footnote_definitions: HashMap::new(),
            headlines: Vec::new(),
            section: None,
        }
    }

    fn insert(&mut self, node: DocumentNode) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.push(child);
        }
    }

    fn current_container(&self) -> NodeId {
        self.headlines.last().map(|(_, id)| *id).unwrap_or(self.root)
    }

    fn open_headline(&mut self, headline: Headline) {
        let level = headline.level;
        while self.headlines.last().is_some_and(|(l, _)| *l >= level) {
            self.headlines.pop();
        }
        let cites_footnote = self.cites_footnote(&headline.title);
        let parent = self.current_container();
        let id = self.insert(DocumentNode::new(NodeData::Headline(headline)));
        self.attach(parent, id);
        self.headlines.push((level, id));
        self.section = None;

        // The section carries the title's footnote definitions, so a
        // headline citing one gets a section even without a body.
        if cites_footnote {
            self.open_section();
        }
    }

    fn open_section(&mut self) -> NodeId {
        let container = self.current_container();
        let section = self.insert(DocumentNode::new(NodeData::Section));
        self.attach(container, section);
        self.section = Some(section);
        section
    }

    /// Whether any of `objects`, or their descendants, is a `[fn:label]` reference
    fn cites_footnote(&self, objects: &[NodeId]) -> bool {
        objects.iter().any(|id| {
            self.nodes.get(id).is_some_and(|node| {
                node.as_footnote_reference()
                    .is_some_and(|r| r.style == FootnoteStyle::Standard)
                    || self.cites_footnote(&node.children)
            })
        })
    }

    /// Append an element to the current section, opening one if needed
    fn push_element(&mut self, node: DocumentNode) -> NodeId {
        let section = match self.section {
            Some(section) => section,
            None => self.open_section(),
        };
        let id = self.insert(node);
        self.attach(section, id);
        id
    }

    fn blank_line(&mut self) {
        let last = self
            .section
            .and_then(|section| self.nodes.get(&section))
            .and_then(|s| s.children.last().copied());
        if let Some(node) = last.and_then(|id| self.nodes.get_mut(&id)) {
            node.post_blank += 1;
            return;
        }
        // Blank lines right under a headline, before any content
        if let Some((_, headline)) = self.headlines.last() {
            if let Some(NodeData::Headline(h)) =
                self.nodes.get_mut(headline).map(|n| &mut n.data)
            {
                h.pre_blank += 1;
            }
        }
    }

    fn parse_inline(&mut self, text: &str) -> Vec<NodeId> {
        let mut objects = Vec::new();
        let mut cursor = 0;
        let mut search_from = 0;

        while let Some(caps) = INLINE_REGEX.captures_at(text, search_from) {
            let Some(whole) = caps.get(0) else {
                break;
            };
            let start = whole.start();
            search_from = whole.end();

            let (object, end) = if let Some(target) = caps.get(1) {
                let (link_type, path, search_option) = parse_link_target(target.as_str());
                let description = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                let mut node = DocumentNode::new(NodeData::Link(Link {
                    link_type,
                    path,
                    search_option,
                    raw_target: target.as_str().to_string(),
                    has_description: caps.get(2).is_some(),
                }));
                node.children = self.parse_inline(description);
                (node, whole.end())
            } else {
                let label = caps.get(3).map(|m| m.as_str()).unwrap_or("");
                let opens_definition = caps.get(4).is_some_and(|m| m.as_str() == ":");

                if opens_definition {
                    // Unclosed `[fn::...` stays plain text
                    let Some(close) = matching_bracket(text, whole.end()) else {
                        continue;
                    };
                    let mut node =
                        DocumentNode::new(NodeData::FootnoteReference(FootnoteReference {
                            label: (!label.is_empty()).then(|| label.to_string()),
                            style: FootnoteStyle::Inline,
                            raw: text[start..=close].to_string(),
                        }));
                    node.children = self.parse_inline(&text[whole.end()..close]);
                    (node, close + 1)
                } else if label.is_empty() {
                    // `[fn:]` is not a reference
                    continue;
                } else {
                    let node = DocumentNode::new(NodeData::FootnoteReference(FootnoteReference {
                        label: Some(label.to_string()),
                        style: FootnoteStyle::Standard,
                        raw: whole.as_str().to_string(),
                    }));
                    (node, whole.end())
                }
            };

            if start > cursor {
                let text_node = DocumentNode::new(NodeData::Text(text[cursor..start].to_string()));
                objects.push(self.insert(text_node));
            }
            objects.push(self.insert(object));
            cursor = end;
            search_from = end;
        }

        if cursor < text.len() {
            let text_node = DocumentNode::new(NodeData::Text(text[cursor..].to_string()));
            objects.push(self.insert(text_node));
        }
        objects
    }

    fn finish(self) -> OrgDocument {
        OrgDocument {
            root: self.root,
            nodes: self.nodes,
            keywords: self.keywords,
            footnote_definitions: self.footnote_definitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children_of(doc: &OrgDocument, id: NodeId) -> Vec<&DocumentNode> {
        doc.node(id)
            .unwrap()
            .children
            .iter()
            .map(|c| doc.node(*c).unwrap())
            .collect()
    }

    #[test]
    fn test_keywords_collected() {
        let doc = parse_org("#+TITLE: My Post\n#+author: Ada\n\nBody text.\n");
        assert_eq!(doc.keyword("TITLE"), Some("My Post"));
        assert_eq!(doc.keyword("AUTHOR"), Some("Ada"));
        assert_eq!(doc.keyword("DATE"), None);
    }

    #[test]
    fn test_headline_tags_and_properties() {
        let source = "* Draft ideas :noexport:wip:\n:PROPERTIES:\n:EXPORT_TITLE: Ideas\n:END:\nSome text\n";
        let doc = parse_org(source);
        let id = doc.find_headline("Draft ideas").expect("headline parsed");
        let headline = doc.node(id).unwrap().as_headline().unwrap();
        assert_eq!(headline.level, 1);
        assert_eq!(headline.tags, vec!["noexport".to_string(), "wip".to_string()]);
        assert_eq!(headline.property("export_title"), Some("Ideas"));
        assert!(headline.has_tag("noexport"));
    }

    #[test]
    fn test_nested_headlines() {
        let doc = parse_org("* A\n** B\n* C\n");
        let root = children_of(&doc, doc.root);
        assert_eq!(root.len(), 2);
        let a = root[0].as_headline().unwrap();
        assert_eq!(a.raw_title, "A");
        let under_a = children_of(&doc, root[0].id);
        assert_eq!(under_a.len(), 1);
        assert_eq!(under_a[0].as_headline().unwrap().raw_title, "B");
    }

    #[test]
    fn test_inline_objects_in_order() {
        let doc = parse_org("See [[file:other.org][Other]] and note[fn:1].\n\n[fn:1] The note.\n");
        let section = children_of(&doc, doc.root)[0].id;
        let paragraph = children_of(&doc, section)[0].id;
        let kinds: Vec<NodeKind> = children_of(&doc, paragraph).iter().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Text,
                NodeKind::Link,
                NodeKind::Text,
                NodeKind::FootnoteReference,
                NodeKind::Text,
            ]
        );
        assert!(doc.footnote_definition("1").is_some());
    }

    #[test]
    fn test_inline_footnote_owns_definition() {
        let doc = parse_org("Text[fn::an aside] here.\n");
        let reference = doc
            .nodes
            .values()
            .find_map(|n| n.as_footnote_reference().map(|r| (n, r)))
            .unwrap();
        assert_eq!(reference.1.style, FootnoteStyle::Inline);
        assert_eq!(reference.1.label, None);
        assert_eq!(reference.0.children.len(), 1);
    }

    #[test]
    fn test_inline_footnote_closes_on_matching_bracket() {
        let doc = parse_org("Aside[fn::see [[file:a.org][A]] here] done.\n");
        let (node, reference) = doc
            .nodes
            .values()
            .find_map(|n| n.as_footnote_reference().map(|r| (n, r)))
            .unwrap();
        assert_eq!(reference.raw, "[fn::see [[file:a.org][A]] here]");

        let kinds: Vec<NodeKind> = children_of(&doc, node.id).iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec![NodeKind::Text, NodeKind::Link, NodeKind::Text]);
    }

    #[test]
    fn test_headline_citing_footnote_owns_section() {
        let doc = parse_org("* Only[fn:1]\n\n* Plain\n");
        let headlines = children_of(&doc, doc.root);

        let only = headlines[0];
        assert_eq!(children_of(&doc, only.id)[0].kind(), NodeKind::Section);
        assert_eq!(only.as_headline().unwrap().pre_blank, 1);
        assert!(headlines[1].children.is_empty());
    }

    #[test]
    fn test_unclosed_inline_footnote_is_text() {
        let doc = parse_org("Broken [fn::never closed\n");
        assert!(doc.nodes.values().all(|n| n.as_footnote_reference().is_none()));
    }

    #[test]
    fn test_link_target_types() {
        assert_eq!(
            parse_link_target("file:posts/a.org"),
            ("file".to_string(), "posts/a.org".to_string(), None)
        );
        assert_eq!(
            parse_link_target("file:a.org::*Intro"),
            ("file".to_string(), "a.org".to_string(), Some("*Intro".to_string()))
        );
        assert_eq!(
            parse_link_target("./b.org"),
            ("file".to_string(), "./b.org".to_string(), None)
        );
        assert_eq!(
            parse_link_target("https://example.com"),
            ("https".to_string(), "//example.com".to_string(), None)
        );
        assert_eq!(parse_link_target("Some heading").0, "fuzzy");
        assert_eq!(parse_link_target("#anchor").0, "custom-id");
    }

    #[test]
    fn test_block_contents_not_inline_parsed() {
        let doc = parse_org("#+BEGIN_SRC org\n[fn:1] not a footnote\n#+END_SRC\n");
        assert!(doc.footnote_definitions.is_empty());
        assert!(doc
            .nodes
            .values()
            .any(|n| matches!(&n.data, NodeData::Block { raw } if raw.contains("[fn:1]"))));
    }

    #[test]
    fn test_blank_lines_recorded() {
        let doc = parse_org("First.\n\n\nSecond.\n");
        let section = children_of(&doc, doc.root)[0].id;
        let paragraphs = children_of(&doc, section);
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].post_blank, 2);
    }
}
