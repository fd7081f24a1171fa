use super::footnotes::{is_excluded, FootnoteIndex};
use super::ExportHost;
use crate::config::ExportConfiguration;
use crate::errors::{ExportError, ExportResult};
use crate::processor::ExportScope;
use crate::rules::RuleSet;
use crate::types::*;
use chrono::{DateTime, Local, NaiveDate};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Depth-first export walk over one parsed document.
///
/// An `Exporter` lives for exactly one pass: the footnote numbering, the set
/// of definitions already emitted and the pass timestamp are all pass state.
pub struct Exporter<'a> {
    pub(super) document: &'a OrgDocument,
    rules: &'a RuleSet,
    export_root: NodeId,
    visible_only: bool,
    pub(super) started_at: DateTime<Local>,
    footnotes: FootnoteIndex,
    /// Child -> parent, for rules that look upward (section -> headline)
    parents: HashMap<NodeId, NodeId>,
    /// Labels whose definitions the default section rule already wrote
    pub(super) emitted_definitions: RefCell<HashSet<String>>,
    /// Nodes whose contents are being rendered, for cycle detection
    rendering: RefCell<Vec<NodeId>>,
}

impl<'a> Exporter<'a> {
    pub fn new(
        document: &'a OrgDocument,
        rules: &'a RuleSet,
        scope: &ExportScope,
        started_at: DateTime<Local>,
    ) -> ExportResult<Self> {
        let export_root = match scope.subtree.as_deref() {
            Some(title) => document.find_headline(title).ok_or_else(|| {
                ExportError::configuration(format!("no headline titled \"{title}\" to export"))
            })?,
            None => document.root,
        };

        let parents = document
            .nodes
            .values()
            .flat_map(|node| node.children.iter().map(move |child| (*child, node.id)))
            .collect();

        Ok(Self {
            document,
            rules,
            export_root,
            visible_only: scope.visible_only,
            started_at,
            footnotes: FootnoteIndex::build(document, export_root, scope.visible_only),
            parents,
            emitted_definitions: RefCell::new(HashSet::new()),
            rendering: RefCell::new(Vec::new()),
        })
    }

    /// Run the pass: render the export root, then finalize with the
    /// template rule unless only the body was requested.
    pub fn export(&self, config: &ExportConfiguration, body_only: bool) -> ExportResult<String> {
        let body = if self.export_root == self.document.root {
            self.export_contents(self.export_root, config)?
        } else {
            self.export_data(self.export_root, config)?
        };

        if body_only {
            return Ok(body);
        }

        let root = self.node(self.document.root)?;
        self.rules.dispatch(self, root, &body, config)
    }

    pub fn footnotes(&self) -> &FootnoteIndex {
        &self.footnotes
    }

    pub(super) fn node(&self, id: NodeId) -> ExportResult<&'a DocumentNode> {
        self.document
            .node(id)
            .ok_or_else(|| ExportError::host_rendering("export", format!("unknown node {id}")))
    }

    /// The headline directly holding `id`, if any
    pub(super) fn parent_headline(&self, id: NodeId) -> Option<&'a Headline> {
        self.parents
            .get(&id)
            .and_then(|parent| self.document.node(*parent))
            .and_then(DocumentNode::as_headline)
    }

    /// Render objects that are not children of any node (headline titles)
    pub(super) fn export_objects(
        &self,
        ids: &[NodeId],
        config: &ExportConfiguration,
    ) -> ExportResult<String> {
        let mut out = String::new();
        for id in ids {
            out.push_str(&self.export_data(*id, config)?);
        }
        Ok(out)
    }
}

impl ExportHost for Exporter<'_> {
    fn footnote_definition(&self, reference: &DocumentNode) -> ExportResult<NodeId> {
        let Some(footnote) = reference.as_footnote_reference() else {
            return Err(ExportError::host_rendering(
                "footnote-reference",
                format!("node {} is a {}", reference.id, reference.kind().name()),
            ));
        };

        match footnote.style {
            FootnoteStyle::Inline => Ok(reference.id),
            FootnoteStyle::Standard => self
                .document
                .footnote_definition(footnote.display_label())
                .ok_or_else(|| ExportError::UnresolvedFootnote {
                    label: footnote.display_label().to_string(),
                }),
        }
    }

    fn footnote_number(&self, reference: &DocumentNode) -> ExportResult<usize> {
        self.footnotes.number(reference.id).ok_or_else(|| {
            ExportError::host_rendering(
                "footnote-reference",
                format!("reference {} is outside the exported tree", reference.id),
            )
        })
    }

    fn export_data(&self, id: NodeId, config: &ExportConfiguration) -> ExportResult<String> {
        let node = self.node(id)?;

        let contents = match &node.data {
            // Definitions are reached through references, never in place
            NodeData::FootnoteDefinition { .. } => return Ok(String::new()),
            NodeData::Headline(headline) if is_excluded(headline) => return Ok(String::new()),
            NodeData::Headline(headline) if self.visible_only && headline.is_folded() => {
                String::new()
            }
            NodeData::FootnoteReference(_) => String::new(),
            _ => self.export_contents(id, config)?,
        };

        let mut fragment = self.rules.dispatch(self, node, &contents, config)?;
        if !fragment.is_empty() {
            fragment.push_str(&"\n".repeat(node.post_blank));
        }
        Ok(fragment)
    }

    fn export_contents(&self, id: NodeId, config: &ExportConfiguration) -> ExportResult<String> {
        let node = self.node(id)?;

        if self.rendering.borrow().contains(&id) {
            return Err(ExportError::host_rendering(
                node.kind().name(),
                "footnote definition refers back to itself",
            ));
        }
        self.rendering.borrow_mut().push(id);

        let mut out = String::new();
        let mut result = Ok(());
        for child in &node.children {
            match self.export_data(*child, config) {
                Ok(fragment) => out.push_str(&fragment),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.rendering.borrow_mut().pop();
        result.map(|_| out)
    }

    fn default_rule(
        &self,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<String> {
        self.render_default(node, contents, config)
    }

    fn export_date(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}
