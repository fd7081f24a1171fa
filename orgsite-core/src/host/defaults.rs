// Host default rules: the identity Org backend.
//
// Every node kind renders back to Org source. Two kinds do structural work:
// sections append the definitions of footnotes first referenced in them or in
// their headline's title, and the document template assembles the
// title/author header plus the file creation timestamp.

use super::exporter::Exporter;
use super::footnotes::standard_reference_labels;
use super::ExportHost;
use crate::config::ExportConfiguration;
use crate::errors::{ExportError, ExportResult};
use crate::types::*;
use std::collections::VecDeque;

/// Keywords regenerated by the template or read as export settings
const CONSUMED_KEYWORDS: &[&str] = &["TITLE", "AUTHOR", "DATE", "EMAIL", "OPTIONS"];
const SETTINGS_KEYWORD_PREFIX: &str = "HUGO_";

pub const CREATED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %a %H:%M";

impl Exporter<'_> {
    pub(super) fn render_default(
        &self,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<String> {
        match &node.data {
            NodeData::Document => Ok(self.default_template(contents, config)),
            NodeData::Headline(headline) => self.default_headline(headline, contents, config),
            NodeData::Section => self.default_section(node, contents, config),
            NodeData::Paragraph => Ok(contents.to_string()),
            NodeData::Block { raw } => Ok(raw.clone()),
            NodeData::Keyword { key, raw, .. } => {
                if is_consumed_keyword(key) {
                    Ok(String::new())
                } else {
                    Ok(raw.clone())
                }
            }
            NodeData::FootnoteDefinition { .. } => Ok(String::new()),
            NodeData::Text(text) => Ok(text.clone()),
            NodeData::Link(link) => Ok(default_link(link, contents)),
            NodeData::FootnoteReference(reference) => Ok(reference.raw.clone()),
        }
    }

    fn default_template(&self, contents: &str, config: &ExportConfiguration) -> String {
        let mut header = String::new();

        if config.host.time_stamp_file {
            header.push_str(&format!(
                "# Created {}\n",
                self.started_at.format(CREATED_TIMESTAMP_FORMAT)
            ));
        }
        if let Some(title) = config.title() {
            header.push_str(&format!("#+TITLE: {title}\n"));
        }
        if config.host.with_author {
            if let Some(author) = config.host.author.as_deref().filter(|a| !a.is_empty()) {
                header.push_str(&format!("#+AUTHOR: {author}\n"));
            }
        }
        if let Some(date) = config.host.date.as_deref().filter(|d| !d.is_empty()) {
            header.push_str(&format!("#+DATE: {date}\n"));
        }

        if header.is_empty() {
            return contents.to_string();
        }
        if !contents.is_empty() {
            header.push('\n');
        }
        header.push_str(contents);
        header
    }

    fn default_headline(
        &self,
        headline: &Headline,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<String> {
        let title = self.export_objects(&headline.title, config)?;
        let mut out = format!("{} {}", "*".repeat(headline.level), title.trim_end());
        if !headline.tags.is_empty() {
            out.push_str(&format!(" :{}:", headline.tags.join(":")));
        }
        out.push('\n');

        if !headline.properties.is_empty() {
            out.push_str(":PROPERTIES:\n");
            for (key, value) in &headline.properties {
                out.push_str(&format!(":{key}: {value}\n"));
            }
            out.push_str(":END:\n");
        }

        out.push_str(&"\n".repeat(headline.pre_blank));
        out.push_str(contents);
        Ok(out)
    }

    /// Body, then `[fn:label] definition` for each footnote first referenced
    /// in the parent headline's title or in this section, in that order.
    /// Definitions referenced from those definitions follow.
    fn default_section(
        &self,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<String> {
        let mut out = contents.to_string();
        let mut pending = VecDeque::new();
        if let Some(headline) = self.parent_headline(node.id) {
            for object in &headline.title {
                pending.extend(standard_reference_labels(self.document, *object));
            }
        }
        pending.extend(standard_reference_labels(self.document, node.id));

        while let Some(label) = pending.pop_front() {
            let first_time = self.emitted_definitions.borrow_mut().insert(label.clone());
            if !first_time {
                continue;
            }

            let definition = self
                .document
                .footnote_definition(&label)
                .ok_or_else(|| ExportError::UnresolvedFootnote {
                    label: label.clone(),
                })?;
            let text = self.export_contents(definition, config)?;

            // One blank line before each definition
            if !out.is_empty() {
                while !out.ends_with("\n\n") {
                    out.push('\n');
                }
            }
            out.push_str(&format!("[fn:{label}] {}\n", text.trim()));

            if let Some(definition) = self.document.node(definition) {
                for child in &definition.children {
                    pending.extend(standard_reference_labels(self.document, *child));
                }
            }
        }

        Ok(out)
    }
}

fn default_link(link: &Link, contents: &str) -> String {
    if link.has_description {
        format!("[[{}][{}]]", link.raw_target, contents)
    } else {
        format!("[[{}]]", link.raw_target)
    }
}

fn is_consumed_keyword(key: &str) -> bool {
    CONSUMED_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(key))
        || key.to_uppercase().starts_with(SETTINGS_KEYWORD_PREFIX)
}
