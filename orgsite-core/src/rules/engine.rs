use crate::config::ExportConfiguration;
use crate::errors::ExportResult;
use crate::host::ExportHost;
use crate::types::*;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

// Import rule types
use super::footnote::FootnoteReferenceRule;
use super::link::LinkRule;
use super::section::SectionRule;
use super::template::TemplateRule;

// Debug configuration for dispatch tracing
#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub filter_patterns: Vec<String>,
}

impl DebugConfig {
    pub fn new(enabled: bool, filter_patterns: Vec<String>) -> Self {
        Self {
            enabled,
            filter_patterns,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            filter_patterns: Vec::new(),
        }
    }

    /// Whether dispatches for `kind` should be traced.
    /// An empty filter traces every kind.
    pub fn matches(&self, kind: NodeKind) -> bool {
        if !self.enabled {
            return false;
        }
        if self.filter_patterns.is_empty() {
            return true;
        }
        self.filter_patterns.iter().any(|pattern| {
            // Try regex first, fall back to simple string contains
            if let Ok(regex) = Regex::new(pattern) {
                regex.is_match(kind.name())
            } else {
                kind.name().contains(pattern.as_str())
            }
        })
    }
}

/// Debug utility function to trace one dispatch through the rule set.
/// Written to stderr so traces never mix with exported text on stdout.
pub fn debug_dispatch(
    kind: NodeKind,
    handler: &str,
    fragment: &str,
    debug_config: &DebugConfig,
) {
    if !debug_config.matches(kind) {
        return;
    }

    let flattened = fragment.replace('\n', "⏎");
    let preview = if flattened.chars().count() > 50 {
        let head: String = flattened.chars().take(47).collect();
        format!("{head}...")
    } else {
        flattened
    };
    eprintln!(
        "🔍 [{}] {} → {} bytes: \"{}\"",
        kind.name(),
        handler,
        fragment.len(),
        preview
    );
}

/// A transformation rule registered for one node kind.
///
/// `contents` is the already rendered text of the node's children (empty for
/// footnote references). Rules reach the rest of the export pass only through
/// `host`.
pub trait TransformRule: Send + Sync {
    fn render(
        &self,
        host: &dyn ExportHost,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<RenderedFragment>;

    fn name(&self) -> &str;
}

/// Node kind → rule table consulted by the host for every node it renders.
#[derive(Clone)]
pub struct RuleSet {
    rules: HashMap<NodeKind, Arc<dyn TransformRule>>,
    debug_config: DebugConfig,
}

impl RuleSet {
    /// No rules registered: every node takes the host default
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
            debug_config: DebugConfig::disabled(),
        }
    }

    /// The Hugo export rules: footnotes, links, sections and the template
    pub fn sidenotes() -> Self {
        let mut rule_set = Self::empty();
        rule_set.register(NodeKind::FootnoteReference, FootnoteReferenceRule);
        rule_set.register(NodeKind::Link, LinkRule);
        rule_set.register(NodeKind::Section, SectionRule);
        rule_set.register(NodeKind::Template, TemplateRule);
        rule_set
    }

    pub fn register(&mut self, kind: NodeKind, rule: impl TransformRule + 'static) {
        self.rules.insert(kind, Arc::new(rule));
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.debug_config = debug_config;
    }

    pub fn is_registered(&self, kind: NodeKind) -> bool {
        self.rules.contains_key(&kind)
    }

    /// Registered (kind, rule name) pairs, sorted by kind name
    pub fn registered(&self) -> Vec<(NodeKind, String)> {
        let mut entries: Vec<(NodeKind, String)> = self
            .rules
            .iter()
            .map(|(kind, rule)| (*kind, rule.name().to_string()))
            .collect();
        entries.sort_by_key(|(kind, _)| kind.name());
        entries
    }

    /// Render `node` with its registered rule, or the host default when the
    /// kind has none.
    pub fn dispatch(
        &self,
        host: &dyn ExportHost,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<RenderedFragment> {
        let kind = node.kind();
        match self.rules.get(&kind) {
            Some(rule) => {
                let fragment = rule.render(host, node, contents, config)?;
                debug_dispatch(kind, rule.name(), &fragment, &self.debug_config);
                Ok(fragment)
            }
            None => {
                let fragment = host.default_rule(node, contents, config)?;
                debug_dispatch(kind, "default", &fragment, &self.debug_config);
                Ok(fragment)
            }
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::sidenotes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidenotes_registers_four_rules() {
        let rules = RuleSet::sidenotes();
        let kinds: Vec<NodeKind> = rules.registered().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::FootnoteReference,
                NodeKind::Link,
                NodeKind::Section,
                NodeKind::Template,
            ]
        );
        assert!(!rules.is_registered(NodeKind::Paragraph));
    }

    #[test]
    fn test_empty_rule_set() {
        assert!(RuleSet::empty().registered().is_empty());
    }

    #[test]
    fn test_debug_filter_matches_kind_names() {
        let debug = DebugConfig::new(true, vec!["^foot".to_string()]);
        assert!(debug.matches(NodeKind::FootnoteReference));
        assert!(!debug.matches(NodeKind::Link));
        assert!(!DebugConfig::disabled().matches(NodeKind::Link));
        assert!(DebugConfig::new(true, Vec::new()).matches(NodeKind::Text));
    }
}
