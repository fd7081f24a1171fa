use crate::types::*;
use std::collections::{HashMap, HashSet};

/// Display numbers for every footnote reference reachable from the export root.
///
/// References are numbered in document order, one number per reference (two
/// references to the same label get two numbers). When a standard reference
/// is the first to reach its label, references inside that definition are
/// numbered right after it, since that is where they appear once inlined.
#[derive(Debug, Clone, Default)]
pub struct FootnoteIndex {
    numbers: HashMap<NodeId, usize>,
}

impl FootnoteIndex {
    pub fn build(document: &OrgDocument, start: NodeId, visible_only: bool) -> Self {
        let mut walker = NumberingWalk {
            document,
            visible_only,
            next: 1,
            numbers: HashMap::new(),
            expanded: HashSet::new(),
        };
        walker.visit(start);
        Self {
            numbers: walker.numbers,
        }
    }

    pub fn number(&self, reference: NodeId) -> Option<usize> {
        self.numbers.get(&reference).copied()
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

struct NumberingWalk<'a> {
    document: &'a OrgDocument,
    visible_only: bool,
    next: usize,
    numbers: HashMap<NodeId, usize>,
    expanded: HashSet<String>,
}

impl NumberingWalk<'_> {
    fn visit(&mut self, id: NodeId) {
        let Some(node) = self.document.node(id) else {
            return;
        };

        match &node.data {
            // Reached through their references, never in place
            NodeData::FootnoteDefinition { .. } => {}
            NodeData::Headline(headline) => {
                if is_excluded(headline) {
                    return;
                }
                for title_object in &headline.title {
                    self.visit(*title_object);
                }
                if self.visible_only && headline.is_folded() {
                    return;
                }
                self.visit_children(node);
            }
            NodeData::FootnoteReference(reference) => {
                if self.numbers.contains_key(&id) {
                    return;
                }
                self.numbers.insert(id, self.next);
                self.next += 1;

                match reference.style {
                    FootnoteStyle::Inline => self.visit_children(node),
                    FootnoteStyle::Standard => {
                        let label = reference.display_label().to_string();
                        if !self.expanded.insert(label.clone()) {
                            return;
                        }
                        if let Some(definition) = self.document.footnote_definition(&label) {
                            if let Some(definition) = self.document.node(definition) {
                                self.visit_children(definition);
                            }
                        }
                    }
                }
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: &DocumentNode) {
        for child in &node.children {
            self.visit(*child);
        }
    }
}

/// Headlines never exported, whatever the scope
pub fn is_excluded(headline: &Headline) -> bool {
    headline.has_tag("noexport")
}

/// Labels of standard references under `start`, in document order, skipping
/// footnote definition elements.
pub fn standard_reference_labels(document: &OrgDocument, start: NodeId) -> Vec<String> {
    let mut labels = Vec::new();
    collect_labels(document, start, &mut labels);
    labels
}

fn collect_labels(document: &OrgDocument, id: NodeId, labels: &mut Vec<String>) {
    let Some(node) = document.node(id) else {
        return;
    };
    match &node.data {
        NodeData::FootnoteDefinition { .. } => return,
        NodeData::FootnoteReference(reference) if reference.style == FootnoteStyle::Standard => {
            labels.push(reference.display_label().to_string());
        }
        _ => {}
    }
    for child in &node.children {
        collect_labels(document, *child, labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_org;

    fn references_in_order(doc: &OrgDocument) -> Vec<(NodeId, String)> {
        let mut found = Vec::new();
        let mut order: Vec<NodeId> = doc.preorder(doc.root);
        order.retain(|id| doc.node(*id).unwrap().as_footnote_reference().is_some());
        for id in order {
            let r = doc.node(id).unwrap().as_footnote_reference().unwrap();
            found.push((id, r.raw.clone()));
        }
        found
    }

    #[test]
    fn test_numbers_follow_occurrence_order() {
        let doc = parse_org("A[fn:x] B[fn:y] C[fn:x]\n\n[fn:x] X.\n[fn:y] Y.\n");
        let index = FootnoteIndex::build(&doc, doc.root, false);
        let numbers: Vec<usize> = references_in_order(&doc)
            .iter()
            .map(|(id, _)| index.number(*id).unwrap())
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_nested_reference_numbered_after_parent() {
        let doc = parse_org("A[fn:outer] B[fn:last]\n\n[fn:outer] See[fn:inner].\n[fn:inner] Deep.\n[fn:last] End.\n");
        let index = FootnoteIndex::build(&doc, doc.root, false);
        let by_raw: HashMap<String, usize> = references_in_order(&doc)
            .into_iter()
            .map(|(id, raw)| (raw, index.number(id).unwrap()))
            .collect();
        assert_eq!(by_raw["[fn:outer]"], 1);
        assert_eq!(by_raw["[fn:inner]"], 2);
        assert_eq!(by_raw["[fn:last]"], 3);
    }

    #[test]
    fn test_noexport_references_not_numbered() {
        let doc = parse_org("* Hidden :noexport:\nA[fn:1]\n* Shown\nB[fn:1]\n\n[fn:1] One.\n");
        let index = FootnoteIndex::build(&doc, doc.root, false);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_standard_reference_labels_skip_definitions() {
        let doc = parse_org("A[fn:a] B[fn::inline]\n\n[fn:a] Has[fn:b].\n[fn:b] B.\n");
        let labels = standard_reference_labels(&doc, doc.root);
        assert_eq!(labels, vec!["a".to_string()]);
    }
}
