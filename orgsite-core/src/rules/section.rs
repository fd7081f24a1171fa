use super::engine::TransformRule;
use crate::config::ExportConfiguration;
use crate::errors::ExportResult;
use crate::host::ExportHost;
use crate::types::*;

// SectionRule - with sidenotes on, a section is its body alone; the host's
// trailing footnote definitions would repeat what the sidenotes inline.
// Gated on the same flag as FootnoteReferenceRule.
pub struct SectionRule;

impl TransformRule for SectionRule {
    fn render(
        &self,
        host: &dyn ExportHost,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<RenderedFragment> {
        if config.use_sidenotes {
            Ok(contents.to_string())
        } else {
            host.default_rule(node, contents, config)
        }
    }

    fn name(&self) -> &str {
        "Section"
    }
}
