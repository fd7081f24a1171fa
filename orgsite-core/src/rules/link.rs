use super::engine::TransformRule;
use crate::config::ExportConfiguration;
use crate::errors::ExportResult;
use crate::host::ExportHost;
use crate::types::*;

/// Link type tag rewritten into a site cross-reference
pub const FILE_LINK_TYPE: &str = "file";

// LinkRule - local file links become Hugo `ref` cross-references, resolved
// to the published URL when the site is built
pub struct LinkRule;

impl TransformRule for LinkRule {
    fn render(
        &self,
        host: &dyn ExportHost,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<RenderedFragment> {
        match node.as_link() {
            Some(link) if link.link_type == FILE_LINK_TYPE => Ok(ref_link(&link.path, contents)),
            _ => host.default_rule(node, contents, config),
        }
    }

    fn name(&self) -> &str {
        "Link"
    }
}

/// The path goes in verbatim; Hugo resolves it.
pub fn ref_link(path: &str, description: &str) -> String {
    format!("[[{{{{< ref \"{path}\" >}}}}][{description}]]")
}
