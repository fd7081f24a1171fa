use super::engine::TransformRule;
use crate::config::ExportConfiguration;
use crate::errors::ExportResult;
use crate::host::ExportHost;
use crate::types::*;

// FootnoteReferenceRule - replaces each reference with a sidenote shortcode
// wrapping its rendered definition
pub struct FootnoteReferenceRule;

impl TransformRule for FootnoteReferenceRule {
    fn render(
        &self,
        host: &dyn ExportHost,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<RenderedFragment> {
        if !config.use_sidenotes {
            return host.default_rule(node, contents, config);
        }

        // Resolved by reference identity: two references sharing a label get
        // the same definition but their own numbers.
        let definition = host.footnote_definition(node)?;
        let number = host.footnote_number(node)?;
        let text = host.export_contents(definition, config)?;

        Ok(sidenote(&config.sidenote_shortcode, number, text.trim()))
    }

    fn name(&self) -> &str {
        "FootnoteReference"
    }
}

pub fn sidenote(shortcode: &str, number: usize, text: &str) -> String {
    format!("{{{{< {shortcode} id=\"{number}\" >}}}}{text}{{{{< /{shortcode} >}}}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidenote_markup() {
        assert_eq!(
            sidenote("sidenote", 3, "A remark."),
            "{{< sidenote id=\"3\" >}}A remark.{{< /sidenote >}}"
        );
    }

    #[test]
    fn test_sidenote_custom_shortcode() {
        assert_eq!(
            sidenote("marginnote", 1, "x"),
            "{{< marginnote id=\"1\" >}}x{{< /marginnote >}}"
        );
    }
}
