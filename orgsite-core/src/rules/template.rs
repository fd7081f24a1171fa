use super::engine::TransformRule;
use crate::config::ExportConfiguration;
use crate::errors::ExportResult;
use crate::host::ExportHost;
use crate::types::*;
use chrono::NaiveDate;

// TemplateRule - document finalization: optional date stamp, and the host
// header without its own creation timestamp
pub struct TemplateRule;

impl TransformRule for TemplateRule {
    fn render(
        &self,
        host: &dyn ExportHost,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<RenderedFragment> {
        // Only the downstream call sees the override; `config` stays as is.
        let without_timestamp = config.with_timestamp_suppressed();
        let document = host.default_rule(node, contents, &without_timestamp)?;

        if config.add_current_date {
            Ok(format!("{}{document}", date_line(host.export_date())))
        } else {
            Ok(document)
        }
    }

    fn name(&self) -> &str {
        "Template"
    }
}

pub fn date_line(date: NaiveDate) -> String {
    format!("#+DATE: {}\n", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_line_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_line(date), "#+DATE: 2024-03-07\n");
    }
}
