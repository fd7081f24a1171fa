//! Export Host
//!
//! The host owns the document tree and the depth-first export walk. The
//! transformation rules see it only through the `ExportHost` capabilities:
//!
//! ```text
//! OrgDocument
//!     ↓
//! [Exporter walk] ── per node ──→ RuleSet::dispatch
//!     ↑                               │
//!     └──── ExportHost capabilities ──┘
//!           (footnotes, recursive rendering, default rules)
//! ```
//!
//! `Exporter` is the only implementation shipped; the trait keeps the rules
//! independent of how the walk is performed.

pub mod defaults;
pub mod exporter;
pub mod footnotes;

pub use exporter::Exporter;
pub use footnotes::FootnoteIndex;

use crate::config::ExportConfiguration;
use crate::errors::ExportResult;
use crate::types::*;
use chrono::NaiveDate;

pub trait ExportHost {
    /// Definition container for a footnote reference: the definition element
    /// for `[fn:label]`, the reference itself for inline footnotes.
    fn footnote_definition(&self, reference: &DocumentNode) -> ExportResult<NodeId>;

    /// 1-based display number of a reference, in occurrence order
    fn footnote_number(&self, reference: &DocumentNode) -> ExportResult<usize>;

    /// Render a node with the active rule set
    fn export_data(&self, id: NodeId, config: &ExportConfiguration)
        -> ExportResult<RenderedFragment>;

    /// Render the children of a node with the active rule set
    fn export_contents(
        &self,
        id: NodeId,
        config: &ExportConfiguration,
    ) -> ExportResult<RenderedFragment>;

    /// The host's own rendering of `node`, as if no rule were registered
    fn default_rule(
        &self,
        node: &DocumentNode,
        contents: &str,
        config: &ExportConfiguration,
    ) -> ExportResult<RenderedFragment>;

    /// Local calendar date captured when the pass started
    fn export_date(&self) -> NaiveDate;
}
