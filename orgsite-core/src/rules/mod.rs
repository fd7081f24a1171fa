// Transformation rules for the Hugo export.
// - engine.rs: RuleSet dispatch table, TransformRule trait, debug tracing
// - footnote.rs: footnote references → sidenote shortcodes
// - link.rs: file links → `ref` cross-references
// - section.rs: drops trailing footnote definitions when sidenotes are on
// - template.rs: date stamp and timestamp suppression

pub mod engine;
pub mod footnote;
pub mod link;
pub mod section;
pub mod template;

pub use engine::*;
