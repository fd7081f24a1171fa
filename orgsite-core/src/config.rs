use crate::types::OrgDocument;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_sidenote_shortcode() -> String {
    "sidenote".to_string()
}

/// Settings for one export pass.
///
/// Built once per invocation and threaded through every rule call as a
/// shared reference. Rules never write to it; the template rule works on a
/// scoped copy instead (see `with_timestamp_suppressed`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfiguration {
    /// Inline footnotes as sidenote shortcodes instead of trailing definitions
    #[serde(default)]
    pub use_sidenotes: bool,
    /// Name of the Hugo shortcode wrapping each sidenote
    #[serde(default = "default_sidenote_shortcode")]
    pub sidenote_shortcode: String,
    /// Prepend `#+DATE:` with the export date
    #[serde(default)]
    pub add_current_date: bool,
    /// Directory receiving exported files; empty means unset
    #[serde(default)]
    pub export_path: String,
    /// Options owned by the host's default rules
    #[serde(default)]
    pub host: HostOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostOptions {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Date declared by the document itself
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default = "default_true")]
    pub with_author: bool,
    /// Emit the `# Created ...` line in the default template
    #[serde(default = "default_true")]
    pub time_stamp_file: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            date: None,
            with_author: true,
            time_stamp_file: true,
        }
    }
}

impl Default for ExportConfiguration {
    fn default() -> Self {
        Self {
            use_sidenotes: false,
            sidenote_shortcode: default_sidenote_shortcode(),
            add_current_date: false,
            export_path: String::new(),
            host: HostOptions::default(),
        }
    }
}

impl ExportConfiguration {
    /// Load system defaults from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ExportConfiguration = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load config with fallback to built-in defaults
    pub fn load_with_fallback(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                eprintln!("⚠️  Failed to load config from {}: {e:#}, using defaults", p.display());
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Resolve the configuration for one pass.
    ///
    /// Precedence, highest first: file-local settings, passed-in overrides,
    /// then `self` (system defaults).
    pub fn resolve(&self, overrides: &ConfigLayer, file_local: &ConfigLayer) -> Self {
        let mut resolved = self.clone();
        overrides.apply_to(&mut resolved);
        file_local.apply_to(&mut resolved);
        resolved
    }

    /// Copy of this configuration with the host's file timestamp turned off
    pub fn with_timestamp_suppressed(&self) -> Self {
        let mut copy = self.clone();
        copy.host.time_stamp_file = false;
        copy
    }

    pub fn title(&self) -> Option<&str> {
        self.host.title.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// A partial configuration: only the fields that are `Some` override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub use_sidenotes: Option<bool>,
    pub sidenote_shortcode: Option<String>,
    pub add_current_date: Option<bool>,
    pub export_path: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub with_author: Option<bool>,
    pub time_stamp_file: Option<bool>,
}

impl ConfigLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings declared inside the document through keywords
    pub fn from_document(document: &OrgDocument) -> Self {
        let mut layer = Self::new();

        for (key, value) in &document.keywords {
            match key.as_str() {
                "TITLE" => layer.title = Some(value.clone()),
                "AUTHOR" => layer.author = Some(value.clone()),
                "DATE" => layer.date = Some(value.clone()),
                "HUGO_SIDENOTES" => layer.use_sidenotes = parse_flag(value).or(layer.use_sidenotes),
                "HUGO_SIDENOTE_SHORTCODE" if !value.is_empty() => {
                    layer.sidenote_shortcode = Some(value.clone())
                }
                "HUGO_ADD_DATE" => layer.add_current_date = parse_flag(value).or(layer.add_current_date),
                "HUGO_EXPORT_PATH" => layer.export_path = Some(value.clone()),
                "OPTIONS" => layer.apply_options_line(value),
                _ => {}
            }
        }

        layer
    }

    /// `#+OPTIONS: timestamp:nil author:nil` style toggles
    fn apply_options_line(&mut self, value: &str) {
        for item in value.split_whitespace() {
            let Some((option, flag)) = item.split_once(':') else {
                continue;
            };
            let Some(flag) = parse_flag(flag) else {
                continue;
            };
            match option {
                "timestamp" => self.time_stamp_file = Some(flag),
                "author" => self.with_author = Some(flag),
                _ => {}
            }
        }
    }

    pub fn apply_to(&self, config: &mut ExportConfiguration) {
        if let Some(v) = self.use_sidenotes {
            config.use_sidenotes = v;
        }
        if let Some(v) = &self.sidenote_shortcode {
            config.sidenote_shortcode = v.clone();
        }
        if let Some(v) = self.add_current_date {
            config.add_current_date = v;
        }
        if let Some(v) = &self.export_path {
            config.export_path = v.clone();
        }
        if let Some(v) = &self.title {
            config.host.title = Some(v.clone());
        }
        if let Some(v) = &self.author {
            config.host.author = Some(v.clone());
        }
        if let Some(v) = &self.date {
            config.host.date = Some(v.clone());
        }
        if let Some(v) = self.with_author {
            config.host.with_author = v;
        }
        if let Some(v) = self.time_stamp_file {
            config.host.time_stamp_file = v;
        }
    }
}

/// Org-style boolean: `t`/`nil`, plus the usual yes/no spellings
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "t" | "true" | "yes" | "on" | "1" => Some(true),
        "nil" | "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_org;

    #[test]
    fn test_defaults() {
        let config = ExportConfiguration::default();
        assert!(!config.use_sidenotes);
        assert_eq!(config.sidenote_shortcode, "sidenote");
        assert!(config.export_path.is_empty());
        assert!(config.host.time_stamp_file);
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config: ExportConfiguration =
            serde_yaml::from_str("use_sidenotes: true\nexport_path: /srv/site\n").unwrap();
        assert!(config.use_sidenotes);
        assert_eq!(config.export_path, "/srv/site");
        assert_eq!(config.sidenote_shortcode, "sidenote");
        assert!(config.host.with_author);
    }

    #[test]
    fn test_file_local_beats_overrides() {
        let doc = parse_org("#+HUGO_SIDENOTES: nil\n#+TITLE: Local\n");
        let overrides = ConfigLayer {
            use_sidenotes: Some(true),
            title: Some("Override".to_string()),
            export_path: Some("/out".to_string()),
            ..ConfigLayer::default()
        };
        let resolved = ExportConfiguration::default()
            .resolve(&overrides, &ConfigLayer::from_document(&doc));
        assert!(!resolved.use_sidenotes);
        assert_eq!(resolved.title(), Some("Local"));
        assert_eq!(resolved.export_path, "/out");
    }

    #[test]
    fn test_options_line() {
        let doc = parse_org("#+OPTIONS: toc:nil timestamp:nil author:nil\n");
        let layer = ConfigLayer::from_document(&doc);
        assert_eq!(layer.time_stamp_file, Some(false));
        assert_eq!(layer.with_author, Some(false));
    }

    #[test]
    fn test_timestamp_suppression_is_a_copy() {
        let config = ExportConfiguration::default();
        let copy = config.with_timestamp_suppressed();
        assert!(!copy.host.time_stamp_file);
        assert!(config.host.time_stamp_file);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("t"), Some(true));
        assert_eq!(parse_flag("nil"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
