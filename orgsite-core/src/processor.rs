use crate::config::{ConfigLayer, ExportConfiguration};
use crate::errors::{ExportError, ExportResult};
use crate::host::Exporter;
use crate::parser::parse_org;
use crate::rules::{DebugConfig, RuleSet};
use crate::storage::{ExportStorage, FileStorage};
use crate::types::OrgDocument;
use chrono::{DateTime, Local};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

static WHITESPACE_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// File extension of exported documents
pub const EXPORT_EXTENSION: &str = "org";

/// Per-invocation export flags. These shape the pass; they are not part of
/// the configuration record the rules read.
#[derive(Debug, Clone, Default)]
pub struct ExportScope {
    /// `ExportProcessor::start` runs the pass on a background thread
    pub async_export: bool,
    /// Export only the first headline with this title
    pub subtree: Option<String>,
    /// Omit the contents of folded headlines
    pub visible_only: bool,
    /// Skip the template: no header, no date line
    pub body_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    Buffer,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutput {
    Buffer(String),
    File(PathBuf),
}

/// An export started with `ExportProcessor::start`: already done, or still
/// running on its own thread.
#[derive(Debug)]
pub enum ExportJob {
    Finished(ExportResult<ExportOutput>),
    Running(JoinHandle<ExportResult<ExportOutput>>),
}

impl ExportJob {
    pub fn is_running(&self) -> bool {
        matches!(self, ExportJob::Running(_))
    }

    /// Block until the export is done
    pub fn wait(self) -> ExportResult<ExportOutput> {
        match self {
            ExportJob::Finished(result) => result,
            ExportJob::Running(handle) => handle
                .join()
                .map_err(|_| ExportError::host_rendering("export", "export thread panicked"))?,
        }
    }
}

/// Simple profiler that collects timings for export steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        eprintln!("⏱️  {}: {}µs", step_name, elapsed.as_micros());

        result
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        eprintln!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            eprintln!(
                "   {:.<35} {}µs ({:.1}%)",
                step,
                duration.as_micros(),
                percentage
            );
        }
        eprintln!("   {:.<35} {}µs", "Total", total.as_micros());
    }
}

/// Runs export passes: parse, resolve configuration, walk with the rule set,
/// and for file exports hand the result to storage.
pub struct ExportProcessor {
    defaults: ExportConfiguration,
    rules: RuleSet,
    storage: Arc<dyn ExportStorage + Send + Sync>,
    clock: Option<DateTime<Local>>,
    profile: bool,
}

impl ExportProcessor {
    /// Processor with the Hugo rules and filesystem output
    pub fn new(defaults: ExportConfiguration) -> Self {
        Self::new_with_dependencies(defaults, RuleSet::sidenotes(), Arc::new(FileStorage::new()))
    }

    /// Create ExportProcessor with full dependency injection
    pub fn new_with_dependencies(
        defaults: ExportConfiguration,
        rules: RuleSet,
        storage: Arc<dyn ExportStorage + Send + Sync>,
    ) -> Self {
        Self {
            defaults,
            rules,
            storage,
            clock: None,
            profile: false,
        }
    }

    /// Pin the pass timestamp instead of reading the local clock
    pub fn with_clock(mut self, at: DateTime<Local>) -> Self {
        self.clock = Some(at);
        self
    }

    pub fn set_profiling(&mut self, enabled: bool) {
        self.profile = enabled;
    }

    pub fn set_debug_config(&mut self, debug_config: DebugConfig) {
        self.rules.set_debug_config(debug_config);
    }

    pub fn defaults(&self) -> &ExportConfiguration {
        &self.defaults
    }

    pub fn storage_name(&self) -> &str {
        self.storage.name()
    }

    fn now(&self) -> DateTime<Local> {
        self.clock.unwrap_or_else(Local::now)
    }

    /// Configuration for one pass over `document`: file-local settings over
    /// `overrides` over the processor defaults. A subtree export takes its
    /// title from the headline.
    pub fn resolve_configuration(
        &self,
        document: &OrgDocument,
        overrides: &ConfigLayer,
        scope: &ExportScope,
    ) -> ExportResult<ExportConfiguration> {
        let mut config = self
            .defaults
            .resolve(overrides, &ConfigLayer::from_document(document));

        if let Some(title) = scope.subtree.as_deref() {
            let headline = document
                .find_headline(title)
                .and_then(|id| document.node(id))
                .and_then(|node| node.as_headline())
                .ok_or_else(|| {
                    ExportError::configuration(format!("no headline titled \"{title}\" to export"))
                })?;
            let subtree_title = headline
                .property("EXPORT_TITLE")
                .unwrap_or(&headline.raw_title)
                .trim()
                .to_string();
            config.host.title = Some(subtree_title);
        }

        Ok(config)
    }

    /// Export to an in-memory string
    pub fn export_to_buffer(
        &self,
        source: &str,
        overrides: &ConfigLayer,
        scope: &ExportScope,
    ) -> ExportResult<String> {
        let mut profiler = StepProfiler::new(self.profile);
        let document = profiler.time_step("Parse", || parse_org(source));
        let config = profiler.time_step("Resolve configuration", || {
            self.resolve_configuration(&document, overrides, scope)
        })?;
        let output = profiler.time_step("Render", || self.render(&document, &config, scope))?;
        profiler.print_summary();
        Ok(output)
    }

    /// Export to `{export_path}/{slug}.org` and return that path.
    ///
    /// The destination is computed before rendering, so a missing export
    /// path fails without doing any work or touching storage.
    pub fn export_to_file(
        &self,
        source: &str,
        overrides: &ConfigLayer,
        scope: &ExportScope,
    ) -> ExportResult<PathBuf> {
        let mut profiler = StepProfiler::new(self.profile);
        let document = profiler.time_step("Parse", || parse_org(source));
        let config = profiler.time_step("Resolve configuration", || {
            self.resolve_configuration(&document, overrides, scope)
        })?;
        let destination = output_path(&config)?;

        let output = profiler.time_step("Render", || self.render(&document, &config, scope))?;
        profiler.time_step("Write", || self.storage.write_export(&destination, &output))?;
        profiler.print_summary();
        Ok(destination)
    }

    /// Export to `target` on the calling thread
    pub fn export(
        &self,
        source: &str,
        overrides: &ConfigLayer,
        scope: &ExportScope,
        target: ExportTarget,
    ) -> ExportResult<ExportOutput> {
        match target {
            ExportTarget::Buffer => self
                .export_to_buffer(source, overrides, scope)
                .map(ExportOutput::Buffer),
            ExportTarget::File => self
                .export_to_file(source, overrides, scope)
                .map(ExportOutput::File),
        }
    }

    /// Run an export on a background thread.
    ///
    /// The thread owns its inputs and resolves its own configuration, so
    /// concurrent passes never share a configuration record.
    pub fn spawn_export(
        self: Arc<Self>,
        source: String,
        overrides: ConfigLayer,
        scope: ExportScope,
        target: ExportTarget,
    ) -> JoinHandle<ExportResult<ExportOutput>> {
        thread::spawn(move || self.export(&source, &overrides, &scope, target))
    }

    /// Start an export, on a background thread when `scope.async_export` is
    /// set and on the calling thread otherwise.
    pub fn start(
        self: Arc<Self>,
        source: String,
        overrides: ConfigLayer,
        scope: ExportScope,
        target: ExportTarget,
    ) -> ExportJob {
        if scope.async_export {
            ExportJob::Running(self.spawn_export(source, overrides, scope, target))
        } else {
            ExportJob::Finished(self.export(&source, &overrides, &scope, target))
        }
    }

    fn render(
        &self,
        document: &OrgDocument,
        config: &ExportConfiguration,
        scope: &ExportScope,
    ) -> ExportResult<String> {
        let exporter = Exporter::new(document, &self.rules, scope, self.now())?;
        exporter.export(config, scope.body_only)
    }
}

/// Lower-cased title with every whitespace run turned into one hyphen
pub fn slugify(title: &str) -> String {
    WHITESPACE_RUN_REGEX
        .replace_all(&title.to_lowercase(), "-")
        .into_owned()
}

/// Destination of an export-to-file: `{export_path}/{slug}.org`
pub fn output_path(config: &ExportConfiguration) -> ExportResult<PathBuf> {
    if config.export_path.trim().is_empty() {
        return Err(ExportError::configuration(
            "export path is not set (use HUGO_EXPORT_PATH, --export-path or export_path in the config file)",
        ));
    }
    let title = config.title().ok_or_else(|| {
        ExportError::configuration("document has no title to derive the output file name from")
    })?;

    Ok(Path::new(&config.export_path).join(format!("{}.{}", slugify(title), EXPORT_EXTENSION)))
}
