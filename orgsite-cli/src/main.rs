use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use orgsite_cli::{config_path, parse_export_date};
use orgsite_core::{
    parse_org, ConfigLayer, DebugConfig, ExportConfiguration, ExportOutput, ExportProcessor,
    ExportScope, ExportStorage, ExportTarget, FileStorage, MemoryStorage, RuleSet,
};

#[derive(Parser)]
#[command(name = "orgsite")]
#[command(about = "Export Org documents for Hugo, with footnotes as sidenotes")]
struct Args {
    /// Path to the Org file to export
    #[arg(short, long)]
    input: PathBuf,

    /// Path to a config file (YAML format); defaults to the user config if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render footnotes as sidenote shortcodes
    #[arg(long, conflicts_with = "no_sidenotes")]
    sidenotes: bool,

    /// Keep standard footnotes even if the config enables sidenotes
    #[arg(long)]
    no_sidenotes: bool,

    /// Name of the sidenote shortcode
    #[arg(long)]
    shortcode: Option<String>,

    /// Prepend #+DATE: with the export date
    #[arg(long)]
    add_date: bool,

    /// Directory that receives exported files
    #[arg(short, long)]
    export_path: Option<String>,

    /// Write {export-path}/{slug}.org instead of printing to stdout
    #[arg(long)]
    to_file: bool,

    /// Export only the subtree under the headline with this title
    #[arg(long)]
    subtree: Option<String>,

    /// Omit the contents of folded headlines
    #[arg(long)]
    visible_only: bool,

    /// Export the body without the header
    #[arg(long)]
    body_only: bool,

    /// Run the export on a background thread
    #[arg(long = "async")]
    async_export: bool,

    /// Pin the export date (YYYY-MM-DD) instead of using today
    #[arg(long)]
    date: Option<String>,

    /// Enable detailed profiling of export steps
    #[arg(long)]
    profile: bool,

    /// Trace rule dispatch to stderr
    #[arg(long)]
    debug: bool,

    /// Only trace node kinds matching these patterns (regex or substring)
    #[arg(long, requires = "debug")]
    debug_filter: Vec<String>,

    /// Print the parsed document tree as JSON and exit
    #[arg(long)]
    dump_tree: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    show_config: bool,

    /// Resolve and render a file export without writing it
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    if args.dump_tree {
        let document = parse_org(&source);
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    let config_file = config_path(args.config.as_deref());
    let defaults = ExportConfiguration::load_with_fallback(config_file.as_deref());
    let overrides = overrides_from_args(&args);
    let scope = ExportScope {
        async_export: args.async_export,
        subtree: args.subtree.clone(),
        visible_only: args.visible_only,
        body_only: args.body_only,
    };

    let storage: Arc<dyn ExportStorage + Send + Sync> = if args.dry_run {
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(FileStorage::new())
    };
    let mut processor = ExportProcessor::new_with_dependencies(defaults, RuleSet::sidenotes(), storage);
    if let Some(date) = &args.date {
        processor = processor.with_clock(parse_export_date(date)?);
    }
    processor.set_profiling(args.profile);
    if args.debug {
        processor.set_debug_config(DebugConfig::new(true, args.debug_filter.clone()));
    }

    if args.show_config {
        let document = parse_org(&source);
        let resolved = processor.resolve_configuration(&document, &overrides, &scope)?;
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    // Buffer output goes to stdout, so status lines go to stderr
    let target = if args.to_file || args.dry_run {
        ExportTarget::File
    } else {
        ExportTarget::Buffer
    };
    report(target, &format!("🦀 orgsite: {}", args.input.display()));
    if let Some(path) = &config_file {
        report(target, &format!("📋 Config: {}", path.display()));
    }

    let output = Arc::new(processor)
        .start(source, overrides, scope, target)
        .wait();

    match output {
        Ok(ExportOutput::Buffer(text)) => {
            print!("{text}");
        }
        Ok(ExportOutput::File(path)) => {
            if args.dry_run {
                println!("📝 Dry run, would write: {}", path.display());
            } else {
                println!("💾 Exported to: {}", display_path(&path));
            }
        }
        Err(e) => {
            eprintln!("❌ Export failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Command-line flags become the override layer; file-local keywords still
/// take precedence over them.
fn overrides_from_args(args: &Args) -> ConfigLayer {
    let use_sidenotes = if args.sidenotes {
        Some(true)
    } else if args.no_sidenotes {
        Some(false)
    } else {
        None
    };

    ConfigLayer {
        use_sidenotes,
        sidenote_shortcode: args.shortcode.clone(),
        add_current_date: args.add_date.then_some(true),
        export_path: args.export_path.clone(),
        ..ConfigLayer::default()
    }
}

fn report(target: ExportTarget, line: &str) {
    match target {
        ExportTarget::Buffer => eprintln!("{line}"),
        ExportTarget::File => println!("{line}"),
    }
}

fn display_path(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
