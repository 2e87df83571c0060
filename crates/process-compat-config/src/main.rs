//! process-compat-config - merge compat change config fragments

use anyhow::{Context, Result};
use clap::Parser;
use compat_config::{ConfigMerger, ConfigView, MergeOptions, read_fragments_from_path};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Process compat config XML fragments into device and merged configs
#[derive(Parser, Debug)]
#[command(name = "process-compat-config")]
#[command(version, about, long_about = None)]
struct Args {
    /// Jar file to extract `*_compat_config.xml` fragments from (repeatable)
    #[arg(long = "jar", value_name = "FILE")]
    jars: Vec<PathBuf>,

    /// Raw compat config XML fragment (repeatable)
    #[arg(long = "xml", value_name = "FILE")]
    xmls: Vec<PathBuf>,

    /// Write the device config (attributes only) to FILE
    #[arg(long, value_name = "FILE")]
    device_config: Option<PathBuf>,

    /// Write the merged config (metadata included) to FILE
    #[arg(long, value_name = "FILE")]
    merged_config: Option<PathBuf>,

    /// Do not fail on changes that reuse an id or name
    #[arg(long)]
    allow_duplicate_changes: bool,

    /// Pretty-print outputs with N spaces per level
    #[arg(long, value_name = "N")]
    indent: Option<usize>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "process_compat_config=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    if args.allow_duplicate_changes {
        tracing::warn!("duplicate compat change detection is disabled");
    }
    let options = MergeOptions {
        detect_conflicts: !args.allow_duplicate_changes,
        indent: args.indent,
    };
    let mut merger = ConfigMerger::new(options);

    for jar in &args.jars {
        let fragments = read_fragments_from_path(jar)
            .with_context(|| format!("Failed to open jar: {}", jar.display()))?;
        let label = jar.display().to_string();
        for fragment in &fragments {
            merger.merge_bytes(&fragment.contents, &fragment.source_label(&label))?;
        }
        tracing::debug!(jar = %label, fragments = fragments.len(), "processed jar");
    }

    for xml in &args.xmls {
        let content =
            fs::read(xml).with_context(|| format!("Failed to read XML file: {}", xml.display()))?;
        merger.merge_bytes(&content, &xml.display().to_string())?;
    }

    if let Some(path) = &args.device_config {
        write_output(&merger, ConfigView::Device, path)?;
    }
    if let Some(path) = &args.merged_config {
        write_output(&merger, ConfigView::Merged, path)?;
    }

    Ok(())
}

/// Render `view` fully before touching `path`, so a failure leaves no file.
fn write_output(merger: &ConfigMerger, view: ConfigView, path: &Path) -> Result<()> {
    let mut rendered = Vec::new();
    merger.write_view(view, &mut rendered)?;
    fs::write(path, &rendered)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;
    tracing::info!(
        output = %path.display(),
        view = ?view,
        records = merger.len(),
        "wrote compat config"
    );
    Ok(())
}
