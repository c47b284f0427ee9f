/// thunder: developer tool for ThunderStorm markup documents
///
/// Commands:
///   check  parse documents and report errors with their full cause chain
///   fmt    rewrite a document in canonical layout
///   dump   print the element tree (text or JSON)
mod documents;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use thunderstorm_common::{EngineClock, EngineContext, EngineOptions};
use thunderstorm_markup::{ElemRef, Variable};
use tracing_subscriber::EnvFilter;

use documents::DocumentStore;

#[derive(Parser)]
#[command(name = "thunder", version, about = "ThunderStorm markup document tool")]
struct Cli {
    /// Engine options file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse documents and report whether they load
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Rewrite a document in canonical layout
    Fmt {
        file: PathBuf,
        /// Write here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the element tree
    Dump {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => EngineOptions::load(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => EngineOptions::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!("thunder v{}", env!("CARGO_PKG_VERSION"));

    let clock = EngineClock::new();
    let ctx = EngineContext::new(&clock, &options);
    let mut store = DocumentStore::new(ctx);

    match cli.command {
        Command::Check { files } => check(&mut store, &files),
        Command::Fmt { file, output } => fmt_document(&mut store, &file, output.as_deref()),
        Command::Dump { file, json } => dump(&mut store, &file, json),
    }
}

fn check(store: &mut DocumentStore<'_>, files: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for path in files {
        match store.open(path) {
            Ok(doc) => {
                let elements = doc.file().tree().len();
                println!("{}: ok ({} elements)", path.display(), elements);
                store.close(doc);
            }
            Err(e) => {
                failed += 1;
                println!("{}: {:#}", path.display(), anyhow::Error::from(e));
            }
        }
    }

    tracing::debug!(
        "{} documents cached, {} bytes",
        store.len(),
        store.memory_footprint()
    );

    if failed > 0 {
        bail!("{} of {} documents failed to load", failed, files.len());
    }
    Ok(())
}

fn fmt_document(store: &mut DocumentStore<'_>, file: &Path, output: Option<&Path>) -> Result<()> {
    let doc = store
        .open(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    let target = output.unwrap_or(file);
    let mut copy = doc.file().clone();
    store.close(doc);
    copy.save(target)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    if target == file {
        store.invalidate(file);
    }
    tracing::info!("Formatted {} -> {}", file.display(), target.display());
    Ok(())
}

fn dump(store: &mut DocumentStore<'_>, file: &Path, as_json: bool) -> Result<()> {
    let doc = store
        .open(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;

    if let Some(root) = doc.file().root_ref() {
        if as_json {
            println!("{}", serde_json::to_string_pretty(&elem_json(root))?);
        } else {
            let mut out = String::new();
            dump_text(root, 0, &mut out);
            print!("{out}");
        }
    }
    store.close(doc);
    Ok(())
}

fn dump_text(elem: ElemRef<'_>, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    if elem.name().is_empty() {
        out.push('-');
    } else {
        out.push_str(elem.name());
    }
    out.push_str(&format!(" [{}]", elem.shape().name()));
    if elem.shape().has_value() {
        out.push_str(&format!(" {} {}", elem.value().kind(), elem.value()));
    }
    out.push('\n');

    for child in elem.children() {
        dump_text(child, depth + 1, out);
    }
}

fn value_json(value: &Variable) -> Value {
    match value {
        Variable::Undefined => Value::Null,
        Variable::Int(v) => json!(v),
        Variable::Dword(v) => json!(v),
        Variable::Bool(v) => json!(v),
        Variable::Float(v) => json!(v),
        Variable::String(v) | Variable::Enum(v) => json!(v),
    }
}

fn elem_json(elem: ElemRef<'_>) -> Value {
    let mut obj = json!({
        "name": elem.name(),
        "shape": elem.shape().name(),
    });
    if elem.shape().has_value() {
        obj["kind"] = json!(elem.value().kind().name());
        obj["value"] = value_json(elem.value());
    }
    if elem.shape().has_children() {
        obj["children"] = Value::Array(elem.children().map(elem_json).collect());
    }
    obj
}
