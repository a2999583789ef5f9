//! Gantry CLI entry point.
//!
//! This binary is the composition root for the entire system:
//!
//! 1. **Wire observability** — configure `tracing-subscriber` with an
//!    env-filter layer; every crate in the workspace logs through it.
//! 2. **Load plugins** — scan the built-in `nodes/` and `submitters/`
//!    locations under the installation root (plus the externally configured
//!    submitter location) and populate the two registries. A registration
//!    conflict aborts startup.
//! 3. **Dispatch the command** — listing/inspection commands read the
//!    registries; `run` builds a node instance, derives its identity,
//!    materialises its private cache folder, and hands the resolved command
//!    to the selected submitter.

mod startup;

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use tracing::debug;

use cache::{ensure_private_folder, is_computed, save_status, status_file, Status, StatusData};
use exec::CommandRunnable;
use graph::{node_factory, AttrKind, AttrValue, NodeType, Runnable, SessionId, Submitter};

const USAGE: &str = "\
usage: gantry <command>

commands:
  list-nodes                         registered node types
  list-submitters                    registered submitters
  describe <type>                    attributes and size rule of a node type
  run <type> [name=value ...]        evaluate one node instance
      [--submitter <name>]           submitter to dispatch with (default: local)
";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    debug!(session = %SessionId::current(), "session started");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print!("{USAGE}");
        return Ok(());
    };

    let install = startup::install_root();
    let extra = startup::extra_submitters_path();
    let registries = startup::load_registries(&install, extra.as_deref())?;

    match command.as_str() {
        "list-nodes" => {
            for name in registries.node_types.names() {
                let ty = registries.node_types.lookup(name)?;
                println!("{name}  [{}]", package_label(&ty));
            }
        }
        "list-submitters" => {
            for name in registries.submitters.names() {
                println!("{name}");
            }
        }
        "describe" => {
            let type_name = args.get(1).context("describe needs a node type name")?;
            let ty = registries.node_types.lookup(type_name)?;
            describe(&ty);
        }
        "run" => {
            let type_name = args.get(1).context("run needs a node type name")?;
            run(&registries, type_name, &args[2..]).await?;
        }
        other => {
            eprint!("unknown command '{other}'\n\n{USAGE}");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn package_label(ty: &NodeType) -> String {
    match (ty.package_name(), ty.package_version()) {
        (Some(name), Some(version)) => format!("{name}-{version}"),
        (Some(name), None) => name.to_string(),
        _ => "unpackaged".to_string(),
    }
}

fn describe(ty: &NodeType) {
    println!("{}  [{}]", ty.type_name(), package_label(ty));
    println!("  command: {}", ty.command());
    println!("  size: {:?}", ty.size_rule());
    if let Some(p) = ty.parallelization() {
        println!("  parallelization: blocks of {}", p.block_size);
    }
    println!("  inputs:");
    for attr in ty.inputs() {
        println!("    {} ({})  uid={:?}", attr.name(), kind_label(attr.kind()), attr.uid_levels());
    }
    println!("  outputs:");
    for attr in ty.outputs() {
        println!("    {} ({})", attr.name(), kind_label(attr.kind()));
    }
}

fn kind_label(kind: &AttrKind) -> String {
    match kind {
        AttrKind::Text => "text".to_string(),
        AttrKind::File => "file".to_string(),
        AttrKind::Bool => "bool".to_string(),
        AttrKind::Int { .. } => "int".to_string(),
        AttrKind::Float { .. } => "float".to_string(),
        AttrKind::Choice { values, .. } => format!("choice of {values:?}"),
        AttrKind::List { element } => format!("list of {}", kind_label(element.kind())),
        AttrKind::Group { fields } => format!("group of {} fields", fields.len()),
    }
}

async fn run(registries: &startup::Registries, type_name: &str, rest: &[String]) -> Result<()> {
    let mut bindings = HashMap::new();
    let mut submitter_name = "local".to_string();
    let mut it = rest.iter();
    while let Some(arg) = it.next() {
        if arg == "--submitter" {
            submitter_name = it.next().context("--submitter needs a name")?.clone();
        } else if let Some((name, raw)) = arg.split_once('=') {
            bindings.insert(name.to_string(), parse_binding(raw));
        } else {
            bail!("expected name=value binding, got '{arg}'");
        }
    }

    let mut node = node_factory(&registries.node_types, type_name, bindings, false)?;
    let cache_root = cache::cache_root();
    node.update_internals(&cache_root)?;
    let chunks = node.chunks()?;
    let folder = node.private_folder(&cache_root);

    if is_computed(&folder, &chunks) {
        println!("{type_name} already computed: {}", folder.display());
        return Ok(());
    }

    let folder = ensure_private_folder(&cache_root, &node)?;
    let command = CommandRunnable.resolve(&node)?;
    let submitter = registries.submitters.lookup(&submitter_name)?;
    println!("{type_name} [{} chunk(s)] -> {}", chunks.len(), folder.display());

    let mut status = StatusData::new(&node);
    status.status = Status::Submitted;
    for chunk in &chunks {
        save_status(&status_file(&folder, chunk, chunks.len()), &status)?;
    }

    status.start_compute();
    let result = submitter.submit(&command, &chunks).await;
    status.end_compute(if result.is_ok() { Status::Success } else { Status::Error });
    for chunk in &chunks {
        save_status(&status_file(&folder, chunk, chunks.len()), &status)?;
    }
    let submission = result?;
    println!("submitted {} chunk(s) via '{submitter_name}'", submission.chunk_count);
    Ok(())
}

/// `name=value` bindings accept JSON values (`n=3`, `views=["/a","/b"]`);
/// anything that does not parse as JSON is taken as a bare string.
fn parse_binding(raw: &str) -> AttrValue {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => AttrValue::from(&json),
        Err(_) => AttrValue::String(raw.to_string()),
    }
}
