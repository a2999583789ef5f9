//! Startup: plugin discovery and registry population.
//!
//! Runs once, single-threaded, before anything else touches the registries.
//! Built-in locations are scanned first and the externally configured
//! submitter location last, so an external plugin claiming a built-in name
//! is the one that gets rejected. Any registration conflict aborts startup:
//! continuing with whichever duplicate happened to load would silently
//! change graph semantics.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use exec::{CommandSubmitter, LocalSubmitter};
use graph::{NodeTypeRegistry, SubmitterRegistry};
use plugins::PluginScanner;

/// Environment variable naming the installation root that holds the
/// built-in `nodes/` and `submitters/` plugin locations.
pub const HOME_ENV: &str = "GANTRY_HOME";

/// Environment variable naming one additional submitter plugin location,
/// appended after the built-in set.
pub const SUBMITTERS_PATH_ENV: &str = "GANTRY_SUBMITTERS_PATH";

/// Both registries, populated and ready to share read-only.
pub struct Registries {
    pub node_types: Arc<NodeTypeRegistry>,
    pub submitters: Arc<SubmitterRegistry>,
}

impl std::fmt::Debug for Registries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registries")
            .field("node_types", &self.node_types.names())
            .field("submitters", &self.submitters.names())
            .finish()
    }
}

/// Installation root: the [`HOME_ENV`] override or the current directory.
pub fn install_root() -> PathBuf {
    std::env::var_os(HOME_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Additional submitter location from the environment, if configured.
pub fn extra_submitters_path() -> Option<PathBuf> {
    std::env::var_os(SUBMITTERS_PATH_ENV).map(PathBuf::from)
}

/// Scans every plugin location and populates both registries.
pub fn load_registries(install: &Path, extra_submitters: Option<&Path>) -> Result<Registries> {
    let mut scanner = PluginScanner::new();

    let mut node_types = NodeTypeRegistry::new();
    let nodes = scanner.scan_nodes(&install.join("nodes"));
    nodes.report();
    for ty in nodes.loaded {
        let name = ty.type_name().clone();
        node_types
            .register(Arc::new(ty))
            .with_context(|| format!("registering node type '{name}'"))?;
    }

    let mut submitters = SubmitterRegistry::new();
    submitters
        .register(Arc::new(LocalSubmitter::new()))
        .context("registering built-in submitter")?;

    let builtin = scanner.scan_submitters(&install.join("submitters"));
    builtin.report();
    let mut specs = builtin.loaded;
    if let Some(extra) = extra_submitters {
        let external = scanner.scan_submitters(extra);
        external.report();
        specs.extend(external.loaded);
    }
    for spec in specs {
        let name = spec.name().clone();
        submitters
            .register(Arc::new(CommandSubmitter::new(spec)))
            .with_context(|| format!("registering submitter '{name}'"))?;
    }

    info!(
        node_types = node_types.len(),
        submitters = submitters.len(),
        "plugin discovery complete"
    );
    Ok(Registries {
        node_types: Arc::new(node_types),
        submitters: Arc::new(submitters),
    })
}
