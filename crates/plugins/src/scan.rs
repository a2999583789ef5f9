//! Filesystem discovery of plugin packages.
//!
//! A discovery root contains one directory per plugin package. Each package
//! needs a `plugin.toml`; everything matching the requested descriptor suffix
//! inside it is parsed and stamped with the package identity. One broken
//! package never aborts the scan of its siblings: failures are collected and
//! reported together once the whole root has been walked.

use std::path::{Path, PathBuf};

use graph::{NodeType, PackageName, PackageVersion, SubmitterSpec};

use crate::manifest::{
    parse_node_descriptor, parse_submitter_descriptor, ManifestError, PackageManifest,
};

const NODE_SUFFIX: &str = ".node.toml";
const SUBMITTER_SUFFIX: &str = ".submitter.toml";

/// One labeled per-package (or per-descriptor) failure from a scan.
#[derive(Debug)]
pub struct ScanFailure {
    /// `package` or `package/file` the failure belongs to.
    pub label: String,
    pub message: String,
}

/// Everything a scan produced: the descriptors that loaded plus the
/// failures that did not prevent them from loading.
#[derive(Debug)]
pub struct ScanOutcome<T> {
    pub loaded: Vec<T>,
    pub failures: Vec<ScanFailure>,
}

impl<T> Default for ScanOutcome<T> {
    fn default() -> Self {
        Self { loaded: Vec::new(), failures: Vec::new() }
    }
}

impl<T> ScanOutcome<T> {
    /// Emits one aggregated warning naming every failed package. Call after
    /// the scan; successful descriptors are unaffected.
    pub fn report(&self) {
        if self.failures.is_empty() {
            return;
        }
        let details: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!("  * {}: {}", f.label, f.message))
            .collect();
        tracing::warn!(
            "errors while loading the following plugins:\n{}",
            details.join("\n")
        );
    }
}

/// Scans discovery roots for plugin packages.
///
/// The scanner keeps a stack of roots being scanned; [`PathGuard`] pops the
/// stack on every exit path, so an error in the middle of a scan can never
/// leave the scanner's resolution state altered for the next caller.
pub struct PluginScanner {
    search_paths: Vec<PathBuf>,
}

struct PathGuard<'a> {
    paths: &'a mut Vec<PathBuf>,
}

impl<'a> PathGuard<'a> {
    fn push(paths: &'a mut Vec<PathBuf>, root: PathBuf) -> Self {
        paths.push(root);
        Self { paths }
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.paths.pop();
    }
}

impl PluginScanner {
    pub fn new() -> Self {
        Self { search_paths: Vec::new() }
    }

    /// Roots currently being scanned. Empty whenever no scan is in progress,
    /// including after a scan that failed partway.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Discovers node type descriptors under `root`.
    pub fn scan_nodes(&mut self, root: &Path) -> ScanOutcome<NodeType> {
        let _guard = PathGuard::push(&mut self.search_paths, root.to_path_buf());
        scan_root(root, NODE_SUFFIX, |text| {
            parse_node_descriptor(text).map(|ty| (ty.type_name().as_str().to_string(), ty))
        })
    }

    /// Discovers submitter specs under `root`.
    pub fn scan_submitters(&mut self, root: &Path) -> ScanOutcome<SubmitterSpec> {
        let _guard = PathGuard::push(&mut self.search_paths, root.to_path_buf());
        scan_root(root, SUBMITTER_SUFFIX, |text| {
            parse_submitter_descriptor(text).map(|s| (s.name().as_str().to_string(), s))
        })
    }
}

impl Default for PluginScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Stampable by package: both descriptor kinds carry their origin.
trait PackageStamped {
    fn stamp(&mut self, name: PackageName, version: Option<PackageVersion>);
}

impl PackageStamped for NodeType {
    fn stamp(&mut self, name: PackageName, version: Option<PackageVersion>) {
        self.set_package(name, version);
    }
}

impl PackageStamped for SubmitterSpec {
    fn stamp(&mut self, name: PackageName, version: Option<PackageVersion>) {
        self.set_package(name, version);
    }
}

fn scan_root<T: PackageStamped>(
    root: &Path,
    suffix: &str,
    parse: impl Fn(&str) -> Result<(String, T), ManifestError>,
) -> ScanOutcome<T> {
    let mut outcome = ScanOutcome::default();
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            outcome.failures.push(ScanFailure {
                label: root.display().to_string(),
                message: err.to_string(),
            });
            return outcome;
        }
    };

    // Sorted so registration order (and therefore which duplicate wins a
    // conflict report) is stable across runs.
    let mut packages: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    packages.sort();

    for package_dir in packages {
        scan_package(&package_dir, suffix, &parse, &mut outcome);
    }
    outcome
}

fn scan_package<T: PackageStamped>(
    package_dir: &Path,
    suffix: &str,
    parse: &impl Fn(&str) -> Result<(String, T), ManifestError>,
    outcome: &mut ScanOutcome<T>,
) {
    let package_label = package_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| package_dir.display().to_string());

    let manifest_path = package_dir.join("plugin.toml");
    if !manifest_path.is_file() {
        // Not a plugin package; plain directories are ignored.
        return;
    }
    let manifest = match std::fs::read_to_string(&manifest_path)
        .map_err(|e| e.to_string())
        .and_then(|text| PackageManifest::parse(&text).map_err(|e| e.to_string()))
    {
        Ok(manifest) => manifest,
        Err(message) => {
            outcome.failures.push(ScanFailure { label: package_label, message });
            return;
        }
    };
    let package_name = PackageName::new(&manifest.name);
    let package_version = manifest.version.as_deref().and_then(PackageVersion::new);

    let mut files: Vec<PathBuf> = match std::fs::read_dir(package_dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.ends_with(suffix))
            })
            .collect(),
        Err(err) => {
            outcome.failures.push(ScanFailure {
                label: package_label,
                message: err.to_string(),
            });
            return;
        }
    };
    files.sort();

    let failures_before = outcome.failures.len();
    let mut defined = 0usize;
    for file in files {
        // A descriptor merely linked in from outside the package is a shared
        // base the package reuses, not one it defines; registering it here
        // would duplicate it across every package that links it.
        if !defined_in_package(&file, package_dir) {
            tracing::debug!(file = %file.display(), "skipping descriptor defined outside its package");
            continue;
        }
        let file_label = format!(
            "{}/{}",
            package_label,
            file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
        );
        let parsed = std::fs::read_to_string(&file)
            .map_err(|e| e.to_string())
            .and_then(|text| parse(&text).map_err(|e| e.to_string()));
        match parsed {
            Ok((name, mut item)) => {
                if let Some(pkg) = package_name.clone() {
                    item.stamp(pkg, package_version.clone());
                }
                tracing::debug!(package = %package_label, descriptor = %name, "plugin descriptor loaded");
                outcome.loaded.push(item);
                defined += 1;
            }
            Err(message) => {
                outcome.failures.push(ScanFailure { label: file_label, message });
            }
        }
    }

    // A package that parsed cleanly but defines nothing qualifying is itself
    // a failure; packages whose files already errored are not double-counted.
    if defined == 0 && outcome.failures.len() == failures_before {
        outcome.failures.push(ScanFailure {
            label: package_label,
            message: "no qualifying descriptors defined in plugin".to_string(),
        });
    }
}

/// A descriptor counts as defined by a package only if its canonical
/// location lies inside the package directory.
fn defined_in_package(file: &Path, package_dir: &Path) -> bool {
    match (file.canonicalize(), package_dir.canonicalize()) {
        (Ok(file), Ok(dir)) => file.starts_with(&dir),
        _ => false,
    }
}
