use std::fs;
use std::path::Path;

use plugins::PluginScanner;
use tempfile::tempdir;

fn write_package(root: &Path, package: &str, version: &str, files: &[(&str, &str)]) {
    let dir = root.join(package);
    fs::create_dir_all(&dir).expect("package dir");
    fs::write(
        dir.join("plugin.toml"),
        format!("name = \"{package}\"\nversion = \"{version}\"\n"),
    )
    .expect("manifest");
    for (name, content) in files {
        fs::write(dir.join(name), content).expect("descriptor");
    }
}

const MATCH_NODE: &str = r#"
type_name = "Match"
command = "match {allParams}"

[[inputs]]
name = "input"
kind = "file"
default = ""
uid = [0]

[[outputs]]
name = "output"
kind = "file"
default = "{folder}/matches.txt"
"#;

const DEPTH_NODE: &str = r#"
type_name = "Depth"
command = "depth {allParams}"

[[inputs]]
name = "input"
kind = "file"
default = ""
uid = [0]
"#;

const FARM_SUBMITTER: &str = r#"
name = "farm"
command = "farm-submit --chunks {chunkCount} -- {command}"
"#;

#[test]
fn broken_packages_do_not_abort_their_siblings() {
    let root = tempdir().expect("tempdir");
    write_package(root.path(), "vision", "2.1.0", &[("match.node.toml", MATCH_NODE)]);
    write_package(
        root.path(),
        "broken",
        "0.1.0",
        &[("bad.node.toml", "type_name = \"Bad\"\nthis is not toml")],
    );

    let mut scanner = PluginScanner::new();
    let outcome = scanner.scan_nodes(root.path());

    assert_eq!(outcome.loaded.len(), 1);
    let ty = &outcome.loaded[0];
    assert_eq!(ty.type_name().as_str(), "Match");
    assert_eq!(ty.package_name().unwrap().as_str(), "vision");
    assert_eq!(ty.package_version().unwrap().as_str(), "2.1.0");

    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].label.starts_with("broken/"));
}

#[test]
fn package_without_qualifying_descriptors_is_reported() {
    let root = tempdir().expect("tempdir");
    write_package(root.path(), "hollow", "1.0.0", &[]);
    // A submitter-only package scanned for nodes qualifies nothing either.
    write_package(
        root.path(),
        "subonly",
        "1.0.0",
        &[("farm.submitter.toml", FARM_SUBMITTER)],
    );

    let mut scanner = PluginScanner::new();
    let outcome = scanner.scan_nodes(root.path());

    assert!(outcome.loaded.is_empty());
    let mut labels: Vec<&str> = outcome.failures.iter().map(|f| f.label.as_str()).collect();
    labels.sort_unstable();
    assert_eq!(labels, vec!["hollow", "subonly"]);
}

#[test]
fn plain_directories_are_ignored_silently() {
    let root = tempdir().expect("tempdir");
    fs::create_dir_all(root.path().join("not-a-plugin")).expect("dir");
    write_package(root.path(), "vision", "2.1.0", &[("match.node.toml", MATCH_NODE)]);

    let mut scanner = PluginScanner::new();
    let outcome = scanner.scan_nodes(root.path());
    assert_eq!(outcome.loaded.len(), 1);
    assert!(outcome.failures.is_empty());
}

#[cfg(unix)]
#[test]
fn descriptors_linked_from_another_package_are_not_redefined() {
    let root = tempdir().expect("tempdir");
    write_package(root.path(), "base", "1.0.0", &[("match.node.toml", MATCH_NODE)]);
    write_package(root.path(), "derived", "1.0.0", &[("depth.node.toml", DEPTH_NODE)]);
    std::os::unix::fs::symlink(
        root.path().join("base/match.node.toml"),
        root.path().join("derived/shared.node.toml"),
    )
    .expect("symlink");

    let mut scanner = PluginScanner::new();
    let outcome = scanner.scan_nodes(root.path());

    // "Match" is defined once, by its declaring package; "derived" only
    // contributes what it defines itself.
    let mut names: Vec<&str> = outcome
        .loaded
        .iter()
        .map(|t| t.type_name().as_str())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Depth", "Match"]);
    assert!(outcome.failures.is_empty());
}

#[test]
fn scanner_path_state_reverts_on_every_exit() {
    let mut scanner = PluginScanner::new();
    assert!(scanner.search_paths().is_empty());

    // Failing scan: the root does not exist.
    let outcome = scanner.scan_nodes(Path::new("/nonexistent/gantry-plugins"));
    assert!(outcome.loaded.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert!(scanner.search_paths().is_empty());

    // Successful scan.
    let root = tempdir().expect("tempdir");
    write_package(root.path(), "vision", "2.1.0", &[("match.node.toml", MATCH_NODE)]);
    let outcome = scanner.scan_nodes(root.path());
    assert_eq!(outcome.loaded.len(), 1);
    assert!(scanner.search_paths().is_empty());
}

#[test]
fn submitter_packages_are_discovered_and_stamped() {
    let root = tempdir().expect("tempdir");
    write_package(
        root.path(),
        "renderfarm",
        "3.2.1",
        &[("farm.submitter.toml", FARM_SUBMITTER)],
    );

    let mut scanner = PluginScanner::new();
    let outcome = scanner.scan_submitters(root.path());

    assert_eq!(outcome.loaded.len(), 1);
    let spec = &outcome.loaded[0];
    assert_eq!(spec.name().as_str(), "farm");
    assert_eq!(spec.package_name().unwrap().as_str(), "renderfarm");
    assert!(outcome.failures.is_empty());
}
