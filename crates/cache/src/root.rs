//! Cache-root resolution and private folder creation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use graph::node::Node;

use crate::CacheError;

/// Environment variable overriding the cache root.
pub const CACHE_ENV: &str = "GANTRY_CACHE";

/// Folder created under the platform temp directory when no override is set.
pub const CACHE_FOLDER_NAME: &str = "GantryCache";

/// Resolves the cache root: the [`CACHE_ENV`] override when set, otherwise
/// [`CACHE_FOLDER_NAME`] under the platform temp directory.
pub fn cache_root() -> PathBuf {
    cache_root_from(std::env::var_os(CACHE_ENV))
}

/// Pure resolution from an explicit override value, so the policy is
/// testable without touching process environment.
pub fn cache_root_from(override_path: Option<OsString>) -> PathBuf {
    match override_path {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => std::env::temp_dir().join(CACHE_FOLDER_NAME),
    }
}

/// Creates the node's private folder under `cache_root` and returns it.
///
/// Idempotent and race-safe: concurrent workers that resolve the same
/// identity may both call this, and whichever loses the race still succeeds
/// with the folder fully present. This is the point where cache filesystem
/// errors surface — identity derivation itself never touches disk.
pub fn ensure_private_folder(cache_root: &Path, node: &Node) -> Result<PathBuf, CacheError> {
    let folder = node.private_folder(cache_root);
    std::fs::create_dir_all(&folder).map_err(|source| CacheError::CreateFolder {
        path: folder.clone(),
        source,
    })?;
    tracing::debug!(folder = %folder.display(), "private folder ensured");
    Ok(folder)
}
