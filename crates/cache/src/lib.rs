//! Gantry cache storage infrastructure.
//!
//! A node instance's identity hash names a private folder under the cache
//! root; that folder holds the node's outputs and per-chunk status records,
//! and its contents are what make re-running a graph incremental. This crate
//! owns every filesystem touch of that layout: root resolution, folder
//! creation, and status record persistence. Identity *derivation* stays in
//! [`graph`], pure; only materialisation happens here, so cache resource
//! errors surface at the moment a folder is first required and never before.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The [`graph`] crate composes paths; this crate
//! creates them.

mod root;
mod status;

use std::path::PathBuf;

use thiserror::Error;

pub use root::{cache_root, cache_root_from, ensure_private_folder, CACHE_ENV, CACHE_FOLDER_NAME};
pub use status::{is_computed, load_status, save_status, status_file, Status, StatusData};

/// Cache filesystem failures: folder creation and status record I/O.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The private folder could not be created (permissions, unwritable
    /// root). Surfaced when the folder is first required.
    #[error("cannot create cache folder '{path}': {source}")]
    CreateFolder {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A status record could not be written or renamed into place.
    #[error("cannot write status record '{path}': {source}")]
    WriteStatus {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A status record exists but could not be read.
    #[error("cannot read status record '{path}': {source}")]
    ReadStatus {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A status record exists but does not parse as one.
    #[error("malformed status record '{path}': {source}")]
    MalformedStatus {
        path: PathBuf,
        source: serde_json::Error,
    },
}
