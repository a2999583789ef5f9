//! On-disk chunk status records.
//!
//! Each chunk of a node writes a small JSON record into the node's private
//! folder: `status` for single-chunk nodes, `<iteration>.status` otherwise.
//! The record plus the folder itself is the persistent "already computed"
//! marker — evaluation short-circuits a chunk whose record reads back as
//! [`Status::Success`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use graph::chunk::ChunkRange;
use graph::identifiers::SessionId;
use graph::node::Node;

use crate::CacheError;

/// Lifecycle state of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    None,
    Submitted,
    Running,
    Error,
    Stopped,
    Killed,
    Success,
}

/// The persisted status record of one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    pub status: Status,
    pub node_type: String,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub elapsed_seconds: f64,
    /// Which process run last touched this chunk; lets collaborator logs be
    /// correlated back to a run.
    pub session_id: SessionId,
}

impl StatusData {
    /// Fresh record for a chunk of `node`, in state [`Status::None`].
    pub fn new(node: &Node) -> Self {
        let ty = node.node_type();
        Self {
            status: Status::None,
            node_type: ty.type_name().as_str().to_string(),
            package_name: ty.package_name().map(|p| p.as_str().to_string()),
            package_version: ty.package_version().map(|v| v.as_str().to_string()),
            start_time: None,
            end_time: None,
            elapsed_seconds: 0.0,
            session_id: SessionId::current(),
        }
    }

    /// Clears everything run-specific back to [`Status::None`].
    pub fn reset(&mut self) {
        self.status = Status::None;
        self.start_time = None;
        self.end_time = None;
        self.elapsed_seconds = 0.0;
        self.session_id = SessionId::current();
    }

    /// Marks the start of a computation.
    pub fn start_compute(&mut self) {
        self.session_id = SessionId::current();
        self.start_time = Some(Utc::now());
        self.status = Status::Running;
    }

    /// Marks the end of a computation with the given final state.
    pub fn end_compute(&mut self, status: Status) {
        let end = Utc::now();
        if let Some(start) = self.start_time {
            self.elapsed_seconds = (end - start).num_milliseconds() as f64 / 1000.0;
        }
        self.end_time = Some(end);
        self.status = status;
    }
}

/// Path of the status record for `chunk` inside `folder`. Single-chunk nodes
/// use a bare `status` file; parallelized nodes one record per iteration.
pub fn status_file(folder: &Path, chunk: &ChunkRange, chunk_count: usize) -> PathBuf {
    if chunk_count <= 1 {
        folder.join("status")
    } else {
        folder.join(format!("{}.status", chunk.iteration))
    }
}

/// Writes `data` to `path` atomically: the record lands under a unique
/// `.writing.` name first and is renamed into place, so a concurrent reader
/// can never observe a half-written record.
pub fn save_status(path: &Path, data: &StatusData) -> Result<(), CacheError> {
    let write_err = |source| CacheError::WriteStatus { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let staging = path.with_file_name(format!(
        "{}.writing.{}",
        path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        uuid::Uuid::new_v4()
    ));
    let json = serde_json::to_vec_pretty(data).map_err(|source| CacheError::MalformedStatus {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(&staging, json).map_err(write_err)?;
    std::fs::rename(&staging, path).map_err(write_err)?;
    Ok(())
}

/// Reads the record at `path`. A missing file is `Ok(None)` — the caller
/// resets to [`Status::None`] — while an unreadable or malformed file is an
/// error worth surfacing.
pub fn load_status(path: &Path) -> Result<Option<StatusData>, CacheError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::ReadStatus { path: path.to_path_buf(), source })
        }
    };
    let data = serde_json::from_slice(&bytes).map_err(|source| CacheError::MalformedStatus {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(data))
}

/// Whether every chunk of the split already has a [`Status::Success`]
/// record in `folder` — the short-circuit test for re-evaluation.
pub fn is_computed(folder: &Path, chunks: &[ChunkRange]) -> bool {
    if !folder.is_dir() || chunks.is_empty() {
        return false;
    }
    chunks.iter().all(|chunk| {
        matches!(
            load_status(&status_file(folder, chunk, chunks.len())),
            Ok(Some(StatusData { status: Status::Success, .. }))
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use graph::{AttrDesc, AttrKind, AttrValue, NodeType, SizeRule, TypeName};

    fn node() -> Node {
        let mut ty = NodeType::new(
            TypeName::new("Blur").unwrap(),
            "blur {allParams}",
            vec![AttrDesc::new("input", AttrKind::File, AttrValue::String("".into()), [0])
                .unwrap()],
            vec![],
            SizeRule::default(),
            None,
        )
        .unwrap();
        ty.set_package(
            graph::PackageName::new("imaging").unwrap(),
            graph::PackageVersion::new("1.0.0"),
        );
        Node::new(Arc::new(ty))
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("status");

        let mut data = StatusData::new(&node());
        data.start_compute();
        data.end_compute(Status::Success);

        save_status(&path, &data).expect("save");
        let loaded = load_status(&path).expect("load").expect("present");
        assert_eq!(loaded, data);
        assert_eq!(loaded.package_name.as_deref(), Some("imaging"));

        // No staging leftovers once the rename landed.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(".writing."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_record_reads_as_unset() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_status(&dir.path().join("status")).expect("load").is_none());
    }

    #[test]
    fn chunk_records_are_named_by_iteration() {
        let folder = Path::new("/cache/abc");
        let chunk = ChunkRange { iteration: 2, begin: 20, end: 30 };
        assert_eq!(status_file(folder, &chunk, 1), folder.join("status"));
        assert_eq!(status_file(folder, &chunk, 3), folder.join("2.status"));
    }

    #[test]
    fn computed_requires_success_on_every_chunk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let chunks = vec![
            ChunkRange { iteration: 0, begin: 0, end: 10 },
            ChunkRange { iteration: 1, begin: 10, end: 20 },
        ];
        assert!(!is_computed(dir.path(), &chunks));

        let mut data = StatusData::new(&node());
        data.end_compute(Status::Success);
        save_status(&status_file(dir.path(), &chunks[0], 2), &data).expect("save");
        assert!(!is_computed(dir.path(), &chunks));

        save_status(&status_file(dir.path(), &chunks[1], 2), &data).expect("save");
        assert!(is_computed(dir.path(), &chunks));
    }
}
