//! Port trait definitions.
//!
//! The graph core never runs anything itself. It hands a node to a
//! [`Runnable`] to obtain a concrete command, and hands that command plus the
//! node's chunk ranges to a [`Submitter`]. Infrastructure crates implement
//! both; this crate only fixes the boundary.

use async_trait::async_trait;

use crate::chunk::ChunkRange;
use crate::errors::{SubmitError, TemplateError};
use crate::identifiers::SubmitterName;
use crate::node::Node;

/// A command ready to hand to an execution backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    line: String,
}

impl ResolvedCommand {
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

impl std::fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.line)
    }
}

/// Resolves a node instance into a runnable command.
///
/// Implementations read the node's command variables; they must not mutate
/// the node or touch the cache filesystem.
pub trait Runnable: Send + Sync {
    fn resolve(&self, node: &Node) -> Result<ResolvedCommand, TemplateError>;
}

/// Accepted-submission receipt returned by a [`Submitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    /// Number of chunks the backend accepted.
    pub chunk_count: usize,
}

/// Executes a resolved command, one invocation per chunk, on some backend
/// (local processes, a render farm, anything else).
///
/// Registered once at startup under a unique name; read-only afterward, so
/// concurrent workers may share it freely.
#[async_trait]
pub trait Submitter: Send + Sync {
    fn name(&self) -> &SubmitterName;

    async fn submit(
        &self,
        command: &ResolvedCommand,
        chunks: &[ChunkRange],
    ) -> Result<Submission, SubmitError>;
}
