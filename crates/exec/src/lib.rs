//! Gantry execution infrastructure.
//!
//! Implements the two port traits the [`graph`] crate defines:
//!
//! - [`CommandRunnable`] resolves a node's command template against its
//!   current command variables, producing the concrete line to run.
//! - [`LocalSubmitter`] runs every chunk as a local process, passing the
//!   chunk range through `GANTRY_CHUNK*` environment variables.
//! - [`CommandSubmitter`] wraps a plugin-declared submission command (a
//!   render-farm CLI, a queueing client) around the resolved line instead of
//!   running it directly.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Process spawning and environment plumbing live here;
//! the [`graph`] crate sees only [`graph::Runnable`] and [`graph::Submitter`].

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, info};

use graph::chunk::ChunkRange;
use graph::errors::{SubmitError, TemplateError};
use graph::node::Node;
use graph::ports::{ResolvedCommand, Runnable, Submission, Submitter};
use graph::template;
use graph::{SubmitterName, SubmitterSpec};

// ---------------------------------------------------------------------------
// Command resolution
// ---------------------------------------------------------------------------

/// Resolves a node's command template (`blur {allParams}`) against the
/// command variables built by [`Node::update_internals`].
#[derive(Debug, Default)]
pub struct CommandRunnable;

impl Runnable for CommandRunnable {
    fn resolve(&self, node: &Node) -> Result<ResolvedCommand, TemplateError> {
        let line = template::expand(node.node_type().command(), node.cmd_vars())?;
        debug!(node_type = %node.node_type().type_name(), %line, "command resolved");
        Ok(ResolvedCommand::new(line))
    }
}

// ---------------------------------------------------------------------------
// Local submitter
// ---------------------------------------------------------------------------

/// Runs each chunk of a command as a local shell process.
///
/// The chunk split is exported through `GANTRY_CHUNK` (iteration index),
/// `GANTRY_CHUNK_BEGIN` and `GANTRY_CHUNK_END`, so the external program can
/// pick its slice of the work.
pub struct LocalSubmitter {
    name: SubmitterName,
}

impl LocalSubmitter {
    pub fn new() -> Self {
        Self {
            name: SubmitterName::new("local").expect("non-empty literal"),
        }
    }
}

impl Default for LocalSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Submitter for LocalSubmitter {
    fn name(&self) -> &SubmitterName {
        &self.name
    }

    async fn submit(
        &self,
        command: &ResolvedCommand,
        chunks: &[ChunkRange],
    ) -> Result<Submission, SubmitError> {
        for chunk in chunks {
            info!(iteration = chunk.iteration, line = %command.line(), "running chunk locally");
            let status = tokio::process::Command::new("sh")
                .arg("-c")
                .arg(command.line())
                .env("GANTRY_CHUNK", chunk.iteration.to_string())
                .env("GANTRY_CHUNK_BEGIN", chunk.begin.to_string())
                .env("GANTRY_CHUNK_END", chunk.end.to_string())
                .status()
                .await
                .map_err(|e| SubmitError::Launch { message: e.to_string() })?;
            if !status.success() {
                return Err(SubmitError::Rejected {
                    status: status.code().unwrap_or(-1),
                });
            }
        }
        Ok(Submission { chunk_count: chunks.len() })
    }
}

// ---------------------------------------------------------------------------
// Plugin-declared submitters
// ---------------------------------------------------------------------------

/// A submitter built from a plugin's [`SubmitterSpec`]: wraps the resolved
/// command in the spec's submission template and runs that once, handing the
/// whole chunk set to the external submission tool.
pub struct CommandSubmitter {
    spec: SubmitterSpec,
}

impl CommandSubmitter {
    pub fn new(spec: SubmitterSpec) -> Self {
        Self { spec }
    }

    /// The fully-expanded submission line: `{command}` carries the resolved
    /// node command, `{chunkCount}` the number of chunks to dispatch.
    pub fn submission_line(
        &self,
        command: &ResolvedCommand,
        chunk_count: usize,
    ) -> Result<String, SubmitError> {
        let mut vars = HashMap::new();
        vars.insert("command".to_string(), command.line().to_string());
        vars.insert("chunkCount".to_string(), chunk_count.to_string());
        template::expand(self.spec.command(), &vars)
            .map_err(|e| SubmitError::Launch { message: e.to_string() })
    }
}

#[async_trait]
impl Submitter for CommandSubmitter {
    fn name(&self) -> &SubmitterName {
        self.spec.name()
    }

    async fn submit(
        &self,
        command: &ResolvedCommand,
        chunks: &[ChunkRange],
    ) -> Result<Submission, SubmitError> {
        let line = self.submission_line(command, chunks.len())?;
        info!(submitter = %self.spec.name(), %line, "dispatching to external submitter");
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&line)
            .status()
            .await
            .map_err(|e| SubmitError::Launch { message: e.to_string() })?;
        if !status.success() {
            return Err(SubmitError::Rejected {
                status: status.code().unwrap_or(-1),
            });
        }
        Ok(Submission { chunk_count: chunks.len() })
    }
}
