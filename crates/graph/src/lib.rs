//! Core pipeline-construction domain for Gantry.
//!
//! This crate contains every domain concept of the incremental pipeline
//! engine: the declarative attribute model, node type descriptors, node
//! instances with content-addressed cache identity, dynamic size resolution,
//! the write-once registries, and the port traits infrastructure crates
//! implement. Infrastructure crates supply discovery, storage, and
//! execution; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O
//! dependencies: identity hashing and size resolution are pure functions of
//! the values handed in, which is what makes them safe to call from any
//! number of evaluation workers at once.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`TypeName`, `SubmitterName`, …) and the per-process `SessionId` |
//! | [`attribute`] | Recursive attribute descriptors and values |
//! | [`descriptor`] | Node type descriptors |
//! | [`node`] | Node instances, identity derivation, documents |
//! | [`uid`] | Identity hashing |
//! | [`size`] | Dynamic size rules |
//! | [`chunk`] | Parallel chunk ranges |
//! | [`registry`] | Write-once node type / submitter registries |
//! | [`ports`] | `Runnable` and `Submitter` capability boundaries |
//! | [`template`] | `{placeholder}` expansion |
//! | [`errors`] | Error types |

pub mod attribute;
pub mod chunk;
pub mod descriptor;
pub mod errors;
pub mod identifiers;
pub mod node;
pub mod ports;
pub mod registry;
pub mod size;
pub mod template;
pub mod uid;

// Re-export the working set at the crate root for ergonomic usage by
// downstream crates.
pub use attribute::{AttrDesc, AttrKind, AttrValue, FloatRange, IntRange};
pub use chunk::{ChunkRange, Parallelization};
pub use descriptor::{NodeType, SubmitterSpec};
pub use errors::{
    AttributeError, DescriptorError, NodeError, RegistryError, SizeError, SubmitError,
    TemplateError,
};
pub use identifiers::{PackageName, PackageVersion, SessionId, SubmitterName, TypeName};
pub use node::{node_factory, Node};
pub use ports::{ResolvedCommand, Runnable, Submission, Submitter};
pub use registry::{NodeTypeRegistry, Registered, Registry, SubmitterRegistry};
pub use size::SizeRule;
pub use uid::derive_uid;
