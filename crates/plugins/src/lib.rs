//! Gantry plugin discovery infrastructure.
//!
//! Node types and submitters are not compiled into the engine: they are
//! discovered at startup from plugin packages on disk. A package is a
//! directory with a `plugin.toml` identity manifest and declarative TOML
//! descriptor files; this crate walks discovery roots, parses what it finds,
//! stamps every descriptor with its package of origin, and hands the result
//! to the composition root for registration.
//!
//! ## Failure policy
//!
//! One broken package must never take down discovery of its siblings.
//! Failures are captured per package (or per descriptor file), the scan
//! continues, and [`ScanOutcome::report`] emits them as a single aggregated
//! warning afterwards. Registration conflicts are not handled here — the
//! registries reject duplicates themselves.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All filesystem walking and TOML parsing lives here;
//! the [`graph`] crate sees only finished descriptors.

mod manifest;
mod scan;

pub use manifest::{
    parse_node_descriptor, parse_submitter_descriptor, ManifestError, PackageManifest,
};
pub use scan::{PluginScanner, ScanFailure, ScanOutcome};
