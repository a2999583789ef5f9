//! Error types for the graph domain.
//!
//! Each enum covers one concern; variants document the condition that
//! produces them. Registry conflicts are startup-fatal (the composition root
//! aborts on them), everything else is reported synchronously to the caller
//! that triggered the computation. Nothing in this crate retries.

use thiserror::Error;

use crate::identifiers::TypeName;

// ---------------------------------------------------------------------------
// Attribute model
// ---------------------------------------------------------------------------

/// A value failed validation against its attribute descriptor.
#[derive(Debug, Error, PartialEq)]
pub enum AttributeError {
    /// The value's kind does not match the descriptor (e.g. a string bound to
    /// an integer attribute).
    #[error("attribute '{name}': expected {expected}, got {found}")]
    KindMismatch {
        /// Name of the offending attribute.
        name: String,
        /// What the descriptor declares.
        expected: &'static str,
        /// What the value actually is.
        found: &'static str,
    },

    /// A numeric value lies outside the descriptor's inclusive range.
    #[error("attribute '{name}': value {value} outside range [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: String,
        min: String,
        max: String,
    },

    /// A choice value is not one of the declared options.
    #[error("attribute '{name}': '{value}' is not a declared choice")]
    UnknownChoice { name: String, value: String },

    /// A group value carries a field the descriptor does not declare.
    #[error("attribute '{name}': unknown group field '{field}'")]
    UnknownField { name: String, field: String },

    /// A group value is missing a declared field.
    #[error("attribute '{name}': missing group field '{field}'")]
    MissingField { name: String, field: String },
}

// ---------------------------------------------------------------------------
// Node type descriptors
// ---------------------------------------------------------------------------

/// A node type descriptor is internally inconsistent.
///
/// Produced at construction time — i.e. at plugin load — so a broken
/// descriptor never reaches a registry.
#[derive(Debug, Error, PartialEq)]
pub enum DescriptorError {
    /// Two attributes of the same node type share a name.
    #[error("node type '{type_name}': duplicate attribute '{attr}'")]
    DuplicateAttribute { type_name: TypeName, attr: String },

    /// An output attribute declares identity levels. Outputs are resolved
    /// *from* the identity, so they can never contribute to it.
    #[error("node type '{type_name}': output '{attr}' declares identity levels")]
    OutputWithIdentityLevels { type_name: TypeName, attr: String },

    /// The size rule designates an input that the descriptor does not declare.
    #[error("node type '{type_name}': size rule references unknown input '{attr}'")]
    SizeRuleUnknownInput { type_name: TypeName, attr: String },
}

// ---------------------------------------------------------------------------
// Size resolution
// ---------------------------------------------------------------------------

/// Chunk-count resolution failed.
///
/// Returned to the caller requesting the count; never silently mapped to
/// zero. An *unset* designated input is not an error — it contributes zero
/// items.
#[derive(Debug, Error, PartialEq)]
pub enum SizeError {
    /// The size rule designates an input the node instance does not have.
    #[error("size rule references unknown input '{name}'")]
    UnknownInput { name: String },

    /// A designated input is bound to a value kind that carries no item count
    /// (anything other than a list or an unset value).
    #[error("input '{name}' of kind {kind} is not item-bearing")]
    NotItemBearing { name: String, kind: &'static str },
}

// ---------------------------------------------------------------------------
// Template expansion
// ---------------------------------------------------------------------------

/// A `{placeholder}` template could not be expanded.
#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    /// The template references a variable that is not defined.
    #[error("unknown placeholder '{name}'")]
    UnknownPlaceholder { name: String },

    /// A `{` was opened but never closed.
    #[error("unclosed placeholder in template '{template}'")]
    Unclosed { template: String },
}

// ---------------------------------------------------------------------------
// Node instances
// ---------------------------------------------------------------------------

/// A node instance operation failed.
#[derive(Debug, Error, PartialEq)]
pub enum NodeError {
    /// The requested node type is not registered.
    ///
    /// Produced by [`crate::node::node_factory`] when a document references a
    /// type that no loaded plugin provides.
    #[error("unknown node type '{name}'")]
    UnknownNodeType { name: String },

    /// The named attribute is not declared by the node's type.
    #[error("unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    /// Output attributes are derived from the node's identity and cannot be
    /// bound directly.
    #[error("attribute '{name}' is an output and cannot be set")]
    OutputNotSettable { name: String },

    /// An attribute binding failed validation.
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// An output value template could not be resolved.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

/// A registry operation failed.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// An item with this key is already registered.
    ///
    /// Indicates a packaging defect (two plugins claiming one name); the
    /// composition root must not proceed with an inconsistent registry.
    #[error("'{key}' is already registered")]
    Duplicate { key: String },

    /// No item with this key is registered.
    #[error("'{key}' is not registered")]
    NotFound { key: String },
}

// ---------------------------------------------------------------------------
// Submission port
// ---------------------------------------------------------------------------

/// A submitter failed to accept or launch a resolved command.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The backing process could not be spawned or waited on.
    #[error("submission failed: {message}")]
    Launch { message: String },

    /// The submission command itself reported failure.
    #[error("submission command exited with status {status}")]
    Rejected { status: i32 },
}
