//! Node type descriptors.
//!
//! A [`NodeType`] is the registered template for a processing step: its
//! declared input and output attributes, the command template it runs, and
//! the rule deriving its parallel size. Descriptors are built once at plugin
//! load time, stamped with their package of origin, and immutable behind an
//! `Arc` for the rest of the process.

use serde::{Deserialize, Serialize};

use crate::attribute::AttrDesc;
use crate::chunk::Parallelization;
use crate::errors::DescriptorError;
use crate::identifiers::{PackageName, PackageVersion, SubmitterName, TypeName};
use crate::size::SizeRule;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    type_name: TypeName,
    package_name: Option<PackageName>,
    package_version: Option<PackageVersion>,
    inputs: Vec<AttrDesc>,
    outputs: Vec<AttrDesc>,
    command: String,
    size: SizeRule,
    parallelization: Option<Parallelization>,
}

impl NodeType {
    /// Builds a descriptor, checking its internal consistency: attribute
    /// names unique across inputs and outputs, no output claiming identity
    /// levels, and every size-rule input actually declared.
    pub fn new(
        type_name: TypeName,
        command: impl Into<String>,
        inputs: Vec<AttrDesc>,
        outputs: Vec<AttrDesc>,
        size: SizeRule,
        parallelization: Option<Parallelization>,
    ) -> Result<Self, DescriptorError> {
        let mut seen = std::collections::HashSet::new();
        for attr in inputs.iter().chain(outputs.iter()) {
            if !seen.insert(attr.name()) {
                return Err(DescriptorError::DuplicateAttribute {
                    type_name,
                    attr: attr.name().to_string(),
                });
            }
        }
        if let Some(out) = outputs.iter().find(|a| !a.uid_levels().is_empty()) {
            return Err(DescriptorError::OutputWithIdentityLevels {
                type_name,
                attr: out.name().to_string(),
            });
        }
        if let Some(missing) = size
            .designated_inputs()
            .iter()
            .find(|name| !inputs.iter().any(|a| a.name() == name.as_str()))
        {
            return Err(DescriptorError::SizeRuleUnknownInput {
                type_name,
                attr: missing.clone(),
            });
        }
        Ok(Self {
            type_name,
            package_name: None,
            package_version: None,
            inputs,
            outputs,
            command: command.into(),
            size,
            parallelization,
        })
    }

    /// Stamps the package the descriptor was discovered in. Called by the
    /// plugin loader before registration.
    pub fn set_package(&mut self, name: PackageName, version: Option<PackageVersion>) {
        self.package_name = Some(name);
        self.package_version = version;
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn package_name(&self) -> Option<&PackageName> {
        self.package_name.as_ref()
    }

    pub fn package_version(&self) -> Option<&PackageVersion> {
        self.package_version.as_ref()
    }

    pub fn inputs(&self) -> &[AttrDesc] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[AttrDesc] {
        &self.outputs
    }

    /// Looks up a declared input descriptor by name.
    pub fn input(&self, name: &str) -> Option<&AttrDesc> {
        self.inputs.iter().find(|a| a.name() == name)
    }

    /// Looks up a declared output descriptor by name.
    pub fn output(&self, name: &str) -> Option<&AttrDesc> {
        self.outputs.iter().find(|a| a.name() == name)
    }

    /// The executable-unit reference: a command template opaque to this
    /// crate, resolved by the execution layer.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn size_rule(&self) -> &SizeRule {
        &self.size
    }

    pub fn parallelization(&self) -> Option<Parallelization> {
        self.parallelization
    }
}

// ---------------------------------------------------------------------------
// Submitter descriptors
// ---------------------------------------------------------------------------

/// The declarative description of a submitter discovered from a plugin: the
/// registry name plus the submission command template the execution layer
/// wraps resolved commands with.
///
/// Same lifecycle as [`NodeType`]: built at plugin load, stamped with its
/// package, immutable after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitterSpec {
    name: SubmitterName,
    command: String,
    package_name: Option<PackageName>,
    package_version: Option<PackageVersion>,
}

impl SubmitterSpec {
    pub fn new(name: SubmitterName, command: impl Into<String>) -> Self {
        Self {
            name,
            command: command.into(),
            package_name: None,
            package_version: None,
        }
    }

    /// Stamps the package the spec was discovered in.
    pub fn set_package(&mut self, name: PackageName, version: Option<PackageVersion>) {
        self.package_name = Some(name);
        self.package_version = version;
    }

    pub fn name(&self) -> &SubmitterName {
        &self.name
    }

    /// Submission command template; `{command}` and `{chunkCount}` are
    /// substituted by the execution layer.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn package_name(&self) -> Option<&PackageName> {
        self.package_name.as_ref()
    }

    pub fn package_version(&self) -> Option<&PackageVersion> {
        self.package_version.as_ref()
    }
}
