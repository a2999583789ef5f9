//! Plugin manifest and descriptor file parsing.
//!
//! A plugin package is a directory holding a `plugin.toml` manifest plus any
//! number of `*.node.toml` and `*.submitter.toml` descriptor files. This
//! module turns those files into domain descriptors; the scan logic in
//! [`crate::scan`] decides which files are considered at all.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use graph::{
    AttrDesc, AttrKind, AttrValue, FloatRange, IntRange, NodeType, Parallelization, SizeRule,
    SubmitterName, SubmitterSpec, TypeName,
};

/// A descriptor file failed to parse or describes something inconsistent.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{0}")]
    Toml(#[from] toml::de::Error),

    #[error("attribute '{attr}': unknown kind '{kind}'")]
    UnknownKind { attr: String, kind: String },

    #[error("attribute '{attr}': range must be [min, max, step]")]
    BadRange { attr: String },

    #[error("attribute '{attr}': choice kind requires 'values'")]
    MissingValues { attr: String },

    #[error("attribute '{attr}': list kind requires 'element'")]
    MissingElement { attr: String },

    #[error("attribute '{attr}': group kind requires 'fields'")]
    MissingFields { attr: String },

    #[error("empty {what} name")]
    EmptyName { what: &'static str },

    #[error("size rule: {message}")]
    Size { message: String },

    #[error(transparent)]
    Attribute(#[from] graph::AttributeError),

    #[error(transparent)]
    Descriptor(#[from] graph::DescriptorError),
}

/// `plugin.toml`: identity of the enclosing package, attached to every
/// descriptor discovered inside it.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: Option<String>,
}

impl PackageManifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }
}

// ---------------------------------------------------------------------------
// Node descriptor files
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawAttr {
    name: String,
    kind: String,
    default: Option<toml::Value>,
    range: Option<Vec<toml::Value>>,
    values: Option<Vec<String>>,
    exclusive: Option<bool>,
    element: Option<Box<RawAttr>>,
    fields: Option<Vec<RawAttr>>,
    #[serde(default)]
    uid: Vec<u8>,
    group: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSize {
    mode: String,
    count: Option<usize>,
    input: Option<String>,
    inputs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawParallelization {
    block_size: usize,
}

#[derive(Debug, Deserialize)]
struct RawNodeDescriptor {
    type_name: String,
    command: String,
    #[serde(default)]
    inputs: Vec<RawAttr>,
    #[serde(default)]
    outputs: Vec<RawAttr>,
    size: Option<RawSize>,
    parallelization: Option<RawParallelization>,
}

/// Parses one `*.node.toml` file into a [`NodeType`] (package not yet
/// stamped).
pub fn parse_node_descriptor(text: &str) -> Result<NodeType, ManifestError> {
    let raw: RawNodeDescriptor = toml::from_str(text)?;
    let type_name =
        TypeName::new(raw.type_name).ok_or(ManifestError::EmptyName { what: "node type" })?;
    let inputs = raw
        .inputs
        .into_iter()
        .map(convert_attr)
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = raw
        .outputs
        .into_iter()
        .map(convert_attr)
        .collect::<Result<Vec<_>, _>>()?;
    let size = convert_size(raw.size)?;
    let parallelization = raw
        .parallelization
        .map(|p| Parallelization { block_size: p.block_size });
    Ok(NodeType::new(
        type_name,
        raw.command,
        inputs,
        outputs,
        size,
        parallelization,
    )?)
}

fn convert_size(raw: Option<RawSize>) -> Result<SizeRule, ManifestError> {
    let Some(raw) = raw else {
        return Ok(SizeRule::default());
    };
    match raw.mode.as_str() {
        "fixed" => Ok(SizeRule::Fixed(raw.count.unwrap_or(1))),
        "dynamic" => raw
            .input
            .map(|input| SizeRule::Dynamic { input })
            .ok_or_else(|| ManifestError::Size {
                message: "dynamic mode requires 'input'".to_string(),
            }),
        "multi" => match raw.inputs {
            Some(inputs) if !inputs.is_empty() => Ok(SizeRule::MultiDynamic { inputs }),
            _ => Err(ManifestError::Size {
                message: "multi mode requires a non-empty 'inputs' list".to_string(),
            }),
        },
        other => Err(ManifestError::Size {
            message: format!("unknown mode '{other}'"),
        }),
    }
}

fn convert_attr(raw: RawAttr) -> Result<AttrDesc, ManifestError> {
    let kind = match raw.kind.as_str() {
        "text" => AttrKind::Text,
        "file" => AttrKind::File,
        "bool" => AttrKind::Bool,
        "int" => AttrKind::Int {
            range: raw
                .range
                .as_ref()
                .map(|r| int_range(&raw.name, r))
                .transpose()?,
        },
        "float" => AttrKind::Float {
            range: raw
                .range
                .as_ref()
                .map(|r| float_range(&raw.name, r))
                .transpose()?,
        },
        "choice" => AttrKind::Choice {
            values: raw
                .values
                .clone()
                .ok_or_else(|| ManifestError::MissingValues { attr: raw.name.clone() })?,
            exclusive: raw.exclusive.unwrap_or(true),
        },
        "list" => AttrKind::List {
            element: Box::new(convert_attr(
                *raw.element
                    .ok_or_else(|| ManifestError::MissingElement { attr: raw.name.clone() })?,
            )?),
        },
        "group" => AttrKind::Group {
            fields: raw
                .fields
                .ok_or_else(|| ManifestError::MissingFields { attr: raw.name.clone() })?
                .into_iter()
                .map(convert_attr)
                .collect::<Result<Vec<_>, _>>()?,
        },
        other => {
            return Err(ManifestError::UnknownKind {
                attr: raw.name,
                kind: other.to_string(),
            })
        }
    };
    let default = raw
        .default
        .as_ref()
        .map(convert_value)
        .unwrap_or(AttrValue::Null);
    let mut desc = AttrDesc::new(raw.name, kind, default, raw.uid)?;
    if let Some(group) = raw.group {
        desc = desc.with_group(group);
    }
    Ok(desc)
}

fn int_range(attr: &str, raw: &[toml::Value]) -> Result<IntRange, ManifestError> {
    match raw {
        [min, max, step] => match (min.as_integer(), max.as_integer(), step.as_integer()) {
            (Some(min), Some(max), Some(step)) => Ok(IntRange { min, max, step }),
            _ => Err(ManifestError::BadRange { attr: attr.to_string() }),
        },
        _ => Err(ManifestError::BadRange { attr: attr.to_string() }),
    }
}

fn float_range(attr: &str, raw: &[toml::Value]) -> Result<FloatRange, ManifestError> {
    let as_float = |v: &toml::Value| v.as_float().or_else(|| v.as_integer().map(|i| i as f64));
    match raw {
        [min, max, step] => match (as_float(min), as_float(max), as_float(step)) {
            (Some(min), Some(max), Some(step)) => Ok(FloatRange { min, max, step }),
            _ => Err(ManifestError::BadRange { attr: attr.to_string() }),
        },
        _ => Err(ManifestError::BadRange { attr: attr.to_string() }),
    }
}

fn convert_value(value: &toml::Value) -> AttrValue {
    match value {
        toml::Value::String(s) => AttrValue::String(s.clone()),
        toml::Value::Integer(i) => AttrValue::Int(*i),
        toml::Value::Float(f) => AttrValue::Float(*f),
        toml::Value::Boolean(b) => AttrValue::Bool(*b),
        toml::Value::Datetime(d) => AttrValue::String(d.to_string()),
        toml::Value::Array(items) => AttrValue::List(items.iter().map(convert_value).collect()),
        toml::Value::Table(map) => AttrValue::Group(
            map.iter()
                .map(|(k, v)| (k.clone(), convert_value(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Submitter descriptor files
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawSubmitterDescriptor {
    name: String,
    command: String,
}

/// Parses one `*.submitter.toml` file into a [`SubmitterSpec`] (package not
/// yet stamped).
pub fn parse_submitter_descriptor(text: &str) -> Result<SubmitterSpec, ManifestError> {
    let raw: RawSubmitterDescriptor = toml::from_str(text)?;
    let name =
        SubmitterName::new(raw.name).ok_or(ManifestError::EmptyName { what: "submitter" })?;
    Ok(SubmitterSpec::new(name, raw.command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_node_descriptor() {
        let ty = parse_node_descriptor(
            r#"
type_name = "Match"
command = "match {allParams}"

[size]
mode = "multi"
inputs = ["input", "inputB"]

[parallelization]
block_size = 20

[[inputs]]
name = "input"
kind = "file"
default = ""
uid = [0]

[[inputs]]
name = "inputB"
kind = "file"
default = ""
uid = [0]

[[inputs]]
name = "mode"
kind = "choice"
values = ["fast", "full"]
default = "fast"
uid = [0]

[[inputs]]
name = "maxMatches"
kind = "int"
default = 50
range = [0, 1000, 1]

[[outputs]]
name = "output"
kind = "file"
default = "{folder}/matches.txt"
"#,
        )
        .unwrap();
        assert_eq!(ty.type_name().as_str(), "Match");
        assert_eq!(
            ty.size_rule(),
            &SizeRule::MultiDynamic { inputs: vec!["input".into(), "inputB".into()] }
        );
        assert_eq!(ty.parallelization(), Some(Parallelization { block_size: 20 }));
        assert_eq!(ty.inputs().len(), 4);
        assert!(ty.input("maxMatches").unwrap().uid_levels().is_empty());
    }

    #[test]
    fn nested_list_and_group_attributes_parse() {
        let ty = parse_node_descriptor(
            r#"
type_name = "Fuse"
command = "fuse {allParams}"

[[inputs]]
name = "featuresFolders"
kind = "list"
uid = [0]

[inputs.element]
name = "featuresFolder"
kind = "file"
default = ""
uid = [0]

[[inputs]]
name = "sensor"
kind = "group"
uid = [0]

[[inputs.fields]]
name = "brand"
kind = "text"
default = ""

[[inputs.fields]]
name = "width"
kind = "float"
default = 0.0
range = [0.0, 100.0, 0.1]
"#,
        )
        .unwrap();
        assert!(matches!(
            ty.input("featuresFolders").unwrap().kind(),
            AttrKind::List { .. }
        ));
        assert!(matches!(ty.input("sensor").unwrap().kind(), AttrKind::Group { .. }));
    }

    #[test]
    fn bad_defaults_are_rejected_at_parse_time() {
        let err = parse_node_descriptor(
            r#"
type_name = "Bad"
command = "bad"

[[inputs]]
name = "mode"
kind = "choice"
values = ["a"]
default = "b"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Attribute(_)));
    }

    #[test]
    fn unknown_kind_is_reported_with_the_attribute() {
        let err = parse_node_descriptor(
            r#"
type_name = "Bad"
command = "bad"

[[inputs]]
name = "x"
kind = "matrix"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::UnknownKind { .. }));
    }

    #[test]
    fn parses_a_submitter_descriptor() {
        let spec = parse_submitter_descriptor(
            r#"
name = "farm"
command = "farm-submit --chunks {chunkCount} -- {command}"
"#,
        )
        .unwrap();
        assert_eq!(spec.name().as_str(), "farm");
        assert!(spec.command().contains("{chunkCount}"));
    }
}
