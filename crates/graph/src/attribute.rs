//! Attribute descriptors and values.
//!
//! A node type declares its parameters as an ordered list of [`AttrDesc`]s.
//! The descriptor is a recursive tagged union: scalars at the leaves, lists of
//! a child descriptor, and groups of named child descriptors. One recursive
//! traversal serves validation, default construction, and the canonical
//! serialization that feeds identity hashing, so the three concerns can never
//! disagree about structure.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::AttributeError;

/// Separator written after every list element and group field during
/// canonical serialization, so adjacent values cannot run together.
const SEP: char = '\u{1f}';

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A concrete attribute value.
///
/// `Null` means "unset": it validates against any kind and contributes
/// nothing to canonical serialization or command variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<AttrValue>),
    Group(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Human-readable kind label, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::String(_) => "string",
            AttrValue::List(_) => "list",
            AttrValue::Group(_) => "group",
        }
    }

    /// Returns `true` for the unset value.
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    fn leaf_text(&self) -> String {
        match self {
            AttrValue::Null => String::new(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Float(f) => f.to_string(),
            AttrValue::String(s) => s.clone(),
            AttrValue::List(items) => items
                .iter()
                .map(AttrValue::leaf_text)
                .collect::<Vec<_>>()
                .join(" "),
            AttrValue::Group(map) => map
                .values()
                .map(AttrValue::leaf_text)
                .collect::<Vec<_>>()
                .join(":"),
        }
    }
}

impl From<&AttrValue> for serde_json::Value {
    fn from(value: &AttrValue) -> Self {
        match value {
            AttrValue::Null => serde_json::Value::Null,
            AttrValue::Bool(b) => (*b).into(),
            AttrValue::Int(i) => (*i).into(),
            AttrValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttrValue::String(s) => s.clone().into(),
            AttrValue::List(items) => {
                serde_json::Value::Array(items.iter().map(Into::into).collect())
            }
            AttrValue::Group(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

impl From<&serde_json::Value> for AttrValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttrValue::Null,
            serde_json::Value::Bool(b) => AttrValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttrValue::Int(i)
                } else {
                    AttrValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => AttrValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                AttrValue::List(items.iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => AttrValue::Group(
                map.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation kinds
// ---------------------------------------------------------------------------

/// Inclusive integer range with a UI stride hint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
    pub step: i64,
}

/// Inclusive float range with a UI stride hint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Validation kind of an attribute: what values it accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrKind {
    /// Free-form text.
    Text,
    /// A filesystem path, passed through to the external program verbatim.
    File,
    /// A boolean flag.
    Bool,
    /// An integer, optionally constrained to an inclusive range.
    Int { range: Option<IntRange> },
    /// A float, optionally constrained to an inclusive range. Integer values
    /// are accepted and treated as floats.
    Float { range: Option<FloatRange> },
    /// An enumerated choice set. `exclusive` accepts a single string from
    /// `values`; non-exclusive accepts a list of them.
    Choice { values: Vec<String>, exclusive: bool },
    /// A homogeneous list of a child descriptor.
    List { element: Box<AttrDesc> },
    /// A fixed set of named child descriptors.
    Group { fields: Vec<AttrDesc> },
}

impl AttrKind {
    fn expected(&self) -> &'static str {
        match self {
            AttrKind::Text => "text",
            AttrKind::File => "file path",
            AttrKind::Bool => "bool",
            AttrKind::Int { .. } => "int",
            AttrKind::Float { .. } => "float",
            AttrKind::Choice { exclusive: true, .. } => "choice",
            AttrKind::Choice { exclusive: false, .. } => "choice list",
            AttrKind::List { .. } => "list",
            AttrKind::Group { .. } => "group",
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// A single declared parameter of a node type.
///
/// The name is fixed at construction. `uid_levels` selects the identity
/// levels this attribute participates in: an empty set means the value never
/// affects cache identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrDesc {
    name: String,
    kind: AttrKind,
    default: AttrValue,
    uid_levels: BTreeSet<u8>,
    group: String,
}

impl AttrDesc {
    /// Declares an attribute. The default must satisfy the kind's validation;
    /// a `Null` default for a list becomes the empty list, and for a group is
    /// built from the field defaults.
    pub fn new(
        name: impl Into<String>,
        kind: AttrKind,
        default: AttrValue,
        uid_levels: impl IntoIterator<Item = u8>,
    ) -> Result<Self, AttributeError> {
        let default = match (&kind, default) {
            (AttrKind::List { .. }, AttrValue::Null) => AttrValue::List(Vec::new()),
            (AttrKind::Group { fields }, AttrValue::Null) => AttrValue::Group(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), f.default.clone()))
                    .collect(),
            ),
            (_, d) => d,
        };
        let desc = Self {
            name: name.into(),
            kind,
            default,
            uid_levels: uid_levels.into_iter().collect(),
            group: "allParams".to_string(),
        };
        desc.validate(&desc.default)?;
        Ok(desc)
    }

    /// Overrides the command-variable group this attribute's flag is
    /// accumulated into (defaults to `allParams`).
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &AttrKind {
        &self.kind
    }

    pub fn uid_levels(&self) -> &BTreeSet<u8> {
        &self.uid_levels
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns a fresh copy of the default value.
    pub fn default_value(&self) -> AttrValue {
        self.default.clone()
    }

    /// Checks `value` against this descriptor, recursing into lists and
    /// groups. `Null` is accepted everywhere as "unset".
    pub fn validate(&self, value: &AttrValue) -> Result<(), AttributeError> {
        if value.is_null() {
            return Ok(());
        }
        let mismatch = || AttributeError::KindMismatch {
            name: self.name.clone(),
            expected: self.kind.expected(),
            found: value.kind_name(),
        };
        match (&self.kind, value) {
            (AttrKind::Text, AttrValue::String(_)) => Ok(()),
            (AttrKind::File, AttrValue::String(_)) => Ok(()),
            (AttrKind::Bool, AttrValue::Bool(_)) => Ok(()),
            (AttrKind::Int { range }, AttrValue::Int(i)) => match range {
                Some(r) if *i < r.min || *i > r.max => Err(AttributeError::OutOfRange {
                    name: self.name.clone(),
                    value: i.to_string(),
                    min: r.min.to_string(),
                    max: r.max.to_string(),
                }),
                _ => Ok(()),
            },
            (AttrKind::Float { range }, AttrValue::Float(_) | AttrValue::Int(_)) => {
                let f = match value {
                    AttrValue::Float(f) => *f,
                    AttrValue::Int(i) => *i as f64,
                    _ => unreachable!(),
                };
                match range {
                    Some(r) if f < r.min || f > r.max => Err(AttributeError::OutOfRange {
                        name: self.name.clone(),
                        value: f.to_string(),
                        min: r.min.to_string(),
                        max: r.max.to_string(),
                    }),
                    _ => Ok(()),
                }
            }
            (AttrKind::Choice { values, exclusive: true }, AttrValue::String(s)) => {
                if values.contains(s) {
                    Ok(())
                } else {
                    Err(AttributeError::UnknownChoice {
                        name: self.name.clone(),
                        value: s.clone(),
                    })
                }
            }
            (AttrKind::Choice { values, exclusive: false }, AttrValue::List(items)) => {
                for item in items {
                    match item {
                        AttrValue::String(s) if values.contains(s) => {}
                        AttrValue::String(s) => {
                            return Err(AttributeError::UnknownChoice {
                                name: self.name.clone(),
                                value: s.clone(),
                            })
                        }
                        other => {
                            return Err(AttributeError::KindMismatch {
                                name: self.name.clone(),
                                expected: "choice",
                                found: other.kind_name(),
                            })
                        }
                    }
                }
                Ok(())
            }
            (AttrKind::List { element }, AttrValue::List(items)) => {
                for item in items {
                    element.validate(item)?;
                }
                Ok(())
            }
            (AttrKind::Group { fields }, AttrValue::Group(map)) => {
                for field in fields {
                    match map.get(&field.name) {
                        Some(v) => field.validate(v)?,
                        None => {
                            return Err(AttributeError::MissingField {
                                name: self.name.clone(),
                                field: field.name.clone(),
                            })
                        }
                    }
                }
                if let Some(extra) = map.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
                    return Err(AttributeError::UnknownField {
                        name: self.name.clone(),
                        field: extra.clone(),
                    });
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }

    /// Appends the canonical serialization of `value` to `out`.
    ///
    /// Lists contribute every element in order; groups contribute every
    /// declared field in declared order, prefixed with the field name. This
    /// is the exact byte stream identity hashing consumes, so it must stay
    /// stable across releases.
    pub fn canonical(&self, value: &AttrValue, out: &mut String) {
        match (&self.kind, value) {
            (_, AttrValue::Null) => {}
            (AttrKind::List { element }, AttrValue::List(items)) => {
                for item in items {
                    element.canonical(item, out);
                    out.push(SEP);
                }
            }
            (AttrKind::Group { fields }, AttrValue::Group(map)) => {
                for field in fields {
                    out.push_str(&field.name);
                    out.push(SEP);
                    if let Some(v) = map.get(&field.name) {
                        field.canonical(v, out);
                    }
                    out.push(SEP);
                }
            }
            (_, v) => out.push_str(&v.leaf_text()),
        }
    }

    /// Renders `value` as the flat text used in command variables: lists are
    /// space-joined, group fields colon-joined.
    pub fn display_text(&self, value: &AttrValue) -> String {
        value.leaf_text()
    }
}
