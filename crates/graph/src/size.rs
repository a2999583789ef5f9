//! Dynamic size resolution.
//!
//! A node's size is the number of discrete work items it covers, resolved
//! on demand from the *current* values of its designated inputs. It is never
//! memoized here: upstream graph edits may change an input after a size was
//! last computed, and a stale count would mis-chunk the dispatch.

use serde::{Deserialize, Serialize};

use crate::attribute::AttrValue;
use crate::errors::SizeError;

/// How a node type derives its size from a node instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizeRule {
    /// A constant size, independent of inputs.
    Fixed(usize),
    /// The item count of one designated input.
    Dynamic { input: String },
    /// The **sum** of the item counts of several designated inputs. An
    /// unset input contributes zero, so partially-wired nodes still resolve.
    MultiDynamic { inputs: Vec<String> },
}

impl Default for SizeRule {
    fn default() -> Self {
        SizeRule::Fixed(1)
    }
}

impl SizeRule {
    /// Names of the inputs this rule reads, for descriptor validation.
    pub fn designated_inputs(&self) -> &[String] {
        match self {
            SizeRule::Fixed(_) => &[],
            SizeRule::Dynamic { input } => std::slice::from_ref(input),
            SizeRule::MultiDynamic { inputs } => inputs,
        }
    }

    /// Resolves the size against `lookup`, which maps a designated input
    /// name to its current value (`None` if the instance has no such input).
    pub fn resolve<'a>(
        &self,
        lookup: impl Fn(&str) -> Option<&'a AttrValue>,
    ) -> Result<usize, SizeError> {
        match self {
            SizeRule::Fixed(n) => Ok(*n),
            SizeRule::Dynamic { input } => item_count(input, lookup(input)),
            SizeRule::MultiDynamic { inputs } => {
                let mut total = 0;
                for input in inputs {
                    total += item_count(input, lookup(input))?;
                }
                Ok(total)
            }
        }
    }
}

/// Item count of one designated input: unset contributes zero, a list
/// contributes its length, anything else is a configuration error — never
/// silently treated as empty.
fn item_count(name: &str, value: Option<&AttrValue>) -> Result<usize, SizeError> {
    match value {
        None => Err(SizeError::UnknownInput { name: name.to_string() }),
        Some(AttrValue::Null) => Ok(0),
        Some(AttrValue::List(items)) => Ok(items.len()),
        Some(other) => Err(SizeError::NotItemBearing {
            name: name.to_string(),
            kind: other.kind_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn list_of(n: usize) -> AttrValue {
        AttrValue::List((0..n).map(|i| AttrValue::Int(i as i64)).collect())
    }

    fn resolve(rule: &SizeRule, values: &HashMap<String, AttrValue>) -> Result<usize, SizeError> {
        rule.resolve(|name| values.get(name))
    }

    #[test]
    fn single_input_counts_its_items() {
        let rule = SizeRule::Dynamic { input: "views".into() };
        let mut values = HashMap::new();
        values.insert("views".to_string(), list_of(5));
        assert_eq!(resolve(&rule, &values), Ok(5));

        values.insert("views".to_string(), AttrValue::Null);
        assert_eq!(resolve(&rule, &values), Ok(0));
    }

    #[test]
    fn multi_input_sums_and_tracks_mutation() {
        let rule = SizeRule::MultiDynamic { inputs: vec!["a".into(), "b".into()] };
        let mut values = HashMap::new();
        values.insert("a".to_string(), list_of(3));
        values.insert("b".to_string(), list_of(4));
        assert_eq!(resolve(&rule, &values), Ok(7));

        // No memoization: the next resolution sees the new value.
        values.insert("a".to_string(), list_of(10));
        assert_eq!(resolve(&rule, &values), Ok(14));

        values.insert("b".to_string(), AttrValue::Null);
        assert_eq!(resolve(&rule, &values), Ok(10));
    }

    #[test]
    fn wrong_kind_is_a_configuration_error() {
        let rule = SizeRule::Dynamic { input: "views".into() };
        let mut values = HashMap::new();
        values.insert("views".to_string(), AttrValue::Int(5));
        assert_eq!(
            resolve(&rule, &values),
            Err(SizeError::NotItemBearing { name: "views".into(), kind: "int" })
        );
    }

    #[test]
    fn missing_input_is_reported() {
        let rule = SizeRule::Dynamic { input: "gone".into() };
        let values = HashMap::new();
        assert_eq!(
            resolve(&rule, &values),
            Err(SizeError::UnknownInput { name: "gone".into() })
        );
    }

    #[test]
    fn fixed_ignores_inputs() {
        assert_eq!(resolve(&SizeRule::Fixed(1), &HashMap::new()), Ok(1));
        assert_eq!(resolve(&SizeRule::default(), &HashMap::new()), Ok(1));
    }
}
