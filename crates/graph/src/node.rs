//! Node instances.
//!
//! A [`Node`] binds a registered [`NodeType`] to concrete attribute values.
//! Everything derived from those values — identity hashes, the private cache
//! folder, command variables, resolved outputs, chunk ranges — is recomputed
//! from the live values on demand, so an upstream edit can never leave a
//! stale derivation behind.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::attribute::{AttrDesc, AttrValue};
use crate::chunk::ChunkRange;
use crate::descriptor::NodeType;
use crate::errors::{NodeError, SizeError};
use crate::registry::NodeTypeRegistry;
use crate::template;
use crate::uid::derive_uid;

static NULL: AttrValue = AttrValue::Null;

pub struct Node {
    node_type: Arc<NodeType>,
    inputs: HashMap<String, AttrValue>,
    outputs: HashMap<String, AttrValue>,
    uids: BTreeMap<u8, String>,
    cmd_vars: HashMap<String, String>,
}

impl Node {
    /// Creates an instance with every input at its declared default. Outputs
    /// keep their unresolved templates until [`Node::update_internals`] runs.
    pub fn new(node_type: Arc<NodeType>) -> Self {
        let inputs = node_type
            .inputs()
            .iter()
            .map(|d| (d.name().to_string(), d.default_value()))
            .collect();
        let outputs = node_type
            .outputs()
            .iter()
            .map(|d| (d.name().to_string(), d.default_value()))
            .collect();
        Self {
            node_type,
            inputs,
            outputs,
            uids: BTreeMap::new(),
            cmd_vars: HashMap::new(),
        }
    }

    pub fn node_type(&self) -> &Arc<NodeType> {
        &self.node_type
    }

    /// Current value of a declared input or output.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.inputs.get(name).or_else(|| self.outputs.get(name))
    }

    /// Binds an input attribute, validating against its descriptor.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: AttrValue,
    ) -> Result<(), NodeError> {
        if self.node_type.output(name).is_some() {
            return Err(NodeError::OutputNotSettable { name: name.to_string() });
        }
        let desc = self
            .node_type
            .input(name)
            .ok_or_else(|| NodeError::UnknownAttribute { name: name.to_string() })?;
        desc.validate(&value)?;
        self.inputs.insert(name.to_string(), value);
        Ok(())
    }

    fn identity_attrs(&self) -> impl Iterator<Item = (&AttrDesc, &AttrValue)> {
        self.node_type
            .inputs()
            .iter()
            .map(|d| (d, self.inputs.get(d.name()).unwrap_or(&NULL)))
    }

    /// Identity hash at `level`, derived live from the current input values.
    pub fn uid(&self, level: u8) -> String {
        derive_uid(self.node_type.type_name(), self.identity_attrs(), level)
    }

    /// The level-0 identity hash: the node's cache key.
    pub fn identity_hash(&self) -> String {
        self.uid(0)
    }

    /// The node's private output folder under `cache_root`. Pure path
    /// composition; nothing is created on disk.
    pub fn private_folder(&self, cache_root: &Path) -> PathBuf {
        cache_root.join(self.identity_hash())
    }

    /// Number of work items, resolved from the current values of the size
    /// rule's designated inputs.
    pub fn size(&self) -> Result<usize, SizeError> {
        self.node_type
            .size_rule()
            .resolve(|name| self.inputs.get(name))
    }

    /// The parallel chunk split for the current size. Non-parallelized nodes
    /// are a single full-range chunk.
    pub fn chunks(&self) -> Result<Vec<ChunkRange>, SizeError> {
        let size = self.size()?;
        Ok(match self.node_type.parallelization() {
            Some(p) => p.ranges(size),
            None => vec![ChunkRange::full(size)],
        })
    }

    /// Recomputes identity hashes and command variables, and resolves output
    /// attribute templates against them.
    ///
    /// Call after mutating inputs and before resolving commands. Per-input
    /// variables are `{name}` (the `--name value` flag), `{nameValue}` (the
    /// bare value); flags of non-empty attributes accumulate into their
    /// declared group variable (`{allParams}` by default). `{cache}`,
    /// `{nodeType}`, `{uid<level>}` and `{folder}` are always present.
    pub fn update_internals(&mut self, cache_root: &Path) -> Result<(), NodeError> {
        let mut levels: BTreeSet<u8> = BTreeSet::from([0]);
        for desc in self.node_type.inputs() {
            levels.extend(desc.uid_levels().iter().copied());
        }
        let uids: BTreeMap<u8, String> = levels.into_iter().map(|l| (l, self.uid(l))).collect();

        let mut vars = HashMap::new();
        vars.insert("cache".to_string(), cache_root.display().to_string());
        vars.insert(
            "nodeType".to_string(),
            self.node_type.type_name().as_str().to_string(),
        );
        for (level, uid) in &uids {
            vars.insert(format!("uid{level}"), uid.clone());
        }
        vars.insert(
            "folder".to_string(),
            cache_root.join(&uids[&0]).display().to_string(),
        );

        // Every declared group gets a variable even when no attribute fills
        // it, so `{allParams}` expands on a node whose values are all unset.
        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        for desc in self.node_type.inputs() {
            let value = self.inputs.get(desc.name()).unwrap_or(&NULL);
            let text = desc.display_text(value);
            let flag = format!("--{} {}", desc.name(), text);
            vars.insert(format!("{}Value", desc.name()), text.clone());
            let group = groups.entry(desc.group().to_string()).or_default();
            if !text.is_empty() {
                group.push(flag.clone());
            }
            vars.insert(desc.name().to_string(), flag);
        }

        let mut resolved_outputs = HashMap::new();
        for desc in self.node_type.outputs() {
            let resolved = match desc.default_value() {
                AttrValue::String(tpl) => AttrValue::String(template::expand(&tpl, &vars)?),
                other => other,
            };
            let text = desc.display_text(&resolved);
            let flag = format!("--{} {}", desc.name(), text);
            vars.insert(format!("{}Value", desc.name()), text.clone());
            let group = groups.entry(desc.group().to_string()).or_default();
            if !text.is_empty() {
                group.push(flag.clone());
            }
            vars.insert(desc.name().to_string(), flag);
            resolved_outputs.insert(desc.name().to_string(), resolved);
        }

        for (group, flags) in groups {
            vars.insert(group, flags.join(" "));
        }

        self.outputs = resolved_outputs;
        self.uids = uids;
        self.cmd_vars = vars;
        Ok(())
    }

    /// Command variables from the last [`Node::update_internals`] run.
    pub fn cmd_vars(&self) -> &HashMap<String, String> {
        &self.cmd_vars
    }

    /// Serializes the cache-relevant instance state: type, package of
    /// origin, and every input bound away from its default.
    pub fn to_document(&self) -> serde_json::Value {
        let mut attributes = serde_json::Map::new();
        for desc in self.node_type.inputs() {
            let value = self.inputs.get(desc.name()).unwrap_or(&NULL);
            if !value.is_null() && *value != desc.default_value() {
                attributes.insert(desc.name().to_string(), value.into());
            }
        }
        serde_json::json!({
            "nodeType": self.node_type.type_name().as_str(),
            "packageName": self.node_type.package_name().map(|p| p.as_str()),
            "packageVersion": self.node_type.package_version().map(|v| v.as_str()),
            "attributes": attributes,
        })
    }
}

/// Builds a node of `type_name` from the registry and binds `attributes`.
///
/// With `skip_invalid`, bindings that reference unknown attributes or fail
/// validation are logged and dropped instead of failing the whole
/// construction — used when re-opening documents written against a newer
/// descriptor revision than the loaded one.
pub fn node_factory(
    registry: &NodeTypeRegistry,
    type_name: &str,
    attributes: HashMap<String, AttrValue>,
    skip_invalid: bool,
) -> Result<Node, NodeError> {
    let node_type = registry
        .lookup(type_name)
        .map_err(|_| NodeError::UnknownNodeType { name: type_name.to_string() })?;
    let mut node = Node::new(node_type);
    for (name, value) in attributes {
        match node.set_attribute(&name, value) {
            Ok(()) => {}
            Err(err) if skip_invalid => {
                tracing::info!(attribute = %name, %err, "skipping invalid attribute binding");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrKind;
    use crate::chunk::Parallelization;
    use crate::identifiers::TypeName;
    use crate::size::SizeRule;

    fn match_type() -> Arc<NodeType> {
        Arc::new(
            NodeType::new(
                TypeName::new("Match").unwrap(),
                "match {allParams}",
                vec![
                    AttrDesc::new("input", AttrKind::File, AttrValue::String("".into()), [0])
                        .unwrap(),
                    AttrDesc::new("verbose", AttrKind::Bool, AttrValue::Bool(false), []).unwrap(),
                    AttrDesc::new(
                        "views",
                        AttrKind::List {
                            element: Box::new(
                                AttrDesc::new(
                                    "view",
                                    AttrKind::File,
                                    AttrValue::String("".into()),
                                    [0],
                                )
                                .unwrap(),
                            ),
                        },
                        AttrValue::Null,
                        [0],
                    )
                    .unwrap(),
                ],
                vec![AttrDesc::new(
                    "output",
                    AttrKind::File,
                    AttrValue::String("{folder}/matches.txt".into()),
                    [],
                )
                .unwrap()],
                SizeRule::Dynamic { input: "views".into() },
                Some(Parallelization { block_size: 2 }),
            )
            .unwrap(),
        )
    }

    fn views(n: usize) -> AttrValue {
        AttrValue::List((0..n).map(|i| AttrValue::String(format!("/v{i}"))).collect())
    }

    #[test]
    fn instances_start_at_declared_defaults() {
        let node = Node::new(match_type());
        assert_eq!(node.attribute("verbose"), Some(&AttrValue::Bool(false)));
        assert_eq!(node.attribute("views"), Some(&AttrValue::List(vec![])));
        assert!(node.attribute("missing").is_none());
    }

    #[test]
    fn outputs_cannot_be_bound_directly() {
        let mut node = Node::new(match_type());
        assert!(matches!(
            node.set_attribute("output", AttrValue::String("/x".into())),
            Err(NodeError::OutputNotSettable { .. })
        ));
        assert!(matches!(
            node.set_attribute("nope", AttrValue::Null),
            Err(NodeError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn identity_ignores_irrelevant_attributes() {
        let mut a = Node::new(match_type());
        let mut b = Node::new(match_type());
        a.set_attribute("input", AttrValue::String("/data".into())).unwrap();
        b.set_attribute("input", AttrValue::String("/data".into())).unwrap();
        b.set_attribute("verbose", AttrValue::Bool(true)).unwrap();
        assert_eq!(a.identity_hash(), b.identity_hash());

        b.set_attribute("input", AttrValue::String("/other".into())).unwrap();
        assert_ne!(a.identity_hash(), b.identity_hash());
    }

    #[test]
    fn update_internals_resolves_outputs_into_the_private_folder() {
        let mut node = Node::new(match_type());
        node.set_attribute("input", AttrValue::String("/data/set".into())).unwrap();
        node.update_internals(Path::new("/cache")).unwrap();

        let folder = node.private_folder(Path::new("/cache"));
        assert_eq!(folder, Path::new("/cache").join(node.identity_hash()));

        let resolved = node.attribute("output").unwrap();
        assert_eq!(
            resolved,
            &AttrValue::String(format!("{}/matches.txt", folder.display()))
        );

        let all_params = &node.cmd_vars()["allParams"];
        assert!(all_params.contains("--input /data/set"));
        assert!(all_params.contains("--output"));
    }

    #[test]
    fn size_and_chunks_follow_live_inputs() {
        let mut node = Node::new(match_type());
        assert_eq!(node.size(), Ok(0));

        node.set_attribute("views", views(5)).unwrap();
        assert_eq!(node.size(), Ok(5));
        let chunks = node.chunks().unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 1);

        node.set_attribute("views", views(2)).unwrap();
        assert_eq!(node.chunks().unwrap().len(), 1);
    }

    #[test]
    fn factory_round_trips_a_document() {
        let mut registry = NodeTypeRegistry::new();
        registry.register(match_type()).unwrap();

        let mut node = Node::new(match_type());
        node.set_attribute("input", AttrValue::String("/data".into())).unwrap();
        let doc = node.to_document();
        assert_eq!(doc["nodeType"], "Match");
        assert_eq!(doc["attributes"]["input"], "/data");
        assert!(doc["attributes"].get("verbose").is_none());

        let attributes: HashMap<String, AttrValue> = doc["attributes"]
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.into()))
            .collect();
        let rebuilt = node_factory(&registry, "Match", attributes, false).unwrap();
        assert_eq!(rebuilt.identity_hash(), node.identity_hash());
    }

    #[test]
    fn factory_rejects_unknown_types_and_skips_invalid_bindings() {
        let mut registry = NodeTypeRegistry::new();
        registry.register(match_type()).unwrap();

        assert!(matches!(
            node_factory(&registry, "Gone", HashMap::new(), false),
            Err(NodeError::UnknownNodeType { .. })
        ));

        let mut attributes = HashMap::new();
        attributes.insert("input".to_string(), AttrValue::String("/data".into()));
        attributes.insert("bogus".to_string(), AttrValue::Int(1));
        assert!(node_factory(&registry, "Match", attributes.clone(), false).is_err());

        let node = node_factory(&registry, "Match", attributes, true).unwrap();
        assert_eq!(node.attribute("input"), Some(&AttrValue::String("/data".into())));
    }
}
