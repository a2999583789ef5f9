//! Write-once registries for node types and submitters.
//!
//! Both registries follow the same two-phase lifecycle: populated by a single
//! caller during startup, then shared read-only (typically behind an `Arc`)
//! with any number of graph-construction or evaluation workers. They are
//! explicit objects threaded to whoever needs lookup, not process globals.
//!
//! Duplicate registration is an error the composition root treats as fatal:
//! two plugins claiming one name is a packaging defect, and proceeding with
//! whichever happened to load second would silently change graph semantics.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::NodeType;
use crate::errors::RegistryError;
use crate::ports::Submitter;

/// Implemented by anything a [`Registry`] can hold: exposes the unique key
/// the item registers under.
pub trait Registered {
    fn key(&self) -> &str;
}

impl Registered for NodeType {
    fn key(&self) -> &str {
        self.type_name().as_str()
    }
}

impl Registered for dyn Submitter {
    fn key(&self) -> &str {
        self.name().as_str()
    }
}

/// Append-only name → item map. The first registration under a key wins;
/// later ones are rejected and the original is retained.
pub struct Registry<T: Registered + ?Sized> {
    items: HashMap<String, Arc<T>>,
}

/// Registry of node type descriptors, keyed by type name.
pub type NodeTypeRegistry = Registry<NodeType>;

/// Registry of submitter capabilities, keyed by submitter name.
pub type SubmitterRegistry = Registry<dyn Submitter>;

impl<T: Registered + ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self { items: HashMap::new() }
    }

    /// Registers `item` under its own key.
    pub fn register(&mut self, item: Arc<T>) -> Result<(), RegistryError> {
        let key = item.key().to_string();
        if self.items.contains_key(&key) {
            return Err(RegistryError::Duplicate { key });
        }
        self.items.insert(key, item);
        Ok(())
    }

    /// Returns the registered item or a typed not-found error.
    pub fn lookup(&self, key: &str) -> Result<Arc<T>, RegistryError> {
        self.items
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { key: key.to_string() })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Registered keys, sorted for stable listings.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.items.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Registered + ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
