//! Context node handle for modules.
//!
//! Every module is bound to exactly one [`ContextNode`] — the DOM-like node
//! it operates on. The node is owned by the surrounding page or application;
//! modules hold a shared, read-only handle and never manage the node's
//! lifetime.
//!
//! A `ContextNode` is deliberately minimal: a node name plus a read-only
//! attribute map. It stands in for a markup element without pulling in any
//! document-query or binding machinery.
//!
//! # Example
//!
//! ```
//! use modular_rust_core::ContextNode;
//!
//! let node = ContextNode::new("section")
//!     .with_attribute("data-widget", "news-ticker")
//!     .with_attribute("id", "ticker-1");
//!
//! assert_eq!(node.name(), "section");
//! assert_eq!(node.attribute("data-widget"), Some("news-ticker"));
//! assert_eq!(node.attribute("missing"), None);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A handle to the DOM-like node a module is bound to.
///
/// Construction is the only way to populate a node; there are no mutating
/// accessors. Two modules may be handed the same node — the framework does
/// not enforce exclusivity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextNode {
    /// Node name (e.g. an element tag or a logical region name).
    name: String,

    /// Attribute map, sorted by key for stable serialization.
    attributes: BTreeMap<String, String>,
}

impl ContextNode {
    /// Create a new node with the given name and no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute, builder-style.
    ///
    /// Later values for the same key overwrite earlier ones.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an attribute value by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Whether the node carries the given attribute.
    #[must_use]
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Iterate over all attributes in key order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
