//! Declared resources

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared properties of a resource, opaque to the engine.
///
/// A sorted map keeps serialization (and therefore checksums) stable.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// A resource the caller wants to exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Logical name, unique within a graph
    pub name: String,

    /// Kind tag selecting the provider adapter (e.g., "database.cluster")
    pub kind: String,

    /// Resource-specific configuration
    #[serde(default)]
    pub properties: Properties,

    /// Logical names that must be applied first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            properties: Properties::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Get a property value as a specific type
    pub fn get_property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let r = Resource::new("database", "database.cluster")
            .with_property("instances", json!(1))
            .depends_on("vpc");

        assert_eq!(r.name, "database");
        assert_eq!(r.depends_on, vec!["vpc"]);
        assert_eq!(r.get_property::<u32>("instances"), Some(1));
        assert_eq!(r.get_property::<String>("instances"), None);
    }

    #[test]
    fn test_deserialize_defaults() {
        let r: Resource =
            serde_json::from_value(json!({ "name": "vpc", "kind": "network.vpc" })).unwrap();
        assert!(r.properties.is_empty());
        assert!(r.depends_on.is_empty());
    }
}
