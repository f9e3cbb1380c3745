//! Desired-state resource set

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Set of resources the caller wants to exist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resources indexed by address (kind.name)
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource; a later resource with the same address replaces the earlier one
    pub fn add(&mut self, resource: ResourceConfig) {
        if let Some(previous) = self.resources.insert(resource.address(), resource) {
            tracing::warn!("Resource {} declared twice, keeping the latest", previous.address());
        }
    }

    pub fn get(&self, kind: &str, name: &str) -> Option<&ResourceConfig> {
        self.resources.get(&address(kind, name))
    }

    pub fn contains_address(&self, address: &str) -> bool {
        self.resources.contains_key(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn by_kind(&self, kind: &str) -> Vec<&ResourceConfig> {
        self.resources.values().filter(|r| r.kind == kind).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl FromIterator<ResourceConfig> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = ResourceConfig>>(iter: I) -> Self {
        let mut set = Self::new();
        for resource in iter {
            set.add(resource);
        }
        set
    }
}

/// Desired configuration of a single managed object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource kind (e.g., "aliyun_dcdn_domain")
    pub kind: String,

    /// Local name, unique per kind
    pub name: String,

    /// Field values, checked against the driver's schema
    pub config: serde_json::Value,
}

impl ResourceConfig {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            config,
        }
    }

    /// Get the full resource address (kind.name)
    pub fn address(&self) -> String {
        address(&self.kind, &self.name)
    }
}

fn address(kind: &str, name: &str) -> String {
    format!("{}.{}", kind, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_addressing() {
        let set: ResourceSet = vec![
            ResourceConfig::new("aliyun_fc_version", "v1", json!({"service_name": "svc"})),
            ResourceConfig::new("aliyun_dcdn_domain", "www", json!({"domain_name": "example.com"})),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert!(set.contains_address("aliyun_fc_version.v1"));
        assert_eq!(
            set.get("aliyun_dcdn_domain", "www").unwrap().config["domain_name"],
            "example.com"
        );
        assert_eq!(set.by_kind("aliyun_fc_version").len(), 1);
    }

    #[test]
    fn test_duplicate_address_keeps_latest() {
        let mut set = ResourceSet::new();
        set.add(ResourceConfig::new("aliyun_fc_version", "v1", json!({"description": "a"})));
        set.add(ResourceConfig::new("aliyun_fc_version", "v1", json!({"description": "b"})));

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get("aliyun_fc_version", "v1").unwrap().config["description"],
            "b"
        );
    }
}
