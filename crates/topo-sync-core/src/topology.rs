//! Topology service seam
//!
//! The pipeline only needs two read queries from the topology service; the
//! HTTP implementation lives in `topo-sync-client`.

use crate::error::TopologyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Organization as returned by the organization query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationEntry {
    /// Display name (the organization code changes refer to)
    #[serde(default)]
    pub name: Option<String>,
    /// Unique identifier
    #[serde(rename = "uniqueId", default)]
    pub unique_id: Option<String>,
}

impl OrganizationEntry {
    /// Entry with both fields present
    #[must_use]
    pub fn new(name: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            unique_id: Some(unique_id.into()),
        }
    }
}

/// Service or component node in the topology graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyElement {
    /// Internal id used to address updates
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<String>,
    /// Unique identifier
    #[serde(rename = "uniqueId", default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Entity types
    #[serde(rename = "entityTypes", default, skip_serializing_if = "Option::is_none")]
    pub entity_types: Option<Vec<String>>,
    /// Match tokens
    #[serde(rename = "matchTokens", default, skip_serializing_if = "Option::is_none")]
    pub match_tokens: Option<Vec<String>>,
    /// Unique identifier of the owning organization
    #[serde(rename = "opco", alias = "organization", default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

/// Read access to the topology service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopologyApi: Send + Sync {
    /// Every organization entity (name and unique identifier only)
    async fn fetch_organizations(&self) -> Result<Vec<OrganizationEntry>, TopologyError>;

    /// Every element whose name equals `name`
    async fn fetch_elements_by_name(&self, name: &str) -> Result<Vec<TopologyElement>, TopologyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_reads_wire_names() {
        let element: TopologyElement = serde_json::from_value(json!({
            "_id": "abc",
            "uniqueId": "svc-1",
            "name": "Portal",
            "entityTypes": ["service"],
            "matchTokens": ["svc-1", "portal"],
            "opco": "org-nl"
        }))
        .unwrap();
        assert_eq!(element.internal_id.as_deref(), Some("abc"));
        assert_eq!(element.organization.as_deref(), Some("org-nl"));
        assert_eq!(element.match_tokens.map(|t| t.len()), Some(2));
    }

    #[test]
    fn element_tolerates_missing_fields() {
        let element: TopologyElement = serde_json::from_value(json!({"name": "Portal"})).unwrap();
        assert!(element.unique_id.is_none());
        assert!(element.organization.is_none());
    }

    #[test]
    fn organization_entry_reads_wire_names() {
        let entry: OrganizationEntry =
            serde_json::from_value(json!({"name": "NL", "uniqueId": "org-nl"})).unwrap();
        assert_eq!(entry, OrganizationEntry::new("NL", "org-nl"));
    }
}
