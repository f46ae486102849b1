//! Graph payloads
//!
//! - [`ChangeRecord`]: one change-management entry, an ordered attribute bag
//! - [`ElementUpdate`]: change status written onto an existing topology element
//! - [`Relation`]: directed `has` edge into a change
//! - [`Vertex`]: everything the sink frames as a vertex

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entity type of change vertices
pub const CHANGE_ENTITY_TYPE: &str = "change";

/// Edge type linking organizations and services to changes
pub const HAS_EDGE_TYPE: &str = "has";

/// Attribute keys the pipeline writes onto a change
pub mod keys {
    /// Synthetic identity
    pub const UNIQUE_ID: &str = "uniqueId";
    /// Entity types
    pub const ENTITY_TYPES: &str = "entityTypes";
    /// Match tokens
    pub const MATCH_TOKENS: &str = "matchTokens";
    /// Display name
    pub const NAME: &str = "name";
    /// Tags
    pub const TAGS: &str = "tags";
}

/// One change record
///
/// Attribute order from the source is preserved through to the sink. Every stage
/// takes the record by value and hands back a rebuilt one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeRecord(Map<String, Value>);

impl ChangeRecord {
    /// Wrap an attribute map
    #[inline]
    #[must_use]
    pub fn from_map(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    /// Borrow the attributes
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwrap into the attribute map
    #[inline]
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Raw attribute value
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Attribute value when it is text
    #[inline]
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Attribute value when it is non-empty text
    #[inline]
    #[must_use]
    pub fn non_empty_text(&self, key: &str) -> Option<&str> {
        self.text(key).filter(|s| !s.is_empty())
    }

    /// Rebuild with one attribute set
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Synthetic identity, once normalized
    #[inline]
    #[must_use]
    pub fn unique_id(&self) -> Option<&str> {
        self.text(keys::UNIQUE_ID)
    }

    /// Tags, once reconciled
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.0
            .get(keys::TAGS)
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for ChangeRecord {
    fn from(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }
}

/// Change status written onto a topology element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUpdate {
    /// Element identity
    pub unique_id: String,
    /// Status of the change affecting the element
    pub change: Option<String>,
    /// Entity types, re-asserted as found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_types: Option<Vec<String>>,
    /// Match tokens, re-asserted as found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_tokens: Option<Vec<String>>,
}

/// Directed edge into a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Organization or topology element identity
    #[serde(rename = "_fromUniqueId")]
    pub from_unique_id: String,
    /// Change identity
    #[serde(rename = "_toUniqueId")]
    pub to_unique_id: String,
    /// Edge type
    #[serde(rename = "_edgeType")]
    pub edge_type: String,
}

impl Relation {
    /// `has` edge from `from` to `change`
    #[must_use]
    pub fn has(from: impl Into<String>, change: impl Into<String>) -> Self {
        Self {
            from_unique_id: from.into(),
            to_unique_id: change.into(),
            edge_type: HAS_EDGE_TYPE.to_string(),
        }
    }
}

/// Payload framed as a vertex
#[derive(Debug, Clone, PartialEq)]
pub enum Vertex {
    /// New or refreshed change, sent to the resources endpoint
    Change(ChangeRecord),
    /// Existing topology element, addressed by its internal id
    ElementUpdate {
        /// Internal id of the element in the topology service
        element_id: String,
        /// Fields to write
        update: ElementUpdate,
    },
}

impl Vertex {
    /// JSON body of the vertex
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Change(record) => serde_json::to_value(record),
            Self::ElementUpdate { update, .. } => serde_json::to_value(update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn relation_wire_names() {
        let relation = Relation::has("org-1", "CHG_1");
        assert_eq!(
            serde_json::to_value(&relation).unwrap(),
            json!({"_fromUniqueId": "org-1", "_toUniqueId": "CHG_1", "_edgeType": "has"})
        );
    }

    #[test]
    fn element_update_omits_absent_metadata() {
        let update = ElementUpdate {
            unique_id: "svc-1".to_string(),
            change: Some("Scheduled".to_string()),
            entity_types: None,
            match_tokens: Some(vec!["svc-1".to_string()]),
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"uniqueId": "svc-1", "change": "Scheduled", "matchTokens": ["svc-1"]})
        );
    }

    #[test]
    fn record_keeps_source_order() {
        let record: ChangeRecord = serde_json::from_str(r#"{"b": 1, "a": 2, "c": 3}"#).unwrap();
        let record = record.with("uniqueId", "CHG_1");
        let keys: Vec<&String> = record.attributes().keys().collect();
        assert_eq!(keys, ["b", "a", "c", "uniqueId"]);
    }

    #[test]
    fn text_accessors() {
        let record = ChangeRecord::default()
            .with("title", "")
            .with("count", 3)
            .with("name", "Upgrade");
        assert_eq!(record.text("title"), Some(""));
        assert_eq!(record.non_empty_text("title"), None);
        assert_eq!(record.text("count"), None);
        assert_eq!(record.non_empty_text("name"), Some("Upgrade"));
    }

    #[test]
    fn vertex_json_is_the_payload() {
        let record = ChangeRecord::default().with("uniqueId", "CHG_1");
        let vertex = Vertex::Change(record);
        assert_eq!(vertex.to_json().unwrap(), json!({"uniqueId": "CHG_1"}));
    }
}
