//! Topology query client
//!
//! Both queries hit the topology endpoint with the same set of `_include_*`
//! switches turned off, so responses carry only the requested fields under
//! `_items`.

use crate::session::ApiSession;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use topo_sync_core::{OrganizationEntry, TopologyApi, TopologyElement, TopologyError};

/// Entity type of organization vertices
pub const ORGANIZATION_ENTITY_TYPE: &str = "opco";

const RESPONSE_SWITCHES: [(&str, &str); 6] = [
    ("_include_global_resources", "false"),
    ("_include_count", "false"),
    ("_include_status", "false"),
    ("_include_status_severity", "false"),
    ("_include_metadata", "false"),
    ("_return_composites", "false"),
];

const ORGANIZATION_FIELDS: [&str; 2] = ["uniqueId", "name"];

const ELEMENT_FIELDS: [&str; 5] = ["uniqueId", "matchTokens", "entityTypes", "name", "opco"];

#[derive(Deserialize)]
struct Page<T> {
    #[serde(rename = "_items")]
    items: Option<Vec<T>>,
}

/// Queries the topology service
#[derive(Debug, Clone)]
pub struct TopologyClient {
    http: reqwest::Client,
    session: Arc<ApiSession>,
}

impl TopologyClient {
    /// Create client
    #[must_use]
    pub fn new(http: reqwest::Client, session: Arc<ApiSession>) -> Self {
        Self { http, session }
    }

    fn query(&self, fields: &[&str]) -> reqwest::RequestBuilder {
        let fields: Vec<(&str, &str)> = fields.iter().map(|f| ("_field", *f)).collect();
        let request = self
            .http
            .get(&self.session.endpoints().topology)
            .query(&fields)
            .query(&RESPONSE_SWITCHES);
        self.session.read(request)
    }

    fn organizations_request(&self) -> reqwest::RequestBuilder {
        self.query(&ORGANIZATION_FIELDS)
            .query(&[("_type", ORGANIZATION_ENTITY_TYPE)])
    }

    fn elements_request(&self, name: &str) -> reqwest::RequestBuilder {
        self.query(&ELEMENT_FIELDS)
            .query(&[("_filter", format!("name={name}"))])
    }

    async fn fetch_items<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<T>, TopologyError> {
        let response = request
            .send()
            .await
            .map_err(|e| TopologyError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TopologyError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(TopologyError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        parse_items(&body)
    }
}

#[async_trait]
impl TopologyApi for TopologyClient {
    async fn fetch_organizations(&self) -> Result<Vec<OrganizationEntry>, TopologyError> {
        self.fetch_items(self.organizations_request()).await
    }

    async fn fetch_elements_by_name(&self, name: &str) -> Result<Vec<TopologyElement>, TopologyError> {
        let elements: Vec<TopologyElement> = self.fetch_items(self.elements_request(name)).await?;
        tracing::debug!(service = %name, ?elements, "Topology elements for service");
        Ok(elements)
    }
}

/// Items of a list response
pub fn parse_items<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>, TopologyError> {
    let page: Page<T> =
        serde_json::from_slice(body).map_err(|e| TopologyError::Decode(e.to_string()))?;
    page.items.ok_or(TopologyError::MissingItems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_session;
    use pretty_assertions::assert_eq;

    fn client() -> TopologyClient {
        TopologyClient::new(reqwest::Client::new(), Arc::new(test_session()))
    }

    fn params(request: &reqwest::Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn organizations_query() {
        let request = client().organizations_request().build().unwrap();
        let params = params(&request);
        assert!(params.contains(&("_type".to_string(), "opco".to_string())));
        assert!(params.contains(&("_field".to_string(), "uniqueId".to_string())));
        assert!(params.contains(&("_field".to_string(), "name".to_string())));
        assert!(params.contains(&("_return_composites".to_string(), "false".to_string())));
        assert_eq!(
            request.url().path(),
            "/topology/resources"
        );
        assert_eq!(request.headers()["X-TenantID"], crate::DEFAULT_TENANT_ID);
    }

    #[test]
    fn elements_query_encodes_the_name() {
        let request = client().elements_request("TV & Radio").build().unwrap();
        let params = params(&request);
        assert!(params.contains(&("_filter".to_string(), "name=TV & Radio".to_string())));
        assert!(params.contains(&("_field".to_string(), "opco".to_string())));
        assert!(params.contains(&("_include_metadata".to_string(), "false".to_string())));
        assert!(request.url().query().unwrap().contains("_filter=name%3DTV+%26+Radio"));
    }

    #[test]
    fn parses_elements() {
        let body = br#"{"_items": [
            {"_id": "abc", "uniqueId": "svc-1", "name": "Portal", "opco": "org-nl",
             "entityTypes": ["service"], "matchTokens": ["svc-1"]}
        ]}"#;
        let elements: Vec<TopologyElement> = parse_items(body).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].internal_id.as_deref(), Some("abc"));
        assert_eq!(elements[0].organization.as_deref(), Some("org-nl"));
    }

    #[test]
    fn parses_organizations() {
        let body = br#"{"_items": [{"uniqueId": "org-nl", "name": "NL"}]}"#;
        let organizations: Vec<OrganizationEntry> = parse_items(body).unwrap();
        assert_eq!(organizations, vec![OrganizationEntry::new("NL", "org-nl")]);
    }

    #[test]
    fn missing_items() {
        let result: Result<Vec<OrganizationEntry>, _> = parse_items(br#"{"total": 0}"#);
        assert!(matches!(result, Err(TopologyError::MissingItems)));
        let result: Result<Vec<OrganizationEntry>, _> = parse_items(b"nope");
        assert!(matches!(result, Err(TopologyError::Decode(_))));
    }
}
