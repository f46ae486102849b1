//! Remote sink
//!
//! Change vertices go to the resources endpoint, element updates to the
//! topology endpoint addressed by the element's internal id, relations to the
//! references endpoint.

use crate::session::ApiSession;
use async_trait::async_trait;
use std::sync::Arc;
use topo_sync_core::{Relation, SinkError, TopologySink, Vertex};

/// Writes emissions to the topology service
#[derive(Debug, Clone)]
pub struct RemoteSink {
    http: reqwest::Client,
    session: Arc<ApiSession>,
}

impl RemoteSink {
    /// Create sink
    #[must_use]
    pub fn new(http: reqwest::Client, session: Arc<ApiSession>) -> Self {
        Self { http, session }
    }

    fn vertex_request(&self, vertex: &Vertex) -> Result<reqwest::RequestBuilder, SinkError> {
        let endpoints = self.session.endpoints();
        let url = match vertex {
            Vertex::Change(_) => endpoints.resources.clone(),
            Vertex::ElementUpdate { element_id, .. } => endpoints.element(element_id),
        };
        let body = vertex.to_json()?;
        Ok(self.session.write(self.http.post(url)).json(&body))
    }

    fn relation_request(&self, relation: &Relation) -> reqwest::RequestBuilder {
        self.session
            .write(self.http.post(&self.session.endpoints().references))
            .json(relation)
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<(), SinkError> {
    let response = request
        .send()
        .await
        .map_err(|e| SinkError::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        tracing::debug!(status = status.as_u16(), "Topology API accepted payload");
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(SinkError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl TopologySink for RemoteSink {
    async fn emit_vertex(&self, vertex: &Vertex) -> Result<(), SinkError> {
        send(self.vertex_request(vertex)?).await
    }

    async fn emit_relation(&self, relation: &Relation) -> Result<(), SinkError> {
        send(self.relation_request(relation)).await
    }
}
