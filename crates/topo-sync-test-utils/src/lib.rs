//! Testing utilities for the topo-sync workspace
//!
//! Shared fakes for the pipeline seams and fixtures for change records.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use topo_sync_core::{
    AttributeNames, BroadcastIndicators, ChangeRecord, ElementUpdate, ObjectSource,
    OrganizationEntry, Relation, SinkError, SourceError, SyncConfig, TopologyApi,
    TopologyElement, TopologyError, TopologySink, Vertex,
};

pub const FRONT_END_INDICATOR: &str = "APIGW FE";
pub const SET_TOP_BOX_INDICATOR: &str = "STBs";

pub const START_ATTR: &str = "Impl. Start (UTC)";
pub const SERVICES_ATTR: &str = "Affected Services";
pub const ORGS_ATTR: &str = "Affected OpCo's";
pub const TITLE_ATTR: &str = "Change Title";
pub const STATUS_ATTR: &str = "Change Status";

/// Configuration matching the fixtures below
pub fn sample_config() -> SyncConfig {
    SyncConfig::new(
        "|",
        BroadcastIndicators {
            front_end: FRONT_END_INDICATOR.to_string(),
            set_top_box: SET_TOP_BOX_INDICATOR.to_string(),
        },
        AttributeNames {
            start_time: START_ATTR.to_string(),
            affected_services: SERVICES_ATTR.to_string(),
            affected_organizations: ORGS_ATTR.to_string(),
            title: TITLE_ATTR.to_string(),
            status: STATUS_ATTR.to_string(),
        },
    )
    .with_statuses("Scheduled,Implemented")
}

/// Builder for raw change records
#[derive(Debug, Clone, Default)]
pub struct ChangeFixture {
    attributes: Map<String, Value>,
}

impl ChangeFixture {
    /// Scheduled change with a title and start time
    pub fn scheduled(title: &str) -> Self {
        Self::default()
            .attr(TITLE_ATTR, title)
            .attr(STATUS_ATTR, "Scheduled")
            .attr(START_ATTR, "2023-11-14T22:13:20Z")
    }

    pub fn attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.attributes.remove(key);
        self
    }

    pub fn services(self, services: &str) -> Self {
        self.attr(SERVICES_ATTR, services)
    }

    pub fn organizations(self, codes: &[&str]) -> Self {
        self.attr(ORGS_ATTR, json!(codes))
    }

    pub fn raw(self) -> Map<String, Value> {
        self.attributes
    }

    pub fn build(self) -> ChangeRecord {
        ChangeRecord::from_map(self.attributes)
    }
}

/// Topology element owned by `organization`
pub fn element(name: &str, unique_id: &str, organization: &str) -> TopologyElement {
    TopologyElement {
        internal_id: Some(format!("_{unique_id}")),
        unique_id: Some(unique_id.to_string()),
        name: Some(name.to_string()),
        entity_types: Some(vec!["service".to_string()]),
        match_tokens: Some(vec![unique_id.to_string()]),
        organization: Some(organization.to_string()),
    }
}

/// One call made to a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Vertex(Vertex),
    Relation(Relation),
}

/// Sink remembering every emission in order
#[derive(Debug, Default)]
pub struct RecordingSink {
    emissions: Mutex<Vec<Emission>>,
    fail_vertices: bool,
    fail_relations: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose vertex emissions are recorded but reported as failed
    pub fn failing_vertices() -> Self {
        Self {
            fail_vertices: true,
            ..Self::default()
        }
    }

    /// Sink whose relation emissions are recorded but reported as failed
    pub fn failing_relations() -> Self {
        Self {
            fail_relations: true,
            ..Self::default()
        }
    }

    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions.lock().clone()
    }

    pub fn changes(&self) -> Vec<ChangeRecord> {
        self.emissions
            .lock()
            .iter()
            .filter_map(|e| match e {
                Emission::Vertex(Vertex::Change(record)) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn element_updates(&self) -> Vec<(String, ElementUpdate)> {
        self.emissions
            .lock()
            .iter()
            .filter_map(|e| match e {
                Emission::Vertex(Vertex::ElementUpdate { element_id, update }) => {
                    Some((element_id.clone(), update.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn relations(&self) -> Vec<Relation> {
        self.emissions
            .lock()
            .iter()
            .filter_map(|e| match e {
                Emission::Relation(relation) => Some(relation.clone()),
                Emission::Vertex(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl TopologySink for RecordingSink {
    async fn emit_vertex(&self, vertex: &Vertex) -> Result<(), SinkError> {
        self.emissions.lock().push(Emission::Vertex(vertex.clone()));
        if self.fail_vertices {
            return Err(SinkError::Rejected {
                status: 500,
                body: "vertex rejected".to_string(),
            });
        }
        Ok(())
    }

    async fn emit_relation(&self, relation: &Relation) -> Result<(), SinkError> {
        self.emissions.lock().push(Emission::Relation(relation.clone()));
        if self.fail_relations {
            return Err(SinkError::Rejected {
                status: 500,
                body: "relation rejected".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory topology service
#[derive(Debug, Default)]
pub struct StaticTopology {
    organizations: Option<Vec<OrganizationEntry>>,
    elements: HashMap<String, Vec<TopologyElement>>,
    lookups: Mutex<Vec<String>>,
}

impl StaticTopology {
    /// Topology holding the given organizations (name, unique id)
    pub fn with_organizations(organizations: &[(&str, &str)]) -> Self {
        Self {
            organizations: Some(
                organizations
                    .iter()
                    .map(|(name, id)| OrganizationEntry::new(*name, *id))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Topology whose organization query fails
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn element(mut self, element: TopologyElement) -> Self {
        let name = element.name.clone().unwrap_or_default();
        self.elements.entry(name).or_default().push(element);
        self
    }

    /// Names looked up so far, in order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }
}

#[async_trait]
impl TopologyApi for StaticTopology {
    async fn fetch_organizations(&self) -> Result<Vec<OrganizationEntry>, TopologyError> {
        self.organizations.clone().ok_or(TopologyError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }

    async fn fetch_elements_by_name(&self, name: &str) -> Result<Vec<TopologyElement>, TopologyError> {
        self.lookups.lock().push(name.to_string());
        Ok(self.elements.get(name).cloned().unwrap_or_default())
    }
}

/// In-memory object store
#[derive(Debug, Default)]
pub struct MemorySource {
    objects: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, key: &str, data: impl Into<Vec<u8>>) -> Self {
        self.objects.insert(key.to_string(), data.into());
        self
    }

    /// Store `records` as a JSON export under `key`
    pub fn export(self, key: &str, records: Vec<Map<String, Value>>) -> Self {
        let body = Value::Array(records.into_iter().map(Value::Object).collect()).to_string();
        self.object(key, body)
    }
}

#[async_trait]
impl ObjectSource for MemorySource {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SourceError> {
        Ok(self
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, SourceError> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }
}

/// Log events seen while a [`LogCapture`] is installed
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    /// Capture every event of the current thread until the guard drops
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        (capture, tracing::subscriber::set_default(subscriber))
    }

    /// Messages logged at `level`, in order
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageVisitor::default();
        event.record(&mut message);
        self.events.lock().push((*event.metadata().level(), message.0));
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
