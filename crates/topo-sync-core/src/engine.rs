//! Reconciliation engine
//!
//! Turns normalized changes into graph emissions. For each change, in source order:
//!
//! 1. normalize, then drop it unless its status is of interest
//! 2. require a title, which becomes the vertex `name`
//! 3. resolve the affected organization codes through the [`OrganizationIndex`]
//! 4. require affected services, split them into tokens and tag the change
//! 5. emit the change vertex
//! 6. link it:
//!    - **broadcast**: a single token naming a broadcast indicator links every
//!      affected organization to the change
//!    - **targeted**: every token is looked up in topology; matching elements
//!      owned by an affected organization get the change status written onto
//!      them and are linked to the change
//!
//! Sink failures are logged and counted, never retried, and never stop the rest
//! of the change from being processed.

use crate::config::SyncConfig;
use crate::normalize::{NormalizedChange, Normalizer};
use crate::org_index::OrganizationIndex;
use crate::record::{keys, ChangeRecord, ElementUpdate, Relation, Vertex, CHANGE_ENTITY_TYPE};
use crate::report::SyncReport;
use crate::resolver::TopologyResolver;
use crate::sink::TopologySink;
use crate::topology::TopologyElement;
use serde_json::Value;
use std::sync::Arc;

/// Why a change was not synced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Status missing or not of interest
    StatusNotOfInterest,
    /// No title
    MissingTitle,
    /// No affected services
    MissingServices,
}

/// How a synced change was linked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    /// Organizations linked directly
    Broadcast,
    /// Resolved topology elements linked
    Targeted,
}

/// Result of processing one change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Nothing emitted
    Skipped(SkipReason),
    /// Vertex emitted (or attempted) and linked
    Synced {
        /// Change identity
        unique_id: String,
        /// Linking branch taken
        strategy: LinkStrategy,
    },
}

/// Reconciles changes against the topology graph
pub struct ReconciliationEngine {
    config: Arc<SyncConfig>,
    normalizer: Normalizer,
    organizations: Arc<OrganizationIndex>,
    resolver: TopologyResolver,
    sink: Arc<dyn TopologySink>,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("config", &self.config)
            .field("organizations", &self.organizations.len())
            .finish_non_exhaustive()
    }
}

impl ReconciliationEngine {
    /// Create engine for one run
    #[must_use]
    pub fn new(
        config: Arc<SyncConfig>,
        organizations: Arc<OrganizationIndex>,
        resolver: TopologyResolver,
        sink: Arc<dyn TopologySink>,
    ) -> Self {
        Self {
            normalizer: Normalizer::new(Arc::clone(&config)),
            config,
            organizations,
            resolver,
            sink,
        }
    }

    /// With a custom normalizer
    #[inline]
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Process every change in order
    pub async fn run(&self, records: Vec<ChangeRecord>, report: &mut SyncReport) {
        tracing::debug!(
            statuses = ?self.config.statuses_of_interest,
            "Processing changes with these statuses"
        );
        for record in records {
            match self.process(record, report).await {
                ChangeOutcome::Skipped(SkipReason::StatusNotOfInterest) => report.skipped_status += 1,
                ChangeOutcome::Skipped(SkipReason::MissingTitle) => report.skipped_missing_title += 1,
                ChangeOutcome::Skipped(SkipReason::MissingServices) => {
                    report.skipped_missing_services += 1;
                }
                ChangeOutcome::Synced {
                    strategy: LinkStrategy::Broadcast,
                    ..
                } => report.broadcast_changes += 1,
                ChangeOutcome::Synced {
                    strategy: LinkStrategy::Targeted,
                    ..
                } => report.targeted_changes += 1,
            }
        }
    }

    /// Process a single change
    pub async fn process(&self, record: ChangeRecord, report: &mut SyncReport) -> ChangeOutcome {
        let attributes = &self.config.attributes;
        let NormalizedChange { unique_id, record } = self.normalizer.normalize(record);

        let status = match record.text(&attributes.status) {
            Some(status) if self.config.is_status_of_interest(status) => status.to_string(),
            _ => {
                tracing::warn!(change = %unique_id, "Change status is not of interest, skipping");
                return ChangeOutcome::Skipped(SkipReason::StatusNotOfInterest);
            }
        };

        let Some(title) = record.text(&attributes.title).map(clean_title).filter(|t| !t.is_empty())
        else {
            tracing::error!(change = %unique_id, "Change has no title, skipping");
            return ChangeOutcome::Skipped(SkipReason::MissingTitle);
        };
        tracing::info!(change = %unique_id, title = %title, "Working on change");

        let codes = organization_codes(
            record.get(&attributes.affected_organizations),
            &self.config.separator,
        );
        tracing::info!(title = %title, count = codes.len(), "Change affects organization(s)");
        tracing::debug!(title = %title, ?codes, "Raw affected organizations");
        let organizations = self.resolve_organizations(&codes, &title, report);
        tracing::debug!(title = %title, ?organizations, "Affected organization ids");

        let Some(services_text) = record.non_empty_text(&attributes.affected_services) else {
            tracing::error!(title = %title, "Change has no affected services, it won't be processed");
            return ChangeOutcome::Skipped(SkipReason::MissingServices);
        };
        tracing::debug!(title = %title, services = %services_text, "Raw affected services");
        let services: Vec<String> = services_text
            .split(self.config.separator.as_str())
            .map(|s| s.trim().to_string())
            .collect();
        tracing::info!(title = %title, count = services.len(), "Change affects service(s)");

        let tags: Vec<&str> = std::iter::once(CHANGE_ENTITY_TYPE)
            .chain(services.iter().map(String::as_str).filter(|s| !s.is_empty()))
            .collect();
        let record = record
            .with(keys::NAME, title.clone())
            .with(keys::TAGS, tags);

        tracing::debug!(payload = ?record, "Change vertex");
        self.emit_change(record, &title, report).await;

        let strategy = match services.as_slice() {
            [only] if self.config.indicators.matches(only) => LinkStrategy::Broadcast,
            _ => LinkStrategy::Targeted,
        };
        match strategy {
            LinkStrategy::Broadcast => {
                tracing::info!(
                    title = %title,
                    indicator = %services[0],
                    ?organizations,
                    "Change affects a whole service class, linking organizations"
                );
                self.link_organizations(&unique_id, &organizations, &title, report)
                    .await;
            }
            LinkStrategy::Targeted => {
                self.link_services(&unique_id, &status, &services, &organizations, &title, report)
                    .await;
            }
        }

        ChangeOutcome::Synced { unique_id, strategy }
    }

    fn resolve_organizations(
        &self,
        codes: &[String],
        title: &str,
        report: &mut SyncReport,
    ) -> Vec<String> {
        let mut resolved = Vec::with_capacity(codes.len());
        for code in codes {
            match self.organizations.resolve(code) {
                Some(id) => resolved.push(id.to_string()),
                None => {
                    tracing::warn!(org = %code, title = %title, "No organization in topology for code");
                    report.dropped_organizations += 1;
                }
            }
        }
        resolved
    }

    async fn emit_change(&self, record: ChangeRecord, title: &str, report: &mut SyncReport) {
        match self.sink.emit_vertex(&Vertex::Change(record)).await {
            Ok(()) => {
                tracing::info!(title = %title, "Change sent");
                report.changes_emitted += 1;
            }
            Err(e) => {
                tracing::error!(title = %title, error = %e, "Error sending change");
                report.sink_failures += 1;
            }
        }
    }

    async fn link_organizations(
        &self,
        unique_id: &str,
        organizations: &[String],
        title: &str,
        report: &mut SyncReport,
    ) {
        for organization in organizations.iter().filter(|o| !o.is_empty()) {
            let relation = Relation::has(organization.as_str(), unique_id);
            self.emit_relation(&relation, organization, title, report).await;
        }
    }

    async fn link_services(
        &self,
        unique_id: &str,
        status: &str,
        services: &[String],
        organizations: &[String],
        title: &str,
        report: &mut SyncReport,
    ) {
        for service in services.iter().filter(|s| !s.is_empty()) {
            tracing::info!(service = %service, title = %title, "Looking for affected service");
            let elements = self.resolver.resolve(service).await;
            if elements.is_empty() {
                tracing::error!(service = %service, "Could not find affected service in topology");
                report.unresolved_services += 1;
                continue;
            }

            for element in &elements {
                let (Some(organization), Some(element_uid)) = (
                    element.organization.as_deref().filter(|o| !o.is_empty()),
                    element.unique_id.as_deref().filter(|u| !u.is_empty()),
                ) else {
                    tracing::error!(
                        service = %service,
                        title = %title,
                        "Affected service has no organization or identity, won't link the change"
                    );
                    report.incomplete_elements += 1;
                    continue;
                };

                if !organizations.iter().any(|o| o == organization) {
                    tracing::debug!(
                        service = %service,
                        org = %organization,
                        "Element belongs to an unaffected organization"
                    );
                    continue;
                }

                tracing::info!(service = %service, org = %organization, title = %title, "Found affected service");
                self.update_element(element, element_uid, status, service, report)
                    .await;
                let relation = Relation::has(element_uid, unique_id);
                self.emit_relation(&relation, service, title, report).await;
            }
        }
    }

    async fn update_element(
        &self,
        element: &TopologyElement,
        element_uid: &str,
        status: &str,
        service: &str,
        report: &mut SyncReport,
    ) {
        let Some(element_id) = element.internal_id.clone() else {
            tracing::error!(service = %service, "Affected service has no internal id, cannot update it");
            report.incomplete_elements += 1;
            return;
        };

        let vertex = Vertex::ElementUpdate {
            element_id,
            update: ElementUpdate {
                unique_id: element_uid.to_string(),
                change: Some(status.to_string()),
                entity_types: element.entity_types.clone(),
                match_tokens: element.match_tokens.clone(),
            },
        };
        match self.sink.emit_vertex(&vertex).await {
            Ok(()) => {
                tracing::info!(service = %service, "Change status updated on affected service");
                report.element_updates += 1;
            }
            Err(e) => {
                tracing::error!(service = %service, error = %e, "Error updating change status");
                report.sink_failures += 1;
            }
        }
    }

    async fn emit_relation(
        &self,
        relation: &Relation,
        from: &str,
        title: &str,
        report: &mut SyncReport,
    ) {
        match self.sink.emit_relation(relation).await {
            Ok(()) => {
                tracing::info!(from = %from, title = %title, "Relation created");
                report.relations_emitted += 1;
            }
            Err(e) => {
                tracing::error!(from = %from, title = %title, error = %e, "Error creating relation");
                report.sink_failures += 1;
            }
        }
    }
}

/// Title as it appears on the vertex
fn clean_title(raw: &str) -> String {
    raw.trim().replace('\t', "")
}

/// Organization codes of a change, in source order
///
/// A JSON array is read element by element; text is split on `,` and the
/// separator.
fn organization_codes(value: Option<&Value>, separator: &str) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(text)) => text
            .split(',')
            .flat_map(|part| part.split(separator))
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect(),
        _ => {
            tracing::warn!("Change has no affected organizations");
            Vec::new()
        }
    }
}
