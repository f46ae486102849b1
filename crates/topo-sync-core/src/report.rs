//! Run summary

use serde::Serialize;

/// Counters collected over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records found in the export
    pub records_read: usize,
    /// Records dropped during extraction
    pub extraction_skipped: usize,
    /// Changes whose status is not of interest
    pub skipped_status: usize,
    /// Changes without a title
    pub skipped_missing_title: usize,
    /// Changes without affected services
    pub skipped_missing_services: usize,
    /// Changes linked to their organizations
    pub broadcast_changes: usize,
    /// Changes linked to named services
    pub targeted_changes: usize,
    /// Organization codes with no index entry
    pub dropped_organizations: usize,
    /// Affected services not found in topology
    pub unresolved_services: usize,
    /// Topology elements lacking an organization, identity or internal id
    pub incomplete_elements: usize,
    /// Change vertices written
    pub changes_emitted: usize,
    /// Element updates written
    pub element_updates: usize,
    /// Relations written
    pub relations_emitted: usize,
    /// Sink calls that failed
    pub sink_failures: usize,
}

impl SyncReport {
    /// Changes dropped before reaching the sink
    #[inline]
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.extraction_skipped
            + self.skipped_status
            + self.skipped_missing_title
            + self.skipped_missing_services
    }

    /// Emit the summary as one log event
    pub fn log_summary(&self) {
        tracing::info!(
            records = self.records_read,
            skipped = self.skipped(),
            broadcast = self.broadcast_changes,
            targeted = self.targeted_changes,
            changes = self.changes_emitted,
            element_updates = self.element_updates,
            relations = self.relations_emitted,
            dropped_organizations = self.dropped_organizations,
            unresolved_services = self.unresolved_services,
            sink_failures = self.sink_failures,
            "Sync run finished"
        );
    }
}
