//! Batch pipeline
//!
//! One stateless pass over one export:
//!
//! ```text
//! ObjectSource → select root object → parse → extract
//!                                               ↓
//! TopologyApi → OrganizationIndex ──→ ReconciliationEngine → TopologySink
//! ```
//!
//! [`SyncPipeline::run`] does both halves. Callers that must prepare the
//! topology backends only after the export is in hand (for a fresh token) call
//! [`load_export`] first and hand its result to [`SyncPipeline::sync`].

use crate::config::SyncConfig;
use crate::engine::ReconciliationEngine;
use crate::error::{SyncError, SyncResult};
use crate::extract::extract_attributes;
use crate::normalize::Normalizer;
use crate::org_index::OrganizationIndex;
use crate::record::ChangeRecord;
use crate::report::SyncReport;
use crate::resolver::TopologyResolver;
use crate::sink::TopologySink;
use crate::source::{select_root_object, ObjectSource};
use crate::topology::TopologyApi;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Wires the seams together for one run
pub struct SyncPipeline {
    config: Arc<SyncConfig>,
    source: Arc<dyn ObjectSource>,
    topology: Arc<dyn TopologyApi>,
    sink: Arc<dyn TopologySink>,
    normalizer: Option<Normalizer>,
}

impl std::fmt::Debug for SyncPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncPipeline {
    /// Create pipeline
    #[must_use]
    pub fn new(
        config: Arc<SyncConfig>,
        source: Arc<dyn ObjectSource>,
        topology: Arc<dyn TopologyApi>,
        sink: Arc<dyn TopologySink>,
    ) -> Self {
        Self {
            config,
            source,
            topology,
            sink,
            normalizer: None,
        }
    }

    /// With a custom normalizer
    #[inline]
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Run the pipeline to completion
    ///
    /// Returns `Err` only for fatal failures; skipped records and failed sink
    /// calls are reflected in the report.
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let export = load_export(self.source.as_ref(), &self.config).await?;
        self.sync(export).await
    }

    /// Reconcile an already loaded export
    pub async fn sync(&self, export: LoadedExport) -> SyncResult<SyncReport> {
        let mut report = SyncReport {
            records_read: export.records_read,
            extraction_skipped: export.extraction_skipped,
            ..SyncReport::default()
        };

        let organizations = OrganizationIndex::fetch(self.topology.as_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "No organizations found, no changes will be synced");
                e
            })?;

        let mut engine = ReconciliationEngine::new(
            Arc::clone(&self.config),
            Arc::new(organizations),
            TopologyResolver::new(Arc::clone(&self.topology)),
            Arc::clone(&self.sink),
        );
        if let Some(normalizer) = &self.normalizer {
            engine = engine.with_normalizer(normalizer.clone());
        }
        engine.run(export.records, &mut report).await;

        report.log_summary();
        Ok(report)
    }
}

/// Export read from object storage, projected onto the configured attributes
#[derive(Debug, Clone)]
pub struct LoadedExport {
    /// Object key of the export
    pub key: String,
    /// Records that survived extraction, in source order
    pub records: Vec<ChangeRecord>,
    /// Records in the export
    pub records_read: usize,
    /// Records dropped by extraction
    pub extraction_skipped: usize,
}

/// Select, read, parse and extract the single export at the storage root
pub async fn load_export(
    source: &dyn ObjectSource,
    config: &SyncConfig,
) -> SyncResult<LoadedExport> {
    let key = select_root_object(source.list("").await?)?;
    tracing::info!(key = %key, "Working on file");
    let bytes = source.get(&key).await?;
    let raw = parse_records(&key, &bytes)?;
    tracing::debug!(records = ?raw, "Raw change data");

    let records_read = raw.len();
    let extraction = extract_attributes(raw, config)?;
    Ok(LoadedExport {
        key,
        records: extraction.records,
        records_read,
        extraction_skipped: extraction.skipped,
    })
}

/// Parse an export into raw records
///
/// The export must be a JSON array; entries that are not objects are skipped.
pub fn parse_records(key: &str, bytes: &[u8]) -> SyncResult<Vec<Map<String, Value>>> {
    let invalid = |message: String| SyncError::InvalidSourceData {
        key: key.to_string(),
        message,
    };
    let value: Value = serde_json::from_slice(bytes).map_err(|e| invalid(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(invalid("expected a JSON array of change records".to_string()));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(map) => records.push(map),
            other => tracing::warn!(index, value = %other, "Skipping non-object change entry"),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_of_objects() {
        let records = parse_records("x.json", br#"[{"a": 1}, 3, {"b": 2}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].contains_key("b"));
    }

    #[test]
    fn rejects_non_array() {
        let err = parse_records("x.json", br#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, SyncError::InvalidSourceData { ref key, .. } if key == "x.json"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_records("x.json", b"[{").is_err());
    }
}
