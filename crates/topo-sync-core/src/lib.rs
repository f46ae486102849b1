//! Topo Sync Core - change-to-topology reconciliation
//!
//! Reads one change-management export and reconciles its changes into a
//! topology graph:
//! - Projects raw records onto the configured attributes
//! - Normalizes affected-services text and assigns synthetic change identities
//! - Resolves affected organizations and services against the topology service
//! - Emits change vertices, element updates and `has` relations to a sink
//!
//! The external collaborators (object storage, topology service, sink, token
//! endpoint) are traits; HTTP backends live in `topo-sync-client`.
//!
//! # Example
//!
//! ```rust,ignore
//! use topo_sync_core::prelude::*;
//!
//! # async fn example(config: SyncConfig, topology: Arc<dyn TopologyApi>) -> SyncResult<()> {
//! let sink = Arc::new(FileSink::create(DEFAULT_OUTPUT_FILE).await?);
//! let source = Arc::new(LocalDirSource::new("/mnt/changes"));
//!
//! let report = SyncPipeline::new(Arc::new(config), source, topology, sink)
//!     .run()
//!     .await?;
//! println!("{} changes synced", report.changes_emitted);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod org_index;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod resolver;
pub mod sink;
pub mod source;
pub mod topology;

// Re-exports for convenience
pub use auth::{acquire_token, RetryPolicy, TokenProvider};
pub use config::{
    AttributeNames, AttributeSelection, BroadcastIndicators, MissingAttributePolicy, SyncConfig,
};
pub use engine::{ChangeOutcome, LinkStrategy, ReconciliationEngine, SkipReason};
pub use error::{
    AuthError, ConfigError, ExtractError, SinkError, SourceError, SyncError, SyncResult,
    TopologyError,
};
pub use normalize::{NormalizedChange, Normalizer};
pub use org_index::OrganizationIndex;
pub use pipeline::{load_export, LoadedExport, SyncPipeline};
pub use record::{ChangeRecord, ElementUpdate, Relation, Vertex};
pub use report::SyncReport;
pub use resolver::TopologyResolver;
pub use sink::{FileSink, Frame, TopologySink, DEFAULT_OUTPUT_FILE};
pub use source::{LocalDirSource, ObjectSource};
pub use topology::{OrganizationEntry, TopologyApi, TopologyElement};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring a sync run
    pub use crate::{
        AttributeNames, AttributeSelection, BroadcastIndicators, ChangeRecord, FileSink,
        LocalDirSource, ObjectSource, SyncConfig, SyncError, SyncPipeline, SyncReport,
        SyncResult, TopologyApi, TopologySink, DEFAULT_OUTPUT_FILE,
    };
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
