//! Error types for the sync pipeline
//!
//! Failures fall into three tiers:
//! - Fatal: [`SyncError`] aborts the whole run
//! - Record-skip: a change is dropped, reported through [`crate::engine::SkipReason`]
//! - Sub-step-skip: one organization, service or sink call is dropped inside a change
//!
//! Only the first tier surfaces as an `Err` to the caller of the pipeline. The
//! per-concern errors below are what the seams return; the engine turns them into
//! log lines and report counters.

use std::path::PathBuf;

/// Fatal errors that abort the run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Bearer token could not be obtained
    #[error("auth failed: {0}")]
    Auth(#[from] AuthError),

    /// Run configuration is unusable
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Object storage could not be read
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Storage root does not hold exactly one export
    #[error("expected 1 file in the source root, found {found}")]
    SourceFileCount {
        /// Objects found outside `archive/`
        found: usize,
    },

    /// Export is not a JSON array of change records
    #[error("invalid change data in {key}: {message}")]
    InvalidSourceData {
        /// Object key
        key: String,
        /// Parser message
        message: String,
    },

    /// A configured attribute was missing and the policy is to fail the run
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    /// Organization lookup could not be built
    #[error("organization index unavailable: {0}")]
    OrganizationIndex(#[source] TopologyError),

    /// Organization lookup came back with nothing usable
    #[error("organization index is empty")]
    EmptyOrganizationIndex,

    /// Output artifact could not be prepared
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

impl SyncError {
    /// Whether the run failed on token acquisition
    #[inline]
    #[must_use]
    pub fn is_fatal_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Token acquisition errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Transport-level failure
    #[error("auth request failed: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("auth endpoint returned {status}: {body}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// Response did not carry a token
    #[error("auth response has no token")]
    MissingToken,

    /// Every attempt failed
    #[error("no token after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        #[source]
        last: Box<AuthError>,
    },
}

/// Invalid run configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value is empty
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A value could not be parsed
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Setting name
        name: &'static str,
        /// Rejected value
        value: String,
    },
}

/// Object storage errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Filesystem failure
    #[error("io error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Key does not exist
    #[error("object not found: {0}")]
    NotFound(String),
}

impl SourceError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Topology query errors
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// Transport-level failure
    #[error("topology request failed: {0}")]
    Transport(String),

    /// Non-success status
    #[error("topology service returned {status}: {body}")]
    Status {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// Response body is not the expected shape
    #[error("unexpected topology response: {0}")]
    Decode(String),

    /// Response body has no `_items` array
    #[error("topology response has no items")]
    MissingItems,
}

/// Sink emission errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Artifact write failed
    #[error("io error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Payload could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Transport-level failure
    #[error("request failed: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {status}: {body}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },
}

impl SinkError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Attribute extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Record lacks a configured attribute
    #[error("record {index} has no attribute '{attribute}'")]
    MissingAttribute {
        /// Position of the record in the export
        index: usize,
        /// Configured attribute name
        attribute: String,
    },
}

/// Result alias for fatal pipeline operations
pub type SyncResult<T> = Result<T, SyncError>;
