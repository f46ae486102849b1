//! Sink seam and file backend
//!
//! The engine emits vertices and relations through [`TopologySink`]. Two
//! backends exist: the remote API (`topo-sync-client`) and [`FileSink`], which
//! appends one framed JSON line per emission for offline review:
//!
//! ```text
//! V:{"uniqueId":"CHG_1700000000_Portal", ...}
//! E:{"_fromUniqueId":"org-nl","_toUniqueId":"CHG_1700000000_Portal","_edgeType":"has"}
//! ```

use crate::error::SinkError;
use crate::record::{Relation, Vertex};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Default artifact name in file mode
pub const DEFAULT_OUTPUT_FILE: &str = "changes.data";

/// Destination for graph emissions
#[async_trait]
pub trait TopologySink: Send + Sync {
    /// Create or update a vertex
    async fn emit_vertex(&self, vertex: &Vertex) -> Result<(), SinkError>;

    /// Create a relation
    async fn emit_relation(&self, relation: &Relation) -> Result<(), SinkError>;
}

/// Line framing of the output artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// `V:` line
    Vertex,
    /// `E:` line
    Edge,
}

impl Frame {
    /// Line prefix
    #[inline]
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Vertex => "V:",
            Self::Edge => "E:",
        }
    }

    /// Complete line for a JSON payload
    pub fn line(self, payload: &impl serde::Serialize) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(payload)?;
        Ok(format!("{}{json}\n", self.prefix()))
    }
}

/// Appends emissions to a run-scoped artifact
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Start a fresh artifact at `path`
    ///
    /// An artifact left by a previous run is deleted first.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!(path = %path.display(), "Old output file deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SinkError::io_error(&path, e)),
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SinkError::io_error(&path, e))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Artifact location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: String) -> Result<(), SinkError> {
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::io_error(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| SinkError::io_error(&self.path, e))
    }
}

#[async_trait]
impl TopologySink for FileSink {
    async fn emit_vertex(&self, vertex: &Vertex) -> Result<(), SinkError> {
        let line = Frame::Vertex.line(&vertex.to_json()?)?;
        self.append(line).await
    }

    async fn emit_relation(&self, relation: &Relation) -> Result<(), SinkError> {
        let line = Frame::Edge.line(relation)?;
        self.append(line).await
    }
}
