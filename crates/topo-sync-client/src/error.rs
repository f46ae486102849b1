//! Client construction errors
//!
//! Request failures map onto the seam errors of `topo-sync-core`
//! (`AuthError`, `TopologyError`, `SinkError`); this type only covers
//! building the clients themselves.

/// Errors building an HTTP backend
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Proxy flag set but no URL given
    #[error("proxy enabled but no proxy URL configured")]
    MissingProxyUrl,

    /// Proxy URL rejected
    #[error("invalid proxy URL {url}: {source}")]
    InvalidProxy {
        /// Configured URL
        url: String,
        /// Parse failure
        #[source]
        source: reqwest::Error,
    },

    /// TLS or resolver setup failed
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}
