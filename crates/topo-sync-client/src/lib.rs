//! Topo Sync Client - HTTP backends for the sync seams
//!
//! - [`AuthClient`]: bearer token from the auth endpoint
//! - [`TopologyClient`]: organization and element queries
//! - [`RemoteSink`]: change vertices, element updates and relations
//!
//! All three share one `reqwest::Client` built by [`build_http_client`]; the
//! query client and the sink also share an [`ApiSession`] once a token is held.

#![warn(unreachable_pub)]

pub mod auth;
pub mod error;
pub mod http;
pub mod session;
pub mod sink;
pub mod topology;

pub use auth::{AuthClient, Credentials};
pub use error::ClientError;
pub use http::{build_http_client, ProxySetting};
pub use session::{ApiSession, Endpoints, DEFAULT_TENANT_ID};
pub use sink::RemoteSink;
pub use topology::TopologyClient;
