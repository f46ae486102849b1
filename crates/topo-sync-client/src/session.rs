//! Run-scoped API session
//!
//! Holds everything a request to the topology service needs besides its body:
//! endpoints, tenant, job name and the bearer token it was built with.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::RequestBuilder;

/// Tenant used when none is configured
pub const DEFAULT_TENANT_ID: &str = "cfd95b7e-3bc7-4006-a4a8-a73a79c71255";

/// Tenant header
pub const TENANT_HEADER: &str = "X-TenantID";

/// Job name header sent on writes
pub const JOB_HEADER: &str = "JobId";

const JSON: &str = "application/json";

/// Service endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Token endpoint
    pub auth: String,
    /// Topology query endpoint, also the base of element updates
    pub topology: String,
    /// Change vertex endpoint
    pub resources: String,
    /// Relation endpoint
    pub references: String,
}

impl Endpoints {
    /// Update URL of an existing element
    #[must_use]
    pub fn element(&self, internal_id: &str) -> String {
        format!("{}/{internal_id}", self.topology.trim_end_matches('/'))
    }
}

/// Immutable session shared by the topology client and the remote sink
#[derive(Clone)]
pub struct ApiSession {
    endpoints: Endpoints,
    tenant_id: String,
    job_id: String,
    token: String,
}

impl std::fmt::Debug for ApiSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSession")
            .field("endpoints", &self.endpoints)
            .field("tenant_id", &self.tenant_id)
            .field("job_id", &self.job_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ApiSession {
    /// Create session for the default tenant
    #[must_use]
    pub fn new(endpoints: Endpoints, job_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoints,
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            job_id: job_id.into(),
            token: token.into(),
        }
    }

    /// With a specific tenant
    #[inline]
    #[must_use]
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Endpoints
    #[inline]
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Tenant id
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Headers of a query
    pub fn read(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACCEPT, JSON)
            .header(TENANT_HEADER, &self.tenant_id)
            .bearer_auth(&self.token)
    }

    /// Headers of a write
    pub fn write(&self, request: RequestBuilder) -> RequestBuilder {
        self.read(request)
            .header(JOB_HEADER, &self.job_id)
            .header(CONTENT_TYPE, JSON)
    }
}

#[cfg(test)]
pub(crate) fn test_session() -> ApiSession {
    ApiSession::new(
        Endpoints {
            auth: "https://aiops.test/auth".to_string(),
            topology: "https://aiops.test/topology/resources".to_string(),
            resources: "https://aiops.test/topology/observer/resources".to_string(),
            references: "https://aiops.test/topology/observer/references".to_string(),
        },
        "change-sync",
        "t0ken",
    )
}
