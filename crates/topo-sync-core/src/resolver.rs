//! Topology resolver
//!
//! Looks up the topology elements carrying an affected-service name. Lookups are
//! not cached: every change re-queries the service.

use crate::topology::{TopologyApi, TopologyElement};
use std::sync::Arc;

/// Resolves service names against the topology service
#[derive(Clone)]
pub struct TopologyResolver {
    topology: Arc<dyn TopologyApi>,
}

impl std::fmt::Debug for TopologyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyResolver").finish_non_exhaustive()
    }
}

impl TopologyResolver {
    /// Create resolver over a topology service
    #[inline]
    #[must_use]
    pub fn new(topology: Arc<dyn TopologyApi>) -> Self {
        Self { topology }
    }

    /// Elements named exactly `name`
    ///
    /// The same name may exist once per organization, so several elements can
    /// come back. A failed lookup is reported and treated like an empty result.
    pub async fn resolve(&self, name: &str) -> Vec<TopologyElement> {
        match self.topology.fetch_elements_by_name(name).await {
            Ok(elements) => {
                tracing::debug!(service = %name, ?elements, "Topology elements found");
                elements
            }
            Err(e) => {
                tracing::warn!(service = %name, error = %e, "Topology lookup failed");
                Vec::new()
            }
        }
    }
}
