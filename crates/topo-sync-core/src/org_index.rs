//! Organization index
//!
//! Name to unique-identifier lookup for organization entities, fetched once per
//! run and read-only afterwards.

use crate::error::{SyncError, SyncResult};
use crate::topology::{OrganizationEntry, TopologyApi};
use std::collections::HashMap;

/// Organization codes that are looked up under another code
const ALIASES: &[(&str, &str)] = &[("SP", "ES")];

/// Organization name to unique identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationIndex {
    by_name: HashMap<String, String>,
}

impl OrganizationIndex {
    /// Build from query results, ignoring entries without a name or identifier
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = OrganizationEntry>) -> Self {
        let by_name = entries
            .into_iter()
            .filter_map(|entry| match (entry.name, entry.unique_id) {
                (Some(name), Some(id)) if !name.is_empty() && !id.is_empty() => Some((name, id)),
                (name, id) => {
                    tracing::warn!(?name, ?id, "Organization without a name or identifier, ignoring it");
                    None
                }
            })
            .collect();
        Self { by_name }
    }

    /// Query the topology service and build the index
    ///
    /// A failed query or an index with no entries is fatal: no change can be
    /// linked to an organization without it.
    pub async fn fetch(topology: &dyn TopologyApi) -> SyncResult<Self> {
        let entries = topology
            .fetch_organizations()
            .await
            .map_err(SyncError::OrganizationIndex)?;
        let index = Self::from_entries(entries);
        if index.is_empty() {
            return Err(SyncError::EmptyOrganizationIndex);
        }
        tracing::info!(organizations = index.len(), "Organization index built");
        Ok(index)
    }

    /// Identifier for an organization code, aliases applied
    #[must_use]
    pub fn resolve(&self, code: &str) -> Option<&str> {
        let code = canonical_code(code);
        self.by_name.get(code).map(String::as_str)
    }

    /// Number of organizations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the index has no organizations
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Code an organization is looked up under
#[must_use]
pub fn canonical_code(code: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == code)
        .map_or(code, |(_, canonical)| *canonical)
}
