//! Outbound HTTP client construction
//!
//! Calls to the auth and topology services always connect directly. The proxy
//! setting only governs object-storage traffic.

use crate::error::ClientError;

/// How object-storage traffic reaches the network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxySetting {
    /// Connect directly, ignoring proxy environment variables
    #[default]
    Direct,
    /// Route every request through this proxy URL
    Via(String),
}

impl ProxySetting {
    /// Setting from the on/off flag and the configured URL
    ///
    /// An enabled flag without a URL is rejected.
    pub fn from_flag(enabled: bool, url: Option<&str>) -> Result<Self, ClientError> {
        match (enabled, url.map(str::trim).filter(|u| !u.is_empty())) {
            (false, _) => Ok(Self::Direct),
            (true, Some(url)) => Ok(Self::Via(url.to_string())),
            (true, None) => Err(ClientError::MissingProxyUrl),
        }
    }

    /// Validated proxy for an object-storage client, `None` when direct
    pub fn to_proxy(&self) -> Result<Option<reqwest::Proxy>, ClientError> {
        match self {
            Self::Direct => Ok(None),
            Self::Via(url) => reqwest::Proxy::all(url)
                .map(Some)
                .map_err(|source| ClientError::InvalidProxy {
                    url: url.clone(),
                    source,
                }),
        }
    }
}

/// Build the HTTP client shared by the auth, topology and sink backends
///
/// Proxy environment variables are ignored.
pub fn build_http_client() -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .map_err(ClientError::Build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_off_is_direct() {
        assert_eq!(
            ProxySetting::from_flag(false, Some("http://proxy:8080")).unwrap(),
            ProxySetting::Direct
        );
    }

    #[test]
    fn flag_on_needs_url() {
        assert!(matches!(
            ProxySetting::from_flag(true, Some("  ")),
            Err(ClientError::MissingProxyUrl)
        ));
        assert_eq!(
            ProxySetting::from_flag(true, Some("http://proxy:8080")).unwrap(),
            ProxySetting::Via("http://proxy:8080".to_string())
        );
    }

    #[test]
    fn proxy_only_built_when_routed() {
        assert!(ProxySetting::Direct.to_proxy().unwrap().is_none());
        assert!(ProxySetting::Via("http://proxy:8080".to_string())
            .to_proxy()
            .unwrap()
            .is_some());
    }

    #[test]
    fn builds_api_client() {
        assert!(build_http_client().is_ok());
    }
}
