//! Run configuration
//!
//! A [`SyncConfig`] is assembled once at startup, validated, and then shared
//! read-only (`Arc<SyncConfig>`) by every component for the rest of the run.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Token that selects every attribute
pub const WILDCARD: &str = "*";

/// Names of the change attributes the pipeline reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNames {
    /// Implementation start time
    pub start_time: String,
    /// Affected services (separator-joined text)
    pub affected_services: String,
    /// Affected organizations (array of codes)
    pub affected_organizations: String,
    /// Human title
    pub title: String,
    /// Change status
    pub status: String,
}

/// Sentinel service names that mean "every service of this class"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastIndicators {
    /// All front-end services
    pub front_end: String,
    /// All set-top boxes
    pub set_top_box: String,
}

impl BroadcastIndicators {
    /// Whether `service` is one of the indicators
    #[inline]
    #[must_use]
    pub fn matches(&self, service: &str) -> bool {
        service == self.front_end || service == self.set_top_box
    }
}

/// Which attributes survive extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeSelection {
    /// Keep records unchanged
    All,
    /// Keep exactly these keys, in this order
    Only(Vec<String>),
}

impl AttributeSelection {
    /// Parse a comma-separated list, `*` meaning everything
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let names: Vec<String> = raw.split(',').map(|s| s.trim().to_string()).collect();
        if names.len() == 1 && names[0] == WILDCARD {
            Self::All
        } else {
            Self::Only(names.into_iter().filter(|s| !s.is_empty()).collect())
        }
    }
}

/// What extraction does when a configured attribute is absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingAttributePolicy {
    /// Keep the record, attribute set to null
    #[default]
    Null,
    /// Drop the record
    SkipRecord,
    /// Abort the run
    FailRun,
}

impl FromStr for MissingAttributePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "null" => Ok(Self::Null),
            "skip" => Ok(Self::SkipRecord),
            "fail" => Ok(Self::FailRun),
            other => Err(ConfigError::Invalid {
                name: "missing attribute policy",
                value: other.to_string(),
            }),
        }
    }
}

/// Run-scoped pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Separator unifying the affected-services text
    pub separator: String,
    /// Broadcast triggers
    pub indicators: BroadcastIndicators,
    /// Attribute names
    pub attributes: AttributeNames,
    /// Extraction subset
    pub selection: AttributeSelection,
    /// Statuses that qualify a change for syncing
    pub statuses_of_interest: Vec<String>,
    /// Extraction behaviour for absent attributes
    pub missing_attribute_policy: MissingAttributePolicy,
}

impl SyncConfig {
    /// Create configuration with every attribute retained and no statuses of interest
    #[must_use]
    pub fn new(
        separator: impl Into<String>,
        indicators: BroadcastIndicators,
        attributes: AttributeNames,
    ) -> Self {
        Self {
            separator: separator.into(),
            indicators,
            attributes,
            selection: AttributeSelection::All,
            statuses_of_interest: Vec::new(),
            missing_attribute_policy: MissingAttributePolicy::default(),
        }
    }

    /// With attribute selection
    #[inline]
    #[must_use]
    pub fn with_selection(mut self, selection: AttributeSelection) -> Self {
        self.selection = selection;
        self
    }

    /// With statuses of interest from a comma-separated list
    #[must_use]
    pub fn with_statuses(mut self, raw: &str) -> Self {
        self.statuses_of_interest = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// With missing-attribute policy
    #[inline]
    #[must_use]
    pub fn with_missing_attribute_policy(mut self, policy: MissingAttributePolicy) -> Self {
        self.missing_attribute_policy = policy;
        self
    }

    /// Whether a change with this status is synced
    #[inline]
    #[must_use]
    pub fn is_status_of_interest(&self, status: &str) -> bool {
        self.statuses_of_interest.iter().any(|s| s == status)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::Empty("separator"));
        }
        let names = [
            ("start time attribute", &self.attributes.start_time),
            ("affected services attribute", &self.attributes.affected_services),
            ("affected organizations attribute", &self.attributes.affected_organizations),
            ("title attribute", &self.attributes.title),
            ("status attribute", &self.attributes.status),
        ];
        for (label, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(label));
            }
        }
        if let AttributeSelection::Only(keys) = &self.selection {
            if keys.is_empty() {
                return Err(ConfigError::Empty("attribute selection"));
            }
        }
        if self.statuses_of_interest.is_empty() {
            tracing::warn!("No statuses of interest configured; every change will be skipped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyncConfig {
        SyncConfig::new(
            "|",
            BroadcastIndicators {
                front_end: "APIGW FE".to_string(),
                set_top_box: "STBs".to_string(),
            },
            AttributeNames {
                start_time: "Impl. Start (UTC)".to_string(),
                affected_services: "Affected Services".to_string(),
                affected_organizations: "Affected OpCo's".to_string(),
                title: "Change Title".to_string(),
                status: "Change Status".to_string(),
            },
        )
    }

    #[test]
    fn wildcard_selects_everything() {
        assert_eq!(AttributeSelection::parse("*"), AttributeSelection::All);
        assert_eq!(AttributeSelection::parse(" * "), AttributeSelection::All);
    }

    #[test]
    fn explicit_selection_keeps_order() {
        let selection = AttributeSelection::parse("Change Title, Change Status,Environment");
        assert_eq!(
            selection,
            AttributeSelection::Only(vec![
                "Change Title".to_string(),
                "Change Status".to_string(),
                "Environment".to_string(),
            ])
        );
    }

    #[test]
    fn wildcard_among_names_is_a_name() {
        let selection = AttributeSelection::parse("*,Change Title");
        assert!(matches!(selection, AttributeSelection::Only(ref keys) if keys.len() == 2));
    }

    #[test]
    fn statuses_are_trimmed() {
        let config = config().with_statuses("Scheduled, Implemented,,");
        assert!(config.is_status_of_interest("Scheduled"));
        assert!(config.is_status_of_interest("Implemented"));
        assert!(!config.is_status_of_interest(""));
        assert_eq!(config.statuses_of_interest.len(), 2);
    }

    #[test]
    fn indicators_match_exactly() {
        let config = config();
        assert!(config.indicators.matches("STBs"));
        assert!(config.indicators.matches("APIGW FE"));
        assert!(!config.indicators.matches("stbs"));
    }

    #[test]
    fn validate_rejects_empty_separator() {
        let mut config = config().with_statuses("Scheduled");
        config.separator.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Empty("separator"))));
    }

    #[test]
    fn validate_rejects_empty_selection() {
        let config = config()
            .with_statuses("Scheduled")
            .with_selection(AttributeSelection::Only(Vec::new()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(config().with_statuses("Scheduled").validate().is_ok());
    }

    #[test]
    fn policy_parses() {
        assert_eq!("null".parse::<MissingAttributePolicy>().unwrap(), MissingAttributePolicy::Null);
        assert_eq!("SKIP".parse::<MissingAttributePolicy>().unwrap(), MissingAttributePolicy::SkipRecord);
        assert_eq!("fail".parse::<MissingAttributePolicy>().unwrap(), MissingAttributePolicy::FailRun);
        assert!("explode".parse::<MissingAttributePolicy>().is_err());
    }
}
