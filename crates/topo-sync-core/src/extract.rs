//! Attribute extraction
//!
//! Projects raw change records down to the configured attribute subset.

use crate::config::{AttributeSelection, MissingAttributePolicy, SyncConfig};
use crate::error::ExtractError;
use crate::record::ChangeRecord;
use serde_json::{Map, Value};

/// Records that survived extraction
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Projected records, in source order
    pub records: Vec<ChangeRecord>,
    /// Records dropped for a missing attribute
    pub skipped: usize,
}

/// Project every record onto the configured attributes
///
/// With [`AttributeSelection::All`] records pass through unchanged. Otherwise each
/// record is rebuilt with exactly the configured keys, in configured order: text is
/// trimmed (empty text becomes null), other values are kept as they are, and an
/// absent key is handled according to [`MissingAttributePolicy`].
pub fn extract_attributes(
    raw: Vec<Map<String, Value>>,
    config: &SyncConfig,
) -> Result<Extraction, ExtractError> {
    let keys = match &config.selection {
        AttributeSelection::All => {
            tracing::info!("All change properties will be synced, none are filtered out");
            return Ok(Extraction {
                records: raw.into_iter().map(ChangeRecord::from_map).collect(),
                skipped: 0,
            });
        }
        AttributeSelection::Only(keys) => keys,
    };

    let mut extraction = Extraction::default();
    'records: for (index, item) in raw.into_iter().enumerate() {
        let mut projected = Map::with_capacity(keys.len());
        for key in keys {
            let value = match item.get(key) {
                Some(value) => trim_value(value),
                None => match config.missing_attribute_policy {
                    MissingAttributePolicy::Null => {
                        tracing::warn!(record = index, attribute = %key, "Attribute missing, using null");
                        Value::Null
                    }
                    MissingAttributePolicy::SkipRecord => {
                        tracing::error!(record = index, attribute = %key, "Attribute missing, skipping record");
                        extraction.skipped += 1;
                        continue 'records;
                    }
                    MissingAttributePolicy::FailRun => {
                        return Err(ExtractError::MissingAttribute {
                            index,
                            attribute: key.clone(),
                        });
                    }
                },
            };
            projected.insert(key.clone(), value);
        }
        extraction.records.push(ChangeRecord::from_map(projected));
    }

    Ok(extraction)
}

fn trim_value(value: &Value) -> Value {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(trimmed.to_string())
            }
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AttributeNames, BroadcastIndicators};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config(selection: &str, policy: MissingAttributePolicy) -> SyncConfig {
        SyncConfig::new(
            "|",
            BroadcastIndicators {
                front_end: "APIGW FE".to_string(),
                set_top_box: "STBs".to_string(),
            },
            AttributeNames {
                start_time: "start".to_string(),
                affected_services: "services".to_string(),
                affected_organizations: "orgs".to_string(),
                title: "title".to_string(),
                status: "status".to_string(),
            },
        )
        .with_selection(AttributeSelection::parse(selection))
        .with_missing_attribute_policy(policy)
    }

    fn raw(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn wildcard_passes_records_through() {
        let input = raw(vec![json!({"title": "  padded  ", "extra": 1})]);
        let out = extract_attributes(input, &config("*", MissingAttributePolicy::Null)).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].text("title"), Some("  padded  "));
        assert_eq!(out.records[0].get("extra"), Some(&json!(1)));
    }

    #[test]
    fn selection_projects_and_trims() {
        let input = raw(vec![json!({
            "status": " Scheduled ",
            "title": "\tPatch\n",
            "orgs": ["NL", "DE"],
            "dropped": "x"
        })]);
        let out =
            extract_attributes(input, &config("title,status,orgs", MissingAttributePolicy::Null))
                .unwrap();
        assert_eq!(
            serde_json::to_value(&out.records[0]).unwrap(),
            json!({"title": "Patch", "status": "Scheduled", "orgs": ["NL", "DE"]})
        );
        let keys: Vec<&String> = out.records[0].attributes().keys().collect();
        assert_eq!(keys, ["title", "status", "orgs"]);
    }

    #[test]
    fn blank_text_becomes_null() {
        let input = raw(vec![json!({"title": "   "})]);
        let out = extract_attributes(input, &config("title", MissingAttributePolicy::Null)).unwrap();
        assert_eq!(out.records[0].get("title"), Some(&Value::Null));
    }

    #[test]
    fn missing_attribute_defaults_to_null() {
        let input = raw(vec![json!({"title": "Patch"})]);
        let out =
            extract_attributes(input, &config("title,status", MissingAttributePolicy::Null)).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].get("status"), Some(&Value::Null));
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn missing_attribute_can_skip_record() {
        let input = raw(vec![json!({"title": "A"}), json!({"title": "B", "status": "Scheduled"})]);
        let out =
            extract_attributes(input, &config("title,status", MissingAttributePolicy::SkipRecord))
                .unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].text("title"), Some("B"));
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn missing_attribute_can_fail_run() {
        let input = raw(vec![json!({"title": "A", "status": "x"}), json!({"title": "B"})]);
        let err = extract_attributes(input, &config("title,status", MissingAttributePolicy::FailRun))
            .unwrap_err();
        match err {
            ExtractError::MissingAttribute { index, attribute } => {
                assert_eq!(index, 1);
                assert_eq!(attribute, "status");
            }
        }
    }
}
