/// Repair of legacy JSON exports
///
/// Data exported from the old browser client drifted between several
/// shapes over time. Before any import the payload is normalized into a flat
/// list of JSON items:
///
/// | Input                                  | Format      | Items          |
/// |----------------------------------------|-------------|----------------|
/// | `[ ... ]`                              | `RawArray`  | the array      |
/// | `{"data": [ ... ], "version": v}`      | `Wrapped`   | `data`         |
/// | `{"data": "<json array string>"}`      | `Wrapped`   | parsed `data`  |
/// | empty, whitespace or `null`            | `Empty`     | none           |
/// | anything else                          | `Malformed` | none           |
///
/// A malformed payload is treated as "no data": it is logged and yields an
/// empty item list instead of an error.
///
/// # Example
///
/// ```
/// use marketdesk_shared::legacy::{repair, PayloadFormat};
///
/// let repaired = repair(r#"{"data": [{"name": "India"}], "version": 2}"#);
/// assert_eq!(repaired.format, PayloadFormat::Wrapped { version: Some("2".to_string()) });
/// assert_eq!(repaired.items.len(), 1);
/// assert!(repaired.was_repaired());
/// ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// Shape a legacy payload was found in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum PayloadFormat {
    /// Plain JSON array (current format)
    RawArray,

    /// `{data, version}` wrapper
    Wrapped {
        /// Version marker as text, if present
        version: Option<String>,
    },

    /// Nothing stored
    Empty,

    /// Unrecognized or unparsable
    Malformed,
}

/// Normalized payload
#[derive(Debug, Clone)]
pub struct RepairedPayload {
    /// Detected input format
    pub format: PayloadFormat,

    /// Items extracted from the payload
    pub items: Vec<JsonValue>,
}

impl RepairedPayload {
    fn empty(format: PayloadFormat) -> Self {
        Self {
            format,
            items: Vec::new(),
        }
    }

    /// Whether the input needed normalization
    pub fn was_repaired(&self) -> bool {
        self.format != PayloadFormat::RawArray
    }
}

/// Outcome of importing a repaired payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// Detected input format
    #[serde(flatten)]
    pub format: PayloadFormat,

    /// Items found in the payload
    pub received: usize,

    /// Items written
    pub imported: usize,

    /// Items rejected (unparsable, invalid or duplicate)
    pub skipped: usize,
}

impl ImportReport {
    /// Starts a report for a payload
    pub fn for_payload(payload: &RepairedPayload) -> Self {
        Self {
            format: payload.format.clone(),
            received: payload.items.len(),
            imported: 0,
            skipped: 0,
        }
    }
}

/// Normalizes a legacy payload from text
pub fn repair(input: &str) -> RepairedPayload {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return RepairedPayload::empty(PayloadFormat::Empty);
    }

    match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(value) => repair_value(value),
        Err(e) => {
            warn!(error = %e, "Discarding unparsable legacy payload");
            RepairedPayload::empty(PayloadFormat::Malformed)
        }
    }
}

/// Normalizes an already parsed legacy payload
pub fn repair_value(value: JsonValue) -> RepairedPayload {
    match value {
        JsonValue::Null => RepairedPayload::empty(PayloadFormat::Empty),
        JsonValue::Array(items) => {
            debug!(items = items.len(), "Legacy payload is a raw array");
            RepairedPayload {
                format: PayloadFormat::RawArray,
                items,
            }
        }
        JsonValue::Object(mut map) => {
            let version = map.get("version").and_then(version_text);

            let items = match map.remove("data") {
                Some(JsonValue::Array(items)) => Some(items),
                // Double-encoded: data was stored as a JSON string
                Some(JsonValue::String(text)) => match serde_json::from_str::<JsonValue>(&text) {
                    Ok(JsonValue::Array(items)) => Some(items),
                    _ => None,
                },
                _ => None,
            };

            match items {
                Some(items) => {
                    debug!(items = items.len(), version = ?version, "Unwrapped legacy payload");
                    RepairedPayload {
                        format: PayloadFormat::Wrapped { version },
                        items,
                    }
                }
                None => {
                    warn!("Discarding legacy payload object without a data array");
                    RepairedPayload::empty(PayloadFormat::Malformed)
                }
            }
        }
        _ => {
            warn!("Discarding scalar legacy payload");
            RepairedPayload::empty(PayloadFormat::Malformed)
        }
    }
}

fn version_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_array() {
        let repaired = repair(r#"[{"name": "USD"}, {"name": "INR"}]"#);
        assert_eq!(repaired.format, PayloadFormat::RawArray);
        assert_eq!(repaired.items.len(), 2);
        assert!(!repaired.was_repaired());
    }

    #[test]
    fn test_wrapped_with_numeric_version() {
        let repaired = repair(r#"{"data": [{"name": "USD"}], "version": 1}"#);
        assert_eq!(
            repaired.format,
            PayloadFormat::Wrapped {
                version: Some("1".to_string())
            }
        );
        assert_eq!(repaired.items, vec![json!({"name": "USD"})]);
        assert!(repaired.was_repaired());
    }

    #[test]
    fn test_wrapped_without_version() {
        let repaired = repair(r#"{"data": []}"#);
        assert_eq!(repaired.format, PayloadFormat::Wrapped { version: None });
        assert!(repaired.items.is_empty());
    }

    #[test]
    fn test_wrapped_double_encoded() {
        let repaired = repair(r#"{"data": "[{\"name\": \"Euro\"}]", "version": "2"}"#);
        assert_eq!(
            repaired.format,
            PayloadFormat::Wrapped {
                version: Some("2".to_string())
            }
        );
        assert_eq!(repaired.items, vec![json!({"name": "Euro"})]);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(repair("").format, PayloadFormat::Empty);
        assert_eq!(repair("   \n").format, PayloadFormat::Empty);
        assert_eq!(repair("null").format, PayloadFormat::Empty);
    }

    #[test]
    fn test_malformed_inputs_yield_no_items() {
        for input in [
            "{not json",
            "42",
            "\"text\"",
            r#"{"items": []}"#,
            r#"{"data": {"name": "x"}}"#,
            r#"{"data": "not an array"}"#,
        ] {
            let repaired = repair(input);
            assert_eq!(repaired.format, PayloadFormat::Malformed, "input: {}", input);
            assert!(repaired.items.is_empty());
        }
    }

    #[test]
    fn test_import_report_serialization() {
        let payload = repair(r#"{"data": [1, 2, 3], "version": "3"}"#);
        let mut report = ImportReport::for_payload(&payload);
        report.imported = 2;
        report.skipped = 1;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["format"], "wrapped");
        assert_eq!(json["version"], "3");
        assert_eq!(json["received"], 3);
        assert_eq!(json["imported"], 2);
        assert_eq!(json["skipped"], 1);
    }
}
