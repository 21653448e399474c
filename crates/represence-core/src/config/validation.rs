//! Config validation - warns about unknown fields

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Validate JSON config and warn about unknown fields.
pub fn warn_unknown_fields(content: &str, config_name: &str) {
    let Ok(value) = serde_json::from_str::<Value>(content) else {
        return;
    };

    let expected = expected_config_keys();
    let unknowns = find_unknown_keys(&value, &expected, "");

    for path in unknowns {
        warn!("Unknown config field in {config_name}: {path}");
    }
}

/// Find unknown keys in JSON value compared to expected keys.
/// Returns paths like "fileInfo.unknownField" for unknown fields.
fn find_unknown_keys(value: &Value, expected: &ExpectedKeys, prefix: &str) -> Vec<String> {
    let mut unknowns = Vec::new();

    let Value::Object(obj) = value else {
        return unknowns;
    };

    for (key, child) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if let Some(nested) = expected.nested.get(key.as_str()) {
            unknowns.extend(find_unknown_keys(child, nested, &path));
        } else if !expected.fields.contains(key.as_str()) {
            unknowns.push(path);
        }
    }

    unknowns
}

/// Expected keys for a config section.
/// `fields` are leaf fields, `nested` are nested objects with their own expected keys.
struct ExpectedKeys {
    fields: HashSet<&'static str>,
    nested: HashMap<&'static str, ExpectedKeys>,
}

impl ExpectedKeys {
    fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.iter().copied().collect(),
            nested: HashMap::new(),
        }
    }

    fn with_nested(mut self, key: &'static str, nested: ExpectedKeys) -> Self {
        self.nested.insert(key, nested);
        self
    }
}

fn expected_config_keys() -> ExpectedKeys {
    let file_info_keys = ExpectedKeys::new(&["websocketPort", "enableLogging"]);

    ExpectedKeys::new(&[]).with_nested(super::SECTION, file_info_keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_no_warnings() {
        let json = r#"{
            "fileInfo": {
                "websocketPort": 4000,
                "enableLogging": true
            }
        }"#;

        let value: Value = serde_json::from_str(json).unwrap();
        let unknowns = find_unknown_keys(&value, &expected_config_keys(), "");

        assert!(
            unknowns.is_empty(),
            "Expected no unknowns, got: {unknowns:?}"
        );
    }

    #[test]
    fn test_unknown_top_level_field() {
        let json = r#"{
            "fileInfo": {},
            "unknownSection": {}
        }"#;

        let value: Value = serde_json::from_str(json).unwrap();
        let unknowns = find_unknown_keys(&value, &expected_config_keys(), "");

        assert_eq!(unknowns, vec!["unknownSection"]);
    }

    #[test]
    fn test_unknown_nested_field() {
        let json = r#"{
            "fileInfo": {
                "websocketPort": 4000,
                "websocketPrt": 4001
            }
        }"#;

        let value: Value = serde_json::from_str(json).unwrap();
        let unknowns = find_unknown_keys(&value, &expected_config_keys(), "");

        assert_eq!(unknowns, vec!["fileInfo.websocketPrt"]);
    }

    #[test]
    fn test_non_object_root_has_no_unknowns() {
        let value = serde_json::json!([1, 2, 3]);
        assert!(find_unknown_keys(&value, &expected_config_keys(), "").is_empty());
    }

    #[test]
    fn test_invalid_json_is_ignored() {
        // Must not panic; parse errors are reported by the loader itself
        warn_unknown_fields("{not json", "config.json");
    }
}
