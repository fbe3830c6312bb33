use serde_json::Value as JsonValue;

/// Recursively strips the configured JSON-Schema keys from a function
/// declaration's `parameters` subtree. Deep-copies; never mutates `schema`.
pub fn sanitize_schema(schema: &JsonValue, unsupported_keys: &[String]) -> JsonValue {
    match schema {
        JsonValue::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                if unsupported_keys.iter().any(|unsupported| unsupported == key) {
                    continue;
                }
                out.insert(key.clone(), sanitize_schema(value, unsupported_keys));
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| sanitize_schema(item, unsupported_keys))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_configured_keys_at_every_depth() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "age": {"type": "integer", "exclusiveMinimum": 0}
            }
        });
        let keys = vec!["$schema".to_string(), "exclusiveMinimum".to_string()];
        let cleaned = sanitize_schema(&schema, &keys);
        assert!(cleaned.get("$schema").is_none());
        assert!(cleaned["properties"]["age"].get("exclusiveMinimum").is_none());
        assert_eq!(cleaned["properties"]["age"]["type"], json!("integer"));
    }

    #[test]
    fn leaves_original_schema_untouched() {
        let schema = json!({"$schema": "x", "type": "object"});
        let keys = vec!["$schema".to_string()];
        let _ = sanitize_schema(&schema, &keys);
        assert_eq!(schema["$schema"], json!("x"));
    }
}
