use ccgw_common::GatewayConfig;
use serde::Serialize;
use serde_json::Value as JsonValue;

const REDACTED: &str = "[REDACTED]";

/// Traverses a JSON body and replaces every value under a key named `text`
/// or `data` with a sentinel; for embedding bodies, the `values` array is
/// replaced by a count summary (spec §9 "Redaction for logs", recovered
/// from `original_source/src/utils/utils.py`). Used only when logging
/// request/response bodies at debug level — callers gate this on
/// `debug_redact_logs` themselves.
pub fn redact_body(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, inner) in map {
                match key.as_str() {
                    "text" | "data" => {
                        out.insert(key.clone(), JsonValue::String(REDACTED.to_string()));
                    }
                    "values" if inner.is_array() => {
                        let count = inner.as_array().map(Vec::len).unwrap_or(0);
                        out.insert(key.clone(), serde_json::json!({ "omitted_count": count }));
                    }
                    _ => {
                        out.insert(key.clone(), redact_body(inner));
                    }
                }
            }
            JsonValue::Object(out)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(redact_body).collect()),
        other => other.clone(),
    }
}

/// Logs `value` at debug level under `label`, redacted per `redact_body`
/// unless the operator has disabled redaction. A no-op unless `debug` is
/// set — non-debug builds never log request/response bodies at all
/// (spec §9, SPEC_FULL §4.9).
pub fn log_body(config: &GatewayConfig, label: &str, value: &impl Serialize) {
    if !config.debug {
        return;
    }
    let Ok(value) = serde_json::to_value(value) else {
        return;
    };
    let body = if config.debug_redact_logs { redact_body(&value) } else { value };
    tracing::debug!(label, %body, "request body");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_and_data_values_are_replaced_at_any_depth() {
        let body = json!({
            "contents": [{"parts": [{"text": "hello"}]}],
            "inlineData": {"data": "base64stuff", "mimeType": "image/png"},
        });
        let redacted = redact_body(&body);
        assert_eq!(redacted["contents"][0]["parts"][0]["text"], REDACTED);
        assert_eq!(redacted["inlineData"]["data"], REDACTED);
        assert_eq!(redacted["inlineData"]["mimeType"], "image/png");
    }

    #[test]
    fn embedding_values_array_becomes_a_count() {
        let body = json!({"embedding": {"values": [0.1, 0.2, 0.3]}});
        let redacted = redact_body(&body);
        assert_eq!(redacted["embedding"]["values"]["omitted_count"], 3);
    }
}
