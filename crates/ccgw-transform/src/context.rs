/// Per-request identity used by response formatters when the upstream chunk
/// omits `responseId` / `modelVersion` (spec's Formatter Context).
#[derive(Debug, Clone)]
pub struct FormatterContext {
    pub response_id: String,
    pub model: String,
}

impl FormatterContext {
    /// `response_id` is the bare generated id; callers prefix it with the
    /// surface-specific tag (`chatcmpl-`, `msg_`) themselves, matching how an
    /// upstream-supplied id is treated the same way.
    pub fn new_openai(model: impl Into<String>) -> Self {
        Self {
            response_id: uuid::Uuid::new_v4().simple().to_string(),
            model: model.into(),
        }
    }

    pub fn new_claude(model: impl Into<String>) -> Self {
        Self {
            response_id: uuid::Uuid::new_v4().simple().to_string(),
            model: model.into(),
        }
    }

    pub fn resolve_response_id(&self, upstream: Option<&str>) -> String {
        upstream
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
            .unwrap_or_else(|| self.response_id.clone())
    }

    pub fn resolve_model(&self, upstream: Option<&str>) -> String {
        upstream
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
            .unwrap_or_else(|| self.model.clone())
    }
}
