use ccgw_protocol::gemini::GenerateContentRequestBody;

/// Native Gemini requests pass through unchanged once they've deserialised
/// into the canonical body (spec §4.5 "Native Gemini"); this only exists so
/// every surface goes through an explicit adapter call.
pub fn transform_request(body: GenerateContentRequestBody) -> GenerateContentRequestBody {
    body
}
