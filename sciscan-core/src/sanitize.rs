//! Sanitization of raw model output.
//!
//! Models are told to answer with a bare JSON object but regularly wrap it in
//! prose or markdown fences. This is a recovery step, not a JSON parser.

/// Extract the candidate JSON object from raw model output.
///
/// Returns the slice from the first `{` to the last `}` inclusive. When either
/// brace is missing, or the last `}` does not come after the first `{`, the
/// trimmed input is returned unchanged so that the subsequent parse fails
/// with a meaningful error.
pub fn extract_json_payload(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => raw.trim(),
    }
}
