use std::collections::HashMap;
use std::time::Duration;

/// Reads a numeric `Retry-After` header into a [`Duration`].
///
/// The value is only surfaced on [`crate::error::LLMError::RateLimit`]; nothing in this
/// crate waits or re-sends. HTTP-date values are ignored.
pub(crate) fn retry_after_from_headers(headers: &HashMap<String, String>) -> Option<Duration> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
