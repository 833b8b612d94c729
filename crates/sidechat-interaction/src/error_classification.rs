//! Maps raw API failures onto the [`ChatError`] taxonomy.

use sidechat_core::ChatError;

/// Classifies an API failure from its HTTP status (if any) and error text.
///
/// Text checks are case-insensitive. A quota failure reported as 429 is
/// still a quota failure, so quota is checked before rate limiting.
pub fn classify_api_error(status: Option<u16>, message: &str) -> ChatError {
    let lower = message.to_lowercase();

    if matches!(status, Some(401) | Some(403))
        || lower.contains("api key")
        || lower.contains("invalid_api_key")
    {
        return ChatError::Auth;
    }
    if lower.contains("quota") {
        return ChatError::Quota;
    }
    if status == Some(429) || lower.contains("rate limit") || lower.contains("rate_limit") {
        return ChatError::RateLimit;
    }

    ChatError::unknown(message.trim())
}
