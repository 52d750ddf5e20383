/// JSON-RPC error code some providers use for "too many requests".
pub const RATE_LIMIT_ERROR_CODE: i64 = -32090;

/// Message fragments that mean the node wants us to back off.
const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "retry in", "too many requests"];

/// Returns `true` if an RPC error code or message is a rate-limit signal.
pub fn is_rate_limit_signal(code: Option<i64>, message: &str) -> bool {
    if code == Some(RATE_LIMIT_ERROR_CODE) {
        return true;
    }
    let message = message.to_lowercase();
    RATE_LIMIT_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}
