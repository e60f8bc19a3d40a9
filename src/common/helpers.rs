// Helper functions for safe logging and timestamp handling

use chrono::{DateTime, SecondsFormat, Utc};

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            let first = parts[0].chars().next().unwrap_or('*');
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Formats a timestamp the way every table stores it (RFC 3339, UTC,
/// whole seconds). The fixed shape keeps text comparisons in SQL ordered.
pub fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time in the storage format.
pub fn now_timestamp() -> String {
    db_timestamp(Utc::now())
}

/// Decodes a JSON array column (e.g. `["arrays","graphs"]`) into strings.
/// Malformed or NULL content yields an empty list.
pub fn decode_string_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|json| serde_json::from_str::<Vec<String>>(json).ok())
        .unwrap_or_default()
}
