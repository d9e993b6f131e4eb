//! Redaction of OAuth material before it reaches logs or terminal output.

use std::borrow::Cow;

const SENSITIVE_PATTERNS: &[(&str, &str)] = &[
    ("Bearer ", "Bearer [REDACTED]"),
    ("bearer ", "bearer [REDACTED]"),
    ("OAuth ", "OAuth [REDACTED]"),
    ("client_secret=", "client_secret=[REDACTED]"),
    ("access_token=", "access_token=[REDACTED]"),
    ("oauth_token=", "oauth_token=[REDACTED]"),
    ("refresh_token=", "refresh_token=[REDACTED]"),
    ("\"access_token\":\"", "\"access_token\":\"[REDACTED]"),
];

/// Replace the value following any known credential marker.
///
/// ```
/// use twitchy_core::redact::redact_secrets;
///
/// let out = redact_secrets("Authorization: Bearer abc123");
/// assert_eq!(out, "Authorization: Bearer [REDACTED]");
/// ```
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut result = Cow::Borrowed(input);
    for (pattern, replacement) in SENSITIVE_PATTERNS {
        if result.contains(pattern) {
            let redacted = redact_pattern_value(&result, pattern, replacement);
            result = Cow::Owned(redacted);
        }
    }
    result
}

fn redact_pattern_value(input: &str, pattern: &str, replacement: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;

    while let Some(pos) = remaining.find(pattern) {
        result.push_str(&remaining[..pos]);
        result.push_str(replacement);

        let after_pattern = &remaining[pos + pattern.len()..];
        let end = after_pattern
            .find(|c: char| c.is_whitespace() || c == '&' || c == '"' || c == '\'')
            .unwrap_or(after_pattern.len());

        remaining = &after_pattern[end..];
    }

    result.push_str(remaining);
    result
}

/// Short preview of a secret for display: the first four characters, then an ellipsis.
pub fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".into()
    } else {
        format!("{visible}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_bearer_token() {
        let output = redact_secrets("Authorization: Bearer sk_live_abc123xyz");
        assert!(!output.contains("sk_live_abc123xyz"));
        assert!(output.contains("[REDACTED]"));
    }

    #[test]
    fn redacts_oauth_header() {
        let output = redact_secrets("Authorization: OAuth 0123456789abcdef");
        assert_eq!(output, "Authorization: OAuth [REDACTED]");
    }

    #[test]
    fn redacts_form_fields() {
        let input = "client_id=abc&client_secret=hunter2&grant_type=client_credentials";
        let output = redact_secrets(input);
        assert!(!output.contains("hunter2"));
        assert!(output.contains("client_id=abc"));
        assert!(output.contains("grant_type=client_credentials"));
    }

    #[test]
    fn redacts_token_json() {
        let output = redact_secrets(r#"{"access_token":"jostpf5q0puzmxmkba9iyug38kjtg","expires_in":5011271}"#);
        assert!(!output.contains("jostpf5q0puzmxmkba9iyug38kjtg"));
        assert!(output.contains("expires_in"));
    }

    #[test]
    fn preserves_non_sensitive_data() {
        let input = "GET games/top?first=100";
        assert_eq!(redact_secrets(input), input);
    }

    #[test]
    fn mask_short_and_long() {
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("abcdefgh"), "abcd…");
    }
}
