//! Logging utilities
//!
//! Helpers that keep credentials and large bodies out of log output

/// Query parameters whose values never appear in logs
pub const SECRET_PARAMS: &[&str] = &["oauth_token", "client_secret"];

/// Maximum body length written to debug logs
pub const MAX_LOGGED_BODY: usize = 512;

/// Truncate a string at a byte limit, noting how many bytes were dropped
pub fn truncate_body(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} bytes truncated)", &s[..cut], s.len() - cut)
}

/// Mask the values of secret query parameters in a URL
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SECRET_PARAMS.contains(&key) => format!("{}=[redacted]", key),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", base, pairs.join("&"))
}
