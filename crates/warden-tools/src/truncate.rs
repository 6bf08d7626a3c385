//! UTF-8-safe output truncation.

/// Truncate `s` at the nearest char boundary at or before `max_bytes`.
///
/// Returns the (possibly shortened) string and whether anything was cut.
#[must_use]
pub fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> (&str, bool) {
    if s.len() <= max_bytes {
        return (s, false);
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    (&s[..end], true)
}

/// Decode captured process output, capped at `max_bytes`.
#[must_use]
pub fn capture_output(bytes: &[u8], max_bytes: usize) -> (String, bool) {
    let text = String::from_utf8_lossy(bytes);
    let (kept, truncated) = truncate_at_char_boundary(&text, max_bytes);
    (kept.to_string(), truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_returned_unchanged() {
        assert_eq!(truncate_at_char_boundary("hello", 200), ("hello", false));
    }

    #[test]
    fn ascii_truncates_at_exact_boundary() {
        let s = "x".repeat(300);
        let (out, cut) = truncate_at_char_boundary(&s, 200);
        assert_eq!(out.len(), 200);
        assert!(cut);
    }

    #[test]
    fn multibyte_walks_back() {
        let s = format!("{}\u{1F980}", "x".repeat(198));
        let (out, cut) = truncate_at_char_boundary(&s, 200);
        assert_eq!(out, "x".repeat(198));
        assert!(cut);
    }

    #[test]
    fn capture_replaces_invalid_utf8() {
        let (out, cut) = capture_output(&[b'o', b'k', 0xFF], 100);
        assert!(out.starts_with("ok"));
        assert!(!cut);
    }
}
