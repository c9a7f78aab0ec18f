//! Make user-supplied text safe to put in log lines.
//!
//! Serials, notes and remarks come straight from operators. A newline in a
//! note must not start a forged log line, so control characters are escaped
//! or replaced and long values are cut short.

use std::borrow::Cow;

/// Longest value, in characters, written to a log line.
pub const MAX_LOG_CHARS: usize = 200;

/// Marker appended to values cut at [`MAX_LOG_CHARS`].
pub const TRUNCATION_MARKER: &str = "…(truncated)";

/// Sanitize a value for logging.
///
/// `\r`, `\n` and `\t` become their escaped forms, other control characters
/// become `?`. Returns the input unchanged when nothing needs doing.
#[must_use]
pub fn for_log(input: &str) -> Cow<'_, str> {
    let needs_escape = input.chars().any(char::is_control);
    let too_long = input.chars().nth(MAX_LOG_CHARS).is_some();
    if !needs_escape && !too_long {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len().min(MAX_LOG_CHARS * 2) + TRUNCATION_MARKER.len());
    for c in input.chars().take(MAX_LOG_CHARS) {
        match c {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push('?'),
            c => out.push(c),
        }
    }
    if too_long {
        out.push_str(TRUNCATION_MARKER);
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input_is_borrowed() {
        assert!(matches!(for_log("W-100"), Cow::Borrowed("W-100")));
    }

    #[test]
    fn test_line_breaks_are_escaped() {
        assert_eq!(
            for_log("ok\nINFO forged entry\r\tx"),
            "ok\\nINFO forged entry\\r\\tx"
        );
    }

    #[test]
    fn test_other_control_chars_replaced() {
        assert_eq!(for_log("a\u{1b}[31mb\u{0}"), "a?[31mb?");
    }

    #[test]
    fn test_long_values_truncated() {
        let long = "x".repeat(MAX_LOG_CHARS + 50);
        let out = for_log(&long);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(out.chars().count(), MAX_LOG_CHARS + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_exact_limit_not_truncated() {
        let exact = "é".repeat(MAX_LOG_CHARS);
        assert!(matches!(for_log(&exact), Cow::Borrowed(_)));
    }
}
