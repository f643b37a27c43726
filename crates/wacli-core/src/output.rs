//! Shared output-formatting helpers used by the CLI's human renderer.

/// Collapse embedded newlines to spaces and truncate to `max` chars,
/// appending `…` when truncated. Shared by every human-readable column
/// renderer so list output stays on one line per row.
pub fn truncate(s: &str, max: usize) -> String {
    let collapsed: String = s
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    let collapsed = collapsed.trim();

    if collapsed.chars().count() <= max {
        return collapsed.to_string();
    }

    let truncated: String = collapsed.chars().take(max.saturating_sub(1)).collect();
    format!("{truncated}…")
}

/// Format a unix-seconds timestamp as RFC 3339 UTC, as required by the
/// JSON output contract (spec section 4.5 / 6).
pub fn format_timestamp(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_passthrough() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_collapses_newlines() {
        assert_eq!(truncate("hello\nworld", 20), "hello world");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("hello world", 8), "hello w…");
    }

    #[test]
    fn format_timestamp_is_rfc3339_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    }
}
