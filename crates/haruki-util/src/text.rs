//! Text helpers for labels shown in chat views

/// Truncate to at most `max` characters, ending with `…` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".to_string();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// Truncate an error body to `max` characters with a `...` tail.
///
/// Remote services sometimes answer with whole HTML pages; only the head is
/// worth showing to a user.
pub fn truncate_body(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

/// First non-blank value, or `—` when every value is blank.
pub fn first_non_empty<'a>(values: &[&'a str]) -> &'a str {
    values
        .iter()
        .copied()
        .find(|v| !v.trim().is_empty())
        .unwrap_or("—")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_labels() {
        assert_eq!(truncate("Foo (1999)", 100), "Foo (1999)");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let long = "é".repeat(120);
        let cut = truncate(&long, 100);
        assert_eq!(cut.chars().count(), 100);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn truncate_body_appends_dots() {
        let body = "x".repeat(400);
        let cut = truncate_body(&body, 300);
        assert_eq!(cut.len(), 303);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn first_non_empty_skips_blanks() {
        assert_eq!(first_non_empty(&["", "  ", "alice"]), "alice");
        assert_eq!(first_non_empty(&["", ""]), "—");
    }
}
