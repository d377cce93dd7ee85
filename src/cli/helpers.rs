//! Shared helper functions for CLI commands
//!
//! Utility functions used across multiple command modules to avoid code
//! duplication.

use crate::core::identity::RecordId;

/// Format a RecordId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
/// This provides a consistent display format across all list/table outputs.
pub fn format_short_id(id: &RecordId) -> String {
    truncate_str(&id.to_string(), 16)
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output. Cuts on char
/// boundaries, so multibyte names never panic.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", head)
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Format an amount in euros for table output
pub fn format_eur(amount: f64) -> String {
    format!("\u{20ac}{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::RecordPrefix;

    #[test]
    fn test_format_short_id() {
        let id = RecordId::new(RecordPrefix::Sup);
        let formatted = format_short_id(&id);
        // IDs are 30 chars (3-char prefix + dash + 26-char ULID), so should truncate
        assert!(formatted.len() <= 16);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_truncate_str_cuts_on_char_boundaries() {
        // a multibyte char straddling the cut point must not panic
        let name = format!("{}ébcdef", "a".repeat(24));
        assert_eq!(truncate_str(&name, 28), format!("{}é...", "a".repeat(24)));
        assert_eq!(truncate_str("Crème Brûlée Schilders", 10), "Crème B...");
        // exact fit counts chars, not bytes
        assert_eq!(truncate_str("héllo", 5), "héllo");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_format_eur() {
        assert_eq!(format_eur(500.0), "€500.00");
        assert_eq!(format_eur(4.955), "€4.96");
        assert_eq!(format_eur(0.1), "€0.10");
    }
}
