//! Filesystem-safe names derived from free text

/// Default upper bound on a sanitized name, in characters
pub const DEFAULT_MAX_NAME_LEN: usize = 50;

/// Name used when nothing survives sanitization
pub const PLACEHOLDER_NAME: &str = "untitled";

/// Punctuation kept besides alphanumerics
const ALLOWED_PUNCTUATION: &[char] = &['-', '_', ' ', '(', ')', '[', ']'];

/// Derive a filesystem-safe name from free text.
///
/// Keeps alphanumerics and a small punctuation allow-list, trims
/// surrounding whitespace and truncates to `max_len` characters. Inputs
/// with nothing left fall back to [`PLACEHOLDER_NAME`].
pub fn sanitize_filename(text: &str, max_len: usize) -> String {
    let max_len = max_len.max(1);
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || ALLOWED_PUNCTUATION.contains(c))
        .collect();

    let truncated: String = kept.trim().chars().take(max_len).collect();
    let truncated = truncated.trim_end();

    if truncated.is_empty() {
        PLACEHOLDER_NAME.chars().take(max_len).collect()
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_allowed_characters() {
        assert_eq!(
            sanitize_filename("Rust 1.80 (stable) [release]_notes-x", 100),
            "Rust 180 (stable) [release]_notes-x"
        );
    }

    #[test]
    fn test_strips_path_separators() {
        let name = sanitize_filename("../../etc/passwd", 50);
        assert!(!name.contains('/'));
        assert!(!name.contains('\\'));
        assert_eq!(name, "etcpasswd");

        let name = sanitize_filename(r"C:\Windows\System32", 50);
        assert_eq!(name, "CWindowsSystem32");
    }

    #[test]
    fn test_truncates_to_bound() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_filename(&long, 50).chars().count(), 50);

        // Multi-byte characters count as one each
        let wide = "é".repeat(80);
        assert_eq!(sanitize_filename(&wide, 50).chars().count(), 50);
    }

    #[test]
    fn test_placeholder_for_empty_and_disallowed() {
        assert_eq!(sanitize_filename("", 50), PLACEHOLDER_NAME);
        assert_eq!(sanitize_filename("???///***", 50), PLACEHOLDER_NAME);
        assert_eq!(sanitize_filename("   ", 50), PLACEHOLDER_NAME);
    }

    #[test]
    fn test_no_trailing_space_after_truncation() {
        assert_eq!(sanitize_filename("abc def", 4), "abc");
    }

    #[test]
    fn test_deterministic_and_bounded_for_arbitrary_input() {
        let samples = [
            "Mars Rover Update",
            "What's new in Tokio? / Part 2",
            "\0\n\t",
            ".",
            "..",
            "日本語のタイトル: テスト",
            "emoji 🚀 launch",
        ];
        for sample in samples {
            let a = sanitize_filename(sample, DEFAULT_MAX_NAME_LEN);
            let b = sanitize_filename(sample, DEFAULT_MAX_NAME_LEN);
            assert_eq!(a, b);
            assert!(!a.is_empty());
            assert!(a.chars().count() <= DEFAULT_MAX_NAME_LEN);
            assert!(!a.contains('/') && !a.contains('\\'));
            assert!(a != "." && a != "..");
        }
    }
}
