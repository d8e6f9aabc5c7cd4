//! Display-name sanitization for storage object names

use thiserror::Error;

/// Longest accepted filename, in characters
pub const MAX_FILENAME_CHARS: usize = 255;

/// Characters that are never allowed in an object name; each is replaced by `_`
const REPLACED_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Why a filename was refused
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FilenameRejection {
    /// Contains a `..` sequence
    #[error("filename contains a relative path sequence")]
    RelativePath,

    /// Starts with `.` (hidden file or relative path)
    #[error("filename starts with a dot")]
    LeadingDot,

    /// Longer than [`MAX_FILENAME_CHARS`]
    #[error("filename is longer than {MAX_FILENAME_CHARS} characters")]
    TooLong,

    /// Empty or whitespace only
    #[error("filename is blank")]
    Blank,
}

/// Turns a user supplied display name into a name that is safe to use as a
/// storage object name.
///
/// Path separators and characters reserved on common filesystems are replaced
/// with `_`. The result is trimmed and never contains `..`, never starts with
/// `.` and is at most [`MAX_FILENAME_CHARS`] long. Applying it to its own
/// output returns the same name.
///
/// # Errors
///
/// Returns the first [`FilenameRejection`] that applies.
pub fn sanitize_filename(raw: &str) -> Result<String, FilenameRejection> {
    let replaced: String = raw
        .chars()
        .map(|c| if REPLACED_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if replaced.contains("..") {
        return Err(FilenameRejection::RelativePath);
    }

    // checked after trimming too, so " .env" cannot come out as ".env"
    let trimmed = replaced.trim();
    if replaced.starts_with('.') || trimmed.starts_with('.') {
        return Err(FilenameRejection::LeadingDot);
    }

    if replaced.chars().count() > MAX_FILENAME_CHARS {
        return Err(FilenameRejection::TooLong);
    }

    if trimmed.is_empty() {
        return Err(FilenameRejection::Blank);
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_pass_through() {
        assert_eq!(sanitize_filename("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename("photos 2024.zip").unwrap(), "photos 2024.zip");
        assert_eq!(sanitize_filename("議事録.docx").unwrap(), "議事録.docx");
    }

    #[test]
    fn test_reserved_characters_are_replaced() {
        assert_eq!(sanitize_filename("a/b.txt").unwrap(), "a_b.txt");
        assert_eq!(sanitize_filename("a\\b.txt").unwrap(), "a_b.txt");
        assert_eq!(
            sanitize_filename("what?*:\"<>|.txt").unwrap(),
            "what_______.txt"
        );
        assert_eq!(sanitize_filename("/etc/passwd").unwrap(), "_etc_passwd");
    }

    #[test]
    fn test_traversal_is_rejected() {
        for name in ["../etc/passwd", "..\\windows\\system32", "a/../b", "notes..txt", ".."] {
            assert_eq!(
                sanitize_filename(name),
                Err(FilenameRejection::RelativePath),
                "{name}"
            );
        }
    }

    #[test]
    fn test_leading_dot_is_rejected() {
        assert_eq!(sanitize_filename(".env"), Err(FilenameRejection::LeadingDot));
        assert_eq!(sanitize_filename(".bashrc"), Err(FilenameRejection::LeadingDot));
        assert_eq!(sanitize_filename("  .hidden"), Err(FilenameRejection::LeadingDot));
    }

    #[test]
    fn test_length_limit() {
        let at_limit = format!("{}.txt", "a".repeat(MAX_FILENAME_CHARS - 4));
        assert_eq!(sanitize_filename(&at_limit).unwrap(), at_limit);

        let over_limit = format!("{}.txt", "a".repeat(MAX_FILENAME_CHARS - 3));
        assert_eq!(sanitize_filename(&over_limit), Err(FilenameRejection::TooLong));

        // counted in characters, not bytes
        let multibyte = "é".repeat(MAX_FILENAME_CHARS);
        assert!(sanitize_filename(&multibyte).is_ok());
    }

    #[test]
    fn test_blank_is_rejected() {
        assert_eq!(sanitize_filename(""), Err(FilenameRejection::Blank));
        assert_eq!(sanitize_filename("   \t"), Err(FilenameRejection::Blank));
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(sanitize_filename("  a.txt  ").unwrap(), "a.txt");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "report.pdf",
            "  spaced name.txt ",
            "a/b\\c:d*e?f\"g<h>i|j.bin",
            "/leading-slash.png",
            "trailing.",
            "x",
        ];

        for input in inputs {
            let once = sanitize_filename(input).unwrap();
            let twice = sanitize_filename(&once).unwrap();
            assert_eq!(once, twice, "{input}");
        }
    }
}
