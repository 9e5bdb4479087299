//! Filename sanitization for download attachments.
//!
//! Video titles end up in `Content-Disposition` headers and on disk, so
//! anything outside a conservative safe set is replaced before use.

/// Characters allowed through unchanged, besides ASCII alphanumerics.
const SAFE_PUNCTUATION: &[char] = &['.', '_', '-', ' '];

/// Sanitize a video title for use as a filename.
///
/// Keeps ASCII alphanumerics, dots, underscores, hyphens, and spaces;
/// every other character (including control characters and path
/// separators) becomes an underscore, with runs collapsed into one.
/// Leading and trailing spaces, dots, and replacement underscores are
/// trimmed. An input that sanitizes to nothing yields `"video"`.
///
/// # Examples
///
/// ```
/// use fetchtube::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("My Video: Part 1"), "My Video_ Part 1");
/// assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
/// assert_eq!(sanitize_filename(""), "video");
/// ```
pub fn sanitize_filename(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut last_was_replacement = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() || SAFE_PUNCTUATION.contains(&c) {
            result.push(c);
            last_was_replacement = false;
        } else if !last_was_replacement {
            result.push('_');
            last_was_replacement = true;
        }
    }

    // Leading/trailing dots, spaces, and replacement underscores make
    // awkward filenames; an all-replaced title falls through to the
    // fallback instead of becoming a bare underscore.
    let trimmed = result.trim_matches(|c| c == ' ' || c == '.' || c == '_');

    if trimmed.is_empty() {
        return "video".to_string();
    }

    trimmed.to_string()
}
