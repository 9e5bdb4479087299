//! YouTube URL classification.
//!
//! Pure string processing: no network calls, deterministic, no side
//! effects. The pattern recognizes the known URL shapes (`youtu.be/<id>`,
//! `/v/<id>`, `/u/<w>/<id>`, `/embed/<id>`, `watch?v=<id>`, `&v=<id>`)
//! and captures the candidate id up to the next `#`, `&` or `?`.

use std::sync::LazyLock;

use regex::Regex;

static YOUTUBE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*)").expect("valid URL pattern")
});

/// Extract the opaque video identifier from a candidate URL, if the URL
/// matches one of the recognized shapes and carries a non-empty id.
pub fn video_id(raw: &str) -> Option<&str> {
    let caps = YOUTUBE_URL_REGEX.captures(raw.trim())?;
    let id = caps.get(2)?.as_str();
    if id.is_empty() { None } else { Some(id) }
}

/// Whether the input matches the recognized YouTube URL shapes. Empty or
/// whitespace-only input is invalid.
pub fn is_valid(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && YOUTUBE_URL_REGEX.is_match(trimmed)
}

/// Structural well-formedness: a parseable absolute URL. The API layer
/// requires this in addition to the shape match, so a string that matches
/// the pattern but is not itself a well-formed absolute URL is rejected.
pub fn is_well_formed(raw: &str) -> bool {
    url::Url::parse(raw.trim()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_shapes() {
        let urls = [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/u/w/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
        ];
        for url in urls {
            assert!(is_valid(url), "should accept {url}");
            assert_eq!(video_id(url), Some("dQw4w9WgXcQ"), "id from {url}");
        }
    }

    #[test]
    fn rejects_non_youtube_strings() {
        for s in [
            "",
            "   ",
            "https://example.com/watch",
            "https://vimeo.com/12345",
            "not a url at all",
        ] {
            assert!(!is_valid(s), "should reject {s:?}");
            assert_eq!(video_id(s), None);
        }
    }

    #[test]
    fn capture_stops_at_delimiters() {
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=abc123#t=30"),
            Some("abc123")
        );
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=abc123&list=PL1"),
            Some("abc123")
        );
        assert_eq!(video_id("https://youtu.be/abc123?si=xyz"), Some("abc123"));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        assert!(is_valid("  https://youtu.be/dQw4w9WgXcQ  "));
    }

    #[test]
    fn well_formedness_is_separate_from_shape() {
        // Matches the shape but is not an absolute URL.
        let relative = "watch?v=dQw4w9WgXcQ";
        assert!(is_valid(relative));
        assert!(!is_well_formed(relative));

        assert!(is_well_formed("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
    }
}
