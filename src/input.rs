//! Input normalization for the Source Reference.
//!
//! Raw strings arrive from several entry channels (typing, paste, clipboard
//! polling, drag-and-drop, deep links). Passive channels only produce a new
//! Source Reference when the text matches the supported site; typed input is
//! accepted verbatim and validity gates the submit action instead.

use regex::Regex;
use url::Url;

/// Canonical watch-URL prefix used when rewriting bare video identifiers.
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// How a candidate Source Reference reached the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputChannel {
    /// Keystroke-by-keystroke edits of the input field.
    Typed,
    /// Explicit paste action, treated like typing.
    Pasted,
    /// Clipboard auto-read on window focus.
    Clipboard,
    /// Drag-and-drop drop event.
    Dropped,
    /// Path segment from deep-link routing.
    DeepLink,
}

impl InputChannel {
    /// Passive channels must pass the recognizer before replacing the
    /// current Source Reference.
    pub fn is_passive(self) -> bool {
        matches!(self, InputChannel::Clipboard | InputChannel::Dropped)
    }
}

/// Returns `true` when the text matches the supported site's domain patterns:
/// the canonical domain (with common subdomains) or the short-link domain.
pub fn is_supported_url(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Forgiving recognizer: scheme and "www." are optional, but the host and
    // some path/query must be present. `Url` does stricter parsing later.
    let re = match Regex::new(r"^(https?://)?((www|m|music)\.)?(youtube\.com|youtu\.be)/.+") {
        Ok(r) => r,
        Err(_) => return false, // If regex fails to compile (shouldn't), fail safely.
    };

    re.is_match(trimmed)
}

/// Normalize a recognized candidate into a canonical http(s) URL string.
///
/// Rules:
/// - Adds `https://` when the scheme is missing
/// - Rejects non-http(s) schemes
/// - Strips URL fragments (not meaningful for downloads)
pub fn normalize_candidate(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme).ok()?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    url.set_fragment(None);

    Some(url.to_string())
}

/// Deep-link ingestion: a path segment that does not already carry a
/// recognized site domain is treated as a raw video identifier and rewritten
/// into a canonical watch URL. Already-qualified input passes through as-is.
pub fn rewrite_deep_link(segment: &str) -> Option<String> {
    let trimmed = segment.trim().trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.contains("youtube.com") || trimmed.contains("youtu.be") {
        return Some(trimmed.to_string());
    }

    Some(format!("{WATCH_URL_PREFIX}{trimmed}"))
}

/// Apply the per-channel acceptance policy to a raw string.
///
/// Returns the new Source Reference value, or `None` when the input must not
/// replace the current reference. Clipboard read failures are modeled by the
/// caller simply not calling this, or passing the empty string; either way no
/// error surfaces.
pub fn accept(channel: InputChannel, text: &str) -> Option<String> {
    match channel {
        // Typed/pasted text is taken verbatim; validity is computed
        // continuously to gate the submit action, not acceptance.
        InputChannel::Typed | InputChannel::Pasted => Some(text.trim().to_string()),
        InputChannel::Clipboard | InputChannel::Dropped => {
            let trimmed = text.trim();
            if is_supported_url(trimmed) {
                normalize_candidate(trimmed)
            } else {
                None
            }
        }
        InputChannel::DeepLink => rewrite_deep_link(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_canonical_and_short_link_domains() {
        assert!(is_supported_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_supported_url("http://youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_supported_url("youtu.be/dQw4w9WgXcQ"));
        assert!(is_supported_url("https://m.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_supported_url("https://music.youtube.com/watch?v=abc123"));
    }

    #[test]
    fn rejects_other_sites_and_noise() {
        assert!(!is_supported_url("https://vimeo.com/12345"));
        assert!(!is_supported_url("just some text"));
        assert!(!is_supported_url(""));
        assert!(!is_supported_url("https://youtu.be/"));
    }

    #[test]
    fn normalizes_scheme_and_strips_fragment() {
        assert_eq!(
            normalize_candidate("youtube.com/watch?v=1#t=10").as_deref(),
            Some("https://youtube.com/watch?v=1")
        );
        assert_eq!(normalize_candidate("ftp://youtube.com/watch?v=1"), None);
    }

    #[test]
    fn bare_identifier_is_rewritten_to_watch_url() {
        assert_eq!(
            rewrite_deep_link("dQw4w9WgXcQ").as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
    }

    #[test]
    fn qualified_short_link_passes_through_unmodified() {
        assert_eq!(
            rewrite_deep_link("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
    }

    #[test]
    fn typed_input_is_accepted_verbatim_even_when_invalid() {
        assert_eq!(
            accept(InputChannel::Typed, "not a url").as_deref(),
            Some("not a url")
        );
        assert_eq!(accept(InputChannel::Typed, "").as_deref(), Some(""));
    }

    #[test]
    fn passive_channels_require_recognition() {
        assert_eq!(accept(InputChannel::Clipboard, "https://example.com/x"), None);
        assert_eq!(accept(InputChannel::Dropped, "random text"), None);
        assert_eq!(
            accept(InputChannel::Clipboard, "https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ")
        );
    }
}
