//! Failure classification.
//!
//! Submission failures are mapped by cause, not by exception type, into a
//! fixed set of user-facing messages. Tests assert these verbatim, so the
//! constants are the contract.

use crate::api::ApiError;

pub const MSG_RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
pub const MSG_INVALID_URL: &str = "Invalid YouTube URL. Please check the link and try again.";
pub const MSG_NOT_FOUND: &str = "Video not found. It may be private or removed.";
pub const MSG_FORMAT_UNAVAILABLE: &str =
    "This format is not available for this video. Try a different format or best quality.";
pub const MSG_GENERIC: &str = "Download failed. Please try again.";

pub const MSG_NO_SUBTITLES: &str = "No subtitles available for this video.";
pub const MSG_NO_THUMBNAIL: &str = "Could not fetch thumbnail.";

/// Map a submission failure to its user-facing message.
///
/// Classification order matters: explicit statuses first, then the
/// format-unavailable heuristic on the message body, then the generic
/// fallback.
pub fn classify_submission_error(err: &ApiError) -> &'static str {
    match err {
        ApiError::Status { status: 429, .. } => MSG_RATE_LIMITED,
        ApiError::Status { status: 422, .. } => MSG_INVALID_URL,
        ApiError::Status { status: 404, .. } => MSG_NOT_FOUND,
        other => {
            if other.to_string().to_lowercase().contains("format") {
                MSG_FORMAT_UNAVAILABLE
            } else {
                MSG_GENERIC
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, detail: &str) -> ApiError {
        ApiError::Status {
            status,
            detail: detail.to_string(),
        }
    }

    #[test]
    fn rate_limit_maps_to_wait_and_retry() {
        assert_eq!(
            classify_submission_error(&status(429, "Too Many Requests")),
            MSG_RATE_LIMITED
        );
    }

    #[test]
    fn invalid_input_maps_to_invalid_url() {
        assert_eq!(
            classify_submission_error(&status(422, "Unprocessable Entity")),
            MSG_INVALID_URL
        );
    }

    #[test]
    fn not_found_maps_to_not_found() {
        assert_eq!(
            classify_submission_error(&status(404, "Not Found")),
            MSG_NOT_FOUND
        );
    }

    #[test]
    fn format_mentions_map_to_format_message() {
        assert_eq!(
            classify_submission_error(&status(400, "Unsupported format. Available formats: mp3")),
            MSG_FORMAT_UNAVAILABLE
        );
    }

    #[test]
    fn anything_else_maps_to_generic() {
        assert_eq!(classify_submission_error(&status(500, "boom")), MSG_GENERIC);
        assert_eq!(
            classify_submission_error(&ApiError::InvalidResponse("truncated body".to_string())),
            MSG_GENERIC
        );
    }

    #[test]
    fn explicit_statuses_win_over_format_heuristic() {
        // A 429 whose body happens to mention "format" is still a rate limit.
        assert_eq!(
            classify_submission_error(&status(429, "format quota exceeded")),
            MSG_RATE_LIMITED
        );
    }
}
