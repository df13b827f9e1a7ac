//! Classification of yt-dlp failures.
//!
//! Only used for server-side logs and metrics labels; callers always get a
//! generic message.

/// yt-dlp error types
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum YtDlpErrorType {
    /// Cookies are invalid or have been rotated
    InvalidCookies,
    /// The platform flagged the request as automated
    BotDetection,
    /// Private, removed, age-restricted or region-blocked video
    VideoUnavailable,
    /// Timeouts, DNS, connection resets
    NetworkError,
    Unknown,
}

/// Analyzes yt-dlp stderr and determines the error type
pub fn analyze_ytdlp_error(stderr: &str) -> YtDlpErrorType {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("cookies are no longer valid")
        || stderr_lower.contains("cookies have likely been rotated")
        || stderr_lower.contains("use --cookies-from-browser")
        || stderr_lower.contains("use --cookies for the authentication")
    {
        return YtDlpErrorType::InvalidCookies;
    }

    if stderr_lower.contains("sign in to confirm you're not a bot")
        || stderr_lower.contains("http error 403")
        || stderr_lower.contains("unable to extract")
        || stderr_lower.contains("signature extraction failed")
    {
        return YtDlpErrorType::BotDetection;
    }

    if stderr_lower.contains("private video")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("this video is not available")
        || stderr_lower.contains("video has been removed")
        || stderr_lower.contains("confirm your age")
        || stderr_lower.contains("age-restricted")
    {
        return YtDlpErrorType::VideoUnavailable;
    }

    if stderr_lower.contains("timed out")
        || stderr_lower.contains("timeout")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network")
        || stderr_lower.contains("dns")
        || stderr_lower.contains("failed to connect")
    {
        return YtDlpErrorType::NetworkError;
    }

    YtDlpErrorType::Unknown
}

/// Fix hints written next to the error in the server log.
pub fn get_fix_recommendations(error_type: YtDlpErrorType) -> &'static str {
    match error_type {
        YtDlpErrorType::InvalidCookies => {
            "Re-export the cookies file (JSON or Netscape format) from a logged-in browser and send SIGHUP to reload it"
        }
        YtDlpErrorType::BotDetection => "Refresh cookies or update yt-dlp (`yt-dlp -U`)",
        YtDlpErrorType::VideoUnavailable => "Nothing to fix server-side: the video is private, removed or restricted",
        YtDlpErrorType::NetworkError => "Check outbound connectivity from this host",
        YtDlpErrorType::Unknown => "Inspect the yt-dlp stderr above",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_invalid_cookies() {
        let stderr = "ERROR: The provided YouTube account cookies are no longer valid.";
        assert_eq!(analyze_ytdlp_error(stderr), YtDlpErrorType::InvalidCookies);
    }

    #[test]
    fn test_analyze_bot_detection() {
        let stderr = "ERROR: [youtube] abc: Sign in to confirm you're not a bot";
        assert_eq!(analyze_ytdlp_error(stderr), YtDlpErrorType::BotDetection);
        assert_eq!(analyze_ytdlp_error("HTTP Error 403: Forbidden"), YtDlpErrorType::BotDetection);
    }

    #[test]
    fn test_analyze_unavailable() {
        assert_eq!(
            analyze_ytdlp_error("ERROR: [youtube] abc: Video unavailable"),
            YtDlpErrorType::VideoUnavailable
        );
        assert_eq!(
            analyze_ytdlp_error("Sign in to confirm your age. This video may be inappropriate"),
            YtDlpErrorType::VideoUnavailable
        );
    }

    #[test]
    fn test_analyze_network() {
        assert_eq!(
            analyze_ytdlp_error("urlopen error [Errno 110] Connection timed out"),
            YtDlpErrorType::NetworkError
        );
    }

    #[test]
    fn test_analyze_unknown() {
        assert_eq!(analyze_ytdlp_error("something odd"), YtDlpErrorType::Unknown);
    }

    #[test]
    fn test_as_ref_is_snake_case() {
        assert_eq!(YtDlpErrorType::InvalidCookies.as_ref(), "invalid_cookies");
        assert_eq!(YtDlpErrorType::Unknown.as_ref(), "unknown");
    }
}
