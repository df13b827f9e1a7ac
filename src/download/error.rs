use thiserror::Error;

use crate::download::ytdlp_errors::YtDlpErrorType;

/// Structured error type for platform-side operations (metadata + stream open).
#[derive(Debug, Error)]
pub enum DownloadError {
    /// yt-dlp ran and reported a failure
    #[error("yt-dlp failed ({error_type:?}): {stderr}")]
    YtDlp { error_type: YtDlpErrorType, stderr: String },

    /// Credential material missing or unusable
    #[error("credential material unavailable: {0}")]
    Credentials(String),

    /// Command did not finish in time
    #[error("{0}")]
    Timeout(String),

    /// Process could not be started or its pipes were unavailable
    #[error("{0}")]
    Process(String),

    /// yt-dlp answered but the payload was not usable
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl DownloadError {
    /// Label for `doramp3_download_errors_total`
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::YtDlp { error_type, .. } => (*error_type).into(),
            DownloadError::Credentials(_) => "credentials",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::Process(_) => "process",
            DownloadError::InvalidMetadata(_) => "invalid_metadata",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcategory() {
        let err = DownloadError::YtDlp {
            error_type: YtDlpErrorType::VideoUnavailable,
            stderr: "ERROR: Video unavailable".into(),
        };
        assert_eq!(err.subcategory(), "video_unavailable");
        let unknown = DownloadError::YtDlp {
            error_type: YtDlpErrorType::Unknown,
            stderr: String::new(),
        };
        assert_eq!(unknown.subcategory(), "unknown");
        assert_eq!(DownloadError::Timeout("t".into()).subcategory(), "timeout");
        assert_eq!(DownloadError::Credentials("c".into()).subcategory(), "credentials");
    }

    #[test]
    fn test_display_includes_stderr() {
        let err = DownloadError::YtDlp {
            error_type: YtDlpErrorType::NetworkError,
            stderr: "connection reset".into(),
        };
        assert!(err.to_string().contains("connection reset"));
        assert!(err.to_string().contains("NetworkError"));
    }
}
