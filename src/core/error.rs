use serde::Serialize;
use thiserror::Error;

use crate::conversion::ConversionError;
use crate::core::validation::ValidationError;
use crate::download::error::DownloadError;

/// Caller-facing error taxonomy.
///
/// `BadRequest` is surfaced with a 4xx status and a precise message; the other
/// kinds are surfaced as a generic 5xx and detailed only in server logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr)]
pub enum ErrorKind {
    BadRequest,
    UpstreamError,
    TranscodeError,
    InternalError,
}

/// Centralized error type for the pipeline.
///
/// Every failure of a request is converted to this enum and reported once.
///
/// # Example
///
/// ```
/// use doramp3::core::error::{AppError, ErrorKind};
///
/// let err = AppError::MissingLocator;
/// assert_eq!(err.kind(), ErrorKind::BadRequest);
/// assert_eq!(err.public_message(), "missing required field");
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Request carried no resource locator
    #[error("missing required field")]
    MissingLocator,

    /// Locator does not have the platform URL shape
    #[error("invalid resource URL: {0}")]
    InvalidLocator(#[from] ValidationError),

    /// Request body was not valid JSON
    #[error("invalid JSON body: {0}")]
    InvalidBody(String),

    /// Metadata fetch or stream open failed on the platform side
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Encoding failed (includes source errors surfacing mid-transcode)
    #[error("Transcode error: {0}")]
    Conversion(#[from] ConversionError),

    /// Stream + transcode exceeded the configured bound
    #[error("Pipeline timed out after {0}s")]
    Timeout(u64),

    /// Filesystem errors outside the transcoder (output dir, final rename)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Generic message returned for every non-caller error.
pub const GENERIC_FAILURE_MESSAGE: &str = "failed to process the download, check the server logs for details";

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MissingLocator | AppError::InvalidLocator(_) | AppError::InvalidBody(_) => ErrorKind::BadRequest,
            AppError::Download(_) => ErrorKind::UpstreamError,
            AppError::Conversion(_) | AppError::Timeout(_) => ErrorKind::TranscodeError,
            AppError::Io(_) => ErrorKind::InternalError,
        }
    }

    /// Message safe to return to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::MissingLocator => "missing required field",
            AppError::InvalidLocator(_) => "invalid resource URL",
            AppError::InvalidBody(_) => "invalid JSON body",
            _ => GENERIC_FAILURE_MESSAGE,
        }
    }

    /// Kind reported on the wire: caller errors keep theirs, everything else is internal.
    pub fn public_kind(&self) -> ErrorKind {
        match self.kind() {
            ErrorKind::BadRequest => ErrorKind::BadRequest,
            _ => ErrorKind::InternalError,
        }
    }
}
