//! Media conversion engine.
//!
//! Encodes the audio byte stream coming from the source into MP3 with ffmpeg.
//! The stream is piped straight into ffmpeg's stdin; nothing is staged on disk
//! except the encoder's own output file.

pub mod audio;

use thiserror::Error;

pub use audio::{FfmpegTranscoder, TranscodeJob, Transcoder};

/// Errors that can occur during conversion
#[derive(Error, Debug)]
pub enum ConversionError {
    /// ffmpeg could not be started or exited unsuccessfully
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// The input stream failed before it was fully consumed
    #[error("source stream failed: {0}")]
    Source(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// Check if ffmpeg is available
pub async fn check_ffmpeg(ffmpeg_bin: &str) -> bool {
    tokio::process::Command::new(ffmpeg_bin)
        .arg("-version")
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}
