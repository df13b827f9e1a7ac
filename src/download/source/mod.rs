//! Audio source abstraction.
//!
//! Provides the `AudioSource` trait: open a locator as a chunked byte stream of
//! the audio-only track plus a separate channel of progress observations.
//! The stream is never buffered whole; the transcoder pulls from it directly.
//!
//! Built-in backend:
//! - `YtDlpAudioSource` — `yt-dlp -f bestaudio -o -` with progress on stderr

pub mod ytdlp;

use crate::download::error::DownloadError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;
use tokio::sync::mpsc;

pub use ytdlp::YtDlpAudioSource;

/// Progress information emitted while the stream is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceProgress {
    /// Bytes downloaded so far
    pub downloaded_bytes: u64,
    /// Total bytes expected, when the platform reports it
    pub total_bytes: Option<u64>,
    /// `total_bytes` is the exact size rather than an estimate
    pub total_is_exact: bool,
}

/// Chunked audio bytes. A transfer that ends badly yields an `Err` as its last item.
pub type AudioByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Receiving half of a source's progress channel (single consumer).
pub type ProgressReceiver = mpsc::UnboundedReceiver<SourceProgress>;

/// Trait for audio source implementations.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Human-readable name of this source (e.g., "yt-dlp")
    fn name(&self) -> &str;

    /// Opens the audio-only track of `locator`.
    ///
    /// Fails with a `DownloadError` when the transfer cannot be started.
    /// Errors after that point surface through the stream itself.
    async fn open(&self, locator: &str) -> Result<(AudioByteStream, ProgressReceiver), DownloadError>;
}
