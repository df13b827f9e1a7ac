//! Mock implementations of the pipeline collaborators
//!
//! This module provides mock implementations of yt-dlp and ffmpeg so the
//! pipeline and the HTTP intake can be tested without network or binaries.

pub mod mock_downloader;
pub mod mock_transcoder;

#[allow(unused_imports)]
pub use mock_downloader::{MockResolver, MockSource, MockSourceConfig};
#[allow(unused_imports)]
pub use mock_transcoder::MockTranscoder;
