//! doramp3 - fetch a video's audio track and transcode it to MP3
//!
//! The library exposes the download pipeline and the HTTP intake that
//! serves it.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, audit records, logging, metrics, HTTP server
//! - `download`: Credentials, metadata, audio source, progress and the pipeline
//! - `conversion`: ffmpeg MP3 encoding
//! - `storage`: Output directory layout and partial-file handling

pub mod cli;
pub mod conversion;
pub mod core;
pub mod download;
pub mod storage;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{AppError, ErrorKind};
pub use download::{Pipeline, PipelineRequest, PipelineResult};
