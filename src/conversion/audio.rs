//! Audio stream to MP3 conversion
//!
//! Feeds a byte stream into `ffmpeg -i pipe:0` and writes a CBR MP3 with the
//! title tag set. The transcoder owns the ffmpeg child for the whole run and
//! reaps it on every path.

use super::{ConversionError, ConversionResult};
use crate::download::source::AudioByteStream;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// One encoding job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    /// File ffmpeg writes to (a partial file, renamed by the caller on success)
    pub output_path: PathBuf,
    /// Embedded as the `title` metadata tag
    pub title: String,
    pub bitrate_kbps: u32,
}

/// Consumes an audio stream and produces an encoded file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the number of input bytes consumed once the output is flushed and closed.
    async fn transcode(&self, input: AudioByteStream, job: &TranscodeJob) -> ConversionResult<u64>;
}

/// Builds the ffmpeg argument list for a job.
pub fn build_ffmpeg_args(job: &TranscodeJob) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        "pipe:0".to_string(),
        "-vn".to_string(),
        "-acodec".to_string(),
        "libmp3lame".to_string(),
        "-b:a".to_string(),
        format!("{}k", job.bitrate_kbps),
        "-metadata".to_string(),
        format!("title={}", job.title),
        "-f".to_string(),
        "mp3".to_string(),
        job.output_path.to_string_lossy().into_owned(),
    ]
}

/// Transcoder backed by an ffmpeg binary.
pub struct FfmpegTranscoder {
    ffmpeg_bin: String,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, mut input: AudioByteStream, job: &TranscodeJob) -> ConversionResult<u64> {
        let args = build_ffmpeg_args(job);
        log::debug!("ffmpeg command: {} {}", self.ffmpeg_bin, args.join(" "));

        let mut child = Command::new(&self.ffmpeg_bin)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConversionError::Ffmpeg(format!("failed to spawn {}: {}", self.ffmpeg_bin, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConversionError::Ffmpeg("ffmpeg stdin was not captured".to_string()))?;
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text).await;
                text
            })
        });

        let mut consumed: u64 = 0;
        let mut write_error = None;
        while let Some(chunk) = input.next().await {
            match chunk {
                Ok(bytes) => {
                    if let Err(e) = stdin.write_all(&bytes).await {
                        write_error = Some(e);
                        break;
                    }
                    consumed += bytes.len() as u64;
                }
                Err(e) => {
                    log::warn!("Source stream failed after {} bytes: {}", consumed, e);
                    drop(stdin);
                    let _ = child.kill().await;
                    return Err(ConversionError::Source(e));
                }
            }
        }

        // Closing stdin lets ffmpeg see EOF and finish the file
        if write_error.is_none() {
            if let Err(e) = stdin.shutdown().await {
                write_error = Some(e);
            }
        }
        drop(stdin);

        let status = child.wait().await?;
        let stderr_text = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            log::error!("ffmpeg exited with {}: {}", status, stderr_text.trim());
            return Err(ConversionError::Ffmpeg(format!("ffmpeg exited with {}", status)));
        }
        if let Some(e) = write_error {
            // ffmpeg closed its input early but still reported success
            return Err(ConversionError::Io(e));
        }

        log::info!(
            "Encoded {} input bytes to {}",
            consumed,
            job.output_path.display()
        );
        Ok(consumed)
    }
}
