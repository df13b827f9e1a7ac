//! YtDlpAudioSource — streams the audio-only track through yt-dlp's stdout.
//!
//! yt-dlp writes the media bytes to stdout (`-o -`) and, with `--newline`, one
//! progress line per update to stderr using our own template, which keeps the
//! parser independent of yt-dlp's human-readable progress format.

use crate::core::metrics;
use crate::download::cookies::CredentialHandle;
use crate::download::error::DownloadError;
use crate::download::metadata::add_cookies_args;
use crate::download::source::{AudioByteStream, AudioSource, ProgressReceiver, SourceProgress};
use crate::download::ytdlp_errors::{analyze_ytdlp_error, get_fix_recommendations};
use async_trait::async_trait;
use futures_util::{future, stream, StreamExt};
use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

/// Prefix of every progress line we ask yt-dlp to print.
const PROGRESS_MARKER: &str = "doramp3-progress";

/// Template passed to `--progress-template`.
const PROGRESS_TEMPLATE: &str = "download:doramp3-progress %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

/// How much stderr we keep for error classification
const STDERR_TAIL_LINES: usize = 200;

/// Read size for stdout chunks
const CHUNK_SIZE: usize = 64 * 1024;

/// Parses one of our progress-template lines.
///
/// Format: `doramp3-progress <downloaded> <total> <estimate>`, where yt-dlp
/// prints `NA` for unknown values and sometimes floats for estimates.
/// The exact total wins over the estimate; only an exact total is flagged
/// as such, since estimates often fall short of the real size.
pub fn parse_progress_line(line: &str) -> Option<SourceProgress> {
    let mut parts = line.trim().split_whitespace();
    if parts.next()? != PROGRESS_MARKER {
        return None;
    }

    let downloaded_bytes = parse_byte_count(parts.next()?)?;
    let exact = parts.next().and_then(parse_byte_count).filter(|t| *t > 0);
    let estimate = parts.next().and_then(parse_byte_count).filter(|t| *t > 0);

    Some(SourceProgress {
        downloaded_bytes,
        total_bytes: exact.or(estimate),
        total_is_exact: exact.is_some(),
    })
}

fn parse_byte_count(raw: &str) -> Option<u64> {
    if raw.eq_ignore_ascii_case("NA") || raw.eq_ignore_ascii_case("None") {
        return None;
    }
    let value: f64 = raw.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value.round() as u64)
    } else {
        None
    }
}

/// Builds the yt-dlp argument list for streaming `locator` to stdout.
pub fn build_stream_args(locator: &str, cookies_args: Vec<String>) -> Vec<String> {
    let mut args: Vec<String> = [
        "-f",
        "bestaudio",
        "--no-playlist",
        "--no-part",
        "--newline",
        "--progress",
        "--progress-template",
        PROGRESS_TEMPLATE,
        "-o",
        "-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.extend(cookies_args);
    args.push(locator.to_string());
    args
}

/// Drains yt-dlp's stderr: progress lines go to the channel, the rest is kept
/// (last `STDERR_TAIL_LINES`) for error classification.
async fn pump_stderr(stderr: ChildStderr, progress_tx: mpsc::UnboundedSender<SourceProgress>) -> String {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(progress) = parse_progress_line(&line) {
            // Receiver gone means the request was abandoned; keep draining anyway
            let _ = progress_tx.send(progress);
            continue;
        }
        log::debug!("yt-dlp stderr: {}", line);
        tail.push_back(line);
        if tail.len() > STDERR_TAIL_LINES {
            tail.pop_front();
        }
    }

    Vec::from(tail).join("\n")
}

/// Audio source powered by yt-dlp.
pub struct YtDlpAudioSource {
    ytdl_bin: String,
    credentials: CredentialHandle,
}

impl YtDlpAudioSource {
    pub fn new(ytdl_bin: impl Into<String>, credentials: CredentialHandle) -> Self {
        Self {
            ytdl_bin: ytdl_bin.into(),
            credentials,
        }
    }
}

#[async_trait]
impl AudioSource for YtDlpAudioSource {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn open(&self, locator: &str) -> Result<(AudioByteStream, ProgressReceiver), DownloadError> {
        let mut cookies_args = Vec::new();
        if let Err(e) = add_cookies_args(&mut cookies_args, &self.credentials) {
            // Metadata resolution already required credentials; stream without them
            log::warn!("Streaming without cookies: {}", e);
        }
        let args = build_stream_args(locator, cookies_args);

        log::info!("Opening audio stream: {} {}", self.ytdl_bin, args.join(" "));
        let timer = metrics::start_ytdlp_timer("stream");

        let mut child = Command::new(&self.ytdl_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::Process(format!("failed to spawn yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Process("yt-dlp stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Process("yt-dlp stderr was not captured".to_string()))?;

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let stderr_task = tokio::spawn(pump_stderr(stderr, progress_tx));

        let body = ReaderStream::with_capacity(stdout, CHUNK_SIZE).inspect(|chunk| {
            if let Ok(bytes) = chunk {
                metrics::record_bytes_received(bytes.len() as u64);
            }
        });

        // Runs once stdout is exhausted: a non-zero exit turns into a trailing error
        // so a truncated transfer never looks like a complete one.
        let exit_check = stream::once(async move {
            let _timer = timer;
            let status = child.wait().await;
            let stderr_text = stderr_task.await.unwrap_or_default();
            match status {
                Ok(status) if status.success() => None,
                Ok(status) => {
                    let error_type = analyze_ytdlp_error(&stderr_text);
                    log::error!(
                        "yt-dlp stream exited with {} ({}): {}",
                        status,
                        error_type.as_ref(),
                        stderr_text
                    );
                    log::error!("Fix: {}", get_fix_recommendations(error_type));
                    Some(Err(std::io::Error::other(format!(
                        "yt-dlp exited with {} ({})",
                        status,
                        error_type.as_ref()
                    ))))
                }
                Err(e) => Some(Err(e)),
            }
        })
        .filter_map(future::ready);

        let stream: AudioByteStream = Box::pin(body.chain(exit_check));
        Ok((stream, progress_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_progress_exact_total() {
        let p = parse_progress_line("doramp3-progress 4096 10240 NA").unwrap();
        assert_eq!(
            p,
            SourceProgress {
                downloaded_bytes: 4096,
                total_bytes: Some(10240),
                total_is_exact: true,
            }
        );
    }

    #[test]
    fn test_parse_progress_falls_back_to_estimate() {
        let p = parse_progress_line("doramp3-progress 100 NA 2000.7").unwrap();
        assert_eq!(p.total_bytes, Some(2001));
        assert!(!p.total_is_exact);
    }

    #[test]
    fn test_parse_progress_unknown_total() {
        let p = parse_progress_line("doramp3-progress 100 NA NA").unwrap();
        assert_eq!(p.downloaded_bytes, 100);
        assert_eq!(p.total_bytes, None);
        assert!(!p.total_is_exact);
    }

    #[test]
    fn test_parse_progress_ignores_other_lines() {
        assert!(parse_progress_line("[youtube] abc: Downloading webpage").is_none());
        assert!(parse_progress_line("[download]  40.0% of 3.00MiB").is_none());
        assert!(parse_progress_line("doramp3-progress NA NA NA").is_none());
        assert!(parse_progress_line("").is_none());
    }

    #[test]
    fn test_build_stream_args() {
        let args = build_stream_args(
            "https://youtu.be/dQw4w9WgXcQ",
            vec!["--cookies".to_string(), "/tmp/c.txt".to_string()],
        );
        assert_eq!(args.first().map(String::as_str), Some("-f"));
        assert!(args.windows(2).any(|w| w[0] == "-o" && w[1] == "-"));
        assert!(args.windows(2).any(|w| w[0] == "--cookies" && w[1] == "/tmp/c.txt"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/dQw4w9WgXcQ"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_process_ends_stream_with_error() {
        use crate::download::cookies::CredentialState;

        // `false` ignores its arguments and exits 1 without output
        let source = YtDlpAudioSource::new("false", CredentialHandle::fixed(CredentialState::Unavailable("none".into())));
        let (mut stream, mut progress) = source.open("https://youtu.be/dQw4w9WgXcQ").await.unwrap();

        let mut last = None;
        while let Some(item) = stream.next().await {
            last = Some(item);
        }
        assert!(matches!(last, Some(Err(_))));
        assert!(progress.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_open() {
        use crate::download::cookies::CredentialState;

        let source = YtDlpAudioSource::new(
            "/nonexistent/doramp3/yt-dlp",
            CredentialHandle::fixed(CredentialState::Unavailable("none".into())),
        );
        let result = source.open("https://youtu.be/dQw4w9WgXcQ").await;
        assert!(matches!(result, Err(DownloadError::Process(_))));
    }
}
