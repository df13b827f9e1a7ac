//! Mock metadata resolver and audio source
//!
//! Stand in for yt-dlp: a resolver returning a fixed title and a source that
//! yields a planned sequence of chunks, reporting progress as each chunk is
//! pulled and optionally failing part-way through.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use doramp3::download::error::DownloadError;
use doramp3::download::source::{AudioByteStream, AudioSource, ProgressReceiver, SourceProgress};
use doramp3::download::ytdlp_errors::YtDlpErrorType;
use doramp3::download::{MetadataResolver, VideoMetadata};
use futures_util::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Resolver returning a canned answer and counting calls.
pub struct MockResolver {
    outcome: Result<VideoMetadata, String>,
    calls: AtomicUsize,
    locators: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn with_title(title: &str) -> Self {
        Self {
            outcome: Ok(VideoMetadata {
                title: title.to_string(),
                duration: Some(Duration::from_secs(180)),
                content_length: None,
            }),
            calls: AtomicUsize::new(0),
            locators: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            outcome: Err(stderr.to_string()),
            calls: AtomicUsize::new(0),
            locators: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn locators(&self) -> Vec<String> {
        self.locators.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataResolver for MockResolver {
    async fn resolve(&self, locator: &str) -> Result<VideoMetadata, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.locators.lock().unwrap().push(locator.to_string());
        match &self.outcome {
            Ok(metadata) => Ok(metadata.clone()),
            Err(stderr) => Err(DownloadError::YtDlp {
                error_type: YtDlpErrorType::VideoUnavailable,
                stderr: stderr.clone(),
            }),
        }
    }
}

/// Configuration for the mock source
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    /// Total payload size in bytes
    pub total_bytes: u64,
    /// Size of each yielded chunk
    pub chunk_size: u64,
    /// Fail after this fraction of the payload was delivered
    pub fail_at: Option<f64>,
    /// Whether progress reports carry the total size
    pub report_total: bool,
    /// Report this size as an estimated total instead of the exact one
    pub estimated_total: Option<u64>,
    /// Delay before each chunk
    pub chunk_delay: Option<Duration>,
    /// Refuse to open at all
    pub fail_open: bool,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            total_bytes: 1000,
            chunk_size: 100,
            fail_at: None,
            report_total: true,
            estimated_total: None,
            chunk_delay: None,
            fail_open: false,
        }
    }
}

/// Audio source yielding `chunk_size` blocks of a fixed byte.
pub struct MockSource {
    config: MockSourceConfig,
    opens: AtomicUsize,
}

impl MockSource {
    pub fn new(config: MockSourceConfig) -> Self {
        Self {
            config,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn healthy() -> Self {
        Self::new(MockSourceConfig::default())
    }

    pub fn failing_at(fraction: f64) -> Self {
        Self::new(MockSourceConfig {
            fail_at: Some(fraction),
            ..MockSourceConfig::default()
        })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

enum Step {
    Chunk { bytes: Bytes, downloaded: u64 },
    Fail,
}

#[async_trait]
impl AudioSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self, _locator: &str) -> Result<(AudioByteStream, ProgressReceiver), DownloadError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_open {
            return Err(DownloadError::Process("mock source refused to open".to_string()));
        }

        let cfg = self.config.clone();
        let fail_after = cfg.fail_at.map(|f| (cfg.total_bytes as f64 * f).round() as u64);

        let mut plan = Vec::new();
        let mut downloaded = 0;
        while downloaded < cfg.total_bytes {
            if fail_after.is_some_and(|limit| downloaded >= limit) {
                break;
            }
            let len = cfg.chunk_size.min(cfg.total_bytes - downloaded);
            downloaded += len;
            plan.push(Step::Chunk {
                bytes: Bytes::from(vec![0xAB; len as usize]),
                downloaded,
            });
        }
        if fail_after.is_some() {
            plan.push(Step::Fail);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (total, exact) = match cfg.estimated_total {
            Some(estimate) => (Some(estimate), false),
            None => (cfg.report_total.then_some(cfg.total_bytes), cfg.report_total),
        };
        let delay = cfg.chunk_delay;

        let stream = stream::iter(plan)
            .then(move |step| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                step
            })
            .map(move |step| match step {
                Step::Chunk { bytes, downloaded } => {
                    let _ = tx.send(SourceProgress {
                        downloaded_bytes: downloaded,
                        total_bytes: total,
                        total_is_exact: exact,
                    });
                    Ok(bytes)
                }
                Step::Fail => Err(std::io::Error::other("connection reset by peer")),
            });

        Ok((Box::pin(stream), rx))
    }
}
