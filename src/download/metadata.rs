//! Video metadata fetching via yt-dlp.
//!
//! This module provides:
//!
//! - `MetadataResolver`, the seam the pipeline calls (mocked in tests)
//! - `YtDlpMetadataResolver`, one `--dump-single-json` call per request
//! - Cookie handling for authenticated requests

use crate::core::metrics;
use crate::download::cookies::CredentialHandle;
use crate::download::error::DownloadError;
use crate::download::ytdlp_errors::{analyze_ytdlp_error, get_fix_recommendations};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// What the pipeline needs to know about a video before streaming it.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub duration: Option<Duration>,
    /// Best-effort size of the selected audio format
    pub content_length: Option<u64>,
}

/// Subset of yt-dlp's info JSON we read.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    filesize: Option<f64>,
    #[serde(default)]
    filesize_approx: Option<f64>,
}

/// Parses the output of `yt-dlp --dump-single-json`.
pub fn parse_metadata_json(json: &str) -> Result<VideoMetadata, DownloadError> {
    let info: YtDlpInfo = serde_json::from_str(json).map_err(|e| DownloadError::InvalidMetadata(e.to_string()))?;

    let duration = info
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(Duration::from_secs_f64);
    let content_length = info
        .filesize
        .or(info.filesize_approx)
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| s as u64);

    Ok(VideoMetadata {
        title: info.title.unwrap_or_default(),
        duration,
        content_length,
    })
}

/// Adds `--cookies <file>` for the currently loaded credentials.
///
/// Fails with `DownloadError::Credentials` when no usable material is loaded.
pub fn add_cookies_args(args: &mut Vec<String>, credentials: &CredentialHandle) -> Result<(), DownloadError> {
    let state = credentials.current();
    let creds = state.credentials().map_err(DownloadError::Credentials)?;
    args.push("--cookies".to_string());
    args.push(creds.netscape_path.to_string_lossy().into_owned());
    Ok(())
}

/// Resolves a locator to its metadata.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, locator: &str) -> Result<VideoMetadata, DownloadError>;
}

/// Metadata resolver backed by yt-dlp.
pub struct YtDlpMetadataResolver {
    ytdl_bin: String,
    timeout: Duration,
    credentials: CredentialHandle,
}

impl YtDlpMetadataResolver {
    pub fn new(ytdl_bin: impl Into<String>, timeout: Duration, credentials: CredentialHandle) -> Self {
        Self {
            ytdl_bin: ytdl_bin.into(),
            timeout,
            credentials,
        }
    }

    fn build_args(&self, locator: &str) -> Result<Vec<String>, DownloadError> {
        let mut args: Vec<String> = ["--dump-single-json", "--no-playlist", "--skip-download", "-f", "bestaudio"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        add_cookies_args(&mut args, &self.credentials)?;
        args.push(locator.to_string());
        Ok(args)
    }
}

#[async_trait]
impl MetadataResolver for YtDlpMetadataResolver {
    async fn resolve(&self, locator: &str) -> Result<VideoMetadata, DownloadError> {
        let args = self.build_args(locator).inspect_err(|e| {
            log::error!("Cannot resolve metadata for {}: {}", locator, e);
        })?;

        log::debug!("yt-dlp command for metadata: {} {}", self.ytdl_bin, args.join(" "));
        let _timer = metrics::start_ytdlp_timer("metadata");

        let output = timeout(
            self.timeout,
            TokioCommand::new(&self.ytdl_bin).args(&args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| {
            log::error!("yt-dlp metadata command timed out after {} seconds", self.timeout.as_secs());
            DownloadError::Timeout(format!("yt-dlp timed out after {}s", self.timeout.as_secs()))
        })?
        .map_err(|e| {
            log::error!("Failed to execute {}: {}", self.ytdl_bin, e);
            DownloadError::Process(format!("failed to run yt-dlp: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let error_type = analyze_ytdlp_error(&stderr);
            log::error!("yt-dlp failed to get metadata, error type: {:?}", error_type);
            log::error!("yt-dlp stderr: {}", stderr);
            log::error!("Fix: {}", get_fix_recommendations(error_type));
            return Err(DownloadError::YtDlp { error_type, stderr });
        }

        let metadata = parse_metadata_json(&String::from_utf8_lossy(&output.stdout))?;
        log::info!(
            "Resolved metadata: title={:?}, duration={:?}, size={:?}",
            metadata.title,
            metadata.duration,
            metadata.content_length
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::cookies::{CredentialState, Credentials};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn loaded_handle() -> CredentialHandle {
        CredentialHandle::fixed(CredentialState::Loaded(Credentials {
            netscape_path: PathBuf::from("/tmp/doramp3-cookies-test.txt"),
            cookie_count: 3,
            loaded_at: chrono::Utc::now(),
        }))
    }

    #[test]
    fn test_parse_metadata_json() {
        let json = r#"{"id": "dQw4w9WgXcQ", "title": "My Song", "duration": 212.5, "filesize": 3400000}"#;
        let meta = parse_metadata_json(json).unwrap();
        assert_eq!(meta.title, "My Song");
        assert_eq!(meta.duration, Some(Duration::from_secs_f64(212.5)));
        assert_eq!(meta.content_length, Some(3_400_000));
    }

    #[test]
    fn test_parse_metadata_json_uses_approx_size_and_tolerates_missing_fields() {
        let meta = parse_metadata_json(r#"{"filesize_approx": 1024.0}"#).unwrap();
        assert_eq!(meta.title, "");
        assert_eq!(meta.duration, None);
        assert_eq!(meta.content_length, Some(1024));
    }

    #[test]
    fn test_parse_metadata_json_rejects_garbage() {
        assert!(matches!(
            parse_metadata_json("WARNING: not json"),
            Err(DownloadError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_add_cookies_args() {
        let mut args = Vec::new();
        add_cookies_args(&mut args, &loaded_handle()).unwrap();
        assert_eq!(args, vec!["--cookies", "/tmp/doramp3-cookies-test.txt"]);
    }

    #[tokio::test]
    async fn test_resolve_fails_without_credentials() {
        let resolver = YtDlpMetadataResolver::new(
            "yt-dlp",
            Duration::from_secs(5),
            CredentialHandle::fixed(CredentialState::Unavailable("cookies.json not found".into())),
        );
        let result = resolver.resolve("https://youtu.be/dQw4w9WgXcQ").await;
        assert!(matches!(result, Err(DownloadError::Credentials(_))));
    }

    #[test]
    fn test_build_args() {
        let resolver = YtDlpMetadataResolver::new("yt-dlp", Duration::from_secs(5), loaded_handle());
        let args = resolver.build_args("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(args[0], "--dump-single-json");
        assert!(args.contains(&"--cookies".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/dQw4w9WgXcQ");
    }
}
