use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::validation::LocatorRules;

/// Server configuration defaults
pub mod server {
    /// Port the HTTP intake listens on when PORT is not set
    pub const DEFAULT_PORT: u16 = 3003;

    /// Directory where finished MP3 files are written
    pub const DEFAULT_OUTPUT_DIR: &str = "./resource";

    /// Externally-addressable prefix the output directory is served under
    pub const DEFAULT_PUBLIC_PREFIX: &str = "/resource";
}

/// Download configuration
pub mod download {
    use super::Duration;

    /// Timeout for yt-dlp metadata commands (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 240; // 4 minutes, slow metadata fetches happen

    /// Upper bound for one stream + transcode run (in seconds)
    pub const PIPELINE_TIMEOUT_SECS: u64 = 1800; // 30 minutes

    /// Default cookies file (JSON export or Netscape format)
    pub const DEFAULT_COOKIES_FILE: &str = "cookies.json";

    /// Percentage step between recorded progress milestones
    pub const PROGRESS_STEP_PERCENT: u8 = 10;

    /// yt-dlp command timeout duration
    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }

    /// Stream + transcode timeout duration
    pub fn pipeline_timeout() -> Duration {
        Duration::from_secs(PIPELINE_TIMEOUT_SECS)
    }
}

/// Encoding configuration
pub mod encoding {
    /// Constant bitrate of the produced MP3 (kbit/s)
    pub const AUDIO_BITRATE_KBPS: u32 = 128;
}

/// Runtime configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub output_dir: PathBuf,
    pub public_prefix: String,
    pub ytdl_bin: String,
    pub ffmpeg_bin: String,
    pub cookies_file: PathBuf,
    pub audio_bitrate_kbps: u32,
    pub ytdlp_timeout: Duration,
    pub pipeline_timeout: Duration,
    pub progress_step_percent: u8,
    pub locator_rules: LocatorRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: server::DEFAULT_PORT,
            output_dir: PathBuf::from(server::DEFAULT_OUTPUT_DIR),
            public_prefix: server::DEFAULT_PUBLIC_PREFIX.to_string(),
            ytdl_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            cookies_file: PathBuf::from(download::DEFAULT_COOKIES_FILE),
            audio_bitrate_kbps: encoding::AUDIO_BITRATE_KBPS,
            ytdlp_timeout: download::ytdlp_timeout(),
            pipeline_timeout: download::pipeline_timeout(),
            progress_step_percent: download::PROGRESS_STEP_PERCENT,
            locator_rules: LocatorRules::youtube(),
        }
    }
}

impl Config {
    /// Build the configuration from environment variables.
    ///
    /// Every variable is optional; unset or unparsable values fall back to the
    /// defaults above (unparsable ones are logged).
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `PORT` | 3003 |
    /// | `OUTPUT_DIR` | `./resource` |
    /// | `PUBLIC_PREFIX` | `/resource` |
    /// | `YTDL_BIN` | `yt-dlp` |
    /// | `FFMPEG_BIN` | `ffmpeg` |
    /// | `YTDL_COOKIES_FILE` | `cookies.json` |
    /// | `AUDIO_BITRATE_KBPS` | 128 |
    /// | `YTDLP_TIMEOUT_SECS` | 240 |
    /// | `PIPELINE_TIMEOUT_SECS` | 1800 |
    /// | `PROGRESS_STEP_PERCENT` | 10 |
    /// | `ALLOWED_HOSTS` | YouTube hosts |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let locator_rules = match non_empty_var("ALLOWED_HOSTS") {
            Some(raw) => LocatorRules::youtube().with_hosts(parse_list(&raw)),
            None => defaults.locator_rules,
        };

        Self {
            port: parsed_var("PORT").unwrap_or(defaults.port),
            output_dir: non_empty_var("OUTPUT_DIR")
                .map(|dir| PathBuf::from(expand_tilde(&dir)))
                .unwrap_or(defaults.output_dir),
            public_prefix: non_empty_var("PUBLIC_PREFIX")
                .map(|prefix| normalize_prefix(&prefix))
                .unwrap_or(defaults.public_prefix),
            ytdl_bin: non_empty_var("YTDL_BIN").unwrap_or(defaults.ytdl_bin),
            ffmpeg_bin: non_empty_var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            cookies_file: non_empty_var("YTDL_COOKIES_FILE")
                .map(|path| PathBuf::from(expand_tilde(&path)))
                .unwrap_or(defaults.cookies_file),
            audio_bitrate_kbps: parsed_var("AUDIO_BITRATE_KBPS")
                .filter(|kbps| *kbps > 0)
                .unwrap_or(defaults.audio_bitrate_kbps),
            ytdlp_timeout: parsed_var("YTDLP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.ytdlp_timeout),
            pipeline_timeout: parsed_var("PIPELINE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.pipeline_timeout),
            progress_step_percent: parsed_var::<u8>("PROGRESS_STEP_PERCENT")
                .filter(|step| (1..=100).contains(step))
                .unwrap_or(defaults.progress_step_percent),
            locator_rules,
        }
    }

    /// Address the HTTP intake binds to.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = non_empty_var(name)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {}={:?}, using default", name, raw);
            None
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split([',', ' ', '\n', '\t'])
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

fn expand_tilde(path: &str) -> String {
    match (path.strip_prefix("~/"), env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
