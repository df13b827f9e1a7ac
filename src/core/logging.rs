//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (tracing subscriber + `log` bridge)
//! - Startup diagnostics for binaries and cookies

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::download::cookies::CredentialState;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "doramp3=info,tower_http=info";

/// Initialize the global logger.
///
/// Call sites use the `log` macros; `tracing-log` forwards those records to the
/// tracing subscriber so they carry the span of the request that emitted them.
pub fn init_logger() -> Result<()> {
    tracing_log::LogTracer::init().map_err(|e| anyhow::anyhow!("Failed to install log bridge: {}", e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration and credential state at startup.
pub fn log_startup_configuration(config: &Config, credentials: &CredentialState) {
    log::info!("Output directory: {}", config.output_dir.display());
    log::info!("Public prefix: {}", config.public_prefix);
    log::info!("yt-dlp binary: {}", config.ytdl_bin);
    log::info!("ffmpeg binary: {}", config.ffmpeg_bin);
    log::info!("MP3 bitrate: {} kbps", config.audio_bitrate_kbps);
    log::info!(
        "Timeouts: metadata {}s, pipeline {}s",
        config.ytdlp_timeout.as_secs(),
        config.pipeline_timeout.as_secs()
    );
    log::info!("Allowed hosts: {}", config.locator_rules.hosts().join(", "));

    match credentials {
        CredentialState::Loaded(creds) => {
            log::info!(
                "Cookies: {} entries from {} (yt-dlp file {})",
                creds.cookie_count,
                config.cookies_file.display(),
                creds.netscape_path.display()
            );
        }
        CredentialState::Unavailable(reason) => {
            log::error!("Cookies: unavailable ({})", reason);
            log::error!("   Checked path: {}", config.cookies_file.display());
            log::error!("   Current directory: {:?}", std::env::current_dir());
            log::error!("   Downloads will FAIL until a valid cookies file is provided (send SIGHUP to reload)");
        }
    }
}
