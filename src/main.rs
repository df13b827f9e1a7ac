use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;

use doramp3::cli::{Cli, Commands};
use doramp3::conversion::{check_ffmpeg, FfmpegTranscoder};
use doramp3::core::web_server::{self, AppState, DownloadResponse, ErrorBody};
use doramp3::core::{init_logger, log_startup_configuration, metrics, Config};
use doramp3::download::{
    CredentialStore, Pipeline, PipelineRequest, PipelineSettings, YtDlpAudioSource, YtDlpMetadataResolver,
};
use doramp3::storage::ArtifactStore;

/// Main entry point
///
/// Parses CLI arguments and dispatches to the selected subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, output directory, bind).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    init_logger()?;
    metrics::init_metrics();

    let mut config = Config::from_env();

    match cli.command {
        None => run_server(config).await,
        Some(Commands::Serve { port, output_dir }) => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            run_server(config).await
        }
        Some(Commands::Fetch { url, output_dir }) => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            run_fetch(config, url).await
        }
    }
}

/// Wires the production collaborators (yt-dlp, ffmpeg, output directory).
async fn build_pipeline(config: &Config) -> Result<(Arc<Pipeline>, Arc<CredentialStore>)> {
    let credentials = Arc::new(CredentialStore::load(&config.cookies_file));
    log_startup_configuration(config, &credentials.handle().current());

    if !check_ffmpeg(&config.ffmpeg_bin).await {
        log::error!("{} is not available; every conversion will fail", config.ffmpeg_bin);
    }

    let store = ArtifactStore::new(&config.output_dir, &config.public_prefix);
    store.ensure_output_dir().await?;

    let pipeline = Pipeline::new(
        Arc::new(YtDlpMetadataResolver::new(
            &config.ytdl_bin,
            config.ytdlp_timeout,
            credentials.handle(),
        )),
        Arc::new(YtDlpAudioSource::new(&config.ytdl_bin, credentials.handle())),
        Arc::new(FfmpegTranscoder::new(&config.ffmpeg_bin)),
        store,
        PipelineSettings::from_config(config),
    );

    Ok((Arc::new(pipeline), credentials))
}

async fn run_server(config: Config) -> Result<()> {
    let (pipeline, credentials) = build_pipeline(&config).await?;

    #[cfg(unix)]
    let _reload_task = doramp3::download::cookies::spawn_reload_on_sighup(Arc::clone(&credentials))?;
    #[cfg(not(unix))]
    let _ = credentials;

    let state = AppState {
        pipeline,
        public_prefix: config.public_prefix.clone(),
    };
    web_server::start_web_server(config.socket_addr(), state).await
}

async fn run_fetch(config: Config, url: String) -> Result<()> {
    let (pipeline, _credentials) = build_pipeline(&config).await?;

    let result = pipeline
        .run(PipelineRequest {
            locator: Some(url),
            client_address: "cli".to_string(),
        })
        .await;

    match result {
        Ok(success) => {
            println!("{}", serde_json::to_string_pretty(&DownloadResponse::from(success))?);
            Ok(())
        }
        Err(failure) => {
            log::warn!("[{}] progress: {}", failure.request_id, failure.progress_summary());
            let body = ErrorBody {
                error_kind: failure.error.public_kind(),
                message: failure.error.public_message().to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(anyhow::anyhow!("download failed: {}", failure.error))
        }
    }
}
