//! Download pipeline orchestrator.
//!
//! One call to [`Pipeline::run`] handles one request end to end:
//!   audit → validate → resolve metadata → name the artifact
//!   → stream + transcode (progress observed concurrently) → commit → respond
//!
//! The collaborators (resolver, source, transcoder) are trait objects so the
//! same orchestration runs against yt-dlp/ffmpeg in production and mocks in tests.

use crate::core::audit::AuditRecord;
use crate::core::config::Config;
use crate::core::error::{AppError, AppResult, ErrorKind};
use crate::core::metrics;
use crate::core::utils::{effective_title, format_bytes};
use crate::core::validation::LocatorRules;
use crate::conversion::{TranscodeJob, Transcoder};
use crate::download::metadata::MetadataResolver;
use crate::download::progress::{render_log, ProgressEvent, ProgressRecorder};
use crate::download::source::AudioSource;
use crate::storage::{Artifact, ArtifactStore, PartialFile};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Lifecycle of one request. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PipelineState {
    Intake,
    Validating,
    ResolvingMetadata,
    Transcoding,
    Assembling,
    Done,
    Failed,
}

/// Input of one run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Locator exactly as the caller sent it (may be absent)
    pub locator: Option<String>,
    pub client_address: String,
}

#[derive(Debug)]
pub struct PipelineSuccess {
    pub request_id: Uuid,
    pub artifact: Artifact,
    pub audit: AuditRecord,
    pub progress: Vec<ProgressEvent>,
}

impl PipelineSuccess {
    pub fn progress_log(&self) -> Vec<String> {
        render_log(&self.progress)
    }
}

#[derive(Debug)]
pub struct PipelineFailure {
    pub request_id: Uuid,
    pub error: AppError,
    pub audit: AuditRecord,
    pub progress: Vec<ProgressEvent>,
}

impl PipelineFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn progress_log(&self) -> Vec<String> {
        render_log(&self.progress)
    }

    /// Progress log on one line, for server-side logs.
    pub fn progress_summary(&self) -> String {
        self.progress_log().join(" | ")
    }
}

pub type PipelineResult = Result<PipelineSuccess, PipelineFailure>;

/// Tunables shared by every run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub locator_rules: LocatorRules,
    pub bitrate_kbps: u32,
    pub progress_step_percent: u8,
    /// Bound on stream + transcode
    pub timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            locator_rules: config.locator_rules.clone(),
            bitrate_kbps: config.audio_bitrate_kbps,
            progress_step_percent: config.progress_step_percent,
            timeout: config.pipeline_timeout,
        }
    }
}

/// Per-run bookkeeping: state, audit record and progress log.
struct RunContext {
    request_id: Uuid,
    state: PipelineState,
    audit: AuditRecord,
    recorder: ProgressRecorder,
}

impl RunContext {
    fn transition(&mut self, next: PipelineState) {
        log::info!("[{}] {} -> {}", self.request_id, self.state, next);
        self.state = next;
    }

    fn fail(mut self, error: AppError) -> PipelineFailure {
        let kind = error.kind();
        if kind == ErrorKind::BadRequest {
            log::warn!("[{}] rejected in {}: {}", self.request_id, self.state, error);
        } else {
            log::error!("[{}] {} failed in {}: {}", self.request_id, kind, self.state, error);
        }
        self.recorder.record(ProgressEvent::Failed(error.to_string()));
        self.transition(PipelineState::Failed);
        PipelineFailure {
            request_id: self.request_id,
            error,
            audit: self.audit,
            progress: self.recorder.into_events(),
        }
    }
}

/// Orchestrates one request at a time; share it behind an `Arc` across requests.
pub struct Pipeline {
    resolver: Arc<dyn MetadataResolver>,
    source: Arc<dyn AudioSource>,
    transcoder: Arc<dyn Transcoder>,
    store: ArtifactStore,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        source: Arc<dyn AudioSource>,
        transcoder: Arc<dyn Transcoder>,
        store: ArtifactStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver,
            source,
            transcoder,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Runs one request to completion.
    pub async fn run(&self, request: PipelineRequest) -> PipelineResult {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", request_id = %request_id);
        let started = Instant::now();

        let result = self.run_inner(request_id, request).instrument(span).await;

        metrics::PIPELINE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => metrics::record_pipeline_success(),
            Err(failure) => metrics::record_pipeline_failure(failure.kind()),
        }
        result
    }

    async fn run_inner(&self, request_id: Uuid, request: PipelineRequest) -> PipelineResult {
        let audit = AuditRecord::capture(request.client_address, request.locator.clone());
        let mut ctx = RunContext {
            request_id,
            state: PipelineState::Intake,
            audit,
            recorder: ProgressRecorder::new(self.settings.progress_step_percent),
        };

        ctx.transition(PipelineState::Validating);
        let locator = match request.locator.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            Some(locator) => locator.to_string(),
            None => return Err(ctx.fail(AppError::MissingLocator)),
        };
        if let Err(e) = self.settings.locator_rules.validate(&locator) {
            return Err(ctx.fail(e.into()));
        }

        ctx.transition(PipelineState::ResolvingMetadata);
        let metadata = match self.resolver.resolve(&locator).await {
            Ok(metadata) => metadata,
            Err(e) => {
                metrics::record_download_error(e.subcategory());
                return Err(ctx.fail(e.into()));
            }
        };
        let title = effective_title(&metadata.title).to_string();
        let artifact = self.store.artifact_for(&title);
        log::info!(
            "[{}] title={:?} -> {}",
            request_id,
            title,
            artifact.storage_path.display()
        );

        ctx.transition(PipelineState::Transcoding);
        if let Err(e) = self.store.ensure_output_dir().await {
            return Err(ctx.fail(e.into()));
        }
        let partial = self.store.partial_for(&artifact);
        ctx.recorder.record(ProgressEvent::Started);

        let bounded = tokio::time::timeout(
            self.settings.timeout,
            self.stream_and_transcode(&locator, &title, &partial, &mut ctx.recorder),
        )
        .await;
        match bounded {
            Ok(Ok(consumed)) => {
                log::info!("[{}] transcoded {} of audio", request_id, format_bytes(consumed));
            }
            Ok(Err(e)) => return Err(ctx.fail(e)),
            Err(_) => return Err(ctx.fail(AppError::Timeout(self.settings.timeout.as_secs()))),
        }
        ctx.recorder.record(ProgressEvent::TranscodeComplete);

        ctx.transition(PipelineState::Assembling);
        if let Err(e) = partial.commit(&artifact).await {
            return Err(ctx.fail(e.into()));
        }

        ctx.transition(PipelineState::Done);
        Ok(PipelineSuccess {
            request_id,
            artifact,
            audit: ctx.audit,
            progress: ctx.recorder.into_events(),
        })
    }

    /// Opens the source and feeds it to the transcoder while draining the
    /// progress channel into `recorder`. Returns the number of bytes consumed.
    async fn stream_and_transcode(
        &self,
        locator: &str,
        title: &str,
        partial: &PartialFile,
        recorder: &mut ProgressRecorder,
    ) -> AppResult<u64> {
        let (stream, mut progress_rx) = self.source.open(locator).await.inspect_err(|e| {
            log::warn!("{} source failed to open: {}", self.source.name(), e);
            metrics::record_download_error(e.subcategory());
        })?;
        log::info!("streaming audio from {}", self.source.name());
        let job = TranscodeJob {
            output_path: partial.path().to_path_buf(),
            title: title.to_string(),
            bitrate_kbps: self.settings.bitrate_kbps,
        };

        let transcode = self.transcoder.transcode(stream, &job);
        tokio::pin!(transcode);
        let result = loop {
            tokio::select! {
                biased;
                Some(progress) = progress_rx.recv() => recorder.observe(progress),
                result = &mut transcode => break result,
            }
        };
        // Observations sent before the transcoder returned
        while let Ok(progress) = progress_rx.try_recv() {
            recorder.observe(progress);
        }

        let consumed = result?;
        recorder.finish_download();
        Ok(consumed)
    }
}
