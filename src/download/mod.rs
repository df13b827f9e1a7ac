//! Download management and processing

pub mod cookies;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod ytdlp_errors;

// Re-exports for convenience
pub use cookies::{CredentialHandle, CredentialState, CredentialStore};
pub use metadata::{MetadataResolver, VideoMetadata, YtDlpMetadataResolver};
pub use pipeline::{Pipeline, PipelineFailure, PipelineRequest, PipelineResult, PipelineSettings, PipelineSuccess};
pub use progress::{ProgressEvent, ProgressRecorder};
pub use source::{AudioSource, SourceProgress, YtDlpAudioSource};
