//! Mock transcoder
//!
//! Stands in for ffmpeg: copies the input stream into the job's output file
//! chunk by chunk, so a failing run leaves a real partial file behind for the
//! pipeline to clean up.

#![allow(dead_code)]

use async_trait::async_trait;
use doramp3::conversion::{ConversionError, ConversionResult, TranscodeJob, Transcoder};
use doramp3::download::source::AudioByteStream;
use futures_util::StreamExt;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

#[derive(Default)]
pub struct MockTranscoder {
    /// Fail with an encoder error after consuming the whole input
    fail_with: Option<String>,
    jobs: Mutex<Vec<TranscodeJob>>,
}

impl MockTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> Vec<TranscodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn transcode(&self, mut input: AudioByteStream, job: &TranscodeJob) -> ConversionResult<u64> {
        self.jobs.lock().unwrap().push(job.clone());

        let mut file = tokio::fs::File::create(&job.output_path).await?;
        let mut consumed = 0u64;
        while let Some(chunk) = input.next().await {
            let bytes = chunk.map_err(ConversionError::Source)?;
            file.write_all(&bytes).await?;
            consumed += bytes.len() as u64;
        }
        file.flush().await?;

        match &self.fail_with {
            Some(reason) => Err(ConversionError::Ffmpeg(reason.clone())),
            None => Ok(consumed),
        }
    }
}
