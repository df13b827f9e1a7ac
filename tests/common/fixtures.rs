//! Test fixtures
//!
//! Provides TestEnvironment that sets up everything a pipeline test needs:
//! - A temporary output directory
//! - Mock resolver, source and transcoder
//! - A `Pipeline` wired to them

#![allow(dead_code)]

use crate::mocks::{MockResolver, MockSource, MockTranscoder};
use doramp3::core::validation::LocatorRules;
use doramp3::download::{Pipeline, PipelineSettings};
use doramp3::storage::ArtifactStore;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Locator used throughout the scenarios
pub const SCENARIO_URL: &str = "https://example.com/watch?v=VALID1";

/// Rules accepting example.com locators with 6-character ids.
pub fn example_rules() -> LocatorRules {
    LocatorRules::youtube()
        .with_hosts(["example.com"])
        .with_id_pattern(Regex::new(r"^[A-Za-z0-9]{6}$").unwrap())
}

/// File names currently in `dir`, sorted.
pub fn list_output_dir(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Complete test environment for pipeline tests
///
/// # Example
/// ```ignore
/// let env = TestEnvironment::new(MockResolver::with_title("My Song"), MockSource::healthy());
/// let result = env.pipeline.run(request).await;
/// assert!(env.output_files().contains(&"My_Song.mp3".to_string()));
/// ```
pub struct TestEnvironment {
    /// Keeps the output directory alive for the duration of the test
    pub dir: TempDir,
    pub resolver: Arc<MockResolver>,
    pub source: Arc<MockSource>,
    pub transcoder: Arc<MockTranscoder>,
    pub pipeline: Arc<Pipeline>,
}

impl TestEnvironment {
    pub fn new(resolver: MockResolver, source: MockSource) -> Self {
        Self::build(resolver, source, MockTranscoder::new(), Duration::from_secs(30))
    }

    pub fn build(resolver: MockResolver, source: MockSource, transcoder: MockTranscoder, timeout: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Arc::new(resolver);
        let source = Arc::new(source);
        let transcoder = Arc::new(transcoder);

        let settings = PipelineSettings {
            locator_rules: example_rules(),
            bitrate_kbps: 128,
            progress_step_percent: 10,
            timeout,
        };
        let pipeline = Pipeline::new(
            resolver.clone(),
            source.clone(),
            transcoder.clone(),
            ArtifactStore::new(dir.path().join("resource"), "/resource"),
            settings,
        );

        Self {
            dir,
            resolver,
            source,
            transcoder,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("resource")
    }

    pub fn output_files(&self) -> Vec<String> {
        list_output_dir(&self.output_dir())
    }
}
