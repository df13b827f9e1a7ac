//! Per-request progress log.
//!
//! The recorder is owned by one pipeline run and fed by a single consumer of
//! the source's progress channel, so events stay in the order observed.

use std::fmt;

use crate::download::source::SourceProgress;

/// One entry of the progress log.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started,
    /// Percentage of bytes received, rounded to two decimals
    Percent(f64),
    DownloadComplete,
    TranscodeComplete,
    Failed(String),
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Started => write!(f, "download started"),
            ProgressEvent::Percent(pct) => write!(f, "download progress: {:.2}%", pct),
            ProgressEvent::DownloadComplete => write!(f, "download complete"),
            ProgressEvent::TranscodeComplete => write!(f, "transcode complete"),
            ProgressEvent::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Rounds to two decimals, the precision the log reports.
pub fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `downloaded` over `total`, clamped to 0..=100 and rounded.
/// `None` when the total is unknown.
pub fn percent_of(downloaded: u64, total: Option<u64>) -> Option<f64> {
    let total = total.filter(|t| *t > 0)?;
    let raw = downloaded as f64 / total as f64 * 100.0;
    Some(round_percent(raw.clamp(0.0, 100.0)))
}

/// Ordered, append-only progress log for one request.
#[derive(Debug)]
pub struct ProgressRecorder {
    events: Vec<ProgressEvent>,
    step_percent: u8,
    last_milestone: u64,
    download_complete: bool,
}

impl ProgressRecorder {
    /// `step_percent` is the milestone granularity (0 is treated as 1).
    pub fn new(step_percent: u8) -> Self {
        Self {
            events: Vec::new(),
            step_percent: step_percent.max(1),
            last_milestone: 0,
            download_complete: false,
        }
    }

    pub fn record(&mut self, event: ProgressEvent) {
        log::debug!("progress: {}", event);
        if event == ProgressEvent::DownloadComplete {
            self.download_complete = true;
        }
        self.events.push(event);
    }

    /// Feeds one observation from the source.
    ///
    /// Records a `Percent` milestone each time the percentage crosses into a
    /// higher multiple of the step, and `DownloadComplete` the first time it
    /// reaches 100.00 against an exact total. Estimated totals never complete
    /// the download; `finish_download` does once the stream closes.
    pub fn observe(&mut self, progress: SourceProgress) {
        let Some(pct) = percent_of(progress.downloaded_bytes, progress.total_bytes) else {
            log::trace!("progress without total: {} bytes", progress.downloaded_bytes);
            return;
        };

        let milestone = (pct / f64::from(self.step_percent)).floor() as u64;
        if milestone > self.last_milestone {
            self.last_milestone = milestone;
            self.record(ProgressEvent::Percent(pct));
        }

        if pct >= 100.0 && progress.total_is_exact && !self.download_complete {
            self.record(ProgressEvent::DownloadComplete);
        }
    }

    /// Marks the download complete if no observation reached 100%.
    /// Called when the stream closed cleanly.
    pub fn finish_download(&mut self) {
        if !self.download_complete {
            self.record(ProgressEvent::DownloadComplete);
        }
    }

    pub fn snapshot(&self) -> Vec<ProgressEvent> {
        self.events.clone()
    }

    pub fn into_events(self) -> Vec<ProgressEvent> {
        self.events
    }
}

/// Renders a progress log to the strings returned to the caller.
pub fn render_log(events: &[ProgressEvent]) -> Vec<String> {
    events.iter().map(ToString::to_string).collect()
}
