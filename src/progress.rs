//! Ingest progress on stderr.
//!
//! Stdout carries the final `indexed N documents` summary, so anything
//! emitted while a run is in flight goes to stderr, either as a status
//! line or as one JSON object per event.

use serde::Serialize;
use std::io::Write;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum IngestProgressEvent {
    /// Walking the tree; total unknown.
    Discovering { scope: String },
    /// `n` of `total` candidate files processed.
    Ingesting { scope: String, n: u64, total: u64 },
}

pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// `ingest project:foo  312 / 1200 files`
pub fn human_line(event: &IngestProgressEvent) -> String {
    match event {
        IngestProgressEvent::Discovering { scope } => format!("ingest {}  discovering...", scope),
        IngestProgressEvent::Ingesting { scope, n, total } => {
            format!("ingest {}  {} / {} files", scope, n, total)
        }
    }
}

pub fn json_line(event: &IngestProgressEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

fn emit(line: &str) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{}", line);
}

pub struct HumanProgress;

impl IngestProgressReporter for HumanProgress {
    fn report(&self, event: IngestProgressEvent) {
        emit(&human_line(&event));
    }
}

pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        match json_line(&event) {
            Ok(line) => emit(&line),
            Err(e) => tracing::debug!("progress event not serializable: {}", e),
        }
    }
}

pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressMode {
    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Auto if atty::is(atty::Stream::Stderr) => Box::new(HumanProgress),
            ProgressMode::Auto | ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(HumanProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
