/*!
 * Progress events of a translation run.
 *
 * Events are pushed into an unbounded channel. The receiving side may render
 * them (progress bar), forward them (server-sent events) or drop them; a
 * closed receiver never blocks or fails the translation.
 */

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Event type, serialized as the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Progress,
    QuotaError,
    Retry,
    Complete,
    Error,
}

/// One entry of the event stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: ProgressKind,
    pub translated: usize,
    pub total: usize,
    pub percentage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_chunk: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ProgressEvent {
    pub fn new(kind: ProgressKind, translated: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            translated,
            total,
            percentage: Self::percentage_of(translated, total),
            current_chunk: None,
            total_chunks: None,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_chunk(mut self, current_chunk: usize, total_chunks: usize) -> Self {
        self.current_chunk = Some(current_chunk);
        self.total_chunks = Some(total_chunks);
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Rounded share of translated segments
    pub fn percentage_of(translated: usize, total: usize) -> u32 {
        if total == 0 {
            return 0;
        }
        ((translated as f64 / total as f64) * 100.0).round() as u32
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ProgressKind::Complete | ProgressKind::Error)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Failed to serialize event: {}"}}"#, e)
        })
    }

    /// Server-sent events framing
    pub fn to_sse(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }
}

/// Sending half of the event stream
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Reporter plus the receiver that observes its events
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// Reporter that discards every event
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // a gone receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }
}
