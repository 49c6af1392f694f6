//! SSE event tokenizer
//!
//! Turns a decoded body into `event`/`data` records:
//! - `event: <type>` sets the type of the pending record
//! - `data: <payload>` sets its data
//! - an empty line closes the record
//! - lines starting with `:` are comments
//!
//! A record is emitted only when both fields were seen. A second `data:` line
//! replaces the first instead of being joined to it; detection only needs one
//! payload per record.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: String,
}

impl SseEvent {
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
        }
    }
}

/// One classified line of an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine<'a> {
    Empty,
    Comment,
    Event(&'a str),
    Data(&'a str),
    Other,
}

pub fn parse_sse_line(line: &str) -> SseLine<'_> {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if line.starts_with(':') {
        return SseLine::Comment;
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim_start());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim_start());
    }

    SseLine::Other
}

/// Stateful tokenizer fed one line at a time.
#[derive(Debug, Default)]
pub struct SseTokenizer {
    event_type: Option<String>,
    data: Option<String>,
    events: Vec<SseEvent>,
}

impl SseTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line without its terminator.
    pub fn feed_line(&mut self, line: &str) {
        match parse_sse_line(line) {
            SseLine::Event(event_type) => self.event_type = Some(event_type.to_string()),
            SseLine::Data(data) => self.data = Some(data.to_string()),
            SseLine::Empty => self.close_record(),
            SseLine::Comment | SseLine::Other => {}
        }
    }

    /// Events in stream order, including a complete record left open at end of input.
    pub fn finish(mut self) -> Vec<SseEvent> {
        self.close_record();
        self.events
    }

    fn close_record(&mut self) {
        if let (Some(event_type), Some(data)) = (self.event_type.take(), self.data.take()) {
            self.events.push(SseEvent { event_type, data });
        }
    }
}

pub fn tokenize(body: &str) -> Vec<SseEvent> {
    let mut tokenizer = SseTokenizer::new();
    for line in body.split('\n') {
        tokenizer.feed_line(line.strip_suffix('\r').unwrap_or(line));
    }
    tokenizer.finish()
}
