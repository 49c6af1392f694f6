//! Single-target SSE endpoint probe.
//!
//! transport -> raw bytes -> http -> (status, headers, body) -> chunked -> sse -> finding

pub mod chunked;
pub mod error;
pub mod http;
pub mod sse;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

use crate::config::ProbeConfig;
pub use error::{MissKind, TransportError};
pub use sse::SseEvent;

pub const SSE_CONTENT_TYPE: &str = "text/event-stream";

/// Event type MCP servers use to announce their message URL.
pub const ENDPOINT_EVENT: &str = "endpoint";

/// A confirmed SSE endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseFinding {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub status: u16,
    /// Raw `Content-Type` value as sent by the server.
    pub content_type: String,
    /// False when the headers matched but no header/body separator was received.
    pub body_available: bool,
    pub events: Vec<SseEvent>,
    pub message_endpoint: Option<String>,
}

impl SseFinding {
    pub fn authority(&self) -> String {
        ProbeConfig::new(self.host.clone(), self.port).authority()
    }
}

/// Why a probe found nothing.
#[derive(Debug)]
pub enum Miss {
    Transport(TransportError),
    NoStatusLine,
    NotSse { status: u16, content_type: Option<String> },
}

impl Miss {
    pub fn kind(&self) -> MissKind {
        match self {
            Miss::Transport(_) => MissKind::Transport,
            Miss::NoStatusLine => MissKind::ParseAmbiguity,
            Miss::NotSse { .. } => MissKind::NotSse,
        }
    }
}

impl std::fmt::Display for Miss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Miss::Transport(e) => write!(f, "{}", e),
            Miss::NoStatusLine => write!(f, "response has no HTTP status line"),
            Miss::NotSse { status, content_type } => write!(
                f,
                "status {} with content type {}",
                status,
                content_type.as_deref().unwrap_or("<none>")
            ),
        }
    }
}

#[derive(Debug)]
pub enum ProbeOutcome {
    Found(SseFinding),
    Miss(Miss),
}

impl ProbeOutcome {
    pub fn finding(&self) -> Option<&SseFinding> {
        match self {
            ProbeOutcome::Found(finding) => Some(finding),
            ProbeOutcome::Miss(_) => None,
        }
    }
}

/// 2xx and a content type containing `text/event-stream`, compared case-insensitively.
pub fn is_sse_response(status: u16, content_type: Option<&str>) -> bool {
    (200..300).contains(&status)
        && content_type
            .map(|ct| ct.to_ascii_lowercase().contains(SSE_CONTENT_TYPE))
            .unwrap_or(false)
}

/// Run one probe. Never fails: every problem becomes a [`Miss`].
pub async fn probe(config: &ProbeConfig) -> ProbeOutcome {
    match transport::fetch(config).await {
        Ok(raw) => evaluate(config, &raw),
        Err(e) => {
            debug!(target_addr = %config.authority(), path = %config.path(), error = %e, "transport failure");
            ProbeOutcome::Miss(Miss::Transport(e))
        }
    }
}

/// Classify raw response bytes and extract events from an SSE body.
pub fn evaluate(config: &ProbeConfig, raw: &[u8]) -> ProbeOutcome {
    let response = http::parse_response(raw);

    if response.status == 0 {
        debug!(target_addr = %config.authority(), "no status line");
        return ProbeOutcome::Miss(Miss::NoStatusLine);
    }

    let content_type = response.content_type();
    if !is_sse_response(response.status, content_type) {
        debug!(
            target_addr = %config.authority(),
            path = %config.path(),
            status = response.status,
            content_type = content_type.unwrap_or(""),
            "not an SSE response"
        );
        return ProbeOutcome::Miss(Miss::NotSse {
            status: response.status,
            content_type: content_type.map(str::to_string),
        });
    }

    let events = match response.body {
        Some(body) => {
            let decoded = chunked::decode(body);
            if matches!(decoded, Cow::Owned(_)) {
                debug!(raw = body.len(), decoded = decoded.len(), "chunked body decoded");
            }
            sse::tokenize(&String::from_utf8_lossy(&decoded))
        }
        None => Vec::new(),
    };

    let message_endpoint = message_endpoint(config, &events);

    ProbeOutcome::Found(SseFinding {
        host: config.host().to_string(),
        port: config.port(),
        path: config.path().to_string(),
        status: response.status,
        content_type: content_type.unwrap_or_default().to_string(),
        body_available: response.body.is_some(),
        events,
        message_endpoint,
    })
}

/// Absolute URL announced by the first `endpoint` event, resolved against the probed path.
pub fn message_endpoint(config: &ProbeConfig, events: &[SseEvent]) -> Option<String> {
    let data = events
        .iter()
        .find(|event| event.event_type == ENDPOINT_EVENT)?
        .data
        .trim();

    if data.is_empty() {
        return None;
    }

    if data.starts_with("http://") || data.starts_with("https://") {
        return Some(data.to_string());
    }

    let authority = config.authority();
    if data.starts_with('/') {
        Some(format!("http://{}{}", authority, data))
    } else {
        let base = config.path().rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        Some(format!("http://{}{}/{}", authority, base, data))
    }
}
