use serde::{Deserialize, Serialize};

/// Failure while talking to a target. Never fatal to a sweep: the orchestrator
/// turns every variant into a miss for that one target.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection to {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send request to {addr}: {source}")]
    Send {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("receive from {addr} failed before any data arrived: {source}")]
    Receive {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no data received from {addr}")]
    NoData { addr: String },
}

/// Coarse failure taxonomy carried by a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissKind {
    /// Connect, send or receive failed, or the peer sent nothing.
    Transport,
    /// The bytes did not start with an HTTP status line.
    ParseAmbiguity,
    /// A valid response that is not an SSE stream.
    NotSse,
}

impl std::fmt::Display for MissKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissKind::Transport => write!(f, "transport"),
            MissKind::ParseAmbiguity => write!(f, "parse_ambiguity"),
            MissKind::NotSse => write!(f, "not_sse"),
        }
    }
}
