//! Shared types for agent invocations and streamed progress events.

use serde::{Deserialize, Serialize};

/// Outcome of a single agent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Agent produced usable text
    Success,
    /// Agent completed but yielded no usable text
    Degraded,
    /// Agent errored or timed out on every attempt
    Failed,
}

/// One result per declared agent per request, immutable once recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInvocationResult {
    pub status: AgentStatus,
    pub text: String,
    pub duration_ms: u64,
}

impl AgentInvocationResult {
    /// Empty failed result, used when an agent never produced anything
    pub fn failed() -> Self {
        Self {
            status: AgentStatus::Failed,
            text: String::new(),
            duration_ms: 0,
        }
    }
}

/// Event types streamed to the client during a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Info,
    Update,
    Degraded,
    Final,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Update => "update",
            Self::Degraded => "degraded",
            Self::Final => "final",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single progress or result event, consumed exactly once by the SSE boundary
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub agent: Option<&'static str>,
    pub data: String,
}

impl StreamEvent {
    pub fn new(kind: EventKind, agent: Option<&'static str>, data: impl Into<String>) -> Self {
        Self {
            kind,
            agent,
            data: data.into(),
        }
    }
}
