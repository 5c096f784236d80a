use std::fmt;

use thiserror::Error;

/// Steps of one poll cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lock,
    Auth,
    Fetch,
    Diff,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lock => write!(f, "lock"),
            Stage::Auth => write!(f, "auth"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Diff => write!(f, "diff"),
            Stage::Commit => write!(f, "commit"),
        }
    }
}

/// Why a cycle stopped before committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Busy,
    Storage,
    AuthRejected,
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Busy => write!(f, "state is locked by another poller"),
            FailureKind::Storage => write!(f, "storage error"),
            FailureKind::AuthRejected => write!(f, "authentication rejected"),
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Malformed => write!(f, "malformed payload"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} stage failed ({kind}): {message}")]
pub struct CycleError {
    pub stage: Stage,
    pub kind: FailureKind,
    pub message: String,
}

impl CycleError {
    pub fn new(stage: Stage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    /// The listing arrived but did not have the expected shape.
    pub fn is_parse_error(&self) -> bool {
        self.kind == FailureKind::Malformed
    }
}
