//! Poll lifecycle states

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Coarse lifecycle phase of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    Idle,
    Running,
    Succeeded,
    Failed,
    /// Explicitly cancelled or timed out
    Cancelled,
}

impl PollPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollPhase::Succeeded | PollPhase::Failed | PollPhase::Cancelled
        )
    }
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollPhase::Idle => write!(f, "idle"),
            PollPhase::Running => write!(f, "running"),
            PollPhase::Succeeded => write!(f, "succeeded"),
            PollPhase::Failed => write!(f, "failed"),
            PollPhase::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Error raised by a probe, shareable between readers of a finished poll
#[derive(Clone)]
pub struct PollFailure(Arc<anyhow::Error>);

impl PollFailure {
    pub fn new(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.0
    }

    /// Full error chain on one line
    pub fn message(&self) -> String {
        format!("{:#}", self.0)
    }
}

impl fmt::Debug for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PollFailure").field(&self.message()).finish()
    }
}

impl fmt::Display for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

/// Terminal result of a poll
#[derive(Debug, Clone)]
pub enum PollOutcome<T> {
    Succeeded(T),
    Failed(PollFailure),
    /// `cancel()` was called
    Cancelled,
    /// No terminal transition happened before the deadline
    TimedOut { waited: Duration },
}

impl<T> PollOutcome<T> {
    pub fn phase(&self) -> PollPhase {
        match self {
            PollOutcome::Succeeded(_) => PollPhase::Succeeded,
            PollOutcome::Failed(_) => PollPhase::Failed,
            PollOutcome::Cancelled | PollOutcome::TimedOut { .. } => PollPhase::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Succeeded(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PollOutcome::TimedOut { .. })
    }

    pub fn into_result(self) -> Option<T> {
        match self {
            PollOutcome::Succeeded(value) => Some(value),
            _ => None,
        }
    }
}

/// Current state of a poll
#[derive(Debug, Clone)]
pub enum PollState<T> {
    Idle,
    Running,
    Finished(PollOutcome<T>),
}

impl<T> PollState<T> {
    pub fn phase(&self) -> PollPhase {
        match self {
            PollState::Idle => PollPhase::Idle,
            PollState::Running => PollPhase::Running,
            PollState::Finished(outcome) => outcome.phase(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Finished(_))
    }

    pub fn outcome(&self) -> Option<&PollOutcome<T>> {
        match self {
            PollState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}
