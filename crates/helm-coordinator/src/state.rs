//! Participant attempt state machine
//!
//! `Sent -> (Prepared | Failed)`, then from `Prepared` either `Committed` or
//! `RolledBack`. `Failed`, `Committed` and `RolledBack` are terminal.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// State of one coordinator/participant attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptState {
    /// Dispatched, awaiting prepared or failed
    Sent,
    /// Participant prepared; awaiting the caller's decision
    Prepared,
    /// Participant failed, or the attempt was cancelled before preparing
    Failed,
    /// Commit decided
    Committed,
    /// Rollback decided
    RolledBack,
}

impl AttemptState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Committed | Self::RolledBack)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_advance_to(self, next: AttemptState) -> bool {
        matches!(
            (self, next),
            (Self::Sent, Self::Prepared)
                | (Self::Sent, Self::Failed)
                | (Self::Prepared, Self::Committed)
                | (Self::Prepared, Self::RolledBack)
        )
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Sent => "sent",
            Self::Prepared => "prepared",
            Self::Failed => "failed",
            Self::Committed => "committed",
            Self::RolledBack => "rolled-back",
        };
        f.write_str(text)
    }
}

/// Shared, lock-protected attempt state
#[derive(Debug, Clone)]
pub(crate) struct AttemptTracker {
    state: Arc<Mutex<AttemptState>>,
}

impl AttemptTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(AttemptState::Sent)),
        }
    }

    pub(crate) fn get(&self) -> AttemptState {
        *self.state.lock()
    }

    /// Move to `next` if legal; illegal transitions are logged and ignored
    pub(crate) fn advance(&self, next: AttemptState) -> bool {
        let mut state = self.state.lock();
        if state.can_advance_to(next) {
            *state = next;
            true
        } else {
            warn!(from = %*state, to = %next, "Ignoring illegal attempt transition");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        let tracker = AttemptTracker::new();
        assert!(!tracker.advance(AttemptState::Committed));
        assert!(tracker.advance(AttemptState::Prepared));
        assert!(!tracker.advance(AttemptState::Failed));
        assert!(tracker.advance(AttemptState::RolledBack));
        assert!(tracker.get().is_terminal());
        assert!(!tracker.advance(AttemptState::Committed));
    }
}
