//! Sequence tokens for discarding superseded async results.
//!
//! Take a token before starting work, check it before applying the outcome.
//! Only the most recently issued token is current, so the last request
//! issued wins regardless of completion order.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Identifies one logical session (a navigation, a readiness check cycle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SequenceId(u64);

impl SequenceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct RequestCoordinator {
    /// Last issued value; 0 means nothing issued yet.
    latest: AtomicU64,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next token, starting at 1.
    pub fn next(&self) -> SequenceId {
        SequenceId(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: SequenceId) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    pub fn latest(&self) -> Option<SequenceId> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(SequenceId(n)),
        }
    }
}
