//! Error types for the presence layer.

use crate::Phase;

/// Errors that can occur while driving a room session's state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceError {
    /// The operation is not allowed in the current phase, e.g. publishing
    /// a reaction before entry has completed.
    #[error("cannot {operation} while {phase}")]
    InvalidPhase {
        phase: Phase,
        operation: &'static str,
    },
}
