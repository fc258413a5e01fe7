//! Game error types
//!
//! Normal outcomes (losing a seat race, waking up with the phase unchanged)
//! are never errors. What lands here is either misuse of a primitive or a
//! broken coordination contract, and the session stops on all of it.

use thiserror::Error;

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors that can occur while setting up or running a game
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Configuration rejected before any task was spawned
    #[error("Invalid game configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A coordination invariant was broken (double claim, double elimination, ...)
    #[error("Invariant violation: {detail}")]
    InvariantViolation { detail: String },

    /// More permits released than the round's capacity allows
    #[error("Seat pool over-release: {requested} requested with {available}/{capacity} free")]
    OverRelease {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    /// The seat pool was closed because the game is over
    #[error("Seat pool closed")]
    PoolClosed,

    /// A settle poll never observed the expected state
    #[error("Round {round} did not settle during {stage} within {waited_ms}ms")]
    SettleTimeout {
        stage: String,
        round: u32,
        waited_ms: u64,
    },

    /// A spawned task panicked or was cancelled
    #[error("Task {task} failed: {message}")]
    TaskFailed { task: String, message: String },
}

impl GameError {
    /// Shorthand for an invariant violation
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            detail: detail.into(),
        }
    }

    /// Shorthand for a rejected configuration
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this error means the coordination protocol itself is broken.
    pub fn is_contract_breach(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolation { .. } | Self::OverRelease { .. } | Self::SettleTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GameError::invariant("seat 0 claimed twice");
        assert_eq!(err.to_string(), "Invariant violation: seat 0 claimed twice");

        let err = GameError::OverRelease {
            requested: 2,
            available: 1,
            capacity: 2,
        };
        assert_eq!(
            err.to_string(),
            "Seat pool over-release: 2 requested with 1/2 free"
        );
    }

    #[test]
    fn test_contract_breach_classification() {
        assert!(GameError::invariant("x").is_contract_breach());
        assert!(GameError::SettleTimeout {
            stage: "settle".into(),
            round: 1,
            waited_ms: 10,
        }
        .is_contract_breach());
        assert!(!GameError::PoolClosed.is_contract_breach());
        assert!(!GameError::invalid_config("n < 2").is_contract_breach());
    }
}
