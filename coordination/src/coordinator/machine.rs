//! Round State Machine — explicit coordinator states and legal transition guards.
//!
//! Gives the coordinator loop a typed state model so that:
//! 1. Every step of a round is auditable and logged.
//! 2. Out-of-order steps are rejected by `advance()` instead of silently
//!    corrupting a round.
//! 3. A finished game carries the exact sequence of states it went through.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of coordinator states.
///
/// Every game starts at `RoundStart` and ends at either `Finished` or
/// `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// Clearing and shrinking seats, refilling the seat pool.
    RoundStart,
    /// Music playing for a bounded random time.
    MusicPlaying,
    /// Music just stopped; participants released to race.
    MusicStopped,
    /// Waiting until every seat is claimed.
    AwaitSettle,
    /// Deciding that exactly one participant goes this round.
    Eliminate,
    /// Extra permit handed out, waiting for the loser to report itself.
    AwaitEliminationAck,
    /// Taking the round's snapshot for reporting.
    Display,
    /// Winner check.
    CheckEnd,
    /// One participant left. Terminal.
    Finished,
    /// Coordination error. Terminal.
    Aborted,
}

impl RoundState {
    /// Whether this is a terminal state (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Aborted)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundStart => write!(f, "RoundStart"),
            Self::MusicPlaying => write!(f, "MusicPlaying"),
            Self::MusicStopped => write!(f, "MusicStopped"),
            Self::AwaitSettle => write!(f, "AwaitSettle"),
            Self::Eliminate => write!(f, "Eliminate"),
            Self::AwaitEliminationAck => write!(f, "AwaitEliminationAck"),
            Self::Display => write!(f, "Display"),
            Self::CheckEnd => write!(f, "CheckEnd"),
            Self::Finished => write!(f, "Finished"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Legal transitions between coordinator states.
///
/// ```text
/// RoundStart → MusicPlaying → MusicStopped → AwaitSettle → Eliminate
///   → AwaitEliminationAck → Display → CheckEnd → RoundStart | Finished
/// ```
fn is_legal_transition(from: RoundState, to: RoundState) -> bool {
    use RoundState::*;

    // Any non-terminal state can abort.
    if to == Aborted && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (RoundStart, MusicPlaying)
            | (MusicPlaying, MusicStopped)
            | (MusicStopped, AwaitSettle)
            | (AwaitSettle, Eliminate)
            | (Eliminate, AwaitEliminationAck)
            | (AwaitEliminationAck, Display)
            | (Display, CheckEnd)
            | (CheckEnd, RoundStart)
            | (CheckEnd, Finished)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: RoundState,
    pub to: RoundState,
    /// Round number at the time of transition.
    pub round: u32,
    /// Milliseconds since the state machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: RoundState,
    pub to: RoundState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal round transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// The coordinator's round state machine.
pub struct RoundStateMachine {
    current: RoundState,
    round: u32,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl RoundStateMachine {
    /// Create a new state machine starting at `RoundStart`.
    pub fn new() -> Self {
        Self {
            current: RoundState::RoundStart,
            round: 0,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> RoundState {
        self.current
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn set_round(&mut self, round: u32) {
        self.round = round;
    }

    /// Attempt to advance to the next state.
    pub fn advance(
        &mut self,
        to: RoundState,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            round: self.round,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(
            from = %self.current,
            to = %to,
            round = self.round,
            "Round transition"
        );

        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    /// Move to `Aborted` from any non-terminal state.
    pub fn abort(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(RoundState::Aborted, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// One-line history, e.g. for the final log line.
    pub fn summary(&self) -> String {
        format!(
            "{} → {} (round {}, {}ms, {} transitions)",
            RoundState::RoundStart,
            self.current,
            self.round,
            self.created_at.elapsed().as_millis(),
            self.transitions.len(),
        )
    }
}

impl Default for RoundStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
