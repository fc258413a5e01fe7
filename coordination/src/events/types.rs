//! Event types for game progress
//!
//! Everything a presentation layer needs to render a game, as read-only
//! snapshots. The core itself never formats text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{ParticipantId, SeatSnapshot};

/// Unique identifier for a game session
pub type GameId = String;

/// Outcome of one settled round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    /// Seat occupancy after every claim settled
    pub seats: Vec<SeatSnapshot>,
    pub eliminated: ParticipantId,
    pub remaining: usize,
}

/// All game events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Participants spawned, coordinator about to start round 1
    GameStarted {
        game_id: GameId,
        participants: usize,
        timestamp: DateTime<Utc>,
    },

    /// A round began and the music is about to play
    RoundStarted {
        game_id: GameId,
        round: u32,
        participants: usize,
        seats: usize,
        timestamp: DateTime<Utc>,
    },

    /// The music stopped; participants are racing
    MusicStopped {
        game_id: GameId,
        round: u32,
        music_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Every claim and the round's elimination are recorded
    RoundSettled {
        game_id: GameId,
        report: RoundReport,
        timestamp: DateTime<Utc>,
    },

    /// One participant remains
    GameWon {
        game_id: GameId,
        winner: ParticipantId,
        rounds: u32,
        timestamp: DateTime<Utc>,
    },

    /// The game stopped on a coordination error
    GameAborted {
        game_id: GameId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl GameEvent {
    /// Short name used in logs
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::GameStarted { .. } => "game_started",
            Self::RoundStarted { .. } => "round_started",
            Self::MusicStopped { .. } => "music_stopped",
            Self::RoundSettled { .. } => "round_settled",
            Self::GameWon { .. } => "game_won",
            Self::GameAborted { .. } => "game_aborted",
        }
    }

    pub fn game_id(&self) -> &str {
        match self {
            Self::GameStarted { game_id, .. }
            | Self::RoundStarted { game_id, .. }
            | Self::MusicStopped { game_id, .. }
            | Self::RoundSettled { game_id, .. }
            | Self::GameWon { game_id, .. }
            | Self::GameAborted { game_id, .. } => game_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::GameStarted { timestamp, .. }
            | Self::RoundStarted { timestamp, .. }
            | Self::MusicStopped { timestamp, .. }
            | Self::RoundSettled { timestamp, .. }
            | Self::GameWon { timestamp, .. }
            | Self::GameAborted { timestamp, .. } => *timestamp,
        }
    }

    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GameWon { .. } | Self::GameAborted { .. })
    }
}
