//! Core types for the shared game state
//!
//! Seats, participant ids, and the read-only snapshots handed to the
//! presentation layer.

use serde::{Deserialize, Serialize};

/// Participant identifier. Ids run from 1 to the participant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(u32);

impl ParticipantId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Ids `1..=count` for a game of `count` participants.
    pub fn range(count: usize) -> impl Iterator<Item = ParticipantId> {
        (1..=count as u32).map(ParticipantId)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// One admission slot for a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Who currently sits here; `None` when the seat is free.
    pub occupant: Option<ParticipantId>,
}

impl Seat {
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// A seat as seen by an outside reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSnapshot {
    /// 1-based seat number
    pub number: usize,
    pub occupant: Option<ParticipantId>,
}

/// Consistent copy of the whole game state, taken under one lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub round: u32,
    pub initial_count: usize,
    pub remaining: usize,
    pub seats: Vec<SeatSnapshot>,
    /// Elimination log in elimination order
    pub eliminated: Vec<ParticipantId>,
}

impl StateSnapshot {
    /// Number of occupied seats.
    pub fn occupied(&self) -> usize {
        self.seats.iter().filter(|s| s.occupant.is_some()).count()
    }

    /// Most recently eliminated participant.
    pub fn last_eliminated(&self) -> Option<ParticipantId> {
        self.eliminated.last().copied()
    }
}
