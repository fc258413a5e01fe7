//! Game state — seats, survivors, and the elimination log
//!
//! All mutation goes through [`GameState`], which keeps the data behind a
//! single mutex. Every public method is one critical section.

use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use super::types::{ParticipantId, Seat, SeatSnapshot, StateSnapshot};
use crate::error::{GameError, GameResult};
use crate::seat_pool::lock_or_recover;

/// Shared reference to GameState
pub type SharedGameState = Arc<GameState>;

#[derive(Debug)]
struct Table {
    initial_count: usize,
    remaining: usize,
    round: u32,
    seats: Vec<Seat>,
    eliminated: Vec<ParticipantId>,
}

impl Table {
    fn check_known(&self, id: ParticipantId) -> GameResult<()> {
        if id.get() == 0 || id.get() as usize > self.initial_count {
            return Err(GameError::invariant(format!(
                "{} is not a participant of a {}-player game",
                id, self.initial_count
            )));
        }
        if self.eliminated.contains(&id) {
            return Err(GameError::invariant(format!(
                "{} was already eliminated",
                id
            )));
        }
        Ok(())
    }

    fn is_seated(&self, id: ParticipantId) -> bool {
        self.seats.iter().any(|s| s.occupant == Some(id))
    }
}

/// The round's mutable data, owned by the session.
#[derive(Debug)]
pub struct GameState {
    inner: Mutex<Table>,
}

impl GameState {
    /// Create the state for `participants` players with `participants - 1`
    /// empty seats.
    pub fn new(participants: usize) -> GameResult<Self> {
        if participants < 2 {
            return Err(GameError::invalid_config(format!(
                "at least 2 participants are needed, got {}",
                participants
            )));
        }
        Ok(Self {
            inner: Mutex::new(Table {
                initial_count: participants,
                remaining: participants,
                round: 0,
                seats: vec![Seat::default(); participants - 1],
                eliminated: Vec::new(),
            }),
        })
    }

    /// Create a shared reference to this state
    pub fn shared(self) -> SharedGameState {
        Arc::new(self)
    }

    /// Put `id` in the first free seat. Returns `false` when every seat is taken.
    pub fn claim_seat(&self, id: ParticipantId) -> GameResult<bool> {
        let mut table = lock_or_recover(&self.inner);
        table.check_known(id)?;
        if table.is_seated(id) {
            error!(participant = %id, "Participant claimed a second seat");
            return Err(GameError::invariant(format!("{} already holds a seat", id)));
        }

        let claimed = match table.seats.iter_mut().position(|s| s.is_free()) {
            Some(index) => {
                table.seats[index].occupant = Some(id);
                debug!(participant = %id, seat = index + 1, "Seat claimed");
                true
            }
            None => false,
        };
        Ok(claimed)
    }

    /// Mark every seat free.
    pub fn clear_seats(&self) {
        let mut table = lock_or_recover(&self.inner);
        for seat in table.seats.iter_mut() {
            seat.occupant = None;
        }
    }

    /// Remove exactly one seat. Returns the new seat count.
    pub fn shrink_seats(&self) -> GameResult<usize> {
        let mut table = lock_or_recover(&self.inner);
        if table.seats.pop().is_none() {
            return Err(GameError::invariant("no seat left to remove"));
        }
        Ok(table.seats.len())
    }

    /// Append `id` to the elimination log and drop the survivor count.
    pub fn record_elimination(&self, id: ParticipantId) -> GameResult<()> {
        let mut table = lock_or_recover(&self.inner);
        table.check_known(id)?;
        if table.is_seated(id) {
            return Err(GameError::invariant(format!(
                "{} holds a seat and cannot be eliminated",
                id
            )));
        }
        if table.remaining <= 1 {
            return Err(GameError::invariant(format!(
                "eliminating {} would leave no winner",
                id
            )));
        }

        table.eliminated.push(id);
        table.remaining -= 1;
        debug_assert_eq!(
            table.remaining,
            table.initial_count - table.eliminated.len()
        );
        debug!(participant = %id, remaining = table.remaining, "Elimination recorded");
        Ok(())
    }

    /// The winner, once a single participant remains.
    ///
    /// The winner is the occupant of the final round's sole seat, and must not
    /// appear in the elimination log.
    pub fn winner_id(&self) -> GameResult<Option<ParticipantId>> {
        let table = lock_or_recover(&self.inner);
        if table.remaining != 1 {
            return Ok(None);
        }

        let occupant = match table.seats.as_slice() {
            [seat] => seat.occupant,
            seats => {
                return Err(GameError::invariant(format!(
                    "final round has {} seats instead of 1",
                    seats.len()
                )))
            }
        };
        match occupant {
            Some(id) if !table.eliminated.contains(&id) => Ok(Some(id)),
            Some(id) => Err(GameError::invariant(format!(
                "winner {} is in the elimination log",
                id
            ))),
            None => Err(GameError::invariant("final seat is empty")),
        }
    }

    /// Advance the round counter. Returns the new round number (1-based).
    pub fn begin_round(&self) -> u32 {
        let mut table = lock_or_recover(&self.inner);
        table.round += 1;
        table.round
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> StateSnapshot {
        let table = lock_or_recover(&self.inner);
        StateSnapshot {
            round: table.round,
            initial_count: table.initial_count,
            remaining: table.remaining,
            seats: table
                .seats
                .iter()
                .enumerate()
                .map(|(i, seat)| SeatSnapshot {
                    number: i + 1,
                    occupant: seat.occupant,
                })
                .collect(),
            eliminated: table.eliminated.clone(),
        }
    }

    pub fn occupied_count(&self) -> usize {
        let table = lock_or_recover(&self.inner);
        table.seats.iter().filter(|s| !s.is_free()).count()
    }

    pub fn seat_count(&self) -> usize {
        lock_or_recover(&self.inner).seats.len()
    }

    pub fn remaining(&self) -> usize {
        lock_or_recover(&self.inner).remaining
    }

    pub fn initial_count(&self) -> usize {
        lock_or_recover(&self.inner).initial_count
    }

    pub fn round(&self) -> u32 {
        lock_or_recover(&self.inner).round
    }

    /// Elimination log in elimination order.
    pub fn eliminated(&self) -> Vec<ParticipantId> {
        lock_or_recover(&self.inner).eliminated.clone()
    }

    pub fn last_eliminated(&self) -> Option<ParticipantId> {
        lock_or_recover(&self.inner).eliminated.last().copied()
    }
}
