//! Participant — one player's loop
//!
//! ```text
//! WaitingForStop ──stopped──▶ Racing ──seat──▶ WaitingForRestart ──playing──▶ WaitingForStop
//!       │                       │                      │
//!       │ game over             │ no seat              │ game over
//!       ▼                       ▼                      ▼
//!    GameOver               Eliminated              GameOver
//! ```
//!
//! A participant that passes the seat pool but finds every seat taken
//! records its own elimination and stops for good.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{GameError, GameResult};
use crate::phase::{Phase, SharedPhaseSignal};
use crate::seat_pool::SharedSeatPool;
use crate::state::{ParticipantId, SharedGameState};

/// States of the participant loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantState {
    /// Music playing, waiting for it to stop.
    WaitingForStop,
    /// Competing for a seat.
    Racing,
    /// Seated, waiting for the next round's music.
    WaitingForRestart,
    /// Lost a round. Terminal.
    Eliminated,
    /// Game ended while still in play. Terminal.
    GameOver,
}

impl ParticipantState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Eliminated | Self::GameOver)
    }
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingForStop => write!(f, "WaitingForStop"),
            Self::Racing => write!(f, "Racing"),
            Self::WaitingForRestart => write!(f, "WaitingForRestart"),
            Self::Eliminated => write!(f, "Eliminated"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}

/// How a participant left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantExit {
    pub id: ParticipantId,
    /// `Eliminated` or `GameOver`
    pub state: ParticipantState,
    /// Rounds in which this participant got a seat
    pub rounds_survived: u32,
    /// Round of elimination, if eliminated
    pub eliminated_in: Option<u32>,
}

/// One player, sharing the pool, the signal, and the state with everyone else.
pub struct Participant {
    id: ParticipantId,
    pool: SharedSeatPool,
    signal: SharedPhaseSignal,
    state: SharedGameState,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        pool: SharedSeatPool,
        signal: SharedPhaseSignal,
        state: SharedGameState,
    ) -> Self {
        Self {
            id,
            pool,
            signal,
            state,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Play until eliminated or the game ends.
    ///
    /// On a contract breach the whole game is torn down so no other task
    /// stays blocked, and the error is returned.
    pub async fn run(self) -> GameResult<ParticipantExit> {
        match self.play().await {
            Ok(exit) => Ok(exit),
            Err(e) => {
                error!(participant = %self.id, error = %e, "Participant failed, aborting game");
                self.signal.finish();
                self.pool.close();
                Err(e)
            }
        }
    }

    async fn play(&self) -> GameResult<ParticipantExit> {
        let mut current = ParticipantState::WaitingForStop;
        // Generation of the last Stopped phase this participant raced in.
        let mut raced_at = 0u64;
        let mut rounds_survived = 0u32;

        loop {
            let next = match current {
                ParticipantState::WaitingForStop => {
                    let view = self.signal.wait_until(Phase::Stopped, raced_at).await;
                    if view.game_over {
                        ParticipantState::GameOver
                    } else {
                        raced_at = view.generation;
                        ParticipantState::Racing
                    }
                }
                ParticipantState::Racing => match self.pool.acquire().await {
                    Ok(()) => {
                        if self.state.claim_seat(self.id)? {
                            rounds_survived += 1;
                            ParticipantState::WaitingForRestart
                        } else {
                            ParticipantState::Eliminated
                        }
                    }
                    Err(GameError::PoolClosed) => ParticipantState::GameOver,
                    Err(e) => return Err(e),
                },
                ParticipantState::WaitingForRestart => {
                    let view = self.signal.wait_until(Phase::Playing, raced_at).await;
                    if view.game_over {
                        ParticipantState::GameOver
                    } else {
                        ParticipantState::WaitingForStop
                    }
                }
                ParticipantState::Eliminated => {
                    self.state.record_elimination(self.id)?;
                    let round = self.state.round();
                    info!(participant = %self.id, round, "Participant eliminated");
                    return Ok(ParticipantExit {
                        id: self.id,
                        state: current,
                        rounds_survived,
                        eliminated_in: Some(round),
                    });
                }
                ParticipantState::GameOver => {
                    debug!(participant = %self.id, rounds_survived, "Participant done");
                    return Ok(ParticipantExit {
                        id: self.id,
                        state: current,
                        rounds_survived,
                        eliminated_in: None,
                    });
                }
            };

            debug!(participant = %self.id, from = %current, to = %next, "Participant step");
            current = next;
        }
    }
}
