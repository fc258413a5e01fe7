//! Game session — wires the shared units together and runs one game
//!
//! Owns the seat pool, phase signal, and game state for the lifetime of a
//! game, spawns one coordinator task and one task per participant, and
//! joins them all into a [`GameOutcome`].

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::coordinator::{Coordinator, TransitionRecord};
use crate::delay::{DelaySource, RandomDelay, SharedDelaySource};
use crate::error::{GameError, GameResult};
use crate::events::{EventBus, GameEvent, GameId, RoundReport, SharedEventBus};
use crate::participant::{Participant, ParticipantExit, ParticipantState};
use crate::phase::PhaseSignal;
use crate::seat_pool::SeatPool;
use crate::state::{GameState, ParticipantId};

/// Everything a finished game produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOutcome {
    pub game_id: GameId,
    pub winner: ParticipantId,
    /// Participant ids in elimination order
    pub elimination_order: Vec<ParticipantId>,
    pub rounds: u32,
    pub reports: Vec<RoundReport>,
    pub transitions: Vec<TransitionRecord>,
    /// One exit per participant, ordered by id
    pub participants: Vec<ParticipantExit>,
}

/// One configured, not yet started game.
pub struct GameSession {
    game_id: GameId,
    config: GameConfig,
    delay: SharedDelaySource,
    events: SharedEventBus,
}

impl GameSession {
    /// Validate `config` and prepare a session with random music delays.
    pub fn new(config: GameConfig) -> GameResult<Self> {
        config.validate()?;
        Ok(Self {
            game_id: Uuid::new_v4().to_string(),
            config,
            delay: Arc::new(RandomDelay::new()),
            events: EventBus::new().shared(),
        })
    }

    /// Replace the music delay source.
    pub fn with_delay(mut self, delay: impl DelaySource + 'static) -> Self {
        self.delay = Arc::new(delay);
        self
    }

    /// Publish on an existing bus instead of a private one.
    pub fn with_event_bus(mut self, events: SharedEventBus) -> Self {
        self.events = events;
        self
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Subscribe before [`GameSession::run`] to see every event.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Play the game to the end.
    pub async fn run(self) -> GameResult<GameOutcome> {
        let players = self.config.participants;
        let state = GameState::new(players)?.shared();
        let pool = SeatPool::new(players - 1).shared();
        let signal = PhaseSignal::new().shared();

        info!(game_id = %self.game_id, players, "Game starting");
        self.events.publish(GameEvent::GameStarted {
            game_id: self.game_id.clone(),
            participants: players,
            timestamp: Utc::now(),
        });

        let participant_tasks: Vec<_> = ParticipantId::range(players)
            .map(|id| {
                let participant = Participant::new(
                    id,
                    Arc::clone(&pool),
                    Arc::clone(&signal),
                    Arc::clone(&state),
                );
                (id, tokio::spawn(participant.run()))
            })
            .collect();

        let coordinator = Coordinator::new(
            self.game_id.clone(),
            self.config.clone(),
            Arc::clone(&state),
            Arc::clone(&pool),
            Arc::clone(&signal),
            Arc::clone(&self.events),
            Arc::clone(&self.delay),
        );
        let coordinator_result = match tokio::spawn(coordinator.run()).await {
            Ok(result) => result,
            Err(e) => {
                // Nobody else will tear the game down.
                signal.finish();
                pool.close();
                Err(GameError::TaskFailed {
                    task: "coordinator".to_string(),
                    message: e.to_string(),
                })
            }
        };

        let (ids, handles): (Vec<_>, Vec<_>) = participant_tasks.into_iter().unzip();
        let mut exits = Vec::with_capacity(players);
        let mut participant_error = None;
        for (id, joined) in ids.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(Ok(exit)) => exits.push(exit),
                Ok(Err(e)) => {
                    if participant_error.is_none() {
                        participant_error = Some(e);
                    }
                }
                Err(e) => {
                    if participant_error.is_none() {
                        participant_error = Some(GameError::TaskFailed {
                            task: format!("participant {}", id),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        // A participant's own error explains a coordinator abort better.
        let coordinator = match (coordinator_result, participant_error) {
            (_, Some(e)) => return Err(e),
            (Err(e), None) => return Err(e),
            (Ok(outcome), None) => outcome,
        };

        let elimination_order = state.eliminated();
        check_exits(&exits, coordinator.winner, &elimination_order)?;
        let rounds = coordinator.reports.len() as u32;
        info!(
            game_id = %self.game_id,
            winner = %coordinator.winner,
            rounds,
            "Game over"
        );

        Ok(GameOutcome {
            game_id: self.game_id,
            winner: coordinator.winner,
            elimination_order,
            rounds,
            reports: coordinator.reports,
            transitions: coordinator.transitions,
            participants: exits,
        })
    }
}

/// Cross-check how each participant ended against the game state.
fn check_exits(
    exits: &[ParticipantExit],
    winner: ParticipantId,
    eliminated: &[ParticipantId],
) -> GameResult<()> {
    for exit in exits {
        let in_log = eliminated.contains(&exit.id);
        let consistent = match exit.state {
            ParticipantState::Eliminated => in_log,
            ParticipantState::GameOver => exit.id == winner && !in_log,
            other => {
                warn!(participant = %exit.id, state = %other, "Participant exited early");
                false
            }
        };
        if !consistent {
            return Err(GameError::invariant(format!(
                "{} exited as {} but winner is {}",
                exit.id, exit.state, winner
            )));
        }
    }
    if eliminated.len() + 1 != exits.len() {
        return Err(GameError::invariant(format!(
            "{} eliminations for {} participants",
            eliminated.len(),
            exits.len()
        )));
    }
    Ok(())
}
