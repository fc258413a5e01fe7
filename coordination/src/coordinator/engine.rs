//! Coordinator — drives rounds from music to elimination
//!
//! The coordinator is the only writer of the phase signal and the only task
//! that refills the seat pool. It never blocks on participants: it learns a
//! round has settled by probing the pool and reading the game state on a
//! fixed interval.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::machine::{RoundState, RoundStateMachine, TransitionRecord};
use crate::config::GameConfig;
use crate::delay::SharedDelaySource;
use crate::error::{GameError, GameResult};
use crate::events::{GameEvent, GameId, RoundReport, SharedEventBus};
use crate::phase::SharedPhaseSignal;
use crate::seat_pool::SharedSeatPool;
use crate::state::{GameState, ParticipantId, SharedGameState};

/// What the coordinator hands back after a finished game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorOutcome {
    pub winner: ParticipantId,
    pub reports: Vec<RoundReport>,
    pub transitions: Vec<TransitionRecord>,
}

/// The round driver.
pub struct Coordinator {
    game_id: GameId,
    config: GameConfig,
    state: SharedGameState,
    pool: SharedSeatPool,
    signal: SharedPhaseSignal,
    events: SharedEventBus,
    delay: SharedDelaySource,
    machine: RoundStateMachine,
    reports: Vec<RoundReport>,
}

impl Coordinator {
    pub fn new(
        game_id: GameId,
        config: GameConfig,
        state: SharedGameState,
        pool: SharedSeatPool,
        signal: SharedPhaseSignal,
        events: SharedEventBus,
        delay: SharedDelaySource,
    ) -> Self {
        Self {
            game_id,
            config,
            state,
            pool,
            signal,
            events,
            delay,
            machine: RoundStateMachine::new(),
            reports: Vec::new(),
        }
    }

    /// Run rounds until one participant remains.
    ///
    /// On error the game is torn down (phase signal finished, pool closed) so
    /// no participant stays blocked, and the error is returned.
    pub async fn run(mut self) -> GameResult<CoordinatorOutcome> {
        match self.play().await {
            Ok(winner) => {
                info!(summary = %self.machine.summary(), "Coordinator finished");
                Ok(CoordinatorOutcome {
                    winner,
                    reports: self.reports,
                    transitions: self.machine.into_transitions(),
                })
            }
            Err(e) => {
                error!(
                    error = %e,
                    state = %self.machine.current(),
                    round = self.machine.round(),
                    "Coordinator aborting game"
                );
                if let Err(illegal) = self.machine.abort(&e.to_string()) {
                    warn!(%illegal, "Abort after terminal state");
                }
                self.signal.finish();
                self.pool.close();
                self.events.publish(GameEvent::GameAborted {
                    game_id: self.game_id.clone(),
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn play(&mut self) -> GameResult<ParticipantId> {
        loop {
            // RoundStart
            let round = self.state.begin_round();
            self.machine.set_round(round);
            if round > 1 {
                self.state.clear_seats();
                let seats = self.state.shrink_seats()?;
                self.pool.reset_for_round(seats)?;
            }
            let seats = self.state.seat_count();
            let participants = self.state.remaining();
            if seats + 1 != participants || self.pool.available() != seats {
                return Err(GameError::invariant(format!(
                    "round {} opened with {} seats, {} free permits for {} participants",
                    round,
                    seats,
                    self.pool.available(),
                    participants
                )));
            }
            info!(round, participants, seats, "Round started");
            self.events.publish(GameEvent::RoundStarted {
                game_id: self.game_id.clone(),
                round,
                participants,
                seats,
                timestamp: Utc::now(),
            });

            self.step(RoundState::MusicPlaying, None)?;
            self.signal.set_playing();
            let music = self.delay.next_delay(self.config.max_music);
            debug!(round, music_ms = music.as_millis() as u64, "Music playing");
            tokio::time::sleep(music).await;

            self.step(RoundState::MusicStopped, None)?;
            self.signal.set_stopped();
            info!(round, "Music stopped");
            self.events.publish(GameEvent::MusicStopped {
                game_id: self.game_id.clone(),
                round,
                music_ms: music.as_millis() as u64,
                timestamp: Utc::now(),
            });

            self.step(RoundState::AwaitSettle, None)?;
            self.settle("seat settle", round, |state| {
                Ok(state.occupied_count() == seats)
            })
            .await?;

            // Exactly one participant is left queued at the pool.
            self.step(RoundState::Eliminate, None)?;
            let expected = participants - 1;

            self.step(RoundState::AwaitEliminationAck, None)?;
            self.pool.release(1)?;
            self.settle("elimination ack", round, |state| {
                let remaining = state.remaining();
                if remaining < expected {
                    return Err(GameError::invariant(format!(
                        "round {} eliminated {} participants",
                        round,
                        participants - remaining
                    )));
                }
                Ok(remaining == expected)
            })
            .await?;

            self.step(RoundState::Display, None)?;
            let report = self.report(round, seats, expected)?;
            info!(
                round,
                eliminated = %report.eliminated,
                remaining = report.remaining,
                "Round settled"
            );
            self.events.publish(GameEvent::RoundSettled {
                game_id: self.game_id.clone(),
                report: report.clone(),
                timestamp: Utc::now(),
            });
            self.reports.push(report);

            self.step(RoundState::CheckEnd, None)?;
            if expected == 1 {
                // Publish game over together with the final Playing phase.
                self.signal.finish();
                self.pool.close();
                let winner = self
                    .state
                    .winner_id()?
                    .ok_or_else(|| GameError::invariant("one participant left but no winner"))?;
                self.step(RoundState::Finished, Some(&format!("{} wins", winner)))?;
                info!(%winner, rounds = round, "Game won");
                self.events.publish(GameEvent::GameWon {
                    game_id: self.game_id.clone(),
                    winner,
                    rounds: round,
                    timestamp: Utc::now(),
                });
                return Ok(winner);
            }

            self.signal.set_playing();
            self.step(RoundState::RoundStart, None)?;
        }
    }

    fn step(&mut self, to: RoundState, reason: Option<&str>) -> GameResult<()> {
        self.machine
            .advance(to, reason)
            .map_err(|e| GameError::invariant(e.to_string()))
    }

    /// Poll until no permit is free and `done` holds for the game state.
    ///
    /// The pool is probed before the state is read; the two locks are never
    /// held together.
    async fn settle<F>(&self, stage: &str, round: u32, mut done: F) -> GameResult<()>
    where
        F: FnMut(&GameState) -> GameResult<bool>,
    {
        let started = Instant::now();
        let mut polls = 0u32;
        loop {
            if self.signal.is_game_over() {
                return Err(GameError::TaskFailed {
                    task: "participant".to_string(),
                    message: format!("game aborted during {} of round {}", stage, round),
                });
            }

            let permit_free = self.pool.probe()?;
            if !permit_free && done(self.state.as_ref())? {
                debug!(stage, round, polls, "Settled");
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= self.config.settle_timeout {
                return Err(GameError::SettleTimeout {
                    stage: stage.to_string(),
                    round,
                    waited_ms: duration_ms(waited),
                });
            }
            polls += 1;
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    fn report(&self, round: u32, seats: usize, expected: usize) -> GameResult<RoundReport> {
        let snapshot = self.state.snapshot();
        if snapshot.occupied() != seats {
            return Err(GameError::invariant(format!(
                "round {} settled with {}/{} seats occupied",
                round,
                snapshot.occupied(),
                seats
            )));
        }
        if snapshot.eliminated.len() != snapshot.initial_count - expected {
            return Err(GameError::invariant(format!(
                "elimination log has {} entries after round {}",
                snapshot.eliminated.len(),
                round
            )));
        }
        let eliminated = snapshot
            .last_eliminated()
            .ok_or_else(|| GameError::invariant("no elimination recorded"))?;

        Ok(RoundReport {
            round,
            seats: snapshot.seats,
            eliminated,
            remaining: snapshot.remaining,
        })
    }
}

fn duration_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::FixedDelay;
    use crate::events::EventBus;
    use crate::phase::PhaseSignal;
    use crate::seat_pool::SeatPool;
    use std::sync::Arc;

    fn coordinator(players: usize, config: GameConfig) -> (Coordinator, SharedGameState) {
        let state = GameState::new(players).unwrap().shared();
        let coordinator = Coordinator::new(
            "test-game".to_string(),
            config,
            Arc::clone(&state),
            SeatPool::new(players - 1).shared(),
            PhaseSignal::new().shared(),
            EventBus::new().shared(),
            Arc::new(FixedDelay(Duration::from_millis(10))),
        );
        (coordinator, state)
    }

    fn fast_config(players: usize) -> GameConfig {
        GameConfig::new(players)
            .with_max_music(Duration::from_millis(100))
            .with_poll_interval(Duration::from_millis(5))
            .with_settle_timeout(Duration::from_millis(500))
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_participants() {
        let (coordinator, _) = coordinator(3, fast_config(3));
        let pool = Arc::clone(&coordinator.pool);
        let signal = Arc::clone(&coordinator.signal);

        let err = coordinator.run().await.unwrap_err();
        assert!(matches!(
            err,
            GameError::SettleTimeout { round: 1, ref stage, .. } if stage == "seat settle"
        ));
        // Teardown leaves nothing to block on.
        assert!(signal.is_game_over());
        assert!(pool.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_abort_event() {
        let (coordinator, _) = coordinator(2, fast_config(2));
        let mut rx = coordinator.events.subscribe();

        assert!(coordinator.run().await.is_err());

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(GameEvent::GameAborted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborts_when_round_eliminates_twice() {
        let (coordinator, state) = coordinator(4, fast_config(4));
        let pool = Arc::clone(&coordinator.pool);
        let signal = Arc::clone(&coordinator.signal);
        let mut rx = coordinator.events.subscribe();
        let driver = tokio::spawn(coordinator.run());

        signal.wait_until(crate::phase::Phase::Stopped, 0).await;
        for id in 1..=3 {
            pool.acquire().await.unwrap();
            assert!(state.claim_seat(ParticipantId::new(id)).unwrap());
        }

        // The loser's permit, then a second participant drops out as well.
        pool.acquire().await.unwrap();
        state.record_elimination(ParticipantId::new(4)).unwrap();
        state.clear_seats();
        state.record_elimination(ParticipantId::new(1)).unwrap();

        let err = driver.await.unwrap().unwrap_err();
        match err {
            GameError::InvariantViolation { ref detail } => {
                assert!(detail.contains("eliminated 2 participants"), "{}", detail);
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }
        assert!(signal.is_game_over());
        assert!(pool.is_closed());

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(GameEvent::GameAborted { .. })));
    }

    #[test]
    fn test_report_rejects_unsettled_round() {
        let (coordinator, state) = coordinator(3, fast_config(3));
        state.begin_round();
        state.claim_seat(ParticipantId::new(1)).unwrap();

        let err = coordinator.report(1, 2, 2).unwrap_err();
        assert!(matches!(err, GameError::InvariantViolation { .. }));
    }
}
