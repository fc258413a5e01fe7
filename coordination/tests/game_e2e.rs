//! End-to-end game tests
//!
//! Runs whole games through `GameSession` with deterministic music delays
//! on a paused clock and checks rounds, events, and the final outcome.

use std::collections::HashSet;
use std::time::Duration;

use coordination::{
    FixedDelay, GameConfig, GameEvent, GameSession, ParticipantId, ParticipantState, RoundState,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("coordination=debug")
        .try_init();
}

fn fast_config(players: usize) -> GameConfig {
    GameConfig::new(players)
        .with_max_music(Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(10))
        .with_settle_timeout(Duration::from_secs(10))
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<GameEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Test: four players play three rounds of 3, 2, and 1 seats
#[tokio::test(start_paused = true)]
async fn test_four_player_game() {
    init_tracing();
    let session = GameSession::new(fast_config(4))
        .unwrap()
        .with_delay(FixedDelay(Duration::from_millis(100)));
    let mut rx = session.subscribe();

    let outcome = session.run().await.unwrap();

    assert_eq!(outcome.rounds, 3);
    assert_eq!(outcome.elimination_order.len(), 3);
    assert!(!outcome.elimination_order.contains(&outcome.winner));

    let everyone: HashSet<ParticipantId> = ParticipantId::range(4).collect();
    let mut seen: HashSet<ParticipantId> = outcome.elimination_order.iter().copied().collect();
    seen.insert(outcome.winner);
    assert_eq!(seen, everyone);

    for (i, report) in outcome.reports.iter().enumerate() {
        let round = i as u32 + 1;
        let seats = 3 - i;
        assert_eq!(report.round, round);
        assert_eq!(report.seats.len(), seats);
        assert!(report.seats.iter().all(|s| s.occupant.is_some()));
        assert!(report
            .seats
            .iter()
            .all(|s| s.occupant != Some(report.eliminated)));
        assert_eq!(report.remaining, 3 - i);
        assert_eq!(report.eliminated, outcome.elimination_order[i]);
    }

    let final_seat = &outcome.reports[2].seats[0];
    assert_eq!(final_seat.occupant, Some(outcome.winner));

    let events = drain(&mut rx);
    let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        kinds,
        vec![
            "game_started",
            "round_started",
            "music_stopped",
            "round_settled",
            "round_started",
            "music_stopped",
            "round_settled",
            "round_started",
            "music_stopped",
            "round_settled",
            "game_won",
        ]
    );
    assert!(events.iter().all(|e| e.game_id() == outcome.game_id));

    let seat_counts: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::RoundStarted { seats, .. } => Some(*seats),
            _ => None,
        })
        .collect();
    assert_eq!(seat_counts, vec![3, 2, 1]);

    match events.last() {
        Some(GameEvent::GameWon { winner, rounds, .. }) => {
            assert_eq!(*winner, outcome.winner);
            assert_eq!(*rounds, 3);
        }
        other => panic!("expected game_won, got {:?}", other),
    }
}

/// Test: exactly one participant is eliminated per round
#[tokio::test(start_paused = true)]
async fn test_one_elimination_per_round() {
    let outcome = GameSession::new(fast_config(6))
        .unwrap()
        .with_delay(FixedDelay(Duration::from_millis(50)))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.participants.len(), 6);
    let mut rounds: Vec<u32> = outcome
        .participants
        .iter()
        .filter_map(|exit| exit.eliminated_in)
        .collect();
    rounds.sort();
    assert_eq!(rounds, vec![1, 2, 3, 4, 5]);

    let survivors: Vec<_> = outcome
        .participants
        .iter()
        .filter(|exit| exit.state == ParticipantState::GameOver)
        .collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].id, outcome.winner);
    assert_eq!(survivors[0].rounds_survived, 5);

    for exit in &outcome.participants {
        if let Some(round) = exit.eliminated_in {
            assert_eq!(exit.rounds_survived, round - 1);
        }
    }
}

/// Test: the coordinator walks the legal round sequence and ends Finished
#[tokio::test(start_paused = true)]
async fn test_transition_log() {
    let outcome = GameSession::new(fast_config(3))
        .unwrap()
        .with_delay(FixedDelay(Duration::ZERO))
        .run()
        .await
        .unwrap();

    let states: Vec<RoundState> = outcome.transitions.iter().map(|t| t.to).collect();
    let round = [
        RoundState::MusicPlaying,
        RoundState::MusicStopped,
        RoundState::AwaitSettle,
        RoundState::Eliminate,
        RoundState::AwaitEliminationAck,
        RoundState::Display,
        RoundState::CheckEnd,
    ];
    let mut expected = round.to_vec();
    expected.push(RoundState::RoundStart);
    expected.extend_from_slice(&round);
    expected.push(RoundState::Finished);
    assert_eq!(states, expected);

    let last = outcome.transitions.last().unwrap();
    assert_eq!(last.round, 2);
    assert_eq!(
        last.reason.as_deref(),
        Some(format!("{} wins", outcome.winner).as_str())
    );
}

/// Test: the outcome serializes for an outside reporter
#[tokio::test(start_paused = true)]
async fn test_outcome_serializes() {
    let outcome = GameSession::new(fast_config(3))
        .unwrap()
        .with_delay(FixedDelay(Duration::from_millis(5)))
        .run()
        .await
        .unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["winner"], outcome.winner.get());
    assert_eq!(json["reports"].as_array().unwrap().len(), 2);
    assert_eq!(json["participants"].as_array().unwrap().len(), 3);
}
