//! Console rendering of game events.

use coordination::GameEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

pub const OPENING: &str = "The musical chairs game is about to begin";
pub const CLOSING: &str = "Musical chairs finished.";

/// Lines to print for one event.
pub fn render_event(event: &GameEvent) -> Vec<String> {
    match event {
        GameEvent::GameStarted { .. } => Vec::new(),
        GameEvent::RoundStarted {
            round,
            participants,
            seats,
            ..
        } => {
            if *round == 1 {
                vec![
                    format!(
                        "Starting round with {} players and {} chairs.",
                        participants, seats
                    ),
                    "The music is playing".to_string(),
                    String::new(),
                ]
            } else {
                vec![
                    format!(
                        "Next round with {} players and {} chairs.",
                        participants, seats
                    ),
                    "The music started playing".to_string(),
                    String::new(),
                ]
            }
        }
        GameEvent::MusicStopped { .. } => vec!["> The music stopped".to_string(), String::new()],
        GameEvent::RoundSettled { report, .. } => {
            let mut lines: Vec<String> = report
                .seats
                .iter()
                .map(|seat| match seat.occupant {
                    Some(id) => format!("[Chair {}]: occupied by {}", seat.number, id),
                    None => format!("[Chair {}]: empty", seat.number),
                })
                .collect();
            lines.push(format!("Player {} is out of the game", report.eliminated));
            lines.push(String::new());
            lines
        }
        GameEvent::GameWon { winner, .. } => {
            vec![format!("The winner is Player {}! Congratulations! 🏆", winner)]
        }
        GameEvent::GameAborted { reason, .. } => vec![format!("Game aborted: {}", reason)],
    }
}

/// Print events until the game ends.
pub async fn print_events(mut rx: broadcast::Receiver<GameEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                for line in render_event(&event) {
                    println!("{}", line);
                }
                if event.is_terminal() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Console fell behind, events skipped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coordination::{ParticipantId, RoundReport, SeatSnapshot};

    #[test]
    fn test_first_and_later_round_banners() {
        let first = GameEvent::RoundStarted {
            game_id: "g".into(),
            round: 1,
            participants: 4,
            seats: 3,
            timestamp: Utc::now(),
        };
        assert_eq!(
            render_event(&first)[0],
            "Starting round with 4 players and 3 chairs."
        );

        let later = GameEvent::RoundStarted {
            game_id: "g".into(),
            round: 2,
            participants: 3,
            seats: 2,
            timestamp: Utc::now(),
        };
        let lines = render_event(&later);
        assert_eq!(lines[0], "Next round with 3 players and 2 chairs.");
        assert_eq!(lines[1], "The music started playing");
    }

    #[test]
    fn test_round_settled_lists_chairs_and_loser() {
        let event = GameEvent::RoundSettled {
            game_id: "g".into(),
            report: RoundReport {
                round: 1,
                seats: vec![
                    SeatSnapshot {
                        number: 1,
                        occupant: Some(ParticipantId::new(3)),
                    },
                    SeatSnapshot {
                        number: 2,
                        occupant: Some(ParticipantId::new(1)),
                    },
                ],
                eliminated: ParticipantId::new(2),
                remaining: 2,
            },
            timestamp: Utc::now(),
        };

        let lines = render_event(&event);
        assert_eq!(lines[0], "[Chair 1]: occupied by P3");
        assert_eq!(lines[1], "[Chair 2]: occupied by P1");
        assert_eq!(lines[2], "Player P2 is out of the game");
    }

    #[test]
    fn test_winner_line() {
        let event = GameEvent::GameWon {
            game_id: "g".into(),
            winner: ParticipantId::new(4),
            rounds: 3,
            timestamp: Utc::now(),
        };
        assert_eq!(
            render_event(&event),
            vec!["The winner is Player P4! Congratulations! 🏆".to_string()]
        );
    }

    #[tokio::test]
    async fn test_printer_stops_on_terminal_event() {
        let (tx, rx) = broadcast::channel(8);
        let printer = tokio::spawn(print_events(rx));
        tx.send(GameEvent::GameAborted {
            game_id: "g".into(),
            reason: "test".into(),
            timestamp: Utc::now(),
        })
        .unwrap();
        printer.await.unwrap();
    }
}
