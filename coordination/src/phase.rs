//! Phase signal — the music barrier between coordinator and participants
//!
//! One writer (the coordinator) flips the phase between `Playing` and
//! `Stopped`; any number of participants wait for a phase to be entered.
//!
//! Every real transition bumps a generation counter. Playing generations are
//! even and Stopped generations are odd, starting from Playing at 0. Waiters
//! ask "has `phase` been entered after generation `since`", which stays true
//! even if the phase flipped again before the waiter was scheduled.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// Shared reference to a PhaseSignal
pub type SharedPhaseSignal = Arc<PhaseSignal>;

/// The two mutually exclusive music phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Music is playing; participants may not race.
    Playing,
    /// Music stopped; participants race for seats.
    Stopped,
}

impl Phase {
    fn parity(self) -> u64 {
        match self {
            Self::Playing => 0,
            Self::Stopped => 1,
        }
    }

    fn of_generation(generation: u64) -> Self {
        if generation % 2 == 0 {
            Self::Playing
        } else {
            Self::Stopped
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// What a waiter observed when it was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseView {
    pub phase: Phase,
    pub generation: u64,
    pub game_over: bool,
}

impl PhaseView {
    fn initial() -> Self {
        Self {
            phase: Phase::Playing,
            generation: 0,
            game_over: false,
        }
    }

    /// Whether `phase` has been entered at some generation after `since`.
    fn has_entered_since(&self, phase: Phase, since: u64) -> bool {
        let next = since + 1;
        let target = if next % 2 == phase.parity() {
            next
        } else {
            next + 1
        };
        self.generation >= target
    }
}

/// Broadcast barrier carrying the current phase and the game-over flag.
#[derive(Debug)]
pub struct PhaseSignal {
    tx: watch::Sender<PhaseView>,
}

impl PhaseSignal {
    /// Create a signal in the `Playing` phase at generation 0.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(PhaseView::initial());
        Self { tx }
    }

    /// Create a shared reference to this signal
    pub fn shared(self) -> SharedPhaseSignal {
        Arc::new(self)
    }

    /// Enter `Playing`. Returns `false` if already playing or the game is over.
    pub fn set_playing(&self) -> bool {
        self.transition(Phase::Playing)
    }

    /// Enter `Stopped`. Returns `false` if already stopped or the game is over.
    pub fn set_stopped(&self) -> bool {
        self.transition(Phase::Stopped)
    }

    fn transition(&self, to: Phase) -> bool {
        let changed = self.tx.send_if_modified(|view| {
            if view.game_over || view.phase == to {
                return false;
            }
            view.generation += 1;
            view.phase = Phase::of_generation(view.generation);
            true
        });
        if changed {
            debug!(phase = %to, generation = self.generation(), "Phase changed");
        }
        changed
    }

    /// Mark the game over and publish a final `Playing` transition in the same
    /// update, so every waiter wakes with the flag already visible.
    pub fn finish(&self) {
        self.tx.send_modify(|view| {
            view.game_over = true;
            if view.phase == Phase::Stopped {
                view.generation += 1;
                view.phase = Phase::Playing;
            }
        });
        debug!(generation = self.generation(), "Phase signal finished");
    }

    /// Suspend until `phase` has been entered after generation `since`, or
    /// the game is over.
    ///
    /// The predicate is rechecked on every wakeup, so notifications that
    /// leave the phase unchanged never release a waiter.
    pub async fn wait_until(&self, phase: Phase, since: u64) -> PhaseView {
        let mut rx = self.tx.subscribe();
        let view = match rx
            .wait_for(|view| view.game_over || view.has_entered_since(phase, since))
            .await
        {
            Ok(view) => *view,
            // The sender lives as long as `self`; treat a closed channel as game over.
            Err(_) => PhaseView {
                game_over: true,
                ..self.current()
            },
        };
        view
    }

    /// Snapshot of the current phase, generation, and game-over flag.
    pub fn current(&self) -> PhaseView {
        *self.tx.borrow()
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Whether the game has been declared over.
    pub fn is_game_over(&self) -> bool {
        self.tx.borrow().game_over
    }

    /// Wake every waiter without changing anything.
    #[cfg(test)]
    pub(crate) fn notify_unchanged(&self) {
        self.tx.send_modify(|_| {});
    }
}

impl Default for PhaseSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let signal = PhaseSignal::new();
        let view = signal.current();
        assert_eq!(view.phase, Phase::Playing);
        assert_eq!(view.generation, 0);
        assert!(!view.game_over);
    }

    #[test]
    fn test_transitions_alternate() {
        let signal = PhaseSignal::new();
        assert!(!signal.set_playing(), "already playing");
        assert!(signal.set_stopped());
        assert!(!signal.set_stopped(), "already stopped");
        assert_eq!(signal.generation(), 1);
        assert!(signal.set_playing());
        assert_eq!(signal.current().phase, Phase::Playing);
        assert_eq!(signal.generation(), 2);
    }

    #[test]
    fn test_has_entered_since() {
        let view = PhaseView {
            phase: Phase::Stopped,
            generation: 3,
            game_over: false,
        };
        assert!(view.has_entered_since(Phase::Stopped, 0));
        assert!(view.has_entered_since(Phase::Playing, 1));
        assert!(view.has_entered_since(Phase::Stopped, 2));
        assert!(!view.has_entered_since(Phase::Stopped, 3));
        // Playing after 3 would be generation 4
        assert!(!view.has_entered_since(Phase::Playing, 3));
    }

    #[test]
    fn test_finish_from_stopped_publishes_playing() {
        let signal = PhaseSignal::new();
        signal.set_stopped();
        signal.finish();

        let view = signal.current();
        assert!(view.game_over);
        assert_eq!(view.phase, Phase::Playing);
        assert_eq!(view.generation, 2);
        assert!(!signal.set_stopped(), "no transitions after game over");
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_entered() {
        let signal = PhaseSignal::new();
        signal.set_stopped();
        let view = signal.wait_until(Phase::Stopped, 0).await;
        assert_eq!(view.phase, Phase::Stopped);
        assert_eq!(view.generation, 1);
    }

    #[tokio::test]
    async fn test_spurious_wakeups_do_not_release_waiter() {
        let signal = PhaseSignal::new().shared();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait_until(Phase::Stopped, 0).await })
        };

        for _ in 0..5 {
            tokio::task::yield_now().await;
            signal.notify_unchanged();
            assert!(!signal.set_playing());
        }
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        signal.set_stopped();
        let view = waiter.await.unwrap();
        assert_eq!(view.phase, Phase::Stopped);
    }

    #[tokio::test]
    async fn test_double_flip_still_releases_restart_waiter() {
        let signal = PhaseSignal::new().shared();
        signal.set_stopped();
        let raced_at = signal.generation();

        // Playing and Stopped again before the waiter looks.
        signal.set_playing();
        signal.set_stopped();

        let view = signal.wait_until(Phase::Playing, raced_at).await;
        assert_eq!(view.phase, Phase::Stopped);
        assert_eq!(view.generation, raced_at + 2);

        // And the next stop is visible to a stop waiter from the same point.
        let view = signal.wait_until(Phase::Stopped, raced_at).await;
        assert_eq!(view.generation, 3);
    }

    #[tokio::test]
    async fn test_finish_releases_all_waiters() {
        let signal = PhaseSignal::new().shared();
        let mut waiters = Vec::new();
        for _ in 0..4 {
            let signal = signal.clone();
            waiters.push(tokio::spawn(async move {
                signal.wait_until(Phase::Stopped, 0).await
            }));
        }
        tokio::task::yield_now().await;

        signal.finish();
        for waiter in waiters {
            assert!(waiter.await.unwrap().game_over);
        }
    }

    #[tokio::test]
    async fn test_blocked_waits_return_owned_views() {
        let signal = PhaseSignal::new().shared();
        let follower = {
            let signal = signal.clone();
            tokio::spawn(async move {
                let mut seen = Vec::new();
                let mut since = 0;
                for phase in [Phase::Stopped, Phase::Playing, Phase::Stopped] {
                    let view = signal.wait_until(phase, since).await;
                    since = view.generation;
                    seen.push(view);
                }
                seen
            })
        };

        for _ in 0..3 {
            tokio::task::yield_now().await;
            if signal.current().phase == Phase::Playing {
                signal.set_stopped();
            } else {
                signal.set_playing();
            }
        }

        let seen = follower.await.unwrap();
        let generations: Vec<u64> = seen.iter().map(|view| view.generation).collect();
        assert_eq!(generations, vec![1, 2, 3]);
        assert!(seen.iter().all(|view| !view.game_over));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Playing.to_string(), "playing");
        assert_eq!(Phase::Stopped.to_string(), "stopped");
    }
}
