//! Game configuration
//!
//! Defaults come from the environment with hard-coded fallbacks:
//!
//! | Variable                   | Default |
//! |----------------------------|---------|
//! | `CHAIRS_PLAYERS`           | 4       |
//! | `CHAIRS_MAX_MUSIC_MS`      | 10000   |
//! | `CHAIRS_POLL_INTERVAL_MS`  | 50      |
//! | `CHAIRS_SETTLE_TIMEOUT_MS` | 30000   |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};

const DEFAULT_PLAYERS: usize = 4;
const DEFAULT_MAX_MUSIC_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 30_000;

/// Parameters for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Number of participants, fixed for the run.
    pub participants: usize,
    /// Upper bound for the per-round music delay.
    pub max_music: Duration,
    /// Sleep between settle probes.
    pub poll_interval: Duration,
    /// How long a settle stage may take before the round is declared stuck.
    pub settle_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            participants: env_or("CHAIRS_PLAYERS", DEFAULT_PLAYERS),
            max_music: Duration::from_millis(env_or("CHAIRS_MAX_MUSIC_MS", DEFAULT_MAX_MUSIC_MS)),
            poll_interval: Duration::from_millis(env_or(
                "CHAIRS_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            settle_timeout: Duration::from_millis(env_or(
                "CHAIRS_SETTLE_TIMEOUT_MS",
                DEFAULT_SETTLE_TIMEOUT_MS,
            )),
        }
    }
}

impl GameConfig {
    /// Default tuning with an explicit participant count.
    pub fn new(participants: usize) -> Self {
        Self {
            participants,
            ..Self::default()
        }
    }

    pub fn with_max_music(mut self, max_music: Duration) -> Self {
        self.max_music = max_music;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_settle_timeout(mut self, settle_timeout: Duration) -> Self {
        self.settle_timeout = settle_timeout;
        self
    }

    /// Reject configurations the game cannot run with.
    pub fn validate(&self) -> GameResult<()> {
        if self.participants < 2 {
            return Err(GameError::invalid_config(format!(
                "at least 2 participants are needed, got {}",
                self.participants
            )));
        }
        if self.participants > u32::MAX as usize {
            return Err(GameError::invalid_config("participant count too large"));
        }
        if self.poll_interval.is_zero() {
            return Err(GameError::invalid_config("poll interval must be positive"));
        }
        if self.settle_timeout < self.poll_interval {
            return Err(GameError::invalid_config(
                "settle timeout must be at least one poll interval",
            ));
        }
        Ok(())
    }

    /// Number of rounds a full game takes.
    pub fn expected_rounds(&self) -> usize {
        self.participants.saturating_sub(1)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}
