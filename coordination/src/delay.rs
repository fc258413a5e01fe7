//! Music delay sources
//!
//! The coordinator asks for one bounded delay per round to decide how long
//! the music plays. Any source works as long as it stays within `[0, max]`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::seat_pool::lock_or_recover;

/// Shared reference to a delay source
pub type SharedDelaySource = Arc<dyn DelaySource>;

/// Produces the music-playing time for a round.
pub trait DelaySource: Send + Sync {
    /// A delay in `[0, max]`.
    fn next_delay(&self, max: Duration) -> Duration;
}

/// Uniformly random delays.
#[derive(Debug)]
pub struct RandomDelay {
    rng: Mutex<StdRng>,
}

impl RandomDelay {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl DelaySource for RandomDelay {
    fn next_delay(&self, max: Duration) -> Duration {
        let max_ms = max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = lock_or_recover(&self.rng).gen_range(0..=max_ms);
        Duration::from_millis(ms)
    }
}

/// Always the same delay, clamped to `max`. Used for deterministic runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl DelaySource for FixedDelay {
    fn next_delay(&self, max: Duration) -> Duration {
        self.0.min(max)
    }
}
