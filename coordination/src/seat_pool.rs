//! Seat pool — bounded admission control for a round
//!
//! A counting resource sized to the round's seat count. Participants pass
//! through [`SeatPool::acquire`] before touching the game state, so at most
//! `capacity` of them get to claim a seat per round; the one left over stays
//! queued until the coordinator hands out the extra permit.
//!
//! Permits taken by participants are never returned by them. The coordinator
//! refills the pool explicitly at the start of each round with
//! [`SeatPool::reset_for_round`].
//!
//! ```text
//!            acquire() (FIFO)             release(n) ≤ capacity
//! participants ──────────▶ [ free: 0..=capacity ] ◀────────── coordinator
//!                                  ▲
//!                                  └── probe(): try_acquire + release
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Semaphore, TryAcquireError};
use tracing::{debug, trace};

use crate::error::{GameError, GameResult};

/// Shared reference to a SeatPool
pub type SharedSeatPool = Arc<SeatPool>;

/// Bounded counting resource of free seats.
#[derive(Debug)]
pub struct SeatPool {
    permits: Semaphore,
    /// Configured capacity for the current round. Also serializes every
    /// operation that adds permits, so capacity checks never race each other.
    capacity: Mutex<usize>,
}

impl SeatPool {
    /// Create a pool with `seats` free permits and capacity `seats`.
    pub fn new(seats: usize) -> Self {
        Self {
            permits: Semaphore::new(seats),
            capacity: Mutex::new(seats),
        }
    }

    /// Create a shared reference to this pool
    pub fn shared(self) -> SharedSeatPool {
        Arc::new(self)
    }

    /// Wait for a free seat and take it.
    ///
    /// Waiters are served in arrival order. Fails only once the pool has been
    /// closed at game over.
    pub async fn acquire(&self) -> GameResult<()> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GameError::PoolClosed)?;
        permit.forget();
        trace!(
            free = self.permits.available_permits(),
            "Seat permit acquired"
        );
        Ok(())
    }

    /// Take a free seat without waiting.
    pub fn try_acquire(&self) -> bool {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => false,
        }
    }

    /// Return `n` permits to the pool, waking up to `n` queued acquirers.
    ///
    /// Releasing past the round's capacity is a protocol error.
    pub fn release(&self, n: usize) -> GameResult<()> {
        let capacity = lock_or_recover(&self.capacity);
        let available = self.permits.available_permits();
        if available + n > *capacity {
            return Err(GameError::OverRelease {
                requested: n,
                available,
                capacity: *capacity,
            });
        }
        self.permits.add_permits(n);
        trace!(released = n, free = available + n, "Seat permits released");
        Ok(())
    }

    /// Non-blocking check for a free permit, restoring it if one was taken.
    ///
    /// Returns `true` when a permit was free at the time of the probe.
    pub fn probe(&self) -> GameResult<bool> {
        if !self.try_acquire() {
            return Ok(false);
        }
        self.release(1)?;
        Ok(true)
    }

    /// Resize the pool for a new round so exactly `seats` permits are free.
    ///
    /// Must only be called when nobody is queued in [`SeatPool::acquire`]
    /// for the previous round.
    pub fn reset_for_round(&self, seats: usize) -> GameResult<()> {
        let mut capacity = lock_or_recover(&self.capacity);
        if self.permits.is_closed() {
            return Err(GameError::PoolClosed);
        }

        let mut available = self.permits.available_permits();
        while available > seats {
            match self.permits.try_acquire() {
                Ok(permit) => permit.forget(),
                Err(TryAcquireError::NoPermits) => {}
                Err(TryAcquireError::Closed) => return Err(GameError::PoolClosed),
            }
            available = self.permits.available_permits();
        }
        if available < seats {
            self.permits.add_permits(seats - available);
        }

        debug!(from = *capacity, to = seats, "Seat pool reset for round");
        *capacity = seats;
        Ok(())
    }

    /// Number of currently free permits.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Configured capacity for the current round.
    pub fn capacity(&self) -> usize {
        *lock_or_recover(&self.capacity)
    }

    /// Close the pool; every queued and future `acquire` fails with
    /// [`GameError::PoolClosed`].
    pub fn close(&self) {
        self.permits.close();
        debug!("Seat pool closed");
    }

    /// Whether the pool has been closed.
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
