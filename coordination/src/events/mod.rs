//! Game progress events
//!
//! The coordinator publishes a [`GameEvent`] at each visible step of a round.
//! Presentation layers subscribe to the [`EventBus`] and render however they
//! like; the session also keeps every [`RoundReport`] in its outcome.
//!
//! ```text
//! Coordinator ──publish──▶ EventBus (broadcast) ──recv──▶ console / tests
//! ```

pub mod bus;
pub mod types;

// Re-export core types
pub use bus::{EventBus, SharedEventBus};
pub use types::{GameEvent, GameId, RoundReport};
