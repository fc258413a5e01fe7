//! Musical Chairs Coordination Library
//!
//! N participant tasks race for a shrinking set of seats while one
//! coordinator task runs the rounds and picks a winner. The library provides:
//! - A bounded seat pool gating how many participants may claim per round
//! - A two-phase music signal (playing / stopped) with game-over broadcast
//! - Shared game state: seats, survivors, elimination log
//! - The participant loop and the coordinator's round state machine
//! - A session type that spawns everything and returns the outcome
//!
//! # Usage
//!
//! ```ignore
//! use coordination::{GameConfig, GameSession};
//!
//! let session = GameSession::new(GameConfig::new(4))?;
//! let mut events = session.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("{}", event.event_type());
//!     }
//! });
//!
//! let outcome = session.run().await?;
//! println!("Winner: {}", outcome.winner);
//! ```
//!
//! # Lock order
//!
//! Seat pool, phase signal, and game state each synchronize internally. No
//! task holds two of them at once; when a step touches both the pool and the
//! state, the pool goes first.

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod coordinator;
pub mod delay;
pub mod error;
pub mod events;
pub mod participant;
pub mod phase;
pub mod seat_pool;
pub mod session;
pub mod state;

pub use config::GameConfig;
pub use error::{GameError, GameResult};
pub use session::{GameOutcome, GameSession};

// Re-export primitives
pub use phase::{Phase, PhaseSignal, PhaseView, SharedPhaseSignal};
pub use seat_pool::{SeatPool, SharedSeatPool};

// Re-export state types
pub use state::{GameState, ParticipantId, Seat, SeatSnapshot, SharedGameState, StateSnapshot};

// Re-export task types
pub use coordinator::{Coordinator, CoordinatorOutcome, RoundState, TransitionRecord};
pub use participant::{Participant, ParticipantExit, ParticipantState};

// Re-export event and delay types
pub use delay::{DelaySource, FixedDelay, RandomDelay, SharedDelaySource};
pub use events::{EventBus, GameEvent, GameId, RoundReport, SharedEventBus};
