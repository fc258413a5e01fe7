//! Shared game state
//!
//! The round's mutable data: seat occupancy, survivors, and the elimination
//! log. Both the coordinator and the participants read and write it, always
//! through [`GameState`]'s synchronized accessors.
//!
//! # Usage
//!
//! ```ignore
//! use coordination::state::{GameState, ParticipantId};
//!
//! let state = GameState::new(4)?.shared();
//! assert_eq!(state.seat_count(), 3);
//!
//! if !state.claim_seat(ParticipantId::new(2))? {
//!     state.record_elimination(ParticipantId::new(2))?;
//! }
//! ```

pub mod game;
pub mod types;

// Re-export core types
pub use game::{GameState, SharedGameState};
pub use types::{ParticipantId, Seat, SeatSnapshot, StateSnapshot};
