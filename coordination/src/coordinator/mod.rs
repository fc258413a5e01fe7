//! Round coordination
//!
//! ```text
//! RoundStart ─▶ MusicPlaying ─▶ MusicStopped ─▶ AwaitSettle ─▶ Eliminate
//!     ▲                                                           │
//!     │                                                           ▼
//! CheckEnd ◀─────────── Display ◀──────────── AwaitEliminationAck
//!     │
//!     └─▶ Finished (one participant left)
//! ```
//!
//! Two settle stages per round: the first waits until every seat is
//! claimed, the second releases one extra permit to the participant still
//! queued at the pool and waits until it has recorded its own elimination.
//! Reading the state between the two would race the loser's report.

pub mod engine;
pub mod machine;

pub use engine::{Coordinator, CoordinatorOutcome};
pub use machine::{IllegalTransition, RoundState, RoundStateMachine, TransitionRecord};
