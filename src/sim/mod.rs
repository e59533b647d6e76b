//! Deterministic level simulation
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Single-threaded, one controller per session
//! - No rendering or platform dependencies (hosts plug in via `platform`)

pub mod chain;
pub mod controller;
pub mod ledger;
pub mod session;
pub mod state;
pub mod tick;
pub mod traversal;

pub use chain::{Segment, SegmentChain, SegmentHandle};
pub use controller::LevelController;
pub use ledger::BudgetLedger;
pub use session::{SessionLease, SessionSlot};
pub use state::{ActiveStructure, GameEvent, LevelPhase, LevelRunState};
pub use tick::{TickInput, tick};
pub use traversal::{FailureReason, Positions, TraversalOutcome, TraversalRun, TraversalSimulator};
