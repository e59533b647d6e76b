//! Level lifecycle state
//!
//! Everything the controller mutates between ticks lives here, so a restart
//! can reset it wholesale.

use serde::{Deserialize, Serialize};

use super::chain::SegmentChain;
use super::traversal::{FailureReason, TraversalRun};
use crate::platform::{StructureId, SubscriptionId};

/// Current phase of the level lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelPhase {
    /// Waiting for the player to start the game
    Idle,
    /// Player may extend/remove segments and request a test
    Building,
    /// Vehicle crossing in progress, building disabled
    Testing,
    /// Crossing passed, waiting out the transition delay
    LevelComplete,
    /// Crossing failed, waiting for a retry
    LevelFailed,
    /// Every level is done
    GameOver,
}

/// Notable things that happened during a tick (for presentation/audio)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    GameStarted,
    Restarted,
    LevelStarted {
        index: usize,
        name: String,
        budget: u32,
    },
    StructureBound {
        id: StructureId,
        segment_cost: u32,
    },
    SegmentAdded {
        ordinal: usize,
        balance: u32,
    },
    SegmentRemoved {
        ordinal: usize,
        refund: u32,
        balance: u32,
    },
    TestStarted,
    TestAborted,
    LevelCompleted {
        index: usize,
    },
    LevelFailed {
        index: usize,
        reason: FailureReason,
    },
    GameOver,
}

/// The structure currently being built on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStructure {
    pub id: StructureId,
    pub chain: SegmentChain,
}

/// Mutable per-attempt state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRunState {
    /// Current level index (0-based)
    pub level_index: usize,
    pub phase: LevelPhase,
    /// A test has been started for this level
    pub test_triggered: bool,
    pub structure: Option<ActiveStructure>,
    /// Crossing in progress, if any
    pub traversal: Option<TraversalRun>,
    /// Seconds spent in `LevelComplete` so far
    pub transition_timer: Option<f32>,
    /// Placement notifications for the current level
    pub subscription: Option<SubscriptionId>,
}

impl Default for LevelRunState {
    fn default() -> Self {
        Self {
            level_index: 0,
            phase: LevelPhase::Idle,
            test_triggered: false,
            structure: None,
            traversal: None,
            transition_timer: None,
            subscription: None,
        }
    }
}
