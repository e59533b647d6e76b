//! Error taxonomy
//!
//! Rejected actions and configuration faults are both plain values: the
//! controller logs them and hands them back to the caller, nothing panics.

use thiserror::Error;

use crate::sim::LevelPhase;

/// A player action the controller refused to carry out
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("the game hasn't started yet")]
    NotStarted,
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("cannot {action} while {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: LevelPhase,
    },
    #[error("segment costs {cost} but only {balance} is left")]
    InsufficientBudget { cost: u32, balance: u32 },
    #[error("no segments to remove")]
    EmptyChain,
    #[error("a test has already been run for this level")]
    TestAlreadyTriggered,
    #[error("no structure has been placed for this level")]
    NoActiveStructure,
    #[error("missing start/finish anchors for the active structure")]
    MissingAnchors,
    #[error("vehicle speed and finish tolerance must be positive")]
    InvalidTuning,
}

impl ActionError {
    /// Setup faults (missing anchors/structure) as opposed to ordinary player rejections
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            ActionError::NoActiveStructure | ActionError::MissingAnchors | ActionError::InvalidTuning
        )
    }

    /// Log at the level that matches the error class
    pub(crate) fn report(&self) {
        if self.is_configuration_fault() {
            log::error!("{self}");
        } else {
            log::warn!("{self}");
        }
    }
}

impl From<TraversalError> for ActionError {
    fn from(err: TraversalError) -> Self {
        match err {
            TraversalError::MissingAnchor(_) => ActionError::MissingAnchors,
            TraversalError::InvalidMotion => ActionError::InvalidTuning,
        }
    }
}

/// Failure to open a controller session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a level controller is already running for this session")]
    AlreadyActive,
    #[error("campaign has no levels")]
    EmptyCampaign,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Traversal could not resolve where to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TraversalError {
    #[error("missing {0} anchor")]
    MissingAnchor(AnchorRole),
    #[error("vehicle speed and finish tolerance must be positive")]
    InvalidMotion,
}

/// Which end of the structure an anchor marks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRole {
    Start,
    Finish,
}

impl std::fmt::Display for AnchorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorRole::Start => f.write_str("start"),
            AnchorRole::Finish => f.write_str("finish"),
        }
    }
}

/// Settings/campaign loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
