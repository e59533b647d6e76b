//! Bridge Test - build a bridge on a budget, then send a vehicle across
//!
//! Core modules:
//! - `sim`: Deterministic level simulation (ledger, segment chain, traversal, controller)
//! - `platform`: Host collaborator traits (visuals, anchors, display, placement)
//! - `settings`: Data-driven tuning and campaign definitions
//! - `results`: Per-session record of concluded level tests
//! - `error`: Error taxonomy shared by the modules above

pub mod error;
pub mod platform;
pub mod results;
pub mod settings;
pub mod sim;

pub use error::{ActionError, ConfigError, SessionError, TraversalError};
pub use results::{LevelResult, LevelResults};
pub use settings::{Campaign, LevelDefinition, Settings};

use glam::{Vec2, Vec3};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Distance between consecutive bridge segments along the local Z axis
    pub const SEGMENT_SPACING: f32 = 0.3;
    /// Cost of one segment when a structure doesn't specify its own
    pub const DEFAULT_SEGMENT_COST: u32 = 4;

    /// Vehicle speed (units per second)
    pub const VEHICLE_SPEED: f32 = 1.0;
    /// Planar distance under which the vehicle counts as arrived
    pub const FINISH_EPSILON: f32 = 0.01;
    /// Longest a crossing may take before it is called off (seconds)
    pub const MAX_TRAVERSAL_SECS: f32 = 30.0;

    /// Pause between a completed level and the next one's setup (seconds)
    pub const LEVEL_TRANSITION_DELAY: f32 = 2.0;
}

/// Project a world position onto the ground (XZ) plane
#[inline]
pub fn planar(pos: Vec3) -> Vec2 {
    Vec2::new(pos.x, pos.z)
}

/// Distance between two points ignoring height
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    planar(a).distance(planar(b))
}

/// Move `current` towards `target` by at most `max_delta`, landing exactly on it when close
#[inline]
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let to_target = target - current;
    let dist = to_target.length();
    if dist <= max_delta || dist == 0.0 {
        target
    } else {
        current + to_target / dist * max_delta
    }
}
