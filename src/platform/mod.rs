//! Host collaborator interfaces
//!
//! The core never renders, places or displays anything itself. It talks to
//! the host through these traits:
//! - Segment visuals (spawn/despawn by handle)
//! - Anchor lookup for the active structure
//! - Budget/level display notifications
//! - Structure placement (clear-all and spawn notifications)

pub mod headless;

pub use headless::HeadlessHost;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::LevelPhase;

/// Identifies a placed structure (a bridge root the player can extend)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(pub u32);

/// Host-owned visual for one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHandle(pub u64);

/// Observer registration with the placement system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u32);

/// Entry and exit points of a structure in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPair {
    pub start: Vec3,
    pub finish: Vec3,
}

impl AnchorPair {
    pub fn new(start: Vec3, finish: Vec3) -> Self {
        Self { start, finish }
    }

    /// Ground-plane distance the bridge has to cover
    pub fn gap(&self) -> f32 {
        crate::planar_distance(self.start, self.finish)
    }
}

/// A freshly placed structure announced by the placement system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnedStructure {
    pub id: StructureId,
    /// Per-segment cost for this bridge type (None = settings default)
    pub segment_cost: Option<u32>,
}

/// Creates and destroys segment visuals
pub trait SegmentVisuals {
    fn spawn_segment(&mut self, structure: StructureId, offset: Vec3) -> VisualHandle;
    fn despawn_segment(&mut self, handle: VisualHandle);
}

/// Read-only view of where structures are anchored
pub trait AnchorProvider {
    fn anchors(&self, structure: StructureId) -> Option<AnchorPair>;
}

/// Observes budget and level changes for UI purposes
pub trait DisplaySink {
    fn budget_changed(&mut self, balance: u32);
    fn level_changed(&mut self, name: &str, index: usize);
    fn phase_changed(&mut self, _phase: LevelPhase) {}
}

/// Places structures and tells subscribers about new ones
pub trait PlacementSystem {
    /// Remove every placed structure
    fn clear_all(&mut self);
    /// Remove one placed structure (it was replaced by a newer one)
    fn remove_structure(&mut self, id: StructureId);
    fn subscribe(&mut self) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
    /// Next structure spawned since the subscriber last polled
    fn poll_spawned(&mut self, id: SubscriptionId) -> Option<SpawnedStructure>;
}

/// Everything the level controller needs from its host
pub trait Host: SegmentVisuals + AnchorProvider + DisplaySink + PlacementSystem {}

impl<T: SegmentVisuals + AnchorProvider + DisplaySink + PlacementSystem> Host for T {}
