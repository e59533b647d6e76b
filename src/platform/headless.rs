//! In-memory host
//!
//! Keeps just enough bookkeeping to drive the core without a renderer:
//! placed structures with their anchors, live segment visuals, subscriber
//! queues and the last values pushed to the display.

use std::collections::{BTreeMap, VecDeque};

use glam::Vec3;

use super::{
    AnchorPair, AnchorProvider, DisplaySink, PlacementSystem, SegmentVisuals, SpawnedStructure,
    StructureId, SubscriptionId, VisualHandle,
};
use crate::sim::LevelPhase;

#[derive(Debug, Clone)]
struct PlacedStructure {
    anchors: Option<AnchorPair>,
}

#[derive(Debug, Clone)]
struct Observer {
    id: SubscriptionId,
    pending: VecDeque<SpawnedStructure>,
}

/// Live segment visual
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentVisual {
    pub structure: StructureId,
    pub offset: Vec3,
}

/// Host implementation with no rendering or input behind it
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    structures: BTreeMap<StructureId, PlacedStructure>,
    visuals: BTreeMap<u64, SegmentVisual>,
    observers: Vec<Observer>,
    next_structure: u32,
    next_visual: u64,
    next_subscription: u32,
    /// Last balance shown
    pub budget: Option<u32>,
    /// Last level shown (name, index)
    pub level: Option<(String, usize)>,
    /// Last phase shown
    pub phase: Option<LevelPhase>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a structure and notify every subscriber
    pub fn place_structure(
        &mut self,
        anchors: Option<AnchorPair>,
        segment_cost: Option<u32>,
    ) -> StructureId {
        self.next_structure += 1;
        let id = StructureId(self.next_structure);
        self.structures.insert(id, PlacedStructure { anchors });

        let spawned = SpawnedStructure { id, segment_cost };
        for observer in &mut self.observers {
            observer.pending.push_back(spawned);
        }
        log::info!(
            "Placed structure {:?} ({} subscribers notified)",
            id,
            self.observers.len()
        );
        id
    }

    /// Re-anchor a placed structure (None drops its anchors)
    pub fn set_anchors(&mut self, id: StructureId, anchors: Option<AnchorPair>) -> bool {
        match self.structures.get_mut(&id) {
            Some(structure) => {
                structure.anchors = anchors;
                true
            }
            None => false,
        }
    }

    pub fn placed_count(&self) -> usize {
        self.structures.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    /// Visuals currently alive for a structure, in spawn order
    pub fn visuals_for(&self, structure: StructureId) -> Vec<SegmentVisual> {
        self.visuals
            .values()
            .filter(|v| v.structure == structure)
            .copied()
            .collect()
    }

    pub fn live_visual_count(&self) -> usize {
        self.visuals.len()
    }
}

impl SegmentVisuals for HeadlessHost {
    fn spawn_segment(&mut self, structure: StructureId, offset: Vec3) -> VisualHandle {
        self.next_visual += 1;
        self.visuals
            .insert(self.next_visual, SegmentVisual { structure, offset });
        VisualHandle(self.next_visual)
    }

    fn despawn_segment(&mut self, handle: VisualHandle) {
        if self.visuals.remove(&handle.0).is_none() {
            log::warn!("Despawn of unknown segment visual {:?}", handle);
        }
    }
}

impl AnchorProvider for HeadlessHost {
    fn anchors(&self, structure: StructureId) -> Option<AnchorPair> {
        self.structures.get(&structure).and_then(|s| s.anchors)
    }
}

impl DisplaySink for HeadlessHost {
    fn budget_changed(&mut self, balance: u32) {
        self.budget = Some(balance);
    }

    fn level_changed(&mut self, name: &str, index: usize) {
        self.level = Some((name.to_string(), index));
    }

    fn phase_changed(&mut self, phase: LevelPhase) {
        self.phase = Some(phase);
    }
}

impl PlacementSystem for HeadlessHost {
    fn clear_all(&mut self) {
        self.structures.clear();
        self.visuals.clear();
    }

    fn remove_structure(&mut self, id: StructureId) {
        if self.structures.remove(&id).is_none() {
            log::warn!("Removal of unknown structure {:?}", id);
        }
        self.visuals.retain(|_, v| v.structure != id);
    }

    fn subscribe(&mut self) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.observers.push(Observer {
            id,
            pending: VecDeque::new(),
        });
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.observers.retain(|o| o.id != id);
    }

    fn poll_spawned(&mut self, id: SubscriptionId) -> Option<SpawnedStructure> {
        self.observers
            .iter_mut()
            .find(|o| o.id == id)
            .and_then(|o| o.pending.pop_front())
    }
}
