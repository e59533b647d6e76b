//! Ordered chain of bridge segments
//!
//! Segments are only ever added or removed at the tail, so the chain is a
//! plain `Vec` used as a stack. The chain itself knows nothing about budgets;
//! the controller checks affordability before calling [`SegmentChain::extend`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::platform::VisualHandle;

/// Reference to a segment returned by [`SegmentChain::extend`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentHandle {
    /// Position in the chain (0 = first segment laid)
    pub ordinal: usize,
    /// Local placement offset relative to the structure's extension point
    pub offset: Vec3,
}

/// One built unit of the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    offset: Vec3,
    cost: u32,
    /// Externally owned visual, if one was spawned
    visual: Option<VisualHandle>,
}

impl Segment {
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn visual(&self) -> Option<VisualHandle> {
        self.visual
    }
}

/// Segments of one structure, in construction order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentChain {
    segments: Vec<Segment>,
    segment_cost: u32,
    spacing: f32,
}

impl SegmentChain {
    pub fn new(segment_cost: u32, spacing: f32) -> Self {
        Self {
            segments: Vec::new(),
            segment_cost,
            spacing,
        }
    }

    /// Offset the next segment will be placed at
    pub fn next_offset(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.segments.len() as f32 * self.spacing)
    }

    /// Append a segment costing `cost` and return a handle to the new tail
    pub fn extend(&mut self, cost: u32) -> SegmentHandle {
        let handle = SegmentHandle {
            ordinal: self.segments.len(),
            offset: self.next_offset(),
        };
        self.segments.push(Segment {
            offset: handle.offset,
            cost,
            visual: None,
        });
        handle
    }

    /// Attach the visual spawned for a segment. Returns false if the handle is stale.
    pub fn bind_visual(&mut self, handle: SegmentHandle, visual: VisualHandle) -> bool {
        match self.segments.get_mut(handle.ordinal) {
            Some(segment) if segment.offset == handle.offset => {
                segment.visual = Some(visual);
                true
            }
            _ => false,
        }
    }

    /// Detach the tail segment. Empty chain is a no-op.
    pub fn remove_last(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    /// Remove every segment, tail first
    pub fn drain(&mut self) -> Vec<Segment> {
        let mut removed = std::mem::take(&mut self.segments);
        removed.reverse();
        removed
    }

    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Cost charged for the next `extend`
    pub fn segment_cost(&self) -> u32 {
        self.segment_cost
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Length of ground covered by the built segments
    pub fn span(&self) -> f32 {
        self.segments.len() as f32 * self.spacing
    }

    /// Sum of what the built segments cost
    pub fn total_cost(&self) -> u32 {
        self.segments.iter().map(|s| s.cost).sum()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn tail(&self) -> Option<&Segment> {
        self.segments.last()
    }
}
