//! Vehicle crossing simulation
//!
//! The vehicle drives from the start anchor towards the finish anchor at a
//! constant speed, staying at its spawn height. It arrives when the distance
//! on the ground plane drops below `epsilon`. It fails when it drives past the
//! end of the built segments or runs out of time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{AnchorRole, TraversalError};
use crate::settings::Settings;
use crate::{move_towards, planar_distance};

/// Why a crossing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// Drove past the last segment before reaching the finish
    Fell,
    /// Didn't arrive within the time limit
    TimedOut,
}

/// State of a crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalOutcome {
    Pending,
    Passed,
    Failed(FailureReason),
}

impl TraversalOutcome {
    pub fn is_concluded(&self) -> bool {
        !matches!(self, TraversalOutcome::Pending)
    }
}

/// Launches crossings with a fixed speed, tolerance and time limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraversalSimulator {
    pub speed: f32,
    pub epsilon: f32,
    pub max_duration: Option<f32>,
}

impl TraversalSimulator {
    pub fn new(speed: f32, epsilon: f32) -> Self {
        Self {
            speed,
            epsilon,
            max_duration: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            speed: settings.vehicle_speed,
            epsilon: settings.finish_epsilon,
            max_duration: settings.max_traversal_secs,
        }
    }

    pub fn with_max_duration(mut self, max_duration: Option<f32>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Speed and tolerance are both positive, so every crossing ends
    pub fn is_valid(&self) -> bool {
        self.speed > 0.0 && self.epsilon > 0.0
    }

    /// Start a crossing between two anchors.
    ///
    /// `support_span` is how far the built structure reaches from the start;
    /// `None` means the vehicle can't fall.
    pub fn launch(
        &self,
        start: Option<Vec3>,
        finish: Option<Vec3>,
        support_span: Option<f32>,
    ) -> Result<TraversalRun, TraversalError> {
        if !self.is_valid() {
            return Err(TraversalError::InvalidMotion);
        }
        let start = start.ok_or(TraversalError::MissingAnchor(AnchorRole::Start))?;
        let finish = finish.ok_or(TraversalError::MissingAnchor(AnchorRole::Finish))?;

        Ok(TraversalRun {
            sim: *self,
            start,
            position: start,
            target: Vec3::new(finish.x, start.y, finish.z),
            support_span,
            elapsed: 0.0,
            ticks: 0,
            traveled: 0.0,
            outcome: TraversalOutcome::Pending,
        })
    }
}

/// A crossing in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalRun {
    sim: TraversalSimulator,
    start: Vec3,
    position: Vec3,
    target: Vec3,
    support_span: Option<f32>,
    elapsed: f32,
    ticks: u32,
    /// Ground-plane distance driven so far
    traveled: f32,
    outcome: TraversalOutcome,
}

impl TraversalRun {
    /// Advance one tick, re-reading the finish anchor in case it was moved.
    pub fn step(
        &mut self,
        finish: Option<Vec3>,
        dt: f32,
    ) -> Result<TraversalOutcome, TraversalError> {
        if self.outcome.is_concluded() {
            return Ok(self.outcome);
        }
        let finish = finish.ok_or(TraversalError::MissingAnchor(AnchorRole::Finish))?;
        self.target = Vec3::new(finish.x, self.start.y, finish.z);
        Ok(self.advance(dt))
    }

    /// Advance one tick towards the current target
    pub fn advance(&mut self, dt: f32) -> TraversalOutcome {
        if self.outcome.is_concluded() {
            return self.outcome;
        }

        let before = self.position;
        self.position = move_towards(self.position, self.target, self.sim.speed * dt);
        self.traveled += planar_distance(before, self.position);
        self.elapsed += dt;
        self.ticks += 1;

        let remaining = planar_distance(self.position, self.target);
        let past_edge = self
            .support_span
            .is_some_and(|span| self.traveled > span + self.sim.epsilon);

        self.outcome = if past_edge {
            TraversalOutcome::Failed(FailureReason::Fell)
        } else if remaining < self.sim.epsilon {
            TraversalOutcome::Passed
        } else if self.sim.max_duration.is_some_and(|max| self.elapsed >= max) {
            TraversalOutcome::Failed(FailureReason::TimedOut)
        } else {
            TraversalOutcome::Pending
        };

        if self.outcome.is_concluded() {
            log::info!(
                "Crossing finished after {} ticks ({:.2}s): {:?}",
                self.ticks,
                self.elapsed,
                self.outcome
            );
        }
        self.outcome
    }

    /// Lazily step with a fixed `dt`, yielding the position after each tick
    /// until the crossing concludes.
    pub fn positions(&mut self, dt: f32) -> Positions<'_> {
        Positions { run: self, dt }
    }

    pub fn outcome(&self) -> TraversalOutcome {
        self.outcome
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn traveled(&self) -> f32 {
        self.traveled
    }
}

/// Iterator returned by [`TraversalRun::positions`]
pub struct Positions<'a> {
    run: &'a mut TraversalRun,
    dt: f32,
}

impl Iterator for Positions<'_> {
    type Item = Vec3;

    fn next(&mut self) -> Option<Vec3> {
        if self.run.outcome.is_concluded() || !(self.dt > 0.0) {
            return None;
        }
        self.run.advance(self.dt);
        Some(self.run.position)
    }
}
