//! Level lifecycle controller
//!
//! Owns the budget ledger, the active segment chain and any crossing in
//! progress. Player actions go through the `request_*` methods; time moves
//! forward through [`LevelController::update`].
//!
//! Phases: Idle -> Building -> Testing -> LevelComplete | LevelFailed,
//! LevelComplete -> Building (next level) | GameOver, LevelFailed -> Building
//! (same level) on retry, anything -> Building (first level) on restart.

use super::chain::{SegmentChain, SegmentHandle};
use super::ledger::BudgetLedger;
use super::session::{SessionLease, SessionSlot};
use super::state::{ActiveStructure, GameEvent, LevelPhase, LevelRunState};
use super::traversal::{FailureReason, TraversalOutcome, TraversalRun, TraversalSimulator};
use crate::error::{ActionError, SessionError};
use crate::platform::{Host, SpawnedStructure, StructureId};
use crate::results::{LevelResult, LevelResults};
use crate::settings::{Campaign, LevelDefinition, Settings};

/// Log a rejected action on its way back to the caller
fn reported<T>(result: Result<T, ActionError>) -> Result<T, ActionError> {
    if let Err(err) = &result {
        err.report();
    }
    result
}

pub struct LevelController<H: Host> {
    host: H,
    campaign: Campaign,
    settings: Settings,
    simulator: TraversalSimulator,
    ledger: BudgetLedger,
    run: LevelRunState,
    results: LevelResults,
    events: Vec<GameEvent>,
    _lease: SessionLease,
}

impl<H: Host> LevelController<H> {
    /// Create the session's controller. Fails if the slot already has one.
    pub fn new(
        slot: &SessionSlot,
        campaign: Campaign,
        settings: Settings,
        host: H,
    ) -> Result<Self, SessionError> {
        if campaign.is_empty() {
            return Err(SessionError::EmptyCampaign);
        }
        settings
            .validate()
            .map_err(|err| SessionError::InvalidSettings(err.to_string()))?;
        let lease = slot.acquire().inspect_err(|err| log::error!("{err}"))?;

        Ok(Self {
            host,
            simulator: TraversalSimulator::from_settings(&settings),
            campaign,
            settings,
            ledger: BudgetLedger::default(),
            run: LevelRunState::default(),
            results: LevelResults::new(),
            events: Vec::new(),
            _lease: lease,
        })
    }

    // === Queries ===

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn phase(&self) -> LevelPhase {
        self.run.phase
    }

    pub fn level_index(&self) -> usize {
        self.run.level_index
    }

    pub fn current_level(&self) -> Option<&LevelDefinition> {
        match self.run.phase {
            LevelPhase::Idle | LevelPhase::GameOver => None,
            _ => self.campaign.get(self.run.level_index),
        }
    }

    pub fn balance(&self) -> u32 {
        self.ledger.balance()
    }

    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    pub fn chain(&self) -> Option<&SegmentChain> {
        self.run.structure.as_ref().map(|s| &s.chain)
    }

    pub fn active_structure(&self) -> Option<StructureId> {
        self.run.structure.as_ref().map(|s| s.id)
    }

    pub fn traversal(&self) -> Option<&TraversalRun> {
        self.run.traversal.as_ref()
    }

    pub fn run_state(&self) -> &LevelRunState {
        &self.run
    }

    pub fn results(&self) -> &LevelResults {
        &self.results
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn test_triggered(&self) -> bool {
        self.run.test_triggered
    }

    /// Seconds left before the next level is set up
    pub fn transition_remaining(&self) -> Option<f32> {
        self.run
            .transition_timer
            .map(|t| (self.settings.level_transition_delay - t).max(0.0))
    }

    pub fn has_segments(&self) -> bool {
        self.chain().is_some_and(|c| c.has_segments())
    }

    /// Whether an extend request would be accepted right now
    pub fn can_extend(&self) -> bool {
        self.run.phase == LevelPhase::Building
            && self
                .chain()
                .is_some_and(|c| self.ledger.can_afford(c.segment_cost()))
    }

    /// Whether a test request would be accepted right now
    pub fn can_test(&self) -> bool {
        self.run.phase == LevelPhase::Building
            && !self.run.test_triggered
            && self
                .active_structure()
                .is_some_and(|id| self.host.anchors(id).is_some())
    }

    /// Take the events raised since the last call.
    ///
    /// [`crate::sim::tick`] does this every tick; hosts calling `update`
    /// directly must drain the events themselves.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Lifecycle ===

    /// Begin the first level. Only works once.
    pub fn start(&mut self) -> Result<(), ActionError> {
        if self.run.phase != LevelPhase::Idle {
            return reported(Err(ActionError::AlreadyStarted));
        }
        log::info!("Game started!");
        self.events.push(GameEvent::GameStarted);
        self.enter_level(0);
        Ok(())
    }

    /// Move on from a completed level without waiting for the delay
    pub fn advance(&mut self) -> Result<(), ActionError> {
        reported(self.require_phase(LevelPhase::LevelComplete, "advance"))?;
        self.advance_level();
        Ok(())
    }

    /// Rebuild the current level from scratch after a failed crossing
    pub fn retry(&mut self) -> Result<(), ActionError> {
        reported(self.require_phase(LevelPhase::LevelFailed, "retry"))?;
        log::info!("Retrying level {}", self.run.level_index);
        self.enter_level(self.run.level_index);
        Ok(())
    }

    /// Back to the first level, dropping any crossing or pending transition
    pub fn restart(&mut self) -> Result<(), ActionError> {
        if self.run.phase == LevelPhase::Idle {
            return reported(Err(ActionError::NotStarted));
        }
        log::info!("Restarting from {:?}", self.run.phase);
        self.run.traversal = None;
        self.run.transition_timer = None;
        self.results.clear();
        self.events.push(GameEvent::Restarted);
        self.enter_level(0);
        Ok(())
    }

    // === Building ===

    /// Bind a placed structure as the one being built on.
    ///
    /// A previously bound structure's segments are refunded and the structure
    /// is removed from the placement system.
    pub fn bind_structure(&mut self, spawned: SpawnedStructure) -> Result<(), ActionError> {
        reported(self.require_phase(LevelPhase::Building, "bind a structure"))?;

        if let Some(old) = self.run.structure.take() {
            let old_id = old.id;
            let refund = self.dismantle(old);
            if old_id != spawned.id {
                self.host.remove_structure(old_id);
            }
            if refund > 0 {
                self.ledger.refund(refund);
                self.host.budget_changed(self.ledger.balance());
            }
        }

        let segment_cost = spawned
            .segment_cost
            .unwrap_or(self.settings.default_segment_cost);
        self.run.structure = Some(ActiveStructure {
            id: spawned.id,
            chain: SegmentChain::new(segment_cost, self.settings.segment_spacing),
        });
        log::info!(
            "Building on structure {:?} ({} per segment)",
            spawned.id,
            segment_cost
        );
        self.events.push(GameEvent::StructureBound {
            id: spawned.id,
            segment_cost,
        });
        Ok(())
    }

    /// Buy and lay one more segment
    pub fn request_extend(&mut self) -> Result<SegmentHandle, ActionError> {
        reported(self.extend())
    }

    /// Pull up the last segment and get its cost back. Returns the refund.
    pub fn request_remove_last(&mut self) -> Result<u32, ActionError> {
        reported(self.remove_last())
    }

    /// Send the vehicle across. At most once per level.
    pub fn request_test(&mut self) -> Result<(), ActionError> {
        reported(self.start_test())
    }

    fn extend(&mut self) -> Result<SegmentHandle, ActionError> {
        self.require_phase(LevelPhase::Building, "extend")?;
        let structure = self
            .run
            .structure
            .as_mut()
            .ok_or(ActionError::NoActiveStructure)?;

        let cost = structure.chain.segment_cost();
        if !self.ledger.try_spend(cost) {
            return Err(ActionError::InsufficientBudget {
                cost,
                balance: self.ledger.balance(),
            });
        }

        let handle = structure.chain.extend(cost);
        let visual = self.host.spawn_segment(structure.id, handle.offset);
        structure.chain.bind_visual(handle, visual);

        let balance = self.ledger.balance();
        self.host.budget_changed(balance);
        self.events.push(GameEvent::SegmentAdded {
            ordinal: handle.ordinal,
            balance,
        });
        Ok(handle)
    }

    fn remove_last(&mut self) -> Result<u32, ActionError> {
        self.require_phase(LevelPhase::Building, "remove a segment")?;
        let structure = self
            .run
            .structure
            .as_mut()
            .ok_or(ActionError::NoActiveStructure)?;

        let segment = structure
            .chain
            .remove_last()
            .ok_or(ActionError::EmptyChain)?;
        if let Some(visual) = segment.visual() {
            self.host.despawn_segment(visual);
        }

        let refund = segment.cost();
        self.ledger.refund(refund);
        let balance = self.ledger.balance();
        self.host.budget_changed(balance);
        self.events.push(GameEvent::SegmentRemoved {
            ordinal: structure.chain.len(),
            refund,
            balance,
        });
        Ok(refund)
    }

    fn start_test(&mut self) -> Result<(), ActionError> {
        if self.run.phase == LevelPhase::Idle {
            return Err(ActionError::NotStarted);
        }
        if self.run.test_triggered {
            return Err(ActionError::TestAlreadyTriggered);
        }
        self.require_phase(LevelPhase::Building, "test")?;

        let structure = self
            .run
            .structure
            .as_ref()
            .ok_or(ActionError::NoActiveStructure)?;
        let anchors = self
            .host
            .anchors(structure.id)
            .ok_or(ActionError::MissingAnchors)?;

        let span = self
            .settings
            .require_support
            .then(|| structure.chain.span());
        let traversal = self
            .simulator
            .launch(Some(anchors.start), Some(anchors.finish), span)?;

        if !structure.chain.has_segments() {
            log::warn!("Testing with no segments built");
        }
        log::info!(
            "Vehicle setting off: gap {:.2}, bridge {:.2}",
            anchors.gap(),
            structure.chain.span()
        );

        self.run.test_triggered = true;
        self.run.traversal = Some(traversal);
        self.set_phase(LevelPhase::Testing);
        self.events.push(GameEvent::TestStarted);
        Ok(())
    }

    // === Per-tick ===

    /// Advance time by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        self.poll_placement();

        match self.run.phase {
            LevelPhase::Testing => self.step_traversal(dt),
            LevelPhase::LevelComplete => {
                let delay = self.settings.level_transition_delay;
                if let Some(timer) = self.run.transition_timer.as_mut() {
                    *timer += dt;
                    if *timer >= delay {
                        self.advance_level();
                    }
                }
            }
            _ => {}
        }
    }

    fn poll_placement(&mut self) {
        let Some(subscription) = self.run.subscription else {
            return;
        };
        while let Some(spawned) = self.host.poll_spawned(subscription) {
            if self.run.phase == LevelPhase::Building {
                // Phase was just checked, so this can't be rejected
                let _ = self.bind_structure(spawned);
            } else {
                log::info!(
                    "Ignoring structure {:?} placed while {:?}",
                    spawned.id,
                    self.run.phase
                );
            }
        }
    }

    fn step_traversal(&mut self, dt: f32) {
        let finish = self
            .active_structure()
            .and_then(|id| self.host.anchors(id))
            .map(|a| a.finish);
        let Some(traversal) = self.run.traversal.as_mut() else {
            log::error!("Testing without a crossing in progress");
            self.abort_test();
            return;
        };

        match traversal.step(finish, dt) {
            Ok(TraversalOutcome::Pending) => {}
            Ok(TraversalOutcome::Passed) => self.conclude_test(None),
            Ok(TraversalOutcome::Failed(reason)) => self.conclude_test(Some(reason)),
            Err(err) => {
                log::error!("Crossing aborted: {err}");
                self.abort_test();
            }
        }
    }

    /// Drop the crossing and hand building back to the player
    fn abort_test(&mut self) {
        self.run.traversal = None;
        self.run.test_triggered = false;
        self.set_phase(LevelPhase::Building);
        self.events.push(GameEvent::TestAborted);
    }

    /// Record a finished crossing. `failure` is None when the vehicle arrived.
    fn conclude_test(&mut self, failure: Option<FailureReason>) {
        let outcome = match failure {
            Some(reason) => TraversalOutcome::Failed(reason),
            None => TraversalOutcome::Passed,
        };
        let crossing_secs = self
            .run
            .traversal
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        let index = self.run.level_index;
        let level_name = self
            .campaign
            .get(index)
            .map(|l| l.name.clone())
            .unwrap_or_default();
        let segments_used = self.chain().map(|c| c.len()).unwrap_or(0);

        self.results.record(LevelResult {
            level_index: index,
            level_name: level_name.clone(),
            outcome,
            segments_used,
            budget_left: self.ledger.balance(),
            crossing_secs,
        });

        match failure {
            None => {
                log::info!("Level completed: {level_name}");
                self.run.transition_timer = Some(0.0);
                self.set_phase(LevelPhase::LevelComplete);
                self.events.push(GameEvent::LevelCompleted { index });
            }
            Some(reason) => {
                log::info!("Level failed: {level_name} ({reason:?})");
                self.set_phase(LevelPhase::LevelFailed);
                self.events.push(GameEvent::LevelFailed { index, reason });
            }
        }
    }

    // === Transitions ===

    fn advance_level(&mut self) {
        self.run.transition_timer = None;
        self.enter_level(self.run.level_index + 1);
    }

    /// Tear down the current level and set up `index`, or end the game past the last one
    fn enter_level(&mut self, index: usize) {
        self.teardown();
        self.run.test_triggered = false;
        self.run.traversal = None;
        self.run.transition_timer = None;

        let Some(level) = self.campaign.get(index).cloned() else {
            log::info!("All levels completed!");
            self.set_phase(LevelPhase::GameOver);
            self.events.push(GameEvent::GameOver);
            return;
        };

        log::info!("Starting Level: {}", level.name);
        self.run.level_index = index;
        self.ledger.init(level.starting_budget);
        self.run.subscription = Some(self.host.subscribe());

        self.host.level_changed(&level.name, index);
        self.host.budget_changed(self.ledger.balance());
        self.set_phase(LevelPhase::Building);
        self.events.push(GameEvent::LevelStarted {
            index,
            name: level.name,
            budget: level.starting_budget,
        });
    }

    /// Remove the level's structure and stop listening for placements
    fn teardown(&mut self) {
        if let Some(structure) = self.run.structure.take() {
            self.dismantle(structure);
        }
        if let Some(subscription) = self.run.subscription.take() {
            self.host.unsubscribe(subscription);
        }
        self.host.clear_all();
    }

    /// Despawn a structure's segment visuals, returning what they cost
    fn dismantle(&mut self, mut structure: ActiveStructure) -> u32 {
        let mut total = 0;
        for segment in structure.chain.drain() {
            total += segment.cost();
            if let Some(visual) = segment.visual() {
                self.host.despawn_segment(visual);
            }
        }
        total
    }

    fn set_phase(&mut self, phase: LevelPhase) {
        if self.run.phase != phase {
            log::info!("Phase {:?} -> {:?}", self.run.phase, phase);
        }
        self.run.phase = phase;
        self.host.phase_changed(phase);
    }

    fn require_phase(&self, phase: LevelPhase, action: &'static str) -> Result<(), ActionError> {
        match self.run.phase {
            current if current == phase => Ok(()),
            LevelPhase::Idle => Err(ActionError::NotStarted),
            current => Err(ActionError::WrongPhase {
                action,
                phase: current,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use proptest::prelude::*;

    use crate::platform::{AnchorPair, HeadlessHost};

    const DT: f32 = 0.1;

    fn two_levels() -> Campaign {
        Campaign::new(vec![
            LevelDefinition::new("First", 10),
            LevelDefinition::new("Second", 20),
        ])
    }

    fn settings() -> Settings {
        Settings {
            segment_spacing: 0.5,
            default_segment_cost: 4,
            vehicle_speed: 1.0,
            finish_epsilon: 0.01,
            max_traversal_secs: Some(10.0),
            require_support: true,
            level_transition_delay: 2.0,
        }
    }

    /// Anchors one unit apart: two 0.5 segments span it
    fn short_gap() -> AnchorPair {
        AnchorPair::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0))
    }

    fn controller(slot: &SessionSlot) -> LevelController<HeadlessHost> {
        LevelController::new(slot, two_levels(), settings(), HeadlessHost::new()).unwrap()
    }

    /// Place a structure through the host and let the controller pick it up
    fn place(c: &mut LevelController<HeadlessHost>, anchors: Option<AnchorPair>) -> StructureId {
        let id = c.host_mut().place_structure(anchors, None);
        c.update(0.0);
        assert_eq!(c.active_structure(), Some(id));
        id
    }

    fn run_until_concluded(c: &mut LevelController<HeadlessHost>) {
        for _ in 0..1_000 {
            if c.phase() != LevelPhase::Testing {
                return;
            }
            c.update(DT);
        }
        panic!("crossing never concluded");
    }

    fn build_and_pass(c: &mut LevelController<HeadlessHost>) {
        place(c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_extend().unwrap();
        c.request_test().unwrap();
        run_until_concluded(c);
        assert_eq!(c.phase(), LevelPhase::LevelComplete);
    }

    #[test]
    fn test_budget_scenario_extend_until_broke() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        assert_eq!(c.balance(), 10);

        c.request_extend().unwrap();
        assert_eq!((c.balance(), c.chain().unwrap().len()), (6, 1));
        c.request_extend().unwrap();
        assert_eq!((c.balance(), c.chain().unwrap().len()), (2, 2));

        let err = c.request_extend().unwrap_err();
        assert_eq!(err, ActionError::InsufficientBudget { cost: 4, balance: 2 });
        assert_eq!((c.balance(), c.chain().unwrap().len()), (2, 2));
        assert!(!c.can_extend());
    }

    #[test]
    fn test_budget_scenario_remove_refunds() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_extend().unwrap();

        assert_eq!(c.request_remove_last(), Ok(4));
        assert_eq!((c.balance(), c.chain().unwrap().len()), (6, 1));
        assert_eq!(c.request_remove_last(), Ok(4));
        assert_eq!((c.balance(), c.chain().unwrap().len()), (10, 0));
        assert_eq!(c.request_remove_last(), Err(ActionError::EmptyChain));
        assert_eq!((c.balance(), c.chain().unwrap().len()), (10, 0));
        assert!(!c.has_segments());
    }

    #[test]
    fn test_segment_visuals_follow_chain() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        let id = place(&mut c, Some(short_gap()));

        c.request_extend().unwrap();
        c.request_extend().unwrap();
        let offsets: Vec<Vec3> = c.host().visuals_for(id).iter().map(|v| v.offset).collect();
        assert_eq!(offsets, vec![Vec3::ZERO, Vec3::new(0.0, 0.0, 0.5)]);
        assert_eq!(c.host().budget, Some(2));

        c.request_remove_last().unwrap();
        assert_eq!(c.host().visuals_for(id).len(), 1);
        assert_eq!(c.host().budget, Some(6));
    }

    #[test]
    fn test_campaign_scenario_through_game_over_and_restart() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        assert_eq!(c.level_index(), 0);

        build_and_pass(&mut c);
        // Transition waits for the delay
        c.update(1.0);
        assert_eq!(c.phase(), LevelPhase::LevelComplete);
        c.update(1.0);
        assert_eq!(c.phase(), LevelPhase::Building);
        assert_eq!(c.level_index(), 1);
        assert_eq!(c.balance(), 20);
        assert!(c.chain().is_none());
        assert!(!c.test_triggered());
        assert_eq!(c.host().level, Some(("Second".to_string(), 1)));

        build_and_pass(&mut c);
        c.advance().unwrap();
        assert_eq!(c.phase(), LevelPhase::GameOver);
        assert!(c.current_level().is_none());
        assert_eq!(c.results().levels_passed(), 2);

        c.restart().unwrap();
        assert_eq!(c.phase(), LevelPhase::Building);
        assert_eq!(c.level_index(), 0);
        assert_eq!(c.balance(), 10);
        assert!(c.results().is_empty());
    }

    #[test]
    fn test_start_only_once() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        assert_eq!(c.phase(), LevelPhase::Idle);
        c.start().unwrap();
        assert_eq!(c.start(), Err(ActionError::AlreadyStarted));
    }

    #[test]
    fn test_actions_before_start_rejected() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        assert_eq!(c.request_test(), Err(ActionError::NotStarted));
        assert_eq!(c.request_extend().unwrap_err(), ActionError::NotStarted);
        assert_eq!(c.request_remove_last(), Err(ActionError::NotStarted));
        assert_eq!(c.restart(), Err(ActionError::NotStarted));
        assert!(!c.can_test());
    }

    #[test]
    fn test_building_needs_a_placed_structure() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        let err = c.request_extend().unwrap_err();
        assert_eq!(err, ActionError::NoActiveStructure);
        assert!(err.is_configuration_fault());
        assert_eq!(c.request_test(), Err(ActionError::NoActiveStructure));
        assert_eq!(c.balance(), 10);
    }

    #[test]
    fn test_test_runs_once_per_level() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_extend().unwrap();

        assert!(c.can_test());
        c.request_test().unwrap();
        assert!(!c.can_test());
        assert_eq!(c.request_test(), Err(ActionError::TestAlreadyTriggered));
    }

    #[test]
    fn test_building_locked_while_testing() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_test().unwrap();

        assert_eq!(
            c.request_extend().unwrap_err(),
            ActionError::WrongPhase {
                action: "extend",
                phase: LevelPhase::Testing
            }
        );
        assert!(matches!(
            c.request_remove_last(),
            Err(ActionError::WrongPhase { .. })
        ));
        assert_eq!(c.chain().unwrap().len(), 1);
        assert_eq!(c.balance(), 6);
    }

    #[test]
    fn test_missing_anchors_leave_state_untouched() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, None);
        c.request_extend().unwrap();

        assert!(!c.can_test());
        assert_eq!(c.request_test(), Err(ActionError::MissingAnchors));
        assert_eq!(c.phase(), LevelPhase::Building);
        assert!(!c.test_triggered());
        assert!(c.traversal().is_none());
    }

    #[test]
    fn test_anchors_lost_mid_crossing_aborts() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        let id = place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_extend().unwrap();
        c.request_test().unwrap();
        c.update(DT);

        c.host_mut().set_anchors(id, None);
        c.drain_events();
        c.update(DT);
        assert_eq!(c.phase(), LevelPhase::Building);
        assert!(!c.test_triggered());
        assert!(c.traversal().is_none());
        assert_eq!(c.drain_events(), vec![GameEvent::TestAborted]);
        assert!(c.results().is_empty());
    }

    #[test]
    fn test_empty_bridge_fails_and_retry_resets_level() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        c.request_test().unwrap();
        run_until_concluded(&mut c);

        assert_eq!(c.phase(), LevelPhase::LevelFailed);
        let result = &c.results().entries[0];
        assert_eq!(result.outcome, TraversalOutcome::Failed(FailureReason::Fell));
        assert_eq!(result.segments_used, 0);

        // A failed level doesn't advance on its own
        c.update(5.0);
        assert_eq!(c.phase(), LevelPhase::LevelFailed);
        assert!(matches!(c.advance(), Err(ActionError::WrongPhase { .. })));

        c.retry().unwrap();
        assert_eq!(c.phase(), LevelPhase::Building);
        assert_eq!(c.level_index(), 0);
        assert_eq!(c.balance(), 10);
        assert!(!c.test_triggered());
        assert!(c.chain().is_none());
    }

    #[test]
    fn test_short_bridge_falls() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_test().unwrap();
        run_until_concluded(&mut c);
        assert_eq!(c.phase(), LevelPhase::LevelFailed);
    }

    #[test]
    fn test_restart_cancels_crossing_and_transition() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_extend().unwrap();
        c.request_test().unwrap();
        c.update(DT);
        assert!(c.traversal().is_some());

        c.restart().unwrap();
        assert_eq!(c.phase(), LevelPhase::Building);
        assert!(c.traversal().is_none());
        assert!(c.chain().is_none());
        assert_eq!(c.host().live_visual_count(), 0);

        build_and_pass(&mut c);
        assert!(c.transition_remaining().is_some());
        c.restart().unwrap();
        assert!(c.transition_remaining().is_none());
        // The cancelled transition must not fire later
        c.update(5.0);
        assert_eq!(c.level_index(), 0);
        assert_eq!(c.phase(), LevelPhase::Building);
    }

    #[test]
    fn test_subscription_tied_to_level() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        assert_eq!(c.host().subscriber_count(), 0);
        c.start().unwrap();
        assert_eq!(c.host().subscriber_count(), 1);

        build_and_pass(&mut c);
        c.advance().unwrap();
        assert_eq!(c.host().subscriber_count(), 1);
        assert_eq!(c.host().placed_count(), 0);

        build_and_pass(&mut c);
        c.advance().unwrap();
        assert_eq!(c.phase(), LevelPhase::GameOver);
        assert_eq!(c.host().subscriber_count(), 0);
    }

    #[test]
    fn test_structure_placed_mid_test_is_ignored() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        let id = place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_test().unwrap();

        c.host_mut().place_structure(Some(short_gap()), None);
        c.update(DT);
        assert_eq!(c.active_structure(), Some(id));
    }

    #[test]
    fn test_rebinding_refunds_previous_structure() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        assert_eq!(c.balance(), 6);

        let second = c.host_mut().place_structure(Some(short_gap()), Some(3));
        c.update(0.0);
        assert_eq!(c.active_structure(), Some(second));
        assert_eq!(c.balance(), 10);
        assert_eq!(c.chain().unwrap().segment_cost(), 3);
        assert_eq!(c.host().live_visual_count(), 0);
        // The replaced structure is gone from the placement system
        assert_eq!(c.host().placed_count(), 1);
    }

    #[test]
    fn test_duplicate_controller_rejected() {
        let slot = SessionSlot::new();
        let first = controller(&slot);
        let second = LevelController::new(&slot, two_levels(), settings(), HeadlessHost::new());
        assert!(matches!(second, Err(SessionError::AlreadyActive)));

        // The live controller keeps working
        assert_eq!(first.phase(), LevelPhase::Idle);
        drop(first);
        assert!(LevelController::new(&slot, two_levels(), settings(), HeadlessHost::new()).is_ok());
    }

    #[test]
    fn test_empty_campaign_rejected() {
        let slot = SessionSlot::new();
        let result = LevelController::new(
            &slot,
            Campaign::new(Vec::new()),
            settings(),
            HeadlessHost::new(),
        );
        assert!(matches!(result, Err(SessionError::EmptyCampaign)));
        assert!(!slot.is_active());
    }

    #[test]
    fn test_stalling_settings_rejected() {
        let slot = SessionSlot::new();
        let stalled = Settings {
            vehicle_speed: 0.0,
            max_traversal_secs: None,
            require_support: false,
            ..settings()
        };
        let result = LevelController::new(&slot, two_levels(), stalled, HeadlessHost::new());
        assert!(matches!(result, Err(SessionError::InvalidSettings(_))));
        assert!(!slot.is_active());

        let no_tolerance = Settings {
            finish_epsilon: 0.0,
            ..settings()
        };
        let result = LevelController::new(&slot, two_levels(), no_tolerance, HeadlessHost::new());
        assert!(matches!(result, Err(SessionError::InvalidSettings(_))));
    }

    #[test]
    fn test_crossing_without_time_limit_still_ends() {
        let slot = SessionSlot::new();
        let untimed = Settings {
            max_traversal_secs: None,
            require_support: false,
            ..settings()
        };
        let mut c = LevelController::new(&slot, two_levels(), untimed, HeadlessHost::new()).unwrap();
        c.start().unwrap();
        place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_test().unwrap();
        run_until_concluded(&mut c);
        assert_eq!(c.phase(), LevelPhase::LevelComplete);
    }

    #[test]
    fn test_events_in_order() {
        let slot = SessionSlot::new();
        let mut c = controller(&slot);
        c.start().unwrap();
        let id = place(&mut c, Some(short_gap()));
        c.request_extend().unwrap();
        c.request_remove_last().unwrap();

        assert_eq!(
            c.drain_events(),
            vec![
                GameEvent::GameStarted,
                GameEvent::LevelStarted {
                    index: 0,
                    name: "First".to_string(),
                    budget: 10
                },
                GameEvent::StructureBound {
                    id,
                    segment_cost: 4
                },
                GameEvent::SegmentAdded {
                    ordinal: 0,
                    balance: 6
                },
                GameEvent::SegmentRemoved {
                    ordinal: 0,
                    refund: 4,
                    balance: 10
                },
            ]
        );
        assert!(c.drain_events().is_empty());
    }

    proptest! {
        #[test]
        fn rejected_actions_leave_chain_and_budget_alone(
            budget in 0u32..30,
            ops in prop::collection::vec(proptest::bool::ANY, 1..64),
        ) {
            let slot = SessionSlot::new();
            let campaign = Campaign::new(vec![LevelDefinition::new("Only", budget)]);
            let mut c = LevelController::new(&slot, campaign, settings(), HeadlessHost::new()).unwrap();
            c.start().unwrap();
            place(&mut c, Some(short_gap()));

            let mut expected_len = 0usize;
            for extend in ops {
                let before = c.balance();
                if extend {
                    match c.request_extend() {
                        Ok(_) => expected_len += 1,
                        Err(err) => {
                            prop_assert_eq!(err, ActionError::InsufficientBudget { cost: 4, balance: before });
                            prop_assert!(before < 4);
                        }
                    }
                } else {
                    match c.request_remove_last() {
                        Ok(refund) => {
                            prop_assert_eq!(refund, 4);
                            expected_len -= 1;
                        }
                        Err(err) => {
                            prop_assert_eq!(err, ActionError::EmptyChain);
                            prop_assert_eq!(expected_len, 0);
                        }
                    }
                }

                let chain = c.chain().unwrap();
                prop_assert_eq!(chain.len(), expected_len);
                prop_assert_eq!(c.balance() + chain.total_cost(), budget);
                prop_assert!(c.balance() <= budget);
            }
        }
    }
}
