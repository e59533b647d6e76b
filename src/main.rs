//! Bridge Test headless runner
//!
//! Plays the campaign with a simple auto-builder: place a structure, lay
//! segments until the gap is covered (or the money runs out), send the vehicle
//! and retry failed levels a few times. Prints the results as JSON.
//!
//! Usage: bridge-test [campaign.json] [settings.json]

use glam::Vec3;

use bridge_test::consts::*;
use bridge_test::platform::{AnchorPair, HeadlessHost};
use bridge_test::sim::{LevelController, LevelPhase, SessionSlot, TickInput, tick};
use bridge_test::{Campaign, Settings};

/// Frame time of the simulated display
const FRAME_DT: f32 = 1.0 / 30.0;
/// Attempts per level before giving up
const MAX_ATTEMPTS: usize = 3;
/// Hard stop for the frame loop
const MAX_FRAMES: u32 = 100_000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let campaign = match args.next() {
        Some(path) => Campaign::load(path)?,
        None => Campaign::default(),
    };
    let settings = match args.next() {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    log::info!("Bridge Test (headless) starting: {} levels", campaign.len());

    let slot = SessionSlot::new();
    let mut game = LevelController::new(&slot, campaign, settings, HeadlessHost::new())?;

    let mut accumulator = 0.0;
    for _ in 0..MAX_FRAMES {
        let input = match plan(&mut game) {
            Some(input) => input,
            None => break,
        };

        // Fixed timestep with substep cap, input applied on the first substep only
        accumulator += FRAME_DT;
        let mut substeps = 0;
        let mut pending = Some(input);
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = pending.take().unwrap_or_default();
            for event in tick(&mut game, &input, SIM_DT) {
                log::debug!("{}", serde_json::to_string(&event)?);
            }
            accumulator -= SIM_DT;
            substeps += 1;
        }
    }

    println!("{}", serde_json::to_string_pretty(game.results())?);
    println!(
        "Passed {}/{} levels, {} budget saved",
        game.results().levels_passed(),
        game.campaign().len(),
        game.results().total_budget_left()
    );
    Ok(())
}

/// Gap to cross on a level; later levels are wider
fn level_anchors(index: usize) -> AnchorPair {
    let gap = 1.2 + 0.6 * index as f32;
    AnchorPair::new(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 0.5, gap))
}

/// Decide this frame's input. None once there's nothing left to do.
fn plan(game: &mut LevelController<HeadlessHost>) -> Option<TickInput> {
    let mut input = TickInput::default();
    match game.phase() {
        LevelPhase::Idle => input.start = true,
        LevelPhase::Building => {
            let anchors = level_anchors(game.level_index());
            match game.chain().map(|c| c.span() < anchors.gap()) {
                None => {
                    game.host_mut().place_structure(Some(anchors), None);
                }
                Some(true) if game.can_extend() => input.extend = true,
                Some(_) => input.test = game.can_test(),
            }
        }
        LevelPhase::Testing | LevelPhase::LevelComplete => {}
        LevelPhase::LevelFailed => {
            if game.results().attempts(game.level_index()) >= MAX_ATTEMPTS {
                log::warn!("Giving up on level {}", game.level_index());
                return None;
            }
            input.retry = true;
        }
        LevelPhase::GameOver => return None,
    }
    Some(input)
}
