//! Fixed timestep simulation tick
//!
//! Applies one tick's worth of player input to the controller, then advances
//! time. Input flags are one-shot: each is acted on once per tick.

use super::controller::LevelController;
use super::state::GameEvent;
use crate::platform::Host;

/// Input commands for a single tick (button presses)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Start Game button
    pub start: bool,
    /// Extend button
    pub extend: bool,
    /// Remove-last button
    pub remove_last: bool,
    /// Test Bridge button
    pub test: bool,
    /// Skip the wait after a completed level
    pub advance: bool,
    /// Rebuild the level after a failed crossing
    pub retry: bool,
    /// Back to the first level
    pub restart: bool,
}

/// Advance the game by one fixed timestep and return the events it raised.
///
/// Rejected inputs are logged by the controller and otherwise ignored.
pub fn tick<H: Host>(
    controller: &mut LevelController<H>,
    input: &TickInput,
    dt: f32,
) -> Vec<GameEvent> {
    // Restart wins over everything else pressed on the same tick
    if input.restart {
        let _ = controller.restart();
    } else {
        if input.start {
            let _ = controller.start();
        }
        if input.retry {
            let _ = controller.retry();
        }
        if input.advance {
            let _ = controller.advance();
        }
        if input.remove_last {
            let _ = controller.request_remove_last();
        }
        if input.extend {
            let _ = controller.request_extend();
        }
        if input.test {
            let _ = controller.request_test();
        }
    }

    controller.update(dt);
    controller.drain_events()
}
