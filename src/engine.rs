use std::time::Duration;

use crate::solar_system::SolarSystem;

/// Advances the simulation to `elapsed` and brings every world transform up to date.
pub fn update(state: &mut SolarSystem, elapsed: Duration) {
    state.update(elapsed);
    state.scene_mut().late_update();
}
