//! Sequential shifting.
//!
//! Edge-triggered up/down requests from the active device. With a clutch
//! present the reverse <-> neutral <-> first transitions are explicit steps,
//! and shifts can be gated on the clutch pedal; moving shifts blend through
//! the auto-clutch, neutral/reverse hops commit directly. Clutchless
//! vehicles commit every shift immediately.

use crate::config::Profile;
use crate::types::{GearboxState, InputFrame, VehicleTelemetry};

use super::{is_clutch_pressed, shift_down_requested, shift_to, shift_up_requested};

/// Run the sequential algorithm for one tick.
pub fn update(
    state: &mut GearboxState,
    input: &InputFrame,
    telemetry: &VehicleTelemetry,
    profile: &Profile,
) {
    if shift_up_requested(input) {
        if !telemetry.flags.has_clutch {
            if telemetry.gear_curr < telemetry.gear_top {
                shift_to(state, state.lock_gear + 1, false);
            }
            state.fake_neutral = false;
            return;
        }

        // Shift block with clutch shifting enforced.
        if profile.mt_options.clutch_shift_s && !is_clutch_pressed(input, profile) {
            return;
        }

        // Reverse to neutral.
        if telemetry.gear_curr == 0 && !state.fake_neutral {
            shift_to(state, 1, false);
            state.fake_neutral = true;
            return;
        }

        // Neutral to first.
        if telemetry.gear_curr == 1 && state.fake_neutral {
            state.fake_neutral = false;
            return;
        }

        // First and up.
        if telemetry.gear_curr < telemetry.gear_top {
            shift_to(state, state.lock_gear + 1, true);
            state.fake_neutral = false;
        }
        return;
    }

    if shift_down_requested(input) {
        if !telemetry.flags.has_clutch {
            if telemetry.gear_curr > 0 {
                shift_to(state, state.lock_gear - 1, false);
                state.fake_neutral = false;
            }
            return;
        }

        if profile.mt_options.clutch_shift_s && !is_clutch_pressed(input, profile) {
            return;
        }

        // First to neutral.
        if telemetry.gear_curr == 1 && !state.fake_neutral {
            state.fake_neutral = true;
            return;
        }

        // Neutral to reverse.
        if telemetry.gear_curr == 1 && state.fake_neutral {
            shift_to(state, 0, false);
            state.fake_neutral = false;
            return;
        }

        // Down through the forward gears.
        if telemetry.gear_curr > 1 {
            shift_to(state, state.lock_gear - 1, true);
            state.fake_neutral = false;
        }
    }
}
