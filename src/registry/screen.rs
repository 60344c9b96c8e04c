//! Viewing screen commands, shared by both profiles.

use crate::instrument::{Instrument, ScreenPosition};
use crate::registry::Registry;
use crate::{AppError, Result};

pub(crate) fn register(registry: &mut Registry) {
    registry.register("screen_up", 0, screen_up);
    registry.register("focus_screen", 0, focus_screen);
    registry.register("screen_down", 0, screen_down);
    registry.register("get_screen_position", 0, get_screen_position);
}

/// Move the screen and confirm the readback matches.
///
/// # Errors
///
/// Returns `AppError::Instrument` if the screen reports another position
/// after the move.
pub fn move_screen(instrument: &mut dyn Instrument, target: ScreenPosition) -> Result<String> {
    instrument.set_screen_position(target)?;
    let reached = instrument.screen_position()?;
    if reached == target {
        Ok(format!("screen {reached}"))
    } else {
        Err(AppError::Instrument(format!(
            "screen did not move to {target}, currently {reached}"
        )))
    }
}

fn screen_up(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    move_screen(instrument, ScreenPosition::Up)
}

fn focus_screen(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    move_screen(instrument, ScreenPosition::Focus)
}

fn screen_down(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    move_screen(instrument, ScreenPosition::Down)
}

fn get_screen_position(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    Ok(instrument.screen_position()?.to_string())
}
