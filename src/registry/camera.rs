//! Commands for the camera host.

use crate::instrument::{Instrument, ScreenPosition};
use crate::registry::{screen, Registry};
use crate::{AppError, Result};

/// Populate `registry` with the camera command table.
pub fn register(registry: &mut Registry) {
    registry.register("first_scan", 0, first_scan);
    registry.register("detectors_out", 0, detectors_out);
    registry.register("ptycho_prep", 0, ptycho_prep);
    screen::register(registry);
}

/// Run one scan so the scan unit is armed for the acquisition that follows.
fn first_scan(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    instrument.start_acquisition()?;
    instrument.finish_acquisition()?;
    Ok("first scan complete".into())
}

/// Retract the active camera and confirm it moved.
fn retract_camera(instrument: &mut dyn Instrument) -> Result<String> {
    if !instrument.camera_inserted()? {
        return Ok("camera already retracted".into());
    }
    instrument.set_camera_inserted(false)?;
    if instrument.camera_inserted()? {
        return Err(AppError::Instrument("cannot retract the camera".into()));
    }
    Ok("camera retracted".into())
}

fn detectors_out(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    retract_camera(instrument)
}

/// Clear the beam path for a ptychography scan: camera out, screen up.
fn ptycho_prep(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let camera = retract_camera(instrument)?;
    let screen = screen::move_screen(instrument, ScreenPosition::Up)?;
    Ok(format!("{camera}; {screen}"))
}
