//! Column commands for the microscope host.

use crate::instrument::{ClAperture, Instrument, DETECTOR_CHANNELS, UNASSIGNED_DETECTOR};
use crate::registry::{args, column, screen, Arity, Registry};
use crate::{AppError, Result};

/// Objective coarse DAC value of the standard focus.
pub const STD_OBJECTIVE_COARSE: u16 = 63270;
/// Objective fine DAC value of the standard focus.
pub const STD_OBJECTIVE_FINE: u16 = 32774;
/// Objective super-fine DAC value of the standard focus.
pub const STD_OBJECTIVE_SUPERFINE: u16 = 2048;
/// Top of the magnification selector; the selector cannot step up from here.
pub const MAX_MAGNIFICATION: u32 = 150_000_000;
/// Defocus per objective fine bit at 300 kV.
pub const DEFOCUS_NM_PER_BIT: f64 = 4.520;
/// Imaging areas the scan unit accepts, in pixels per side.
pub const ARRAY_SIZES: [u32; 8] = [64, 128, 256, 512, 1024, 2048, 3072, 4096];

/// Upper bound on selector presses for one `set_magnification`.
const MAX_SELECTOR_STEPS: usize = 64;

/// Populate `registry` with the microscope command table.
pub fn register(registry: &mut Registry) {
    registry.register("get_ht", 0, get_ht);
    registry.register("std_focus", 0, std_focus);
    registry.register_with_arity("set_defocus_nm", Arity::Between(1, 2), set_defocus_nm);
    registry.register_with_arity("set_defocus_um", Arity::Between(1, 2), set_defocus_um);
    registry.register("get_magnification", 0, get_magnification);
    registry.register("set_magnification", 1, set_magnification);
    registry.register("get_cl_apertures", 0, get_cl_apertures);
    registry.register("set_cl_aperture", 2, set_cl_aperture);
    registry.register("open_beam_valve", 0, open_beam_valve);
    registry.register("close_beam_valve", 0, close_beam_valve);
    registry.register("beam_blanking", 1, beam_blanking);
    registry.register("get_stage_position", 0, get_stage_position);
    registry.register("get_scan_rotation", 0, get_scan_rotation);
    registry.register("clear_detector_channels", 0, clear_detector_channels);
    registry.register("assign_detector_channel", 2, assign_detector_channel);
    registry.register("set_dwell_time_us", 1, set_dwell_time_us);
    registry.register("set_array_size", 1, set_array_size);
    column::register(registry);
    screen::register(registry);
}

fn get_ht(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    Ok(instrument.ht_volts()?.to_string())
}

/// Load the standard objective focus and reset the displayed defocus.
///
/// The displayed defocus only resets when the magnification selector moves,
/// so the selector is stepped away and back.
fn load_standard_focus(instrument: &mut dyn Instrument) -> Result<()> {
    instrument.set_objective_coarse(STD_OBJECTIVE_COARSE)?;
    instrument.set_objective_fine(STD_OBJECTIVE_FINE)?;
    instrument.set_objective_superfine_enabled(true)?;
    instrument.set_objective_superfine(STD_OBJECTIVE_SUPERFINE)?;
    instrument.set_objective_superfine_enabled(false)?;

    if instrument.magnification()? == MAX_MAGNIFICATION {
        instrument.magnification_down()?;
        instrument.magnification_up()?;
    } else {
        instrument.magnification_up()?;
        instrument.magnification_down()?;
    }
    Ok(())
}

fn std_focus(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    load_standard_focus(instrument)?;
    Ok("standard focus loaded".into())
}

/// Convert a defocus in nanometres to objective fine bits, truncating.
///
/// # Errors
///
/// Returns `AppError::Handler` if the result does not fit the lens range.
#[allow(clippy::cast_possible_truncation)]
pub fn defocus_steps(defocus_nm: f64) -> Result<i32> {
    let steps = (defocus_nm / DEFOCUS_NM_PER_BIT).trunc();
    if !steps.is_finite() || steps < f64::from(i32::MIN) || steps > f64::from(i32::MAX) {
        return Err(AppError::Handler(format!(
            "defocus {defocus_nm} nm is outside the objective range"
        )));
    }
    Ok(steps as i32)
}

/// Load the standard focus, then move the objective `defocus_nm` past the
/// zero-defocus point, which sits `zero_defocus_nm` from standard focus.
fn apply_defocus(
    instrument: &mut dyn Instrument,
    defocus_nm: f64,
    zero_defocus_nm: Option<f64>,
) -> Result<String> {
    let steps = defocus_steps(defocus_nm + zero_defocus_nm.unwrap_or(0.0))?;
    load_standard_focus(instrument)?;
    instrument.set_objective_focus(steps)?;
    Ok(match zero_defocus_nm {
        Some(zero) => format!("defocus {defocus_nm} nm from zero {zero} nm ({steps} steps)"),
        None => format!("defocus {defocus_nm} nm ({steps} steps)"),
    })
}

fn set_defocus_nm(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let defocus = args::parse_finite(args, 0, "defocus_nm")?;
    let zero = args::parse_optional_finite(args, 1, "zero_defocus_nm")?;
    apply_defocus(instrument, defocus, zero)
}

fn set_defocus_um(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let defocus = args::parse_finite(args, 0, "defocus_um")? * 1000.0;
    let zero = args::parse_optional_finite(args, 1, "zero_defocus_nm")?;
    apply_defocus(instrument, defocus, zero)
}

fn get_magnification(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    Ok(instrument.magnification()?.to_string())
}

/// Step the magnification selector toward `target`.
///
/// Stops on the exact value, at the end of the selector, or on whichever of
/// the two positions around `target` is closer.
///
/// # Errors
///
/// Returns `AppError::Instrument` if the selector fails or does not settle
/// within a bounded number of presses.
pub fn step_magnification(instrument: &mut dyn Instrument, target: u32) -> Result<u32> {
    for _ in 0..MAX_SELECTOR_STEPS {
        let current = instrument.magnification()?;
        if current == target {
            return Ok(current);
        }
        step_toward(instrument, current, target)?;

        let next = instrument.magnification()?;
        if next == current || next == target {
            return Ok(next);
        }
        if (next > target) == (current > target) {
            continue;
        }
        // Stepped past the target: keep whichever side is closer.
        if next.abs_diff(target) > current.abs_diff(target) {
            step_toward(instrument, next, target)?;
            return instrument.magnification();
        }
        return Ok(next);
    }
    Err(AppError::Instrument(format!(
        "magnification selector did not settle near {target} within {MAX_SELECTOR_STEPS} steps"
    )))
}

fn step_toward(instrument: &mut dyn Instrument, current: u32, target: u32) -> Result<()> {
    if current > target {
        instrument.magnification_down()
    } else {
        instrument.magnification_up()
    }
}

fn set_magnification(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let target: u32 = args::parse(args, 0, "magnification")?;
    let reached = step_magnification(instrument, target)?;
    if reached == target {
        Ok(format!("magnification {reached}"))
    } else {
        Ok(format!("magnification {reached} (closest to {target})"))
    }
}

fn describe_apertures(instrument: &dyn Instrument) -> Result<String> {
    Ok(format!(
        "clapt1={} clapt2={}",
        instrument.cl_aperture(ClAperture::First)?,
        instrument.cl_aperture(ClAperture::Second)?
    ))
}

fn get_cl_apertures(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    describe_apertures(instrument)
}

/// Insert one condenser aperture and withdraw the other.
fn set_cl_aperture(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let holder: ClAperture = args::parse(args, 0, "aperture")?;
    let size: u8 = args::parse(args, 1, "size")?;
    instrument.set_cl_aperture(holder, size)?;
    instrument.set_cl_aperture(holder.other(), 0)?;
    describe_apertures(instrument)
}

fn open_beam_valve(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    instrument.set_beam_valve(true)?;
    Ok("beam valve open".into())
}

fn close_beam_valve(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    instrument.set_beam_valve(false)?;
    Ok("beam valve closed".into())
}

fn beam_blanking(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let blanked = args::parse_switch(args, 0, "blanked")?;
    instrument.set_beam_blank(blanked)?;
    Ok(if blanked { "beam blanked" } else { "beam unblanked" }.into())
}

fn get_stage_position(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    Ok(instrument.stage_position()?.to_string())
}

fn get_scan_rotation(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    Ok(instrument.scan_rotation()?.to_string())
}

fn clear_detector_channels(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    for channel in 0..DETECTOR_CHANNELS {
        instrument.assign_detector_channel(channel, UNASSIGNED_DETECTOR)?;
    }
    Ok(format!("{DETECTOR_CHANNELS} channels cleared"))
}

fn assign_detector_channel(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let detector: String = args::parse(args, 0, "detector")?;
    let channel: usize = args::parse(args, 1, "channel")?;
    if detector.is_empty() {
        return Err(AppError::Handler("detector name must not be empty".into()));
    }
    if channel >= DETECTOR_CHANNELS {
        return Err(AppError::Handler(format!(
            "channel {channel} out of range 0..{DETECTOR_CHANNELS}"
        )));
    }
    instrument.assign_detector_channel(channel, &detector)?;
    Ok(format!("channel {channel} = {detector}"))
}

fn set_dwell_time_us(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let dwell_time = args::parse_finite(args, 0, "dwell_time_us")?;
    if dwell_time <= 0.0 {
        return Err(AppError::Handler("dwell time must be positive".into()));
    }
    instrument.set_dwell_time_us(dwell_time)?;
    Ok(format!("dwell time {dwell_time} us"))
}

/// Nearest accepted imaging area side for `requested` pixels.
#[must_use]
pub fn nearest_array_size(requested: u32) -> u32 {
    ARRAY_SIZES
        .into_iter()
        .min_by_key(|size| size.abs_diff(requested))
        .unwrap_or(ARRAY_SIZES[0])
}

fn set_array_size(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let requested: u32 = args::parse(args, 0, "array_size")?;
    let size = nearest_array_size(requested);
    instrument.set_imaging_area(size, size)?;
    Ok(format!("imaging area {size}x{size}"))
}
