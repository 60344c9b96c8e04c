//! Lens and deflector readback and restore for the microscope host.
//!
//! Readback replies are space-separated `NAME=VALUE` pairs. The same pairs,
//! comma-separated, are the arguments of the matching restore command, so a
//! recorded column state can be replayed as-is.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;

use crate::instrument::{ClAperture, Deflector, DeflectorValue, Instrument, Lens};
use crate::registry::{Arity, Registry};
use crate::{AppError, Result};

/// Add the readback and restore commands to `registry`.
pub fn register(registry: &mut Registry) {
    registry.register("get_lens_values", 0, get_lens_values);
    registry.register("get_deflector_values", 0, get_deflector_values);
    registry.register("get_instrument_state", 0, get_instrument_state);
    registry.register_with_arity("restore_lens_values", Arity::AtLeast(1), restore_lens_values);
    registry.register_with_arity(
        "restore_deflector_values",
        Arity::AtLeast(1),
        restore_deflector_values,
    );
}

fn describe_lenses(instrument: &dyn Instrument) -> Result<String> {
    let pairs = Lens::ALL
        .into_iter()
        .map(|lens| Ok(format!("{lens}={}", instrument.lens_value(lens)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(pairs.join(" "))
}

fn describe_deflectors(instrument: &dyn Instrument) -> Result<String> {
    let pairs = Deflector::ALL
        .into_iter()
        .map(|deflector| Ok(format!("{deflector}={}", instrument.deflector_value(deflector)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(pairs.join(" "))
}

fn get_lens_values(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    describe_lenses(instrument)
}

fn get_deflector_values(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    describe_deflectors(instrument)
}

/// Split every `NAME=VALUE` argument, rejecting repeats.
///
/// Nothing is applied until all arguments have parsed.
fn parse_assignments<K, V>(args: &[String]) -> Result<Vec<(K, V)>>
where
    K: FromStr<Err = AppError> + Eq + Hash + Copy + Display,
    V: FromStr,
    V::Err: Display,
{
    let mut seen = HashSet::new();
    args.iter()
        .map(|raw| {
            let (name, value) = raw.trim().split_once('=').ok_or_else(|| {
                AppError::Handler(format!("argument '{raw}' is not NAME=VALUE"))
            })?;
            let key: K = name.parse()?;
            if !seen.insert(key) {
                return Err(AppError::Handler(format!("{key} given more than once")));
            }
            let value = value.parse().map_err(|err| {
                AppError::Handler(format!("value for {key} '{value}' invalid: {err}"))
            })?;
            Ok((key, value))
        })
        .collect()
}

fn restore_lens_values(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let assignments: Vec<(Lens, u16)> = parse_assignments(args)?;
    for &(lens, value) in &assignments {
        if lens == Lens::OlSuperFine {
            // The super-fine DAC only latches while its switch is on.
            instrument.set_objective_superfine_enabled(true)?;
            instrument.set_lens_value(lens, value)?;
            instrument.set_objective_superfine_enabled(false)?;
        } else {
            instrument.set_lens_value(lens, value)?;
        }
    }
    Ok(format!("{} lens value(s) restored", assignments.len()))
}

fn restore_deflector_values(args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let assignments: Vec<(Deflector, DeflectorValue)> = parse_assignments(args)?;
    for &(deflector, value) in &assignments {
        instrument.set_deflector_value(deflector, value)?;
    }
    Ok(format!("{} deflector value(s) restored", assignments.len()))
}

/// One-line record of the column as an acquisition sees it.
fn get_instrument_state(_args: &[String], instrument: &mut dyn Instrument) -> Result<String> {
    let [a1_kv, a2_kv] = instrument.anode_kv()?;
    let (_, array_size) = instrument.imaging_area()?;
    let fields = [
        format!("ht_kv={}", instrument.ht_volts()? / 1000.0),
        format!("a1_kv={a1_kv}"),
        format!("a2_kv={a2_kv}"),
        format!("clapt1={}", instrument.cl_aperture(ClAperture::First)?),
        format!("clapt2={}", instrument.cl_aperture(ClAperture::Second)?),
        format!("spot_size={}", instrument.spot_size()?),
        format!("camera_length_m={}", instrument.camera_length_m()?),
        format!("magnification={}", instrument.magnification()?),
        format!("array_size={array_size}"),
        format!("scan_rotation={}", instrument.scan_rotation()?),
        instrument.stage_position()?.to_string(),
        describe_lenses(instrument)?,
        describe_deflectors(instrument)?,
    ];
    Ok(fields.join(" "))
}
