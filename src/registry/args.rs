//! Positional argument parsing for handlers.

use std::fmt::Display;
use std::str::FromStr;

use crate::{AppError, Result};

/// Parse argument `index` as `T`, naming it `name` in the error.
///
/// # Errors
///
/// Returns `AppError::Handler` if the argument is missing or does not parse.
pub fn parse<T>(args: &[String], index: usize, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = args
        .get(index)
        .ok_or_else(|| AppError::Handler(format!("missing argument '{name}'")))?;
    raw.trim()
        .parse()
        .map_err(|err| AppError::Handler(format!("argument '{name}' = '{raw}' invalid: {err}")))
}

/// Parse argument `index` as an on/off switch.
///
/// Accepts `1`/`0`, `on`/`off`, `true`/`false`.
///
/// # Errors
///
/// Returns `AppError::Handler` for any other value.
pub fn parse_switch(args: &[String], index: usize, name: &str) -> Result<bool> {
    let raw = args
        .get(index)
        .ok_or_else(|| AppError::Handler(format!("missing argument '{name}'")))?;
    match raw.trim() {
        "1" | "on" | "true" => Ok(true),
        "0" | "off" | "false" => Ok(false),
        other => Err(AppError::Handler(format!(
            "argument '{name}' = '{other}' invalid: expected 1/0, on/off or true/false"
        ))),
    }
}

/// Parse argument `index` as a finite floating-point number.
///
/// # Errors
///
/// Returns `AppError::Handler` if it does not parse or is NaN/infinite.
pub fn parse_finite(args: &[String], index: usize, name: &str) -> Result<f64> {
    let value: f64 = parse(args, index, name)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AppError::Handler(format!(
            "argument '{name}' must be a finite number"
        )))
    }
}

/// Parse argument `index` as a finite number when it is present.
///
/// # Errors
///
/// Returns `AppError::Handler` if the argument is present but not finite.
pub fn parse_optional_finite(args: &[String], index: usize, name: &str) -> Result<Option<f64>> {
    if index < args.len() {
        parse_finite(args, index, name).map(Some)
    } else {
        Ok(None)
    }
}
