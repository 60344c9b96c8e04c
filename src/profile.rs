//! Instrument profiles: which command table a server exposes.
//!
//! The microscope and camera hosts run the same server; only the role and
//! the profile differ between them.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Command table selected at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Column control on the microscope host (lenses, apertures, gun, scan).
    Microscope,
    /// Camera host control (camera insertion, screen, acquisition).
    Camera,
}

/// Facade implementation the command handlers run against.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentBackend {
    /// In-memory instrument model. Default, and the only backend without
    /// vendor bindings.
    #[default]
    Simulated,
}
