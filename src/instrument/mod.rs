//! Instrument facade, the control surface command handlers drive.
//!
//! [`Instrument`] groups the vendor control calls the acquisition workflow
//! needs. Every method has a default body that reports the operation as
//! unsupported, so a backend only implements the groups its hardware has:
//! the microscope host covers optics, apertures, gun, stage and scan; the
//! camera host covers the camera and the viewing screen.
//!
//! Only the command registry calls into this trait, and it holds the shared
//! instrument lock for the whole call.

pub mod column;
pub mod simulated;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::profile::InstrumentBackend;
use crate::{AppError, Result};

pub use column::{Deflector, DeflectorValue, Lens};
pub use simulated::SimulatedInstrument;

/// Number of assignable scan detector channels.
pub const DETECTOR_CHANNELS: usize = 4;

/// Detector name that leaves a channel unassigned.
pub const UNASSIGNED_DETECTOR: &str = "None";

/// Condenser lens aperture holders.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ClAperture {
    /// First condenser aperture (`CLApt1`).
    First,
    /// Second condenser aperture (`CLApt2`).
    Second,
}

impl ClAperture {
    /// The other holder; only one condenser aperture is inserted at a time.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl Display for ClAperture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => f.write_str("CLApt1"),
            Self::Second => f.write_str("CLApt2"),
        }
    }
}

impl FromStr for ClAperture {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CLApt1" => Ok(Self::First),
            "CLApt2" => Ok(Self::Second),
            other => Err(AppError::Handler(format!(
                "unknown aperture '{other}', expected CLApt1 or CLApt2"
            ))),
        }
    }
}

/// Viewing screen positions.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScreenPosition {
    /// Screen lowered into the beam.
    Down,
    /// Small focusing screen in the beam.
    Focus,
    /// Screen lifted out of the beam.
    Up,
}

impl Display for ScreenPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Down => f.write_str("Down"),
            Self::Focus => f.write_str("Focus"),
            Self::Up => f.write_str("Up"),
        }
    }
}

/// Stage readback.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StagePosition {
    /// X position in nanometres.
    pub x_nm: f64,
    /// Y position in nanometres.
    pub y_nm: f64,
    /// Z position in nanometres.
    pub z_nm: f64,
    /// Alpha tilt in degrees.
    pub tilt_x_deg: f64,
    /// Beta tilt in degrees.
    pub tilt_y_deg: f64,
}

impl Display for StagePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "x={} y={} z={} tx={} ty={}",
            self.x_nm, self.y_nm, self.z_nm, self.tilt_x_deg, self.tilt_y_deg
        )
    }
}

fn unsupported(operation: &str) -> AppError {
    AppError::Instrument(format!("{operation} is not supported by this instrument"))
}

/// Vendor-backed control surface of one instrument host.
///
/// Calls may block on hardware; the registry runs them on the blocking
/// thread pool.
pub trait Instrument: Send {
    // ── (a) optics ──────────────────────────────────────

    /// Accelerating voltage in volts.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn ht_volts(&self) -> Result<f64> {
        Err(unsupported("ht readback"))
    }

    /// Set the objective lens coarse DAC value.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the lens rejects the value.
    fn set_objective_coarse(&mut self, _value: u16) -> Result<()> {
        Err(unsupported("objective coarse"))
    }

    /// Set the objective lens fine DAC value.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the lens rejects the value.
    fn set_objective_fine(&mut self, _value: u16) -> Result<()> {
        Err(unsupported("objective fine"))
    }

    /// Enable or disable the objective super-fine control.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the switch fails.
    fn set_objective_superfine_enabled(&mut self, _enabled: bool) -> Result<()> {
        Err(unsupported("objective super-fine switch"))
    }

    /// Set the objective lens super-fine DAC value.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the lens rejects the value.
    fn set_objective_superfine(&mut self, _value: u16) -> Result<()> {
        Err(unsupported("objective super-fine"))
    }

    /// Offset the objective focus by `steps` fine-lens bits from the
    /// current reference.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the lens rejects the value.
    fn set_objective_focus(&mut self, _steps: i32) -> Result<()> {
        Err(unsupported("objective focus"))
    }

    /// Current magnification.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn magnification(&self) -> Result<u32> {
        Err(unsupported("magnification readback"))
    }

    /// Step the magnification selector one position up.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the selector fails.
    fn magnification_up(&mut self) -> Result<()> {
        Err(unsupported("magnification selector"))
    }

    /// Step the magnification selector one position down.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the selector fails.
    fn magnification_down(&mut self) -> Result<()> {
        Err(unsupported("magnification selector"))
    }

    /// DAC value of a column lens.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn lens_value(&self, _lens: Lens) -> Result<u16> {
        Err(unsupported("lens readback"))
    }

    /// Set the DAC value of a column lens.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the lens rejects the value.
    fn set_lens_value(&mut self, _lens: Lens, _value: u16) -> Result<()> {
        Err(unsupported("lens drive"))
    }

    /// Current X/Y value of a deflector.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn deflector_value(&self, _deflector: Deflector) -> Result<DeflectorValue> {
        Err(unsupported("deflector readback"))
    }

    /// Set the X/Y value of a deflector.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the deflector rejects the value.
    fn set_deflector_value(&mut self, _deflector: Deflector, _value: DeflectorValue) -> Result<()> {
        Err(unsupported("deflector drive"))
    }

    /// Condenser spot size index.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn spot_size(&self) -> Result<u8> {
        Err(unsupported("spot size readback"))
    }

    /// Nominal STEM camera length in metres.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn camera_length_m(&self) -> Result<f64> {
        Err(unsupported("camera length readback"))
    }

    // ── (b) apertures ───────────────────────────────────

    /// Size index of a condenser aperture; 0 means withdrawn.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn cl_aperture(&self, _holder: ClAperture) -> Result<u8> {
        Err(unsupported("condenser aperture readback"))
    }

    /// Select a condenser aperture size index; 0 withdraws it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the drive fails or the index is
    /// out of range.
    fn set_cl_aperture(&mut self, _holder: ClAperture, _size: u8) -> Result<()> {
        Err(unsupported("condenser aperture drive"))
    }

    // ── (c) beam / gun ──────────────────────────────────

    /// Whether the gun beam valve is open.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn beam_valve_open(&self) -> Result<bool> {
        Err(unsupported("beam valve readback"))
    }

    /// Anode 1 and anode 2 readbacks of the field-emission gun, in kV.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn anode_kv(&self) -> Result<[f64; 2]> {
        Err(unsupported("anode readback"))
    }

    /// Open or close the gun beam valve.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the valve fails.
    fn set_beam_valve(&mut self, _open: bool) -> Result<()> {
        Err(unsupported("beam valve"))
    }

    /// Blank or unblank the beam.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the deflector fails.
    fn set_beam_blank(&mut self, _blanked: bool) -> Result<()> {
        Err(unsupported("beam blanking"))
    }

    // ── (d) stage / scan ────────────────────────────────

    /// Stage position and tilt.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn stage_position(&self) -> Result<StagePosition> {
        Err(unsupported("stage readback"))
    }

    /// Nominal scan rotation in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn scan_rotation(&self) -> Result<f64> {
        Err(unsupported("scan rotation readback"))
    }

    // ── (e) detectors / camera ──────────────────────────

    /// Assign a detector by name to a scan channel.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the assignment is rejected.
    fn assign_detector_channel(&mut self, _channel: usize, _detector: &str) -> Result<()> {
        Err(unsupported("detector channel assignment"))
    }

    /// Detector currently assigned to each channel.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn detector_channels(&self) -> Result<Vec<String>> {
        Err(unsupported("detector channel readback"))
    }

    /// Set the scan dwell time in microseconds.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the scan unit rejects the value.
    fn set_dwell_time_us(&mut self, _dwell_time: f64) -> Result<()> {
        Err(unsupported("dwell time"))
    }

    /// Set the scan imaging area in pixels.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the scan unit rejects the size.
    fn set_imaging_area(&mut self, _width: u32, _height: u32) -> Result<()> {
        Err(unsupported("imaging area"))
    }

    /// Scan imaging area as `(width, height)` in pixels.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn imaging_area(&self) -> Result<(u32, u32)> {
        Err(unsupported("imaging area readback"))
    }

    /// Whether the active camera is inserted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn camera_inserted(&self) -> Result<bool> {
        Err(unsupported("camera insertion readback"))
    }

    /// Insert or retract the active camera.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the drive fails.
    fn set_camera_inserted(&mut self, _inserted: bool) -> Result<()> {
        Err(unsupported("camera insertion"))
    }

    /// Press the scan acquisition button.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if acquisition cannot start.
    fn start_acquisition(&mut self) -> Result<()> {
        Err(unsupported("acquisition"))
    }

    /// Wait for the running acquisition to finish.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if acquisition fails.
    fn finish_acquisition(&mut self) -> Result<()> {
        Err(unsupported("acquisition"))
    }

    // ── (f) screen ──────────────────────────────────────

    /// Current viewing screen position.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the readback fails.
    fn screen_position(&self) -> Result<ScreenPosition> {
        Err(unsupported("screen readback"))
    }

    /// Move the viewing screen.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Instrument`] if the drive fails.
    fn set_screen_position(&mut self, _position: ScreenPosition) -> Result<()> {
        Err(unsupported("screen drive"))
    }
}

/// Build the facade selected in configuration.
#[must_use]
pub fn from_backend(backend: InstrumentBackend) -> Box<dyn Instrument> {
    match backend {
        InstrumentBackend::Simulated => Box::new(SimulatedInstrument::new()),
    }
}
