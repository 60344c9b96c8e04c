//! In-memory instrument model.
//!
//! Stands in for the vendor bindings on hosts without them and in tests.
//! Values start at what a freshly aligned 300 kV column reports.

use crate::instrument::{
    ClAperture, Deflector, DeflectorValue, Instrument, Lens, ScreenPosition, StagePosition,
    DETECTOR_CHANNELS, UNASSIGNED_DETECTOR,
};
use crate::{AppError, Result};

/// Magnification selector positions, lowest to highest.
pub const MAGNIFICATION_SERIES: [u32; 40] = [
    20_000,
    25_000,
    30_000,
    40_000,
    50_000,
    60_000,
    80_000,
    100_000,
    120_000,
    150_000,
    200_000,
    250_000,
    300_000,
    400_000,
    500_000,
    600_000,
    800_000,
    1_000_000,
    1_200_000,
    1_500_000,
    2_000_000,
    2_500_000,
    3_000_000,
    4_000_000,
    5_000_000,
    6_000_000,
    8_000_000,
    10_000_000,
    12_000_000,
    15_000_000,
    20_000_000,
    25_000_000,
    30_000_000,
    40_000_000,
    50_000_000,
    60_000_000,
    80_000_000,
    100_000_000,
    120_000_000,
    150_000_000,
];

/// Highest condenser aperture size index.
pub const MAX_APERTURE_INDEX: u8 = 4;

const INITIAL_MAGNIFICATION_INDEX: usize = 11;

/// DAC value the lenses outside the objective start at.
const LENS_MIDRANGE: u16 = 0x8000;

/// Objective lens DAC state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectiveLens {
    /// Coarse DAC.
    pub coarse: u16,
    /// Fine DAC.
    pub fine: u16,
    /// Super-fine DAC.
    pub superfine: u16,
    /// Whether the super-fine control is active.
    pub superfine_enabled: bool,
    /// Focus offset in fine bits.
    pub focus_steps: i32,
}

/// Instrument whose state lives in memory.
#[derive(Debug, Clone)]
pub struct SimulatedInstrument {
    ht_volts: f64,
    anode_kv: [f64; 2],
    objective: ObjectiveLens,
    lenses: [u16; Lens::ALL.len()],
    deflectors: [DeflectorValue; Deflector::ALL.len()],
    spot_size: u8,
    camera_length_m: f64,
    magnification_index: usize,
    cl_apertures: [u8; 2],
    beam_valve_open: bool,
    beam_blanked: bool,
    stage: StagePosition,
    scan_rotation: f64,
    detector_channels: Vec<String>,
    dwell_time_us: f64,
    imaging_area: (u32, u32),
    camera_inserted: bool,
    acquisitions: u32,
    acquiring: bool,
    screen: ScreenPosition,
}

impl SimulatedInstrument {
    /// A column at 300 kV with the camera inserted and the screen down.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ht_volts: 300_000.0,
            anode_kv: [3.95, 6.8],
            objective: ObjectiveLens::default(),
            lenses: [LENS_MIDRANGE; Lens::ALL.len()],
            deflectors: [DeflectorValue::CENTRED; Deflector::ALL.len()],
            spot_size: 5,
            camera_length_m: 0.1,
            magnification_index: INITIAL_MAGNIFICATION_INDEX,
            cl_apertures: [1, 0],
            beam_valve_open: false,
            beam_blanked: false,
            stage: StagePosition {
                x_nm: 0.0,
                y_nm: 0.0,
                z_nm: 0.0,
                tilt_x_deg: 0.0,
                tilt_y_deg: 0.0,
            },
            scan_rotation: 0.0,
            detector_channels: vec![UNASSIGNED_DETECTOR.to_owned(); DETECTOR_CHANNELS],
            dwell_time_us: 10.0,
            imaging_area: (512, 512),
            camera_inserted: true,
            acquisitions: 0,
            acquiring: false,
            screen: ScreenPosition::Down,
        }
    }

    /// Objective lens DAC state.
    #[must_use]
    pub fn objective(&self) -> ObjectiveLens {
        self.objective
    }

    /// Whether the beam is blanked.
    #[must_use]
    pub fn beam_blanked(&self) -> bool {
        self.beam_blanked
    }

    /// Scan dwell time in microseconds.
    #[must_use]
    pub fn dwell_time_us(&self) -> f64 {
        self.dwell_time_us
    }

    /// Completed acquisitions.
    #[must_use]
    pub fn acquisitions(&self) -> u32 {
        self.acquisitions
    }

    fn aperture_slot(holder: ClAperture) -> usize {
        match holder {
            ClAperture::First => 0,
            ClAperture::Second => 1,
        }
    }
}

impl Default for SimulatedInstrument {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrument for SimulatedInstrument {
    fn ht_volts(&self) -> Result<f64> {
        Ok(self.ht_volts)
    }

    fn set_objective_coarse(&mut self, value: u16) -> Result<()> {
        self.objective.coarse = value;
        Ok(())
    }

    fn set_objective_fine(&mut self, value: u16) -> Result<()> {
        self.objective.fine = value;
        Ok(())
    }

    fn set_objective_superfine_enabled(&mut self, enabled: bool) -> Result<()> {
        self.objective.superfine_enabled = enabled;
        Ok(())
    }

    fn set_objective_superfine(&mut self, value: u16) -> Result<()> {
        if !self.objective.superfine_enabled {
            return Err(AppError::Instrument(
                "super-fine control is switched off".into(),
            ));
        }
        self.objective.superfine = value;
        Ok(())
    }

    fn set_objective_focus(&mut self, steps: i32) -> Result<()> {
        self.objective.focus_steps = steps;
        Ok(())
    }

    fn lens_value(&self, lens: Lens) -> Result<u16> {
        Ok(match lens {
            Lens::OlCoarse => self.objective.coarse,
            Lens::OlFine => self.objective.fine,
            Lens::OlSuperFine => self.objective.superfine,
            other => self.lenses[other.index()],
        })
    }

    fn set_lens_value(&mut self, lens: Lens, value: u16) -> Result<()> {
        match lens {
            Lens::OlCoarse => self.set_objective_coarse(value),
            Lens::OlFine => self.set_objective_fine(value),
            Lens::OlSuperFine => self.set_objective_superfine(value),
            other => {
                self.lenses[other.index()] = value;
                Ok(())
            }
        }
    }

    fn deflector_value(&self, deflector: Deflector) -> Result<DeflectorValue> {
        Ok(self.deflectors[deflector.index()])
    }

    fn set_deflector_value(&mut self, deflector: Deflector, value: DeflectorValue) -> Result<()> {
        self.deflectors[deflector.index()] = value;
        Ok(())
    }

    fn spot_size(&self) -> Result<u8> {
        Ok(self.spot_size)
    }

    fn camera_length_m(&self) -> Result<f64> {
        Ok(self.camera_length_m)
    }

    fn magnification(&self) -> Result<u32> {
        Ok(MAGNIFICATION_SERIES[self.magnification_index])
    }

    fn magnification_up(&mut self) -> Result<()> {
        if self.magnification_index + 1 < MAGNIFICATION_SERIES.len() {
            self.magnification_index += 1;
        }
        Ok(())
    }

    fn magnification_down(&mut self) -> Result<()> {
        self.magnification_index = self.magnification_index.saturating_sub(1);
        Ok(())
    }

    fn cl_aperture(&self, holder: ClAperture) -> Result<u8> {
        Ok(self.cl_apertures[Self::aperture_slot(holder)])
    }

    fn set_cl_aperture(&mut self, holder: ClAperture, size: u8) -> Result<()> {
        if size > MAX_APERTURE_INDEX {
            return Err(AppError::Instrument(format!(
                "{holder} size index {size} out of range 0..={MAX_APERTURE_INDEX}"
            )));
        }
        self.cl_apertures[Self::aperture_slot(holder)] = size;
        Ok(())
    }

    fn anode_kv(&self) -> Result<[f64; 2]> {
        Ok(self.anode_kv)
    }

    fn beam_valve_open(&self) -> Result<bool> {
        Ok(self.beam_valve_open)
    }

    fn set_beam_valve(&mut self, open: bool) -> Result<()> {
        self.beam_valve_open = open;
        Ok(())
    }

    fn set_beam_blank(&mut self, blanked: bool) -> Result<()> {
        self.beam_blanked = blanked;
        Ok(())
    }

    fn stage_position(&self) -> Result<StagePosition> {
        Ok(self.stage)
    }

    fn scan_rotation(&self) -> Result<f64> {
        Ok(self.scan_rotation)
    }

    fn assign_detector_channel(&mut self, channel: usize, detector: &str) -> Result<()> {
        let slot = self.detector_channels.get_mut(channel).ok_or_else(|| {
            AppError::Instrument(format!(
                "channel {channel} out of range 0..{DETECTOR_CHANNELS}"
            ))
        })?;
        detector.clone_into(slot);
        Ok(())
    }

    fn detector_channels(&self) -> Result<Vec<String>> {
        Ok(self.detector_channels.clone())
    }

    fn set_dwell_time_us(&mut self, dwell_time: f64) -> Result<()> {
        self.dwell_time_us = dwell_time;
        Ok(())
    }

    fn set_imaging_area(&mut self, width: u32, height: u32) -> Result<()> {
        self.imaging_area = (width, height);
        Ok(())
    }

    fn imaging_area(&self) -> Result<(u32, u32)> {
        Ok(self.imaging_area)
    }

    fn camera_inserted(&self) -> Result<bool> {
        Ok(self.camera_inserted)
    }

    fn set_camera_inserted(&mut self, inserted: bool) -> Result<()> {
        self.camera_inserted = inserted;
        Ok(())
    }

    fn start_acquisition(&mut self) -> Result<()> {
        if self.acquiring {
            return Err(AppError::Instrument("acquisition already running".into()));
        }
        self.acquiring = true;
        Ok(())
    }

    fn finish_acquisition(&mut self) -> Result<()> {
        if !self.acquiring {
            return Err(AppError::Instrument("no acquisition running".into()));
        }
        self.acquiring = false;
        self.acquisitions += 1;
        Ok(())
    }

    fn screen_position(&self) -> Result<ScreenPosition> {
        Ok(self.screen)
    }

    fn set_screen_position(&mut self, position: ScreenPosition) -> Result<()> {
        self.screen = position;
        Ok(())
    }
}
