//! Lens and deflector identifiers of the column.
//!
//! Names match the keys of the acquisition records, so a readback line can
//! be replayed into a restore command unchanged.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::{AppError, Result};

/// Column lenses with a readable and settable DAC value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Lens {
    /// Condenser lens 1.
    Cl1,
    /// Condenser lens 2.
    Cl2,
    /// Condenser lens 3.
    Cl3,
    /// Condenser mini lens.
    Cm,
    /// Intermediate lens 1.
    Il1,
    /// Intermediate lens 2.
    Il2,
    /// Intermediate lens 3.
    Il3,
    /// Objective super-fine.
    OlSuperFine,
    /// Objective coarse.
    OlCoarse,
    /// Objective fine.
    OlFine,
    /// Objective mini lens.
    Om,
    /// Projector lens 1.
    Pl1,
}

impl Lens {
    /// Every lens, in readback order.
    pub const ALL: [Self; 12] = [
        Self::Cl1,
        Self::Cl2,
        Self::Cl3,
        Self::Cm,
        Self::Il1,
        Self::Il2,
        Self::Il3,
        Self::OlSuperFine,
        Self::OlCoarse,
        Self::OlFine,
        Self::Om,
        Self::Pl1,
    ];

    /// Record key of this lens.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cl1 => "CL1",
            Self::Cl2 => "CL2",
            Self::Cl3 => "CL3",
            Self::Cm => "CM",
            Self::Il1 => "IL1",
            Self::Il2 => "IL2",
            Self::Il3 => "IL3",
            Self::OlSuperFine => "OLSF",
            Self::OlCoarse => "OLC",
            Self::OlFine => "OLF",
            Self::Om => "OM",
            Self::Pl1 => "PL1",
        }
    }

    /// Position in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Display for Lens {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Lens {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|lens| lens.name() == s)
            .ok_or_else(|| AppError::Handler(format!("unknown lens '{s}'")))
    }
}

/// Column deflectors, each an X/Y DAC pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Deflector {
    /// Condenser alignment 1.
    Cla1,
    /// Condenser alignment 2.
    Cla2,
    /// Condenser stigmator.
    ClStigmator,
    /// Correction.
    Correction,
    /// Gun alignment 1.
    GunA1,
    /// Gun alignment 2.
    GunA2,
    /// Intermediate stigmator.
    IlStigmator,
    /// Image shift 1.
    Is1,
    /// Image shift 2.
    Is2,
    /// Magnification adjustment.
    MagAdjust,
    /// Objective stigmator.
    OlStigmator,
    /// Offset.
    Offset,
    /// Projector alignment.
    Pla,
    /// Rotation.
    Rotation,
    /// Scan coil 1.
    Scan1,
    /// Scan coil 2.
    Scan2,
    /// Shift balance.
    ShiftBalance,
    /// Spot alignment.
    SpotA,
    /// STEM image shift.
    StemIs,
    /// Tilt balance.
    TiltBalance,
    /// Angle balance.
    AngleBalance,
}

impl Deflector {
    /// Every deflector, in readback order.
    pub const ALL: [Self; 21] = [
        Self::Cla1,
        Self::Cla2,
        Self::ClStigmator,
        Self::Correction,
        Self::GunA1,
        Self::GunA2,
        Self::IlStigmator,
        Self::Is1,
        Self::Is2,
        Self::MagAdjust,
        Self::OlStigmator,
        Self::Offset,
        Self::Pla,
        Self::Rotation,
        Self::Scan1,
        Self::Scan2,
        Self::ShiftBalance,
        Self::SpotA,
        Self::StemIs,
        Self::TiltBalance,
        Self::AngleBalance,
    ];

    /// Record key of this deflector.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cla1 => "CLA1",
            Self::Cla2 => "CLA2",
            Self::ClStigmator => "CLS",
            Self::Correction => "Correction",
            Self::GunA1 => "GUNA1",
            Self::GunA2 => "GUNA2",
            Self::IlStigmator => "ILS",
            Self::Is1 => "IS1",
            Self::Is2 => "IS2",
            Self::MagAdjust => "MAGADJUST",
            Self::OlStigmator => "OLS",
            Self::Offset => "OFFSET",
            Self::Pla => "PLA",
            Self::Rotation => "ROTATION",
            Self::Scan1 => "SCAN1",
            Self::Scan2 => "SCAN2",
            Self::ShiftBalance => "SHIFBAL",
            Self::SpotA => "SPOTA",
            Self::StemIs => "STEMIS",
            Self::TiltBalance => "TILTBAL",
            Self::AngleBalance => "ANGBAL",
        }
    }

    /// Position in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Display for Deflector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Deflector {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|deflector| deflector.name() == s)
            .ok_or_else(|| AppError::Handler(format!("unknown deflector '{s}'")))
    }
}

/// X/Y DAC pair of one deflector, written `x:y`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DeflectorValue {
    /// X DAC.
    pub x: u16,
    /// Y DAC.
    pub y: u16,
}

impl DeflectorValue {
    /// Both axes at mid-range, where a freshly aligned column starts.
    pub const CENTRED: Self = Self {
        x: 0x8000,
        y: 0x8000,
    };
}

impl Display for DeflectorValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

impl FromStr for DeflectorValue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        let invalid = || "expected x:y with both axes in 0..=65535".to_owned();
        let (x, y) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            x: x.parse().map_err(|_| invalid())?,
            y: y.parse().map_err(|_| invalid())?,
        })
    }
}
