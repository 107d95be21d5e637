//! Component and system selection vocabulary.
//!
//! Selections are closed enums, not string keys: an invalid component is a
//! type error at the call site, and the only place a bad identifier can
//! enter is when parsing raw table text, where it fails with
//! [`Error::UnknownComponentType`](crate::Error::UnknownComponentType).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Qubit layout topology.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QubitTopology {
    /// Grounded cross (xmon-style) transmon with a coupling claw.
    TransmonCross,
}

impl FromStr for QubitTopology {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TransmonCross" | "transmon_cross" => Ok(QubitTopology::TransmonCross),
            other => Err(Error::UnknownComponentType(other.to_string())),
        }
    }
}

impl fmt::Display for QubitTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QubitTopology::TransmonCross => write!(f, "TransmonCross"),
        }
    }
}

/// Cavity layout topology.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CavityTopology {
    /// Meandered coplanar-waveguide cavity terminated in a claw.
    RouteMeander,
}

impl FromStr for CavityTopology {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RouteMeander" | "route_meander" => Ok(CavityTopology::RouteMeander),
            other => Err(Error::UnknownComponentType(other.to_string())),
        }
    }
}

impl fmt::Display for CavityTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CavityTopology::RouteMeander => write!(f, "RouteMeander"),
        }
    }
}

/// Cavity-feedline coupler family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CouplerKind {
    /// Coupled-line tee, used with quarter-wave resonators.
    CoupledLineTee,
    /// Interdigitated capacitor tee, used with half-wave resonators.
    InterdigitalCap,
}

impl FromStr for CouplerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CLT" | "CoupledLineTee" => Ok(CouplerKind::CoupledLineTee),
            "NCap" | "CapNInterdigital" | "CapNInterdigitalTee" => Ok(CouplerKind::InterdigitalCap),
            other => Err(Error::UnknownComponentType(other.to_string())),
        }
    }
}

impl fmt::Display for CouplerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouplerKind::CoupledLineTee => write!(f, "CLT"),
            CouplerKind::InterdigitalCap => write!(f, "NCap"),
        }
    }
}

/// Transmission-line resonator boundary-condition class.
///
/// The two topologies obey different length-to-frequency and coupling
/// scalings; every scaling computation is parameterized by this value and
/// there is no default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResonatorTopology {
    QuarterWave,
    HalfWave,
}

impl ResonatorTopology {
    /// The coupler family the library pairs with this resonator topology.
    pub fn coupler(&self) -> CouplerKind {
        match self {
            ResonatorTopology::QuarterWave => CouplerKind::CoupledLineTee,
            ResonatorTopology::HalfWave => CouplerKind::InterdigitalCap,
        }
    }

    /// The categorical value used for this topology in record fields.
    pub fn as_field_str(&self) -> &'static str {
        match self {
            ResonatorTopology::QuarterWave => "quarter",
            ResonatorTopology::HalfWave => "half",
        }
    }
}

impl FromStr for ResonatorTopology {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quarter" | "quarter_wave" => Ok(ResonatorTopology::QuarterWave),
            "half" | "half_wave" => Ok(ResonatorTopology::HalfWave),
            other => Err(Error::UnknownComponentType(other.to_string())),
        }
    }
}

impl fmt::Display for ResonatorTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_field_str())
    }
}

/// Which system a comparison table is built for.
///
/// A selection names the component topologies that make up a candidate row.
/// Multi-component selections produce merged rows representing complete
/// systems.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "system", rename_all = "snake_case")]
pub enum SystemSelection {
    /// Qubit-only records.
    Qubit { qubit: QubitTopology },
    /// Cavity-with-claw records for one resonator topology.
    CavityClaw {
        cavity: CavityTopology,
        resonator: ResonatorTopology,
    },
    /// Coupler-only records.
    Coupler { coupler: CouplerKind },
    /// Merged qubit + cavity records representing a full coupled system.
    QubitCavity {
        qubit: QubitTopology,
        cavity: CavityTopology,
        resonator: ResonatorTopology,
    },
}

impl SystemSelection {
    /// Resonator topology of the selection, if one is involved.
    pub fn resonator(&self) -> Option<ResonatorTopology> {
        match self {
            SystemSelection::Qubit { .. } | SystemSelection::Coupler { .. } => None,
            SystemSelection::CavityClaw { resonator, .. }
            | SystemSelection::QubitCavity { resonator, .. } => Some(*resonator),
        }
    }

    /// Whether the selection includes a qubit component.
    pub fn has_qubit(&self) -> bool {
        matches!(
            self,
            SystemSelection::Qubit { .. } | SystemSelection::QubitCavity { .. }
        )
    }

    /// Whether the selection includes a cavity component.
    pub fn has_cavity(&self) -> bool {
        matches!(
            self,
            SystemSelection::CavityClaw { .. } | SystemSelection::QubitCavity { .. }
        )
    }
}
