//! Scaling rules: the versioned topology -> exponent registry.
//!
//! Quarter-wave and half-wave resonators obey different scaling laws, and
//! applying one topology's constants to the other is a silent correctness
//! bug. The registry therefore has no fallback: interpolating a topology
//! with no registered rules fails with
//! [`Error::NoScalingRuleForTopology`](hspace_core::Error::NoScalingRuleForTopology).
//!
//! The rule set is data, not code: it is serializable, versioned, and
//! expected to grow as more relations are characterized.

use ahash::AHashMap;
use hspace_core::{Error, ResonatorTopology, Result};
use serde::{Deserialize, Serialize};

/// Current schema version of the rule table.
pub const SCALING_RULES_VERSION: u32 = 1;

/// Scaling constants for one resonator topology.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TopologyRules {
    /// Mode-structure factor entering the coupling formula
    /// (4 for quarter-wave, 2 for half-wave).
    pub mode_factor: f64,
    /// Exponent p in `total_length ~ (1 / frequency)^p`.
    pub frequency_length_exponent: f64,
    /// Exponent q in `coupling_length ~ kappa^q`.
    pub kappa_coupling_exponent: f64,
}

impl TopologyRules {
    /// The characterized quarter-wave constants.
    pub fn quarter_wave() -> Self {
        Self {
            mode_factor: 4.0,
            frequency_length_exponent: 1.0,
            kappa_coupling_exponent: 0.5,
        }
    }

    /// Half-wave constants. Not registered by default: the half-wave
    /// interpolation path is not yet validated against simulation, and
    /// enabling it is an explicit caller decision.
    pub fn half_wave() -> Self {
        Self {
            mode_factor: 2.0,
            frequency_length_exponent: 1.0,
            kappa_coupling_exponent: 0.5,
        }
    }
}

/// Registry of scaling rules per resonator topology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingRuleTable {
    version: u32,
    rules: AHashMap<ResonatorTopology, TopologyRules>,
}

impl Default for ScalingRuleTable {
    /// The default registry knows quarter-wave only.
    fn default() -> Self {
        Self::empty().register(ResonatorTopology::QuarterWave, TopologyRules::quarter_wave())
    }
}

impl ScalingRuleTable {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            version: SCALING_RULES_VERSION,
            rules: AHashMap::new(),
        }
    }

    /// Register (or replace) the rules for a topology.
    #[must_use]
    pub fn register(mut self, topology: ResonatorTopology, rules: TopologyRules) -> Self {
        self.rules.insert(topology, rules);
        self
    }

    pub fn contains(&self, topology: ResonatorTopology) -> bool {
        self.rules.contains_key(&topology)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Rules for a topology, or `NoScalingRuleForTopology`. There is
    /// deliberately no default-topology fallback here.
    pub fn rules_for(&self, topology: ResonatorTopology) -> Result<&TopologyRules> {
        self.rules
            .get(&topology)
            .ok_or_else(|| Error::NoScalingRuleForTopology(topology.to_string()))
    }
}
