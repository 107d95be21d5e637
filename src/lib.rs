//! # hspace
//!
//! A design-parameter database and nearest-neighbor/scaling-interpolation
//! engine for superconducting device geometries.
//!
//! hspace maps target Hamiltonian parameters (qubit frequency,
//! anharmonicity, coupling strength, cavity frequency, kappa) onto a
//! library of pre-simulated designs: it ranks every candidate by a
//! normalized weighted distance and refines the winner into a new design
//! via analytic scaling laws.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hspace::prelude::*;
//!
//! // Populate the store from the externally fetched bulk dataset.
//! let mut store = RecordStore::new();
//! // store.load_qubit_table(QubitTopology::TransmonCross, qubit_rows);
//! // store.load_cavity_table(CavityTopology::RouteMeander, cavity_rows);
//!
//! let analyzer = Analyzer::new(store, SystemSelection::QubitCavity {
//!     qubit: QubitTopology::TransmonCross,
//!     cavity: CavityTopology::RouteMeander,
//!     resonator: ResonatorTopology::QuarterWave,
//! });
//!
//! let target = TargetVector::new()
//!     .with(names::QUBIT_FREQUENCY_GHZ, 4.8)
//!     .with(names::ANHARMONICITY_MHZ, -200.0)
//!     .with(names::G_MHZ, 70.0)
//!     .with(names::CAVITY_FREQUENCY_GHZ, 5.5)
//!     .with(names::KAPPA_KHZ, 100.0)
//!     .with_constraint(names::RESONATOR_TYPE, "quarter");
//!
//! // Ranked closest designs...
//! let ranked = analyzer.find_closest(&target, 3).unwrap();
//! // ...or a synthesized design scaled toward the target.
//! let design = analyzer.interpolated_design(&target).unwrap();
//! ```
//!
//! ## Crate Structure
//!
//! hspace is composed of several crates:
//!
//! - [`hspace-core`](https://docs.rs/hspace-core) - records, comparison
//!   tables, the record store, and the error taxonomy
//! - [`hspace-match`](https://docs.rs/hspace-match) - target vectors and
//!   the vectorized distance/matching engine
//! - [`hspace-physics`](https://docs.rs/hspace-physics) - transmon
//!   physics, scaling rules, the interpolator, and the query front-end
//!
//! ## Design notes
//!
//! - Queries are pure functions of their inputs: tables are read-only
//!   after construction, and the only shared state is the bounded
//!   diagonalization cache inside [`TransmonModel`].
//! - Distance computation is a bulk column pass, not a per-row loop or a
//!   thread fan-out; at library scale (1e4-1e6 rows) the coordination
//!   overhead of per-row parallelism costs more than the arithmetic.
//! - Ties and field accumulation order are deterministic, so repeated
//!   queries reproduce their results bit-for-bit.

pub use hspace_core::{
    names, CavityTopology, Column, ComparisonTable, CouplerKind, DesignRecord, Error, FieldValue,
    QubitTopology, RawRecord, RecordStore, ResonatorTopology, Result, SystemSelection,
};
pub use hspace_match::{
    find_closest, find_closest_one, DegeneratePolicy, FieldDeviation, Match, MatchOptions, Norm,
    Normalization, TargetConstraint, TargetField, TargetVector,
};
pub use hspace_physics::{
    Analyzer, AppliedRule, InterpolatedDesign, Provenance, RankedDesign, ScalingInterpolator,
    ScalingRuleTable, TopologyRules, TransmonModel,
};

/// Everything a typical query needs, in one import.
pub mod prelude {
    pub use hspace_core::{
        names, CavityTopology, ComparisonTable, DesignRecord, QubitTopology, RawRecord,
        RecordStore, ResonatorTopology, SystemSelection,
    };
    pub use hspace_match::{MatchOptions, Norm, TargetVector};
    pub use hspace_physics::{
        Analyzer, InterpolatedDesign, ScalingInterpolator, ScalingRuleTable, TransmonModel,
    };
}
