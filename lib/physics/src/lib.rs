//! # hspace Physics
//!
//! Circuit physics, scaling interpolation, and the query front-end for
//! hspace.
//!
//! This crate layers the domain physics on top of `hspace-core` and
//! `hspace-match`:
//!
//! - [`transmon`] - charge-basis diagonalization and the closed-form
//!   conversions between capacitances, energies, and inductances
//! - [`dedupe`] - the deduplicate/memoize/broadcast machinery that keeps
//!   the diagonalization count at the number of *distinct* inputs
//! - [`ScalingRuleTable`] - the versioned topology -> exponent registry
//! - [`ScalingInterpolator`] - synthesizes a new design from the closest
//!   match via the registered scaling laws, with provenance
//! - [`Analyzer`] - the front-end: builds and augments comparison tables,
//!   runs closest-match queries, and drives the two-stage
//!   interpolated-design workflow
//!
//! ## Example
//!
//! ```rust,no_run
//! use hspace_core::{names, QubitTopology, RecordStore, SystemSelection};
//! use hspace_physics::Analyzer;
//! use hspace_match::TargetVector;
//!
//! let store = RecordStore::new(); // populated from the bulk dataset
//! let analyzer = Analyzer::new(store, SystemSelection::Qubit {
//!     qubit: QubitTopology::TransmonCross,
//! });
//!
//! let target = TargetVector::new()
//!     .with(names::QUBIT_FREQUENCY_GHZ, 4.8)
//!     .with(names::ANHARMONICITY_MHZ, -200.0);
//! let ranked = analyzer.find_closest(&target, 3).unwrap();
//! ```

pub mod analyzer;
pub mod dedupe;
pub mod interp;
pub mod scaling;
pub mod transmon;

pub use analyzer::{Analyzer, RankedDesign, CROSS_TO_CLAW_WINDOW};
pub use dedupe::{broadcast_unique, round_to_digits, unique_sorted, MemoCache};
pub use interp::{AppliedRule, InterpolatedDesign, Provenance, ScalingInterpolator};
pub use scaling::{ScalingRuleTable, TopologyRules, SCALING_RULES_VERSION};
pub use transmon::{
    charge_basis_levels, chi, ec_from_cs, effective_ec, ej_from_lj, find_ej_ec,
    g_from_cap_matrix, lj_from_ej, update_cavity_frequency_and_kappa, TransmonModel,
    NCUT_DEFAULT, Z0_DEFAULT,
};
