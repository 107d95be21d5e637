//! # hspace Match
//!
//! The distance and matching engine for hspace.
//!
//! Given a [`TargetVector`] of desired physics values and a comparison
//! table from `hspace-core`, [`find_closest`] ranks every candidate row by
//! a normalized weighted distance and returns the `k` best matches with a
//! per-field breakdown of the ranking.
//!
//! ## Features
//!
//! - **Relative-error normalization**: deviations are scaled per field so
//!   GHz-sized and kHz-sized quantities compete fairly
//! - **Configurable norms**: Euclidean, Manhattan, Chebyshev
//! - **Deterministic ties**: exact floating-point ties break on table row
//!   order, reproducibly
//! - **Bulk computation**: one column pass per target field over the whole
//!   table, no per-row dispatch
//!
//! ## Example
//!
//! ```rust
//! use hspace_core::{ComparisonTable, DesignRecord, names};
//! use hspace_match::{find_closest, MatchOptions, TargetVector};
//!
//! let table = ComparisonTable::from_records(vec![
//!     DesignRecord::new().with_physics(names::CAVITY_FREQUENCY_GHZ, 4.0),
//!     DesignRecord::new().with_physics(names::CAVITY_FREQUENCY_GHZ, 5.0),
//!     DesignRecord::new().with_physics(names::CAVITY_FREQUENCY_GHZ, 6.1),
//! ]).unwrap();
//!
//! let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.05);
//! let matches = find_closest(&table, &target, 1, &MatchOptions::default()).unwrap();
//! assert_eq!(matches[0].index, 1);
//! ```

pub mod metric;
pub mod search;
pub mod target;

pub use metric::{DegeneratePolicy, MatchOptions, Norm, DEGENERATE_SCALE_EPS};
pub use search::{find_closest, find_closest_one, FieldDeviation, Match};
pub use target::{Normalization, TargetConstraint, TargetField, TargetVector};
