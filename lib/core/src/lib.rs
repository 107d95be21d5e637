//! # hspace Core
//!
//! Core library for the hspace design-parameter database.
//!
//! This crate provides the fundamental data structures:
//!
//! - [`DesignRecord`] - one simulated device geometry with its physics outputs
//! - [`ComparisonTable`] - a homogeneous, row-stable candidate set with
//!   column-major physics caches
//! - [`RecordStore`] - the bulk-loaded per-component sub-tables and the
//!   comparison-table construction contract
//! - [`SystemSelection`] - the closed component/topology vocabulary
//!
//! ## Example
//!
//! ```rust
//! use hspace_core::{DesignRecord, ComparisonTable, names};
//!
//! let records = vec![
//!     DesignRecord::new()
//!         .with_design(names::TOTAL_LENGTH, 3900.0)
//!         .with_physics(names::CAVITY_FREQUENCY_GHZ, 6.1),
//!     DesignRecord::new()
//!         .with_design(names::TOTAL_LENGTH, 4400.0)
//!         .with_physics(names::CAVITY_FREQUENCY_GHZ, 5.4),
//! ];
//! let table = ComparisonTable::from_records(records).unwrap();
//! assert_eq!(table.len(), 2);
//! ```

pub mod error;
pub mod field;
pub mod record;
pub mod select;
pub mod store;
pub mod table;

pub use error::{Error, Result};
pub use field::{names, FieldValue};
pub use record::{DesignRecord, RawRecord};
pub use select::{
    CavityTopology, CouplerKind, QubitTopology, ResonatorTopology, SystemSelection,
};
pub use store::{RecordStore, CLAW_MERGER_TERM, INTERDIGITAL_MERGER_TERMS};
pub use table::{Column, ComparisonTable};
