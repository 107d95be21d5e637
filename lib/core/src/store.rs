//! In-memory record store and comparison-table construction.
//!
//! The store is populated once at process start from externally fetched
//! raw sub-tables (qubit capacitance-matrix tables, cavity eigenmode
//! tables, coupler capacitance tables). Building a comparison table never
//! mutates stored data; rebuilding per query is cheap.

use crate::error::{Error, Result};
use crate::field::{names, FieldValue};
use crate::record::{DesignRecord, RawRecord};
use crate::select::{CavityTopology, CouplerKind, QubitTopology, ResonatorTopology, SystemSelection};
use crate::table::ComparisonTable;
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde_json::json;
use tracing::{debug, info};

/// The geometric term shared between a qubit's claw and the cavity's claw
/// termination. Rows merge on equality of this design field.
pub const CLAW_MERGER_TERM: &str = names::CLAW_LENGTH;

/// Coupler design terms used to align interdigital-coupler capacitance
/// rows with cavity rows.
pub const INTERDIGITAL_MERGER_TERMS: [&str; 4] =
    ["prime_width", "prime_gap", "second_width", "second_gap"];

/// In-memory collection of raw per-component record tables.
#[derive(Debug, Default)]
pub struct RecordStore {
    qubit: AHashMap<QubitTopology, Vec<DesignRecord>>,
    cavity: AHashMap<CavityTopology, Vec<DesignRecord>>,
    coupler: AHashMap<CouplerKind, Vec<DesignRecord>>,
}

impl RecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a qubit capacitance-matrix sub-table.
    pub fn load_qubit_table(&mut self, topology: QubitTopology, rows: Vec<RawRecord>) {
        let records: Vec<DesignRecord> = rows.into_iter().map(DesignRecord::from_raw).collect();
        info!(topology = %topology, rows = records.len(), "loaded qubit sub-table");
        self.qubit.entry(topology).or_default().extend(records);
    }

    /// Load a cavity eigenmode sub-table.
    ///
    /// Raw eigenmode tables report `cavity_frequency` and `kappa` in Hz;
    /// they are rescaled here to the canonical GHz/kHz columns so every
    /// comparison table speaks one unit vocabulary.
    pub fn load_cavity_table(&mut self, topology: CavityTopology, rows: Vec<RawRecord>) {
        let records: Vec<DesignRecord> = rows
            .into_iter()
            .map(|raw| normalize_cavity_units(DesignRecord::from_raw(raw)))
            .collect();
        info!(topology = %topology, rows = records.len(), "loaded cavity sub-table");
        self.cavity.entry(topology).or_default().extend(records);
    }

    /// Load a coupler capacitance sub-table.
    pub fn load_coupler_table(&mut self, kind: CouplerKind, rows: Vec<RawRecord>) {
        let records: Vec<DesignRecord> = rows.into_iter().map(DesignRecord::from_raw).collect();
        info!(kind = %kind, rows = records.len(), "loaded coupler sub-table");
        self.coupler.entry(kind).or_default().extend(records);
    }

    pub fn qubit_records(&self, topology: QubitTopology) -> &[DesignRecord] {
        self.qubit.get(&topology).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cavity_records(&self, topology: CavityTopology) -> &[DesignRecord] {
        self.cavity.get(&topology).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn coupler_records(&self, kind: CouplerKind) -> &[DesignRecord] {
        self.coupler.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build the homogeneous candidate table for a system selection.
    ///
    /// Single-component selections filter the matching sub-table; the
    /// qubit+cavity selection inner-joins qubit rows with cavity rows on
    /// [`CLAW_MERGER_TERM`] so each row describes a complete system.
    ///
    /// Fails with [`Error::EmptyResultSet`] when nothing matches the
    /// selection — a silently empty table downstream would be
    /// indistinguishable from a misconfigured query.
    pub fn build_comparison_table(&self, selection: &SystemSelection) -> Result<ComparisonTable> {
        let records = match selection {
            SystemSelection::Qubit { qubit } => self.qubit_records(*qubit).to_vec(),
            SystemSelection::Coupler { coupler } => self.coupler_records(*coupler).to_vec(),
            SystemSelection::CavityClaw { cavity, resonator } => {
                self.prepared_cavity_rows(*cavity, resonator)
            }
            SystemSelection::QubitCavity {
                qubit,
                cavity,
                resonator,
            } => {
                let cavity_rows = self.prepared_cavity_rows(*cavity, resonator);
                merge_qubit_cavity(self.qubit_records(*qubit), &cavity_rows)
            }
        };

        if records.is_empty() {
            return Err(Error::EmptyResultSet);
        }
        info!(rows = records.len(), ?selection, "built comparison table");
        ComparisonTable::from_records(records)
    }

    /// Cavity rows filtered to the topology's coupler family, with the
    /// interdigital coupler's loading capacitances joined in for
    /// half-wave selections when a coupler sub-table is loaded.
    fn prepared_cavity_rows(
        &self,
        cavity: CavityTopology,
        resonator: &ResonatorTopology,
    ) -> Vec<DesignRecord> {
        let rows = filter_cavity_rows(self.cavity_records(cavity), resonator.coupler(), resonator);
        match resonator {
            ResonatorTopology::QuarterWave => rows,
            ResonatorTopology::HalfWave => merge_interdigital_caps(
                rows,
                self.coupler_records(CouplerKind::InterdigitalCap),
            ),
        }
    }
}

/// Inner-join cavity rows with interdigital-coupler capacitance rows on
/// the shared coupler geometry ([`INTERDIGITAL_MERGER_TERMS`]), copying
/// the coupler's `top_to_ground` / `top_to_bottom` capacitances into the
/// cavity rows. With no coupler sub-table loaded, rows pass unchanged.
fn merge_interdigital_caps(
    cavity_rows: Vec<DesignRecord>,
    coupler_rows: &[DesignRecord],
) -> Vec<DesignRecord> {
    if coupler_rows.is_empty() {
        return cavity_rows;
    }

    let terms_key = |record: &DesignRecord| -> Option<Vec<OrderedFloat<f64>>> {
        INTERDIGITAL_MERGER_TERMS
            .iter()
            .map(|term| record.design_number(term).map(OrderedFloat))
            .collect()
    };

    let mut by_terms: AHashMap<Vec<OrderedFloat<f64>>, &DesignRecord> = AHashMap::new();
    for coupler in coupler_rows {
        if let Some(key) = terms_key(coupler) {
            by_terms.entry(key).or_insert(coupler);
        }
    }

    let total = cavity_rows.len();
    let merged: Vec<DesignRecord> = cavity_rows
        .into_iter()
        .filter_map(|cavity| {
            let coupler = terms_key(&cavity).and_then(|key| by_terms.get(&key))?;
            let top_to_ground = coupler.physics_number(names::TOP_TO_GROUND)?;
            let top_to_bottom = coupler.physics_number(names::TOP_TO_BOTTOM)?;
            Some(
                cavity
                    .with_physics(names::TOP_TO_GROUND, top_to_ground)
                    .with_physics(names::TOP_TO_BOTTOM, top_to_bottom),
            )
        })
        .collect();
    debug!(
        cavity_rows = total,
        merged = merged.len(),
        "joined interdigital coupler capacitances into cavity rows"
    );
    merged
}

/// Rename and rescale raw Hz-denominated eigenmode outputs to the
/// canonical GHz/kHz columns.
fn normalize_cavity_units(mut record: DesignRecord) -> DesignRecord {
    if let Some(hz) = record.physics_number(names::RAW_CAVITY_FREQUENCY) {
        record = record
            .with_physics(names::CAVITY_FREQUENCY_GHZ, hz * 1e-9)
            .without_physics(names::RAW_CAVITY_FREQUENCY);
    }
    if let Some(hz) = record.physics_number(names::RAW_KAPPA) {
        record = record
            .with_physics(names::KAPPA_KHZ, hz * 1e-3)
            .without_physics(names::RAW_KAPPA);
    }
    record
}

fn filter_cavity_rows(
    rows: &[DesignRecord],
    coupler: CouplerKind,
    resonator: &ResonatorTopology,
) -> Vec<DesignRecord> {
    let coupler_name = coupler.to_string();
    let resonator_name = resonator.as_field_str();
    rows.iter()
        .filter(|r| {
            // Rows missing the categorical columns are never matched
            // rather than matched by accident.
            let coupler_ok = r.physics_text(names::COUPLER_TYPE) == Some(coupler_name.as_str());
            let resonator_ok = match r.physics_text(names::RESONATOR_TYPE) {
                Some(v) => v == resonator_name,
                None => true,
            };
            coupler_ok && resonator_ok
        })
        .cloned()
        .collect()
}

/// Inner-join qubit rows with cavity rows on the shared claw geometry.
///
/// Row order is qubit-major then cavity order within a key, which keeps
/// merged tables stable across rebuilds.
fn merge_qubit_cavity(qubit_rows: &[DesignRecord], cavity_rows: &[DesignRecord]) -> Vec<DesignRecord> {
    let mut by_claw: AHashMap<OrderedFloat<f64>, Vec<&DesignRecord>> = AHashMap::new();
    for cavity in cavity_rows {
        if let Some(claw) = cavity.design_number(CLAW_MERGER_TERM) {
            by_claw.entry(OrderedFloat(claw)).or_default().push(cavity);
        }
    }

    let mut merged = Vec::new();
    for qubit in qubit_rows {
        let Some(claw) = qubit.design_number(CLAW_MERGER_TERM) else {
            continue;
        };
        let Some(partners) = by_claw.get(&OrderedFloat(claw)) else {
            continue;
        };
        for cavity in partners {
            merged.push(merge_pair(qubit, cavity));
        }
    }
    debug!(
        qubit_rows = qubit_rows.len(),
        cavity_rows = cavity_rows.len(),
        merged = merged.len(),
        "joined qubit and cavity sub-tables on claw geometry"
    );
    merged
}

fn merge_pair(qubit: &DesignRecord, cavity: &DesignRecord) -> DesignRecord {
    let mut merged = DesignRecord::new().with_design_options(json!({
        "qubit_options": qubit.design_options.clone(),
        "cavity_claw_options": cavity.design_options.clone(),
    }));
    merged.design_tool = qubit
        .design_tool
        .clone()
        .or_else(|| cavity.design_tool.clone());

    for (name, value) in qubit.design() {
        merged = merged.with_design(name, value.clone());
    }
    for (name, value) in cavity.design() {
        merged = merge_field(merged, name, value, FieldRole::Design);
    }
    for (name, value) in qubit.physics() {
        merged = merged.with_physics(name, value.clone());
    }
    for (name, value) in cavity.physics() {
        merged = merge_field(merged, name, value, FieldRole::Physics);
    }
    merged
}

enum FieldRole {
    Design,
    Physics,
}

/// Insert a cavity-side field into the merged record, suffixing the name
/// when it collides with a differing qubit-side value (the join key and
/// genuinely shared values keep a single unsuffixed column).
fn merge_field(
    record: DesignRecord,
    name: &str,
    value: &FieldValue,
    role: FieldRole,
) -> DesignRecord {
    let collides = match role {
        FieldRole::Design => record.design_field(name),
        FieldRole::Physics => record.physics_field(name),
    }
    .map(|current| current != value);

    match collides {
        Some(false) => record,
        Some(true) => {
            let suffixed = format!("{}_cavity_claw", name);
            match role {
                FieldRole::Design => record.with_design(&suffixed, value.clone()),
                FieldRole::Physics => record.with_physics(&suffixed, value.clone()),
            }
        }
        None => match role {
            FieldRole::Design => record.with_design(name, value.clone()),
            FieldRole::Physics => record.with_physics(name, value.clone()),
        },
    }
}
