//! The query front-end: selection, Hamiltonian augmentation, matching,
//! and the two-stage interpolated-design workflow.

use crate::interp::{InterpolatedDesign, ScalingInterpolator};
use crate::scaling::ScalingRuleTable;
use crate::transmon::{
    effective_ec, find_ej_ec, g_from_cap_matrix, update_cavity_frequency_and_kappa, TransmonModel,
};
use hspace_core::{
    names, ComparisonTable, DesignRecord, Error, RecordStore, Result, SystemSelection,
};
use hspace_match::{FieldDeviation, MatchOptions, TargetVector};
use tracing::{debug, info};

/// Relative half-width of the cross-to-claw capacitance window used to
/// pre-filter cavity candidates in the two-stage workflow: the cavity
/// stage only considers rows whose qubit-claw coupling capacitance is
/// within 30% of the chosen qubit's.
pub const CROSS_TO_CLAW_WINDOW: f64 = 0.3;

/// An owned ranked result from [`Analyzer::find_closest`].
#[derive(Debug, Clone)]
pub struct RankedDesign {
    pub record: DesignRecord,
    pub distance: f64,
    pub deviations: Vec<FieldDeviation>,
}

/// Front-end tying the record store, the transmon model, and the scaling
/// rules together for a fixed system selection.
///
/// All methods take `&self`; the only interior mutability is the model's
/// memo cache, so a shared `Analyzer` can serve concurrent queries.
#[derive(Debug)]
pub struct Analyzer {
    store: RecordStore,
    selection: SystemSelection,
    model: TransmonModel,
    interpolator: ScalingInterpolator,
    match_options: MatchOptions,
}

impl Analyzer {
    #[must_use]
    pub fn new(store: RecordStore, selection: SystemSelection) -> Self {
        Self {
            store,
            selection,
            model: TransmonModel::new(),
            interpolator: ScalingInterpolator::default(),
            match_options: MatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: ScalingRuleTable) -> Self {
        self.interpolator = ScalingInterpolator::new(rules);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: TransmonModel) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub fn with_match_options(mut self, options: MatchOptions) -> Self {
        self.match_options = options;
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn selection(&self) -> &SystemSelection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: SystemSelection) {
        self.selection = selection;
    }

    pub fn model(&self) -> &TransmonModel {
        &self.model
    }

    pub fn interpolator(&self) -> &ScalingInterpolator {
        &self.interpolator
    }

    /// Build the comparison table for the current selection, augmented
    /// with the derived Hamiltonian columns the target asks about.
    ///
    /// For qubit-bearing selections this adds `EC`, `EJ`,
    /// `qubit_frequency_GHz` and `anharmonicity_MHz` (and `g_MHz` for
    /// coupled systems), which requires the target to name the qubit
    /// frequency and anharmonicity (they pin down the shared `EJ`).
    pub fn comparison_table(&self, target: &TargetVector) -> Result<ComparisonTable> {
        let table = self.store.build_comparison_table(&self.selection)?;
        let table = self.apply_interdigital_correction(table)?;
        if self.selection.has_qubit() {
            self.augment_hamiltonian(table, target)
        } else {
            Ok(table)
        }
    }

    /// Rank the library against the target and return the `k` closest
    /// designs.
    pub fn find_closest(&self, target: &TargetVector, k: usize) -> Result<Vec<RankedDesign>> {
        let table = self.comparison_table(target)?;
        let matches = hspace_match::find_closest(&table, target, k, &self.match_options)?;
        info!(
            k,
            best_distance = matches[0].distance,
            "closest-design query complete"
        );
        Ok(matches
            .into_iter()
            .map(|m| RankedDesign {
                record: m.record.clone(),
                distance: m.distance,
                deviations: m.deviations,
            })
            .collect())
    }

    /// Two-stage interpolated-design workflow for coupled systems.
    ///
    /// 1. Match the qubit-side targets (frequency, anharmonicity, g) and
    ///    scale the winning qubit geometry.
    /// 2. Restrict cavity candidates to rows whose cross-to-claw coupling
    ///    capacitance is within [`CROSS_TO_CLAW_WINDOW`] of the chosen
    ///    qubit's, match the cavity-side targets (frequency, kappa), and
    ///    scale the winning cavity geometry.
    ///
    /// The result combines both stages into one design with full
    /// provenance.
    pub fn interpolated_design(&self, target: &TargetVector) -> Result<InterpolatedDesign> {
        if !matches!(self.selection, SystemSelection::QubitCavity { .. }) {
            return Err(Error::UnsupportedSelection(
                "interpolated_design requires a qubit+cavity selection".to_string(),
            ));
        }
        let table = self.comparison_table(target)?;

        // Stage 1: qubit-side match and scaling.
        let qubit_target = target.subset(&[
            names::QUBIT_FREQUENCY_GHZ,
            names::ANHARMONICITY_MHZ,
            names::G_MHZ,
        ]);
        let best_qubit = hspace_match::find_closest(&table, &qubit_target, 1, &self.match_options)?
            .remove(0);
        let mut design = self
            .interpolator
            .interpolate(best_qubit.record, &qubit_target)?;

        // Stage 2: cavity candidates near the chosen coupling capacitance.
        let chosen_c2c = best_qubit
            .record
            .physics_number(names::CROSS_TO_CLAW)
            .ok_or_else(|| Error::SchemaMismatch {
                field: names::CROSS_TO_CLAW.to_string(),
                what: "coupled table is missing the cross-to-claw capacitance",
            })?
            .abs();
        let cavity_table = table.filter(|_, record| {
            record
                .physics_number(names::CROSS_TO_CLAW)
                .map(|c2c| {
                    let magnitude = c2c.abs();
                    magnitude >= (1.0 - CROSS_TO_CLAW_WINDOW) * chosen_c2c
                        && magnitude <= (1.0 + CROSS_TO_CLAW_WINDOW) * chosen_c2c
                })
                .unwrap_or(false)
        })?;
        debug!(
            candidates = cavity_table.len(),
            chosen_c2c, "restricted cavity stage to compatible couplings"
        );

        let cavity_target = target.subset(&[names::CAVITY_FREQUENCY_GHZ, names::KAPPA_KHZ]);
        let best_cavity =
            hspace_match::find_closest(&cavity_table, &cavity_target, 1, &self.match_options)?
                .remove(0);
        let cavity_design = self
            .interpolator
            .interpolate(best_cavity.record, &cavity_target)?;

        design.absorb_cavity_stage(cavity_design);
        info!(
            sources = ?design.provenance.source_records,
            applied = design.provenance.applied.len(),
            "interpolated design assembled"
        );
        Ok(design)
    }

    /// Recompute cavity frequency and kappa from the interdigital
    /// coupler's loading capacitances for half-wave tables that carry
    /// them. Quarter-wave tables pass through untouched.
    fn apply_interdigital_correction(&self, table: ComparisonTable) -> Result<ComparisonTable> {
        let half_wave = matches!(
            self.selection.resonator(),
            Some(hspace_core::ResonatorTopology::HalfWave)
        );
        if !half_wave
            || !table.has_field(names::TOP_TO_GROUND)
            || !table.has_field(names::TOP_TO_BOTTOM)
        {
            return Ok(table);
        }

        let frequencies = table.number_column(names::CAVITY_FREQUENCY_GHZ)?.to_vec();
        let top_to_ground = table.number_column(names::TOP_TO_GROUND)?.to_vec();
        let top_to_bottom = table.number_column(names::TOP_TO_BOTTOM)?.to_vec();

        let records: Vec<DesignRecord> = table
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let (f_hz, kappa_hz) = update_cavity_frequency_and_kappa(
                    frequencies[i] * 1e9,
                    top_to_ground[i],
                    top_to_bottom[i],
                    self.model.z0(),
                );
                record
                    .clone()
                    .with_physics(names::CAVITY_FREQUENCY_GHZ, f_hz * 1e-9)
                    .with_physics(names::KAPPA_KHZ, kappa_hz * 1e-3)
            })
            .collect();
        debug!(rows = records.len(), "applied interdigital loading correction");
        ComparisonTable::from_records(records)
    }

    /// Add the derived qubit Hamiltonian columns to every row.
    ///
    /// The target's qubit frequency and anharmonicity fix one `EJ` for
    /// the whole table; each row's `EC` follows from its simulated
    /// capacitances, and the charge-basis diagonalization runs once per
    /// distinct rounded `EC` through the model's memo cache.
    fn augment_hamiltonian(
        &self,
        table: ComparisonTable,
        target: &TargetVector,
    ) -> Result<ComparisonTable> {
        let f_q = target
            .value(names::QUBIT_FREQUENCY_GHZ)
            .ok_or_else(|| Error::TargetFieldNotFound(names::QUBIT_FREQUENCY_GHZ.to_string()))?;
        let alpha_mhz = target
            .value(names::ANHARMONICITY_MHZ)
            .ok_or_else(|| Error::TargetFieldNotFound(names::ANHARMONICITY_MHZ.to_string()))?;
        let (ej_target, _) = find_ej_ec(f_q, alpha_mhz * 1e-3)?;

        let cross_to_claw = table.number_column(names::CROSS_TO_CLAW)?.to_vec();
        let cross_to_ground = table.number_column(names::CROSS_TO_GROUND)?.to_vec();
        let ecs: Vec<f64> = cross_to_claw
            .iter()
            .zip(&cross_to_ground)
            .map(|(&claw, &ground)| effective_ec(claw, ground))
            .collect();
        let spectra = self.model.e01_and_anharmonicity_bulk(ej_target, &ecs);

        let coupled = self.selection.has_cavity();
        let (cavity_frequencies, mode_factor) = if coupled {
            let resonator = self
                .selection
                .resonator()
                .expect("coupled selection has a resonator topology");
            let rules = self.interpolator.rules().rules_for(resonator)?;
            (
                Some(table.number_column(names::CAVITY_FREQUENCY_GHZ)?.to_vec()),
                rules.mode_factor,
            )
        } else {
            (None, 0.0)
        };

        let records: Vec<DesignRecord> = table
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let (f01, alpha) = spectra[i];
                let mut record = record
                    .clone()
                    .with_physics(names::EC_GHZ, ecs[i])
                    .with_physics(names::EJ_GHZ, ej_target)
                    .with_physics(names::QUBIT_FREQUENCY_GHZ, f01)
                    .with_physics(names::ANHARMONICITY_MHZ, alpha);
                if let Some(frequencies) = &cavity_frequencies {
                    let g = g_from_cap_matrix(
                        cross_to_ground[i],
                        cross_to_claw[i],
                        ej_target,
                        frequencies[i],
                        mode_factor,
                        self.model.z0(),
                    );
                    record = record.with_physics(names::G_MHZ, g);
                }
                record
            })
            .collect();

        let (hits, misses, resident) = self.model.cache_stats();
        debug!(
            rows = records.len(),
            cache_hits = hits,
            cache_misses = misses,
            cache_resident = resident,
            "augmented table with Hamiltonian columns"
        );
        ComparisonTable::from_records(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hspace_core::{
        CavityTopology, FieldValue, QubitTopology, RawRecord, ResonatorTopology,
    };
    use serde_json::json;

    fn qubit_raw(claw_length: f64, cross_length: f64, c2c: f64, c2g: f64) -> RawRecord {
        let mut raw = RawRecord::default();
        raw.design
            .insert(names::CLAW_LENGTH.into(), FieldValue::Number(claw_length));
        raw.design
            .insert(names::CROSS_LENGTH.into(), FieldValue::Number(cross_length));
        raw.sim_results
            .insert(names::CROSS_TO_CLAW.into(), FieldValue::Number(c2c));
        raw.sim_results
            .insert(names::CROSS_TO_GROUND.into(), FieldValue::Number(c2g));
        raw.design_options = json!({
            "cross_length": format!("{}um", cross_length),
            "connection_pads": {"readout": {"claw_length": format!("{}um", claw_length), "Lj": "11nH"}},
        });
        raw
    }

    fn cavity_raw(claw_length: f64, f_hz: f64, kappa_hz: f64, total_length: f64) -> RawRecord {
        let mut raw = RawRecord::default();
        raw.design
            .insert(names::CLAW_LENGTH.into(), FieldValue::Number(claw_length));
        raw.design
            .insert(names::TOTAL_LENGTH.into(), FieldValue::Number(total_length));
        raw.design
            .insert(names::COUPLING_LENGTH.into(), FieldValue::Number(220.0));
        raw.sim_results
            .insert(names::RAW_CAVITY_FREQUENCY.into(), FieldValue::Number(f_hz));
        raw.sim_results
            .insert(names::RAW_KAPPA.into(), FieldValue::Number(kappa_hz));
        raw.sim_results
            .insert(names::COUPLER_TYPE.into(), FieldValue::Text("CLT".into()));
        raw.sim_results
            .insert(names::RESONATOR_TYPE.into(), FieldValue::Text("quarter".into()));
        raw.design_options = json!({
            "cpw_opts": {"total_length": format!("{}um", total_length)},
            "cplr_opts": {"coupling_length": "220um"},
            "claw_opts": {"connection_pads": {}},
        });
        raw
    }

    fn coupled_analyzer() -> Analyzer {
        let mut store = RecordStore::new();
        store.load_qubit_table(
            QubitTopology::TransmonCross,
            vec![
                qubit_raw(210.0, 310.0, -4.3, -95.0),
                qubit_raw(210.0, 340.0, -4.9, -105.0),
                qubit_raw(250.0, 370.0, -5.6, -115.0),
            ],
        );
        store.load_cavity_table(
            CavityTopology::RouteMeander,
            vec![
                cavity_raw(210.0, 6.1e9, 120e3, 3900.0),
                cavity_raw(210.0, 5.4e9, 90e3, 4400.0),
                cavity_raw(250.0, 4.8e9, 80e3, 4900.0),
            ],
        );
        Analyzer::new(
            store,
            SystemSelection::QubitCavity {
                qubit: QubitTopology::TransmonCross,
                cavity: CavityTopology::RouteMeander,
                resonator: ResonatorTopology::QuarterWave,
            },
        )
    }

    fn coupled_target() -> TargetVector {
        TargetVector::new()
            .with(names::QUBIT_FREQUENCY_GHZ, 4.8)
            .with(names::ANHARMONICITY_MHZ, -200.0)
            .with(names::G_MHZ, 70.0)
            .with(names::CAVITY_FREQUENCY_GHZ, 5.5)
            .with(names::KAPPA_KHZ, 100.0)
            .with_constraint(names::RESONATOR_TYPE, "quarter")
    }

    #[test]
    fn test_augmented_table_has_hamiltonian_columns() {
        let analyzer = coupled_analyzer();
        let table = analyzer.comparison_table(&coupled_target()).unwrap();
        // 2 qubit rows x 2 cavity rows on claw 210 + 1 x 1 on claw 250.
        assert_eq!(table.len(), 5);
        for field in [
            names::EC_GHZ,
            names::EJ_GHZ,
            names::QUBIT_FREQUENCY_GHZ,
            names::ANHARMONICITY_MHZ,
            names::G_MHZ,
        ] {
            assert!(table.has_field(field), "missing {}", field);
        }
        for &alpha in table.number_column(names::ANHARMONICITY_MHZ).unwrap() {
            assert!(alpha < 0.0);
        }
        for &g in table.number_column(names::G_MHZ).unwrap() {
            assert!(g > 0.0 && g.is_finite());
        }
    }

    #[test]
    fn test_find_closest_returns_ranked_designs() {
        let analyzer = coupled_analyzer();
        let ranked = analyzer.find_closest(&coupled_target(), 3).unwrap();
        assert_eq!(ranked.len(), 3);
        assert!(ranked[0].distance <= ranked[1].distance);
        assert!(ranked[1].distance <= ranked[2].distance);
        assert!(!ranked[0].deviations.is_empty());
    }

    #[test]
    fn test_interpolated_design_combines_both_stages() {
        let analyzer = coupled_analyzer();
        let design = analyzer.interpolated_design(&coupled_target()).unwrap();

        for field in [
            names::CROSS_LENGTH,
            names::CLAW_LENGTH,
            names::TOTAL_LENGTH,
            names::COUPLING_LENGTH,
        ] {
            let scaled = design
                .provenance
                .applied
                .iter()
                .any(|r| r.design_field == field);
            assert!(scaled, "expected a scaling rule for {}", field);
        }
        assert!(design.design_options.get("qubit_options").is_some());
        assert!(design.design_options.get("cavity_claw_options").is_some());
        // Two source records: one per stage (they may coincide).
        assert!(!design.provenance.source_records.is_empty());
        assert_eq!(
            design.design_options["qubit_options"]["connection_pads"]["readout"]
                ["claw_cpw_length"],
            "0um"
        );
    }

    #[test]
    fn test_interpolated_design_requires_coupled_selection() {
        let analyzer = coupled_analyzer();
        let mut single = analyzer;
        single.set_selection(SystemSelection::Qubit {
            qubit: QubitTopology::TransmonCross,
        });
        let err = single.interpolated_design(&coupled_target()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSelection(_)));
    }

    #[test]
    fn test_qubit_selection_requires_qubit_targets() {
        let analyzer = coupled_analyzer();
        let mut qubit_only = analyzer;
        qubit_only.set_selection(SystemSelection::Qubit {
            qubit: QubitTopology::TransmonCross,
        });
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.0);
        let err = qubit_only.comparison_table(&target).unwrap_err();
        assert_eq!(
            err,
            Error::TargetFieldNotFound(names::QUBIT_FREQUENCY_GHZ.to_string())
        );
    }

    #[test]
    fn test_half_wave_cavity_table_gets_loading_correction() {
        use hspace_core::CouplerKind;

        let mut store = RecordStore::new();
        let mut cavity = RawRecord::default();
        cavity
            .design
            .insert("prime_width".into(), FieldValue::Number(12.0));
        cavity
            .design
            .insert("prime_gap".into(), FieldValue::Number(6.0));
        cavity
            .design
            .insert("second_width".into(), FieldValue::Number(10.0));
        cavity
            .design
            .insert("second_gap".into(), FieldValue::Number(6.0));
        cavity
            .sim_results
            .insert("cavity_frequency".into(), FieldValue::Number(6.0e9));
        cavity
            .sim_results
            .insert("kappa".into(), FieldValue::Number(100e3));
        cavity
            .sim_results
            .insert(names::COUPLER_TYPE.into(), FieldValue::Text("NCap".into()));
        cavity
            .sim_results
            .insert(names::RESONATOR_TYPE.into(), FieldValue::Text("half".into()));
        store.load_cavity_table(CavityTopology::RouteMeander, vec![cavity]);

        let mut coupler = RawRecord::default();
        coupler
            .design
            .insert("prime_width".into(), FieldValue::Number(12.0));
        coupler
            .design
            .insert("prime_gap".into(), FieldValue::Number(6.0));
        coupler
            .design
            .insert("second_width".into(), FieldValue::Number(10.0));
        coupler
            .design
            .insert("second_gap".into(), FieldValue::Number(6.0));
        coupler
            .sim_results
            .insert(names::TOP_TO_GROUND.into(), FieldValue::Number(60.0));
        coupler
            .sim_results
            .insert(names::TOP_TO_BOTTOM.into(), FieldValue::Number(30.0));
        store.load_coupler_table(CouplerKind::InterdigitalCap, vec![coupler]);

        let analyzer = Analyzer::new(
            store,
            SystemSelection::CavityClaw {
                cavity: CavityTopology::RouteMeander,
                resonator: ResonatorTopology::HalfWave,
            },
        );
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.0);
        let table = analyzer.comparison_table(&target).unwrap();
        assert_eq!(table.len(), 1);
        // The loading capacitances pull the bare 6 GHz eigenmode down.
        let corrected = table.number_column(names::CAVITY_FREQUENCY_GHZ).unwrap()[0];
        assert!(corrected < 6.0, "corrected = {}", corrected);
        assert!(corrected > 3.0);
    }

    #[test]
    fn test_dedup_cache_is_reused_across_queries() {
        let analyzer = coupled_analyzer();
        let target = coupled_target();
        analyzer.find_closest(&target, 1).unwrap();
        let (_, misses_first, _) = analyzer.model().cache_stats();
        analyzer.find_closest(&target, 1).unwrap();
        let (hits, misses_second, _) = analyzer.model().cache_stats();
        assert_eq!(misses_first, misses_second, "second query must not diagonalize");
        assert!(hits > 0);
    }
}
