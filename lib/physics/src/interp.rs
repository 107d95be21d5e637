//! Scaling interpolation: refine the closest stored design toward the
//! target by closed-form scaling relations.

use crate::scaling::ScalingRuleTable;
use crate::transmon::{find_ej_ec, lj_from_ej};
use ahash::AHashMap;
use hspace_core::{names, DesignRecord, Error, FieldValue, ResonatorTopology, Result};
use hspace_match::TargetVector;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// One scaling relation applied to a design field.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppliedRule {
    /// Physics field that drove the scaling.
    pub physics_field: String,
    /// Design field that was rescaled.
    pub design_field: String,
    /// Multiplicative factor applied to the design field.
    pub factor: f64,
    pub from: f64,
    pub to: f64,
}

/// Where an interpolated design came from and what was done to it.
#[derive(Debug, Clone, Serialize)]
pub struct Provenance {
    /// Ids of the record(s) the design was scaled from.
    pub source_records: Vec<Uuid>,
    pub topology: ResonatorTopology,
    pub rule_version: u32,
    pub applied: Vec<AppliedRule>,
    /// Design fields copied unchanged because no scaling relation is
    /// registered for them (quality factor among them: its inverse
    /// relation is not cleanly invertible and is deliberately left
    /// untouched rather than misapplied).
    pub passed_through: Vec<String>,
}

/// A synthesized design: not a stored record, but the closest record's
/// geometry adjusted toward the target under the analytic model.
///
/// Ephemeral by construction; it is never inserted back into the store.
#[derive(Debug, Clone, Serialize)]
pub struct InterpolatedDesign {
    design: AHashMap<String, FieldValue>,
    /// Layout-tool options with the scaled values written back in, ready
    /// for the external layout/simulation collaborator.
    pub design_options: Value,
    pub provenance: Provenance,
}

impl InterpolatedDesign {
    pub fn design(&self) -> &AHashMap<String, FieldValue> {
        &self.design
    }

    pub fn design_number(&self, name: &str) -> Option<f64> {
        self.design.get(name).and_then(FieldValue::as_number)
    }

    /// Fold the cavity-stage result of a two-stage query into this
    /// (qubit-stage) design.
    ///
    /// The cavity stage owns the cavity option subtree and the design
    /// fields its rules touched; everything else stays from the qubit
    /// stage. A wholesale option merge would resurrect the cavity
    /// record's unscaled qubit options, so only the cavity subtree moves.
    pub(crate) fn absorb_cavity_stage(&mut self, other: InterpolatedDesign) {
        for rule in &other.provenance.applied {
            self.design
                .insert(rule.design_field.clone(), FieldValue::Number(rule.to));
        }
        if let (Some(base), Some(subtree)) = (
            self.design_options.as_object_mut(),
            other.design_options.get(CAVITY_OPTIONS_KEY),
        ) {
            base.insert(CAVITY_OPTIONS_KEY.to_string(), subtree.clone());
        }
        align_claw_options(&mut self.design_options);

        self.provenance
            .source_records
            .extend(other.provenance.source_records);
        self.provenance.source_records.dedup();
        let absorbed: Vec<String> = other
            .provenance
            .applied
            .iter()
            .map(|r| r.design_field.clone())
            .collect();
        self.provenance.applied.extend(other.provenance.applied);
        self.provenance
            .passed_through
            .retain(|name| !absorbed.contains(name));
    }
}

const QUBIT_OPTIONS_KEY: &str = "qubit_options";
const CAVITY_OPTIONS_KEY: &str = "cavity_claw_options";

/// The cavity's claw must be the qubit's claw: copy the (scaled) qubit
/// connection pads over the cavity claw options, and zero the claw CPW
/// stub the way the layout collaborator expects.
fn align_claw_options(options: &mut Value) {
    let pads = options
        .get(QUBIT_OPTIONS_KEY)
        .and_then(|q| q.get("connection_pads"))
        .cloned();
    if let Some(pads) = pads {
        if let Some(claw_opts) = options
            .get_mut(CAVITY_OPTIONS_KEY)
            .and_then(|c| c.get_mut("claw_opts"))
            .and_then(Value::as_object_mut)
        {
            claw_opts.insert("connection_pads".to_string(), pads);
        }
    }
    if let Some(readout) = options
        .get_mut(QUBIT_OPTIONS_KEY)
        .and_then(|q| q.get_mut("connection_pads"))
        .and_then(|p| p.get_mut("readout"))
        .and_then(Value::as_object_mut)
    {
        readout.insert("claw_cpw_length".to_string(), Value::from("0um"));
    }
}

/// The scaling interpolator: a pure function of its inputs and the
/// registered rule table.
#[derive(Debug, Clone, Default)]
pub struct ScalingInterpolator {
    rules: ScalingRuleTable,
}

impl ScalingInterpolator {
    #[must_use]
    pub fn new(rules: ScalingRuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ScalingRuleTable {
        &self.rules
    }

    /// Synthesize a design from the closest record and the target.
    ///
    /// For every target physics field with a registered relation, the
    /// corresponding design field is rescaled by the closed-form law;
    /// everything else is copied unchanged and listed as pass-through in
    /// the provenance.
    ///
    /// The resonator topology is taken from the target's
    /// `resonator_type` constraint, falling back to the record's
    /// `resonator_type` field. Interpolating a topology with no
    /// registered rules fails with `NoScalingRuleForTopology` before any
    /// field is touched.
    pub fn interpolate(
        &self,
        closest: &DesignRecord,
        target: &TargetVector,
    ) -> Result<InterpolatedDesign> {
        let topology = resolve_topology(closest, target)?;
        let rules = *self.rules.rules_for(topology)?;

        let mut design = closest.design().clone();
        let mut options = closest.design_options.clone();
        let mut applied: Vec<AppliedRule> = Vec::new();

        // Anharmonicity drives the cross length; the ratio also feeds the
        // claw-length relation below.
        let alpha_ratio = match pair(closest, target, names::ANHARMONICITY_MHZ)? {
            Some((closest_alpha, target_alpha)) => {
                let ratio = closest_alpha / target_alpha;
                if let Some(rule) = scale_field(
                    &mut design,
                    names::CROSS_LENGTH,
                    names::ANHARMONICITY_MHZ,
                    ratio,
                ) {
                    set_option_length(&mut options, &QUBIT_CROSS_LENGTH_PATHS, rule.to);
                    applied.push(rule);
                }
                Some(ratio)
            }
            None => None,
        };

        // Coupling strength g drives the claw length, compounded with the
        // anharmonicity ratio when both are targeted.
        if let Some((closest_g, target_g)) = pair(closest, target, names::G_MHZ)? {
            let factor = (target_g / closest_g) * alpha_ratio.unwrap_or(1.0);
            if let Some(rule) =
                scale_field(&mut design, names::CLAW_LENGTH, names::G_MHZ, factor)
            {
                set_option_length(&mut options, &QUBIT_CLAW_LENGTH_PATHS, rule.to);
                applied.push(rule);
            }
        }

        // Cavity frequency drives the resonator length through the
        // topology's exponent.
        if let Some((closest_f, target_f)) = pair(closest, target, names::CAVITY_FREQUENCY_GHZ)? {
            let factor = (closest_f / target_f).powf(rules.frequency_length_exponent);
            if let Some(rule) = scale_field(
                &mut design,
                names::TOTAL_LENGTH,
                names::CAVITY_FREQUENCY_GHZ,
                factor,
            ) {
                set_option_length(&mut options, &CAVITY_TOTAL_LENGTH_PATHS, rule.to);
                applied.push(rule);
            }
        }

        // Kappa drives the coupling length through a square-root law; the
        // result is rounded to the nearest micron as the layout grid
        // expects.
        if let Some((closest_kappa, target_kappa)) = pair(closest, target, names::KAPPA_KHZ)? {
            let factor = (target_kappa / closest_kappa).powf(rules.kappa_coupling_exponent);
            if let Some(mut rule) = scale_field(
                &mut design,
                names::COUPLING_LENGTH,
                names::KAPPA_KHZ,
                factor,
            ) {
                rule.to = rule.to.round();
                design.insert(
                    names::COUPLING_LENGTH.to_string(),
                    FieldValue::Number(rule.to),
                );
                set_option_length(&mut options, &CAVITY_COUPLING_LENGTH_PATHS, rule.to);
                applied.push(rule);
            }
        }

        // Qubit frequency + anharmonicity pin down EJ, hence the junction
        // inductance the layout tool needs.
        if let (Some(f_q), Some(alpha)) = (
            target.value(names::QUBIT_FREQUENCY_GHZ),
            target.value(names::ANHARMONICITY_MHZ),
        ) {
            let (ej, _ec) = find_ej_ec(f_q, alpha * 1e-3)?;
            let lj = lj_from_ej(ej);
            set_option_inductance(&mut options, lj);
            // The record's own junction inductance, when its EJ is known,
            // gives the provenance a before/after pair.
            let from = closest
                .physics_number(names::EJ_GHZ)
                .map(lj_from_ej)
                .unwrap_or(lj);
            applied.push(AppliedRule {
                physics_field: names::QUBIT_FREQUENCY_GHZ.to_string(),
                design_field: "Lj".to_string(),
                factor: lj / from,
                from,
                to: lj,
            });
        }

        let touched: Vec<&str> = applied.iter().map(|r| r.design_field.as_str()).collect();
        let mut passed_through: Vec<String> = design
            .keys()
            .filter(|name| !touched.contains(&name.as_str()))
            .cloned()
            .collect();
        passed_through.sort();

        debug!(
            source = %closest.id,
            %topology,
            applied = applied.len(),
            "interpolated design from closest record"
        );

        Ok(InterpolatedDesign {
            design,
            design_options: options,
            provenance: Provenance {
                source_records: vec![closest.id],
                topology,
                rule_version: self.rules.version(),
                applied,
                passed_through,
            },
        })
    }
}

fn resolve_topology(closest: &DesignRecord, target: &TargetVector) -> Result<ResonatorTopology> {
    let text = target
        .constraint(names::RESONATOR_TYPE)
        .or_else(|| closest.physics_text(names::RESONATOR_TYPE))
        .ok_or_else(|| Error::TargetFieldNotFound(names::RESONATOR_TYPE.to_string()))?;
    text.parse()
}

/// The (closest, target) value pair for a physics field, if the target
/// requests it. A requested field missing from the record is a schema
/// error; zero values cannot form a scaling ratio.
fn pair(
    closest: &DesignRecord,
    target: &TargetVector,
    field: &str,
) -> Result<Option<(f64, f64)>> {
    let Some(target_value) = target.value(field) else {
        return Ok(None);
    };
    let closest_value = closest
        .physics_number(field)
        .ok_or_else(|| Error::TargetFieldNotFound(field.to_string()))?;
    if target_value == 0.0 || !target_value.is_finite() {
        return Err(Error::DegenerateNormalization {
            field: field.to_string(),
            value: target_value,
        });
    }
    if closest_value == 0.0 || !closest_value.is_finite() {
        return Err(Error::NonFinite {
            what: "closest-record physics value",
            value: closest_value,
        });
    }
    Ok(Some((closest_value, target_value)))
}

fn scale_field(
    design: &mut AHashMap<String, FieldValue>,
    design_field: &str,
    physics_field: &str,
    factor: f64,
) -> Option<AppliedRule> {
    let from = design.get(design_field).and_then(FieldValue::as_number)?;
    let to = from * factor;
    design.insert(design_field.to_string(), FieldValue::Number(to));
    Some(AppliedRule {
        physics_field: physics_field.to_string(),
        design_field: design_field.to_string(),
        factor,
        from,
        to,
    })
}

// Option-tree paths for both merged ({qubit,cavity_claw}_options) and
// single-component layouts.
const QUBIT_CROSS_LENGTH_PATHS: [&[&str]; 2] = [
    &["qubit_options", "cross_length"],
    &["cross_length"],
];
const QUBIT_CLAW_LENGTH_PATHS: [&[&str]; 2] = [
    &["qubit_options", "connection_pads", "readout", "claw_length"],
    &["connection_pads", "readout", "claw_length"],
];
const CAVITY_TOTAL_LENGTH_PATHS: [&[&str]; 2] = [
    &["cavity_claw_options", "cpw_opts", "total_length"],
    &["cpw_opts", "total_length"],
];
const CAVITY_COUPLING_LENGTH_PATHS: [&[&str]; 2] = [
    &["cavity_claw_options", "cplr_opts", "coupling_length"],
    &["cplr_opts", "coupling_length"],
];

/// Write a micron length into the first option path whose parent exists.
fn set_option_length(options: &mut Value, paths: &[&[&str]], value_um: f64) {
    for path in paths {
        if set_path(options, path, Value::String(format!("{}um", value_um))) {
            return;
        }
    }
}

/// Write the junction inductance everywhere the layout/simulation tools
/// read it: the readout pad (nH string) and the solver setup keys (henries).
fn set_option_inductance(options: &mut Value, lj_nh: f64) {
    const LJ_PATHS: [&[&str]; 2] = [
        &["qubit_options", "connection_pads", "readout", "Lj"],
        &["connection_pads", "readout", "Lj"],
    ];
    for path in LJ_PATHS {
        if set_path(options, path, Value::String(format!("{}nH", lj_nh))) {
            break;
        }
    }
    for key in [
        "aedt_hfss_inductance",
        "aedt_q3d_inductance",
        "q3d_inductance",
        "hfss_inductance",
    ] {
        if let Some(parent) = options
            .get_mut(QUBIT_OPTIONS_KEY)
            .and_then(Value::as_object_mut)
        {
            if parent.contains_key(key) {
                parent.insert(key.to_string(), Value::from(lj_nh * 1e-9));
            }
        }
        if let Some(parent) = options.as_object_mut() {
            if parent.contains_key(key) {
                parent.insert(key.to_string(), Value::from(lj_nh * 1e-9));
            }
        }
    }
}

/// Set `value` at `path` if every parent object on the way exists.
fn set_path(options: &mut Value, path: &[&str], value: Value) -> bool {
    let mut current = options;
    for key in &path[..path.len() - 1] {
        match current.get_mut(*key) {
            Some(next) => current = next,
            None => return false,
        }
    }
    match current.as_object_mut() {
        Some(object) if object.contains_key(path[path.len() - 1]) => {
            object.insert(path[path.len() - 1].to_string(), value);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::TopologyRules;
    use serde_json::json;

    fn closest_record() -> DesignRecord {
        DesignRecord::new()
            .with_design(names::CROSS_LENGTH, 310.0)
            .with_design(names::CLAW_LENGTH, 210.0)
            .with_design(names::TOTAL_LENGTH, 3900.0)
            .with_design(names::COUPLING_LENGTH, 220.0)
            .with_design(names::GROUND_SPACING, 10.0)
            .with_physics(names::QUBIT_FREQUENCY_GHZ, 5.2)
            .with_physics(names::ANHARMONICITY_MHZ, -220.0)
            .with_physics(names::G_MHZ, 60.0)
            .with_physics(names::CAVITY_FREQUENCY_GHZ, 6.0)
            .with_physics(names::KAPPA_KHZ, 120.0)
            .with_physics(names::EJ_GHZ, 14.0)
            .with_physics(names::RESONATOR_TYPE, "quarter")
            .with_design_options(json!({
                "qubit_options": {
                    "cross_length": "310um",
                    "connection_pads": {"readout": {"claw_length": "210um", "Lj": "12nH"}},
                    "hfss_inductance": 12e-9,
                },
                "cavity_claw_options": {
                    "cpw_opts": {"total_length": "3900um"},
                    "cplr_opts": {"coupling_length": "220um"},
                },
            }))
    }

    fn full_target() -> TargetVector {
        TargetVector::new()
            .with(names::QUBIT_FREQUENCY_GHZ, 5.0)
            .with(names::ANHARMONICITY_MHZ, -200.0)
            .with(names::G_MHZ, 70.0)
            .with(names::CAVITY_FREQUENCY_GHZ, 6.3)
            .with(names::KAPPA_KHZ, 150.0)
            .with_constraint(names::RESONATOR_TYPE, "quarter")
    }

    #[test]
    fn test_scaling_relations_applied() {
        let interpolator = ScalingInterpolator::default();
        let design = interpolator
            .interpolate(&closest_record(), &full_target())
            .unwrap();

        // cross_length * (alpha_closest / alpha_target)
        let cross = design.design_number(names::CROSS_LENGTH).unwrap();
        assert!((cross - 310.0 * (-220.0 / -200.0)).abs() < 1e-9);

        // claw_length * (g_target / g_closest) * (alpha_closest / alpha_target)
        let claw = design.design_number(names::CLAW_LENGTH).unwrap();
        assert!((claw - 210.0 * (70.0 / 60.0) * 1.1).abs() < 1e-9);

        // total_length * (f_closest / f_target)
        let total = design.design_number(names::TOTAL_LENGTH).unwrap();
        assert!((total - 3900.0 * (6.0 / 6.3)).abs() < 1e-9);

        // coupling_length * sqrt(kappa_target / kappa_closest), rounded
        let coupling = design.design_number(names::COUPLING_LENGTH).unwrap();
        assert_eq!(coupling, (220.0 * (150.0f64 / 120.0).sqrt()).round());
    }

    #[test]
    fn test_unrelated_fields_pass_through() {
        let interpolator = ScalingInterpolator::default();
        let design = interpolator
            .interpolate(&closest_record(), &full_target())
            .unwrap();
        assert_eq!(design.design_number(names::GROUND_SPACING), Some(10.0));
        assert!(design
            .provenance
            .passed_through
            .contains(&names::GROUND_SPACING.to_string()));
    }

    #[test]
    fn test_options_updated_in_place() {
        let interpolator = ScalingInterpolator::default();
        let design = interpolator
            .interpolate(&closest_record(), &full_target())
            .unwrap();
        let cross = design.design_number(names::CROSS_LENGTH).unwrap();
        assert_eq!(
            design.design_options["qubit_options"]["cross_length"],
            format!("{}um", cross)
        );
        // Lj was refreshed from the target frequency.
        let lj_text = design.design_options["qubit_options"]["connection_pads"]["readout"]["Lj"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(lj_text.ends_with("nH"));
        assert_ne!(lj_text, "12nH");
        let hfss = design.design_options["qubit_options"]["hfss_inductance"]
            .as_f64()
            .unwrap();
        assert!(hfss > 0.0 && hfss < 1e-6);
    }

    #[test]
    fn test_half_wave_without_rules_is_rejected() {
        let interpolator = ScalingInterpolator::default();
        let record = closest_record().with_physics_replaced(names::RESONATOR_TYPE, "half");
        let target = full_target().with_constraint(names::RESONATOR_TYPE, "half");
        let err = interpolator.interpolate(&record, &target).unwrap_err();
        assert_eq!(err, Error::NoScalingRuleForTopology("half".to_string()));
    }

    #[test]
    fn test_half_wave_with_registered_rules_succeeds() {
        let rules = ScalingRuleTable::default()
            .register(ResonatorTopology::HalfWave, TopologyRules::half_wave());
        let interpolator = ScalingInterpolator::new(rules);
        let record = closest_record().with_physics_replaced(names::RESONATOR_TYPE, "half");
        let target = full_target().with_constraint(names::RESONATOR_TYPE, "half");
        let design = interpolator.interpolate(&record, &target).unwrap();
        assert_eq!(design.provenance.topology, ResonatorTopology::HalfWave);
    }

    #[test]
    fn test_zero_target_value_is_degenerate() {
        let interpolator = ScalingInterpolator::default();
        let target = full_target().with(names::KAPPA_KHZ, 0.0);
        let err = interpolator
            .interpolate(&closest_record(), &target)
            .unwrap_err();
        assert!(matches!(err, Error::DegenerateNormalization { .. }));
    }

    #[test]
    fn test_provenance_names_sources_and_rules() {
        let interpolator = ScalingInterpolator::default();
        let record = closest_record();
        let design = interpolator.interpolate(&record, &full_target()).unwrap();
        assert_eq!(design.provenance.source_records, vec![record.id]);
        let applied: Vec<&str> = design
            .provenance
            .applied
            .iter()
            .map(|r| r.design_field.as_str())
            .collect();
        assert!(applied.contains(&names::CROSS_LENGTH));
        assert!(applied.contains(&names::CLAW_LENGTH));
        assert!(applied.contains(&names::TOTAL_LENGTH));
        assert!(applied.contains(&names::COUPLING_LENGTH));
        assert!(applied.contains(&"Lj"));
        // Each design field is scaled exactly once.
        let mut sorted = applied.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), applied.len());
    }
}
