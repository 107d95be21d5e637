//! Closest-match search over a comparison table.

use crate::metric::{accumulate, contribution, finalize, resolve_scale, MatchOptions, Norm};
use crate::target::TargetVector;
use hspace_core::{ComparisonTable, DesignRecord, Error, Result};
use tracing::{debug, warn};

/// One field's normalized deviation for a returned match, for
/// explainability of the ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeviation {
    pub field: String,
    /// Signed normalized deviation `(candidate - target) / scale`.
    pub deviation: f64,
    /// This field's weighted contribution to the combined distance
    /// (pre-finalization, i.e. squared for the Euclidean norm).
    pub contribution: f64,
}

/// A ranked candidate returned by [`find_closest`].
#[derive(Debug, Clone)]
pub struct Match<'t> {
    pub record: &'t DesignRecord,
    /// Row index in the queried table. Ties are broken by this index.
    pub index: usize,
    pub distance: f64,
    pub deviations: Vec<FieldDeviation>,
}

/// Find the `k` candidates closest to the target.
///
/// Distance is computed over the target's numeric fields only, as a
/// weighted combination of normalized deviations (see [`MatchOptions`]).
/// Categorical constraints exclude rows before ranking. Results are in
/// ascending distance order; exact ties break on first occurrence in the
/// table's row order, so repeated calls with identical inputs return
/// identical results.
///
/// `k` must be between 1 and the table size. If constraints leave fewer
/// than `k` candidate rows, all remaining candidates are returned.
/// A target with no numeric fields ranks all candidate rows at distance
/// zero, in row order.
///
/// # Errors
///
/// - [`Error::EmptyTable`] if the table has no rows
/// - [`Error::InvalidResultCount`] if `k` is 0 or exceeds the table size
/// - [`Error::TargetFieldNotFound`] if any target field or constraint is
///   absent from the table schema (never silently skipped)
/// - [`Error::SchemaMismatch`] if a target field is categorical in the table
/// - [`Error::DegenerateNormalization`] for a (near-)zero relative target
///   value under the default degenerate policy
/// - [`Error::EmptyResultSet`] if constraints exclude every row
pub fn find_closest<'t>(
    table: &'t ComparisonTable,
    target: &TargetVector,
    k: usize,
    options: &MatchOptions,
) -> Result<Vec<Match<'t>>> {
    if table.is_empty() {
        return Err(Error::EmptyTable);
    }
    if k == 0 || k > table.len() {
        return Err(Error::InvalidResultCount {
            requested: k,
            available: table.len(),
        });
    }

    // Resolve every target field up front: schema errors must surface
    // before any arithmetic, and for every field.
    let mut fields = Vec::with_capacity(target.fields().len());
    for field in target.fields() {
        if !field.value.is_finite() {
            return Err(Error::NonFinite {
                what: "target value",
                value: field.value,
            });
        }
        if !field.weight.is_finite() || field.weight < 0.0 {
            return Err(Error::InvalidWeight {
                field: field.name.clone(),
                value: field.weight,
            });
        }
        let column = table.number_column(&field.name)?;
        let scale = resolve_scale(field, options.degenerate)?;
        fields.push((field, column, scale));
    }

    let mask = constraint_mask(table, target)?;

    let mut distances = vec![0.0f64; table.len()];
    for (field, column, scale) in &fields {
        advise_out_of_bounds(&field.name, field.value, column);
        accumulate(
            &mut distances,
            column,
            field.value,
            *scale,
            field.weight,
            options.norm,
        );
    }
    finalize(&mut distances, options.norm);

    // Candidate rows in stable order; a NaN distance (NaN in the library
    // data) sorts after every finite distance under total_cmp.
    let mut candidates: Vec<usize> = match &mask {
        Some(mask) => (0..table.len()).filter(|&i| mask[i]).collect(),
        None => (0..table.len()).collect(),
    };
    if candidates.is_empty() {
        return Err(Error::EmptyResultSet);
    }
    candidates.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]).then(a.cmp(&b)));
    candidates.truncate(k);

    debug!(
        rows = table.len(),
        fields = fields.len(),
        k,
        best = distances[candidates[0]],
        "ranked comparison table"
    );

    let matches = candidates
        .into_iter()
        .map(|index| {
            let deviations = fields
                .iter()
                .map(|(field, column, scale)| {
                    let deviation = (column[index] - field.value) / scale;
                    FieldDeviation {
                        field: field.name.clone(),
                        deviation,
                        contribution: contribution(deviation, field.weight, options.norm),
                    }
                })
                .collect();
            Match {
                record: table.record(index).expect("index within table"),
                index,
                distance: distances[index],
                deviations,
            }
        })
        .collect();

    Ok(matches)
}

/// Convenience wrapper: single closest match with default options.
pub fn find_closest_one<'t>(
    table: &'t ComparisonTable,
    target: &TargetVector,
) -> Result<Match<'t>> {
    let mut matches = find_closest(table, target, 1, &MatchOptions::default())?;
    Ok(matches.remove(0))
}

fn constraint_mask(table: &ComparisonTable, target: &TargetVector) -> Result<Option<Vec<bool>>> {
    if target.constraints().is_empty() {
        return Ok(None);
    }
    let mut mask = vec![true; table.len()];
    for constraint in target.constraints() {
        let column = table.text_column(&constraint.name)?;
        for (m, value) in mask.iter_mut().zip(column) {
            *m &= value == &constraint.value;
        }
    }
    Ok(Some(mask))
}

/// Advisory only: a target outside the library's simulated range still
/// matches, but the nearest design may be a poor starting point.
fn advise_out_of_bounds(name: &str, value: f64, column: &[f64]) {
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &v in column {
        min = min.min(v);
        max = max.max(v);
    }
    if value < min || value > max {
        warn!(
            field = name,
            value,
            library_min = min,
            library_max = max,
            "target value is outside the bounds of the library"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::DegeneratePolicy;
    use hspace_core::{names, DesignRecord};

    fn table_of_frequencies(freqs: &[f64]) -> ComparisonTable {
        let records = freqs
            .iter()
            .map(|&f| {
                DesignRecord::new()
                    .with_physics(names::CAVITY_FREQUENCY_GHZ, f)
                    .with_physics(names::KAPPA_KHZ, 100.0)
                    .with_physics(names::RESONATOR_TYPE, "quarter")
            })
            .collect();
        ComparisonTable::from_records(records).unwrap()
    }

    #[test]
    fn test_exact_match_has_zero_distance() {
        let table = table_of_frequencies(&[4.0, 5.0, 6.1]);
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.0);
        let best = find_closest_one(&table, &target).unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.distance, 0.0);
    }

    #[test]
    fn test_nearest_single_field() {
        let table = table_of_frequencies(&[4.0, 5.0, 6.1]);
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.05);
        let matches =
            find_closest(&table, &target, 3, &MatchOptions::default()).unwrap();
        assert_eq!(matches[0].index, 1);
        assert!(matches[0].distance < matches[1].distance);
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn test_determinism_and_tie_break() {
        // Two rows at identical distance: first occurrence wins.
        let table = table_of_frequencies(&[4.9, 5.1, 5.1, 4.9]);
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.0);
        for _ in 0..5 {
            let matches = find_closest(&table, &target, 4, &MatchOptions::default()).unwrap();
            let order: Vec<usize> = matches.iter().map(|m| m.index).collect();
            assert_eq!(order, [0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_missing_target_field_errors() {
        let table = table_of_frequencies(&[5.0]);
        let target = TargetVector::new().with("anharmonicity_MHz", -200.0);
        let err = find_closest(&table, &target, 1, &MatchOptions::default()).unwrap_err();
        assert_eq!(err, Error::TargetFieldNotFound("anharmonicity_MHz".into()));
    }

    #[test]
    fn test_empty_table_errors() {
        let table = ComparisonTable::from_records(Vec::new()).unwrap();
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.0);
        let err = find_closest(&table, &target, 1, &MatchOptions::default()).unwrap_err();
        assert_eq!(err, Error::EmptyTable);
    }

    #[test]
    fn test_k_bounds() {
        let table = table_of_frequencies(&[4.0, 5.0]);
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.0);
        assert!(matches!(
            find_closest(&table, &target, 0, &MatchOptions::default()),
            Err(Error::InvalidResultCount { .. })
        ));
        assert!(matches!(
            find_closest(&table, &target, 3, &MatchOptions::default()),
            Err(Error::InvalidResultCount { .. })
        ));
    }

    #[test]
    fn test_constraint_filters_rows() {
        let records = vec![
            DesignRecord::new()
                .with_physics(names::CAVITY_FREQUENCY_GHZ, 5.0)
                .with_physics(names::RESONATOR_TYPE, "half"),
            DesignRecord::new()
                .with_physics(names::CAVITY_FREQUENCY_GHZ, 5.2)
                .with_physics(names::RESONATOR_TYPE, "quarter"),
        ];
        let table = ComparisonTable::from_records(records).unwrap();
        let target = TargetVector::new()
            .with(names::CAVITY_FREQUENCY_GHZ, 5.0)
            .with_constraint(names::RESONATOR_TYPE, "quarter");
        let best = find_closest_one(&table, &target).unwrap();
        // The exact 5.0 row is half-wave and excluded; 5.2 wins.
        assert_eq!(best.index, 1);
    }

    #[test]
    fn test_constraint_excluding_all_rows_errors() {
        let table = table_of_frequencies(&[4.0, 5.0]);
        let target = TargetVector::new()
            .with(names::CAVITY_FREQUENCY_GHZ, 5.0)
            .with_constraint(names::RESONATOR_TYPE, "half");
        let err = find_closest(&table, &target, 1, &MatchOptions::default()).unwrap_err();
        assert_eq!(err, Error::EmptyResultSet);
    }

    #[test]
    fn test_degenerate_target_value_errors_by_default() {
        let table = table_of_frequencies(&[4.0, 5.0]);
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 0.0);
        let err = find_closest(&table, &target, 1, &MatchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DegenerateNormalization { .. }));

        let options = MatchOptions {
            degenerate: DegeneratePolicy::AbsoluteFallback,
            ..MatchOptions::default()
        };
        let matches = find_closest(&table, &target, 1, &options).unwrap();
        assert_eq!(matches[0].index, 0);
        assert!(matches[0].distance.is_finite());
    }

    #[test]
    fn test_normalization_invariance() {
        // Scaling one field's target and candidate values by the same
        // positive constant must not change the ranking.
        let base = [4.2e0, 5.7e0, 5.1e0, 6.3e0];
        let scaled: Vec<f64> = base.iter().map(|v| v * 1e9).collect();

        let rank = |values: &[f64], target: f64| -> Vec<usize> {
            let table = table_of_frequencies(values);
            let t = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, target);
            find_closest(&table, &t, values.len(), &MatchOptions::default())
                .unwrap()
                .iter()
                .map(|m| m.index)
                .collect()
        };

        assert_eq!(rank(&base, 5.0), rank(&scaled, 5.0e9));
    }

    #[test]
    fn test_weighted_multi_field_ranking() {
        // Row 1 nails the frequency but misses kappa badly; row 2 is a
        // little off in frequency and right on kappa. With enough weight
        // on kappa the combined distance must prefer row 2.
        let records = vec![
            DesignRecord::new()
                .with_physics(names::CAVITY_FREQUENCY_GHZ, 5.0)
                .with_physics(names::KAPPA_KHZ, 500.0),
            DesignRecord::new()
                .with_physics(names::CAVITY_FREQUENCY_GHZ, 6.1)
                .with_physics(names::KAPPA_KHZ, 100.0),
        ];
        let table = ComparisonTable::from_records(records).unwrap();

        let frequency_only = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.05);
        assert_eq!(find_closest_one(&table, &frequency_only).unwrap().index, 0);

        let combined = TargetVector::new()
            .with(names::CAVITY_FREQUENCY_GHZ, 5.05)
            .with_weighted(names::KAPPA_KHZ, 100.0, 2.0);
        assert_eq!(find_closest_one(&table, &combined).unwrap().index, 1);
    }

    #[test]
    fn test_manhattan_and_chebyshev_norms() {
        let table = table_of_frequencies(&[4.0, 5.0, 6.1]);
        let target = TargetVector::new().with(names::CAVITY_FREQUENCY_GHZ, 5.05);
        for norm in [Norm::Manhattan, Norm::Chebyshev] {
            let options = MatchOptions {
                norm,
                ..MatchOptions::default()
            };
            let matches = find_closest(&table, &target, 1, &options).unwrap();
            assert_eq!(matches[0].index, 1);
        }
    }

    #[test]
    fn test_explain_contributions_sum_to_distance() {
        let table = table_of_frequencies(&[4.0]);
        let target = TargetVector::new()
            .with(names::CAVITY_FREQUENCY_GHZ, 5.0)
            .with(names::KAPPA_KHZ, 80.0);
        let best = find_closest_one(&table, &target).unwrap();
        let total: f64 = best.deviations.iter().map(|d| d.contribution).sum();
        assert!((total.sqrt() - best.distance).abs() < 1e-12);
    }
}
