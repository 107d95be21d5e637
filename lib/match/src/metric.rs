//! Distance norms and the bulk accumulation kernel.
//!
//! Distances are combined over normalized per-field deviations. The
//! kernel works column-at-a-time over the table's contiguous physics
//! columns: one pass per target field, accumulating into a single
//! distances buffer. This replaced an earlier per-row dispatch design
//! whose coordination overhead exceeded the arithmetic cost at realistic
//! table sizes (1e4-1e6 rows).

use crate::target::{Normalization, TargetField};
use hspace_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Below this magnitude a target value cannot serve as a relative
/// normalization scale.
pub const DEGENERATE_SCALE_EPS: f64 = 1e-12;

/// How per-field deviations combine into one scalar distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Norm {
    /// Weighted sum of squared deviations, square-rooted (L2).
    #[default]
    Euclidean,
    /// Weighted sum of absolute deviations (L1).
    Manhattan,
    /// Largest weighted absolute deviation (L-infinity).
    Chebyshev,
}

/// What to do when a relative-normalization target value is (near) zero.
///
/// This is an explicit policy: a zero target dividing a deviation would
/// otherwise surface as an infinite or NaN distance silently reordering
/// the ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Fail the query with `DegenerateNormalization`.
    #[default]
    Error,
    /// Use absolute deviations (scale 1.0) for the degenerate field.
    AbsoluteFallback,
}

/// Options controlling a matching query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MatchOptions {
    #[serde(default)]
    pub norm: Norm,
    #[serde(default)]
    pub degenerate: DegeneratePolicy,
}

/// Resolve the normalization scale for one target field.
pub fn resolve_scale(field: &TargetField, policy: DegeneratePolicy) -> Result<f64> {
    let scale = match field.normalization {
        Normalization::Relative => field.value,
        Normalization::Scale(s) => s,
    };
    if !scale.is_finite() {
        return Err(Error::NonFinite {
            what: "normalization scale",
            value: scale,
        });
    }
    if scale.abs() < DEGENERATE_SCALE_EPS {
        return match policy {
            DegeneratePolicy::Error => Err(Error::DegenerateNormalization {
                field: field.name.clone(),
                value: field.value,
            }),
            DegeneratePolicy::AbsoluteFallback => Ok(1.0),
        };
    }
    Ok(scale)
}

/// Accumulate one field's weighted deviations into the distances buffer.
///
/// `distances` and `column` have equal length; the loop body is branch-free
/// so the compiler can vectorize it.
pub fn accumulate(
    distances: &mut [f64],
    column: &[f64],
    target_value: f64,
    scale: f64,
    weight: f64,
    norm: Norm,
) {
    debug_assert_eq!(distances.len(), column.len());
    let inv_scale = 1.0 / scale;
    match norm {
        Norm::Euclidean => {
            for (d, &v) in distances.iter_mut().zip(column) {
                let dev = (v - target_value) * inv_scale;
                *d += weight * dev * dev;
            }
        }
        Norm::Manhattan => {
            for (d, &v) in distances.iter_mut().zip(column) {
                let dev = (v - target_value) * inv_scale;
                *d += weight * dev.abs();
            }
        }
        Norm::Chebyshev => {
            for (d, &v) in distances.iter_mut().zip(column) {
                let dev = (v - target_value) * inv_scale;
                *d = d.max(weight * dev.abs());
            }
        }
    }
}

/// Final transform after all fields are accumulated.
pub fn finalize(distances: &mut [f64], norm: Norm) {
    if norm == Norm::Euclidean {
        for d in distances.iter_mut() {
            *d = d.sqrt();
        }
    }
}

/// Single-row contribution of one field, used for explain output on the
/// selected matches. Mirrors `accumulate` exactly.
pub fn contribution(deviation: f64, weight: f64, norm: Norm) -> f64 {
    match norm {
        Norm::Euclidean => weight * deviation * deviation,
        Norm::Manhattan | Norm::Chebyshev => weight * deviation.abs(),
    }
}
