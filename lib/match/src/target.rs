//! Target vectors: the caller's desired point in physics-parameter space.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Per-field normalization policy for relative deviations.
///
/// Dividing by the target value (the default) keeps fields with very
/// different absolute magnitudes comparable; a user-supplied scale
/// overrides that when the target value is a poor yardstick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Divide deviations by the target value itself (relative error).
    #[default]
    Relative,
    /// Divide deviations by a fixed, caller-supplied scale.
    Scale(f64),
}

/// One numeric field of a target vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetField {
    pub name: String,
    pub value: f64,
    /// Relative importance in the combined distance. Defaults to 1.0.
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub normalization: Normalization,
}

fn default_weight() -> f64 {
    1.0
}

/// A categorical equality constraint (e.g. `resonator_type == "quarter"`).
/// Constraint fields never enter the distance; rows failing a constraint
/// are excluded before ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConstraint {
    pub name: String,
    pub value: String,
}

/// A partial mapping from physics-field names to desired values.
///
/// Field order is insertion order and is preserved: the distance kernel
/// accumulates per-field contributions in this order, which keeps
/// floating-point results bit-identical across runs.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TargetVector {
    fields: SmallVec<[TargetField; 8]>,
    #[serde(default)]
    constraints: SmallVec<[TargetConstraint; 2]>,
}

impl TargetVector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a numeric target with weight 1 and relative normalization.
    /// Setting a field that is already present replaces it.
    #[must_use]
    pub fn with(self, name: &str, value: f64) -> Self {
        self.with_field(TargetField {
            name: name.to_string(),
            value,
            weight: 1.0,
            normalization: Normalization::Relative,
        })
    }

    /// Add a numeric target with an explicit weight.
    #[must_use]
    pub fn with_weighted(self, name: &str, value: f64, weight: f64) -> Self {
        self.with_field(TargetField {
            name: name.to_string(),
            value,
            weight,
            normalization: Normalization::Relative,
        })
    }

    #[must_use]
    pub fn with_field(mut self, field: TargetField) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    /// Add a categorical equality constraint.
    #[must_use]
    pub fn with_constraint(mut self, name: &str, value: &str) -> Self {
        let constraint = TargetConstraint {
            name: name.to_string(),
            value: value.to_string(),
        };
        if let Some(existing) = self.constraints.iter_mut().find(|c| c.name == constraint.name) {
            *existing = constraint;
        } else {
            self.constraints.push(constraint);
        }
        self
    }

    pub fn fields(&self) -> &[TargetField] {
        &self.fields
    }

    pub fn constraints(&self) -> &[TargetConstraint] {
        &self.constraints
    }

    pub fn field(&self, name: &str) -> Option<&TargetField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn constraint(&self, name: &str) -> Option<&str> {
        self.constraints
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Numeric value of a target field, if present.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.field(name).map(|f| f.value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.constraints.is_empty()
    }

    /// A target restricted to the named numeric fields (constraints kept).
    #[must_use]
    pub fn subset(&self, names: &[&str]) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .filter(|f| names.contains(&f.name.as_str()))
                .cloned()
                .collect(),
            constraints: self.constraints.clone(),
        }
    }
}
