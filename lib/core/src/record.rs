//! Design records: one simulated device geometry and its physics outputs.

use crate::field::FieldValue;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw record as it arrives from a bulk-loaded sub-table.
///
/// This is the wire shape of the external dataset: design inputs and
/// simulated outputs in separate maps, plus the opaque layout-tool options.
/// The store converts these into [`DesignRecord`]s at load time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawRecord {
    /// Geometric/layout parameters (lengths in um, gaps, spacings).
    #[serde(default)]
    pub design: AHashMap<String, FieldValue>,
    /// Simulated physics outputs (frequencies, capacitances, kappa, ...).
    #[serde(default)]
    pub sim_results: AHashMap<String, FieldValue>,
    /// Opaque layout-tool option tree, passed through untouched.
    #[serde(default)]
    pub design_options: serde_json::Value,
    /// Name of the tool that produced the layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_tool: Option<String>,
}

/// An immutable record pairing a device geometry with its simulated
/// physics outputs.
///
/// Fields partition into two roles: *design* fields (geometric inputs) and
/// *physics* fields (simulated outputs). Only physics fields participate in
/// distance computation; design fields and `design_options` are what a
/// query ultimately retrieves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignRecord {
    /// Stable identity, assigned at load. Interpolation provenance refers
    /// to source records by this id.
    pub id: Uuid,
    design: AHashMap<String, FieldValue>,
    physics: AHashMap<String, FieldValue>,
    /// Opaque layout-tool option tree, consumable by the external
    /// layout/simulation collaborator without further transformation.
    #[serde(default)]
    pub design_options: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_tool: Option<String>,
}

impl DesignRecord {
    /// Create an empty record with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            design: AHashMap::new(),
            physics: AHashMap::new(),
            design_options: serde_json::Value::Null,
            design_tool: None,
        }
    }

    /// Build a record from a raw sub-table row.
    #[must_use]
    pub fn from_raw(raw: RawRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            design: raw.design,
            physics: raw.sim_results,
            design_options: raw.design_options,
            design_tool: raw.design_tool,
        }
    }

    #[must_use]
    pub fn with_design(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.design.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_physics(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.physics.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_design_options(mut self, options: serde_json::Value) -> Self {
        self.design_options = options;
        self
    }

    /// All physics fields.
    pub fn physics(&self) -> &AHashMap<String, FieldValue> {
        &self.physics
    }

    /// All design fields.
    pub fn design(&self) -> &AHashMap<String, FieldValue> {
        &self.design
    }

    pub fn physics_field(&self, name: &str) -> Option<&FieldValue> {
        self.physics.get(name)
    }

    pub fn design_field(&self, name: &str) -> Option<&FieldValue> {
        self.design.get(name)
    }

    /// Numeric physics field, if present and numeric.
    pub fn physics_number(&self, name: &str) -> Option<f64> {
        self.physics.get(name).and_then(FieldValue::as_number)
    }

    /// Categorical physics field, if present and text.
    pub fn physics_text(&self, name: &str) -> Option<&str> {
        self.physics.get(name).and_then(FieldValue::as_text)
    }

    /// Numeric design field, if present and numeric.
    pub fn design_number(&self, name: &str) -> Option<f64> {
        self.design.get(name).and_then(FieldValue::as_number)
    }

    /// Record with one physics field added or replaced. Records are
    /// immutable from the caller's perspective; derived tables are built
    /// from transformed copies.
    #[must_use]
    pub fn with_physics_replaced(&self, name: &str, value: impl Into<FieldValue>) -> Self {
        let mut copy = self.clone();
        copy.physics.insert(name.to_string(), value.into());
        copy
    }

    /// Consuming variant: drop a physics field (used when renaming raw
    /// columns to their unit-normalized names).
    #[must_use]
    pub fn without_physics(mut self, name: &str) -> Self {
        self.physics.remove(name);
        self
    }
}

impl Default for DesignRecord {
    fn default() -> Self {
        Self::new()
    }
}
