//! Field values and the canonical field-name vocabulary.
//!
//! A record is a flat mapping from field name to a scalar value, either
//! numeric or categorical. Field names are plain strings so that new
//! library columns do not require a code change; the names the engine
//! itself reads are collected in [`names`].

use serde::{Deserialize, Serialize};

/// A single scalar field value in a design record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric value (frequencies, capacitances, lengths, ...)
    Number(f64),
    /// Categorical value (resonator type, coupler type, ...)
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value, if it is a number.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    /// Categorical view of the value, if it is text.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => Some(s.as_str()),
        }
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, FieldValue::Number(_))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Canonical field names used by the engine itself.
///
/// Raw sub-tables may carry additional columns; those are preserved but
/// never interpreted. Unit suffixes are part of the name on purpose: a
/// comparison table speaks exactly one unit vocabulary after construction.
pub mod names {
    // Physics fields (simulated Hamiltonian / electromagnetic outputs)
    pub const QUBIT_FREQUENCY_GHZ: &str = "qubit_frequency_GHz";
    pub const ANHARMONICITY_MHZ: &str = "anharmonicity_MHz";
    pub const CAVITY_FREQUENCY_GHZ: &str = "cavity_frequency_GHz";
    pub const KAPPA_KHZ: &str = "kappa_kHz";
    pub const G_MHZ: &str = "g_MHz";
    pub const EC_GHZ: &str = "EC";
    pub const EJ_GHZ: &str = "EJ";
    pub const RESONATOR_TYPE: &str = "resonator_type";
    pub const COUPLER_TYPE: &str = "coupler_type";
    pub const CROSS_TO_CLAW: &str = "cross_to_claw";
    pub const CROSS_TO_GROUND: &str = "cross_to_ground";
    pub const CLAW_TO_GROUND: &str = "claw_to_ground";
    pub const TOP_TO_GROUND: &str = "top_to_ground";
    pub const TOP_TO_BOTTOM: &str = "top_to_bottom";

    // Raw column names as they arrive from the eigenmode sub-tables,
    // before unit normalization (Hz -> GHz / kHz).
    pub const RAW_CAVITY_FREQUENCY: &str = "cavity_frequency";
    pub const RAW_KAPPA: &str = "kappa";

    // Design fields (geometric/layout inputs, lengths in um)
    pub const CROSS_LENGTH: &str = "cross_length";
    pub const CROSS_GAP: &str = "cross_gap";
    pub const CLAW_LENGTH: &str = "claw_length";
    pub const CLAW_GAP: &str = "claw_gap";
    pub const CLAW_WIDTH: &str = "claw_width";
    pub const GROUND_SPACING: &str = "ground_spacing";
    pub const COUPLING_LENGTH: &str = "coupling_length";
    pub const TOTAL_LENGTH: &str = "total_length";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_accessors() {
        let v = FieldValue::Number(5.2);
        assert_eq!(v.as_number(), Some(5.2));
        assert_eq!(v.as_text(), None);
        assert!(v.is_number());
    }

    #[test]
    fn test_text_accessors() {
        let v = FieldValue::from("quarter");
        assert_eq!(v.as_text(), Some("quarter"));
        assert_eq!(v.as_number(), None);
    }

    #[test]
    fn test_serde_untagged() {
        let n: FieldValue = serde_json::from_str("4.25").unwrap();
        assert_eq!(n, FieldValue::Number(4.25));
        let t: FieldValue = serde_json::from_str("\"half\"").unwrap();
        assert_eq!(t, FieldValue::Text("half".to_string()));
    }
}
