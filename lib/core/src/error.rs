use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("No scaling rule registered for resonator topology: {0}")]
    NoScalingRuleForTopology(String),

    #[error("No records match the requested component/topology selection")]
    EmptyResultSet,

    #[error("Comparison table has no rows")]
    EmptyTable,

    #[error("Target field not found in table schema: {0}")]
    TargetFieldNotFound(String),

    #[error("Schema mismatch for field `{field}`: {what}")]
    SchemaMismatch { field: String, what: &'static str },

    #[error("Degenerate normalization for field `{field}`: target value {value} cannot scale a relative deviation")]
    DegenerateNormalization { field: String, value: f64 },

    #[error("Requested {requested} results but table has only {available} rows")]
    InvalidResultCount { requested: usize, available: usize },

    #[error("Invalid weight for field `{field}`: {value}")]
    InvalidWeight { field: String, value: f64 },

    #[error("Operation not supported for this system selection: {0}")]
    UnsupportedSelection(String),

    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}
