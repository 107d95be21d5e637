//! Comparison tables: homogeneous, row-stable candidate sets.
//!
//! A table is built once per query configuration and is read-only
//! afterwards. Row order is preserved from construction because ties in
//! the matching engine break on first occurrence; reordering rows would
//! silently change which design a tied query returns.
//!
//! Alongside the row records the table keeps column-major copies of every
//! physics field, so distance computation is a bulk pass over contiguous
//! slices instead of a per-row field lookup.

use crate::error::{Error, Result};
use crate::field::FieldValue;
use crate::record::DesignRecord;
use ahash::AHashMap;

/// A column-major copy of one physics field across all rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Number(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Number(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            Column::Number(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Column::Number(_) => None,
            Column::Text(v) => Some(v),
        }
    }
}

/// An ordered, schema-homogeneous collection of design records for one
/// system type.
#[derive(Debug, Clone)]
pub struct ComparisonTable {
    records: Vec<DesignRecord>,
    columns: AHashMap<String, Column>,
}

impl ComparisonTable {
    /// Build a table from records, validating that every record carries
    /// the same physics-field schema.
    ///
    /// The schema is taken from the first record; any record missing one
    /// of its fields, carrying an extra field, or disagreeing on a field's
    /// value kind fails with [`Error::SchemaMismatch`]. A table with zero
    /// rows is permitted (queries against it fail with `EmptyTable`).
    pub fn from_records(records: Vec<DesignRecord>) -> Result<Self> {
        let mut columns: AHashMap<String, Column> = AHashMap::new();

        if let Some(first) = records.first() {
            for (name, value) in first.physics() {
                let column = match value {
                    FieldValue::Number(_) => Column::Number(Vec::with_capacity(records.len())),
                    FieldValue::Text(_) => Column::Text(Vec::with_capacity(records.len())),
                };
                columns.insert(name.clone(), column);
            }

            for record in &records {
                if record.physics().len() != columns.len() {
                    let extra = record
                        .physics()
                        .keys()
                        .find(|k| !columns.contains_key(*k))
                        .cloned()
                        .unwrap_or_default();
                    return Err(Error::SchemaMismatch {
                        field: extra,
                        what: "record physics schema differs from table schema",
                    });
                }
                for (name, column) in columns.iter_mut() {
                    let value = record.physics_field(name).ok_or_else(|| Error::SchemaMismatch {
                        field: name.clone(),
                        what: "physics field missing from record",
                    })?;
                    match (column, value) {
                        (Column::Number(col), FieldValue::Number(v)) => col.push(*v),
                        (Column::Text(col), FieldValue::Text(s)) => col.push(s.clone()),
                        _ => {
                            return Err(Error::SchemaMismatch {
                                field: name.clone(),
                                what: "field value kind differs between records",
                            })
                        }
                    }
                }
            }
        }

        Ok(Self { records, columns })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows in stable construction order.
    pub fn records(&self) -> &[DesignRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&DesignRecord> {
        self.records.get(index)
    }

    /// Physics-field names of the table schema.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Numeric column for a physics field.
    ///
    /// Fails with `TargetFieldNotFound` if the field is not in the schema
    /// and with `SchemaMismatch` if it is categorical.
    pub fn number_column(&self, name: &str) -> Result<&[f64]> {
        let column = self
            .columns
            .get(name)
            .ok_or_else(|| Error::TargetFieldNotFound(name.to_string()))?;
        column.as_numbers().ok_or_else(|| Error::SchemaMismatch {
            field: name.to_string(),
            what: "expected numeric field, found categorical",
        })
    }

    /// Categorical column for a physics field.
    pub fn text_column(&self, name: &str) -> Result<&[String]> {
        let column = self
            .columns
            .get(name)
            .ok_or_else(|| Error::TargetFieldNotFound(name.to_string()))?;
        column.as_text().ok_or_else(|| Error::SchemaMismatch {
            field: name.to_string(),
            what: "expected categorical field, found numeric",
        })
    }

    /// Table restricted to the rows for which `keep` returns true.
    /// Row order is preserved.
    pub fn filter<F>(&self, mut keep: F) -> Result<Self>
    where
        F: FnMut(usize, &DesignRecord) -> bool,
    {
        let records: Vec<DesignRecord> = self
            .records
            .iter()
            .enumerate()
            .filter(|&(i, record)| keep(i, record))
            .map(|(_, record)| record.clone())
            .collect();
        Self::from_records(records)
    }
}
