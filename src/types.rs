//src/types.rs

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};

/// Substituted for `tax_id` when a classification has no taxonomy entry.
pub const UNKNOWN_TAX_ID: &str = "none";
/// Substituted for `tax_name` when a classification has no taxonomy entry.
pub const UNKNOWN_TAX_NAME: &str = "unclassified";
/// Substituted for `rank` when a classification has no taxonomy entry.
pub const UNKNOWN_RANK: &str = "root";

/// A numeric cell as SQLite returned it.
///
/// Integer sums stay integers (`15`), real values always carry a decimal
/// point (`15.0`, `0.25`), so reports look the same whatever storage class
/// the `mass` column uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    Integer(i64),
    Real(f64),
}

impl Measure {
    /// Value written for a taxon/specimen pair missing from the query result.
    pub const ZERO: Measure = Measure::Integer(0);

    pub fn as_f64(&self) -> f64 {
        match *self {
            Measure::Integer(v) => v as f64,
            Measure::Real(v) => v,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Measure::Integer(v) => write!(f, "{}", v),
            Measure::Real(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{:.1}", v)
            }
            Measure::Real(v) => write!(f, "{}", v),
        }
    }
}

impl FromSql for Measure {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(v) => Ok(Measure::Integer(v)),
            ValueRef::Real(v) => Ok(Measure::Real(v)),
            // SUM over zero rows, or a division by a NULL total
            ValueRef::Null => Ok(Measure::ZERO),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// The taxon attributes every report row carries.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonRecord {
    pub tax_id: String,
    pub tax_name: String,
    pub rank: String,
}

impl TaxonRecord {
    pub fn new(tax_id: impl Into<String>, tax_name: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            tax_id: tax_id.into(),
            tax_name: tax_name.into(),
            rank: rank.into(),
        }
    }

    /// Placeholder used when the classification did not join onto `taxa`.
    #[cfg(test)]
    pub(crate) fn unclassified() -> Self {
        Self::new(UNKNOWN_TAX_ID, UNKNOWN_TAX_NAME, UNKNOWN_RANK)
    }
}

/// One row of the by-taxon totals query.
///  tax_name  tax_id  rank  tally  placements
#[derive(Debug, Clone, PartialEq)]
pub struct ByTaxonRow {
    pub taxon: TaxonRecord,
    pub tally: Measure,
    pub placements: i64,
}

/// One row of the per-specimen-per-taxon query.
///  specimen  tax_name  tax_id  rank  tally  placements  frequency
#[derive(Debug, Clone, PartialEq)]
pub struct BySpecimenRow {
    pub specimen: String,
    pub taxon: TaxonRecord,
    pub tally: Measure,
    pub placements: i64,
    pub frequency: f64,
}

/// Total mass classified at the wanted rank for one specimen.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecimenMass {
    pub specimen: String,
    pub total_mass: Measure,
}

/// Per-taxon mean of the per-specimen frequencies.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageFrequencyRow {
    pub taxon: TaxonRecord,
    pub average_frequency: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_display_keeps_storage_class() {
        assert_eq!(Measure::Integer(15).to_string(), "15");
        assert_eq!(Measure::Real(15.0).to_string(), "15.0");
        assert_eq!(Measure::Real(0.25).to_string(), "0.25");
        assert_eq!(Measure::ZERO.to_string(), "0");
    }

    #[test]
    fn measure_as_f64() {
        assert_eq!(Measure::Integer(3).as_f64(), 3.0);
        assert_eq!(Measure::Real(2.5).as_f64(), 2.5);
    }
}
