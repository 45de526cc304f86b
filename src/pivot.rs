// src/pivot.rs

use ahash::{AHashMap, AHashSet};

use crate::config::ValueMode;
use crate::types::{BySpecimenRow, Measure, TaxonRecord};

/// One taxon of the wide by-specimen table. Only specimens the taxon was
/// observed in carry a value; everything else reads as zero.
#[derive(Debug, Clone)]
pub struct PivotRow {
    pub taxon: TaxonRecord,
    values: AHashMap<String, Measure>,
}

impl PivotRow {
    fn new(taxon: TaxonRecord) -> Self {
        Self {
            taxon,
            values: AHashMap::new(),
        }
    }

    /// The stored value, `None` when the taxon was never seen in `specimen`.
    pub fn get(&self, specimen: &str) -> Option<Measure> {
        self.values.get(specimen).copied()
    }

    /// Sparse-to-dense fill: absent pairs are materialized as `0`.
    pub fn value_or_zero(&self, specimen: &str) -> Measure {
        self.get(specimen).unwrap_or(Measure::ZERO)
    }

    /// Number of specimens this taxon was observed in.
    #[cfg(test)]
    pub(crate) fn observed_in(&self) -> usize {
        self.values.len()
    }

    /// Sum of the stored values over the given specimens.
    pub fn sum_over<'a, I>(&self, specimens: I) -> f64
    where
        I: IntoIterator<Item = &'a String>,
    {
        specimens
            .into_iter()
            .filter_map(|s| self.values.get(s))
            .map(Measure::as_f64)
            .sum()
    }
}

/// Taxon-keyed wide view over the long by-specimen rows.
///
/// Taxa keep the order they were first seen in (tally descending, since
/// that is how the query sorts), specimens keep discovery order. The first
/// row for a `tax_id` fixes its name and rank.
#[derive(Debug, Clone, Default)]
pub struct SpecimenPivot {
    rows: Vec<PivotRow>,
    by_tax_id: AHashMap<String, usize>,
    specimens: Vec<String>,
    seen_specimens: AHashSet<String>,
}

impl SpecimenPivot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(rows: &[BySpecimenRow], mode: ValueMode) -> Self {
        let mut pivot = Self::new();
        for row in rows {
            pivot.insert(row, mode);
        }
        pivot
    }

    /// Records one (specimen, taxon) cell. A repeated pair overwrites the
    /// earlier value instead of adding to it.
    pub fn insert(&mut self, row: &BySpecimenRow, mode: ValueMode) {
        let idx = match self.by_tax_id.get(&row.taxon.tax_id) {
            Some(&idx) => idx,
            None => {
                self.rows.push(PivotRow::new(row.taxon.clone()));
                self.by_tax_id
                    .insert(row.taxon.tax_id.clone(), self.rows.len() - 1);
                self.rows.len() - 1
            }
        };

        let value = match mode {
            ValueMode::Tally => row.tally,
            ValueMode::Frequency => Measure::Real(row.frequency),
        };
        self.rows[idx].values.insert(row.specimen.clone(), value);

        if self.seen_specimens.insert(row.specimen.clone()) {
            self.specimens.push(row.specimen.clone());
        }
    }

    pub fn rows(&self) -> &[PivotRow] {
        &self.rows
    }

    #[cfg(test)]
    pub(crate) fn get(&self, tax_id: &str) -> Option<&PivotRow> {
        self.by_tax_id.get(tax_id).map(|&idx| &self.rows[idx])
    }

    /// Specimens in discovery order; these become the wide table's columns.
    pub fn specimens(&self) -> &[String] {
        &self.specimens
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(specimen: &str, tax_id: &str, tally: f64, frequency: f64) -> BySpecimenRow {
        BySpecimenRow {
            specimen: specimen.to_string(),
            taxon: TaxonRecord::new(tax_id, format!("{}-name", tax_id), "species"),
            tally: Measure::Real(tally),
            placements: 1,
            frequency,
        }
    }

    #[test]
    fn specimens_and_taxa_keep_discovery_order() {
        let rows = vec![
            row("B", "T1", 9.0, 0.9),
            row("A", "T1", 5.0, 1.0),
            row("B", "T2", 1.0, 0.1),
        ];
        let pivot = SpecimenPivot::build(&rows, ValueMode::Tally);
        assert_eq!(pivot.specimens(), &["B".to_string(), "A".to_string()]);
        let ids: Vec<&str> = pivot.rows().iter().map(|r| r.taxon.tax_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
    }

    #[test]
    fn mode_selects_tally_or_frequency() {
        let rows = vec![row("A", "T1", 5.0, 0.5)];
        let tally = SpecimenPivot::build(&rows, ValueMode::Tally);
        assert_eq!(tally.get("T1").unwrap().get("A"), Some(Measure::Real(5.0)));

        let freq = SpecimenPivot::build(&rows, ValueMode::Frequency);
        assert_eq!(freq.get("T1").unwrap().get("A"), Some(Measure::Real(0.5)));
    }

    #[test]
    fn missing_pairs_read_as_zero() {
        let rows = vec![row("A", "T1", 5.0, 1.0), row("B", "T2", 3.0, 1.0)];
        let pivot = SpecimenPivot::build(&rows, ValueMode::Tally);
        let t2 = pivot.get("T2").unwrap();
        assert_eq!(t2.get("A"), None);
        assert_eq!(t2.value_or_zero("A"), Measure::ZERO);
        assert_eq!(t2.value_or_zero("A").to_string(), "0");
        assert_eq!(t2.observed_in(), 1);
    }

    #[test]
    fn repeated_pair_overwrites_rather_than_sums() {
        let rows = vec![row("A", "T1", 5.0, 0.5), row("A", "T1", 2.0, 0.2)];
        let pivot = SpecimenPivot::build(&rows, ValueMode::Tally);
        assert_eq!(pivot.len(), 1);
        assert_eq!(pivot.specimens().len(), 1);
        assert_eq!(pivot.get("T1").unwrap().get("A"), Some(Measure::Real(2.0)));
    }

    #[test]
    fn first_occurrence_fixes_taxon_attributes() {
        let mut second = row("B", "T1", 1.0, 1.0);
        second.taxon.tax_name = "renamed".to_string();
        let rows = vec![row("A", "T1", 5.0, 1.0), second];
        let pivot = SpecimenPivot::build(&rows, ValueMode::Tally);
        assert_eq!(pivot.get("T1").unwrap().taxon.tax_name, "T1-name");
    }

    #[test]
    fn empty_input() {
        let pivot = SpecimenPivot::build(&[], ValueMode::Frequency);
        assert!(pivot.is_empty());
        assert!(pivot.specimens().is_empty());
    }
}
