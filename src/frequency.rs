// src/frequency.rs

use crate::pivot::SpecimenPivot;
use crate::types::AverageFrequencyRow;

/// Average frequency of each taxon across *all* specimens in the report.
///
/// The denominator is the total specimen count, so a taxon seen in one of
/// ten specimens is diluted by the nine it is missing from. Rows come out
/// in pivot order (first-seen, i.e. by descending tally of the first cell).
pub fn average_frequencies(pivot: &SpecimenPivot) -> Vec<AverageFrequencyRow> {
    let specimens = pivot.specimens();
    let n_specimens = specimens.len();
    if n_specimens == 0 {
        return Vec::new();
    }

    pivot
        .rows()
        .iter()
        .map(|row| AverageFrequencyRow {
            taxon: row.taxon.clone(),
            average_frequency: row.sum_over(specimens) / n_specimens as f64,
        })
        .collect()
}
