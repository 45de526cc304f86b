// src/report.rs

use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::maps::MetadataMap;
use crate::pivot::SpecimenPivot;
use crate::types::{AverageFrequencyRow, BySpecimenRow, ByTaxonRow, Measure, TaxonRecord};

pub const BY_TAXON_HEADER: [&str; 5] = ["tax_name", "tax_id", "rank", "tally", "placements"];
pub const AVERAGE_FREQUENCY_HEADER: [&str; 4] = ["tax_id", "tax_name", "rank", "average_frequency"];
pub const GROUP_BY_SPECIMEN_HEADER: [&str; 7] = [
    "specimen",
    "tax_name",
    "tax_id",
    "rank",
    "tally",
    "placements",
    "frequency",
];
/// Leading columns of the wide by-specimen table; one column per specimen follows.
pub const BY_SPECIMEN_TAXON_COLUMNS: [&str; 3] = ["tax_name", "tax_id", "rank"];

/// Creates `path`, hands a CSV writer to `write`, and flushes it. The file
/// is closed when this returns, whether `write` succeeded or not.
pub fn write_to_path<P, F>(path: P, write: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut Writer<File>) -> Result<()>,
{
    let mut writer = Writer::from_path(path.as_ref())?;
    write(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn taxon_cells(taxon: &TaxonRecord) -> [&str; 3] {
    [
        taxon.tax_name.as_str(),
        taxon.tax_id.as_str(),
        taxon.rank.as_str(),
    ]
}

/// `tax_name, tax_id, rank, tally, placements`, one row per taxon.
pub fn write_by_taxon<W: Write>(writer: &mut Writer<W>, rows: &[ByTaxonRow]) -> Result<()> {
    writer.write_record(BY_TAXON_HEADER)?;
    for row in rows {
        let [name, id, rank] = taxon_cells(&row.taxon);
        let tally = row.tally.to_string();
        let placements = row.placements.to_string();
        writer.write_record([name, id, rank, tally.as_str(), placements.as_str()])?;
    }
    Ok(())
}

/// `tax_id, tax_name, rank, average_frequency`, one row per taxon.
pub fn write_average_frequencies<W: Write>(
    writer: &mut Writer<W>,
    rows: &[AverageFrequencyRow],
) -> Result<()> {
    writer.write_record(AVERAGE_FREQUENCY_HEADER)?;
    for row in rows {
        let [name, id, rank] = taxon_cells(&row.taxon);
        let average = Measure::Real(row.average_frequency).to_string();
        writer.write_record([id, name, rank, average.as_str()])?;
    }
    Ok(())
}

/// Long-format dump of the per-specimen query, verbatim.
pub fn write_group_by_specimen<W: Write>(
    writer: &mut Writer<W>,
    rows: &[BySpecimenRow],
) -> Result<()> {
    writer.write_record(GROUP_BY_SPECIMEN_HEADER)?;
    for row in rows {
        let [name, id, rank] = taxon_cells(&row.taxon);
        let tally = row.tally.to_string();
        let placements = row.placements.to_string();
        let frequency = Measure::Real(row.frequency).to_string();
        writer.write_record([
            row.specimen.as_str(),
            name,
            id,
            rank,
            tally.as_str(),
            placements.as_str(),
            frequency.as_str(),
        ])?;
    }
    Ok(())
}

/// Wide table: `tax_name, tax_id, rank` then one column per specimen.
///
/// With metadata, each metadata field becomes a leading row holding the
/// field name under `tax_name` and blank `tax_id`/`rank`; specimens with no
/// value for the field get an empty cell. Taxon rows fill every specimen
/// the taxon was not observed in with `0`.
pub fn write_by_specimen<W: Write>(
    writer: &mut Writer<W>,
    pivot: &SpecimenPivot,
    metadata: Option<&MetadataMap>,
) -> Result<()> {
    let specimens = pivot.specimens();

    let mut header: Vec<&str> = BY_SPECIMEN_TAXON_COLUMNS.to_vec();
    header.extend(specimens.iter().map(String::as_str));
    writer.write_record(&header)?;

    if let Some(metadata) = metadata {
        for field in metadata.fields() {
            let mut record: Vec<&str> = vec![field.as_str(), "", ""];
            record.extend(
                specimens
                    .iter()
                    .map(|s| metadata.get(s, field).unwrap_or("")),
            );
            writer.write_record(&record)?;
        }
    }

    for row in pivot.rows() {
        let mut record: Vec<String> = taxon_cells(&row.taxon)
            .iter()
            .map(|c| c.to_string())
            .collect();
        record.extend(specimens.iter().map(|s| row.value_or_zero(s).to_string()));
        writer.write_record(&record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueMode;
    use crate::maps::parse_metadata_map;

    fn render<F>(write: F) -> String
    where
        F: FnOnce(&mut Writer<Vec<u8>>) -> Result<()>,
    {
        let mut writer = Writer::from_writer(Vec::new());
        write(&mut writer).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    fn t1() -> TaxonRecord {
        TaxonRecord::new("T1-id", "T1-name", "species")
    }

    fn by_specimen_rows() -> Vec<BySpecimenRow> {
        vec![
            BySpecimenRow {
                specimen: "SampleX".into(),
                taxon: t1(),
                tally: Measure::Integer(10),
                placements: 1,
                frequency: 1.0,
            },
            BySpecimenRow {
                specimen: "SampleY".into(),
                taxon: t1(),
                tally: Measure::Integer(5),
                placements: 1,
                frequency: 0.5,
            },
            BySpecimenRow {
                specimen: "SampleY".into(),
                taxon: TaxonRecord::unclassified(),
                tally: Measure::Integer(5),
                placements: 2,
                frequency: 0.5,
            },
        ]
    }

    #[test]
    fn by_taxon_layout() {
        let rows = vec![ByTaxonRow {
            taxon: t1(),
            tally: Measure::Integer(15),
            placements: 1,
        }];
        let out = render(|w| write_by_taxon(w, &rows));
        assert_eq!(
            out,
            "tax_name,tax_id,rank,tally,placements\nT1-name,T1-id,species,15,1\n"
        );
    }

    #[test]
    fn average_frequency_layout() {
        let rows = vec![AverageFrequencyRow {
            taxon: t1(),
            average_frequency: 1.0,
        }];
        let out = render(|w| write_average_frequencies(w, &rows));
        assert_eq!(
            out,
            "tax_id,tax_name,rank,average_frequency\nT1-id,T1-name,species,1.0\n"
        );
    }

    #[test]
    fn group_by_specimen_is_verbatim() {
        let out = render(|w| write_group_by_specimen(w, &by_specimen_rows()));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "specimen,tax_name,tax_id,rank,tally,placements,frequency");
        assert_eq!(lines[1], "SampleX,T1-name,T1-id,species,10,1,1.0");
        assert_eq!(lines[3], "SampleY,unclassified,none,root,5,2,0.5");
    }

    #[test]
    fn by_specimen_zero_fills_missing_cells() {
        let pivot = SpecimenPivot::build(&by_specimen_rows(), ValueMode::Tally);
        let out = render(|w| write_by_specimen(w, &pivot, None));
        assert_eq!(
            out,
            "tax_name,tax_id,rank,SampleX,SampleY\n\
             T1-name,T1-id,species,10,5\n\
             unclassified,none,root,0,5\n"
        );
    }

    #[test]
    fn by_specimen_metadata_rows_come_first() {
        let metadata =
            parse_metadata_map("specimen,site\nSampleX,nose\nSampleZ,gut\n".as_bytes()).unwrap();
        let pivot = SpecimenPivot::build(&by_specimen_rows(), ValueMode::Frequency);
        let out = render(|w| write_by_specimen(w, &pivot, Some(&metadata)));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "tax_name,tax_id,rank,SampleX,SampleY");
        assert_eq!(lines[1], "site,,,nose,");
        assert_eq!(lines[2], "T1-name,T1-id,species,1.0,0.5");
        assert_eq!(lines[3], "unclassified,none,root,0,0.5");
    }

    #[test]
    fn write_to_path_flushes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("by_taxon.csv");
        write_to_path(&path, |w| write_by_taxon(w, &[])).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "tax_name,tax_id,rank,tally,placements\n"
        );
    }
}
