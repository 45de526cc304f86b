//src/maps.rs

use ahash::AHashMap;
use csv::ReaderBuilder;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, TabulateError};

/// Column of the metadata map that names the specimen.
pub const SPECIMEN_COLUMN: &str = "specimen";

/// Sequence name -> specimen pairs, in file order.
pub type SpecimenMap = Vec<(String, String)>;

/// Opens a map file, decompressing it on the fly when the name ends in `.gz`.
fn open_map<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let f = File::open(path)?;

    // If the file ends with ".gz", wrap it in a MultiGzDecoder
    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn Read> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(reader)
}

/// Reads a headerless `name,specimen` CSV.
pub fn read_specimen_map<P: AsRef<Path>>(path: P) -> Result<SpecimenMap> {
    parse_specimen_map(open_map(path)?)
}

pub fn parse_specimen_map<R: Read>(input: R) -> Result<SpecimenMap> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut pairs = Vec::new();
    for result in reader.records() {
        let record = result?;
        // Reader is flexible so the width check can name the offending line
        if record.len() != 2 {
            return Err(TabulateError::MalformedSpecimenMap {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                fields: record.len(),
            });
        }
        pairs.push((record[0].to_string(), record[1].to_string()));
    }
    Ok(pairs)
}

/// Arbitrary per-specimen metadata, keyed by the `specimen` column.
#[derive(Debug, Clone, Default)]
pub struct MetadataMap {
    /// Metadata field names in header order, `specimen` excluded.
    fields: Vec<String>,
    values: AHashMap<String, AHashMap<String, String>>,
}

impl MetadataMap {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn get(&self, specimen: &str, field: &str) -> Option<&str> {
        self.values
            .get(specimen)
            .and_then(|data| data.get(field))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub fn read_metadata_map<P: AsRef<Path>>(path: P) -> Result<MetadataMap> {
    let path = path.as_ref();
    parse_metadata_map(open_map(path)?).map_err(|e| match e {
        TabulateError::MissingSpecimenColumn { .. } => TabulateError::MissingSpecimenColumn {
            path: path.to_path_buf(),
        },
        other => other,
    })
}

/// Parses a metadata CSV with a header row. A specimen listed twice keeps
/// its last row; short rows leave the trailing fields unset.
pub fn parse_metadata_map<R: Read>(input: R) -> Result<MetadataMap> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    // 1) locate the specimen column in the header
    let headers = reader.headers()?.clone();
    let specimen_idx = headers
        .iter()
        .position(|h| h == SPECIMEN_COLUMN)
        .ok_or_else(|| TabulateError::MissingSpecimenColumn {
            path: Default::default(),
        })?;

    // 2) every other column is a metadata field, kept in header order
    let fields: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != specimen_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    // 3) one entry per specimen; zip stops at the end of a short row
    let mut values = AHashMap::new();
    for result in reader.records() {
        let record = result?;
        let Some(specimen) = record.get(specimen_idx) else {
            continue;
        };

        let data: AHashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|&(i, _)| i != specimen_idx)
            .map(|(_, (h, v))| (h.to_string(), v.to_string()))
            .collect();
        values.insert(specimen.to_string(), data);
    }

    Ok(MetadataMap { fields, values })
}
