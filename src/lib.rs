// src/lib.rs
pub mod types;
pub mod error;
pub mod config;
pub mod maps;
pub mod classdb;
pub mod pivot;
pub mod frequency;
pub mod report;

use crate::classdb::ClassificationDB;
use crate::config::TabulateConfig;
use crate::error::Result;
use crate::frequency::average_frequencies;
use crate::maps::{read_metadata_map, read_specimen_map, MetadataMap};
use crate::pivot::SpecimenPivot;
use crate::report::{
    write_average_frequencies, write_by_specimen, write_by_taxon, write_group_by_specimen,
    write_to_path,
};

pub use crate::config::ValueMode;
pub use crate::error::TabulateError;

/// What a tabulation run produced, for logging by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabulationSummary {
    /// Rows in the by-taxon report.
    pub taxa: usize,
    /// Distinct specimens seen by the per-specimen query (0 when it did not run).
    pub specimens: usize,
    /// Rows returned by the per-specimen query.
    pub by_specimen_rows: usize,
}

/// Produces every report `config` asks for.
///
/// 1. validate the requested outputs (before anything is opened)
/// 2. open the database and check its tables
/// 3. load the specimen map into `temp.specimens`, read the metadata map
/// 4. per-specimen query -> group_by_specimen / by_specimen reports
/// 5. by_taxon report: average frequencies or plain totals
pub fn tabulate(config: &TabulateConfig) -> Result<TabulationSummary> {
    config.validate()?;

    let mut db = ClassificationDB::open(&config.database)?;
    db.verify_schema()?;

    if let Some(path) = &config.specimen_map {
        log::info!("populating specimens table from specimen map");
        let map = read_specimen_map(path)?;
        let n = db.load_specimens(&map)?;
        log::debug!("loaded {} sequence -> specimen pairs", n);
    }

    let metadata: Option<MetadataMap> = match &config.metadata_map {
        Some(path) => {
            log::info!("reading metadata map");
            let metadata = read_metadata_map(path)?;
            log::debug!(
                "read metadata for {} specimens ({} fields)",
                metadata.len(),
                metadata.fields().len()
            );
            Some(metadata)
        }
        None => None,
    };

    let mut summary = TabulationSummary::default();
    log::debug!(
        "by_taxon restricted to mapped sequences: {}",
        db.has_specimens()
    );

    let pivot = if config.wants_specimen_query() {
        log::info!("tabulating counts by specimen");
        let rows = db.query_by_specimen(&config.want_rank)?;
        summary.by_specimen_rows = rows.len();

        if let Some(path) = &config.group_by_specimen {
            log::info!("writing group_by_specimen");
            write_to_path(path, |w| write_group_by_specimen(w, &rows))?;
        }

        let pivot = SpecimenPivot::build(&rows, config.mode);
        summary.specimens = pivot.specimens().len();

        if let Some(path) = &config.by_specimen {
            log::info!("writing by_specimen");
            write_to_path(path, |w| write_by_specimen(w, &pivot, metadata.as_ref()))?;
        }
        Some(pivot)
    } else {
        None
    };

    match pivot {
        Some(pivot) if config.frequencies() => {
            log::info!("writing average frequencies by_taxon");
            let averages = average_frequencies(&pivot);
            summary.taxa = averages.len();
            write_to_path(&config.by_taxon, |w| write_average_frequencies(w, &averages))?;
        }
        _ => {
            log::info!("tabulating by_taxon");
            let rows = db.query_by_taxon(&config.want_rank)?;
            summary.taxa = rows.len();
            write_to_path(&config.by_taxon, |w| write_by_taxon(w, &rows))?;
        }
    }

    Ok(summary)
}
