//src/classdb.rs

use rusqlite::{params, Connection, OpenFlags, Row};
use std::io::{Error as IoError, ErrorKind};
use std::path::Path;

use crate::error::{Result, TabulateError};
use crate::maps::SpecimenMap;
use crate::types::{
    BySpecimenRow, ByTaxonRow, Measure, SpecimenMass, TaxonRecord, UNKNOWN_RANK, UNKNOWN_TAX_ID,
    UNKNOWN_TAX_NAME,
};

/// Tables the classification pipeline must have produced.
pub const REQUIRED_TABLES: [&str; 3] = ["multiclass_concat", "placement_names", "taxa"];

const BY_TAXON_SQL: &str = "
    SELECT {taxon_columns},
           SUM(mass)                           tally,
           COUNT(DISTINCT placement_id)        placements
      FROM multiclass_concat mc
           JOIN placement_names USING (name, placement_id)
           {specimen_join}
           LEFT JOIN taxa t USING (tax_id)
     WHERE want_rank = ?1
     GROUP BY t.tax_id
     ORDER BY tally DESC";

const SPECIMEN_MASS_SQL: &str = "
    INSERT INTO temp.specimen_mass
    SELECT specimen, SUM(mass)
      FROM temp.specimens
           JOIN multiclass_concat mc USING (name)
           JOIN placement_names USING (name, placement_id)
     WHERE want_rank = ?1
     GROUP BY specimen";

const BY_SPECIMEN_SQL: &str = "
    SELECT specimen,
           {taxon_columns},
           SUM(mass)                                  tally,
           COUNT(DISTINCT placement_id)               placements,
           CAST(SUM(mass) AS REAL) / sm.total_mass    frequency
      FROM temp.specimens
           JOIN temp.specimen_mass sm USING (specimen)
           JOIN multiclass_concat mc USING (name)
           JOIN placement_names USING (name, placement_id)
           LEFT JOIN taxa t USING (tax_id)
     WHERE want_rank = ?1
     GROUP BY specimen, t.tax_id
     ORDER BY tally DESC";

/// `tax_name, tax_id, rank`, with the unclassified sentinels standing in
/// for classifications that did not join onto `taxa`.
fn taxon_columns() -> String {
    format!(
        "COALESCE(t.tax_name, '{}') tax_name, COALESCE(t.tax_id, '{}') tax_id, COALESCE(t.rank, '{}') rank",
        UNKNOWN_TAX_NAME, UNKNOWN_TAX_ID, UNKNOWN_RANK
    )
}

/// Schema adapter over a `guppy classify` / `rppr prep_db` SQLite database.
///
/// Only TEMP tables are ever written: `specimens` when a specimen map is
/// loaded and `specimen_mass` when per-specimen totals are computed.
pub struct ClassificationDB {
    conn: Connection,
    /// Whether `temp.specimens` has been populated.
    has_specimens: bool,
}

impl ClassificationDB {
    /// Opens an existing database. A missing file is an error rather than
    /// an empty database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TabulateError::Io(IoError::new(
                ErrorKind::NotFound,
                format!("classification database {} not found", path.display()),
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        log::debug!("opened classification database {}", path.display());
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            has_specimens: false,
        }
    }

    pub fn has_specimens(&self) -> bool {
        self.has_specimens
    }

    /// Checks that every table the report queries read from is present.
    pub fn verify_schema(&self) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        )?;
        for table in REQUIRED_TABLES {
            if !stmt.exists(params![table])? {
                return Err(TabulateError::MissingTable(table.to_string()));
            }
        }
        Ok(())
    }

    /// Populates `temp.specimens` from a sequence-name -> specimen map.
    /// Returns the number of rows inserted.
    pub fn load_specimens(&mut self, map: &SpecimenMap) -> Result<usize> {
        // One transaction: a bad row (e.g. a duplicate pair) leaves no
        // half-filled table behind.
        let tx = self.conn.transaction()?;

        // Recreate the temp table so a second load starts clean
        tx.execute_batch(
            "DROP TABLE IF EXISTS temp.specimens;
             CREATE TEMPORARY TABLE specimens (name, specimen, PRIMARY KEY (name, specimen));",
        )?;
        {
            // The statement borrows the transaction, so it has to drop before commit
            let mut stmt = tx.prepare("INSERT INTO temp.specimens VALUES (?1, ?2)")?;
            for (name, specimen) in map {
                stmt.execute(params![name, specimen])?;
            }
        }
        tx.commit()?;

        // Later by-taxon queries are restricted to mapped sequences from here on
        self.has_specimens = true;
        Ok(map.len())
    }

    /// Tally and distinct placement count per taxon at `want_rank`,
    /// restricted to mapped sequences when a specimen map is loaded.
    pub fn query_by_taxon(&self, want_rank: &str) -> Result<Vec<ByTaxonRow>> {
        let specimen_join = if self.has_specimens {
            "JOIN temp.specimens USING (name)"
        } else {
            ""
        };
        let sql = BY_TAXON_SQL
            .replace("{taxon_columns}", &taxon_columns())
            .replace("{specimen_join}", specimen_join);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![want_rank], |row| {
                Ok(ByTaxonRow {
                    taxon: taxon_from_row(row, 0)?,
                    tally: row.get(3)?,
                    placements: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Fills `temp.specimen_mass` with the total mass per specimen at
    /// `want_rank` and returns it. This is the frequency denominator.
    pub fn compute_specimen_mass_totals(&self, want_rank: &str) -> Result<Vec<SpecimenMass>> {
        self.require_specimens()?;
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS temp.specimen_mass;
             CREATE TEMPORARY TABLE specimen_mass (specimen, total_mass, PRIMARY KEY (specimen));",
        )?;
        self.conn.execute(SPECIMEN_MASS_SQL, params![want_rank])?;

        let mut stmt = self
            .conn
            .prepare("SELECT specimen, total_mass FROM temp.specimen_mass ORDER BY specimen")?;
        let totals = stmt
            .query_map([], |row| {
                Ok(SpecimenMass {
                    specimen: row.get(0)?,
                    total_mass: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(totals)
    }

    /// Tally, placement count and frequency per (specimen, taxon) pair,
    /// ordered by tally descending. Recomputes the per-specimen totals first.
    pub fn query_by_specimen(&self, want_rank: &str) -> Result<Vec<BySpecimenRow>> {
        let totals = self.compute_specimen_mass_totals(want_rank)?;
        log::debug!("computed mass totals for {} specimens", totals.len());

        let sql = BY_SPECIMEN_SQL.replace("{taxon_columns}", &taxon_columns());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![want_rank], |row| {
                let frequency: Option<f64> = row.get(6)?;
                Ok(BySpecimenRow {
                    specimen: row.get(0)?,
                    taxon: taxon_from_row(row, 1)?,
                    tally: row.get::<_, Measure>(4)?,
                    placements: row.get(5)?,
                    // zero total mass divides to NULL
                    frequency: frequency.unwrap_or(0.0),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn require_specimens(&self) -> Result<()> {
        if self.has_specimens {
            Ok(())
        } else {
            Err(TabulateError::Config(
                "specimen map must be loaded before tabulating by specimen".into(),
            ))
        }
    }
}

/// Reads `tax_name, tax_id, rank` starting at column `start`. `tax_id` may be
/// stored as an integer by some pipelines, so it is stringified here.
fn taxon_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<TaxonRecord> {
    use rusqlite::types::ValueRef;

    let tax_id = match row.get_ref(start + 1)? {
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        _ => row.get::<_, String>(start + 1)?,
    };
    Ok(TaxonRecord {
        tax_name: row.get(start)?,
        tax_id,
        rank: row.get(start + 2)?,
    })
}
